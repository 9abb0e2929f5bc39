use crate::record::VerifiedRecord;
use crate::report::generate_report;
use crate::selection::Pipeline;
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use warp::http::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use warp::http::{Method, StatusCode};
use warp::reply::Response;
use warp::{Filter, Reply};

const DEFAULT_LIMIT: i64 = 10;

#[derive(Debug, Default, Serialize)]
struct ScrapeResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Vec<VerifiedRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl ScrapeResponse {
    fn failure(error: impl Into<String>) -> Self {
        Self { error: Some(error.into()), ..Self::default() }
    }
}

pub async fn start_web_server(pipeline: Arc<Pipeline>, port: u16) {
    info!("Web interface running on http://localhost:{}", port);
    warp::serve(routes(pipeline)).run(([127, 0, 0, 1], port)).await;
}

pub fn routes(pipeline: Arc<Pipeline>) -> impl Filter<Extract = (Response,), Error = warp::Rejection> + Clone {
    let pipeline = warp::any().map(move || pipeline.clone());

    warp::path!("api" / "scrape")
        .and(warp::method())
        .and(warp::body::bytes())
        .and(pipeline)
        .and_then(|method: Method, body: Bytes, pipeline: Arc<Pipeline>| async move {
            let (status, response) = scrape(&method, &body, &pipeline).await;
            Ok::<_, warp::Rejection>(with_cors(status, &response))
        })
}

fn with_cors(status: StatusCode, body: &Option<ScrapeResponse>) -> Response {
    let mut response = match body {
        Some(body) => warp::reply::with_status(warp::reply::json(body), status).into_response(),
        None => warp::reply::with_status(warp::reply(), status).into_response(),
    };

    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("POST, OPTIONS"));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Content-Type"));
    response
}

// Preflight gets an empty body; everything else answers with a ScrapeResponse.
async fn scrape(method: &Method, body: &[u8], pipeline: &Pipeline) -> (StatusCode, Option<ScrapeResponse>) {
    if method == Method::OPTIONS {
        return (StatusCode::OK, None);
    }
    if method != Method::POST {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            Some(ScrapeResponse::failure("Method not allowed. Use POST.")),
        );
    }

    let request: serde_json::Value = serde_json::from_slice(body).unwrap_or_default();

    // an empty string counts as missing; whitespace-only is rejected separately below
    let Some(query) = request.get("query").and_then(|q| q.as_str()).filter(|q| !q.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Some(ScrapeResponse::failure(
                "Missing or invalid \"query\" parameter. Expected a non-empty string.",
            )),
        );
    };
    let query = query.trim();
    if query.is_empty() {
        return (StatusCode::BAD_REQUEST, Some(ScrapeResponse::failure("Query cannot be empty.")));
    }

    // zero or absent means the default, like an unset form field
    let limit = request
        .get("limit")
        .and_then(|l| l.as_i64())
        .filter(|&l| l != 0)
        .unwrap_or(DEFAULT_LIMIT);
    let limit = pipeline.config().clamp_count(limit);

    info!(query, limit, "starting scrape");
    let records = pipeline.acquire_and_verify(query, limit as i64).await;

    if records.is_empty() {
        return (
            StatusCode::OK,
            Some(ScrapeResponse {
                success: true,
                data: Some(Vec::new()),
                message: Some("No results found for the given query.".to_string()),
                ..ScrapeResponse::default()
            }),
        );
    }

    let valid = records.iter().filter(|r| r.is_valid).count();
    info!(query, valid, total = records.len(), "generating report");

    match generate_report(query, &records) {
        Ok(report) => (
            StatusCode::OK,
            Some(ScrapeResponse {
                success: true,
                data: Some(records),
                report: Some(report),
                ..ScrapeResponse::default()
            }),
        ),
        Err(e) => {
            error!(query, error = %e, "report generation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Some(ScrapeResponse::failure(e.to_string())))
        }
    }
}
