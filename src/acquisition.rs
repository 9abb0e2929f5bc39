use crate::config::ScraperConfig;
use crate::error::AcquisitionError;
use crate::identity::Identity;
use crate::record::CandidateRecord;
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, Url};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

static DOI_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"10\.\d{4,9}/[-._;()/:A-Za-z0-9]+").expect("valid DOI pattern"));

const RESULT_ITEM: &str = ".search-results article, .result-item";
const RESULT_TITLE: &str = "h3 a, .title a, .article-title";
const RESULT_AUTHORS: &str = ".authors, .author-list";
const RESULT_PUBLISHER: &str = ".publisher, .journal-title";

/// Produces candidate records for a query. An upstream outage yields an
/// empty list, never an error.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn fetch(&self, query: &str, count: usize) -> Vec<CandidateRecord>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct Article {
    #[serde(default)]
    bibjson: Option<Bibjson>,
}

#[derive(Debug, Default, Deserialize)]
struct Bibjson {
    title: Option<String>,
    #[serde(default)]
    author: Option<Vec<Author>>,
    #[serde(default)]
    link: Option<Vec<Link>>,
    #[serde(default)]
    identifier: Option<Vec<Identifier>>,
    journal: Option<Journal>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(rename = "type")]
    kind: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Identifier {
    #[serde(rename = "type")]
    kind: Option<String>,
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Journal {
    publisher: Option<String>,
}

impl Bibjson {
    // fulltext link, then the first declared link, then a DOI resolver URL
    fn resolve_link(&self) -> Option<String> {
        let declared: Vec<&Link> = self
            .link
            .iter()
            .flatten()
            .filter(|l| l.url.as_deref().is_some_and(|u| !u.trim().is_empty()))
            .collect();

        declared
            .iter()
            .find(|l| l.kind.as_deref().is_some_and(|k| k.eq_ignore_ascii_case("fulltext")))
            .or_else(|| declared.first())
            .and_then(|l| l.url.as_deref())
            .map(|u| u.trim().to_string())
            .or_else(|| self.doi().map(|doi| format!("https://doi.org/{}", doi)))
    }

    fn doi(&self) -> Option<String> {
        self.identifier
            .iter()
            .flatten()
            .filter(|i| i.kind.as_deref().is_some_and(|k| k.eq_ignore_ascii_case("doi")))
            .filter_map(|i| i.id.as_deref())
            .map(clean_doi)
            .find(|doi| !doi.is_empty())
    }

    fn authors(&self) -> Option<String> {
        let names: Vec<&str> = self
            .author
            .iter()
            .flatten()
            .filter_map(|a| a.name.as_deref())
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .collect();

        (!names.is_empty()).then(|| names.join(", "))
    }

    fn into_candidate(self) -> Option<CandidateRecord> {
        let link = self.resolve_link()?;
        let authors = self.authors();
        let publisher = self.journal.as_ref().and_then(|j| j.publisher.as_deref());

        CandidateRecord::from_parts(self.title.as_deref(), authors.as_deref(), Some(link.as_str()), publisher)
    }
}

// Strips resolver prefixes and keeps the bare DOI when one can be found.
fn clean_doi(raw: &str) -> String {
    let mut cleaned = raw.trim();

    for prefix in ["https://doi.org/", "http://doi.org/", "doi:"] {
        if let Some(rest) = cleaned.strip_prefix(prefix) {
            cleaned = rest.trim();
        }
    }

    match DOI_PATTERN.find(cleaned) {
        Some(m) => m.as_str().to_string(),
        None => cleaned.to_string(),
    }
}

/// Turns a structured search payload into candidates, dropping unusable items.
fn parse_search_response(body: &str, count: usize) -> Result<Vec<CandidateRecord>, AcquisitionError> {
    let response: SearchResponse = serde_json::from_str(body)?;

    let records = response
        .results
        .unwrap_or_default()
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Article>(value) {
            Ok(article) => article.bibjson,
            Err(e) => {
                debug!(error = %e, "skipping malformed article");
                None
            }
        })
        .filter_map(Bibjson::into_candidate)
        .take(count)
        .collect();

    Ok(records)
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn first_text(element: &ElementRef, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|e| collapse(&e.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

/// Scrapes result items out of a rendered search page.
fn parse_results_page(html: &str, site_base: &str, count: usize) -> Vec<CandidateRecord> {
    let selectors = (
        Selector::parse(RESULT_ITEM),
        Selector::parse(RESULT_TITLE),
        Selector::parse(RESULT_AUTHORS),
        Selector::parse(RESULT_PUBLISHER),
    );
    let (Ok(item), Ok(title), Ok(authors), Ok(publisher)) = selectors else {
        return Vec::new();
    };

    // relative hrefs resolve against the site; without a usable base only absolute ones survive
    let base = Url::parse(site_base).ok();
    let document = Html::parse_document(html);
    let mut records = Vec::new();

    for element in document.select(&item) {
        if records.len() >= count {
            break;
        }

        let heading = element.select(&title).next();
        let Some(title_text) = heading.map(|h| collapse(&h.text().collect::<String>())).filter(|t| !t.is_empty())
        else {
            continue;
        };
        let Some(href) = heading.and_then(|h| h.value().attr("href")).map(str::trim).filter(|h| !h.is_empty())
        else {
            continue;
        };

        let resolved = match &base {
            Some(base) => base.join(href),
            None => Url::parse(href),
        };
        let Some(link) = resolved.ok().filter(|u| matches!(u.scheme(), "http" | "https")) else {
            continue;
        };

        records.extend(CandidateRecord::from_parts(
            Some(title_text.as_str()),
            first_text(&element, &authors).as_deref(),
            Some(link.as_str()),
            first_text(&element, &publisher).as_deref(),
        ));
    }

    records
}

pub struct DoajClient {
    client: Client,
    identity: Arc<dyn Identity>,
    api_base: String,
    site_base: String,
}

impl DoajClient {
    pub fn new(config: &ScraperConfig, identity: Arc<dyn Identity>) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(config.acquisition_timeout).build()?;

        Ok(Self {
            client,
            identity,
            api_base: config.api_base.clone(),
            site_base: config.site_base.clone(),
        })
    }

    fn api_url(&self, query: &str) -> Result<Url, AcquisitionError> {
        let mut url = Url::parse(&self.api_base).map_err(|e| AcquisitionError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| AcquisitionError::Url(self.api_base.clone()))?
            .pop_if_empty()
            .extend(["api", "search", "articles", query]);
        Ok(url)
    }

    fn page_url(&self, query: &str) -> Result<Url, AcquisitionError> {
        let source = serde_json::json!({
            "query": { "query_string": { "query": query, "default_operator": "AND" } }
        });

        let mut url = Url::parse(&format!("{}/search/articles", self.site_base.trim_end_matches('/')))
            .map_err(|e| AcquisitionError::Url(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("ref", "homepage-box")
            .append_pair("source", &source.to_string());
        Ok(url)
    }

    async fn search_api(&self, query: &str, count: usize) -> Result<Vec<CandidateRecord>, AcquisitionError> {
        let url = self.api_url(query)?;
        debug!(%url, count, "querying search API");

        let response = self
            .client
            .get(url)
            .query(&[("page", "1".to_string()), ("pageSize", count.to_string())])
            .header(USER_AGENT, self.identity.user_agent())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AcquisitionError::Status(response.status()));
        }

        let body = response.text().await?;
        parse_search_response(&body, count)
    }

    async fn search_page(&self, query: &str, count: usize) -> Result<Vec<CandidateRecord>, AcquisitionError> {
        let url = self.page_url(query)?;
        debug!(%url, count, "scraping search page");

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, self.identity.user_agent())
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AcquisitionError::Status(response.status()));
        }

        let html = response.text().await?;
        Ok(parse_results_page(&html, &self.site_base, count))
    }
}

#[async_trait]
impl CandidateSource for DoajClient {
    async fn fetch(&self, query: &str, count: usize) -> Vec<CandidateRecord> {
        // An empty but successful API response is a real answer; only failures fall back.
        match self.search_api(query, count).await {
            Ok(records) => {
                info!(query, found = records.len(), "search API returned candidates");
                return records;
            }
            Err(e) => warn!(query, error = %e, "search API failed, falling back to search page"),
        }

        match self.search_page(query, count).await {
            Ok(records) => {
                info!(query, found = records.len(), "search page returned candidates");
                records
            }
            Err(e) => {
                warn!(query, error = %e, "search page failed, no candidates");
                Vec::new()
            }
        }
    }
}
