use thiserror::Error;

/// Why an acquisition request failed. Always absorbed by the caller.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid upstream url: {0}")]
    Url(String),
}

/// Report rendering failure. This one propagates to the caller.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("could not write report archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("could not write report part: {0}")]
    Io(#[from] std::io::Error),
}
