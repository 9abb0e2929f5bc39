use serde::Serialize;

pub const UNTITLED: &str = "Untitled";
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";
pub const UNKNOWN_PUBLISHER: &str = "Unknown Publisher";

// One article as the upstream describes it. `link` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateRecord {
    pub title: String,
    pub authors: String,
    pub link: String,
    pub publisher: String,
}

impl CandidateRecord {
    /// Builds a record from best-effort upstream fields, substituting the
    /// sentinels for anything missing. Returns `None` when there is no link.
    pub fn from_parts(
        title: Option<&str>,
        authors: Option<&str>,
        link: Option<&str>,
        publisher: Option<&str>,
    ) -> Option<Self> {
        let link = non_blank(link)?;

        Some(Self {
            title: non_blank(title).unwrap_or(UNTITLED).to_string(),
            authors: non_blank(authors).unwrap_or(UNKNOWN_AUTHOR).to_string(),
            link: link.to_string(),
            publisher: non_blank(publisher).unwrap_or(UNKNOWN_PUBLISHER).to_string(),
        })
    }

    pub fn verified(self, is_valid: bool) -> VerifiedRecord {
        VerifiedRecord { record: self, is_valid }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedRecord {
    #[serde(flatten)]
    pub record: CandidateRecord,
    pub is_valid: bool,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
