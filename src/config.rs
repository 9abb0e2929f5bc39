use std::time::Duration;

pub const DOAJ_API_BASE: &str = "https://doaj.org";
pub const DOAJ_SITE_BASE: &str = "https://doaj.org";

/// Endpoints, timeouts and limits for one pipeline.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub api_base: String,
    pub site_base: String,
    pub acquisition_timeout: Duration,
    pub probe_timeout: Duration,
    pub max_redirects: usize,
    pub window: usize,
    pub max_count: usize,
    pub overfetch_factor: usize,
    pub upstream_cap: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            api_base: DOAJ_API_BASE.to_string(),
            site_base: DOAJ_SITE_BASE.to_string(),
            acquisition_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(3),
            max_redirects: 3,
            window: 5,
            max_count: 20,
            overfetch_factor: 3,
            upstream_cap: 50,
        }
    }
}

impl ScraperConfig {
    pub fn clamp_count(&self, requested: i64) -> usize {
        requested.clamp(1, self.max_count.max(1) as i64) as usize
    }

    pub fn overfetch(&self, count: usize) -> usize {
        (count * self.overfetch_factor).min(self.upstream_cap)
    }
}
