use crate::acquisition::{CandidateSource, DoajClient};
use crate::config::ScraperConfig;
use crate::identity::Identity;
use crate::record::{CandidateRecord, VerifiedRecord};
use crate::verify::{verify_batch, LinkCheck, LinkProbe};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// Acquisition and verification wired together behind one entry point.
pub struct Pipeline {
    source: Arc<dyn CandidateSource>,
    checker: Arc<dyn LinkCheck>,
    config: ScraperConfig,
}

impl Pipeline {
    pub fn new(source: Arc<dyn CandidateSource>, checker: Arc<dyn LinkCheck>, config: ScraperConfig) -> Self {
        Self { source, checker, config }
    }

    pub fn from_config(config: ScraperConfig, identity: Arc<dyn Identity>) -> reqwest::Result<Self> {
        let source = DoajClient::new(&config, identity.clone())?;
        let checker = LinkProbe::new(&config, identity)?;
        Ok(Self::new(Arc::new(source), Arc::new(checker), config))
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Returns `min(count, available)` records, reachable links first.
    /// Upstream and link failures only shrink or degrade the result.
    pub async fn acquire_and_verify(&self, query: &str, count: i64) -> Vec<VerifiedRecord> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let needed = self.config.clamp_count(count);
        let fetch = self.config.overfetch(needed);
        info!(query, needed, fetch, "acquiring candidates");

        let pool = dedupe_links(self.source.fetch(query, fetch).await);
        info!(query, raw = pool.len(), "verifying candidates");

        select(self.checker.as_ref(), &pool, needed, self.config.window).await
    }
}

fn dedupe_links(candidates: Vec<CandidateRecord>) -> Vec<CandidateRecord> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.link.clone()))
        .collect()
}

/// Verifies `pool` window by window until `needed` valid records are found,
/// then backfills any shortfall with the rejected ones in pool order.
pub async fn select(
    checker: &dyn LinkCheck,
    pool: &[CandidateRecord],
    needed: usize,
    window: usize,
) -> Vec<VerifiedRecord> {
    let mut accepted = Vec::with_capacity(needed);
    let mut rejected = Vec::new();

    'windows: for chunk in pool.chunks(window.max(1)) {
        for record in verify_batch(checker, chunk, window).await {
            if !record.is_valid {
                rejected.push(record);
                continue;
            }

            accepted.push(record);
            info!(valid = accepted.len(), needed, "accepted reachable link");
            if accepted.len() >= needed {
                break 'windows;
            }
        }
    }

    let shortfall = needed.saturating_sub(accepted.len());
    if shortfall > 0 && !rejected.is_empty() {
        info!(valid = accepted.len(), needed, backfill = shortfall.min(rejected.len()), "backfilling with unreachable links");
    }
    accepted.extend(rejected.into_iter().take(shortfall));

    accepted
}
