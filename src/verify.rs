use crate::config::ScraperConfig;
use crate::identity::Identity;
use crate::record::{CandidateRecord, VerifiedRecord};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::header::{RANGE, USER_AGENT};
use reqwest::{redirect, Client, RequestBuilder, StatusCode};
use std::sync::Arc;
use tracing::debug;

/// Resolves a link to a reachability verdict. Never fails.
#[async_trait]
pub trait LinkCheck: Send + Sync {
    async fn is_reachable(&self, link: &str) -> bool;
}

pub struct LinkProbe {
    client: Client,
    identity: Arc<dyn Identity>,
}

impl LinkProbe {
    pub fn new(config: &ScraperConfig, identity: Arc<dyn Identity>) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(config.probe_timeout)
            .redirect(redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, identity })
    }

    // Anything at or above 400 counts as a failed attempt, same as a transport error.
    async fn attempt(&self, request: RequestBuilder) -> reqwest::Result<StatusCode> {
        let response = request
            .header(USER_AGENT, self.identity.user_agent())
            .send()
            .await?
            .error_for_status()?;

        Ok(response.status())
    }
}

#[async_trait]
impl LinkCheck for LinkProbe {
    async fn is_reachable(&self, link: &str) -> bool {
        let link = link.trim();
        if link.is_empty() {
            return false;
        }

        match self.attempt(self.client.head(link)).await {
            Ok(status) => {
                debug!(link, %status, "HEAD probe succeeded");
                return true;
            }
            Err(e) => debug!(link, error = %e, "HEAD probe failed, retrying with ranged GET"),
        }

        // Some servers reject HEAD outright, so ask for a single byte instead.
        match self.attempt(self.client.get(link).header(RANGE, "bytes=0-0")).await {
            Ok(status) => {
                debug!(link, %status, "ranged GET probe succeeded");
                true
            }
            Err(e) => {
                debug!(link, error = %e, "link unreachable");
                false
            }
        }
    }
}

/// Verifies `candidates` in windows of `window` concurrent probes. Each window
/// finishes before the next starts; output order matches input order.
pub async fn verify_batch(
    checker: &dyn LinkCheck,
    candidates: &[CandidateRecord],
    window: usize,
) -> Vec<VerifiedRecord> {
    let mut verified = Vec::with_capacity(candidates.len());

    for chunk in candidates.chunks(window.max(1)) {
        let verdicts = join_all(chunk.iter().map(|c| checker.is_reachable(&c.link))).await;
        verified.extend(
            chunk
                .iter()
                .cloned()
                .zip(verdicts)
                .map(|(candidate, ok)| candidate.verified(ok)),
        );
    }

    verified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::FixedAgent;
    use mockito::{Matcher, Server};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn probe() -> LinkProbe {
        let config = ScraperConfig {
            probe_timeout: Duration::from_secs(2),
            ..ScraperConfig::default()
        };
        LinkProbe::new(&config, Arc::new(FixedAgent("probe-test/1.0".to_string()))).unwrap()
    }

    fn candidate(link: &str) -> CandidateRecord {
        CandidateRecord::from_parts(Some(link), None, Some(link), None).unwrap()
    }

    #[tokio::test]
    async fn blank_link_is_unreachable_without_network() {
        let probe = probe();
        assert!(!probe.is_reachable("").await);
        assert!(!probe.is_reachable("   ").await);
    }

    #[tokio::test]
    async fn successful_head_skips_fallback() {
        let mut server = Server::new_async().await;
        let head = server
            .mock("HEAD", "/paper")
            .match_header("user-agent", "probe-test/1.0")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;
        let get = server.mock("GET", "/paper").expect(0).create_async().await;

        assert!(probe().is_reachable(&format!("{}/paper", server.url())).await);

        head.assert_async().await;
        get.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_head_falls_back_to_ranged_get() {
        let mut server = Server::new_async().await;
        server.mock("HEAD", "/paper").with_status(405).create_async().await;
        let get = server
            .mock("GET", "/paper")
            .match_header("range", "bytes=0-0")
            .with_status(206)
            .with_body("%")
            .expect(1)
            .create_async()
            .await;

        assert!(probe().is_reachable(&format!("{}/paper", server.url())).await);
        get.assert_async().await;
    }

    #[tokio::test]
    async fn both_probes_failing_is_unreachable() {
        let mut server = Server::new_async().await;
        server.mock("HEAD", "/gone").with_status(404).create_async().await;
        server.mock("GET", "/gone").with_status(410).create_async().await;

        assert!(!probe().is_reachable(&format!("{}/gone", server.url())).await);
    }

    #[tokio::test]
    async fn redirects_are_followed_within_limit() {
        let mut server = Server::new_async().await;
        server
            .mock("HEAD", "/moved")
            .with_status(301)
            .with_header("location", "/final")
            .create_async()
            .await;
        server.mock("HEAD", "/final").with_status(200).create_async().await;

        assert!(probe().is_reachable(&format!("{}/moved", server.url())).await);
    }

    #[tokio::test]
    async fn redirect_loop_is_unreachable() {
        let mut server = Server::new_async().await;
        server
            .mock("HEAD", "/loop")
            .with_status(302)
            .with_header("location", "/loop")
            .create_async()
            .await;
        server
            .mock("GET", "/loop")
            .with_status(302)
            .with_header("location", "/loop")
            .create_async()
            .await;

        assert!(!probe().is_reachable(&format!("{}/loop", server.url())).await);
    }

    #[tokio::test]
    async fn unparseable_link_is_unreachable() {
        assert!(!probe().is_reachable("not a url").await);
    }

    #[tokio::test]
    async fn probing_same_link_twice_agrees() {
        let mut server = Server::new_async().await;
        server
            .mock("HEAD", Matcher::Any)
            .with_status(200)
            .expect(2)
            .create_async()
            .await;
        let link = format!("{}/same", server.url());

        let out = verify_batch(&probe(), &[candidate(&link), candidate(&link)], 5).await;
        assert_eq!(out[0].is_valid, out[1].is_valid);
        assert!(out[0].is_valid);
    }

    // Later links resolve first; the runner must still return input order.
    struct SlowCheck {
        delays: HashMap<String, u64>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        started: Mutex<Vec<String>>,
    }

    impl SlowCheck {
        fn new(links: &[&str]) -> Self {
            let n = links.len() as u64;
            let delays = links
                .iter()
                .enumerate()
                .map(|(i, l)| (l.to_string(), (n - i as u64) * 10))
                .collect();
            Self {
                delays,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                started: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LinkCheck for SlowCheck {
        async fn is_reachable(&self, link: &str) -> bool {
            self.started.lock().unwrap().push(link.to_string());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(self.delays[link])).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            link != "c"
        }
    }

    #[tokio::test]
    async fn batch_preserves_input_order() {
        let links = ["a", "b", "c", "d", "e", "f"];
        let check = SlowCheck::new(&links);
        let candidates: Vec<_> = links.iter().map(|l| candidate(l)).collect();

        let out = verify_batch(&check, &candidates, 5).await;

        let order: Vec<_> = out.iter().map(|r| r.record.link.as_str()).collect();
        assert_eq!(order, links);
        let verdicts: Vec<_> = out.iter().map(|r| r.is_valid).collect();
        assert_eq!(verdicts, [true, true, false, true, true, true]);
    }

    #[tokio::test]
    async fn batch_bounds_concurrency_to_window() {
        let links = ["a", "b", "c", "d", "e", "f", "g"];
        let check = SlowCheck::new(&links);
        let candidates: Vec<_> = links.iter().map(|l| candidate(l)).collect();

        verify_batch(&check, &candidates, 3).await;

        assert_eq!(check.peak.load(Ordering::SeqCst), 3);
        assert_eq!(check.started.lock().unwrap().len(), links.len());
    }

    #[tokio::test]
    async fn empty_batch_is_empty() {
        let check = SlowCheck::new(&[]);
        assert!(verify_batch(&check, &[], 5).await.is_empty());
    }
}
