// Picks the user agent sent with each outbound request.

pub const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

pub trait Identity: Send + Sync {
    fn user_agent(&self) -> &str;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomAgent;

impl Identity for RandomAgent {
    fn user_agent(&self) -> &str {
        USER_AGENTS[fastrand::usize(..USER_AGENTS.len())]
    }
}

#[derive(Debug, Clone)]
pub struct FixedAgent(pub String);

impl Identity for FixedAgent {
    fn user_agent(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_agent_draws_from_pool() {
        for _ in 0..20 {
            assert!(USER_AGENTS.contains(&RandomAgent.user_agent()));
        }
    }

    #[test]
    fn fixed_agent_is_stable() {
        let agent = FixedAgent("test-agent/1.0".to_string());
        assert_eq!(agent.user_agent(), "test-agent/1.0");
        assert_eq!(agent.user_agent(), agent.user_agent());
    }
}
