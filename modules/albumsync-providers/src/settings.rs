use std::time::Duration;

use albumsync_common::config::DEFAULT_COMPLETENESS_THRESHOLD;
use albumsync_common::Config;

/// When a scrape has collected "enough" of an album's declared total.
/// The threshold tolerates providers that overstate their counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletenessPolicy {
    pub threshold: f64,
}

impl Default for CompletenessPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_COMPLETENESS_THRESHOLD,
        }
    }
}

impl CompletenessPolicy {
    pub fn is_complete(&self, loaded: usize, target: usize) -> bool {
        target == 0 || loaded as f64 >= target as f64 * self.threshold
    }
}

#[derive(Debug, Clone)]
pub struct ScraperSettings {
    pub completeness: CompletenessPolicy,
    pub user_agent: String,
    pub browser_ready_timeout: Duration,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ScraperSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            completeness: CompletenessPolicy {
                threshold: config.completeness_threshold,
            },
            user_agent: config.user_agent.clone(),
            browser_ready_timeout: Duration::from_secs(config.http_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ninety_five_percent_is_complete() {
        let policy = CompletenessPolicy::default();
        assert!(!policy.is_complete(94, 100));
        assert!(policy.is_complete(95, 100));
        assert!(policy.is_complete(0, 0));
    }

    #[test]
    fn threshold_is_configurable() {
        let policy = CompletenessPolicy { threshold: 1.0 };
        assert!(!policy.is_complete(99, 100));
        assert!(policy.is_complete(100, 100));
    }
}
