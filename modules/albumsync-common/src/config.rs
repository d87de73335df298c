use std::env;

use tracing::info;

/// A realistic desktop browser UA. The photo host serves stripped-down markup
/// without the embedded state to clients it doesn't recognise as browsers.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Fraction of the expected photo count at which chunked pagination stops.
/// The provider's declared totals are occasionally higher than what it will
/// actually serve, so chasing the last few percent just burns requests.
pub const DEFAULT_COMPLETENESS_THRESHOLD: f64 = 0.95;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Persistence (in-memory store when absent)
    pub database_url: Option<String>,

    // Web server
    pub web_host: String,
    pub web_port: u16,

    // Headless browser
    pub browserless_url: Option<String>,
    pub browserless_token: Option<String>,

    // Scraping
    pub user_agent: String,
    pub http_timeout_secs: u64,
    pub completeness_threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            web_host: "0.0.0.0".to_string(),
            web_port: 3000,
            browserless_url: None,
            browserless_token: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            http_timeout_secs: 30,
            completeness_threshold: DEFAULT_COMPLETENESS_THRESHOLD,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_url: optional_env("DATABASE_URL"),
            web_host: env::var("WEB_HOST").unwrap_or(defaults.web_host),
            web_port: parsed_env("WEB_PORT").unwrap_or(defaults.web_port),
            browserless_url: optional_env("BROWSERLESS_URL"),
            browserless_token: optional_env("BROWSERLESS_TOKEN"),
            user_agent: optional_env("SCRAPER_USER_AGENT").unwrap_or(defaults.user_agent),
            http_timeout_secs: parsed_env("HTTP_TIMEOUT_SECS")
                .unwrap_or(defaults.http_timeout_secs),
            completeness_threshold: parsed_env::<f64>("ALBUM_COMPLETENESS_THRESHOLD")
                .filter(|t| *t > 0.0 && *t <= 1.0)
                .unwrap_or(defaults.completeness_threshold),
        }
    }

    /// Log the effective configuration without secrets.
    pub fn log_redacted(&self) {
        info!(
            web_host = self.web_host.as_str(),
            web_port = self.web_port,
            database = if self.database_url.is_some() { "postgres" } else { "memory" },
            browserless = self.browserless_url.is_some(),
            browserless_token = self.browserless_token.is_some(),
            http_timeout_secs = self.http_timeout_secs,
            completeness_threshold = self.completeness_threshold,
            "Config loaded"
        );
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    optional_env(key).and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.web_port, 3000);
        assert_eq!(config.completeness_threshold, 0.95);
        assert!(config.user_agent.contains("Mozilla/5.0"));
        assert!(config.database_url.is_none());
    }
}
