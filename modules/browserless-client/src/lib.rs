pub mod error;
pub mod session;

pub use error::{BrowserlessError, Result};
pub use session::{ElementRef, WebDriverSession};

use std::time::Duration;

use serde_json::Value;
use tracing::info;

pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        Self::with_timeout(base_url, token, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: &str, token: Option<&str>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        let mut endpoint = format!("{}{}", self.base_url, path);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }
        endpoint
    }

    /// Open an interactive WebDriver session. The caller owns the session and
    /// must `close()` it; Browserless reaps abandoned sessions on its own timeout.
    pub async fn new_session(&self, user_agent: Option<&str>) -> Result<WebDriverSession> {
        let mut args = vec![
            "--headless".to_string(),
            "--no-sandbox".to_string(),
            "--disable-gpu".to_string(),
            "--disable-dev-shm-usage".to_string(),
        ];
        if let Some(ua) = user_agent {
            args.push(format!("--user-agent={ua}"));
        }

        let body = serde_json::json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        });

        let endpoint = self.endpoint("/webdriver/session");
        let value = session::send(self.client.post(&endpoint).json(&body)).await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserlessError::Protocol("missing sessionId".to_string()))?
            .to_string();

        info!(session_id = session_id.as_str(), "browserless: session opened");

        Ok(WebDriverSession::new(
            self.client.clone(),
            self.base_url.clone(),
            self.token.clone(),
            session_id,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_token_when_present() {
        let client = BrowserlessClient::new("https://chrome.example.com/", Some("abc"));
        assert_eq!(
            client.endpoint("/webdriver/session"),
            "https://chrome.example.com/webdriver/session?token=abc"
        );
    }

    #[test]
    fn endpoint_without_token() {
        let client = BrowserlessClient::new("http://localhost:3000", None);
        assert_eq!(
            client.endpoint("/webdriver/session"),
            "http://localhost:3000/webdriver/session"
        );
    }
}
