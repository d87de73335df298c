// W3C WebDriver session against a Browserless endpoint. Thin wrappers over the
// handful of commands needed for interactive page loads: navigate, readiness,
// element lookup, clicks, frame switching, scripts and page source.

use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{BrowserlessError, Result};

/// W3C key identifying a web element reference in JSON payloads.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// How often `wait_until_ready` polls `document.readyState`.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Opaque handle to an element inside the current browsing context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef(pub String);

impl ElementRef {
    fn to_json(&self) -> Value {
        json!({ ELEMENT_KEY: self.0 })
    }

    fn from_json(value: &Value) -> Option<Self> {
        value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(|id| ElementRef(id.to_string()))
    }
}

pub struct WebDriverSession {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    session_id: String,
}

impl WebDriverSession {
    pub(crate) fn new(
        client: reqwest::Client,
        base_url: String,
        token: Option<String>,
        session_id: String,
    ) -> Self {
        Self {
            client,
            base_url,
            token,
            session_id,
        }
    }

    pub fn id(&self) -> &str {
        &self.session_id
    }

    fn endpoint(&self, command: &str) -> String {
        let mut endpoint = format!(
            "{}/webdriver/session/{}{}",
            self.base_url, self.session_id, command
        );
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }
        endpoint
    }

    async fn post(&self, command: &str, body: Value) -> Result<Value> {
        send(self.client.post(self.endpoint(command)).json(&body)).await
    }

    async fn get(&self, command: &str) -> Result<Value> {
        send(self.client.get(self.endpoint(command))).await
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        debug!(session_id = self.session_id.as_str(), url, "webdriver: navigate");
        self.post("/url", json!({ "url": url })).await?;
        Ok(())
    }

    /// Poll `document.readyState` until it reports `complete` or the timeout elapses.
    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<()> {
        let started = Instant::now();
        loop {
            let state = self.execute("return document.readyState;", Vec::new()).await?;
            if state.as_str() == Some("complete") {
                return Ok(());
            }
            if started.elapsed() >= timeout {
                return Err(BrowserlessError::Timeout(timeout.as_secs()));
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    /// All elements matching a CSS selector. An empty list is not an error.
    pub async fn find_elements(&self, css_selector: &str) -> Result<Vec<ElementRef>> {
        let value = self
            .post(
                "/elements",
                json!({ "using": "css selector", "value": css_selector }),
            )
            .await?;

        Ok(value
            .as_array()
            .map(|items| items.iter().filter_map(ElementRef::from_json).collect())
            .unwrap_or_default())
    }

    pub async fn click(&self, element: &ElementRef) -> Result<()> {
        self.post(&format!("/element/{}/click", element.0), json!({}))
            .await?;
        Ok(())
    }

    /// Switch into an iframe, or back to the top-level document with `None`.
    pub async fn switch_to_frame(&self, frame: Option<&ElementRef>) -> Result<()> {
        let id = frame.map(ElementRef::to_json).unwrap_or(Value::Null);
        self.post("/frame", json!({ "id": id })).await?;
        Ok(())
    }

    /// Run a synchronous script in the page and return its JSON result.
    pub async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        self.post("/execute/sync", json!({ "script": script, "args": args }))
            .await
    }

    pub async fn page_source(&self) -> Result<String> {
        let value = self.get("/source").await?;
        value
            .as_str()
            .map(String::from)
            .ok_or_else(|| BrowserlessError::Protocol("page source was not a string".into()))
    }

    pub async fn close(&self) -> Result<()> {
        let endpoint = self.endpoint("");
        if let Err(e) = send(self.client.delete(endpoint)).await {
            warn!(session_id = self.session_id.as_str(), error = %e, "webdriver: close failed");
            return Err(e);
        }
        Ok(())
    }
}

/// Send a WebDriver request and unwrap the `value` envelope. Error envelopes
/// (`{"value": {"error": ..., "message": ...}}`) become `BrowserlessError::WebDriver`.
pub(crate) async fn send(request: reqwest::RequestBuilder) -> Result<Value> {
    let resp = request.send().await?;
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();

    let body: Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(_) if !status.is_success() => {
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message: text,
            });
        }
        Err(e) => return Err(e.into()),
    };

    unwrap_envelope(status.is_success(), status.as_u16(), body)
}

fn unwrap_envelope(success: bool, status: u16, body: Value) -> Result<Value> {
    let value = body.get("value").cloned().unwrap_or(Value::Null);
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return Err(BrowserlessError::WebDriver {
            error: error.to_string(),
            message: value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
    }
    if !success {
        return Err(BrowserlessError::Api {
            status,
            message: body.to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_ref_round_trips_w3c_key() {
        let raw = json!({ ELEMENT_KEY: "abc-123" });
        let element = ElementRef::from_json(&raw).unwrap();
        assert_eq!(element, ElementRef("abc-123".into()));
        assert_eq!(element.to_json(), raw);
    }

    #[test]
    fn envelope_value_is_unwrapped() {
        let body = json!({ "value": "complete" });
        assert_eq!(unwrap_envelope(true, 200, body).unwrap(), json!("complete"));
    }

    #[test]
    fn envelope_error_becomes_webdriver_error() {
        let body = json!({ "value": { "error": "no such frame", "message": "frame gone" } });
        match unwrap_envelope(false, 404, body) {
            Err(BrowserlessError::WebDriver { error, message }) => {
                assert_eq!(error, "no such frame");
                assert_eq!(message, "frame gone");
            }
            other => panic!("expected WebDriver error, got {:?}", other),
        }
    }

    #[test]
    fn non_success_without_error_payload_is_api_error() {
        let body = json!({ "value": null });
        assert!(matches!(
            unwrap_envelope(false, 500, body),
            Err(BrowserlessError::Api { status: 500, .. })
        ));
    }
}
