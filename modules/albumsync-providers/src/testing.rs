// Test doubles for the provider collaborators. Compiled for this crate's tests
// and, via the `test-support` feature, for downstream crates' tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use albumsync_common::{AlbumSyncError, EventSink, Result, ServerEvent};

use crate::browser::{BrowserSession, ElementHandle, HeadlessBrowser};
use crate::http::{HttpFetcher, HttpResponse};

// --- HTTP ---

/// Canned responses keyed by URL. Unregistered URLs fail like a dropped
/// connection, so a test that forgets a page sees a network error rather
/// than an empty body.
#[derive(Default)]
pub struct MockHttpFetcher {
    responses: HashMap<String, (u16, String)>,
    redirects: HashMap<String, String>,
    requested: Mutex<Vec<String>>,
}

impl MockHttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.responses.insert(url.to_string(), (200, html.into()));
        self
    }

    pub fn on_status(mut self, url: &str, status: u16) -> Self {
        self.responses.insert(url.to_string(), (status, String::new()));
        self
    }

    /// `from` answers with whatever is registered for `to`, reporting `to`
    /// as the final URL.
    pub fn on_redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    /// Every URL requested, in order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requested.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl HttpFetcher for MockHttpFetcher {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.requested.lock().unwrap().push(url.to_string());
        let final_url = self.redirects.get(url).map(String::as_str).unwrap_or(url);
        match self.responses.get(final_url) {
            Some((status, body)) => Ok(HttpResponse {
                status: *status,
                url: final_url.to_string(),
                body: body.clone(),
            }),
            None => Err(AlbumSyncError::Network(format!("no mock response for {url}"))),
        }
    }
}

// --- Browser ---

#[derive(Default)]
struct SessionState {
    elements: HashMap<(Option<String>, String), Vec<String>>,
    unclickable: HashSet<String>,
    clicked: Vec<String>,
    current_frame: Option<String>,
    navigated: Vec<String>,
    source: String,
    script_result: Value,
    scripts_run: usize,
    ready_fails: bool,
    closed: bool,
}

/// Scripted browser session. Clones share state so a test can keep a handle
/// while the code under test owns a boxed copy.
#[derive(Clone, Default)]
pub struct MockBrowserSession {
    state: Arc<Mutex<SessionState>>,
}

impl MockBrowserSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Elements matching `selector` in the top-level document.
    pub fn with_elements(self, selector: &str, ids: &[&str]) -> Self {
        self.insert_elements(None, selector, ids);
        self
    }

    /// Elements matching `selector` while switched into `frame`.
    pub fn with_frame_elements(self, frame: &str, selector: &str, ids: &[&str]) -> Self {
        self.insert_elements(Some(frame), selector, ids);
        self
    }

    pub fn with_unclickable(self, id: &str) -> Self {
        self.state.lock().unwrap().unclickable.insert(id.to_string());
        self
    }

    pub fn with_source(self, html: impl Into<String>) -> Self {
        self.state.lock().unwrap().source = html.into();
        self
    }

    pub fn with_script_result(self, result: Value) -> Self {
        self.state.lock().unwrap().script_result = result;
        self
    }

    pub fn with_ready_failure(self) -> Self {
        self.state.lock().unwrap().ready_fails = true;
        self
    }

    fn insert_elements(&self, frame: Option<&str>, selector: &str, ids: &[&str]) {
        self.state.lock().unwrap().elements.insert(
            (frame.map(String::from), selector.to_string()),
            ids.iter().map(|id| id.to_string()).collect(),
        );
    }

    pub fn clicked(&self) -> Vec<String> {
        self.state.lock().unwrap().clicked.clone()
    }

    pub fn current_frame(&self) -> Option<String> {
        self.state.lock().unwrap().current_frame.clone()
    }

    pub fn navigated(&self) -> Vec<String> {
        self.state.lock().unwrap().navigated.clone()
    }

    pub fn scripts_run(&self) -> usize {
        self.state.lock().unwrap().scripts_run
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

#[async_trait]
impl BrowserSession for MockBrowserSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.state.lock().unwrap().navigated.push(url.to_string());
        Ok(())
    }

    async fn wait_until_ready(&self, _timeout: Duration) -> Result<()> {
        if self.state.lock().unwrap().ready_fails {
            return Err(AlbumSyncError::Browser("document never became ready".into()));
        }
        Ok(())
    }

    async fn find_elements(&self, selector: &str) -> Result<Vec<ElementHandle>> {
        let state = self.state.lock().unwrap();
        let key = (state.current_frame.clone(), selector.to_string());
        Ok(state
            .elements
            .get(&key)
            .map(|ids| ids.iter().cloned().map(ElementHandle).collect())
            .unwrap_or_default())
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.unclickable.contains(&element.0) {
            return Err(AlbumSyncError::Browser(format!("element {} not interactable", element.0)));
        }
        state.clicked.push(element.0.clone());
        Ok(())
    }

    async fn switch_to_frame(&self, frame: Option<&ElementHandle>) -> Result<()> {
        self.state.lock().unwrap().current_frame = frame.map(|f| f.0.clone());
        Ok(())
    }

    async fn execute(&self, _script: &str) -> Result<Value> {
        let mut state = self.state.lock().unwrap();
        state.scripts_run += 1;
        Ok(state.script_result.clone())
    }

    async fn page_source(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().source.clone())
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Hands out the same scripted session on every `open`.
pub struct MockBrowser {
    session: MockBrowserSession,
    fail_open: bool,
}

impl MockBrowser {
    pub fn new(session: MockBrowserSession) -> Self {
        Self {
            session,
            fail_open: false,
        }
    }

    /// A browser whose sessions never start.
    pub fn unavailable() -> Self {
        Self {
            session: MockBrowserSession::new(),
            fail_open: true,
        }
    }
}

#[async_trait]
impl HeadlessBrowser for MockBrowser {
    async fn open(&self) -> Result<Box<dyn BrowserSession>> {
        if self.fail_open {
            return Err(AlbumSyncError::Browser("session refused".into()));
        }
        Ok(Box::new(self.session.clone()))
    }
}

// --- Events ---

/// Captures every emitted event for later assertions.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ServerEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ServerEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<ServerEvent> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, ServerEvent::Error(_)))
            .collect()
    }

    pub fn completions(&self) -> Vec<ServerEvent> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, ServerEvent::Complete(_)))
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: ServerEvent) {
        self.events.lock().unwrap().push(event);
    }
}
