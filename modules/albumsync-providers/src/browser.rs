// Headless browser collaborator. Only the user-albums scraper needs it:
// some listings are client-rendered and sit behind a cookie-consent overlay.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use browserless_client::{BrowserlessClient, ElementRef, WebDriverSession};
use serde_json::Value;
use tracing::{debug, info, warn};

use albumsync_common::{AlbumSyncError, Result};

/// Consent iframes, most specific first.
pub const CONSENT_IFRAME_SELECTORS: &[&str] = &[
    "iframe[id^='sp_message_iframe']",
    "iframe[title='SP Consent Message']",
    "iframe[src*='consent']",
    "iframe[title*='onsent']",
];

/// Accept buttons inside (or outside) the consent overlay, most specific first.
pub const CONSENT_ACCEPT_SELECTORS: &[&str] = &[
    "button[title='Accept all']",
    "button[aria-label='Accept all']",
    "button[title='Accept All']",
    "#onetrust-accept-btn-handler",
    "button.accept-all",
    "button[title='Accept']",
    "button.sp_choice_type_11",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle(pub String);

#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;
    async fn wait_until_ready(&self, timeout: Duration) -> Result<()>;
    async fn find_elements(&self, selector: &str) -> Result<Vec<ElementHandle>>;
    async fn click(&self, element: &ElementHandle) -> Result<()>;
    /// `None` returns to the top-level document.
    async fn switch_to_frame(&self, frame: Option<&ElementHandle>) -> Result<()>;
    async fn execute(&self, script: &str) -> Result<Value>;
    async fn page_source(&self) -> Result<String>;
    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait HeadlessBrowser: Send + Sync {
    async fn open(&self) -> Result<Box<dyn BrowserSession>>;
}

/// Best-effort cookie-consent dismissal. Tries each consent iframe selector,
/// then each accept button inside it; falls back to accept buttons rendered
/// directly in the page. Never fails: returns whether anything was clicked.
pub async fn dismiss_consent(session: &dyn BrowserSession) -> bool {
    for iframe_selector in CONSENT_IFRAME_SELECTORS {
        let frames = match session.find_elements(iframe_selector).await {
            Ok(frames) => frames,
            Err(e) => {
                debug!(selector = *iframe_selector, error = %e, "consent: iframe lookup failed");
                continue;
            }
        };
        let Some(frame) = frames.first() else {
            continue;
        };

        if let Err(e) = session.switch_to_frame(Some(frame)).await {
            warn!(selector = *iframe_selector, error = %e, "consent: could not enter iframe");
            continue;
        }
        let clicked = click_first_accept(session).await;
        if let Err(e) = session.switch_to_frame(None).await {
            warn!(error = %e, "consent: could not leave iframe");
        }
        if clicked {
            info!(selector = *iframe_selector, "consent: dismissed via iframe");
            return true;
        }
    }

    if click_first_accept(session).await {
        info!("consent: dismissed via page button");
        return true;
    }

    warn!("consent: no accept button found, continuing without dismissal");
    false
}

async fn click_first_accept(session: &dyn BrowserSession) -> bool {
    for selector in CONSENT_ACCEPT_SELECTORS {
        let Ok(buttons) = session.find_elements(selector).await else {
            continue;
        };
        for button in &buttons {
            match session.click(button).await {
                Ok(()) => return true,
                Err(e) => debug!(selector = *selector, error = %e, "consent: button not clickable"),
            }
        }
    }
    false
}

// --- Browserless implementation ---

pub struct BrowserlessBrowser {
    client: Arc<BrowserlessClient>,
    user_agent: String,
}

impl BrowserlessBrowser {
    pub fn new(base_url: &str, token: Option<&str>, user_agent: &str) -> Self {
        info!(base_url, "BrowserlessBrowser initialized");
        Self {
            client: Arc::new(BrowserlessClient::new(base_url, token)),
            user_agent: user_agent.to_string(),
        }
    }
}

#[async_trait]
impl HeadlessBrowser for BrowserlessBrowser {
    async fn open(&self) -> Result<Box<dyn BrowserSession>> {
        let session = self
            .client
            .new_session(Some(&self.user_agent))
            .await
            .map_err(browser_error)?;
        Ok(Box::new(BrowserlessSession { session }))
    }
}

struct BrowserlessSession {
    session: WebDriverSession,
}

fn browser_error(err: browserless_client::BrowserlessError) -> AlbumSyncError {
    AlbumSyncError::Browser(err.to_string())
}

#[async_trait]
impl BrowserSession for BrowserlessSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.session.navigate(url).await.map_err(browser_error)
    }

    async fn wait_until_ready(&self, timeout: Duration) -> Result<()> {
        self.session
            .wait_until_ready(timeout)
            .await
            .map_err(browser_error)
    }

    async fn find_elements(&self, selector: &str) -> Result<Vec<ElementHandle>> {
        let elements = self
            .session
            .find_elements(selector)
            .await
            .map_err(browser_error)?;
        Ok(elements.into_iter().map(|e| ElementHandle(e.0)).collect())
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        self.session
            .click(&ElementRef(element.0.clone()))
            .await
            .map_err(browser_error)
    }

    async fn switch_to_frame(&self, frame: Option<&ElementHandle>) -> Result<()> {
        let frame = frame.map(|f| ElementRef(f.0.clone()));
        self.session
            .switch_to_frame(frame.as_ref())
            .await
            .map_err(browser_error)
    }

    async fn execute(&self, script: &str) -> Result<Value> {
        self.session
            .execute(script, Vec::new())
            .await
            .map_err(browser_error)
    }

    async fn page_source(&self) -> Result<String> {
        self.session.page_source().await.map_err(browser_error)
    }

    async fn close(&self) -> Result<()> {
        self.session.close().await.map_err(browser_error)
    }
}
