// User-albums scraper. Listings can be client-rendered and hidden behind a
// consent overlay, so a headless browser is used when one is configured;
// plain HTTP is the fallback. Extraction degrades from embedded state to DOM
// cards to a raw anchor scan.

use std::collections::HashMap;
use std::sync::LazyLock;

use futures::future::join_all;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use albumsync_common::{
    clean_album_title, slugify, AlbumSource, AlbumSyncError, ExternalAlbumSummary,
    ExternalUserAlbumsMetadata, FetchProgress, Result, UNTITLED,
};

use super::model::{collect_photos, listing_album_id, og_image, parse_album_list, MODEL_EXPORT_MARKER};
use super::urls::{absolute_image_url, album_url, albums_listing_url};
use crate::browser::{dismiss_consent, BrowserSession, HeadlessBrowser};
use crate::embedded_state::extract_embedded_json;
use crate::http::HttpFetcher;
use crate::provider::ProgressFn;
use crate::settings::ScraperSettings;

/// Collects album cards from the rendered DOM as `{href, title, text, cover}`.
const DOM_CARDS_SCRIPT: &str = r#"
const cards = document.querySelectorAll(
  '.photo-list-album-view, .album-card, [data-album-id], a[href*="/albums/"]'
);
return Array.from(cards).map((card) => {
  const link = card.tagName === 'A' ? card : card.querySelector('a[href*="/albums/"]');
  const img = card.querySelector('img');
  const style = card.getAttribute('style') || '';
  const bg = style.match(/background-image:\s*url\(["']?([^"')]+)["']?\)/);
  const title = card.querySelector('.album-title, h3, h4');
  return {
    href: link ? link.getAttribute('href') : null,
    title: title ? title.textContent : (link ? link.getAttribute('title') : null),
    text: card.textContent,
    cover: img ? (img.getAttribute('src') || img.getAttribute('data-src')) : (bg ? bg[1] : null)
  };
});
"#;

static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b([^>]*\bhref\s*=\s*["'][^"']*/(?:albums|sets)/\d+[^"']*["'][^>]*)>(.*?)</a>"#)
        .expect("valid regex")
});
static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\bhref\s*=\s*["']([^"']+)["']"#).expect("valid regex"));
static TITLE_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\btitle\s*=\s*["']([^"']+)["']"#).expect("valid regex"));
static IMG_SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*\bsrc\s*=\s*["']([^"']+)["']"#).expect("valid regex")
});
static BACKGROUND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)background-image\s*:\s*url\(\s*(?:&quot;|["'])?([^"')&]+)"#).expect("valid regex")
});
static DATA_SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bdata-(?:src|original|defer-src)\s*=\s*["']([^"']+)["']"#).expect("valid regex")
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static PHOTO_COUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d,]*)\s+photos?(?:\s+and\s+(\d[\d,]*)\s+videos?)?").expect("valid regex")
});

pub(crate) struct UserAlbumsScraper<'a> {
    http: &'a dyn HttpFetcher,
    browser: Option<&'a dyn HeadlessBrowser>,
    settings: &'a ScraperSettings,
    on_progress: ProgressFn<'a>,
}

/// What was read from the listing page.
struct Listing {
    html: String,
    dom_cards: Value,
}

impl<'a> UserAlbumsScraper<'a> {
    pub(crate) fn new(
        http: &'a dyn HttpFetcher,
        browser: Option<&'a dyn HeadlessBrowser>,
        settings: &'a ScraperSettings,
        on_progress: ProgressFn<'a>,
    ) -> Self {
        Self {
            http,
            browser,
            settings,
            on_progress,
        }
    }

    pub(crate) async fn fetch(&self, user_id: &str) -> Result<ExternalUserAlbumsMetadata> {
        let url = albums_listing_url(user_id);

        let listing = match self.browser {
            Some(browser) => match self.load_with_browser(browser, &url).await {
                Ok(listing) => listing,
                Err(e) => {
                    warn!(url = url.as_str(), error = %e, "user albums: browser load failed, falling back to http");
                    self.load_with_http(&url).await?
                }
            },
            None => self.load_with_http(&url).await?,
        };

        let (owner, mut albums) = extract_from_state(&listing.html);
        let mut strategy = "state";
        if albums.is_empty() {
            albums = albums_from_dom_cards(&listing.dom_cards);
            strategy = "dom";
        }
        if albums.is_empty() {
            albums = scan_album_anchors(&listing.html);
            strategy = "anchors";
        }
        info!(user_id, albums = albums.len(), strategy, "user albums: listing extracted");
        (self.on_progress)(FetchProgress::new(0, Some(albums.len())));

        self.fill_missing_covers(user_id, &mut albums).await;
        (self.on_progress)(FetchProgress::new(albums.len(), Some(albums.len())));

        Ok(ExternalUserAlbumsMetadata {
            source: AlbumSource::Flickr,
            user_id: user_id.to_string(),
            username: owner.unwrap_or_else(|| user_id.to_string()),
            total_albums: albums.len(),
            albums,
        })
    }

    async fn load_with_http(&self, url: &str) -> Result<Listing> {
        let resp = self.http.get(url).await?;
        if !resp.is_success() {
            return Err(AlbumSyncError::Fetch {
                url: url.to_string(),
                status: resp.status,
            });
        }
        Ok(Listing {
            html: resp.body,
            dom_cards: Value::Null,
        })
    }

    async fn load_with_browser(&self, browser: &dyn HeadlessBrowser, url: &str) -> Result<Listing> {
        let session = browser.open().await?;
        let result = self.read_listing(session.as_ref(), url).await;
        if let Err(e) = session.close().await {
            warn!(error = %e, "user albums: failed to close browser session");
        }
        result
    }

    async fn read_listing(&self, session: &dyn BrowserSession, url: &str) -> Result<Listing> {
        session.navigate(url).await?;
        if let Err(e) = session.wait_until_ready(self.settings.browser_ready_timeout).await {
            warn!(url, error = %e, "user albums: page not ready, reading it anyway");
        }
        dismiss_consent(session).await;

        let html = session.page_source().await?;
        let dom_cards = if extract_from_state(&html).1.is_empty() {
            match session.execute(DOM_CARDS_SCRIPT).await {
                Ok(cards) => cards,
                Err(e) => {
                    debug!(error = %e, "user albums: DOM card script failed");
                    Value::Null
                }
            }
        } else {
            Value::Null
        };
        Ok(Listing { html, dom_cards })
    }

    /// One concurrent lookup per album still missing a cover.
    async fn fill_missing_covers(&self, user_id: &str, albums: &mut [ExternalAlbumSummary]) {
        let missing: Vec<(usize, String)> = albums
            .iter()
            .enumerate()
            .filter(|(_, a)| a.cover_photo_url.is_none())
            .map(|(i, a)| (i, album_url(user_id, &a.id)))
            .collect();
        if missing.is_empty() {
            return;
        }
        debug!(user_id, missing = missing.len(), "user albums: looking up covers");

        let lookups = missing
            .into_iter()
            .map(|(i, url)| async move { (i, self.lookup_cover(&url).await) });
        for (i, cover) in join_all(lookups).await {
            if cover.is_some() {
                albums[i].cover_photo_url = cover;
            }
        }
    }

    async fn lookup_cover(&self, url: &str) -> Option<String> {
        let resp = match self.http.get(url).await {
            Ok(resp) if resp.is_success() => resp,
            Ok(resp) => {
                debug!(url, status = resp.status, "user albums: cover lookup failed");
                return None;
            }
            Err(e) => {
                debug!(url, error = %e, "user albums: cover lookup failed");
                return None;
            }
        };
        og_image(&resp.body).or_else(|| {
            extract_embedded_json(&resp.body, MODEL_EXPORT_MARKER)
                .and_then(|state| collect_photos(&state).into_iter().next())
                .map(|p| p.url)
        })
    }
}

fn extract_from_state(html: &str) -> (Option<String>, Vec<ExternalAlbumSummary>) {
    extract_embedded_json(html, MODEL_EXPORT_MARKER)
        .map(|state| parse_album_list(&state))
        .unwrap_or_default()
}

fn number(m: Option<regex::Match<'_>>) -> Option<usize> {
    m?.as_str().replace(',', "").parse().ok()
}

fn photo_count_in(text: &str) -> Option<usize> {
    let caps = PHOTO_COUNT_RE.captures(text)?;
    Some(number(caps.get(1))? + number(caps.get(2)).unwrap_or(0))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn summary(id: &str, raw_title: &str, context: &str, cover: Option<String>) -> ExternalAlbumSummary {
    let mut title = clean_album_title(&collapse_whitespace(raw_title));
    if title.is_empty() {
        title = UNTITLED.to_string();
    }
    let mut album = ExternalAlbumSummary::new(id, &title);
    album.photo_count = photo_count_in(context).unwrap_or(0);
    album.cover_photo_url = cover.map(|c| absolute_image_url(&c));
    album.target_path = slugify(&title);
    album
}

/// Merge a later sighting of the same album into an earlier one. Listings
/// often link each album twice (cover image and caption).
fn merge_sighting(existing: &mut ExternalAlbumSummary, next: ExternalAlbumSummary) {
    if existing.title == UNTITLED && next.title != UNTITLED {
        existing.target_path = next.target_path;
        existing.title = next.title;
    }
    if existing.photo_count == 0 {
        existing.photo_count = next.photo_count;
    }
    if existing.cover_photo_url.is_none() {
        existing.cover_photo_url = next.cover_photo_url;
    }
}

fn dedup_sightings(sightings: impl IntoIterator<Item = ExternalAlbumSummary>) -> Vec<ExternalAlbumSummary> {
    let mut albums: Vec<ExternalAlbumSummary> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for album in sightings {
        match index.get(&album.id) {
            Some(&i) => merge_sighting(&mut albums[i], album),
            None => {
                index.insert(album.id.clone(), albums.len());
                albums.push(album);
            }
        }
    }
    albums
}

fn albums_from_dom_cards(cards: &Value) -> Vec<ExternalAlbumSummary> {
    let Some(cards) = cards.as_array() else {
        return Vec::new();
    };
    dedup_sightings(cards.iter().filter_map(|card| {
        let href = card.get("href")?.as_str()?;
        let id = listing_album_id(href)?;
        let text = card.get("text").and_then(Value::as_str).unwrap_or_default();
        let title = card
            .get("title")
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(text);
        let cover = card.get("cover").and_then(Value::as_str).map(String::from);
        Some(summary(&id, title, text, cover))
    }))
}

/// Last-resort scan of every album link in raw HTML.
pub(crate) fn scan_album_anchors(html: &str) -> Vec<ExternalAlbumSummary> {
    dedup_sightings(ANCHOR_RE.captures_iter(html).filter_map(|cap| {
        let attrs = &cap[1];
        let inner = &cap[2];
        let href = HREF_RE.captures(attrs)?.get(1)?.as_str().to_string();
        let id = listing_album_id(&href)?;

        let text = collapse_whitespace(&TAG_RE.replace_all(inner, " "));
        let title = if text.is_empty() {
            TITLE_ATTR_RE
                .captures(attrs)
                .map(|c| c[1].to_string())
                .unwrap_or_default()
        } else {
            text.clone()
        };

        let cover = [&*IMG_SRC_RE, &*BACKGROUND_RE, &*DATA_SRC_RE]
            .iter()
            .find_map(|re| re.captures(inner).or_else(|| re.captures(attrs)))
            .map(|c| c[1].trim().to_string());

        Some(summary(&id, &title, &text, cover))
    }))
}
