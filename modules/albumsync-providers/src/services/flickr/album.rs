// Album metadata scraper.
//
// Flickr album pages render one page of photos (the "page size") into their
// embedded state. A photo page opened in album context carries a much wider
// window of the album, so large albums are collected by anchoring on the
// first photo of successive listing pages and merging each anchored window.
// Fetches are sequential: page N's anchor comes from page N's own content.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use albumsync_common::{
    AlbumSource, AlbumSyncError, ExternalAlbumMetadata, ExternalPhoto, FetchProgress,
    ParsedAlbumUrl, Result,
};

use super::model::{
    collect_photos, first_photo_id_in_html, og_title, parse_album_state, MODEL_EXPORT_MARKER,
};
use super::urls::{album_page_url, album_url, anchored_photo_url, parse_album_url};
use crate::accumulator::PhotoAccumulator;
use crate::embedded_state::extract_embedded_json;
use crate::http::HttpFetcher;
use crate::provider::ProgressFn;
use crate::settings::CompletenessPolicy;

static ALBUM_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://(?:www\.)?flickr\.com/photos/[^/"'\s<>]+/(?:albums|sets)/\d+"#)
        .expect("valid regex")
});

pub(crate) struct AlbumScraper<'a> {
    http: &'a dyn HttpFetcher,
    policy: CompletenessPolicy,
    on_progress: ProgressFn<'a>,
}

impl<'a> AlbumScraper<'a> {
    pub(crate) fn new(
        http: &'a dyn HttpFetcher,
        policy: CompletenessPolicy,
        on_progress: ProgressFn<'a>,
    ) -> Self {
        Self {
            http,
            policy,
            on_progress,
        }
    }

    pub(crate) async fn fetch(&self, parsed: &ParsedAlbumUrl) -> Result<ExternalAlbumMetadata> {
        let (ids, resolved_body) = if parsed.is_short_url {
            self.resolve_short_link(parsed).await?
        } else {
            (parsed.clone(), None)
        };

        let first_page_url = album_url(&ids.user_id, &ids.album_id);
        let body = match resolved_body {
            Some(body) => body,
            None => {
                let resp = self.http.get(&first_page_url).await?;
                if !resp.is_success() {
                    return Err(AlbumSyncError::Fetch {
                        url: first_page_url,
                        status: resp.status,
                    });
                }
                resp.body
            }
        };

        let state = extract_embedded_json(&body, MODEL_EXPORT_MARKER).ok_or_else(|| {
            AlbumSyncError::Parse(format!("no embedded album state at {first_page_url}"))
        })?;
        let album = parse_album_state(&state);

        let mut acc = PhotoAccumulator::new();
        acc.extend(album.photos.iter().cloned());
        let page_size = acc.len().max(1);
        let target = [album.total, ids.expected_photo_count, Some(acc.len())]
            .into_iter()
            .flatten()
            .max()
            .unwrap_or(0);

        info!(
            album_id = ids.album_id.as_str(),
            first_page = acc.len(),
            declared = ?album.total,
            expected = ?ids.expected_photo_count,
            target,
            "album: first page loaded"
        );
        self.report(acc.len(), target);

        if acc.len() < target {
            let anchor = acc
                .first_id()
                .map(String::from)
                .or_else(|| first_photo_id_in_html(&body, &ids.album_id));
            if let Some(anchor) = anchor {
                if let Some(expanded) = self.fetch_anchored(&ids, &anchor).await {
                    if expanded.len() > acc.len() {
                        debug!(expanded = expanded.len(), first_page = acc.len(), "album: using expanded fetch");
                        let mut preferred = PhotoAccumulator::new();
                        preferred.extend(expanded);
                        preferred.extend(album.photos.iter().cloned());
                        acc = preferred;
                        self.report(acc.len(), target);
                    }
                }
            }
        }

        if !self.policy.is_complete(acc.len(), target) {
            self.paginate(&ids, &mut acc, page_size, target).await;
        }

        let title = if album.title.trim().is_empty() {
            og_title(&body).unwrap_or_else(|| ids.album_id.clone())
        } else {
            album.title
        };

        let photos = acc.into_photos();
        info!(
            album_id = ids.album_id.as_str(),
            photos = photos.len(),
            target,
            "album: metadata complete"
        );

        Ok(ExternalAlbumMetadata::new(
            AlbumSource::Flickr,
            &ids.album_id,
            &title,
            &album.description,
            photos,
            album.cover_url,
        ))
    }

    /// Chunked pagination over pages `2..=ceil(target / page_size)`. Ends
    /// early when the album is complete, a page fails, or a page contributes
    /// nothing new.
    async fn paginate(
        &self,
        ids: &ParsedAlbumUrl,
        acc: &mut PhotoAccumulator,
        page_size: usize,
        target: usize,
    ) {
        let total_pages = target.div_ceil(page_size);
        for page in 2..=total_pages {
            if self.policy.is_complete(acc.len(), target) {
                debug!(page, loaded = acc.len(), target, "album: complete enough, stopping");
                break;
            }

            let url = album_page_url(&ids.user_id, &ids.album_id, page);
            let body = match self.http.get(&url).await {
                Ok(resp) if resp.is_success() => resp.body,
                Ok(resp) => {
                    warn!(url = url.as_str(), status = resp.status, "album: page fetch failed, keeping partial result");
                    break;
                }
                Err(e) => {
                    warn!(url = url.as_str(), error = %e, "album: page fetch failed, keeping partial result");
                    break;
                }
            };

            let page_photos = extract_embedded_json(&body, MODEL_EXPORT_MARKER)
                .map(|state| collect_photos(&state))
                .unwrap_or_default();
            let anchor = page_photos
                .first()
                .map(|p| p.id.clone())
                .or_else(|| first_photo_id_in_html(&body, &ids.album_id));
            let Some(anchor) = anchor else {
                info!(page, "album: page has no photos, treating as end of album");
                break;
            };

            let chunk = self.fetch_anchored(ids, &anchor).await.unwrap_or_default();
            let added = acc.extend(page_photos) + acc.extend(chunk);
            if added == 0 {
                info!(page, loaded = acc.len(), "album: no new photos, treating as end of album");
                break;
            }

            debug!(page, added, loaded = acc.len(), "album: chunk merged");
            self.report(acc.len(), target);
        }
    }

    /// Photos from the album-context photo page for `photo_id`. Failures are
    /// not fatal; the caller carries on with what it has.
    async fn fetch_anchored(&self, ids: &ParsedAlbumUrl, photo_id: &str) -> Option<Vec<ExternalPhoto>> {
        let url = anchored_photo_url(&ids.user_id, photo_id, &ids.album_id);
        let resp = match self.http.get(&url).await {
            Ok(resp) if resp.is_success() => resp,
            Ok(resp) => {
                debug!(url = url.as_str(), status = resp.status, "album: anchored fetch failed");
                return None;
            }
            Err(e) => {
                debug!(url = url.as_str(), error = %e, "album: anchored fetch failed");
                return None;
            }
        };
        let state = extract_embedded_json(&resp.body, MODEL_EXPORT_MARKER)?;
        Some(collect_photos(&state))
    }

    /// Follow a short link to the album it names. When the redirect lands on
    /// the album page itself its body is returned for reuse as page 1.
    async fn resolve_short_link(&self, parsed: &ParsedAlbumUrl) -> Result<(ParsedAlbumUrl, Option<String>)> {
        let resp = self.http.get(&parsed.original_url).await?;
        if !resp.is_success() {
            return Err(AlbumSyncError::Fetch {
                url: parsed.original_url.clone(),
                status: resp.status,
            });
        }

        let landed = parse_album_url(&resp.url).filter(|p| !p.is_short_url);
        let (resolved, landed_on_album) = match landed {
            Some(resolved) => (resolved, true),
            None => {
                let resolved = ALBUM_LINK_RE
                    .find_iter(&resp.body)
                    .find_map(|m| parse_album_url(m.as_str()).filter(|p| !p.is_short_url))
                    .ok_or_else(|| AlbumSyncError::UrlParse {
                        provider: AlbumSource::Flickr,
                        url: parsed.original_url.clone(),
                    })?;
                (resolved, false)
            }
        };

        info!(
            short_url = parsed.original_url.as_str(),
            user_id = resolved.user_id.as_str(),
            album_id = resolved.album_id.as_str(),
            "album: short link resolved"
        );

        let ids = ParsedAlbumUrl {
            original_url: parsed.original_url.clone(),
            expected_photo_count: parsed.expected_photo_count,
            ..resolved
        };
        let body = landed_on_album.then_some(resp.body);
        Ok((ids, body))
    }

    fn report(&self, loaded: usize, target: usize) {
        (self.on_progress)(FetchProgress::new(loaded, Some(target)));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::{json, Value};

    use super::*;
    use crate::testing::MockHttpFetcher;

    const USER: &str = "boltonramblers";
    const ALBUM: &str = "72177720300000001";

    fn photo(id: usize, title: &str) -> Value {
        json!({
            "id": id.to_string(),
            "title": title,
            "sizes": {"l": {"url": format!("//live.staticflickr.com/65535/{id}_b.jpg")}}
        })
    }

    fn photos(range: std::ops::Range<usize>) -> Vec<Value> {
        range.map(|i| photo(i, &format!("Walk {}", i % 3))).collect()
    }

    fn html(state: Value) -> String {
        format!(
            "<html><head><meta property=\"og:title\" content=\"Fallback\"></head><body>\
             <script>root.YUI_config.flickr.request = {{}};\nmodelExport: {state},\nauth: {{}}</script>\
             </body></html>"
        )
    }

    fn album_page(total: usize, list: Vec<Value>) -> String {
        html(json!({
            "main": {
                "album-models": [{
                    "data": {
                        "id": ALBUM,
                        "title": "Bolton Ramblers 2026",
                        "description": "Spring walks",
                        "photoCount": total,
                        "photoPageList": {"data": {"_data": list}}
                    }
                }]
            }
        }))
    }

    fn listing_page(list: Vec<Value>) -> String {
        html(json!({"main": {"photo-list": {"_data": list}}}))
    }

    fn first_page_url() -> String {
        album_url(USER, ALBUM)
    }

    async fn scrape(http: &MockHttpFetcher, parsed: ParsedAlbumUrl) -> (Result<ExternalAlbumMetadata>, Vec<FetchProgress>) {
        let seen = Mutex::new(Vec::new());
        let on_progress = |p: FetchProgress| seen.lock().unwrap().push(p);
        let result = AlbumScraper::new(http, CompletenessPolicy::default(), &on_progress)
            .fetch(&parsed)
            .await;
        (result, seen.into_inner().unwrap())
    }

    fn ids(meta: &ExternalAlbumMetadata) -> Vec<String> {
        meta.photos.iter().map(|p| p.id.clone()).collect()
    }

    #[tokio::test]
    async fn small_album_needs_one_page() {
        let http = MockHttpFetcher::new().on_page(&first_page_url(), album_page(3, photos(0..3)));
        let (result, progress) = scrape(&http, ParsedAlbumUrl::new(USER, ALBUM, "u")).await;
        let meta = result.unwrap();

        assert_eq!(meta.title, "Bolton Ramblers 2026");
        assert_eq!(meta.description, "Spring walks");
        assert_eq!(meta.photo_count, 3);
        assert_eq!(meta.photo_count, meta.photos.len());
        assert_eq!(meta.cover_photo_url.as_deref(), Some("https://live.staticflickr.com/65535/0_b.jpg"));
        assert_eq!(http.requested(), vec![first_page_url()]);
        assert_eq!(progress.last().unwrap().percent, 100);
    }

    #[tokio::test]
    async fn cover_photo_is_not_counted_as_a_list_photo() {
        let state = json!({
            "main": {
                "album-models": [{
                    "data": {
                        "id": ALBUM,
                        "title": "Bolton Ramblers 2026",
                        "photoCount": 3,
                        "coverPhoto": {"data": photo(99, "Cover")},
                        "photoPageList": {"data": {"_data": photos(0..3)}}
                    }
                }]
            }
        });
        let http = MockHttpFetcher::new().on_page(&first_page_url(), html(state));

        let (result, _) = scrape(&http, ParsedAlbumUrl::new(USER, ALBUM, "u")).await;
        let meta = result.unwrap();
        assert_eq!(ids(&meta), vec!["0", "1", "2"]);
        assert_eq!(meta.photo_count, 3);
        assert_eq!(http.requested(), vec![first_page_url()]);
    }

    #[tokio::test]
    async fn expanded_fetch_is_preferred_when_larger() {
        let http = MockHttpFetcher::new()
            .on_page(&first_page_url(), album_page(8, photos(0..3)))
            .on_page(&anchored_photo_url(USER, "0", ALBUM), listing_page(photos(0..8)));

        let (result, _) = scrape(&http, ParsedAlbumUrl::new(USER, ALBUM, "u")).await;
        let meta = result.unwrap();
        assert_eq!(meta.photo_count, 8);
        assert_eq!(ids(&meta), (0..8).map(|i| i.to_string()).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn chunks_merge_across_pages_without_duplicates() {
        // 3 per page, 9 declared. The anchored windows overlap the pages.
        let http = MockHttpFetcher::new()
            .on_page(&first_page_url(), album_page(9, photos(0..3)))
            .on_page(&anchored_photo_url(USER, "0", ALBUM), listing_page(photos(0..4)))
            .on_page(&album_page_url(USER, ALBUM, 2), listing_page(photos(3..6)))
            .on_page(&anchored_photo_url(USER, "3", ALBUM), listing_page(photos(3..7)))
            .on_page(&album_page_url(USER, ALBUM, 3), listing_page(photos(6..9)))
            .on_page(&anchored_photo_url(USER, "6", ALBUM), listing_page(photos(6..9)));

        let (result, progress) = scrape(&http, ParsedAlbumUrl::new(USER, ALBUM, "u")).await;
        let meta = result.unwrap();
        assert_eq!(ids(&meta), (0..9).map(|i| i.to_string()).collect::<Vec<_>>());
        assert_eq!(meta.photo_count, 9);
        assert!(progress.windows(2).all(|w| w[0].loaded <= w[1].loaded));
        assert_eq!(progress.last().unwrap().loaded, 9);
    }

    #[tokio::test]
    async fn expected_count_hint_drives_pagination() {
        let http = MockHttpFetcher::new()
            .on_page(&first_page_url(), album_page(0, photos(0..2)))
            .on_page(&anchored_photo_url(USER, "0", ALBUM), listing_page(photos(0..2)))
            .on_page(&album_page_url(USER, ALBUM, 2), listing_page(photos(2..4)))
            .on_page(&anchored_photo_url(USER, "2", ALBUM), listing_page(photos(2..4)));

        let parsed = ParsedAlbumUrl::new(USER, ALBUM, "u").with_expected_photo_count(Some(4));
        let (result, _) = scrape(&http, parsed).await;
        assert_eq!(result.unwrap().photo_count, 4);
    }

    #[tokio::test]
    async fn failed_later_page_keeps_partial_result() {
        let http = MockHttpFetcher::new()
            .on_page(&first_page_url(), album_page(9, photos(0..3)))
            .on_status(&album_page_url(USER, ALBUM, 2), 500);

        let (result, _) = scrape(&http, ParsedAlbumUrl::new(USER, ALBUM, "u")).await;
        let meta = result.unwrap();
        assert_eq!(meta.photo_count, 3);
        assert_eq!(http.request_count(&album_page_url(USER, ALBUM, 3)), 0);
    }

    #[tokio::test]
    async fn page_with_nothing_new_ends_pagination() {
        let http = MockHttpFetcher::new()
            .on_page(&first_page_url(), album_page(30, photos(0..3)))
            .on_page(&album_page_url(USER, ALBUM, 2), listing_page(photos(0..3)));

        let (result, _) = scrape(&http, ParsedAlbumUrl::new(USER, ALBUM, "u")).await;
        assert_eq!(result.unwrap().photo_count, 3);
        assert_eq!(http.request_count(&album_page_url(USER, ALBUM, 3)), 0);
    }

    #[tokio::test]
    async fn stops_once_ninety_five_percent_loaded() {
        // 20 declared, 19 after the expanded fetch: no pagination needed.
        let http = MockHttpFetcher::new()
            .on_page(&first_page_url(), album_page(20, photos(0..5)))
            .on_page(&anchored_photo_url(USER, "0", ALBUM), listing_page(photos(0..19)));

        let (result, _) = scrape(&http, ParsedAlbumUrl::new(USER, ALBUM, "u")).await;
        assert_eq!(result.unwrap().photo_count, 19);
        assert_eq!(http.request_count(&album_page_url(USER, ALBUM, 2)), 0);
    }

    #[tokio::test]
    async fn first_page_error_status_is_fetch_error() {
        let http = MockHttpFetcher::new().on_status(&first_page_url(), 404);
        let (result, _) = scrape(&http, ParsedAlbumUrl::new(USER, ALBUM, "u")).await;
        assert!(matches!(result, Err(AlbumSyncError::Fetch { status: 404, .. })));
    }

    #[tokio::test]
    async fn first_page_without_state_is_parse_error() {
        let http = MockHttpFetcher::new().on_page(&first_page_url(), "<html><body>Nothing here</body></html>");
        let (result, _) = scrape(&http, ParsedAlbumUrl::new(USER, ALBUM, "u")).await;
        assert!(matches!(result, Err(AlbumSyncError::Parse(_))));
    }

    #[tokio::test]
    async fn short_link_resolves_through_redirect() {
        let short = "https://flic.kr/s/aHBqjC1a2b";
        let http = MockHttpFetcher::new()
            .on_redirect(short, &first_page_url())
            .on_page(&first_page_url(), album_page(2, photos(0..2)));

        let (result, _) = scrape(&http, ParsedAlbumUrl::short(short)).await;
        let meta = result.unwrap();
        assert_eq!(meta.id, ALBUM);
        assert_eq!(meta.photo_count, 2);
        assert_eq!(http.requested(), vec![short.to_string()]);
    }

    #[tokio::test]
    async fn short_link_falls_back_to_album_link_in_body() {
        let short = "https://flic.kr/s/aHBqjC1a2b";
        let interstitial = format!("<a href=\"https://www.flickr.com/photos/{USER}/albums/{ALBUM}\">continue</a>");
        let http = MockHttpFetcher::new()
            .on_page(short, interstitial)
            .on_page(&first_page_url(), album_page(1, photos(0..1)));

        let (result, _) = scrape(&http, ParsedAlbumUrl::short(short)).await;
        assert_eq!(result.unwrap().id, ALBUM);
        assert_eq!(http.request_count(&first_page_url()), 1);
    }

    #[tokio::test]
    async fn untitled_album_falls_back_to_page_title() {
        let page = html(json!({"main": {"album-models": [{"id": ALBUM, "photoCount": 1, "list": photos(0..1)}]}}));
        let http = MockHttpFetcher::new().on_page(&first_page_url(), page);
        let (result, _) = scrape(&http, ParsedAlbumUrl::new(USER, ALBUM, "u")).await;
        assert_eq!(result.unwrap().title, "Fallback");
    }
}
