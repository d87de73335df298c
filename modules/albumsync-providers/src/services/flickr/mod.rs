// Flickr provider. Album pages are scraped over HTTP; user listings prefer a
// headless browser when one is configured.

mod album;
mod model;
mod urls;
mod user_albums;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use albumsync_common::{
    AlbumSource, ExternalAlbumMetadata, ExternalUserAlbumsMetadata, ParsedAlbumUrl, Result,
};

use crate::browser::HeadlessBrowser;
use crate::http::HttpFetcher;
use crate::provider::{AlbumProvider, ProgressFn};
use crate::settings::ScraperSettings;

use album::AlbumScraper;
use user_albums::UserAlbumsScraper;

pub struct FlickrProvider {
    http: Arc<dyn HttpFetcher>,
    browser: Option<Arc<dyn HeadlessBrowser>>,
    settings: ScraperSettings,
}

impl FlickrProvider {
    pub fn new(
        http: Arc<dyn HttpFetcher>,
        browser: Option<Arc<dyn HeadlessBrowser>>,
        settings: ScraperSettings,
    ) -> Self {
        info!(
            browser = browser.is_some(),
            threshold = settings.completeness.threshold,
            "FlickrProvider initialized"
        );
        Self {
            http,
            browser,
            settings,
        }
    }
}

#[async_trait]
impl AlbumProvider for FlickrProvider {
    fn source(&self) -> AlbumSource {
        AlbumSource::Flickr
    }

    fn recognizes(&self, url: &str) -> bool {
        urls::is_flickr_url(url)
    }

    fn parse_album_url(&self, url: &str) -> Option<ParsedAlbumUrl> {
        urls::parse_album_url(url)
    }

    fn parse_user_id(&self, input: &str) -> Option<String> {
        urls::parse_user_id(input)
    }

    fn album_identifiers(&self, user_id: &str, album_id: &str) -> ParsedAlbumUrl {
        ParsedAlbumUrl::new(user_id, album_id, &urls::album_url(user_id, album_id))
    }

    async fn fetch_album_metadata(
        &self,
        parsed: &ParsedAlbumUrl,
        on_progress: ProgressFn<'_>,
    ) -> Result<ExternalAlbumMetadata> {
        AlbumScraper::new(self.http.as_ref(), self.settings.completeness, on_progress)
            .fetch(parsed)
            .await
    }

    async fn fetch_user_albums(
        &self,
        user_id: &str,
        on_progress: ProgressFn<'_>,
    ) -> Result<ExternalUserAlbumsMetadata> {
        UserAlbumsScraper::new(
            self.http.as_ref(),
            self.browser.as_deref(),
            &self.settings,
            on_progress,
        )
        .fetch(user_id)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockHttpFetcher;

    #[tokio::test]
    async fn fetches_album_through_the_provider_contract() {
        let state = r#"{"main":{"album-models":[{"id":"1","title":"Walks","photoCount":1,
            "list":[{"id":"7","title":"Top","sizes":{"c":{"url":"https://live.staticflickr.com/7_c.jpg"}}}]}]}}"#;
        let http = MockHttpFetcher::new().on_page(
            "https://www.flickr.com/photos/u/albums/1",
            format!("<script>modelExport: {state}</script>"),
        );
        let provider = FlickrProvider::new(Arc::new(http), None, ScraperSettings::default());

        let parsed = provider.album_identifiers("u", "1");
        let meta = provider
            .fetch_album_metadata(&parsed, &|_: albumsync_common::FetchProgress| {})
            .await
            .unwrap();
        assert_eq!(meta.source, AlbumSource::Flickr);
        assert_eq!(meta.title, "Walks");
        assert_eq!(meta.photos[0].url, "https://live.staticflickr.com/7_c.jpg");
    }

    #[test]
    fn album_identifiers_build_canonical_url() {
        let provider = FlickrProvider::new(Arc::new(MockHttpFetcher::new()), None, Default::default());
        let parsed = provider.album_identifiers("u", "42");
        assert_eq!(parsed.original_url, "https://www.flickr.com/photos/u/albums/42");
        assert!(!parsed.is_short_url);
    }
}
