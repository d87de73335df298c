// Provider abstraction: a registry from source to the pair of operations
// every photo host must offer (URL parsing and metadata fetch). Pure
// dispatch; no network or persistence logic lives here.

use std::sync::Arc;

use async_trait::async_trait;

use albumsync_common::{
    AlbumSource, AlbumSyncError, ExternalAlbumMetadata, ExternalUserAlbumsMetadata, FetchProgress,
    ParsedAlbumUrl, Result,
};

/// Progress callback invoked after each page or chunk.
pub type ProgressFn<'a> = &'a (dyn Fn(FetchProgress) + Send + Sync);

#[async_trait]
pub trait AlbumProvider: Send + Sync {
    fn source(&self) -> AlbumSource;

    /// Whether `url` points at this provider at all, valid shape or not.
    fn recognizes(&self, url: &str) -> bool;

    /// Album identifiers from a full or short album URL.
    fn parse_album_url(&self, url: &str) -> Option<ParsedAlbumUrl>;

    /// User identifier from a bare id or any URL under the user's profile.
    fn parse_user_id(&self, input: &str) -> Option<String>;

    /// Identifiers for an album known by user and album id (bulk listings).
    fn album_identifiers(&self, user_id: &str, album_id: &str) -> ParsedAlbumUrl;

    async fn fetch_album_metadata(
        &self,
        parsed: &ParsedAlbumUrl,
        on_progress: ProgressFn<'_>,
    ) -> Result<ExternalAlbumMetadata>;

    async fn fetch_user_albums(
        &self,
        user_id: &str,
        on_progress: ProgressFn<'_>,
    ) -> Result<ExternalUserAlbumsMetadata>;
}

#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn AlbumProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: Arc<dyn AlbumProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn sources(&self) -> Vec<AlbumSource> {
        self.providers.iter().map(|p| p.source()).collect()
    }

    /// Explicit lookup by source.
    pub fn get(&self, source: AlbumSource) -> Result<Arc<dyn AlbumProvider>> {
        self.providers
            .iter()
            .find(|p| p.source() == source)
            .cloned()
            .ok_or_else(|| AlbumSyncError::ProviderDetection(format!("no provider registered for {source}")))
    }

    /// First provider whose `parse_album_url` accepts the URL. A URL that a
    /// provider recognises but cannot parse is a `UrlParse` error rather than
    /// a detection failure.
    pub fn detect(&self, url: &str) -> Result<(Arc<dyn AlbumProvider>, ParsedAlbumUrl)> {
        for provider in &self.providers {
            if let Some(parsed) = provider.parse_album_url(url) {
                return Ok((provider.clone(), parsed));
            }
        }
        if let Some(provider) = self.providers.iter().find(|p| p.recognizes(url)) {
            return Err(AlbumSyncError::UrlParse {
                provider: provider.source(),
                url: url.to_string(),
            });
        }
        Err(AlbumSyncError::ProviderDetection(url.to_string()))
    }

    /// Resolve an album URL against an explicit source when given, else by detection.
    pub fn resolve_album(
        &self,
        source: Option<AlbumSource>,
        url: &str,
    ) -> Result<(Arc<dyn AlbumProvider>, ParsedAlbumUrl)> {
        match source {
            Some(source) => {
                let provider = self.get(source)?;
                let parsed = provider.parse_album_url(url).ok_or_else(|| AlbumSyncError::UrlParse {
                    provider: source,
                    url: url.to_string(),
                })?;
                Ok((provider, parsed))
            }
            None => self.detect(url),
        }
    }

    /// Resolve a user id or profile URL against an explicit source, else by detection.
    pub fn resolve_user(
        &self,
        source: Option<AlbumSource>,
        input: &str,
    ) -> Result<(Arc<dyn AlbumProvider>, String)> {
        let candidates: Vec<&Arc<dyn AlbumProvider>> = match source {
            Some(source) => {
                let provider = self.providers.iter().find(|p| p.source() == source);
                match provider {
                    Some(p) => vec![p],
                    None => return Err(AlbumSyncError::ProviderDetection(format!("no provider registered for {source}"))),
                }
            }
            None => self.providers.iter().collect(),
        };

        for provider in candidates {
            if let Some(user_id) = provider.parse_user_id(input) {
                return Ok((provider.clone(), user_id));
            }
        }
        Err(AlbumSyncError::ProviderDetection(input.to_string()))
    }
}
