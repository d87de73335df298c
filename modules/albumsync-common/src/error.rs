use thiserror::Error;

use crate::types::AlbumSource;

pub type Result<T> = std::result::Result<T, AlbumSyncError>;

#[derive(Error, Debug)]
pub enum AlbumSyncError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No provider recognises URL: {0}")]
    ProviderDetection(String),

    #[error("Invalid {provider} album URL: {url}")]
    UrlParse { provider: AlbumSource, url: String },

    #[error("Fetch failed for {url} (status {status})")]
    Fetch { url: String, status: u16 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("{failed} of {total} imports failed")]
    PartialFailure { failed: usize, total: usize },

    #[error("Browser error: {0}")]
    Browser(String),
}

impl AlbumSyncError {
    /// Pipeline stage the error belongs to, carried on channel error events.
    pub fn stage(&self) -> &'static str {
        match self {
            AlbumSyncError::Validation(_) => "validation",
            AlbumSyncError::ProviderDetection(_) | AlbumSyncError::UrlParse { .. } => "detect",
            AlbumSyncError::Fetch { .. }
            | AlbumSyncError::Network(_)
            | AlbumSyncError::Browser(_) => "fetch",
            AlbumSyncError::Parse(_) => "parse",
            AlbumSyncError::Persistence(_) => "persist",
            AlbumSyncError::PartialFailure { .. } => "import",
        }
    }
}

impl From<serde_json::Error> for AlbumSyncError {
    fn from(err: serde_json::Error) -> Self {
        AlbumSyncError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_human_readable() {
        let err = AlbumSyncError::Fetch {
            url: "https://www.flickr.com/photos/u/albums/1".into(),
            status: 404,
        };
        assert_eq!(
            err.to_string(),
            "Fetch failed for https://www.flickr.com/photos/u/albums/1 (status 404)"
        );
        assert_eq!(
            AlbumSyncError::PartialFailure { failed: 2, total: 5 }.to_string(),
            "2 of 5 imports failed"
        );
    }

    #[test]
    fn stages_attribute_errors() {
        assert_eq!(AlbumSyncError::Validation("x".into()).stage(), "validation");
        assert_eq!(AlbumSyncError::Parse("x".into()).stage(), "parse");
        assert_eq!(AlbumSyncError::Persistence("x".into()).stage(), "persist");
    }
}
