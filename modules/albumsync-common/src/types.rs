use serde::{Deserialize, Serialize};

// --- Sources ---

/// Photo-hosting provider an album was fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlbumSource {
    Flickr,
}

impl std::fmt::Display for AlbumSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlbumSource::Flickr => write!(f, "flickr"),
        }
    }
}

/// Identifiers extracted from an album URL. For short links only
/// `original_url` is meaningful until the link has been resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedAlbumUrl {
    pub user_id: String,
    pub album_id: String,
    pub original_url: String,
    #[serde(default)]
    pub is_short_url: bool,
    #[serde(default)]
    pub expected_photo_count: Option<usize>,
}

impl ParsedAlbumUrl {
    pub fn new(user_id: &str, album_id: &str, original_url: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            album_id: album_id.to_string(),
            original_url: original_url.to_string(),
            is_short_url: false,
            expected_photo_count: None,
        }
    }

    pub fn short(original_url: &str) -> Self {
        Self {
            user_id: String::new(),
            album_id: String::new(),
            original_url: original_url.to_string(),
            is_short_url: true,
            expected_photo_count: None,
        }
    }

    pub fn with_expected_photo_count(mut self, count: Option<usize>) -> Self {
        self.expected_photo_count = count;
        self
    }
}

// --- Fetched albums ---

/// A single photo as seen on the provider. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalPhoto {
    pub id: String,
    pub title: String,
    pub url: String,
    pub thumbnail_url: String,
    /// Epoch millis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_taken: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalAlbumMetadata {
    pub source: AlbumSource,
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub photo_count: usize,
    pub photos: Vec<ExternalPhoto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_photo_url: Option<String>,
}

impl ExternalAlbumMetadata {
    /// Build metadata from a reconciled photo list. `photo_count` always
    /// mirrors `photos.len()`; the cover falls back to the first photo.
    pub fn new(
        source: AlbumSource,
        id: &str,
        title: &str,
        description: &str,
        photos: Vec<ExternalPhoto>,
        cover_photo_url: Option<String>,
    ) -> Self {
        let cover_photo_url = cover_photo_url
            .filter(|c| !c.is_empty())
            .or_else(|| photos.first().map(|p| p.url.clone()));
        Self {
            source,
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            photo_count: photos.len(),
            photos,
            cover_photo_url,
        }
    }
}

/// One row of a user's album listing, plus the caller's selection state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalAlbumSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub photo_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_photo_url: Option<String>,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub target_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_preview: Option<Vec<SplitAlbumPreviewEntry>>,
    #[serde(default)]
    pub split_preview_loading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_preview_error: Option<String>,
    #[serde(default)]
    pub split_album_paths: Vec<String>,
}

impl ExternalAlbumSummary {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            photo_count: 0,
            cover_photo_url: None,
            selected: false,
            target_path: String::new(),
            split_preview: None,
            split_preview_loading: false,
            split_preview_error: None,
            split_album_paths: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalUserAlbumsMetadata {
    pub source: AlbumSource,
    pub user_id: String,
    pub username: String,
    pub albums: Vec<ExternalAlbumSummary>,
    pub total_albums: usize,
}

/// Upper bound on sample photos attached to a split preview entry.
pub const MAX_PREVIEW_PHOTOS: usize = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitAlbumPreviewEntry {
    pub title: String,
    pub path: String,
    pub count: usize,
    #[serde(default = "default_included")]
    pub included: bool,
    #[serde(default)]
    pub preview_photos: Vec<ExternalPhoto>,
}

fn default_included() -> bool {
    true
}

// --- Progress ---

/// Incremental scrape progress reported after each page or chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchProgress {
    pub loaded: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<usize>,
    pub percent: u8,
}

impl FetchProgress {
    pub fn new(loaded: usize, target: Option<usize>) -> Self {
        let percent = match target {
            Some(t) if t > 0 => ((loaded.min(t) * 100) / t) as u8,
            _ => 0,
        };
        Self {
            loaded,
            target,
            percent,
        }
    }
}

// --- Import results ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalAlbumImportResult {
    pub success: bool,
    pub source: AlbumSource,
    pub album_name: String,
    pub page_content_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_metadata_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_content_id: Option<String>,
    pub photo_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ExternalAlbumImportResult {
    pub fn failed(source: AlbumSource, album_name: &str, path: &str, message: String) -> Self {
        Self {
            success: false,
            source,
            album_name: album_name.to_string(),
            page_content_path: path.to_string(),
            content_metadata_id: None,
            page_content_id: None,
            photo_count: 0,
            error_message: Some(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalBulkImportResult {
    pub success_count: usize,
    pub failure_count: usize,
    pub results: Vec<ExternalAlbumImportResult>,
}
