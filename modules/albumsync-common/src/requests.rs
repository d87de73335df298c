// Transient command objects carried on the progress channel. None of these
// are persisted; required fields are optional here so that a missing value
// surfaces as a validation error instead of a deserialization failure.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{AlbumSyncError, Result};
use crate::types::{AlbumSource, ExternalAlbumMetadata, ExternalAlbumSummary, SplitAlbumPreviewEntry};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchAlbumRequest {
    #[serde(default)]
    pub source: Option<AlbumSource>,
    #[serde(default)]
    pub album_url: Option<String>,
    #[serde(default)]
    pub expected_photo_count: Option<usize>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchUserAlbumsRequest {
    #[serde(default)]
    pub source: Option<AlbumSource>,
    /// A bare user id or any URL under the user's profile.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitPreviewRequest {
    #[serde(default)]
    pub source: Option<AlbumSource>,
    #[serde(default)]
    pub album_url: Option<String>,
    /// Disambiguates concurrent previews on one channel.
    #[serde(default)]
    pub album_id: Option<String>,
    #[serde(default)]
    pub base_path: Option<String>,
    #[serde(default)]
    pub expected_photo_count: Option<usize>,
    /// A preview from an earlier call; `included` choices are carried over by title.
    #[serde(default)]
    pub previous: Vec<SplitAlbumPreviewEntry>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ExternalAlbumImportRequest {
    pub source: AlbumSource,
    #[serde(default)]
    #[builder(default, setter(strip_option, into))]
    pub target_path: Option<String>,
    #[serde(default)]
    #[builder(default, setter(strip_option, into))]
    pub album_title: Option<String>,
    #[serde(default)]
    #[builder(default, setter(strip_option, into))]
    pub album_subtitle: Option<String>,
    #[serde(default)]
    #[builder(default)]
    pub split_by_photo_title: bool,
    #[serde(default)]
    #[builder(default, setter(strip_option))]
    pub split_album_paths: Option<Vec<String>>,
    #[serde(default)]
    #[builder(default)]
    pub use_template: bool,
    #[serde(default)]
    #[builder(default, setter(strip_option, into))]
    pub template_path: Option<String>,
    /// Metadata from a previous fetch. Import never re-scrapes.
    #[serde(default)]
    #[builder(default, setter(strip_option))]
    pub metadata: Option<ExternalAlbumMetadata>,
    #[serde(default)]
    #[builder(default, setter(strip_option, into))]
    pub context: Option<String>,
}

impl ExternalAlbumImportRequest {
    /// Check required fields before any network or persistence work.
    pub fn validate(&self) -> Result<(&str, &ExternalAlbumMetadata)> {
        let target = required(self.target_path.as_deref(), "targetPath")?;
        let metadata = self.metadata.as_ref().ok_or_else(|| {
            AlbumSyncError::Validation("album metadata must be fetched before import".into())
        })?;
        if self.use_template {
            required(self.template_path.as_deref(), "templatePath")?;
        }
        Ok((target, metadata))
    }

    /// Template path, only when templating was requested.
    pub fn template(&self) -> Option<&str> {
        if self.use_template {
            self.template_path.as_deref().filter(|p| !p.trim().is_empty())
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ExternalBulkImportRequest {
    pub source: AlbumSource,
    #[serde(default)]
    #[builder(default, setter(strip_option, into))]
    pub user_id: Option<String>,
    #[serde(default)]
    #[builder(default, setter(strip_option, into))]
    pub base_path: Option<String>,
    #[serde(default)]
    #[builder(default)]
    pub albums: Vec<ExternalAlbumSummary>,
    #[serde(default)]
    #[builder(default)]
    pub split_by_photo_title: bool,
    #[serde(default)]
    #[builder(default)]
    pub use_template: bool,
    #[serde(default)]
    #[builder(default, setter(strip_option, into))]
    pub template_path: Option<String>,
    #[serde(default)]
    #[builder(default, setter(strip_option, into))]
    pub context: Option<String>,
}

impl ExternalBulkImportRequest {
    pub fn validate(&self) -> Result<(&str, &str)> {
        let user_id = required(self.user_id.as_deref(), "userId")?;
        let base_path = required(self.base_path.as_deref(), "basePath")?;
        if self.use_template {
            required(self.template_path.as_deref(), "templatePath")?;
        }
        Ok((user_id, base_path))
    }

    pub fn selected_albums(&self) -> impl Iterator<Item = &ExternalAlbumSummary> {
        self.albums.iter().filter(|a| a.selected)
    }
}

/// A required string field: present and not blank.
pub fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AlbumSyncError::Validation(format!("{field} is required")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ExternalAlbumMetadata {
        ExternalAlbumMetadata::new(AlbumSource::Flickr, "1", "Walks", "", Vec::new(), None)
    }

    #[test]
    fn import_requires_target_path() {
        let req = ExternalAlbumImportRequest::builder()
            .source(AlbumSource::Flickr)
            .metadata(metadata())
            .build();
        match req.validate() {
            Err(AlbumSyncError::Validation(msg)) => assert!(msg.contains("targetPath")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn import_requires_metadata() {
        let req = ExternalAlbumImportRequest::builder()
            .source(AlbumSource::Flickr)
            .target_path("gallery/walks")
            .build();
        assert!(matches!(req.validate(), Err(AlbumSyncError::Validation(_))));
    }

    #[test]
    fn blank_target_path_is_missing() {
        let req = ExternalAlbumImportRequest::builder()
            .source(AlbumSource::Flickr)
            .target_path("   ")
            .metadata(metadata())
            .build();
        assert!(req.validate().is_err());
    }

    #[test]
    fn template_only_when_requested() {
        let req = ExternalAlbumImportRequest::builder()
            .source(AlbumSource::Flickr)
            .template_path("templates/album")
            .build();
        assert_eq!(req.template(), None);
    }

    #[test]
    fn bulk_requires_user_and_base_path() {
        let req = ExternalBulkImportRequest::builder()
            .source(AlbumSource::Flickr)
            .user_id("ramblers")
            .build();
        match req.validate() {
            Err(AlbumSyncError::Validation(msg)) => assert!(msg.contains("basePath")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn import_request_deserializes_camel_case() {
        let json = r#"{
            "source": "flickr",
            "targetPath": "gallery/x",
            "splitByPhotoTitle": true,
            "splitAlbumPaths": ["gallery/x/a"]
        }"#;
        let req: ExternalAlbumImportRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.target_path.as_deref(), Some("gallery/x"));
        assert!(req.split_by_photo_title);
        assert_eq!(req.split_album_paths, Some(vec!["gallery/x/a".to_string()]));
        assert!(!req.use_template);
    }
}
