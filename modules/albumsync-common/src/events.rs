// Message contract for the progress channel. Inbound frames are named
// commands; outbound frames are progress, error or completion events. Every
// outbound event carries the operation `context` (and `albumId` where one
// applies) so a single channel can multiplex overlapping operations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AlbumSyncError;
use crate::requests::{
    ExternalAlbumImportRequest, ExternalBulkImportRequest, FetchAlbumRequest,
    FetchUserAlbumsRequest, SplitPreviewRequest,
};
use crate::types::FetchProgress;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientCommand {
    #[serde(rename = "external-album:fetch")]
    FetchAlbum(FetchAlbumRequest),
    #[serde(rename = "external-album:fetch-user-albums")]
    FetchUserAlbums(FetchUserAlbumsRequest),
    #[serde(rename = "external-album:fetch-split-preview")]
    FetchSplitPreview(SplitPreviewRequest),
    #[serde(rename = "external-album:import")]
    ImportAlbum(ExternalAlbumImportRequest),
    #[serde(rename = "external-album:import-bulk")]
    ImportBulk(ExternalBulkImportRequest),
}

impl ClientCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ClientCommand::FetchAlbum(_) => "external-album:fetch",
            ClientCommand::FetchUserAlbums(_) => "external-album:fetch-user-albums",
            ClientCommand::FetchSplitPreview(_) => "external-album:fetch-split-preview",
            ClientCommand::ImportAlbum(_) => "external-album:import",
            ClientCommand::ImportBulk(_) => "external-album:import-bulk",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Progress(ProgressEvent),
    Error(ErrorEvent),
    Complete(CompleteEvent),
}

/// Which operation an event belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_id: Option<String>,
}

impl EventScope {
    pub fn new(context: Option<&str>, album_id: Option<&str>) -> Self {
        Self {
            context: context.map(String::from),
            album_id: album_id.map(String::from),
        }
    }

    /// Same context, narrowed to one album.
    pub fn for_album(&self, album_id: &str) -> Self {
        Self {
            context: self.context.clone(),
            album_id: Some(album_id.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub message: String,
    #[serde(flatten)]
    pub scope: EventScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loaded: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
    pub message: String,
    #[serde(flatten)]
    pub scope: EventScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteEvent {
    pub message: String,
    #[serde(flatten)]
    pub scope: EventScope,
    #[serde(default)]
    pub payload: Value,
}

impl ServerEvent {
    pub fn progress(scope: &EventScope, stage: &str, message: impl Into<String>) -> Self {
        ServerEvent::Progress(ProgressEvent {
            message: message.into(),
            scope: scope.clone(),
            stage: Some(stage.to_string()),
            loaded: None,
            target: None,
            percent: None,
        })
    }

    pub fn fetch_progress(scope: &EventScope, progress: FetchProgress) -> Self {
        let message = match progress.target {
            Some(target) => format!("Loaded {} of {} photos", progress.loaded, target),
            None => format!("Loaded {} photos", progress.loaded),
        };
        ServerEvent::Progress(ProgressEvent {
            message,
            scope: scope.clone(),
            stage: Some("fetch".to_string()),
            loaded: Some(progress.loaded),
            target: progress.target,
            percent: Some(progress.percent),
        })
    }

    /// Progress with an explicit overall percentage (split and bulk imports).
    pub fn percent(scope: &EventScope, stage: &str, percent: u8, message: impl Into<String>) -> Self {
        ServerEvent::Progress(ProgressEvent {
            message: message.into(),
            scope: scope.clone(),
            stage: Some(stage.to_string()),
            loaded: None,
            target: None,
            percent: Some(percent.min(100)),
        })
    }

    pub fn error(scope: &EventScope, err: &AlbumSyncError) -> Self {
        ServerEvent::Error(ErrorEvent {
            message: err.to_string(),
            scope: scope.clone(),
            stage: Some(err.stage().to_string()),
        })
    }

    pub fn complete(scope: &EventScope, message: impl Into<String>, payload: Value) -> Self {
        ServerEvent::Complete(CompleteEvent {
            message: message.into(),
            scope: scope.clone(),
            payload,
        })
    }
}

/// Destination for outbound events. Implementations must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ServerEvent);
}

/// Sink that drops everything, for callers that don't listen.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: ServerEvent) {}
}
