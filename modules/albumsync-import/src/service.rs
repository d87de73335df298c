// Command handlers for the progress channel. Each inbound command runs to
// completion on its own, reporting progress and exactly one terminal event
// (complete or error) to the sink it was given.

use std::sync::Arc;

use futures::future::join_all;
use serde_json::json;
use tracing::{info, warn};
use typed_builder::TypedBuilder;

use albumsync_common::requests::{
    required, ExternalAlbumImportRequest, ExternalBulkImportRequest, FetchAlbumRequest,
    FetchUserAlbumsRequest, SplitPreviewRequest,
};
use albumsync_common::{
    join_path, slugify, AlbumSource, AlbumSyncError, ClientCommand, EventScope, EventSink,
    ExternalAlbumImportResult, ExternalAlbumMetadata, ExternalAlbumSummary,
    ExternalBulkImportResult, ExternalUserAlbumsMetadata, FetchProgress, Result, ServerEvent,
    SplitAlbumPreviewEntry,
};
use albumsync_providers::{AlbumProvider, ProviderRegistry};

use crate::importer::{AlbumImporter, ImportOptions};
use crate::split::build_split_preview_entries;
use crate::store::ContentStore;

#[derive(TypedBuilder)]
pub struct AlbumSyncService {
    registry: ProviderRegistry,
    store: Arc<dyn ContentStore>,
}

impl AlbumSyncService {
    fn importer(&self) -> AlbumImporter {
        AlbumImporter::new(self.store.clone())
    }

    /// Providers this service can fetch from.
    pub fn sources(&self) -> Vec<AlbumSource> {
        self.registry.sources()
    }

    /// Run one command. Failures are reported on the sink, never returned.
    pub async fn handle(&self, command: ClientCommand, sink: &dyn EventSink) {
        let name = command.name();
        let scope = command_scope(&command);
        info!(command = name, context = ?scope.context, "command received");

        let outcome = match command {
            ClientCommand::FetchAlbum(req) => self.fetch_album(&req, sink, &scope).await.map(|_| ()),
            ClientCommand::FetchUserAlbums(req) => self.fetch_user_albums(&req, sink, &scope).await.map(|_| ()),
            ClientCommand::FetchSplitPreview(req) => self.fetch_split_preview(&req, sink, &scope).await.map(|_| ()),
            ClientCommand::ImportAlbum(req) => self.import_album(&req, sink, &scope).await.map(|_| ()),
            ClientCommand::ImportBulk(req) => self.import_bulk(&req, sink, &scope).await.map(|_| ()),
        };

        if let Err(e) = outcome {
            warn!(command = name, stage = e.stage(), error = %e, "command failed");
            sink.emit(ServerEvent::error(&scope, &e));
        }
    }

    pub async fn fetch_album(
        &self,
        request: &FetchAlbumRequest,
        sink: &dyn EventSink,
        scope: &EventScope,
    ) -> Result<ExternalAlbumMetadata> {
        let url = required(request.album_url.as_deref(), "albumUrl")?;
        let (provider, parsed) = self.registry.resolve_album(request.source, url)?;

        sink.emit(ServerEvent::progress(scope, "fetch", format!("Fetching album from {}", provider.source())));
        let metadata = fetch_metadata(
            provider.as_ref(),
            parsed.with_expected_photo_count(request.expected_photo_count),
            sink,
            scope,
        )
        .await?;

        sink.emit(ServerEvent::complete(
            scope,
            format!("Fetched {} photos from \"{}\"", metadata.photo_count, metadata.title),
            json!(metadata),
        ));
        Ok(metadata)
    }

    pub async fn fetch_user_albums(
        &self,
        request: &FetchUserAlbumsRequest,
        sink: &dyn EventSink,
        scope: &EventScope,
    ) -> Result<ExternalUserAlbumsMetadata> {
        let input = required(request.user_id.as_deref(), "userId")?;
        let (provider, user_id) = self.registry.resolve_user(request.source, input)?;

        sink.emit(ServerEvent::progress(scope, "fetch", format!("Loading albums for {user_id}")));
        let on_progress = |p: FetchProgress| {
            sink.emit(ServerEvent::percent(
                scope,
                "fetch",
                p.percent,
                format!("Found {} albums", p.target.unwrap_or(p.loaded)),
            ))
        };
        let albums = provider.fetch_user_albums(&user_id, &on_progress).await?;

        sink.emit(ServerEvent::complete(
            scope,
            format!("Found {} albums for {}", albums.total_albums, albums.username),
            json!(albums),
        ));
        Ok(albums)
    }

    pub async fn fetch_split_preview(
        &self,
        request: &SplitPreviewRequest,
        sink: &dyn EventSink,
        scope: &EventScope,
    ) -> Result<Vec<SplitAlbumPreviewEntry>> {
        let url = required(request.album_url.as_deref(), "albumUrl")?;
        let base_path = required(request.base_path.as_deref(), "basePath")?;
        let (provider, parsed) = self.registry.resolve_album(request.source, url)?;

        let metadata = fetch_metadata(
            provider.as_ref(),
            parsed.with_expected_photo_count(request.expected_photo_count),
            sink,
            scope,
        )
        .await?;
        let entries = build_split_preview_entries(base_path, &metadata, &request.previous);

        sink.emit(ServerEvent::complete(
            scope,
            format!("{} photos split into {} albums", metadata.photo_count, entries.len()),
            json!({
                "albumId": request.album_id.clone().unwrap_or_else(|| metadata.id.clone()),
                "entries": entries,
                "metadata": metadata,
            }),
        ));
        Ok(entries)
    }

    pub async fn import_album(
        &self,
        request: &ExternalAlbumImportRequest,
        sink: &dyn EventSink,
        scope: &EventScope,
    ) -> Result<ExternalAlbumImportResult> {
        let (options, metadata) = ImportOptions::from_request(request)?;
        let result = self.importer().import(metadata, &options, sink, scope).await?;

        let message = match &result.error_message {
            Some(error) => format!("Imported to {} with errors: {error}", result.page_content_path),
            None => format!("Imported {} photos to {}", result.photo_count, result.page_content_path),
        };
        sink.emit(ServerEvent::complete(scope, message, json!(result)));
        Ok(result)
    }

    pub async fn import_bulk(
        &self,
        request: &ExternalBulkImportRequest,
        sink: &dyn EventSink,
        scope: &EventScope,
    ) -> Result<ExternalBulkImportResult> {
        let (user_id, base_path) = request.validate()?;
        let provider = self.registry.get(request.source)?;
        let albums: Vec<&ExternalAlbumSummary> = request.selected_albums().collect();
        if albums.is_empty() {
            return Err(AlbumSyncError::Validation("no albums selected for import".into()));
        }

        let total = albums.len();
        info!(user_id, base_path, albums = total, "bulk import started");

        let targets = bulk_target_paths(base_path, &albums);
        let pipelines = albums.into_iter().zip(targets).enumerate().map(|(index, (summary, target))| {
            let provider = provider.clone();
            async move {
                let album_scope = scope.for_album(&summary.id);
                sink.emit(ServerEvent::percent(
                    &album_scope,
                    "fetch",
                    (index * 100 / total) as u8,
                    format!("Fetching \"{}\" ({}/{})", summary.title, index + 1, total),
                ));

                let outcome = self
                    .import_listed_album(provider.as_ref(), user_id, summary, &target, request, sink, &album_scope)
                    .await;
                match outcome {
                    Ok(result) => {
                        sink.emit(ServerEvent::progress(
                            &album_scope,
                            "persist",
                            format!("Imported \"{}\" to {}", summary.title, result.page_content_path),
                        ));
                        result
                    }
                    Err(e) => {
                        warn!(album_id = summary.id.as_str(), error = %e, "bulk import: album failed");
                        sink.emit(ServerEvent::error(&album_scope, &e));
                        ExternalAlbumImportResult::failed(request.source, &summary.title, &target, e.to_string())
                    }
                }
            }
        });
        let results = join_all(pipelines).await;

        let success_count = results.iter().filter(|r| r.success).count();
        let summary = ExternalBulkImportResult {
            success_count,
            failure_count: results.len() - success_count,
            results,
        };
        info!(
            succeeded = summary.success_count,
            failed = summary.failure_count,
            "bulk import finished"
        );

        sink.emit(ServerEvent::complete(
            scope,
            format!(
                "Imported {} of {} albums",
                summary.success_count,
                summary.success_count + summary.failure_count
            ),
            json!(summary),
        ));
        Ok(summary)
    }

    #[allow(clippy::too_many_arguments)]
    async fn import_listed_album(
        &self,
        provider: &dyn AlbumProvider,
        user_id: &str,
        summary: &ExternalAlbumSummary,
        target: &str,
        request: &ExternalBulkImportRequest,
        sink: &dyn EventSink,
        scope: &EventScope,
    ) -> Result<ExternalAlbumImportResult> {
        let expected = (summary.photo_count > 0).then_some(summary.photo_count);
        let parsed = provider
            .album_identifiers(user_id, &summary.id)
            .with_expected_photo_count(expected);
        let metadata = fetch_metadata(provider, parsed, sink, scope).await?;

        let options = ImportOptions {
            target_path: target.to_string(),
            album_title: Some(summary.title.clone()).filter(|t| !t.trim().is_empty()),
            album_subtitle: None,
            template_path: if request.use_template {
                request.template_path.clone()
            } else {
                None
            },
            split_by_photo_title: request.split_by_photo_title,
            split_album_paths: Some(summary.split_album_paths.clone()),
        };
        self.importer().import(&metadata, &options, sink, scope).await
    }
}

async fn fetch_metadata(
    provider: &dyn AlbumProvider,
    parsed: albumsync_common::ParsedAlbumUrl,
    sink: &dyn EventSink,
    scope: &EventScope,
) -> Result<ExternalAlbumMetadata> {
    let on_progress = |p: FetchProgress| sink.emit(ServerEvent::fetch_progress(scope, p));
    provider.fetch_album_metadata(&parsed, &on_progress).await
}

/// The summary's own target path when it already lives under `base_path`,
/// otherwise `base_path` joined with the target path or the title's slug.
pub fn bulk_target_path(base_path: &str, summary: &ExternalAlbumSummary) -> String {
    let base = base_path.trim().trim_end_matches('/');
    let target = summary.target_path.trim().trim_matches('/');
    if !target.is_empty() {
        if target == base || target.starts_with(&format!("{base}/")) {
            return target.to_string();
        }
        return join_path(base, target);
    }
    let slug = match slugify(&summary.title) {
        s if s.is_empty() => summary.id.clone(),
        s => s,
    };
    join_path(base, &slug)
}

/// Target paths for a bulk selection, in order. A path already handed to an
/// earlier album gets the first free `-N` suffix, starting at 2.
pub fn bulk_target_paths(base_path: &str, albums: &[&ExternalAlbumSummary]) -> Vec<String> {
    let mut assigned: Vec<String> = Vec::with_capacity(albums.len());
    for summary in albums {
        let wanted = bulk_target_path(base_path, summary);
        let mut target = wanted.clone();
        let mut n = 2;
        while assigned.contains(&target) {
            target = format!("{wanted}-{n}");
            n += 1;
        }
        assigned.push(target);
    }
    assigned
}

fn command_scope(command: &ClientCommand) -> EventScope {
    match command {
        ClientCommand::FetchAlbum(r) => EventScope::new(r.context.as_deref(), None),
        ClientCommand::FetchUserAlbums(r) => EventScope::new(r.context.as_deref(), None),
        ClientCommand::FetchSplitPreview(r) => EventScope::new(r.context.as_deref(), r.album_id.as_deref()),
        ClientCommand::ImportAlbum(r) => EventScope::new(
            r.context.as_deref(),
            r.metadata.as_ref().map(|m| m.id.as_str()),
        ),
        ClientCommand::ImportBulk(r) => EventScope::new(r.context.as_deref(), None),
    }
}
