// Import orchestrator. Turns fetched album metadata into a content-metadata
// document plus a page with an album block, either once for the whole album
// or once per split group with an index page at the original path.
//
// Every write is create-or-update keyed by path (pages) or name (metadata),
// so re-running an import mutates the same documents.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tracing::{info, warn};

use albumsync_common::content::{
    AlbumData, AlbumIndex, ContentMetadata, ContentMetadataItem, PageContent, PageContentRow,
    PageContentType, ALBUM_ROOT_FOLDER,
};
use albumsync_common::requests::ExternalAlbumImportRequest;
use albumsync_common::{
    AlbumSource, AlbumSyncError, EventScope, EventSink, ExternalAlbumImportResult,
    ExternalAlbumMetadata, ExternalPhoto, Result, ServerEvent,
};

use crate::split::{split_album, SplitGroup};
use crate::store::ContentStore;

/// Where and how one album is written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportOptions {
    pub target_path: String,
    pub album_title: Option<String>,
    pub album_subtitle: Option<String>,
    pub template_path: Option<String>,
    pub split_by_photo_title: bool,
    /// Split paths to import. `None` or empty imports every group.
    pub split_album_paths: Option<Vec<String>>,
}

impl ImportOptions {
    /// Options from a validated single-import request.
    pub fn from_request(request: &ExternalAlbumImportRequest) -> Result<(Self, &ExternalAlbumMetadata)> {
        let (target, metadata) = request.validate()?;
        let target = target.trim_matches('/');
        if target.is_empty() {
            return Err(AlbumSyncError::Validation("targetPath must name a page".into()));
        }
        let options = Self {
            target_path: target.to_string(),
            album_title: non_blank(request.album_title.as_deref()),
            album_subtitle: non_blank(request.album_subtitle.as_deref()),
            template_path: request.template().map(String::from),
            split_by_photo_title: request.split_by_photo_title,
            split_album_paths: request.split_album_paths.clone(),
        };
        Ok((options, metadata))
    }

    fn selects(&self, path: &str) -> bool {
        match &self.split_album_paths {
            Some(paths) if !paths.is_empty() => paths.iter().any(|p| p == path),
            _ => true,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

#[derive(Clone)]
pub struct AlbumImporter {
    store: Arc<dyn ContentStore>,
}

impl AlbumImporter {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Import `metadata`, splitting by photo title when asked and when the
    /// split yields more than one group.
    pub async fn import(
        &self,
        metadata: &ExternalAlbumMetadata,
        options: &ImportOptions,
        sink: &dyn EventSink,
        scope: &EventScope,
    ) -> Result<ExternalAlbumImportResult> {
        if options.split_by_photo_title {
            let groups = split_album(&options.target_path, metadata);
            if groups.len() > 1 {
                return self.import_split(metadata, groups, options, sink, scope).await;
            }
        }

        sink.emit(ServerEvent::progress(
            scope,
            "persist",
            format!("Importing {} photos to {}", metadata.photos.len(), options.target_path),
        ));
        self.import_single(metadata, options).await
    }

    /// Create or update the content metadata and page for one album.
    pub async fn import_single(
        &self,
        metadata: &ExternalAlbumMetadata,
        options: &ImportOptions,
    ) -> Result<ExternalAlbumImportResult> {
        let target = options.target_path.as_str();
        let metadata_id = self.upsert_metadata(target, metadata).await?;

        let album = AlbumData {
            created_at: Some(Utc::now().timestamp_millis()),
            ..AlbumData::new(
                target,
                options.album_title.as_deref().unwrap_or(&metadata.title),
                options.album_subtitle.as_deref().unwrap_or_default(),
                &metadata.description,
            )
        };
        let page_id = self.upsert_album_page(target, album, options.template_path.as_deref()).await?;

        info!(
            target_path = target,
            album_id = metadata.id.as_str(),
            photos = metadata.photos.len(),
            "import: album written"
        );

        Ok(ExternalAlbumImportResult {
            success: true,
            source: metadata.source,
            album_name: options.album_title.clone().unwrap_or_else(|| metadata.title.clone()),
            page_content_path: target.to_string(),
            content_metadata_id: metadata_id,
            page_content_id: page_id,
            photo_count: metadata.photos.len(),
            error_message: None,
        })
    }

    async fn import_split(
        &self,
        metadata: &ExternalAlbumMetadata,
        groups: Vec<SplitGroup>,
        options: &ImportOptions,
        sink: &dyn EventSink,
        scope: &EventScope,
    ) -> Result<ExternalAlbumImportResult> {
        let selected: Vec<SplitGroup> = groups
            .into_iter()
            .filter(|g| options.selects(&g.entry.path))
            .collect();
        if selected.is_empty() {
            return Err(AlbumSyncError::Validation(
                "splitAlbumPaths matched none of the album's split groups".into(),
            ));
        }

        let total = selected.len();
        let heading = options.album_title.clone().unwrap_or_else(|| metadata.title.clone());
        info!(target_path = options.target_path.as_str(), entries = total, "import: split import started");

        let imports = selected.into_iter().enumerate().map(|(index, group)| {
            let heading = heading.clone();
            async move {
                sink.emit(ServerEvent::percent(
                    scope,
                    "persist",
                    (index * 100 / total) as u8,
                    format!("Importing {} ({}/{})", group.entry.title, index + 1, total),
                ));
                let entry_metadata = split_metadata(metadata.source, metadata, &group.entry.title, group.photos);
                let entry_options = ImportOptions {
                    target_path: group.entry.path.clone(),
                    album_title: None,
                    album_subtitle: Some(heading),
                    template_path: options.template_path.clone(),
                    split_by_photo_title: false,
                    split_album_paths: None,
                };
                let outcome = self.import_single(&entry_metadata, &entry_options).await;
                if let Err(e) = &outcome {
                    warn!(path = group.entry.path.as_str(), error = %e, "import: split entry failed");
                }
                outcome
            }
        });
        let outcomes = join_all(imports).await;

        let succeeded: Vec<&ExternalAlbumImportResult> = outcomes.iter().filter_map(|o| o.as_ref().ok()).collect();
        let failed = total - succeeded.len();
        let photo_count: usize = succeeded.iter().map(|r| r.photo_count).sum();

        if succeeded.is_empty() {
            let first_error = outcomes
                .iter()
                .find_map(|o| o.as_ref().err())
                .map(|e| e.to_string())
                .unwrap_or_default();
            return Ok(ExternalAlbumImportResult::failed(
                metadata.source,
                &heading,
                &options.target_path,
                format!("all {total} split albums failed: {first_error}"),
            ));
        }

        let index_id = self.upsert_index_page(&options.target_path).await?;
        sink.emit(ServerEvent::percent(
            scope,
            "persist",
            100,
            format!("Imported {} of {} split albums", succeeded.len(), total),
        ));

        Ok(ExternalAlbumImportResult {
            success: failed == 0,
            source: metadata.source,
            album_name: heading,
            page_content_path: options.target_path.clone(),
            content_metadata_id: None,
            page_content_id: index_id,
            photo_count,
            error_message: (failed > 0).then(|| AlbumSyncError::PartialFailure { failed, total }.to_string()),
        })
    }

    async fn upsert_metadata(&self, name: &str, metadata: &ExternalAlbumMetadata) -> Result<Option<String>> {
        let files: Vec<ContentMetadataItem> = metadata.photos.iter().map(content_item).collect();
        let cover = metadata.cover_photo_url.clone();

        match self.store.find_metadata_by_name(name).await? {
            Some(mut existing) => {
                existing.files = files;
                existing.cover_image = cover;
                self.store.save_metadata(&existing).await?;
                Ok(existing.id)
            }
            None => {
                let created = self
                    .store
                    .create_metadata(ContentMetadata {
                        id: None,
                        name: name.to_string(),
                        root_folder: ALBUM_ROOT_FOLDER.to_string(),
                        base_href: None,
                        files,
                        cover_image: cover,
                        image_tags: Vec::new(),
                    })
                    .await?;
                Ok(created.id)
            }
        }
    }

    async fn upsert_album_page(&self, path: &str, album: AlbumData, template: Option<&str>) -> Result<Option<String>> {
        if let Some(mut page) = self.store.find_page_by_path(path).await? {
            match page.album_row_named(&album.name) {
                Some(i) => {
                    let row = &mut page.rows[i];
                    row.carousel = Some(match &row.carousel {
                        Some(existing) => existing.merged_with(&album),
                        None => album,
                    });
                }
                None => page.rows.push(PageContentRow::album(album)),
            }
            self.store.save_page(&page).await?;
            return Ok(page.id);
        }

        let rows = match template {
            Some(template_path) => match self.store.find_page_by_path(template_path).await? {
                Some(template_page) => rows_from_template(template_page.rows, album),
                None => {
                    warn!(template_path, path, "import: template page not found, creating plain page");
                    vec![PageContentRow::album(album)]
                }
            },
            None => vec![PageContentRow::album(album)],
        };
        let created = self.store.create_page(PageContent::new(path, rows)).await?;
        Ok(created.id)
    }

    /// Page at `path` listing every content path that starts with it.
    async fn upsert_index_page(&self, path: &str) -> Result<Option<String>> {
        let index = AlbumIndex::starts_with(path);
        match self.store.find_page_by_path(path).await? {
            Some(mut page) => {
                match page.first_album_index_row() {
                    Some(i) => page.rows[i].album_index = Some(index),
                    None => page.rows.push(PageContentRow::album_index(index)),
                }
                self.store.save_page(&page).await?;
                Ok(page.id)
            }
            None => {
                let page = PageContent::new(path, vec![PageContentRow::album_index(index)]);
                Ok(self.store.create_page(page).await?.id)
            }
        }
    }
}

/// Template rows with the first album block pointed at `album`, keeping the
/// template's display settings. Appends a block when the template has none.
fn rows_from_template(mut rows: Vec<PageContentRow>, album: AlbumData) -> Vec<PageContentRow> {
    let first_album = rows.iter().position(|row| row.row_type == PageContentType::Album);
    match first_album {
        Some(i) => {
            let row = &mut rows[i];
            row.carousel = Some(match &row.carousel {
                Some(template_album) => AlbumData {
                    created_at: album.created_at,
                    ..template_album.merged_with(&album)
                },
                None => album,
            });
        }
        None => rows.push(PageContentRow::album(album)),
    }
    rows
}

fn content_item(photo: &ExternalPhoto) -> ContentMetadataItem {
    ContentMetadataItem {
        image: photo.url.clone(),
        text: photo.title.clone(),
        date: photo.date_taken,
        original_file_name: None,
    }
}

fn split_metadata(
    source: AlbumSource,
    parent: &ExternalAlbumMetadata,
    title: &str,
    photos: Vec<ExternalPhoto>,
) -> ExternalAlbumMetadata {
    ExternalAlbumMetadata::new(source, &parent.id, title, &parent.description, photos, None)
}
