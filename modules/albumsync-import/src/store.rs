// Content store seam. Pages are keyed by path, content metadata by name; the
// store is the only source of truth for import idempotency.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use albumsync_common::content::{ContentMetadata, PageContent};
use albumsync_common::{AlbumSyncError, Result};

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn find_page_by_path(&self, path: &str) -> Result<Option<PageContent>>;

    /// Persist a new page and return it with its assigned id.
    async fn create_page(&self, page: PageContent) -> Result<PageContent>;

    /// Overwrite an existing page, matched by id.
    async fn save_page(&self, page: &PageContent) -> Result<()>;

    async fn find_metadata_by_name(&self, name: &str) -> Result<Option<ContentMetadata>>;

    async fn create_metadata(&self, metadata: ContentMetadata) -> Result<ContentMetadata>;

    async fn save_metadata(&self, metadata: &ContentMetadata) -> Result<()>;
}

/// Process-local store used when no database is configured, and in tests.
#[derive(Default)]
pub struct MemoryContentStore {
    pages: RwLock<HashMap<String, PageContent>>,
    metadata: RwLock<HashMap<String, ContentMetadata>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a page, e.g. a template. Assigns an id when missing.
    pub async fn insert_page(&self, mut page: PageContent) -> PageContent {
        page.id.get_or_insert_with(|| Uuid::new_v4().to_string());
        self.pages.write().await.insert(page.path.clone(), page.clone());
        page
    }

    pub async fn pages(&self) -> Vec<PageContent> {
        let mut pages: Vec<PageContent> = self.pages.read().await.values().cloned().collect();
        pages.sort_by(|a, b| a.path.cmp(&b.path));
        pages
    }

    pub async fn metadata(&self) -> Vec<ContentMetadata> {
        let mut docs: Vec<ContentMetadata> = self.metadata.read().await.values().cloned().collect();
        docs.sort_by(|a, b| a.name.cmp(&b.name));
        docs
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn find_page_by_path(&self, path: &str) -> Result<Option<PageContent>> {
        Ok(self.pages.read().await.get(path).cloned())
    }

    async fn create_page(&self, mut page: PageContent) -> Result<PageContent> {
        let mut pages = self.pages.write().await;
        if pages.contains_key(&page.path) {
            return Err(AlbumSyncError::Persistence(format!("page already exists at {}", page.path)));
        }
        page.id = Some(Uuid::new_v4().to_string());
        pages.insert(page.path.clone(), page.clone());
        Ok(page)
    }

    async fn save_page(&self, page: &PageContent) -> Result<()> {
        let mut pages = self.pages.write().await;
        let existing = pages
            .iter()
            .find(|(_, p)| p.id.is_some() && p.id == page.id)
            .map(|(path, _)| path.clone())
            .ok_or_else(|| AlbumSyncError::Persistence(format!("no stored page with id {:?}", page.id)))?;
        pages.remove(&existing);
        pages.insert(page.path.clone(), page.clone());
        Ok(())
    }

    async fn find_metadata_by_name(&self, name: &str) -> Result<Option<ContentMetadata>> {
        Ok(self.metadata.read().await.get(name).cloned())
    }

    async fn create_metadata(&self, mut metadata: ContentMetadata) -> Result<ContentMetadata> {
        let mut docs = self.metadata.write().await;
        if docs.contains_key(&metadata.name) {
            return Err(AlbumSyncError::Persistence(format!(
                "content metadata already exists for {}",
                metadata.name
            )));
        }
        metadata.id = Some(Uuid::new_v4().to_string());
        docs.insert(metadata.name.clone(), metadata.clone());
        Ok(metadata)
    }

    async fn save_metadata(&self, metadata: &ContentMetadata) -> Result<()> {
        let mut docs = self.metadata.write().await;
        match docs.get_mut(&metadata.name) {
            Some(existing) if existing.id.is_some() && existing.id == metadata.id => {
                *existing = metadata.clone();
                Ok(())
            }
            _ => Err(AlbumSyncError::Persistence(format!(
                "no stored content metadata {} with id {:?}",
                metadata.name, metadata.id
            ))),
        }
    }
}
