// Postgres content store. Documents are kept whole as JSONB next to their
// lookup key, so the free-form row payloads survive untouched.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use albumsync_common::content::{ContentMetadata, PageContent};
use albumsync_common::{AlbumSyncError, Result};

use crate::store::ContentStore;

pub struct PgContentStore {
    pool: PgPool,
}

fn db_error(err: sqlx::Error) -> AlbumSyncError {
    AlbumSyncError::Persistence(err.to_string())
}

fn parse_id(id: Option<&str>, what: &str) -> Result<Uuid> {
    id.and_then(|id| Uuid::parse_str(id).ok())
        .ok_or_else(|| AlbumSyncError::Persistence(format!("{what} has no valid id")))
}

impl PgContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AlbumSyncError::Persistence(e.to_string()))?;
        info!("Content store migrations complete");
        Ok(())
    }
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn find_page_by_path(&self, path: &str) -> Result<Option<PageContent>> {
        let row = sqlx::query_as::<_, (Uuid, Json<PageContent>)>(
            "SELECT id, document FROM content_pages WHERE path = $1",
        )
        .bind(path)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|(id, Json(mut page))| {
            page.id = Some(id.to_string());
            page
        }))
    }

    async fn create_page(&self, mut page: PageContent) -> Result<PageContent> {
        let id = Uuid::new_v4();
        page.id = Some(id.to_string());
        sqlx::query("INSERT INTO content_pages (id, path, document) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(&page.path)
            .bind(Json(&page))
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(page)
    }

    async fn save_page(&self, page: &PageContent) -> Result<()> {
        let id = parse_id(page.id.as_deref(), "page")?;
        let result = sqlx::query(
            r#"
            UPDATE content_pages
            SET path = $2, document = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&page.path)
        .bind(Json(page))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(AlbumSyncError::Persistence(format!("no stored page with id {id}")));
        }
        Ok(())
    }

    async fn find_metadata_by_name(&self, name: &str) -> Result<Option<ContentMetadata>> {
        let row = sqlx::query_as::<_, (Uuid, Json<ContentMetadata>)>(
            "SELECT id, document FROM content_metadata WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|(id, Json(mut metadata))| {
            metadata.id = Some(id.to_string());
            metadata
        }))
    }

    async fn create_metadata(&self, mut metadata: ContentMetadata) -> Result<ContentMetadata> {
        let id = Uuid::new_v4();
        metadata.id = Some(id.to_string());
        sqlx::query("INSERT INTO content_metadata (id, name, document) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(&metadata.name)
            .bind(Json(&metadata))
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(metadata)
    }

    async fn save_metadata(&self, metadata: &ContentMetadata) -> Result<()> {
        let id = parse_id(metadata.id.as_deref(), "content metadata")?;
        let result = sqlx::query(
            r#"
            UPDATE content_metadata
            SET name = $2, document = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&metadata.name)
        .bind(Json(metadata))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(AlbumSyncError::Persistence(format!(
                "no stored content metadata with id {id}"
            )));
        }
        Ok(())
    }
}
