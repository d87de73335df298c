use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use albumsync_common::Config;
use albumsync_import::{AlbumSyncService, ContentStore, MemoryContentStore, PgContentStore};
use albumsync_providers::{
    BrowserlessBrowser, FlickrProvider, HeadlessBrowser, HttpFetcher, ProviderRegistry,
    ReqwestFetcher, ScraperSettings,
};
use albumsync_server::routes;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting albumsync-server");

    let config = Config::from_env();
    config.log_redacted();

    // Content store: Postgres when configured, otherwise in-process
    let store: Arc<dyn ContentStore> = match &config.database_url {
        Some(database_url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Connected to database");

            let store = PgContentStore::new(pool);
            store.migrate().await?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, imports will not survive a restart");
            Arc::new(MemoryContentStore::new())
        }
    };

    let http: Arc<dyn HttpFetcher> = Arc::new(ReqwestFetcher::new(
        &config.user_agent,
        Duration::from_secs(config.http_timeout_secs),
    )?);

    let browser: Option<Arc<dyn HeadlessBrowser>> = config.browserless_url.as_deref().map(|url| {
        tracing::info!(url, "Headless browser enabled");
        Arc::new(BrowserlessBrowser::new(
            url,
            config.browserless_token.as_deref(),
            &config.user_agent,
        )) as Arc<dyn HeadlessBrowser>
    });

    let flickr = FlickrProvider::new(http, browser, ScraperSettings::from_config(&config));
    let service = Arc::new(
        AlbumSyncService::builder()
            .registry(ProviderRegistry::new().with(Arc::new(flickr)))
            .store(store)
            .build(),
    );

    let app = routes::build_router(service);
    let addr = format!("{}:{}", config.web_host, config.web_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, "Progress channel listening at ws://{}/ws", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
