//! End-to-end command flows against the in-memory content store and a mocked
//! Flickr. No network or database required.

use std::sync::Arc;

use serde_json::{json, Value};

use albumsync_common::requests::{ExternalAlbumImportRequest, ExternalBulkImportRequest};
use albumsync_common::{
    AlbumSource, ClientCommand, EventScope, ExternalAlbumMetadata, ExternalAlbumSummary,
    ServerEvent,
};
use albumsync_import::{AlbumSyncService, ContentStore, MemoryContentStore};
use albumsync_providers::testing::{MockHttpFetcher, RecordingSink};
use albumsync_providers::{FlickrProvider, ProviderRegistry, ScraperSettings};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const USER: &str = "walkers";

fn album_url(album_id: &str) -> String {
    format!("https://www.flickr.com/photos/{USER}/albums/{album_id}")
}

fn album_page(album_id: &str, title: &str, photo_titles: &[&str]) -> String {
    let photos: Vec<Value> = photo_titles
        .iter()
        .enumerate()
        .map(|(i, t)| {
            json!({
                "id": format!("{album_id}{i}"),
                "title": t,
                "sizes": {
                    "q": {"url": format!("//live.staticflickr.com/65535/{album_id}{i}_q.jpg")},
                    "l": {"url": format!("//live.staticflickr.com/65535/{album_id}{i}_b.jpg")}
                }
            })
        })
        .collect();
    let state = json!({
        "main": {
            "album-models": [{
                "data": {
                    "id": album_id,
                    "title": title,
                    "photoCount": photo_titles.len(),
                    "photoPageList": {"data": {"_data": photos}}
                }
            }]
        }
    });
    format!("<html><script>modelExport: {state},</script></html>")
}

fn service(http: MockHttpFetcher) -> (Arc<MemoryContentStore>, Arc<MockHttpFetcher>, AlbumSyncService) {
    let http = Arc::new(http);
    let store = Arc::new(MemoryContentStore::new());
    let provider = FlickrProvider::new(http.clone(), None, ScraperSettings::default());
    let service = AlbumSyncService::builder()
        .registry(ProviderRegistry::new().with(Arc::new(provider)))
        .store(store.clone() as Arc<dyn ContentStore>)
        .build();
    (store, http, service)
}

fn completion_payload(sink: &RecordingSink) -> Value {
    match sink.completions().last() {
        Some(ServerEvent::Complete(event)) => event.payload.clone(),
        other => panic!("expected a complete event, got {other:?}"),
    }
}

async fn fetched(service: &AlbumSyncService, url: &str) -> ExternalAlbumMetadata {
    let sink = RecordingSink::new();
    let command: ClientCommand = serde_json::from_value(json!({
        "type": "external-album:fetch",
        "data": {"albumUrl": url, "context": "fetch"}
    }))
    .unwrap();
    service.handle(command, &sink).await;
    serde_json::from_value(completion_payload(&sink)).unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_reports_progress_then_completes() {
    let (_, _, service) = service(MockHttpFetcher::new().on_page(&album_url("100"), album_page("100", "Walks", &["A", "B"])));
    let sink = RecordingSink::new();
    let command: ClientCommand = serde_json::from_value(json!({
        "type": "external-album:fetch",
        "data": {"albumUrl": album_url("100"), "context": "c1"}
    }))
    .unwrap();

    service.handle(command, &sink).await;

    let events = sink.events();
    assert!(matches!(events.first(), Some(ServerEvent::Progress(_))));
    assert!(sink.errors().is_empty());
    let payload = completion_payload(&sink);
    assert_eq!(payload["photoCount"], 2);
    assert_eq!(payload["photos"][0]["url"], "https://live.staticflickr.com/65535/1000_b.jpg");
    for event in events {
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["data"]["context"], "c1");
    }
}

#[tokio::test]
async fn importing_twice_updates_the_same_documents() {
    let (store, _, service) = service(MockHttpFetcher::new().on_page(&album_url("100"), album_page("100", "Walks", &["A", "B"])));
    let metadata = fetched(&service, &album_url("100")).await;

    let request = ExternalAlbumImportRequest::builder()
        .source(AlbumSource::Flickr)
        .target_path("gallery/walks")
        .metadata(metadata)
        .build();

    let first = service.import_album(&request, &RecordingSink::new(), &EventScope::default()).await.unwrap();
    let second = service.import_album(&request, &RecordingSink::new(), &EventScope::default()).await.unwrap();

    assert!(first.success && second.success);
    assert_eq!(first.content_metadata_id, second.content_metadata_id);
    assert_eq!(first.page_content_id, second.page_content_id);
    assert_eq!(store.metadata().await.len(), 1);
    assert_eq!(store.pages().await.len(), 1);

    let page = store.find_page_by_path("gallery/walks").await.unwrap().unwrap();
    assert_eq!(page.rows.len(), 1);
}

#[tokio::test]
async fn split_import_builds_index_page() {
    let (store, _, service) = service(MockHttpFetcher::new().on_page(&album_url("100"), album_page("100", "Walks", &["A", "B", "A"])));
    let metadata = fetched(&service, &album_url("100")).await;

    let request = ExternalAlbumImportRequest::builder()
        .source(AlbumSource::Flickr)
        .target_path("gallery/x")
        .split_by_photo_title(true)
        .metadata(metadata)
        .context("split")
        .build();
    let sink = RecordingSink::new();
    service.handle(ClientCommand::ImportAlbum(request), &sink).await;

    let payload = completion_payload(&sink);
    assert_eq!(payload["success"], true);
    assert_eq!(payload["photoCount"], 3);
    assert_eq!(payload["pageContentPath"], "gallery/x");

    let paths: Vec<String> = store.pages().await.into_iter().map(|p| p.path).collect();
    assert_eq!(paths, vec!["gallery/x", "gallery/x/a", "gallery/x/b"]);
    let index = store.find_page_by_path("gallery/x").await.unwrap().unwrap();
    assert!(index.first_album_index_row().is_some());
}

#[tokio::test]
async fn split_preview_keeps_exclusions() {
    let (_, _, service) = service(MockHttpFetcher::new().on_page(&album_url("100"), album_page("100", "Walks", &["Walk", "Walk!", "Walk"])));
    let sink = RecordingSink::new();
    let command: ClientCommand = serde_json::from_value(json!({
        "type": "external-album:fetch-split-preview",
        "data": {
            "albumUrl": album_url("100"),
            "albumId": "100",
            "basePath": "trips",
            "previous": [{"title": "Walk!", "path": "trips/walk-2", "count": 1, "included": false}]
        }
    }))
    .unwrap();

    service.handle(command, &sink).await;

    let payload = completion_payload(&sink);
    assert_eq!(payload["albumId"], "100");
    let entries = payload["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["path"], "trips/walk");
    assert_eq!(entries[0]["count"], 2);
    assert_eq!(entries[1]["path"], "trips/walk-2");
    assert_eq!(entries[1]["included"], false);
}

#[tokio::test]
async fn bulk_import_isolates_failures() {
    let http = MockHttpFetcher::new()
        .on_page(&album_url("100"), album_page("100", "Spring", &["A", "B"]))
        .on_status(&album_url("200"), 500)
        .on_page(&album_url("300"), album_page("300", "Autumn", &["C"]));
    let (store, _, service) = service(http);

    let albums: Vec<ExternalAlbumSummary> = [("100", "Spring"), ("200", "Summer"), ("300", "Autumn"), ("400", "Winter")]
        .iter()
        .map(|(id, title)| {
            let mut summary = ExternalAlbumSummary::new(id, title);
            summary.selected = *id != "400";
            summary
        })
        .collect();
    let request = ExternalBulkImportRequest::builder()
        .source(AlbumSource::Flickr)
        .user_id(USER)
        .base_path("gallery")
        .albums(albums)
        .context("bulk")
        .build();

    let sink = RecordingSink::new();
    service.handle(ClientCommand::ImportBulk(request), &sink).await;

    let payload = completion_payload(&sink);
    assert_eq!(payload["successCount"], 2);
    assert_eq!(payload["failureCount"], 1);
    let results = payload["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["pageContentPath"], "gallery/spring");
    assert_eq!(results[1]["success"], false);
    assert_eq!(results[2]["pageContentPath"], "gallery/autumn");

    let errors = sink.errors();
    assert_eq!(errors.len(), 1);
    let error = serde_json::to_value(&errors[0]).unwrap();
    assert_eq!(error["data"]["albumId"], "200");
    assert_eq!(error["data"]["stage"], "fetch");

    assert!(store.find_page_by_path("gallery/spring").await.unwrap().is_some());
    assert!(store.find_page_by_path("gallery/summer").await.unwrap().is_none());
    assert!(store.find_page_by_path("gallery/winter").await.unwrap().is_none());
}

#[tokio::test]
async fn missing_fields_fail_before_any_request() {
    let (_, http, service) = service(MockHttpFetcher::new());
    let frames = [
        json!({"type": "external-album:fetch", "data": {"context": "a"}}),
        json!({"type": "external-album:fetch-user-albums", "data": {"userId": "  "}}),
        json!({"type": "external-album:fetch-split-preview", "data": {"albumUrl": album_url("1")}}),
        json!({"type": "external-album:import", "data": {"source": "flickr", "targetPath": "gallery/x"}}),
        json!({"type": "external-album:import-bulk", "data": {"source": "flickr", "basePath": "gallery"}}),
    ];

    for frame in frames {
        let sink = RecordingSink::new();
        service.handle(serde_json::from_value(frame).unwrap(), &sink).await;

        let errors = sink.errors();
        assert_eq!(errors.len(), 1);
        let error = serde_json::to_value(&errors[0]).unwrap();
        assert_eq!(error["data"]["stage"], "validation");
        assert!(sink.completions().is_empty());
    }
    assert!(http.requested().is_empty());
}

#[tokio::test]
async fn unknown_host_is_a_detection_error() {
    let (_, http, service) = service(MockHttpFetcher::new());
    let sink = RecordingSink::new();
    let command: ClientCommand = serde_json::from_value(json!({
        "type": "external-album:fetch",
        "data": {"albumUrl": "https://photos.example.com/album/1"}
    }))
    .unwrap();

    service.handle(command, &sink).await;

    let error = serde_json::to_value(&sink.errors()[0]).unwrap();
    assert_eq!(error["data"]["stage"], "detect");
    assert!(http.requested().is_empty());
}
