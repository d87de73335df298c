// Interpretation of Flickr's `modelExport` state blob.
//
// The blob is an undocumented registry of client models. Values are often
// wrapped as `{"data": ..., "fetchedStart": ..}` and photo lists are sparse
// arrays with `null` holes for unloaded slots. Rather than hard-coding one
// path through it, photos are found by shape (an object with an `id` and a
// `sizes` map) wherever they appear. If Flickr changes the shape, this is
// the file that breaks.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde_json::Value;

use albumsync_common::{clean_album_title, slugify, ExternalAlbumSummary, ExternalPhoto};

use super::urls::{absolute_image_url, album_id_from_href};

pub(crate) const MODEL_EXPORT_MARKER: &str = "modelExport:";

/// Size keys from largest to smallest usable display size.
const FULL_SIZE_KEYS: &[&str] = &["o", "6k", "5k", "4k", "3k", "k", "h", "l", "c", "z", "m", "n", "w", "q", "s", "t", "sq"];
const THUMBNAIL_SIZE_KEYS: &[&str] = &["q", "n", "m", "w", "s", "sq", "t", "z", "c", "l"];

static OG_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*property\s*=\s*["']og:image["'][^>]*content\s*=\s*["']([^"']+)["']"#)
        .expect("valid regex")
});
static OG_IMAGE_REVERSED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*content\s*=\s*["']([^"']+)["'][^>]*property\s*=\s*["']og:image["']"#)
        .expect("valid regex")
});
static OG_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*property\s*=\s*["']og:title["'][^>]*content\s*=\s*["']([^"']*)["']"#)
        .expect("valid regex")
});
static PHOTO_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"/photos/[^/"'\s]+/(\d+)/in/(?:album|set)-(\d+)"#).expect("valid regex")
});

/// What an album page's state tells us about the album itself.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct AlbumState {
    pub title: String,
    pub description: String,
    pub owner_name: Option<String>,
    /// Declared photo total, when the state carries one.
    pub total: Option<usize>,
    pub photos: Vec<ExternalPhoto>,
    pub cover_url: Option<String>,
}

/// Peel `{"data": ...}` wrappers. Objects that look like models in their own
/// right (they carry an `id`) are left alone.
fn unwrap_data(mut value: &Value) -> &Value {
    while let Some(obj) = value.as_object() {
        match obj.get("data") {
            Some(inner) if !obj.contains_key("id") => value = inner,
            _ => break,
        }
    }
    value
}

fn field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    unwrap_data(value).get(key).map(unwrap_data)
}

fn text(value: Option<&Value>) -> Option<String> {
    match value.map(unwrap_data)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn count(value: Option<&Value>) -> Option<usize> {
    match value.map(unwrap_data)? {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.replace(',', "").trim().parse().ok(),
        _ => None,
    }
}

fn first_text(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| text(field(value, k)))
        .filter(|s| !s.trim().is_empty())
}

fn first_count(value: &Value, keys: &[&str]) -> Option<usize> {
    keys.iter().find_map(|k| count(field(value, k)))
}

/// URL of the first available size in `preference` order.
fn size_url(sizes: &Value, preference: &[&str]) -> Option<String> {
    let sizes = unwrap_data(sizes);
    preference.iter().find_map(|key| {
        let size = field(sizes, key)?;
        let url = first_text(size, &["url", "src", "displayUrl"])?;
        Some(absolute_image_url(&url))
    })
}

/// Epoch millis from numeric seconds/millis or `YYYY-MM-DD HH:MM:SS` text.
pub(crate) fn parse_date_taken(value: Option<&Value>) -> Option<i64> {
    let value = unwrap_data(value?);
    let from_number = |n: i64| if n < 100_000_000_000 { n * 1000 } else { n };
    match value {
        Value::Number(n) => n.as_i64().map(from_number),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<i64>() {
                return Some(from_number(n));
            }
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
                .ok()
                .map(|dt| dt.and_utc().timestamp_millis())
        }
        _ => None,
    }
}

/// A photo, if `value` has the shape of one.
pub(crate) fn photo_from(value: &Value) -> Option<ExternalPhoto> {
    let value = unwrap_data(value);
    let obj = value.as_object()?;
    let id = text(obj.get("id"))?;
    let sizes = obj.get("sizes")?;
    let url = size_url(sizes, FULL_SIZE_KEYS)?;
    let thumbnail_url = size_url(sizes, THUMBNAIL_SIZE_KEYS).unwrap_or_else(|| url.clone());

    Some(ExternalPhoto {
        id,
        title: text(obj.get("title")).unwrap_or_default(),
        url,
        thumbnail_url,
        date_taken: parse_date_taken(obj.get("dateTaken").or_else(|| obj.get("datetaken"))),
        description: text(obj.get("description")).filter(|d| !d.trim().is_empty()),
    })
}

/// Keys holding a single photo that stands for the album, not a list entry.
const ALBUM_COVER_KEYS: &[&str] = &["coverPhoto", "primaryPhoto"];

/// Every photo-shaped object in the state, in document order, deduplicated.
/// Album cover photos are skipped.
pub(crate) fn collect_photos(state: &Value) -> Vec<ExternalPhoto> {
    let mut photos = Vec::new();
    let mut seen = HashSet::new();
    walk_photos(state, &mut photos, &mut seen);
    photos
}

fn walk_photos(value: &Value, photos: &mut Vec<ExternalPhoto>, seen: &mut HashSet<String>) {
    if let Some(photo) = photo_from(value) {
        if seen.insert(photo.id.clone()) {
            photos.push(photo);
        }
        return;
    }
    match value {
        Value::Object(map) => map
            .iter()
            .filter(|(key, _)| !ALBUM_COVER_KEYS.contains(&key.as_str()))
            .for_each(|(_, v)| walk_photos(v, photos, seen)),
        Value::Array(items) => items.iter().for_each(|v| walk_photos(v, photos, seen)),
        _ => {}
    }
}

/// The first model registered under `registry` (e.g. `album-models`).
fn first_model<'a>(state: &'a Value, registry: &str) -> Option<&'a Value> {
    let main = field(state, "main").unwrap_or(state);
    let models = field(main, registry)?;
    match models {
        Value::Array(items) => items.iter().find(|v| !v.is_null()).map(unwrap_data),
        other => Some(other),
    }
}

pub(crate) fn parse_album_state(state: &Value) -> AlbumState {
    let Some(album) = first_model(state, "album-models") else {
        return AlbumState {
            photos: collect_photos(state),
            ..Default::default()
        };
    };

    let photos = match field(album, "photoPageList").map(collect_photos) {
        Some(listed) if !listed.is_empty() => listed,
        _ => collect_photos(state),
    };

    let total = first_count(album, &["photoCount", "count", "numPhotos", "totalItems"]).or_else(|| {
        field(album, "photoPageList").and_then(|list| first_count(list, &["totalItems", "total"]))
    });

    let owner_name = field(album, "owner")
        .and_then(|owner| first_text(owner, &["username", "realname", "pathAlias", "nsid"]));

    let cover_url = ALBUM_COVER_KEYS
        .iter()
        .find_map(|k| field(album, k))
        .and_then(|cover| {
            photo_from(cover).map(|p| p.url).or_else(|| {
                field(cover, "sizes").and_then(|s| size_url(s, FULL_SIZE_KEYS))
            })
        });

    AlbumState {
        title: first_text(album, &["title"]).unwrap_or_default(),
        description: first_text(album, &["description"]).unwrap_or_default(),
        owner_name,
        total,
        photos,
        cover_url,
    }
}

/// Album summaries from a user's album-listing state, plus the owner's name
/// when present. Albums are found by shape: an `id`, a `title`, and a count.
pub(crate) fn parse_album_list(state: &Value) -> (Option<String>, Vec<ExternalAlbumSummary>) {
    let mut albums = Vec::new();
    let mut seen = HashSet::new();
    walk_albums(state, &mut albums, &mut seen);

    let owner = first_model(state, "album-list-models")
        .and_then(|list| field(list, "owner"))
        .or_else(|| first_model(state, "person-models"))
        .and_then(|owner| first_text(owner, &["username", "realname", "pathAlias"]));

    (owner, albums)
}

fn album_summary_from(value: &Value) -> Option<ExternalAlbumSummary> {
    let value = unwrap_data(value);
    let obj = value.as_object()?;
    if obj.contains_key("sizes") {
        return None;
    }
    let id = text(obj.get("id"))?;
    let title = text(obj.get("title"))?;
    let photo_count = first_count(value, &["photoCount", "count_photos", "countPhotos", "numPhotos"])?;
    let video_count = first_count(value, &["videoCount", "count_videos", "countVideos"]).unwrap_or(0);

    let cover_photo_url = ALBUM_COVER_KEYS
        .iter()
        .find_map(|k| obj.get(*k))
        .and_then(|cover| {
            photo_from(cover)
                .map(|p| p.url)
                .or_else(|| field(cover, "sizes").and_then(|s| size_url(s, FULL_SIZE_KEYS)))
        })
        .or_else(|| first_text(value, &["coverImageUrl", "coverUrl"]).map(|u| absolute_image_url(&u)));

    let title = clean_album_title(title.trim());
    let mut summary = ExternalAlbumSummary::new(&id, &title);
    summary.description = first_text(value, &["description"]).unwrap_or_default();
    summary.photo_count = photo_count + video_count;
    summary.cover_photo_url = cover_photo_url;
    summary.target_path = slugify(&title);
    Some(summary)
}

fn walk_albums(value: &Value, albums: &mut Vec<ExternalAlbumSummary>, seen: &mut HashSet<String>) {
    if let Some(album) = album_summary_from(value) {
        if seen.insert(album.id.clone()) {
            albums.push(album);
        }
        return;
    }
    match value {
        Value::Object(map) => map.values().for_each(|v| walk_albums(v, albums, seen)),
        Value::Array(items) => items.iter().for_each(|v| walk_albums(v, albums, seen)),
        _ => {}
    }
}

/// First photo linked in album context in raw HTML. Used when a page has no
/// parseable state but still renders photo links.
pub(crate) fn first_photo_id_in_html(html: &str, album_id: &str) -> Option<String> {
    PHOTO_LINK_RE
        .captures_iter(html)
        .find(|cap| &cap[2] == album_id)
        .map(|cap| cap[1].to_string())
}

pub(crate) fn og_image(html: &str) -> Option<String> {
    OG_IMAGE_RE
        .captures(html)
        .or_else(|| OG_IMAGE_REVERSED_RE.captures(html))
        .map(|cap| absolute_image_url(&cap[1]))
}

pub(crate) fn og_title(html: &str) -> Option<String> {
    OG_TITLE_RE
        .captures(html)
        .map(|cap| cap[1].trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Album id from a listing href, re-exported for the listing scanners.
pub(crate) fn listing_album_id(href: &str) -> Option<String> {
    album_id_from_href(href)
}
