// Flickr URL shapes: full album URLs, flic.kr short links, profile URLs, and
// the page/deep-link URLs the scraper builds. Pure string work, no HTTP.

use url::Url;

use albumsync_common::ParsedAlbumUrl;

const FLICKR_HOSTS: &[&str] = &["flickr.com", "www.flickr.com", "m.flickr.com", "secure.flickr.com"];
const SHORT_HOSTS: &[&str] = &["flic.kr", "www.flic.kr"];
const BASE: &str = "https://www.flickr.com";

fn parse_loose(raw: &str) -> Option<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Url::parse(trimmed).ok()
    } else {
        Url::parse(&format!("https://{trimmed}")).ok()
    }
}

fn host_of(url: &Url) -> String {
    url.host_str().unwrap_or_default().to_lowercase()
}

fn segments(url: &Url) -> Vec<String> {
    url.path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).map(String::from).collect())
        .unwrap_or_default()
}

/// Does this URL live on a Flickr host (including short links)?
pub(crate) fn is_flickr_url(raw: &str) -> bool {
    parse_loose(raw)
        .map(|u| {
            let host = host_of(&u);
            FLICKR_HOSTS.contains(&host.as_str()) || SHORT_HOSTS.contains(&host.as_str())
        })
        .unwrap_or(false)
}

/// Parse `flickr.com/photos/{user}/albums/{id}[/...]` (or the legacy `/sets/`)
/// and `flic.kr/s/{code}` short links.
pub(crate) fn parse_album_url(raw: &str) -> Option<ParsedAlbumUrl> {
    let url = parse_loose(raw)?;
    let host = host_of(&url);
    let segs = segments(&url);

    if SHORT_HOSTS.contains(&host.as_str()) {
        return match segs.as_slice() {
            [kind, code, ..] if kind == "s" && !code.is_empty() => Some(ParsedAlbumUrl::short(raw.trim())),
            _ => None,
        };
    }

    if !FLICKR_HOSTS.contains(&host.as_str()) {
        return None;
    }

    match segs.as_slice() {
        [photos, user, kind, album_id, ..]
            if photos == "photos"
                && (kind == "albums" || kind == "sets")
                && is_numeric_id(album_id) =>
        {
            Some(ParsedAlbumUrl::new(user, album_id, raw.trim()))
        }
        _ => None,
    }
}

/// A user id from a bare identifier (`boltonramblers`, `12345678@N02`) or any
/// Flickr URL under `/photos/{user}` or `/people/{user}`.
pub(crate) fn parse_user_id(input: &str) -> Option<String> {
    let trimmed = input.trim().trim_matches('/');
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.contains('/') || trimmed.contains("flickr.com") {
        let url = parse_loose(trimmed)?;
        if !FLICKR_HOSTS.contains(&host_of(&url).as_str()) {
            return None;
        }
        return match segments(&url).as_slice() {
            [kind, user, ..] if kind == "photos" || kind == "people" => Some(user.clone()),
            _ => None,
        };
    }

    trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '_' | '-' | '.'))
        .then(|| trimmed.to_string())
}

fn is_numeric_id(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

pub(crate) fn album_url(user_id: &str, album_id: &str) -> String {
    format!("{BASE}/photos/{user_id}/albums/{album_id}")
}

pub(crate) fn album_page_url(user_id: &str, album_id: &str, page: usize) -> String {
    format!("{BASE}/photos/{user_id}/albums/{album_id}/page{page}")
}

/// Photo page in album context. Its embedded state carries a much larger
/// window of the album than a listing page does.
pub(crate) fn anchored_photo_url(user_id: &str, photo_id: &str, album_id: &str) -> String {
    format!("{BASE}/photos/{user_id}/{photo_id}/in/album-{album_id}/")
}

pub(crate) fn albums_listing_url(user_id: &str) -> String {
    format!("{BASE}/photos/{user_id}/albums")
}

/// Album id from an href such as `/photos/{user}/albums/{id}`.
pub(crate) fn album_id_from_href(href: &str) -> Option<String> {
    let mut parts = href.split('/').filter(|p| !p.is_empty());
    while let Some(part) = parts.next() {
        if part == "albums" || part == "sets" {
            return parts
                .next()
                .map(|id| id.split(['?', '#']).next().unwrap_or(id))
                .filter(|id| is_numeric_id(id))
                .map(String::from);
        }
    }
    None
}

/// Normalise protocol-relative image URLs (`//live.staticflickr.com/...`).
pub(crate) fn absolute_image_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("//") {
        format!("https://{rest}")
    } else if trimmed.starts_with('/') {
        format!("{BASE}{trimmed}")
    } else {
        trimmed.to_string()
    }
}
