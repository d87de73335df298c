use std::sync::LazyLock;

use regex::Regex;

/// Title given to photos with no title of their own.
pub const UNTITLED: &str = "Untitled";

/// Trailing listing stats such as `22 photos · 62 views` or
/// `368 photos and 1 video · 612 views`.
static LISTING_STATS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\s*\d[\d,]*\s+(?:photos?|videos?|items?)(?:\s+and\s+\d[\d,]*\s+(?:photos?|videos?))?\s*[·•|-]\s*\d[\d,.]*\s*[km]?\s+views?\s*$",
    )
    .expect("valid regex")
});

/// URL-safe slug: lowercase ASCII alphanumerics joined by single hyphens.
/// Returns an empty string when nothing survives.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// Trimmed photo title, or `Untitled` when blank.
pub fn normalize_photo_title(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        UNTITLED.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Strip the photo/view counters some listings append to album titles.
/// Titles without them come back exactly as given.
pub fn clean_album_title(title: &str) -> String {
    match LISTING_STATS_RE.find(title) {
        Some(stats) => title[..stats.start()].trim_end().to_string(),
        None => title.to_string(),
    }
}

/// Join path segments with single slashes, dropping empty segments.
pub fn join_path(base: &str, segment: &str) -> String {
    let base = base.trim().trim_matches('/');
    let segment = segment.trim().trim_matches('/');
    match (base.is_empty(), segment.is_empty()) {
        (true, _) => segment.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{base}/{segment}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_collapses_punctuation() {
        assert_eq!(slugify("Walk"), "walk");
        assert_eq!(slugify("Walk!"), "walk");
        assert_eq!(slugify("  Bolton -- Ramblers 2026 "), "bolton-ramblers-2026");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn blank_titles_become_untitled() {
        assert_eq!(normalize_photo_title("   "), "Untitled");
        assert_eq!(normalize_photo_title(" Summit "), "Summit");
    }

    #[test]
    fn listing_stats_are_stripped() {
        assert_eq!(
            clean_album_title("Bolton Ramblers 2026 22 photos · 62 views"),
            "Bolton Ramblers 2026"
        );
        assert_eq!(
            clean_album_title("Bolton Ramblers 2025 368 photos and 1 video · 612 views"),
            "Bolton Ramblers 2025"
        );
        assert_eq!(clean_album_title("Winter Walks 1 photo · 1.2K views"), "Winter Walks");
    }

    #[test]
    fn titles_without_stats_are_unchanged() {
        assert_eq!(clean_album_title("Bolton Ramblers 2026"), "Bolton Ramblers 2026");
        assert_eq!(clean_album_title("Top 10 photos"), "Top 10 photos");
        assert_eq!(clean_album_title("Bolton  Ramblers\t2026"), "Bolton  Ramblers\t2026");
    }

    #[test]
    fn stats_after_irregular_whitespace_are_stripped() {
        assert_eq!(
            clean_album_title("Bolton  Ramblers 2026\n 22 photos  ·  62 views "),
            "Bolton  Ramblers 2026"
        );
    }

    #[test]
    fn join_path_normalises_slashes() {
        assert_eq!(join_path("gallery/x/", "/a"), "gallery/x/a");
        assert_eq!(join_path("", "a"), "a");
        assert_eq!(join_path("gallery", ""), "gallery");
    }
}
