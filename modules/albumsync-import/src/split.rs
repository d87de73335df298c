// Split grouper: one album becomes one sub-album per distinct photo title.
// Pure and deterministic. Group order is the order each title first appears.

use std::collections::HashMap;

use albumsync_common::{
    join_path, normalize_photo_title, slugify, ExternalAlbumMetadata, ExternalPhoto,
    SplitAlbumPreviewEntry, MAX_PREVIEW_PHOTOS,
};

const UNTITLED_SLUG: &str = "untitled";

/// A split entry together with every photo that belongs to it.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitGroup {
    pub entry: SplitAlbumPreviewEntry,
    pub photos: Vec<ExternalPhoto>,
}

pub fn split_album(base_path: &str, metadata: &ExternalAlbumMetadata) -> Vec<SplitGroup> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<ExternalPhoto>> = HashMap::new();
    for photo in &metadata.photos {
        let title = normalize_photo_title(&photo.title);
        groups
            .entry(title.clone())
            .or_insert_with(|| {
                order.push(title);
                Vec::new()
            })
            .push(photo.clone());
    }

    let mut assigned: Vec<String> = Vec::with_capacity(order.len());
    order
        .into_iter()
        .map(|title| {
            let photos = groups.remove(&title).unwrap_or_default();
            let slug = match slugify(&title) {
                s if s.is_empty() => UNTITLED_SLUG.to_string(),
                s => s,
            };
            let path = assign_path(&assigned, &join_path(base_path, &slug));
            assigned.push(path.clone());

            SplitGroup {
                entry: SplitAlbumPreviewEntry {
                    title,
                    path,
                    count: photos.len(),
                    included: true,
                    preview_photos: photos.iter().take(MAX_PREVIEW_PHOTOS).cloned().collect(),
                },
                photos,
            }
        })
        .collect()
}

/// Preview entries for `metadata` split under `base_path`. `included = false`
/// choices from a previous preview carry over by title.
pub fn build_split_preview_entries(
    base_path: &str,
    metadata: &ExternalAlbumMetadata,
    previous: &[SplitAlbumPreviewEntry],
) -> Vec<SplitAlbumPreviewEntry> {
    split_album(base_path, metadata)
        .into_iter()
        .map(|group| {
            let mut entry = group.entry;
            if previous.iter().any(|p| p.title == entry.title && !p.included) {
                entry.included = false;
            }
            entry
        })
        .collect()
}

/// `base` if no assigned path is `base` or `base-*`; otherwise `base-{n+1}`
/// where `n` counts those paths, bumped further while still taken.
fn assign_path(assigned: &[String], base: &str) -> String {
    let prefix = format!("{base}-");
    let taken = assigned
        .iter()
        .filter(|p| p.as_str() == base || p.starts_with(&prefix))
        .count();
    if taken == 0 {
        return base.to_string();
    }

    let mut n = taken + 1;
    loop {
        let candidate = format!("{base}-{n}");
        if !assigned.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use albumsync_common::AlbumSource;

    use super::*;

    fn album(titles: &[&str]) -> ExternalAlbumMetadata {
        let photos = titles
            .iter()
            .enumerate()
            .map(|(i, title)| ExternalPhoto {
                id: i.to_string(),
                title: title.to_string(),
                url: format!("https://live.staticflickr.com/{i}_b.jpg"),
                thumbnail_url: format!("https://live.staticflickr.com/{i}_q.jpg"),
                date_taken: None,
                description: None,
            })
            .collect();
        ExternalAlbumMetadata::new(AlbumSource::Flickr, "1", "Walks", "", photos, None)
    }

    fn summary(entries: &[SplitAlbumPreviewEntry]) -> Vec<(&str, usize, &str)> {
        entries
            .iter()
            .map(|e| (e.title.as_str(), e.count, e.path.as_str()))
            .collect()
    }

    #[test]
    fn groups_in_first_seen_order() {
        let entries = build_split_preview_entries("gallery/x", &album(&["A", "B", "A"]), &[]);
        assert_eq!(summary(&entries), vec![("A", 2, "gallery/x/a"), ("B", 1, "gallery/x/b")]);
        assert!(entries.iter().all(|e| e.included));
    }

    #[test]
    fn colliding_slugs_get_numbered() {
        let entries = build_split_preview_entries("base", &album(&["Walk", "Walk!", "walk"]), &[]);
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["base/walk", "base/walk-2", "base/walk-3"]);
    }

    #[test]
    fn numbered_title_does_not_collide_with_generated_suffix() {
        let entries = build_split_preview_entries("base", &album(&["Walk 2", "Walk", "Walk!"]), &[]);
        let paths: HashSet<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths.len(), 3);
        assert_eq!(entries[0].path, "base/walk-2");
    }

    #[test]
    fn blank_and_symbol_titles() {
        let entries = build_split_preview_entries("base", &album(&["  ", "", "★★"]), &[]);
        assert_eq!(
            summary(&entries),
            vec![("Untitled", 2, "base/untitled"), ("★★", 1, "base/untitled-2")]
        );
    }

    #[test]
    fn counts_sum_to_photo_total_and_paths_are_distinct() {
        let titles: Vec<String> = (0..60).map(|i| format!("Day {}", i % 7)).collect();
        let titles: Vec<&str> = titles.iter().map(String::as_str).collect();
        let metadata = album(&titles);
        let entries = build_split_preview_entries("trips", &metadata, &[]);

        assert_eq!(entries.iter().map(|e| e.count).sum::<usize>(), metadata.photos.len());
        let paths: HashSet<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths.len(), entries.len());
    }

    #[test]
    fn same_input_same_output() {
        let metadata = album(&["Summit", "Descent", "Summit!", "Pub"]);
        assert_eq!(
            build_split_preview_entries("b", &metadata, &[]),
            build_split_preview_entries("b", &metadata, &[])
        );
    }

    #[test]
    fn preview_photos_are_capped() {
        let titles = vec!["Same"; MAX_PREVIEW_PHOTOS + 5];
        let entries = build_split_preview_entries("b", &album(&titles), &[]);
        assert_eq!(entries[0].count, MAX_PREVIEW_PHOTOS + 5);
        assert_eq!(entries[0].preview_photos.len(), MAX_PREVIEW_PHOTOS);
    }

    #[test]
    fn excluded_entries_stay_excluded() {
        let metadata = album(&["A", "B"]);
        let mut previous = build_split_preview_entries("b", &metadata, &[]);
        previous[1].included = false;

        let regenerated = build_split_preview_entries("b", &metadata, &previous);
        assert!(regenerated[0].included);
        assert!(!regenerated[1].included);
    }

    #[test]
    fn split_groups_carry_all_photos() {
        let groups = split_album("b", &album(&["A", "B", "A"]));
        let ids: Vec<&str> = groups[0].photos.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["0", "2"]);
    }
}
