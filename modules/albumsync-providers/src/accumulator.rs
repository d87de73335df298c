use std::collections::HashSet;

use albumsync_common::ExternalPhoto;

/// Running photo set for one scrape. Deduplicates by `id` and keeps
/// first-seen order across every page and chunk merged into it.
#[derive(Debug, Default)]
pub struct PhotoAccumulator {
    photos: Vec<ExternalPhoto>,
    seen: HashSet<String>,
}

impl PhotoAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a batch, returning how many photos were new.
    pub fn extend(&mut self, batch: impl IntoIterator<Item = ExternalPhoto>) -> usize {
        let before = self.photos.len();
        for photo in batch {
            if self.seen.insert(photo.id.clone()) {
                self.photos.push(photo);
            }
        }
        self.photos.len() - before
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn first_id(&self) -> Option<&str> {
        self.photos.first().map(|p| p.id.as_str())
    }

    pub fn into_photos(self) -> Vec<ExternalPhoto> {
        self.photos
    }
}

/// Merge batches in order, dropping repeated ids.
pub fn merge_photo_batches(batches: impl IntoIterator<Item = Vec<ExternalPhoto>>) -> Vec<ExternalPhoto> {
    let mut acc = PhotoAccumulator::new();
    for batch in batches {
        acc.extend(batch);
    }
    acc.into_photos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(id: &str) -> ExternalPhoto {
        ExternalPhoto {
            id: id.into(),
            title: format!("photo {id}"),
            url: format!("https://live.staticflickr.com/{id}_b.jpg"),
            thumbnail_url: String::new(),
            date_taken: None,
            description: None,
        }
    }

    fn ids(photos: &[ExternalPhoto]) -> Vec<&str> {
        photos.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn overlapping_batches_merge_in_order() {
        let merged = merge_photo_batches(vec![
            vec![photo("1"), photo("2")],
            vec![photo("2"), photo("3")],
        ]);
        assert_eq!(ids(&merged), vec!["1", "2", "3"]);
    }

    #[test]
    fn extend_reports_only_new_photos() {
        let mut acc = PhotoAccumulator::new();
        assert_eq!(acc.extend(vec![photo("a"), photo("b")]), 2);
        assert_eq!(acc.extend(vec![photo("b"), photo("a")]), 0);
        assert_eq!(acc.extend(vec![photo("c"), photo("c")]), 1);
        assert_eq!(acc.len(), 3);
        assert_eq!(acc.first_id(), Some("a"));
    }

    #[test]
    fn first_seen_copy_wins() {
        let mut first = photo("1");
        first.title = "first".into();
        let mut second = photo("1");
        second.title = "second".into();
        let merged = merge_photo_batches(vec![vec![first], vec![second]]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "first");
    }

    #[test]
    fn merged_ids_are_unique_for_many_overlaps() {
        let batches: Vec<Vec<ExternalPhoto>> = (0..10)
            .map(|start| (start..start + 5).map(|i| photo(&i.to_string())).collect())
            .collect();
        let merged = merge_photo_batches(batches);
        let unique: HashSet<&str> = merged.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(unique.len(), merged.len());
        assert_eq!(merged.len(), 14);
        assert_eq!(merged[0].id, "0");
        assert_eq!(merged[13].id, "13");
    }
}
