pub mod importer;
pub mod pg_store;
pub mod service;
pub mod split;
pub mod store;

pub use importer::{AlbumImporter, ImportOptions};
pub use pg_store::PgContentStore;
pub use service::{bulk_target_path, bulk_target_paths, AlbumSyncService};
pub use split::{build_split_preview_entries, split_album, SplitGroup};
pub use store::{ContentStore, MemoryContentStore};
