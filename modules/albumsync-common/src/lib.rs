pub mod config;
pub mod content;
pub mod error;
pub mod events;
pub mod requests;
pub mod text;
pub mod types;

pub use config::Config;
pub use error::{AlbumSyncError, Result};
pub use events::{ClientCommand, EventScope, EventSink, NullSink, ServerEvent};
pub use text::{clean_album_title, join_path, normalize_photo_title, slugify, UNTITLED};
pub use types::*;
