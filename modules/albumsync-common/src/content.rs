// Content documents as stored by the content store. Rows are free-form on the
// store side; the fields modelled here are the ones the importer reads or
// writes, and anything else round-trips through `extra`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Folder under which imported album metadata documents live.
pub const ALBUM_ROOT_FOLDER: &str = "carousels";

/// Row block type. Types the importer doesn't handle keep their original tag
/// so rows written back to the store are unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PageContentType {
    Album,
    AlbumIndex,
    Text,
    ActionButtons,
    Other(String),
}

impl From<String> for PageContentType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "album" => PageContentType::Album,
            "album-index" => PageContentType::AlbumIndex,
            "text" => PageContentType::Text,
            "action-buttons" => PageContentType::ActionButtons,
            _ => PageContentType::Other(tag),
        }
    }
}

impl From<PageContentType> for String {
    fn from(row_type: PageContentType) -> Self {
        match row_type {
            PageContentType::Album => "album".to_string(),
            PageContentType::AlbumIndex => "album-index".to_string(),
            PageContentType::Text => "text".to_string(),
            PageContentType::ActionButtons => "action-buttons".to_string(),
            PageContentType::Other(tag) => tag,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlbumView {
    #[default]
    Grid,
    Gallery,
    Carousel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StringMatch {
    #[default]
    StartsWith,
    Equals,
    Contains,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub path: String,
    #[serde(default)]
    pub rows: Vec<PageContentRow>,
}

impl PageContent {
    pub fn new(path: &str, rows: Vec<PageContentRow>) -> Self {
        Self {
            id: None,
            path: path.to_string(),
            rows,
        }
    }

    /// Index of the album row whose carousel is named `name`.
    pub fn album_row_named(&self, name: &str) -> Option<usize> {
        self.rows.iter().position(|row| {
            row.row_type == PageContentType::Album
                && row.carousel.as_ref().is_some_and(|c| c.name == name)
        })
    }

    pub fn first_album_index_row(&self) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.row_type == PageContentType::AlbumIndex)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContentRow {
    #[serde(rename = "type")]
    pub row_type: PageContentType,
    #[serde(default = "default_max_columns")]
    pub max_columns: u32,
    #[serde(default)]
    pub show_swiper: bool,
    #[serde(default)]
    pub columns: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carousel: Option<AlbumData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_index: Option<AlbumIndex>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_max_columns() -> u32 {
    1
}

impl PageContentRow {
    pub fn album(data: AlbumData) -> Self {
        Self {
            row_type: PageContentType::Album,
            max_columns: 1,
            show_swiper: false,
            columns: Vec::new(),
            carousel: Some(data),
            album_index: None,
            extra: Map::new(),
        }
    }

    pub fn album_index(index: AlbumIndex) -> Self {
        Self {
            row_type: PageContentType::AlbumIndex,
            max_columns: 2,
            show_swiper: false,
            columns: Vec::new(),
            carousel: None,
            album_index: Some(index),
            extra: Map::new(),
        }
    }
}

/// Album block payload. `name` is the target path and is how an existing
/// block for the same import is recognised on re-run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumData {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub introductory_text: String,
    #[serde(default)]
    pub pre_album_text: String,
    #[serde(default)]
    pub show_pre_album_text: bool,
    #[serde(default = "default_true")]
    pub show_cover_image_and_text: bool,
    #[serde(default = "default_cover_height")]
    pub cover_image_height: u32,
    #[serde(default)]
    pub album_view: AlbumView,
    #[serde(default = "default_slide_interval")]
    pub slide_interval: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_true")]
    pub allow_swipe: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_true() -> bool {
    true
}

fn default_cover_height() -> u32 {
    400
}

fn default_slide_interval() -> u32 {
    5000
}

fn default_height() -> u32 {
    500
}

impl AlbumData {
    pub fn new(name: &str, title: &str, subtitle: &str, introductory_text: &str) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            subtitle: subtitle.to_string(),
            introductory_text: introductory_text.to_string(),
            pre_album_text: String::new(),
            show_pre_album_text: false,
            show_cover_image_and_text: true,
            cover_image_height: default_cover_height(),
            album_view: AlbumView::Grid,
            slide_interval: default_slide_interval(),
            height: default_height(),
            allow_swipe: true,
            created_at: None,
            extra: Map::new(),
        }
    }

    /// Replace the import-owned fields while keeping presentation settings
    /// (view, heights, intervals, template extras) from `self`.
    pub fn merged_with(&self, incoming: &AlbumData) -> AlbumData {
        AlbumData {
            name: incoming.name.clone(),
            title: incoming.title.clone(),
            subtitle: incoming.subtitle.clone(),
            introductory_text: incoming.introductory_text.clone(),
            created_at: self.created_at.or(incoming.created_at),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumIndex {
    #[serde(default)]
    pub content_paths: Vec<ContentPathMatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPathMatch {
    pub content_path: String,
    #[serde(default)]
    pub string_match: StringMatch,
}

impl AlbumIndex {
    /// An index listing every content path that starts with `path`.
    pub fn starts_with(path: &str) -> Self {
        Self {
            content_paths: vec![ContentPathMatch {
                content_path: path.to_string(),
                string_match: StringMatch::StartsWith,
            }],
        }
    }
}

/// Photo list backing an album block; `name` equals the target path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub root_folder: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_href: Option<String>,
    #[serde(default)]
    pub files: Vec<ContentMetadataItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub image_tags: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentMetadataItem {
    pub image: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_file_name: Option<String>,
}
