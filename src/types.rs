//! Shared types passed between the index, the gallery service and callers.
//!
//! These are the request/response shapes of the bridge. They serialize with
//! camelCase keys so the JSON produced by [`channel`](crate::channel) matches
//! what host applications already expect from the native plugins
//! (`mediumType`, `creationDate`, ...).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Identifier of the synthetic album that contains every medium.
pub const ALL_ALBUM_ID: &str = "__ALL__";

/// Display name of the synthetic all-items album.
pub const ALL_ALBUM_NAME: &str = "All";

/// Kind of medium tracked by the media index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediumType {
    Image,
    Video,
    Audio,
}

impl MediumType {
    pub fn as_str(self) -> &'static str {
        match self {
            MediumType::Image => "image",
            MediumType::Video => "video",
            MediumType::Audio => "audio",
        }
    }

    /// Parse the wire name (`"image"`, `"video"`, `"audio"`).
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(MediumType::Image),
            "video" => Some(MediumType::Video),
            "audio" => Some(MediumType::Audio),
            _ => None,
        }
    }
}

impl fmt::Display for MediumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an image is fit into a requested bounding box.
///
/// Callers may leave the mode unspecified (`Option::None`); the size
/// resolver treats that exactly like [`ContentMode::AspectFill`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentMode {
    /// Shrink until the whole image fits inside the box.
    AspectFit,
    /// Fill the box, letting one axis overflow.
    AspectFill,
}

impl ContentMode {
    /// Parse the wire name. Anything unrecognised means "unspecified".
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "aspectFit" => Some(ContentMode::AspectFit),
            "aspectFill" => Some(ContentMode::AspectFill),
            _ => None,
        }
    }
}

/// Pixel dimensions. A zero on either axis means "unknown" for media
/// records and "unconstrained" for size requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when the area is zero, i.e. no size constraint was requested.
    pub fn is_unconstrained(self) -> bool {
        u64::from(self.width) * u64::from(self.height) == 0
    }

    /// True when `other` fits inside `self` on both axes.
    pub fn contains(self, other: Dimensions) -> bool {
        self.width >= other.width && self.height >= other.height
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A single medium as reported by the media index.
///
/// Created per query and owned by the caller; nothing here is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    pub id: String,
    pub medium_type: MediumType,
    pub width: u32,
    pub height: u32,
    pub mime: String,
    pub creation_date: Option<i64>,
    pub modified_date: Option<i64>,
    /// Playback length in milliseconds; 0 for images.
    pub duration: u64,
    /// Grouping key (bucket / collection id).
    pub album_id: String,
    /// Display name of the bucket this medium belongs to.
    pub album_name: String,
    /// Local file backing this medium. Never sent to callers.
    #[serde(skip)]
    pub source: PathBuf,
}

impl MediaRecord {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

/// An album derived from a scan of media records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,
    pub medium_type: MediumType,
    /// Subtype filter the album was computed with; empty when none.
    pub medium_subtype: String,
    pub name: String,
    pub count: usize,
}

impl Album {
    pub fn is_all(&self) -> bool {
        self.id == ALL_ALBUM_ID
    }
}

/// One page of an album listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPage {
    /// Echo of the requested `skip`.
    pub start: usize,
    /// Number of media in the album, regardless of paging.
    pub total: usize,
    pub items: Vec<MediaRecord>,
}
