//! Media index abstraction.
//!
//! The platform media store (MediaStore, Photos, or a plain directory tree)
//! is reached only through [`MediaIndex`]. Every call re-reads the store;
//! nothing is cached between queries.
//!
//! The helpers here ([`sort_records`], [`Paging::apply`], the extension
//! table) are shared by every index implementation so they order, page and
//! classify media identically.

pub mod fs;

use crate::types::{MediaRecord, MediumType};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use fs::FsMediaIndex;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Media library not found: {0}")]
    LibraryNotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to walk media library: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Known media file extensions, their kind and MIME type.
const MEDIA_EXTENSIONS: &[(&str, MediumType, &str)] = &[
    ("jpg", MediumType::Image, "image/jpeg"),
    ("jpeg", MediumType::Image, "image/jpeg"),
    ("png", MediumType::Image, "image/png"),
    ("gif", MediumType::Image, "image/gif"),
    ("webp", MediumType::Image, "image/webp"),
    ("heic", MediumType::Image, "image/heic"),
    ("tif", MediumType::Image, "image/tiff"),
    ("tiff", MediumType::Image, "image/tiff"),
    ("bmp", MediumType::Image, "image/bmp"),
    ("mp4", MediumType::Video, "video/mp4"),
    ("m4v", MediumType::Video, "video/x-m4v"),
    ("mov", MediumType::Video, "video/quicktime"),
    ("3gp", MediumType::Video, "video/3gpp"),
    ("mkv", MediumType::Video, "video/x-matroska"),
    ("webm", MediumType::Video, "video/webm"),
    ("mp3", MediumType::Audio, "audio/mpeg"),
    ("m4a", MediumType::Audio, "audio/mp4"),
    ("wav", MediumType::Audio, "audio/wav"),
    ("ogg", MediumType::Audio, "audio/ogg"),
    ("flac", MediumType::Audio, "audio/flac"),
];

fn lookup_extension(ext: &str) -> Option<(MediumType, &'static str)> {
    let ext = ext.to_ascii_lowercase();
    MEDIA_EXTENSIONS
        .iter()
        .find(|(known, _, _)| *known == ext)
        .map(|&(_, kind, mime)| (kind, mime))
}

/// MIME type for a file extension (case-insensitive, without the dot).
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    lookup_extension(ext).map(|(_, mime)| mime)
}

/// Kind and MIME type of a media file, judged by its extension.
pub fn classify(path: &Path) -> Option<(MediumType, &'static str)> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(lookup_extension)
}

/// MIME filter for a medium subtype such as `"gif"`.
///
/// Subtypes are file extensions. An unknown subtype filters nothing.
pub fn subtype_filter(subtype: Option<&str>) -> Option<String> {
    let subtype = subtype?;
    match mime_for_extension(subtype) {
        Some(mime) => Some(mime.to_string()),
        None => {
            log::debug!("unknown medium subtype {subtype:?}, not filtering");
            None
        }
    }
}

/// Which records a query selects. `None` fields select everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaFilter {
    pub medium_type: Option<MediumType>,
    pub mime: Option<String>,
    pub album_id: Option<String>,
    pub medium_id: Option<String>,
}

impl MediaFilter {
    pub fn of_type(medium_type: MediumType) -> Self {
        Self {
            medium_type: Some(medium_type),
            ..Self::default()
        }
    }

    pub fn matches(&self, record: &MediaRecord) -> bool {
        self.medium_type.is_none_or(|t| t == record.medium_type)
            && self
                .mime
                .as_deref()
                .is_none_or(|m| m.eq_ignore_ascii_case(&record.mime))
            && self.album_id.as_deref().is_none_or(|a| a == record.album_id)
            && self.medium_id.as_deref().is_none_or(|id| id == record.id)
    }
}

/// Result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Creation date descending, then modification date descending.
    #[default]
    NewestFirst,
    /// By id.
    Natural,
}

/// Sort records in place. Ties always break on id so pages are stable.
pub fn sort_records(records: &mut [MediaRecord], order: SortOrder) {
    match order {
        SortOrder::NewestFirst => records.sort_by(|a, b| {
            b.creation_date
                .cmp(&a.creation_date)
                .then_with(|| b.modified_date.cmp(&a.modified_date))
                .then_with(|| a.id.cmp(&b.id))
        }),
        SortOrder::Natural => records.sort_by(|a, b| a.id.cmp(&b.id)),
    }
}

/// Offset and optional limit applied after sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Paging {
    pub skip: usize,
    pub take: Option<usize>,
}

impl Paging {
    /// Everything, unpaged.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn first() -> Self {
        Self {
            skip: 0,
            take: Some(1),
        }
    }

    pub fn apply(self, records: Vec<MediaRecord>) -> Vec<MediaRecord> {
        let page = records.into_iter().skip(self.skip);
        match self.take {
            Some(take) => page.take(take).collect(),
            None => page.collect(),
        }
    }
}

/// Read access to a media store.
///
/// Implementations must be shareable across threads; the channel answers
/// calls concurrently on a blocking pool.
pub trait MediaIndex: Send + Sync {
    /// Records matching `filter`, sorted and paged, with dimensions filled
    /// in where the store knows them.
    fn query(
        &self,
        filter: &MediaFilter,
        order: SortOrder,
        paging: Paging,
    ) -> Result<Vec<MediaRecord>, IndexError>;

    /// Records matching `filter` for grouping only. Dimensions may be zero.
    fn query_groups(&self, filter: &MediaFilter) -> Result<Vec<MediaRecord>, IndexError> {
        self.query(filter, SortOrder::NewestFirst, Paging::all())
    }

    /// Number of records matching `filter`.
    fn count(&self, filter: &MediaFilter) -> Result<usize, IndexError> {
        Ok(self.query_groups(filter)?.len())
    }
}
