//! Directory-tree media index.
//!
//! Treats a local directory as a media store, the way a phone's gallery
//! treats its storage buckets:
//!
//! ```text
//! library/
//! ├── cover.jpg              # album "." named after the library dir
//! ├── Camera/                # album "Camera"
//! │   ├── IMG_0001.jpg       # id "Camera/IMG_0001.jpg"
//! │   └── VID_0002.mp4
//! └── Trips/Japan/           # album "Trips/Japan" named "Japan"
//!     └── temple.png
//! ```
//!
//! - A medium's id is its path relative to the library, `/`-separated.
//! - An album's id is the relative path of the directory holding it.
//! - Hidden files and directories are skipped.
//! - Creation and modification dates are both the file's mtime in
//!   milliseconds; creation times do not survive copies between devices.
//! - Image dimensions are read from file headers for the returned page
//!   only, in parallel. Unreadable images are reported with zero size.

use super::{IndexError, MediaFilter, MediaIndex, Paging, SortOrder, classify, sort_records};
use crate::imaging::ImageBackend;
use crate::types::{MediaRecord, MediumType};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use walkdir::{DirEntry, WalkDir};

/// Album id of media stored directly in the library root.
pub const ROOT_ALBUM_ID: &str = ".";

pub struct FsMediaIndex<B> {
    root: PathBuf,
    backend: B,
}

impl<B: ImageBackend + Send> FsMediaIndex<B> {
    pub fn new(root: impl Into<PathBuf>, backend: B) -> Self {
        Self {
            root: root.into(),
            backend,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the library and return every record matching `filter`, without
    /// dimensions.
    fn scan(&self, filter: &MediaFilter) -> Result<Vec<MediaRecord>, IndexError> {
        if !self.root.is_dir() {
            return Err(IndexError::LibraryNotFound(self.root.clone()));
        }

        let mut records = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(record) = self.record_for(&entry)?
                && filter.matches(&record)
            {
                records.push(record);
            }
        }
        log::debug!(
            "scanned {}: {} media match {:?}",
            self.root.display(),
            records.len(),
            filter
        );
        Ok(records)
    }

    fn record_for(&self, entry: &DirEntry) -> Result<Option<MediaRecord>, IndexError> {
        let path = entry.path();
        let Some((medium_type, mime)) = classify(path) else {
            return Ok(None);
        };
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return Ok(None);
        };

        let album_dir = relative.parent().filter(|p| !p.as_os_str().is_empty());
        let (album_id, album_name) = match album_dir {
            Some(dir) => (slash_path(dir), dir_name(dir)),
            None => (ROOT_ALBUM_ID.to_string(), dir_name(&self.root)),
        };

        let modified = entry
            .metadata()?
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .and_then(|since| i64::try_from(since.as_millis()).ok());

        Ok(Some(MediaRecord {
            id: slash_path(relative),
            medium_type,
            width: 0,
            height: 0,
            mime: mime.to_string(),
            creation_date: modified,
            modified_date: modified,
            duration: 0,
            album_id,
            album_name,
            source: path.to_path_buf(),
        }))
    }

    /// Read image dimensions from headers, in parallel.
    fn fill_dimensions(&self, records: &mut [MediaRecord]) {
        records
            .par_iter_mut()
            .filter(|r| r.medium_type == MediumType::Image)
            .for_each(|record| match self.backend.identify(&record.source) {
                Ok(dims) => {
                    record.width = dims.width;
                    record.height = dims.height;
                }
                Err(e) => log::warn!("cannot read size of {}: {}", record.source.display(), e),
            });
    }
}

impl<B: ImageBackend + Send> MediaIndex for FsMediaIndex<B> {
    fn query(
        &self,
        filter: &MediaFilter,
        order: SortOrder,
        paging: Paging,
    ) -> Result<Vec<MediaRecord>, IndexError> {
        let mut records = self.scan(filter)?;
        sort_records(&mut records, order);
        let mut page = paging.apply(records);
        self.fill_dimensions(&mut page);
        Ok(page)
    }

    fn query_groups(&self, filter: &MediaFilter) -> Result<Vec<MediaRecord>, IndexError> {
        let mut records = self.scan(filter)?;
        sort_records(&mut records, SortOrder::NewestFirst);
        Ok(records)
    }

    fn count(&self, filter: &MediaFilter) -> Result<usize, IndexError> {
        Ok(self.scan(filter)?.len())
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
