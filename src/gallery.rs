//! The gallery service: every request the bridge answers.
//!
//! [`Gallery`] owns a [`MediaIndex`], an [`ImageBackend`] and an
//! [`ExportCache`]. All operations are synchronous and re-read the index;
//! the [`channel`](crate::channel) moves them off the async transport.
//!
//! "Not found" is never an error: operations that look up a single medium
//! or album answer `Ok(None)` when the id does not resolve. Asking for the
//! thumbnail of a video or audio medium that does exist is
//! [`GalleryError::ThumbnailUnsupported`]; only images are decoded.
//!
//! | Operation | Answer |
//! |---|---|
//! | [`list_albums`](Gallery::list_albums) | albums, "All" first |
//! | [`list_media`](Gallery::list_media) | one newest-first page of an album |
//! | [`get_medium`](Gallery::get_medium) | one record |
//! | [`get_thumbnail`](Gallery::get_thumbnail) | JPEG bytes |
//! | [`get_album_thumbnail`](Gallery::get_album_thumbnail) | JPEG bytes of the newest medium |
//! | [`get_file`](Gallery::get_file) | path of an exported file |
//! | [`clear`](Gallery::clear) | empties the export cache |

use crate::albums::aggregate;
use crate::cache::{ExportCache, ExportError, ExportedFile};
use crate::config::BridgeConfig;
use crate::imaging::{
    BackendError, ExportRequest, ImageBackend, Quality, create_thumbnail, get_dimensions,
};
use crate::index::{IndexError, MediaFilter, MediaIndex, Paging, SortOrder, subtype_filter};
use crate::types::{ALL_ALBUM_ID, Album, ContentMode, Dimensions, MediaPage, MediaRecord, MediumType};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("Media index error: {0}")]
    Index(#[from] IndexError),
    #[error("Image error: {0}")]
    Backend(#[from] BackendError),
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
    #[error("No thumbnail decoder for {medium_type} {medium_id}")]
    ThumbnailUnsupported {
        medium_id: String,
        medium_type: MediumType,
    },
}

/// Medium types tried, in order, when a caller does not name one.
const FALLBACK_TYPES: [MediumType; 2] = [MediumType::Image, MediumType::Video];

pub struct Gallery<I, B> {
    index: I,
    backend: B,
    cache: ExportCache,
    thumbnail_bounds: Dimensions,
    thumbnail_quality: Quality,
}

impl<I: MediaIndex, B: ImageBackend> Gallery<I, B> {
    /// A gallery with the stock thumbnail settings.
    pub fn new(index: I, backend: B, cache: ExportCache) -> Self {
        let stock = BridgeConfig::default();
        Self {
            index,
            backend,
            cache,
            thumbnail_bounds: stock.thumbnails.bounds(),
            thumbnail_quality: stock.thumbnails.quality(),
        }
    }

    /// A gallery configured from `config`, with its export cache.
    pub fn from_config(index: I, backend: B, config: &BridgeConfig) -> Self {
        let cache = ExportCache::new(config.cache_root())
            .with_quality(Quality::new(config.export.quality))
            .with_reuse_existing(config.export.reuse_existing);
        Self {
            index,
            backend,
            cache,
            thumbnail_bounds: config.thumbnails.bounds(),
            thumbnail_quality: config.thumbnails.quality(),
        }
    }

    pub fn cache(&self) -> &ExportCache {
        &self.cache
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    fn album_filter(
        album_id: &str,
        medium_type: Option<MediumType>,
        medium_subtype: Option<&str>,
    ) -> MediaFilter {
        MediaFilter {
            medium_type,
            mime: subtype_filter(medium_subtype),
            album_id: (album_id != ALL_ALBUM_ID).then(|| album_id.to_string()),
            medium_id: None,
        }
    }

    /// Albums holding media of `medium_type`, the synthetic "All" album first.
    pub fn list_albums(
        &self,
        medium_type: MediumType,
        medium_subtype: Option<&str>,
    ) -> Result<Vec<Album>, GalleryError> {
        let filter = Self::album_filter(ALL_ALBUM_ID, Some(medium_type), medium_subtype);
        let records = self.index.query_groups(&filter)?;
        Ok(aggregate(&records, medium_type, medium_subtype))
    }

    /// One page of an album, newest first.
    ///
    /// `skip` defaults to 0 and `take` to everything after `skip`.
    pub fn list_media(
        &self,
        album_id: &str,
        medium_type: MediumType,
        medium_subtype: Option<&str>,
        skip: Option<usize>,
        take: Option<usize>,
    ) -> Result<MediaPage, GalleryError> {
        let filter = Self::album_filter(album_id, Some(medium_type), medium_subtype);
        let total = self.index.count(&filter)?;
        let skip = skip.unwrap_or(0);
        let take = take.unwrap_or_else(|| total.saturating_sub(skip));

        let items = self.index.query(
            &filter,
            SortOrder::NewestFirst,
            Paging {
                skip,
                take: Some(take),
            },
        )?;
        Ok(MediaPage {
            start: skip,
            total,
            items,
        })
    }

    /// A single medium by id. Any type matches when `medium_type` is `None`.
    pub fn get_medium(
        &self,
        medium_id: &str,
        medium_type: Option<MediumType>,
    ) -> Result<Option<MediaRecord>, GalleryError> {
        let filter = MediaFilter {
            medium_type,
            medium_id: Some(medium_id.to_string()),
            ..MediaFilter::default()
        };
        let mut found = self.index.query(&filter, SortOrder::Natural, Paging::first())?;
        Ok(found.pop())
    }

    fn bounds(&self, width: Option<u32>, height: Option<u32>) -> Dimensions {
        Dimensions::new(
            width.unwrap_or(self.thumbnail_bounds.width),
            height.unwrap_or(self.thumbnail_bounds.height),
        )
    }

    /// Size of `record`, read from the file when the index did not know it.
    fn origin_of(&self, record: &MediaRecord) -> Result<Dimensions, GalleryError> {
        let known = record.dimensions();
        if record.medium_type != MediumType::Image || !known.is_unconstrained() {
            return Ok(known);
        }
        Ok(get_dimensions(&self.backend, &record.source)?)
    }

    fn thumbnail_of(
        &self,
        record: &MediaRecord,
        bounds: Dimensions,
    ) -> Result<Option<Vec<u8>>, GalleryError> {
        if record.medium_type != MediumType::Image {
            log::debug!("no thumbnail decoder for {} {}", record.medium_type, record.id);
            return Ok(None);
        }
        let origin = self.origin_of(record)?;
        let bytes = create_thumbnail(
            &self.backend,
            &record.source,
            origin,
            bounds,
            self.thumbnail_quality,
        )?;
        Ok(Some(bytes))
    }

    /// JPEG thumbnail of one image, covering `width`x`height` (config box
    /// for a missing axis).
    pub fn get_thumbnail(
        &self,
        medium_id: &str,
        medium_type: Option<MediumType>,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<Option<Vec<u8>>, GalleryError> {
        let Some(record) = self.get_medium(medium_id, medium_type)? else {
            return Ok(None);
        };
        if record.medium_type != MediumType::Image {
            return Err(GalleryError::ThumbnailUnsupported {
                medium_id: record.id,
                medium_type: record.medium_type,
            });
        }
        self.thumbnail_of(&record, self.bounds(width, height))
    }

    /// JPEG thumbnail of the newest medium in an album.
    ///
    /// Without a `medium_type`, images are tried before videos.
    pub fn get_album_thumbnail(
        &self,
        album_id: &str,
        medium_type: Option<MediumType>,
        medium_subtype: Option<&str>,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<Option<Vec<u8>>, GalleryError> {
        let types = match medium_type {
            Some(t) => vec![t],
            None => FALLBACK_TYPES.to_vec(),
        };
        let bounds = self.bounds(width, height);

        for medium_type in types {
            let filter = Self::album_filter(album_id, Some(medium_type), medium_subtype);
            let newest = self
                .index
                .query(&filter, SortOrder::NewestFirst, Paging::first())?;
            if let Some(record) = newest.first()
                && let Some(bytes) = self.thumbnail_of(record, bounds)?
            {
                return Ok(Some(bytes));
            }
        }
        Ok(None)
    }

    /// Export one medium into the cache.
    ///
    /// A zero `width`/`height` (or `None`) requests the original size.
    pub fn export_medium(
        &self,
        medium_id: &str,
        medium_type: Option<MediumType>,
        width: Option<u32>,
        height: Option<u32>,
        content_mode: Option<ContentMode>,
    ) -> Result<Option<ExportedFile>, GalleryError> {
        let Some(mut record) = self.get_medium(medium_id, medium_type)? else {
            return Ok(None);
        };
        let target = Dimensions::new(width.unwrap_or(0), height.unwrap_or(0));
        if !target.is_unconstrained() {
            let origin = self.origin_of(&record)?;
            record.width = origin.width;
            record.height = origin.height;
        }
        let request = ExportRequest::for_record(&record, target, content_mode);
        Ok(Some(self.cache.export(&self.backend, &request)?))
    }

    /// Path of the exported file for one medium.
    pub fn get_file(
        &self,
        medium_id: &str,
        medium_type: Option<MediumType>,
        width: Option<u32>,
        height: Option<u32>,
        content_mode: Option<ContentMode>,
    ) -> Result<Option<PathBuf>, GalleryError> {
        Ok(self
            .export_medium(medium_id, medium_type, width, height, content_mode)?
            .map(|file| file.path))
    }

    /// Delete every exported file.
    pub fn clear(&self) -> Result<(), GalleryError> {
        Ok(self.cache.clear()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheOutcome;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::test_helpers::{MemoryIndex, record_in};
    use tempfile::TempDir;

    fn record(id: &str, album: &str, created: i64, dims: (u32, u32)) -> MediaRecord {
        MediaRecord {
            width: dims.0,
            height: dims.1,
            creation_date: Some(created),
            modified_date: Some(created),
            ..record_in(id, album, album)
        }
    }

    fn video(id: &str, album: &str, created: i64) -> MediaRecord {
        MediaRecord {
            medium_type: MediumType::Video,
            mime: "video/mp4".into(),
            ..record(id, album, created, (1920, 1080))
        }
    }

    fn gallery(records: Vec<MediaRecord>, backend: MockBackend) -> (TempDir, Gallery<MemoryIndex, MockBackend>) {
        let tmp = TempDir::new().unwrap();
        let cache = ExportCache::new(tmp.path().join("cache"));
        (tmp, Gallery::new(MemoryIndex::new(records), backend, cache))
    }

    fn library() -> Vec<MediaRecord> {
        vec![
            record("a1", "A", 100, (4000, 3000)),
            record("b1", "B", 400, (1000, 500)),
            record("a2", "A", 300, (800, 600)),
            record("a3", "A", 200, (640, 480)),
            video("v1", "B", 500),
        ]
    }

    fn page_ids(page: &MediaPage) -> Vec<&str> {
        page.items.iter().map(|r| r.id.as_str()).collect()
    }

    // =========================================================================
    // Listing
    // =========================================================================

    #[test]
    fn list_albums_counts_by_type_with_all_first() {
        let (_tmp, gallery) = gallery(library(), MockBackend::new());
        let albums = gallery.list_albums(MediumType::Image, None).unwrap();

        let summary: Vec<(&str, usize)> = albums.iter().map(|a| (a.id.as_str(), a.count)).collect();
        // Newest image is in B, so B is seen first
        assert_eq!(summary, vec![(ALL_ALBUM_ID, 4), ("B", 1), ("A", 3)]);
    }

    #[test]
    fn list_albums_with_subtype_filters_by_mime() {
        let mut records = library();
        records.push(MediaRecord {
            mime: "image/gif".into(),
            ..record("g1", "Gifs", 50, (10, 10))
        });
        let (_tmp, gallery) = gallery(records, MockBackend::new());

        let albums = gallery.list_albums(MediumType::Image, Some("gif")).unwrap();
        assert_eq!(albums.len(), 2);
        assert_eq!(albums[0].count, 1);
        assert_eq!(albums[1].id, "Gifs");
        assert!(albums.iter().all(|a| a.medium_subtype == "gif"));
    }

    #[test]
    fn list_media_pages_newest_first() {
        let (_tmp, gallery) = gallery(library(), MockBackend::new());

        let page = gallery
            .list_media("A", MediumType::Image, None, Some(1), Some(1))
            .unwrap();
        assert_eq!(page.start, 1);
        assert_eq!(page.total, 3);
        assert_eq!(page_ids(&page), vec!["a3"]);
    }

    #[test]
    fn list_media_defaults_take_the_rest() {
        let (_tmp, gallery) = gallery(library(), MockBackend::new());

        let page = gallery.list_media("A", MediumType::Image, None, Some(1), None).unwrap();
        assert_eq!(page_ids(&page), vec!["a3", "a1"]);

        let all = gallery
            .list_media(ALL_ALBUM_ID, MediumType::Image, None, None, None)
            .unwrap();
        assert_eq!(all.start, 0);
        assert_eq!(all.total, 4);
        assert_eq!(page_ids(&all), vec!["b1", "a2", "a3", "a1"]);
    }

    #[test]
    fn list_media_skip_past_end_is_empty() {
        let (_tmp, gallery) = gallery(library(), MockBackend::new());
        let page = gallery.list_media("A", MediumType::Image, None, Some(10), None).unwrap();
        assert_eq!(page.total, 3);
        assert!(page.items.is_empty());
    }

    #[test]
    fn get_medium_with_and_without_type() {
        let (_tmp, gallery) = gallery(library(), MockBackend::new());
        assert_eq!(gallery.get_medium("v1", None).unwrap().unwrap().id, "v1");
        assert!(gallery.get_medium("v1", Some(MediumType::Image)).unwrap().is_none());
        assert!(gallery.get_medium("nope", None).unwrap().is_none());
    }

    // =========================================================================
    // Thumbnails
    // =========================================================================

    #[test]
    fn thumbnail_uses_config_box_for_missing_axis() {
        let (_tmp, gallery) = gallery(library(), MockBackend::new());
        let bytes = gallery.get_thumbnail("a1", None, None, None).unwrap().unwrap();
        // 4000x3000 covering 128x128
        assert_eq!(bytes, b"thumb 171x128");
    }

    #[test]
    fn thumbnail_of_unknown_id_is_none() {
        let (_tmp, gallery) = gallery(library(), MockBackend::new());
        assert!(gallery.get_thumbnail("nope", None, None, None).unwrap().is_none());
    }

    #[test]
    fn thumbnail_of_existing_video_is_unsupported() {
        let (_tmp, gallery) = gallery(library(), MockBackend::new());
        let err = gallery.get_thumbnail("v1", None, None, None).unwrap_err();
        assert!(matches!(
            err,
            GalleryError::ThumbnailUnsupported { ref medium_id, medium_type: MediumType::Video }
                if medium_id == "v1"
        ));
        assert!(gallery.backend.get_operations().is_empty());
    }

    #[test]
    fn thumbnail_identifies_unknown_dimensions() {
        let backend = MockBackend::with_dimensions(vec![Dimensions::new(300, 600)]);
        let (_tmp, gallery) = gallery(vec![record("x", "A", 1, (0, 0))], backend);

        let bytes = gallery.get_thumbnail("x", None, Some(100), Some(100)).unwrap().unwrap();
        assert_eq!(bytes, b"thumb 100x200");
    }

    #[test]
    fn album_thumbnail_is_newest_medium() {
        let backend = MockBackend::new();
        let (_tmp, gallery) = gallery(library(), backend);

        gallery
            .get_album_thumbnail("A", Some(MediumType::Image), None, Some(64), Some(64))
            .unwrap()
            .unwrap();

        let ops = gallery.backend.get_operations();
        assert!(matches!(&ops[0], RecordedOp::Thumbnail { source, .. } if source.ends_with("a2")));
    }

    #[test]
    fn album_thumbnail_without_type_prefers_images() {
        let (_tmp, gallery) = gallery(library(), MockBackend::new());
        // B's newest medium is a video, but its newest image wins
        let bytes = gallery.get_album_thumbnail("B", None, None, None, None).unwrap();
        assert_eq!(bytes.unwrap(), b"thumb 256x128");
    }

    #[test]
    fn album_thumbnail_of_empty_album_is_none() {
        let (_tmp, gallery) = gallery(library(), MockBackend::new());
        assert!(
            gallery
                .get_album_thumbnail("Empty", None, None, None, None)
                .unwrap()
                .is_none()
        );
    }

    // =========================================================================
    // Files
    // =========================================================================

    fn with_source_on_disk(tmp: &TempDir, mut record: MediaRecord) -> MediaRecord {
        let path = tmp.path().join(format!("{}.jpg", record.id));
        std::fs::write(&path, b"jpeg bytes").unwrap();
        record.source = path;
        record
    }

    #[test]
    fn get_file_of_unknown_id_is_none() {
        let (_tmp, gallery) = gallery(library(), MockBackend::new());
        assert!(gallery.get_file("nope", None, None, None, None).unwrap().is_none());
    }

    #[test]
    fn get_file_resizes_and_clear_then_regenerates() {
        let src = TempDir::new().unwrap();
        let record = with_source_on_disk(&src, record("b1", "B", 1, (1000, 500)));
        let (_tmp, gallery) = gallery(vec![record], MockBackend::new());

        let first = gallery
            .export_medium("b1", None, Some(200), Some(200), Some(ContentMode::AspectFit))
            .unwrap()
            .unwrap();
        assert_eq!(first.dimensions, Dimensions::new(200, 100));
        assert_eq!(first.outcome, CacheOutcome::Encoded);

        gallery.clear().unwrap();
        assert!(!first.path.exists());

        let path = gallery
            .get_file("b1", None, Some(200), Some(200), Some(ContentMode::AspectFit))
            .unwrap()
            .unwrap();
        assert_eq!(path, first.path);
        assert!(path.exists());
    }

    #[test]
    fn get_file_without_size_copies() {
        let src = TempDir::new().unwrap();
        let record = with_source_on_disk(&src, record("a1", "A", 1, (0, 0)));
        let (_tmp, gallery) = gallery(vec![record], MockBackend::new());

        let file = gallery.export_medium("a1", None, None, None, None).unwrap().unwrap();
        assert_eq!(file.outcome, CacheOutcome::Copied);
        assert_eq!(std::fs::read(&file.path).unwrap(), b"jpeg bytes");
        // No size was needed, so nothing was identified
        assert!(gallery.backend.get_operations().is_empty());
    }

    #[test]
    fn get_file_encode_failure_is_error() {
        let src = TempDir::new().unwrap();
        let record = with_source_on_disk(&src, record("b1", "B", 1, (1000, 500)));
        let (_tmp, gallery) = gallery(vec![record], MockBackend::failing());

        let result = gallery.get_file("b1", None, Some(100), Some(100), None);
        assert!(matches!(result, Err(GalleryError::Export(ExportError::Encode(_)))));
    }
}
