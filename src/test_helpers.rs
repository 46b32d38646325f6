//! Shared test utilities for the photo-bridge test suite.
//!
//! Provides record builders, synthetic image writers, an on-disk fixture
//! library for [`FsMediaIndex`](crate::index::FsMediaIndex) tests, and an
//! in-memory [`MediaIndex`] for gallery tests that should not touch disk.
//!
//! # Fixture library
//!
//! ```text
//! <tmp>/
//! ├── cover.jpg            64x48    mtime 500s
//! ├── Camera/
//! │   ├── IMG_0001.jpg     400x300  mtime 3000s
//! │   ├── IMG_0002.png     120x80   mtime 2000s
//! │   └── VID_0003.mp4     (bytes)  mtime 4000s
//! └── Trips/Japan/
//!     └── temple.png       300x400  mtime 1000s
//! ```

use crate::index::{IndexError, MediaFilter, MediaIndex, Paging, SortOrder, sort_records};
use crate::types::{MediaRecord, MediumType};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};
use tempfile::TempDir;

// =========================================================================
// Records
// =========================================================================

/// An image record with the given grouping key and no dates.
pub fn record_in(id: &str, album_id: &str, album_name: &str) -> MediaRecord {
    MediaRecord {
        id: id.to_string(),
        medium_type: MediumType::Image,
        width: 0,
        height: 0,
        mime: "image/jpeg".to_string(),
        creation_date: None,
        modified_date: None,
        duration: 0,
        album_id: album_id.to_string(),
        album_name: album_name.to_string(),
        source: PathBuf::from("/library").join(id),
    }
}

// =========================================================================
// Synthetic images
// =========================================================================

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Write a gradient JPEG of the given size.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let writer = BufWriter::new(File::create(path).unwrap());
    JpegEncoder::new(writer)
        .write_image(gradient(width, height).as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
}

/// Write a gradient JPEG carrying `exif` in its APP1 segment.
pub fn create_test_jpeg_with_exif(path: &Path, width: u32, height: u32, exif: Vec<u8>) {
    let writer = BufWriter::new(File::create(path).unwrap());
    let mut encoder = JpegEncoder::new(writer);
    encoder.set_exif_metadata(exif).unwrap();
    encoder
        .write_image(gradient(width, height).as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
}

/// A little-endian EXIF (TIFF) block whose only entry is the Orientation tag.
pub fn exif_with_orientation(orientation: u16) -> Vec<u8> {
    let mut exif = b"II*\0".to_vec();
    exif.extend_from_slice(&8u32.to_le_bytes()); // first IFD
    exif.extend_from_slice(&1u16.to_le_bytes()); // entry count
    exif.extend_from_slice(&0x0112u16.to_le_bytes()); // Orientation
    exif.extend_from_slice(&3u16.to_le_bytes()); // SHORT
    exif.extend_from_slice(&1u32.to_le_bytes());
    exif.extend_from_slice(&orientation.to_le_bytes());
    exif.extend_from_slice(&[0, 0]);
    exif.extend_from_slice(&0u32.to_le_bytes()); // no next IFD
    exif
}

/// Write a translucent gradient PNG of the given size.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, 64, (y % 256) as u8, 200])
    });
    img.save(path).unwrap();
}

/// Set a file's modification time to `secs` after the epoch.
pub fn set_mtime(path: &Path, secs: u64) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

// =========================================================================
// Fixture library
// =========================================================================

/// Build the fixture library (see module docs) in a fresh temp directory.
pub fn setup_library() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let camera = root.join("Camera");
    let japan = root.join("Trips").join("Japan");
    fs::create_dir_all(&camera).unwrap();
    fs::create_dir_all(&japan).unwrap();

    create_test_jpeg(&root.join("cover.jpg"), 64, 48);
    create_test_jpeg(&camera.join("IMG_0001.jpg"), 400, 300);
    create_test_png(&camera.join("IMG_0002.png"), 120, 80);
    fs::write(camera.join("VID_0003.mp4"), b"\x00\x00\x00\x18ftypmp42 fake video").unwrap();
    create_test_png(&japan.join("temple.png"), 300, 400);

    set_mtime(&root.join("cover.jpg"), 500);
    set_mtime(&camera.join("IMG_0001.jpg"), 3_000);
    set_mtime(&camera.join("IMG_0002.png"), 2_000);
    set_mtime(&camera.join("VID_0003.mp4"), 4_000);
    set_mtime(&japan.join("temple.png"), 1_000);
    tmp
}

// =========================================================================
// In-memory index
// =========================================================================

/// A [`MediaIndex`] over a fixed list of records.
#[derive(Default)]
pub struct MemoryIndex {
    pub records: Vec<MediaRecord>,
}

impl MemoryIndex {
    pub fn new(records: Vec<MediaRecord>) -> Self {
        Self { records }
    }
}

impl MediaIndex for MemoryIndex {
    fn query(
        &self,
        filter: &MediaFilter,
        order: SortOrder,
        paging: Paging,
    ) -> Result<Vec<MediaRecord>, IndexError> {
        let mut matching: Vec<MediaRecord> = self
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        sort_records(&mut matching, order);
        Ok(paging.apply(matching))
    }
}
