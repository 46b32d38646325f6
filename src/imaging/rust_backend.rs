//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::image_dimensions` (header only) |
//! | Decode (JPEG, PNG, GIF, TIFF, WebP) | `image::ImageReader` with content sniffing |
//! | Sampled decode | `DynamicImage::thumbnail_exact` by the power-of-two sample size |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Thumbnail | `DynamicImage::resize_exact` with `Triangle` |
//! | Encode | `PngEncoder` / `JpegEncoder` into memory, then one write |
//! | Metadata | `ImageDecoder::exif_metadata` copied with `ImageEncoder::set_exif_metadata` |

use super::backend::{BackendError, ImageBackend};
use super::params::{OutputFormat, Quality, ResizeParams, ThumbnailParams};
use crate::types::Dimensions;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageDecoder, ImageEncoder, ImageError, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone, Copy)]
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_error(path: &Path, err: ImageError) -> BackendError {
    match err {
        ImageError::IoError(e) => BackendError::Io(e),
        other => BackendError::Decode(format!("{}: {}", path.display(), other)),
    }
}

/// A decoded image and the EXIF block it was stored with.
struct Decoded {
    image: DynamicImage,
    exif: Option<Vec<u8>>,
}

/// Load and decode an image from disk, sniffing the format from its bytes.
///
/// Media stores are not strict about extensions, so the content decides.
/// Unreadable EXIF is dropped, not fatal.
fn load_image(path: &Path) -> Result<Decoded, BackendError> {
    let mut decoder = ImageReader::open(path)?
        .with_guessed_format()?
        .into_decoder()
        .map_err(|e| decode_error(path, e))?;
    let exif = decoder.exif_metadata().unwrap_or_else(|e| {
        log::debug!("ignoring EXIF of {}: {}", path.display(), e);
        None
    });
    let image = DynamicImage::from_decoder(decoder).map_err(|e| decode_error(path, e))?;
    Ok(Decoded { image, exif })
}

/// Decode and cheaply reduce by `sample_size` before any precise resampling.
fn load_sampled(path: &Path, sample_size: u32) -> Result<Decoded, BackendError> {
    let Decoded { image, exif } = load_image(path)?;
    if sample_size <= 1 {
        return Ok(Decoded { image, exif });
    }
    let width = (image.width() / sample_size).max(1);
    let height = (image.height() / sample_size).max(1);
    log::debug!(
        "sampled decode of {} by 1/{}: {}x{} -> {}x{}",
        path.display(),
        sample_size,
        image.width(),
        image.height(),
        width,
        height
    );
    Ok(Decoded {
        image: image.thumbnail_exact(width, height),
        exif,
    })
}

/// Hand the source's EXIF block to `encoder`. The pixels are not rotated,
/// so the orientation tag must travel with them.
fn attach_exif(encoder: &mut impl ImageEncoder, exif: Option<&[u8]>) {
    if let Some(exif) = exif
        && let Err(e) = encoder.set_exif_metadata(exif.to_vec())
    {
        log::warn!("EXIF not kept: {}", e);
    }
}

/// Encode into memory in the requested format, carrying `exif` over.
fn encode(
    img: &DynamicImage,
    format: OutputFormat,
    quality: Quality,
    exif: Option<&[u8]>,
) -> Result<Vec<u8>, BackendError> {
    let mut buffer = Cursor::new(Vec::new());
    let result = match format {
        OutputFormat::Png => {
            let mut encoder = PngEncoder::new(&mut buffer);
            attach_exif(&mut encoder, exif);
            img.write_with_encoder(encoder)
        }
        OutputFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.value() as u8);
            attach_exif(&mut encoder, exif);
            rgb.write_with_encoder(encoder)
        }
    };
    result.map_err(|e| BackendError::Encode(format!("{:?}: {}", format, e)))?;
    Ok(buffer.into_inner())
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| decode_error(path, e))?;
        Ok(Dimensions { width, height })
    }

    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError> {
        let decoded = load_sampled(&params.source, params.sample_size)?;
        let resized = decoded
            .image
            .resize_exact(params.width, params.height, FilterType::Lanczos3);
        let bytes = encode(&resized, params.format, params.quality, decoded.exif.as_deref())?;
        std::fs::write(&params.output, bytes)?;
        Ok(())
    }

    fn thumbnail(&self, params: &ThumbnailParams) -> Result<Vec<u8>, BackendError> {
        let Decoded { image, exif } = load_image(&params.source)?;
        let thumb = if image.width() == params.width && image.height() == params.height {
            image
        } else {
            image.resize_exact(params.width, params.height, FilterType::Triangle)
        };
        encode(&thumb, OutputFormat::Jpeg, params.quality, exif.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        create_test_jpeg, create_test_jpeg_with_exif, create_test_png, exif_with_orientation,
    };
    use image::metadata::Orientation;

    fn decoder_for(bytes: Vec<u8>) -> impl ImageDecoder {
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .unwrap()
            .into_decoder()
            .unwrap()
    }

    fn orientation_of(bytes: Vec<u8>) -> Orientation {
        decoder_for(bytes).orientation().unwrap()
    }

    #[test]
    fn identify_synthetic_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.jpg");
        create_test_jpeg(&path, 200, 150);

        let dims = RustBackend::new().identify(&path).unwrap();
        assert_eq!(dims, Dimensions::new(200, 150));
    }

    #[test]
    fn identify_nonexistent_file_is_io_error() {
        let result = RustBackend::new().identify(Path::new("/nonexistent/image.jpg"));
        assert!(matches!(result, Err(BackendError::Io(_))));
    }

    #[test]
    fn decode_garbage_is_decode_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.jpg");
        std::fs::write(&path, b"\xFF\xD8 definitely not a jpeg").unwrap();

        let result = RustBackend::new().thumbnail(&ThumbnailParams {
            source: path,
            width: 10,
            height: 10,
            quality: Quality::new(80),
        });
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn resize_jpeg_writes_exact_dimensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 400, 300);

        let output = tmp.path().join("resized.jpg");
        let backend = RustBackend::new();
        backend
            .resize(&ResizeParams {
                source,
                output: output.clone(),
                width: 200,
                height: 150,
                sample_size: 2,
                format: OutputFormat::Jpeg,
                quality: Quality::new(85),
            })
            .unwrap();

        assert_eq!(backend.identify(&output).unwrap(), Dimensions::new(200, 150));
    }

    #[test]
    fn resize_png_stays_png() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        create_test_png(&source, 120, 80);

        let output = tmp.path().join("resized.png");
        RustBackend::new()
            .resize(&ResizeParams {
                source,
                output: output.clone(),
                width: 60,
                height: 40,
                sample_size: 1,
                format: OutputFormat::Png,
                quality: Quality::default(),
            })
            .unwrap();

        let bytes = std::fs::read(&output).unwrap();
        assert_eq!(&bytes[..4], b"\x89PNG");
    }

    #[test]
    fn resize_png_source_to_jpeg_drops_alpha() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        create_test_png(&source, 64, 64);

        let output = tmp.path().join("resized.jpg");
        RustBackend::new()
            .resize(&ResizeParams {
                source,
                output: output.clone(),
                width: 32,
                height: 32,
                sample_size: 1,
                format: OutputFormat::Jpeg,
                quality: Quality::new(90),
            })
            .unwrap();

        let bytes = std::fs::read(&output).unwrap();
        assert_eq!(&bytes[..2], b"\xFF\xD8");
    }

    #[test]
    fn thumbnail_is_jpeg_of_requested_size() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 800, 600);

        let bytes = RustBackend::new()
            .thumbnail(&ThumbnailParams {
                source,
                width: 171,
                height: 128,
                quality: Quality::new(80),
            })
            .unwrap();

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (171, 128));
        assert_eq!(&bytes[..2], b"\xFF\xD8");
    }

    // =========================================================================
    // EXIF
    // =========================================================================

    #[test]
    fn resize_keeps_exif_orientation() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("portrait.jpg");
        create_test_jpeg_with_exif(&source, 400, 300, exif_with_orientation(6));
        assert_eq!(orientation_of(std::fs::read(&source).unwrap()), Orientation::Rotate90);

        let output = tmp.path().join("resized.jpg");
        let backend = RustBackend::new();
        backend
            .resize(&ResizeParams {
                source,
                output: output.clone(),
                width: 200,
                height: 150,
                sample_size: 2,
                format: OutputFormat::Jpeg,
                quality: Quality::new(85),
            })
            .unwrap();

        // Pixels stay as stored; viewers rotate by the carried tag
        assert_eq!(backend.identify(&output).unwrap(), Dimensions::new(200, 150));
        assert_eq!(orientation_of(std::fs::read(&output).unwrap()), Orientation::Rotate90);
    }

    #[test]
    fn resize_to_png_keeps_exif_block() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("photo.jpg");
        create_test_jpeg_with_exif(&source, 120, 80, exif_with_orientation(3));

        let output = tmp.path().join("resized.png");
        RustBackend::new()
            .resize(&ResizeParams {
                source,
                output: output.clone(),
                width: 60,
                height: 40,
                sample_size: 1,
                format: OutputFormat::Png,
                quality: Quality::default(),
            })
            .unwrap();

        let exif = decoder_for(std::fs::read(&output).unwrap()).exif_metadata().unwrap();
        assert_eq!(exif, Some(exif_with_orientation(3)));
    }

    #[test]
    fn thumbnail_keeps_exif_orientation() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("portrait.jpg");
        create_test_jpeg_with_exif(&source, 400, 300, exif_with_orientation(6));

        let bytes = RustBackend::new()
            .thumbnail(&ThumbnailParams {
                source,
                width: 171,
                height: 128,
                quality: Quality::new(80),
            })
            .unwrap();

        assert_eq!(orientation_of(bytes), Orientation::Rotate90);
    }

    #[test]
    fn source_without_exif_resizes_without_exif() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("plain.jpg");
        create_test_jpeg(&source, 100, 100);

        let output = tmp.path().join("resized.jpg");
        RustBackend::new()
            .resize(&ResizeParams {
                source,
                output: output.clone(),
                width: 50,
                height: 50,
                sample_size: 1,
                format: OutputFormat::Jpeg,
                quality: Quality::new(85),
            })
            .unwrap();

        let exif = decoder_for(std::fs::read(&output).unwrap()).exif_metadata().unwrap();
        assert_eq!(exif, None);
    }
}
