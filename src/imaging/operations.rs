//! High-level image operations.
//!
//! These functions combine calculations with backend execution. Planning is
//! kept separate from doing: [`plan_export`] and [`plan_thumbnail`] are pure
//! and decide everything the backend will be asked to do.

use super::backend::{BackendError, ImageBackend};
use super::calculations::{calculate_sample_size, calculate_thumbnail_dimensions, resolve_size};
use super::params::{ExportRequest, OutputFormat, Quality, ThumbnailParams};
use crate::types::{Dimensions, MediumType};
use std::path::Path;
use thiserror::Error;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<Dimensions> {
    backend.identify(path)
}

/// The caller asked for something that cannot be planned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("cannot resize {source_name} to {target}: origin size {origin} is unknown")]
    UnknownOrigin {
        source_name: String,
        origin: Dimensions,
        target: Dimensions,
    },
    #[error("cannot resize {source_name} ({origin}) to {target}: resolves to {resolved}")]
    EmptyResult {
        source_name: String,
        origin: Dimensions,
        target: Dimensions,
        resolved: Dimensions,
    },
}

/// What an export will do to produce its cached file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPlan {
    /// Byte copy of the source.
    Copy,
    /// Decode, reduce by `sample_size`, resize exactly to `dimensions`, encode.
    Resize {
        dimensions: Dimensions,
        sample_size: u32,
        format: OutputFormat,
    },
}

/// Sources that are never re-encoded: streams, and GIFs (which would lose
/// their animation).
fn is_copied_verbatim(request: &ExportRequest) -> bool {
    request.medium_type != MediumType::Image || request.mime.eq_ignore_ascii_case("image/gif")
}

/// Decide between copying and resizing for one export.
///
/// An image whose origin size has a zero axis cannot be resized against a
/// real target, and neither can one whose resolved size has a zero axis.
/// Both are reported instead of guessed.
pub fn plan_export(request: &ExportRequest) -> std::result::Result<ExportPlan, PlanError> {
    if is_copied_verbatim(request) || request.target.is_unconstrained() {
        return Ok(ExportPlan::Copy);
    }
    if request.origin.is_unconstrained() {
        return Err(PlanError::UnknownOrigin {
            source_name: request.source.display().to_string(),
            origin: request.origin,
            target: request.target,
        });
    }

    let dimensions = resolve_size(request.origin, request.target, request.mode);
    if dimensions == request.origin {
        return Ok(ExportPlan::Copy);
    }
    // Extreme aspect ratios can round one axis down to nothing
    if dimensions.is_unconstrained() {
        return Err(PlanError::EmptyResult {
            source_name: request.source.display().to_string(),
            origin: request.origin,
            target: request.target,
            resolved: dimensions,
        });
    }
    Ok(ExportPlan::Resize {
        dimensions,
        sample_size: calculate_sample_size(request.origin, dimensions),
        format: OutputFormat::for_mime(&request.mime),
    })
}

/// Plan a thumbnail operation without executing it.
///
/// Useful for testing parameter generation.
pub fn plan_thumbnail(
    source: &Path,
    origin: Dimensions,
    bounds: Dimensions,
    quality: Quality,
) -> ThumbnailParams {
    let dims = calculate_thumbnail_dimensions(origin, bounds);
    ThumbnailParams {
        source: source.to_path_buf(),
        width: dims.width,
        height: dims.height,
        quality,
    }
}

/// Render a thumbnail for `source` into JPEG bytes.
pub fn create_thumbnail(
    backend: &impl ImageBackend,
    source: &Path,
    origin: Dimensions,
    bounds: Dimensions,
    quality: Quality,
) -> Result<Vec<u8>> {
    let params = plan_thumbnail(source, origin, bounds, quality);
    backend.thumbnail(&params)
}
