//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the planning functions in [`operations`](super::operations)
//! and the [`backend`](super::backend) that does the pixel work, so a mock
//! backend can stand in during tests.
//!
//! - [`Quality`]: lossy encoding quality (1 to 100). Clamped on construction.
//! - [`OutputFormat`]: container written for a resized export (PNG or JPEG).
//! - [`ResizeParams`]: source, output path, final dimensions, decode sample size.
//! - [`ThumbnailParams`]: source, thumbnail dimensions, JPEG quality.
//! - [`ExportRequest`]: one medium to export at a requested size.

use crate::types::{ContentMode, Dimensions, MediaRecord, MediumType};
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(100)
    }
}

/// Encoded format of a resized export.
///
/// PNG sources stay PNG so transparency survives; everything else is
/// written as JPEG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    /// Pick the output format for a source MIME type.
    pub fn for_mime(mime: &str) -> Self {
        if mime.eq_ignore_ascii_case("image/png") {
            OutputFormat::Png
        } else {
            OutputFormat::Jpeg
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }
}

/// Parameters for a resize-to-file operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Final output dimensions.
    pub width: u32,
    pub height: u32,
    /// Power-of-two factor the source may be reduced by before the final resize.
    pub sample_size: u32,
    pub format: OutputFormat,
    pub quality: Quality,
}

/// Parameters for an in-memory JPEG thumbnail.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailParams {
    pub source: PathBuf,
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}

/// A medium to export, with the size the caller asked for.
///
/// `origin` is the medium's known size; a zero axis means unknown. A zero
/// `target` area means "no constraint".
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub source: PathBuf,
    pub medium_type: MediumType,
    pub mime: String,
    pub origin: Dimensions,
    pub target: Dimensions,
    pub mode: Option<ContentMode>,
}

impl ExportRequest {
    pub fn for_record(record: &MediaRecord, target: Dimensions, mode: Option<ContentMode>) -> Self {
        Self {
            source: record.source.clone(),
            medium_type: record.medium_type,
            mime: record.mime.clone(),
            origin: record.dimensions(),
            target,
            mode,
        }
    }
}
