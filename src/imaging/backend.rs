//! Image processing backend trait and errors.
//!
//! The [`ImageBackend`] trait defines the three operations the bridge needs
//! from an imaging stack: identify, resize-to-file, and thumbnail-to-bytes.
//! Decoding and encoding live entirely behind it, so the export cache and the
//! gallery service stay backend-agnostic.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate.

use super::params::{ResizeParams, ThumbnailParams};
use crate::types::Dimensions;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Trait for image processing backends.
///
/// Implementations must be `Sync`: the export cache calls into one shared
/// backend from many threads at once.
pub trait ImageBackend: Sync {
    /// Read image dimensions without a full decode where possible.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode `params.source`, resize to exactly `width`x`height`, and write
    /// the encoded result to `params.output`.
    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError>;

    /// Render a JPEG thumbnail and return its bytes.
    fn thumbnail(&self, params: &ThumbnailParams) -> Result<Vec<u8>, BackendError>;
}
