//! Image processing: pure Rust, built on the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Export resize** | sampled decode + Lanczos3, PNG or JPEG out |
//! | **Thumbnail** | Triangle resize to cover the box, JPEG bytes |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Planning functions and their backend execution

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use calculations::{
    calculate_fill_dimensions, calculate_sample_size, calculate_thumbnail_dimensions, resolve_size,
};
pub use operations::{
    ExportPlan, PlanError, create_thumbnail, get_dimensions, plan_export, plan_thumbnail,
};
pub use params::{ExportRequest, OutputFormat, Quality, ResizeParams, ThumbnailParams};
pub use rust_backend::RustBackend;
