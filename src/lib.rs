//! # Photo Bridge
//!
//! Exposes a photo and video library to an application runtime through a
//! small set of request/response operations: list albums, list an album's
//! media, fetch one medium's metadata, render thumbnails, export a file at
//! full or reduced size, and clear the export cache.
//!
//! # Architecture
//!
//! ```text
//!   JSON request ──► channel ──spawn_blocking──► gallery ──► index   (MediaIndex)
//!                                                   │
//!                                                   ├──► albums  (aggregate)
//!                                                   ├──► imaging (size policy, ImageBackend)
//!                                                   └──► cache   (ExportCache on disk)
//! ```
//!
//! The media store is reached only through the [`index::MediaIndex`] trait,
//! and pixels only through [`imaging::ImageBackend`]. Both have pure-Rust
//! implementations ([`index::FsMediaIndex`], [`imaging::RustBackend`]) and
//! test doubles, so every layer above them is exercised without a device.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | Records, albums, pages and dimensions shared by every layer |
//! | [`albums`] | Groups flat records into albums, "All" first |
//! | [`imaging`] | Size resolution, sample sizes, thumbnail math, the image backend |
//! | [`cache`] | Deterministic, atomic, concurrency-safe export cache |
//! | [`index`] | The media index trait and the directory-tree index |
//! | [`gallery`] | The seven bridge operations over index, backend and cache |
//! | [`channel`] | JSON method channel on tokio's blocking pool |
//! | [`config`] | `config.toml` loading, validation and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## No Long-Lived Index
//!
//! Every listing re-reads the media store. Phones add and delete photos
//! behind the app's back; a cached index would be wrong more often than it
//! would be fast.
//!
//! ## Size Policy Compatibility
//!
//! [`imaging::resolve_size`] reproduces the native plugins' arithmetic
//! exactly, including the one-decimal ratio comparison, so exported files
//! have the dimensions existing callers expect.
//!
//! ## Loud Export Failures
//!
//! An export either yields a file under the cache root or a typed
//! [`cache::ExportError`]. It never hands back the original file path in
//! place of a failed resize.

pub mod albums;
pub mod cache;
pub mod channel;
pub mod config;
pub mod gallery;
pub mod imaging;
pub mod index;
pub mod output;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
