//! Export cache for full-resolution and resized media files.
//!
//! Callers that want a medium as a local file (to share it, upload it, or
//! hand it to a player) go through [`ExportCache::export`]. The cache decides
//! whether the medium is copied as-is or resized, writes the result under a
//! deterministic name in its root directory, and hands back the path.
//!
//! # Design
//!
//! ## File names
//!
//! Names are derived from the source path, never from file contents, so a
//! lookup costs one hash and one `stat`:
//!
//! | Export | File name |
//! |---|---|
//! | Resized | `{hash}_{width}_{height}_{file_name}` |
//! | Copied | `{hash}_raw_{file_name}` |
//!
//! `hash` is the first 32 hex characters of the SHA-256 of the source path
//! bytes. `width`/`height` are the *final* dimensions after size resolution,
//! so two requests that resolve to the same output share one file. Resized
//! and copied exports can never collide.
//!
//! ## Writes
//!
//! Every file is produced in a `.partial-*` temporary inside the root and
//! renamed into place, so a reader sees either nothing or a complete file.
//! A failed write leaves no file behind and surfaces as an [`ExportError`];
//! there is no fallback to the unmanaged source path.
//!
//! ## Concurrency
//!
//! - One mutex per file name covers check, encode and rename. Exports of
//!   different keys run in parallel. The entry is dropped once no export
//!   holds it, so the lock map only ever holds in-flight keys.
//! - A reader/writer gate: exports hold it shared, [`ExportCache::clear`]
//!   holds it exclusively.
//! - Poisoned locks are recovered. The state they protect is either on disk
//!   or a counter, and every export can be retried.

use crate::imaging::{
    BackendError, ExportPlan, ExportRequest, ImageBackend, PlanError, Quality, ResizeParams,
    plan_export,
};
use crate::types::Dimensions;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use thiserror::Error;

/// Directory name used under the system temp dir when no cache dir is configured.
pub const DEFAULT_CACHE_DIR_NAME: &str = "photo_gallery";

const PARTIAL_PREFIX: &str = ".partial-";

const HASH_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Precondition violated: {0}")]
    Precondition(#[from] PlanError),
}

impl From<BackendError> for ExportError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Io(e) => ExportError::Io(e),
            BackendError::Decode(msg) => ExportError::Decode(msg),
            BackendError::Encode(msg) => ExportError::Encode(msg),
        }
    }
}

impl ExportError {
    /// I/O failures may succeed on a second attempt; bad input will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExportError::Io(_))
    }
}

/// How an export was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// A file with the same name was already in the cache.
    Reused,
    /// The source bytes were copied.
    Copied,
    /// The source was decoded, resized and encoded.
    Encoded,
}

impl fmt::Display for CacheOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CacheOutcome::Reused => "reused",
            CacheOutcome::Copied => "copied",
            CacheOutcome::Encoded => "encoded",
        })
    }
}

/// A file in the export cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub content_type: String,
    /// Final dimensions; the origin size for copies (zero when unknown).
    pub dimensions: Dimensions,
    pub outcome: CacheOutcome,
}

/// Summary of cache activity since the cache was created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub reused: u32,
    pub copied: u32,
    pub encoded: u32,
}

impl CacheStats {
    fn record(&mut self, outcome: CacheOutcome) {
        match outcome {
            CacheOutcome::Reused => self.reused += 1,
            CacheOutcome::Copied => self.copied += 1,
            CacheOutcome::Encoded => self.encoded += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.reused + self.copied + self.encoded
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reused > 0 || self.copied > 0 {
            write!(
                f,
                "{} reused, {} copied, {} encoded ({} total)",
                self.reused,
                self.copied,
                self.encoded,
                self.total()
            )
        } else {
            write!(f, "{} encoded", self.encoded)
        }
    }
}

/// SHA-256 of the source path bytes, truncated to 32 hex characters.
pub fn hash_source_path(path: &Path) -> String {
    let digest = Sha256::digest(path.as_os_str().as_encoded_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(HASH_LEN);
    hex
}

fn base_name(source: &Path) -> String {
    source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "medium".to_string())
}

/// Cache file name of a resized export.
pub fn scaled_file_name(source: &Path, dimensions: Dimensions) -> String {
    format!(
        "{}_{}_{}_{}",
        hash_source_path(source),
        dimensions.width,
        dimensions.height,
        base_name(source)
    )
}

/// Cache file name of a verbatim copy.
pub fn raw_file_name(source: &Path) -> String {
    format!("{}_raw_{}", hash_source_path(source), base_name(source))
}

/// On-disk cache of exported media files.
pub struct ExportCache {
    root: PathBuf,
    quality: Quality,
    reuse_existing: bool,
    gate: RwLock<()>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    stats: Mutex<CacheStats>,
}

impl ExportCache {
    /// A cache writing into `root`. The directory is created on first export.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            quality: Quality::default(),
            reuse_existing: true,
            gate: RwLock::new(()),
            locks: Mutex::new(HashMap::new()),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    /// JPEG quality for resized exports.
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Whether an existing file with the derived name is returned as is.
    pub fn with_reuse_existing(mut self, reuse: bool) -> Self {
        self.reuse_existing = reuse;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn key_lock(&self, file_name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(file_name.to_string()).or_default())
    }

    /// Give back a lock taken with [`key_lock`](Self::key_lock), dropping
    /// the map entry when no other export holds it.
    fn release_key(&self, file_name: &str, key_lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        drop(key_lock);
        if locks
            .get(file_name)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(file_name);
        }
    }

    /// Export one medium, returning the path of its cached file.
    pub fn export(
        &self,
        backend: &impl ImageBackend,
        request: &ExportRequest,
    ) -> Result<ExportedFile, ExportError> {
        let plan = plan_export(request)?;
        let (file_name, content_type, dimensions) = match plan {
            ExportPlan::Copy => (
                raw_file_name(&request.source),
                request.mime.clone(),
                request.origin,
            ),
            ExportPlan::Resize {
                dimensions, format, ..
            } => (
                scaled_file_name(&request.source, dimensions),
                format.mime().to_string(),
                dimensions,
            ),
        };

        let _gate = self.gate.read().unwrap_or_else(PoisonError::into_inner);
        let path = self.root.join(&file_name);
        let key_lock = self.key_lock(&file_name);
        let written = {
            let _key = key_lock.lock().unwrap_or_else(PoisonError::into_inner);
            if self.reuse_existing && path.is_file() {
                log::debug!("reusing cached {}", path.display());
                Ok(CacheOutcome::Reused)
            } else {
                self.write(backend, request, plan, &path)
            }
        };
        self.release_key(&file_name, key_lock);
        let outcome = written?;

        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(outcome);

        Ok(ExportedFile {
            path,
            content_type,
            dimensions,
            outcome,
        })
    }

    /// Produce the file for `plan` at `path` through a temporary in the root.
    fn write(
        &self,
        backend: &impl ImageBackend,
        request: &ExportRequest,
        plan: ExportPlan,
        path: &Path,
    ) -> Result<CacheOutcome, ExportError> {
        std::fs::create_dir_all(&self.root)?;
        let partial = tempfile::Builder::new()
            .prefix(PARTIAL_PREFIX)
            .tempfile_in(&self.root)?
            .into_temp_path();

        let outcome = match plan {
            ExportPlan::Copy => {
                std::fs::copy(&request.source, &partial)?;
                CacheOutcome::Copied
            }
            ExportPlan::Resize {
                dimensions,
                sample_size,
                format,
            } => {
                backend.resize(&ResizeParams {
                    source: request.source.clone(),
                    output: partial.to_path_buf(),
                    width: dimensions.width,
                    height: dimensions.height,
                    sample_size,
                    format,
                    quality: self.quality,
                })?;
                CacheOutcome::Encoded
            }
        };

        partial.persist(path).map_err(|e| e.error)?;
        log::info!(
            "{} {} -> {}",
            outcome,
            request.source.display(),
            path.display()
        );
        Ok(outcome)
    }

    /// Delete the cache directory and everything in it.
    ///
    /// Waits for in-flight exports to finish. A missing directory is not an
    /// error.
    pub fn clear(&self) -> Result<(), ExportError> {
        let _gate = self.gate.write().unwrap_or_else(PoisonError::into_inner);
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => log::info!("cleared export cache {}", self.root.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("export cache {} already absent", self.root.display())
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}
