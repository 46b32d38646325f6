//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! The primary display for every entity (album, medium, export) is its
//! identity: positional index and name. Ids, paths and technical details
//! follow as indented context lines.
//!
//! # Output Format
//!
//! ## Albums
//!
//! ```text
//! Image albums
//! 001 All (5 items)
//!     Id: __ALL__
//! 002 Camera (3 items)
//!     Id: Camera
//! ```
//!
//! ## Media
//!
//! ```text
//! Media 1-2 of 5
//! 001 Camera/IMG_0002.png
//!     image/png 120x80
//! 002 Camera/IMG_0001.jpg
//!     image/jpeg 400x300
//! ```
//!
//! ## Exports
//!
//! ```text
//! 001 Camera/IMG_0001.jpg: encoded 200x150
//!     File: /tmp/photo_gallery/3f9a..._200_150_IMG_0001.jpg
//! 002 nope: not found
//! Exported 1 reused, 0 copied, 1 encoded (2 total)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::cache::{CacheStats, ExportedFile};
use crate::types::{Album, MediaPage, MediaRecord, MediumType};

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn format_size(record: &MediaRecord) -> String {
    if record.dimensions().is_unconstrained() {
        "unknown size".to_string()
    } else {
        record.dimensions().to_string()
    }
}

/// Format a millisecond duration as `m:ss`.
fn format_duration(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn capitalized(kind: MediumType) -> String {
    let name = kind.as_str();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// Albums
// ============================================================================

pub fn format_albums(medium_type: MediumType, albums: &[Album]) -> Vec<String> {
    let mut lines = vec![format!("{} albums", capitalized(medium_type))];
    for (i, album) in albums.iter().enumerate() {
        lines.push(format!(
            "{} {} ({} items)",
            format_index(i + 1),
            album.name,
            album.count
        ));
        lines.push(format!("{}Id: {}", indent(1), album.id));
    }
    lines
}

pub fn print_albums(medium_type: MediumType, albums: &[Album]) {
    for line in format_albums(medium_type, albums) {
        println!("{}", line);
    }
}

// ============================================================================
// Media
// ============================================================================

pub fn format_media_page(page: &MediaPage) -> Vec<String> {
    if page.items.is_empty() {
        return vec![format!("No media (skipped {} of {})", page.start, page.total)];
    }
    let mut lines = vec![format!(
        "Media {}-{} of {}",
        page.start + 1,
        page.start + page.items.len(),
        page.total
    )];
    for (i, record) in page.items.iter().enumerate() {
        lines.push(format!("{} {}", format_index(page.start + i + 1), record.id));
        lines.push(format!("{}{} {}", indent(1), record.mime, format_size(record)));
    }
    lines
}

pub fn print_media_page(page: &MediaPage) {
    for line in format_media_page(page) {
        println!("{}", line);
    }
}

/// Every field of one medium, one per line.
pub fn format_medium(record: &MediaRecord) -> Vec<String> {
    let mut lines = vec![
        record.id.clone(),
        format!("{}Type: {}", indent(1), record.medium_type),
        format!("{}MIME: {}", indent(1), record.mime),
        format!("{}Size: {}", indent(1), format_size(record)),
        format!("{}Album: {} ({})", indent(1), record.album_name, record.album_id),
    ];
    if let Some(created) = record.creation_date {
        lines.push(format!("{}Created: {}", indent(1), created));
    }
    if let Some(modified) = record.modified_date {
        lines.push(format!("{}Modified: {}", indent(1), modified));
    }
    if record.medium_type != MediumType::Image {
        lines.push(format!("{}Duration: {}", indent(1), format_duration(record.duration)));
    }
    lines
}

pub fn print_medium(record: &MediaRecord) {
    for line in format_medium(record) {
        println!("{}", line);
    }
}

// ============================================================================
// Exports
// ============================================================================

/// Result of exporting one requested medium.
pub enum ExportLine<'a> {
    Exported(&'a ExportedFile),
    NotFound,
    Failed(String),
}

pub fn format_export(index: usize, medium_id: &str, line: &ExportLine<'_>) -> Vec<String> {
    let header = format_index(index);
    match line {
        ExportLine::Exported(file) => vec![
            format!(
                "{} {}: {} {}",
                header, medium_id, file.outcome, file.dimensions
            ),
            format!("{}File: {}", indent(1), file.path.display()),
        ],
        ExportLine::NotFound => vec![format!("{} {}: not found", header, medium_id)],
        ExportLine::Failed(reason) => vec![format!("{} {}: failed: {}", header, medium_id, reason)],
    }
}

pub fn print_export(index: usize, medium_id: &str, line: &ExportLine<'_>) {
    for line in format_export(index, medium_id, line) {
        println!("{}", line);
    }
}

pub fn format_export_summary(stats: &CacheStats) -> String {
    format!("Exported {}", stats)
}
