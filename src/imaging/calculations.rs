//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use crate::types::{ContentMode, Dimensions};

/// Resolve the dimensions an exported image should have.
///
/// Rules, in order:
/// 1. A zero-area `target` means "no constraint": the origin is returned.
/// 2. A `target` that already contains the origin returns the origin. Images
///    are never upscaled.
/// 3. When both aspect ratios agree to one decimal place, the `target` is
///    returned verbatim, unless it is wider than the origin.
/// 4. A wider-than-origin `target` ratio under [`ContentMode::AspectFit`]
///    constrains by height.
/// 5. Everything else (including `AspectFill` and an unspecified mode)
///    constrains by width.
///
/// `origin.height` must be non-zero whenever the target constrains the
/// origin; callers validate that before resolving.
///
/// # Examples
/// ```
/// # use photo_bridge::imaging::resolve_size;
/// # use photo_bridge::types::{ContentMode, Dimensions};
/// let size = resolve_size(
///     Dimensions::new(1000, 500),
///     Dimensions::new(200, 200),
///     Some(ContentMode::AspectFit),
/// );
/// assert_eq!(size, Dimensions::new(200, 100));
/// ```
pub fn resolve_size(
    origin: Dimensions,
    target: Dimensions,
    mode: Option<ContentMode>,
) -> Dimensions {
    if target.is_unconstrained() || target.contains(origin) {
        return origin;
    }
    debug_assert!(origin.height > 0, "origin height must be known to resize");

    let origin_ratio = origin.width as f64 / origin.height as f64;
    let target_ratio = target.width as f64 / target.height as f64;

    if (origin_ratio * 10.0).round() == (target_ratio * 10.0).round() {
        if target.width > origin.width {
            origin
        } else {
            target
        }
    } else if target_ratio > origin_ratio && mode == Some(ContentMode::AspectFit) {
        let height = origin.height.min(target.height);
        Dimensions::new((origin_ratio * height as f64).round() as u32, height)
    } else {
        let width = origin.width.min(target.width);
        Dimensions::new(width, (width as f64 / origin_ratio).round() as u32)
    }
}

/// Power-of-two downsampling factor to apply while decoding.
///
/// Returns the largest factor that keeps both decoded axes at or above
/// `required`, so the final resize only ever shrinks. Returns 1 when the
/// origin is already within `required` or nothing is required.
///
/// # Examples
/// ```
/// # use photo_bridge::imaging::calculate_sample_size;
/// # use photo_bridge::types::Dimensions;
/// // 4000x3000 decoded at 1/8 is 500x375, still covering the request
/// let sample = calculate_sample_size(Dimensions::new(4000, 3000), Dimensions::new(500, 375));
/// assert_eq!(sample, 8);
/// ```
pub fn calculate_sample_size(origin: Dimensions, required: Dimensions) -> u32 {
    let mut sample = 1;
    if required.is_unconstrained() {
        return sample;
    }

    if origin.height > required.height || origin.width > required.width {
        let half_height = origin.height / 2;
        let half_width = origin.width / 2;

        while half_height / sample >= required.height && half_width / sample >= required.width {
            sample *= 2;
        }
    }
    sample
}

/// Calculate dimensions needed to fill a target area.
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension will match exactly, the other may exceed.
pub fn calculate_fill_dimensions(source: Dimensions, target: Dimensions) -> Dimensions {
    let src_aspect = source.width as f64 / source.height as f64;
    let tgt_aspect = target.width as f64 / target.height as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: height will match, width will exceed
        let h = target.height;
        Dimensions::new((h as f64 * src_aspect).round() as u32, h)
    } else {
        // Source is taller: width will match, height will exceed
        let w = target.width;
        Dimensions::new(w, (w as f64 / src_aspect).round() as u32)
    }
}

/// Thumbnail dimensions for an image shown in a `bounds` box.
///
/// Thumbnails cover the box (aspect fill, no crop) and are never larger
/// than the original.
pub fn calculate_thumbnail_dimensions(origin: Dimensions, bounds: Dimensions) -> Dimensions {
    if bounds.is_unconstrained() || origin.is_unconstrained() || bounds.contains(origin) {
        return origin;
    }
    let fill = calculate_fill_dimensions(origin, bounds);
    if origin.contains(fill) { fill } else { origin }
}
