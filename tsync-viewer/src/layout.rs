//! Render target sizing
//!
//! The page is scaled to fit the container width, then oversampled by the
//! display pixel ratio times a quality multiplier so the backing canvas is
//! always denser than its CSS box.

/// Page dimensions at scale 1, in document units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

/// Backing canvas resolution and CSS display size for one render
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTarget {
    /// Scale passed to the rasterizer
    pub scale: f64,
    pub backing_width: u32,
    pub backing_height: u32,
    pub css_width: f64,
    pub css_height: f64,
}

/// Compute the render target for a page
///
/// `container_width` of `None` (or a non-positive width) falls back to
/// `fallback_width`; an unusable pixel ratio counts as 1. Returns `None` when
/// the page has no usable size.
pub fn compute_render_target(
    page: PageSize,
    container_width: Option<f64>,
    pixel_ratio: f64,
    quality_multiplier: f64,
    fallback_width: f64,
) -> Option<RenderTarget> {
    if !(page.width.is_finite() && page.width > 0.0)
        || !(page.height.is_finite() && page.height >= 0.0)
    {
        return None;
    }

    let container_width = container_width
        .filter(|w| w.is_finite() && *w > 0.0)
        .unwrap_or(fallback_width);
    let pixel_ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
        pixel_ratio
    } else {
        1.0
    };

    let base_scale = container_width / page.width;
    let output_scale = pixel_ratio * quality_multiplier;
    let scale = base_scale * output_scale;

    let scaled_width = page.width * scale;
    let scaled_height = page.height * scale;

    Some(RenderTarget {
        scale,
        // Canvas dimensions truncate
        backing_width: scaled_width as u32,
        backing_height: scaled_height as u32,
        css_width: container_width,
        css_height: scaled_height / output_scale,
    })
}
