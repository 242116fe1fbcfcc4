//! Host page seam

use crate::state::NavState;

/// What replaces the canvas region when the document cannot be shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorFallback {
    pub headline: String,
    pub detail: String,
    /// Direct link to the original document
    pub download_url: Option<String>,
}

impl ErrorFallback {
    pub fn for_document(url: Option<&str>) -> Self {
        Self {
            headline: "Unable to display PDF viewer.".to_string(),
            detail: "The PDF viewer encountered an error.".to_string(),
            download_url: url.map(str::to_string),
        }
    }
}

/// The viewer's elements on the host page
///
/// Implementations are expected to be cheap and non-blocking; every method is
/// called from the viewer's event loop.
pub trait ViewerSurface: Send + Sync {
    /// Current width of the canvas container in CSS pixels, if measurable
    fn container_width(&self) -> Option<f64>;

    fn pixel_ratio(&self) -> f64 {
        1.0
    }

    fn set_loading_visible(&self, visible: bool);

    /// Replace the loading indicator text
    fn set_loading_message(&self, message: &str);

    fn apply_nav(&self, nav: NavState);

    fn show_error(&self, fallback: &ErrorFallback);

    fn scroll_into_view(&self);
}
