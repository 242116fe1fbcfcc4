//! Rasterization library seam
//!
//! The viewer never decodes documents itself. A `Rasterizer` opens a document
//! from its URL; the resulting `Document` reports its page count and renders
//! single pages onto the host's drawing surface.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ViewerError;
use crate::layout::{PageSize, RenderTarget};

#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Fetch and decode the document at `url`
    async fn open(&self, url: &str) -> Result<Arc<dyn Document>, ViewerError>;
}

/// An opened document
#[async_trait]
pub trait Document: Send + Sync {
    fn page_count(&self) -> u32;

    /// Size of a page at scale 1 (pages are 1-based)
    async fn page_size(&self, page: u32) -> Result<PageSize, ViewerError>;

    /// Draw one page at the given target size
    async fn render_page(&self, page: u32, target: RenderTarget) -> Result<(), ViewerError>;
}
