//! tsync-viewer library - paginated document viewer
//!
//! Drives page-by-page display of a transcription's PDF score. Document decoding
//! and page rasterization belong to an external library behind [`Rasterizer`];
//! the host page sits behind [`ViewerSurface`]. This crate owns the state in
//! between: which page is shown, whether a render is in flight, and which page
//! to render next.
//!
//! At most one render is in flight per viewer. Requests that arrive meanwhile
//! overwrite a single pending slot, so a burst of navigation collapses to the
//! last requested page.

pub mod config;
pub mod error;
pub mod layout;
pub mod raster;
pub mod registry;
pub mod state;
pub mod surface;
pub mod viewer;

pub use config::ViewerConfig;
pub use error::ViewerError;
pub use layout::{compute_render_target, PageSize, RenderTarget};
pub use raster::{Document, Rasterizer};
pub use registry::{MountOutcome, ViewerRegistry};
pub use state::{NavState, PaginationState, Phase, ViewerSnapshot};
pub use surface::{ErrorFallback, ViewerSurface};
pub use viewer::{spawn_viewer, ViewerHandle, ViewerInput, ViewerMount};
