//! Viewer mount registry
//!
//! The host fires one "viewer mounted" event per element. The registry keeps at
//! most one running viewer per page root:
//! - the same element mounted again is a no-op
//! - a new element on the same root replaces the old viewer, which is stopped
//!   before the new one starts, so input is never wired to two viewers
//! - a replacement showing the same document resumes on the page the old
//!   viewer was showing

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ViewerConfig;
use crate::raster::Rasterizer;
use crate::surface::ViewerSurface;
use crate::viewer::{spawn_viewer, ViewerHandle, ViewerMount};

/// What a mount event did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    /// A viewer started on page 1
    Started,
    /// A viewer replaced one showing the same document and continued on `page`
    Resumed { page: u32 },
    /// This element already has a running viewer
    AlreadyMounted,
}

pub struct ViewerRegistry {
    rasterizer: Arc<dyn Rasterizer>,
    config: ViewerConfig,
    viewers: HashMap<String, ViewerHandle>,
}

impl ViewerRegistry {
    pub fn new(rasterizer: Arc<dyn Rasterizer>, config: ViewerConfig) -> Self {
        Self {
            rasterizer,
            config,
            viewers: HashMap::new(),
        }
    }

    /// Handle a viewer-mounted event
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(&mut self, mount: ViewerMount, surface: Arc<dyn ViewerSurface>) -> MountOutcome {
        let mut start_page = 1;

        if let Some(existing) = self.viewers.get(&mount.root) {
            if existing.element_id() == mount.element_id {
                debug!("Viewer element {} already mounted", mount.element_id);
                return MountOutcome::AlreadyMounted;
            }

            let previous = existing.snapshot();
            let new_url = mount.pdf_url.as_deref().map(str::trim);
            if previous.source_url.is_some() && previous.source_url.as_deref() == new_url {
                start_page = previous.current_page;
            }
        }

        if let Some(old) = self.viewers.remove(&mount.root) {
            info!(
                "Replacing viewer {} with {} on {}",
                old.element_id(),
                mount.element_id,
                mount.root
            );
            old.shutdown();
        }

        let handle = spawn_viewer(
            &mount,
            start_page,
            self.rasterizer.clone(),
            surface,
            self.config.clone(),
        );
        self.viewers.insert(mount.root, handle);

        if start_page > 1 {
            MountOutcome::Resumed { page: start_page }
        } else {
            MountOutcome::Started
        }
    }

    /// Stop and forget the viewer on `root`
    pub fn unmount(&mut self, root: &str) -> bool {
        match self.viewers.remove(root) {
            Some(handle) => {
                handle.shutdown();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, root: &str) -> Option<&ViewerHandle> {
        self.viewers.get(root)
    }

    pub fn len(&self) -> usize {
        self.viewers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.viewers.is_empty()
    }
}
