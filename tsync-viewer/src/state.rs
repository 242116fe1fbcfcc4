//! Pagination state machine
//!
//! Pure and synchronous: every transition returns the page the caller must
//! start rendering now, if any. The async driver in `viewer` owns one of these
//! per mounted viewer and is the only thing that mutates it.
//!
//! ```text
//! Uninitialized -> Loading -> Ready <-> Rendering
//!                     |                    |
//!                     +------> Error <-----+
//! ```

use crate::error::ViewerError;

/// Message shown in place of the loading indicator when no URL was given
pub const MISSING_URL_MESSAGE: &str = "PDF URL not found.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Loading,
    Ready,
    Rendering,
    Error,
}

/// Visibility and enablement of the page navigation controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavState {
    /// False once the document is known to have a single page
    pub visible: bool,
    pub prev_enabled: bool,
    pub next_enabled: bool,
}

/// Result of a navigation request that moved the current page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation {
    /// New current page
    pub page: u32,
    /// Page to start rendering now; `None` when it was parked in the pending slot
    pub render: Option<u32>,
}

/// Observable copy of the viewer state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerSnapshot {
    pub phase: Phase,
    pub source_url: Option<String>,
    pub current_page: u32,
    pub page_count: Option<u32>,
    /// Page currently being rendered
    pub rendering_page: Option<u32>,
    pub pending_page: Option<u32>,
    pub nav: NavState,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PaginationState {
    phase: Phase,
    source_url: Option<String>,
    page_count: Option<u32>,
    current_page: u32,
    in_flight: Option<u32>,
    pending_page: Option<u32>,
    error: Option<String>,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::new()
    }
}

impl PaginationState {
    pub fn new() -> Self {
        Self::resuming_at(1)
    }

    /// State that will show `page` first once the document loads
    ///
    /// The page is clamped to the document's page count at load time.
    pub fn resuming_at(page: u32) -> Self {
        Self {
            phase: Phase::Uninitialized,
            source_url: None,
            page_count: None,
            current_page: page.max(1),
            in_flight: None,
            pending_page: None,
            error: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn page_count(&self) -> Option<u32> {
        self.page_count
    }

    pub fn pending_page(&self) -> Option<u32> {
        self.pending_page
    }

    pub fn is_rendering(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    /// Uninitialized -> Loading
    ///
    /// A missing or blank URL goes straight to `Error`. Calling this on a
    /// viewer that has already started does nothing.
    pub fn begin_load(&mut self, url: Option<&str>) -> Result<(), ViewerError> {
        if self.phase != Phase::Uninitialized {
            return Ok(());
        }

        match url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => {
                self.source_url = Some(url.to_string());
                self.phase = Phase::Loading;
                Ok(())
            }
            None => {
                self.fail(MISSING_URL_MESSAGE);
                Err(ViewerError::MissingUrl)
            }
        }
    }

    /// Loading -> Ready, then the first render
    pub fn document_loaded(&mut self, page_count: u32) -> Option<u32> {
        if self.phase != Phase::Loading {
            return None;
        }
        if page_count == 0 {
            self.fail("Document has no pages");
            return None;
        }

        self.page_count = Some(page_count);
        self.current_page = self.current_page.clamp(1, page_count);
        self.phase = Phase::Ready;
        self.request_render(self.current_page)
    }

    /// Ask for `page` to be shown
    ///
    /// Starts the render right away when idle. While a render is in flight the
    /// page replaces whatever was pending and `None` is returned.
    pub fn request_render(&mut self, page: u32) -> Option<u32> {
        let count = self.page_count?;
        let page = page.clamp(1, count);

        match self.phase {
            Phase::Ready => {
                self.current_page = page;
                self.in_flight = Some(page);
                self.phase = Phase::Rendering;
                Some(page)
            }
            Phase::Rendering => {
                self.current_page = page;
                self.pending_page = Some(page);
                None
            }
            Phase::Uninitialized | Phase::Loading | Phase::Error => None,
        }
    }

    /// The in-flight render completed; start the pending page if one is parked
    pub fn render_finished(&mut self) -> Option<u32> {
        if self.phase != Phase::Rendering {
            return None;
        }

        match self.pending_page.take() {
            Some(page) => {
                self.in_flight = Some(page);
                Some(page)
            }
            None => {
                self.in_flight = None;
                self.phase = Phase::Ready;
                None
            }
        }
    }

    /// Terminal failure; no retry
    pub fn fail(&mut self, message: impl Into<String>) {
        self.phase = Phase::Error;
        self.in_flight = None;
        self.pending_page = None;
        self.error = Some(message.into());
    }

    pub fn go_next(&mut self) -> Option<Navigation> {
        let count = self.page_count?;
        if self.current_page >= count {
            return None;
        }
        self.go_to(self.current_page + 1)
    }

    pub fn go_previous(&mut self) -> Option<Navigation> {
        if self.current_page <= 1 {
            return None;
        }
        self.go_to(self.current_page - 1)
    }

    /// Jump to a page; `None` when not navigable or already there
    pub fn go_to(&mut self, page: u32) -> Option<Navigation> {
        let count = self.page_count?;
        if !matches!(self.phase, Phase::Ready | Phase::Rendering) {
            return None;
        }
        let page = page.clamp(1, count);
        if page == self.current_page {
            return None;
        }

        let render = self.request_render(page);
        Some(Navigation { page, render })
    }

    pub fn nav_state(&self) -> NavState {
        NavState {
            visible: self.page_count != Some(1),
            prev_enabled: self.current_page > 1,
            next_enabled: self.page_count.is_some_and(|c| self.current_page < c),
        }
    }

    pub fn snapshot(&self) -> ViewerSnapshot {
        ViewerSnapshot {
            phase: self.phase,
            source_url: self.source_url.clone(),
            current_page: self.current_page,
            page_count: self.page_count,
            rendering_page: self.in_flight,
            pending_page: self.pending_page,
            nav: self.nav_state(),
            error: self.error.clone(),
        }
    }
}
