//! Viewer driver
//!
//! One tokio task per mounted viewer runs a single-threaded event loop over:
//! - input events from the host (navigation, resize)
//! - completions of the load or render job it spawned
//! - the resize debounce timer
//!
//! Jobs run on a `JoinSet` owned by the loop, so aborting the driver task also
//! cancels whatever load or render it had in flight.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{sleep_until, timeout, Instant};
use tracing::{debug, error, info, warn};

use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::layout::compute_render_target;
use crate::raster::{Document, Rasterizer};
use crate::state::{
    NavState, Navigation, PaginationState, Phase, ViewerSnapshot, MISSING_URL_MESSAGE,
};
use crate::surface::{ErrorFallback, ViewerSurface};

const INPUT_CHANNEL_CAPACITY: usize = 32;

/// Host events delivered to a running viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerInput {
    Next,
    Previous,
    GoTo(u32),
    /// The container may have changed size
    Resize,
}

/// A viewer element appearing on the host page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerMount {
    /// Stable key of the viewer's place on the page
    pub root: String,
    /// Identity of this particular element instance
    pub element_id: String,
    /// Value of the element's document URL attribute
    pub pdf_url: Option<String>,
}

impl ViewerMount {
    pub fn new(
        root: impl Into<String>,
        element_id: impl Into<String>,
        pdf_url: Option<&str>,
    ) -> Self {
        Self {
            root: root.into(),
            element_id: element_id.into(),
            pdf_url: pdf_url.map(str::to_string),
        }
    }
}

/// Handle to a running viewer
///
/// Dropping the handle stops the viewer.
pub struct ViewerHandle {
    element_id: String,
    inputs: mpsc::Sender<ViewerInput>,
    state: watch::Receiver<ViewerSnapshot>,
    task: JoinHandle<()>,
}

impl ViewerHandle {
    pub fn element_id(&self) -> &str {
        &self.element_id
    }

    /// Latest published state
    pub fn snapshot(&self) -> ViewerSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewerSnapshot> {
        self.state.clone()
    }

    pub async fn send(&self, input: ViewerInput) -> Result<(), ViewerError> {
        self.inputs
            .send(input)
            .await
            .map_err(|_| ViewerError::Closed)
    }

    pub async fn next(&self) -> Result<(), ViewerError> {
        self.send(ViewerInput::Next).await
    }

    pub async fn previous(&self) -> Result<(), ViewerError> {
        self.send(ViewerInput::Previous).await
    }

    pub async fn go_to(&self, page: u32) -> Result<(), ViewerError> {
        self.send(ViewerInput::GoTo(page)).await
    }

    pub async fn resize(&self) -> Result<(), ViewerError> {
        self.send(ViewerInput::Resize).await
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Abort the driver task and any job it has in flight
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for ViewerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start a viewer for a mounted element
///
/// `start_page` is where the document opens (clamped to its page count).
/// Must be called from within a tokio runtime.
pub fn spawn_viewer(
    mount: &ViewerMount,
    start_page: u32,
    rasterizer: Arc<dyn Rasterizer>,
    surface: Arc<dyn ViewerSurface>,
    config: ViewerConfig,
) -> ViewerHandle {
    let state = PaginationState::resuming_at(start_page);
    let (state_tx, state_rx) = watch::channel(state.snapshot());
    let (input_tx, input_rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);

    let driver = Driver {
        element_id: mount.element_id.clone(),
        state,
        document: None,
        rasterizer,
        surface,
        config,
        jobs: JoinSet::new(),
        resize_deadline: None,
        last_nav: None,
        published: state_tx,
    };
    let task = tokio::spawn(driver.run(input_rx, mount.pdf_url.clone()));

    ViewerHandle {
        element_id: mount.element_id.clone(),
        inputs: input_tx,
        state: state_rx,
        task,
    }
}

enum Completion {
    Loaded(Result<Arc<dyn Document>, ViewerError>),
    Rendered {
        page: u32,
        result: Result<(), ViewerError>,
    },
}

struct Driver {
    element_id: String,
    state: PaginationState,
    document: Option<Arc<dyn Document>>,
    rasterizer: Arc<dyn Rasterizer>,
    surface: Arc<dyn ViewerSurface>,
    config: ViewerConfig,
    jobs: JoinSet<Completion>,
    resize_deadline: Option<Instant>,
    last_nav: Option<NavState>,
    published: watch::Sender<ViewerSnapshot>,
}

impl Driver {
    async fn run(mut self, mut inputs: mpsc::Receiver<ViewerInput>, url: Option<String>) {
        match self.state.begin_load(url.as_deref()) {
            Ok(()) => {
                info!("Viewer {} loading {}", self.element_id, url.as_deref().unwrap_or_default());
                self.surface.set_loading_visible(true);
                self.start_load();
            }
            Err(e) => {
                warn!("Viewer {} not started: {}", self.element_id, e);
                self.surface.set_loading_message(MISSING_URL_MESSAGE);
                self.publish();
                return;
            }
        }
        self.publish();

        loop {
            let deadline = self.resize_deadline;
            tokio::select! {
                input = inputs.recv() => match input {
                    Some(input) => self.on_input(input),
                    None => break,
                },
                Some(joined) = self.jobs.join_next() => self.on_completion(joined),
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.resize_deadline = None;
                    self.on_resize_settled();
                }
            }
            self.publish();
        }

        debug!("Viewer {} input closed, stopping", self.element_id);
    }

    fn on_input(&mut self, input: ViewerInput) {
        match input {
            ViewerInput::Next => {
                let nav = self.state.go_next();
                self.after_navigation(nav);
            }
            ViewerInput::Previous => {
                let nav = self.state.go_previous();
                self.after_navigation(nav);
            }
            ViewerInput::GoTo(page) => {
                let nav = self.state.go_to(page);
                self.after_navigation(nav);
            }
            ViewerInput::Resize => {
                // Trailing edge: every resize pushes the deadline out
                if self.document.is_some() {
                    self.resize_deadline = Some(Instant::now() + self.config.resize_debounce);
                }
            }
        }
    }

    fn after_navigation(&mut self, nav: Option<Navigation>) {
        let Some(nav) = nav else {
            return;
        };
        if let Some(page) = nav.render {
            self.start_render(page);
        }
        self.surface.scroll_into_view();
    }

    fn on_resize_settled(&mut self) {
        debug!("Viewer {} re-rendering after resize", self.element_id);
        if let Some(page) = self.state.request_render(self.state.current_page()) {
            self.start_render(page);
        }
    }

    fn on_completion(&mut self, joined: Result<Completion, JoinError>) {
        let completion = match joined {
            Ok(completion) => completion,
            Err(e) if e.is_cancelled() => return,
            Err(e) => {
                error!("Viewer {} job panicked: {}", self.element_id, e);
                self.fail(ViewerError::Render {
                    page: self.state.current_page(),
                    reason: e.to_string(),
                });
                return;
            }
        };

        match completion {
            Completion::Loaded(Ok(document)) => {
                let page_count = document.page_count();
                info!("Viewer {} loaded document: {} page(s)", self.element_id, page_count);
                self.document = Some(document);

                let first = self.state.document_loaded(page_count);
                if self.state.phase() == Phase::Error {
                    error!("Viewer {} document has no pages", self.element_id);
                    self.show_fallback();
                    return;
                }
                self.surface.set_loading_visible(false);
                if let Some(page) = first {
                    self.start_render(page);
                }
            }
            Completion::Loaded(Err(e)) => {
                error!("Viewer {} failed to load document: {}", self.element_id, e);
                self.fail(e);
            }
            Completion::Rendered { page, result: Ok(()) } => {
                debug!("Viewer {} rendered page {}", self.element_id, page);
                if let Some(next) = self.state.render_finished() {
                    self.start_render(next);
                }
            }
            Completion::Rendered { page, result: Err(e) } => {
                error!("Viewer {} failed to render page {}: {}", self.element_id, page, e);
                self.fail(e);
            }
        }
    }

    fn start_load(&mut self) {
        let Some(url) = self.state.source_url().map(str::to_string) else {
            return;
        };
        let rasterizer = self.rasterizer.clone();
        let limit = self.config.operation_timeout;

        self.jobs.spawn(async move {
            let result = match timeout(limit, rasterizer.open(&url)).await {
                Ok(result) => result,
                Err(_) => Err(ViewerError::Timeout {
                    operation: "Document load",
                    after: limit,
                }),
            };
            Completion::Loaded(result)
        });
    }

    fn start_render(&mut self, page: u32) {
        let Some(document) = self.document.clone() else {
            return;
        };
        let surface = self.surface.clone();
        let config = self.config.clone();

        self.jobs.spawn(async move {
            let limit = config.operation_timeout;
            let result = match timeout(limit, render_one(document, surface, &config, page)).await {
                Ok(result) => result,
                Err(_) => Err(ViewerError::Timeout {
                    operation: "Page render",
                    after: limit,
                }),
            };
            Completion::Rendered { page, result }
        });
    }

    fn fail(&mut self, err: ViewerError) {
        self.state.fail(err.to_string());
        self.resize_deadline = None;
        self.show_fallback();
    }

    fn show_fallback(&self) {
        let fallback = ErrorFallback::for_document(self.state.source_url());
        self.surface.show_error(&fallback);
    }

    /// Push the current state to subscribers and the navigation controls
    fn publish(&mut self) {
        let snapshot = self.state.snapshot();

        if self.state.page_count().is_some() && self.last_nav != Some(snapshot.nav) {
            self.surface.apply_nav(snapshot.nav);
            self.last_nav = Some(snapshot.nav);
        }

        self.published.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

async fn render_one(
    document: Arc<dyn Document>,
    surface: Arc<dyn ViewerSurface>,
    config: &ViewerConfig,
    page: u32,
) -> Result<(), ViewerError> {
    let size = document.page_size(page).await?;
    // Measured at render time so resizes take effect
    let target = compute_render_target(
        size,
        surface.container_width(),
        surface.pixel_ratio(),
        config.quality_multiplier,
        config.fallback_container_width,
    )
    .ok_or_else(|| ViewerError::Render {
        page,
        reason: format!("unusable page size {}x{}", size.width, size.height),
    })?;
    document.render_page(page, target).await
}
