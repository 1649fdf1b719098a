//! The isolated execution context
//!
//! A [`Sandbox`] owns at most one live page. Each [`Sandbox::load`] tears the
//! previous page down and starts the new document on a fresh worker thread
//! with a fresh script engine, so nothing carries over between runs.
//!
//! Teardown does not interrupt a superseded page that is still running
//! timers; its messages keep arriving at the host unless the sandbox was
//! built with [`Sandbox::cancel_superseded`], which trips the old run's
//! cancellation token. Cancellation is cooperative and takes effect at
//! script-block boundaries and while waiting on timers.

use crate::abi::{RuntimeLimits, RuntimeResult};
use crate::engine::run_page;
use crate::host::{CancelToken, MessageTarget};
use crate::page::{Page, RenderedPage};
use playpen_types::{ComposedDocument, RunId};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Stack size for worker threads; the engine recurses deeply on nested code
const WORKER_STACK_SIZE: usize = 16 * 1024 * 1024;

/// A page running (or finished) on a worker thread
#[derive(Debug)]
struct RunningPage {
    origin: RunId,
    cancel: CancelToken,
    handle: Option<JoinHandle<()>>,
}

impl RunningPage {
    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(origin = %self.origin, "execution thread panicked");
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }
}

/// Isolated execution context for composed documents
#[derive(Debug)]
pub struct Sandbox {
    target: MessageTarget,
    limits: RuntimeLimits,
    cancel_superseded: bool,
    next_run: u64,
    current: Option<RunningPage>,
    superseded: Vec<RunningPage>,
    rendered: Option<RenderedPage>,
}

impl Sandbox {
    /// Create a sandbox that posts to `target`
    pub fn new(target: MessageTarget, limits: RuntimeLimits) -> Self {
        Self {
            target,
            limits,
            cancel_superseded: false,
            next_run: 0,
            current: None,
            superseded: Vec::new(),
            rendered: None,
        }
    }

    /// Cancel a page's remaining work when the next load replaces it
    pub fn cancel_superseded(mut self, cancel: bool) -> Self {
        self.cancel_superseded = cancel;
        self
    }

    pub fn limits(&self) -> &RuntimeLimits {
        &self.limits
    }

    /// Load a document, replacing whatever page was loaded before
    ///
    /// Returns the id stamped on every message the new page posts. The
    /// document's scripts start running immediately on the worker thread.
    pub fn load(&mut self, document: &ComposedDocument) -> RuntimeResult<RunId> {
        self.teardown();

        self.next_run += 1;
        let origin = RunId::new(self.next_run);
        let page = Page::parse(document.as_str());
        let cancel = CancelToken::new();
        let port = self.target.port(origin, cancel.clone());
        let limits = self.limits.clone();
        let scripts = page.scripts.len();

        self.rendered = Some(page.rendered().clone());

        let handle = thread::Builder::new()
            .name(format!("playpen-{}", origin.as_u64()))
            .stack_size(WORKER_STACK_SIZE)
            .spawn(move || run_page(page, port, limits))?;

        info!(%origin, scripts, "document loaded");
        self.current = Some(RunningPage {
            origin,
            cancel,
            handle: Some(handle),
        });

        Ok(origin)
    }

    /// Id of the most recent load
    pub fn current_run(&self) -> Option<RunId> {
        self.current.as_ref().map(|page| page.origin)
    }

    /// Static view of the most recently loaded page
    pub fn rendered(&self) -> Option<&RenderedPage> {
        self.rendered.as_ref()
    }

    /// Whether the current page still has work scheduled
    pub fn is_running(&self) -> bool {
        self.current.as_ref().is_some_and(|page| !page.is_finished())
    }

    /// Block until the current page has run its scripts and timers
    pub fn wait(&mut self) {
        if let Some(page) = self.current.as_mut() {
            page.join();
        }
    }

    /// Block until every page, including superseded ones, has finished
    pub fn wait_all(&mut self) {
        for page in &mut self.superseded {
            page.join();
        }
        self.superseded.clear();
        self.wait();
    }

    /// Cancel the current page's remaining work
    pub fn cancel(&self) {
        if let Some(page) = &self.current {
            debug!(origin = %page.origin, "cancelling run");
            page.cancel.cancel();
        }
    }

    fn teardown(&mut self) {
        self.superseded.retain(|page| !page.is_finished());

        if let Some(page) = self.current.take() {
            if self.cancel_superseded {
                page.cancel.cancel();
            }
            debug!(
                origin = %page.origin,
                cancelled = self.cancel_superseded,
                "previous page torn down"
            );
            if !page.is_finished() {
                self.superseded.push(page);
            }
        }
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        for page in self.superseded.iter().chain(self.current.iter()) {
            page.cancel.cancel();
        }
    }
}
