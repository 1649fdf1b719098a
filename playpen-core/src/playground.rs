//! The run pipeline: edit, compose, load, collect diagnostics.

use crate::bridge::MessageBridge;
use crate::config::PlaygroundConfig;
use crate::log::LogStore;
use crate::store::SessionState;
use playpen_render::{compose, ComposeError};
use playpen_runtime::{MessageTarget, RenderedPage, RuntimeError, Sandbox};
use playpen_types::{DiagnosticEvent, FragmentKind, RunId};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum PlaygroundError {
    #[error("Failed to compose document: {0}")]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub type Result<T> = std::result::Result<T, PlaygroundError>;

/// Where the pipeline is
///
/// A loaded page stays loaded until the next run replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Composing,
    Loaded(RunId),
}

/// A playground session
///
/// Owns the fragments, the log, the sandbox and the bridge between them.
#[derive(Debug)]
pub struct Playground {
    config: PlaygroundConfig,
    state: SessionState,
    log: LogStore,
    sandbox: Sandbox,
    bridge: MessageBridge,
    phase: Phase,
}

impl Playground {
    pub fn new(config: PlaygroundConfig) -> Result<Self> {
        let target = MessageTarget::new();
        let bridge = MessageBridge::mount(&target, config.origin_policy)?;
        let sandbox = Sandbox::new(target, config.limits.clone())
            .cancel_superseded(config.cancel_superseded);

        Ok(Self {
            config,
            state: SessionState::new(),
            log: LogStore::new(),
            sandbox,
            bridge,
            phase: Phase::Idle,
        })
    }

    pub fn with_default_config() -> Result<Self> {
        Self::new(PlaygroundConfig::default())
    }

    pub fn config(&self) -> &PlaygroundConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn log(&self) -> &LogStore {
        &self.log
    }

    /// Replace the text of one fragment
    pub fn edit(&mut self, kind: FragmentKind, value: impl Into<String>) {
        self.state.set_in_place(kind, value);
    }

    pub fn edit_selected(&mut self, value: impl Into<String>) {
        self.state.edit_selected(value);
    }

    pub fn select(&mut self, kind: FragmentKind) {
        self.state.select(kind);
    }

    /// Compose the current fragments and load them into a fresh context
    ///
    /// Diagnostics from the new run arrive asynchronously; collect them with
    /// [`Playground::pump`], [`Playground::recv`] or [`Playground::wait_for_run`].
    pub fn run(&mut self) -> Result<RunId> {
        let previous = self.phase;
        self.phase = Phase::Composing;

        let document = match compose(self.state.fragments()) {
            Ok(document) => document,
            Err(e) => {
                self.phase = previous;
                return Err(e.into());
            }
        };
        debug!(bytes = document.as_str().len(), "document composed");

        if self.config.clear_on_run {
            self.bridge.pump(&mut self.log);
            self.log.clear();
        }

        let run = match self.sandbox.load(&document) {
            Ok(run) => run,
            Err(e) => {
                self.phase = previous;
                return Err(e.into());
            }
        };
        self.bridge.track_run(run);
        self.phase = Phase::Loaded(run);

        info!(%run, "run started");
        Ok(run)
    }

    /// Append every diagnostic received so far
    pub fn pump(&mut self) -> usize {
        self.bridge.pump(&mut self.log)
    }

    /// Wait for the next diagnostic and append it
    pub async fn recv(&mut self) -> Option<DiagnosticEvent> {
        self.bridge.recv(&mut self.log).await
    }

    /// Block until the current run is quiescent, then pump
    pub fn wait_for_run(&mut self) -> usize {
        self.sandbox.wait();
        self.pump()
    }

    /// Static view of the loaded page
    pub fn rendered(&self) -> Option<&RenderedPage> {
        self.sandbox.rendered()
    }
}
