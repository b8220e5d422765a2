//! Analysis context lifecycle.
//!
//! One [`AnalysisContext`] exists per session and is bound to one project
//! path. It moves `Uninitialized → Initializing → Ready → Closed`, or ends
//! in `Failed` if the model cannot be built. Initialization happens at most
//! once; a failed or closed context is never rebuilt.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use tokio::sync::watch;
use tracing::{error, info};

use crate::analysis::JavaAnalysis;
use crate::errors::{CocoaError, Result};

/// Lifecycle state of an [`AnalysisContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
    Closed,
}

impl ContextState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Closed => "closed",
        }
    }

    /// True once the state can no longer move towards `Ready`.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed | Self::Closed)
    }
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The session's analysis engine handle and its lifecycle.
///
/// The model is written once when initialization succeeds and only read
/// afterwards, so readers take no lock.
pub struct AnalysisContext {
    project_root: PathBuf,
    state: watch::Sender<ContextState>,
    engine: OnceLock<Arc<JavaAnalysis>>,
    failure: OnceLock<String>,
}

impl AnalysisContext {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let (state, _) = watch::channel(ContextState::Uninitialized);
        Self {
            project_root: project_root.into(),
            state,
            engine: OnceLock::new(),
            failure: OnceLock::new(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn state(&self) -> ContextState {
        *self.state.borrow()
    }

    /// Moves `from → to` if the current state is `from`.
    fn transition(&self, from: ContextState, to: ContextState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        })
    }

    /// Builds the model with `build`. Only the first call runs `build`;
    /// later calls report the outcome of that first call.
    pub fn initialize<F>(&self, build: F) -> Result<()>
    where
        F: FnOnce(&Path) -> Result<JavaAnalysis>,
    {
        if !self.transition(ContextState::Uninitialized, ContextState::Initializing) {
            return self.get_context().map(|_| ());
        }

        info!(project = %self.project_root.display(), "initializing analysis context");
        let start = Instant::now();
        match build(&self.project_root) {
            Ok(analysis) => {
                let _ = self.engine.set(Arc::new(analysis));
                if self.transition(ContextState::Initializing, ContextState::Ready) {
                    info!(
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "analysis context ready"
                    );
                }
                self.get_context().map(|_| ())
            }
            Err(e) => {
                error!(error = %e, "analysis context failed to initialize");
                let _ = self.failure.set(e.to_string());
                self.transition(ContextState::Initializing, ContextState::Failed);
                Err(e)
            }
        }
    }

    /// Returns the model, or the error matching the current state.
    pub fn get_context(&self) -> Result<Arc<JavaAnalysis>> {
        match self.state() {
            ContextState::Ready => self.engine.get().cloned().ok_or_else(|| {
                CocoaError::ContextNotReady {
                    detail: "model missing".to_string(),
                }
            }),
            ContextState::Uninitialized => Err(CocoaError::ContextNotReady {
                detail: "session has not started".to_string(),
            }),
            ContextState::Initializing => Err(CocoaError::ContextNotReady {
                detail: "analysis is still initializing".to_string(),
            }),
            ContextState::Failed => Err(CocoaError::ContextNotReady {
                detail: format!(
                    "initialization failed: {}",
                    self.failure.get().map(String::as_str).unwrap_or("unknown error")
                ),
            }),
            ContextState::Closed => Err(CocoaError::ContextClosed),
        }
    }

    /// Ends the session. Further calls fail with `ContextClosed`.
    pub fn close(&self) {
        let previous = self.state.send_replace(ContextState::Closed);
        if previous != ContextState::Closed {
            info!(previous = %previous, "analysis context closed");
        }
    }

    /// Waits until initialization has either succeeded or failed, or the
    /// context was closed, and returns that state.
    pub async fn settled(&self) -> ContextState {
        let mut rx = self.state.subscribe();
        let settled = match rx.wait_for(ContextState::is_settled).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        };
        settled
    }
}

impl fmt::Debug for AnalysisContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisContext")
            .field("project_root", &self.project_root)
            .field("state", &self.state())
            .finish()
    }
}
