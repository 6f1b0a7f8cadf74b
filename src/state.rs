//! Client-held flow state for one image submission.
//!
//! A flow moves through acquisition (permission, pick, crop) and the
//! pipeline (upload, search, record) to a terminal state. [`FlowTracker`]
//! enforces the allowed transitions, keeps the history, and notifies an
//! optional listener so the presentation layer can swap its status line.

use serde::Serialize;
use tracing::{debug, warn};

use crate::api::{LocalImageRef, SearchId};
use crate::error::{ErrorKind, Result, SnapError};

/// Why a flow ended without running the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    PermissionDenied,
    Cancelled,
}

/// One step of the flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FlowState {
    Idle,
    RequestingPermission,
    Picking,
    Cropping { source: LocalImageRef },
    Uploading { image: LocalImageRef },
    Clipping { image_path: String },
    Searching { image_path: String },
    Recording { search_id: SearchId },
    Succeeded { search_id: SearchId },
    Failed { kind: ErrorKind, message: String },
    Exited { reason: ExitReason },
}

impl FlowState {
    /// Failure state carrying the error's class and message.
    pub fn failed(error: &SnapError) -> Self {
        Self::Failed {
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded { .. } | Self::Failed { .. } | Self::Exited { .. }
        )
    }

    /// Line shown in place of the progress indicator.
    pub fn status_text(&self) -> String {
        match self {
            Self::Idle => "Ready".to_string(),
            Self::RequestingPermission => "Requesting access to images...".to_string(),
            Self::Picking => "Choosing an image...".to_string(),
            Self::Cropping { .. } => "Cropping...".to_string(),
            Self::Uploading { .. } => "Uploading image...".to_string(),
            Self::Clipping { .. } => "Clipping image...".to_string(),
            Self::Searching { .. } => "Finding matches...".to_string(),
            Self::Recording { .. } => "Saving to history...".to_string(),
            Self::Succeeded { search_id } => format!("Found matches (search {search_id})"),
            Self::Failed { message, .. } => message.clone(),
            Self::Exited {
                reason: ExitReason::PermissionDenied,
            } => "Permission denied".to_string(),
            Self::Exited {
                reason: ExitReason::Cancelled,
            } => "Cancelled".to_string(),
        }
    }

    /// Whether `next` may follow `self`.
    pub fn can_transition_to(&self, next: &Self) -> bool {
        use FlowState as S;
        // Any non-terminal step may fail; any terminal state may restart.
        if matches!(next, S::Failed { .. }) {
            return !self.is_terminal();
        }
        if matches!(next, S::Idle) {
            return self.is_terminal();
        }
        matches!(
            (self, next),
            (S::Idle, S::RequestingPermission | S::Uploading { .. })
                | (
                    S::RequestingPermission,
                    S::Picking
                        | S::Exited {
                            reason: ExitReason::PermissionDenied
                        }
                )
                | (
                    S::Picking,
                    S::Cropping { .. }
                        | S::Uploading { .. }
                        | S::Exited {
                            reason: ExitReason::Cancelled
                        }
                )
                | (S::Cropping { .. }, S::Uploading { .. })
                | (S::Uploading { .. }, S::Clipping { .. } | S::Searching { .. })
                | (S::Clipping { .. }, S::Searching { .. })
                | (S::Searching { .. }, S::Recording { .. })
                | (S::Recording { .. }, S::Succeeded { .. })
        )
    }
}

type Listener = Box<dyn Fn(&FlowState) + Send + Sync>;

/// Tracks the state of one flow.
pub struct FlowTracker {
    current: FlowState,
    history: Vec<FlowState>,
    listener: Option<Listener>,
}

impl Default for FlowTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FlowTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowTracker")
            .field("current", &self.current)
            .field("history", &self.history)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

impl FlowTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: FlowState::Idle,
            history: vec![FlowState::Idle],
            listener: None,
        }
    }

    /// Call `listener` after every transition.
    #[must_use]
    pub fn with_listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(&FlowState) + Send + Sync + 'static,
    {
        self.listener = Some(Box::new(listener));
        self
    }

    pub const fn current(&self) -> &FlowState {
        &self.current
    }

    /// Every state entered so far, starting with `Idle`.
    pub fn history(&self) -> &[FlowState] {
        &self.history
    }

    /// Move to `next`.
    ///
    /// # Errors
    ///
    /// `Other` if the transition is not allowed; the state is unchanged.
    pub fn advance(&mut self, next: FlowState) -> Result<()> {
        if !self.current.can_transition_to(&next) {
            warn!(from = ?self.current, to = ?next, "Rejected flow transition");
            return Err(SnapError::Other(format!(
                "invalid flow transition from {:?} to {:?}",
                self.current, next
            )));
        }
        debug!(from = ?self.current, to = ?next, "Flow transition");
        self.current = next.clone();
        self.history.push(next);
        if let Some(listener) = &self.listener {
            listener(&self.current);
        }
        Ok(())
    }

    /// Enter `Failed` from any non-terminal state. A flow that already
    /// ended keeps its terminal state.
    pub fn fail(&mut self, error: &SnapError) {
        if self.current.is_terminal() {
            return;
        }
        let _ = self.advance(FlowState::failed(error));
    }

    /// Return to `Idle` after a terminal state.
    pub fn reset(&mut self) -> Result<()> {
        self.advance(FlowState::Idle)
    }

    /// Prepare for a new flow: a tracker whose last flow ended goes back to
    /// `Idle` first, a fresh or in-progress one is left alone.
    pub fn begin(&mut self) -> Result<()> {
        if self.current.is_terminal() {
            self.reset()?;
        }
        Ok(())
    }
}
