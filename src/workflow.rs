//! Explicit state machine for one submission cycle.
//!
//! ```text
//!            ┌──────── abort ────────┐
//!            ▼                       │
//!  Idle ─▶ Validating ─▶ Submitting ─▶ AwaitingResponse ─▶ Rendering ─▶ Idle
//!   ▲                        │               │
//!   └──────── fail ──────────┴───────────────┘
//! ```
//!
//! A [`WorkflowState`] is a value: each transition consumes it and returns
//! the next one, so the controller threads it through the stages instead of
//! mutating shared UI state.

use crate::error::UploadError;
use crate::output::FileOutcome;
use crate::progress::ProgressState;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Idle,
    Validating,
    Submitting,
    AwaitingResponse,
    Rendering,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::Validating => "validating",
            Phase::Submitting => "submitting",
            Phase::AwaitingResponse => "awaiting-response",
            Phase::Rendering => "rendering",
        };
        f.write_str(s)
    }
}

/// Inputs that move the workflow along.
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    /// The user submitted a selection.
    Submit,
    /// Selection was rejected; back to idle with nothing touched.
    Abort,
    /// Selection accepted; progress and results are cleared.
    Validated,
    /// The request body has been handed to the transport.
    Sent,
    /// Transfer progress, already scaled into `0..=80`.
    Progress(u8),
    /// The server answered with parseable outcomes.
    Received(Vec<FileOutcome>),
    /// Results have been shown.
    Rendered,
    /// Transport or server failure after validation.
    Fail(String),
}

impl WorkflowEvent {
    fn name(&self) -> &'static str {
        match self {
            WorkflowEvent::Submit => "submit",
            WorkflowEvent::Abort => "abort",
            WorkflowEvent::Validated => "validated",
            WorkflowEvent::Sent => "sent",
            WorkflowEvent::Progress(_) => "progress",
            WorkflowEvent::Received(_) => "received",
            WorkflowEvent::Rendered => "rendered",
            WorkflowEvent::Fail(_) => "fail",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub phase: Phase,
    pub progress: ProgressState,
    /// Outcomes of the last completed cycle; cleared on the next submit.
    pub results: Vec<FileOutcome>,
    /// Message from the last failed cycle, if any.
    pub failure: Option<String>,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `event`, returning the next state.
    pub fn transition(mut self, event: WorkflowEvent) -> Result<Self, UploadError> {
        use Phase::*;
        use WorkflowEvent as E;

        match (self.phase, event) {
            (Idle, E::Submit) => {
                self.phase = Validating;
            }
            (Validating, E::Abort) => {
                self.phase = Idle;
            }
            (Validating, E::Validated) => {
                self.phase = Submitting;
                self.progress = ProgressState::new();
                self.results.clear();
                self.failure = None;
            }
            (Submitting, E::Progress(p)) | (AwaitingResponse, E::Progress(p)) => {
                self.progress.advance_to(p.min(crate::progress::TRANSFER_CEILING));
            }
            (Submitting, E::Sent) => {
                self.phase = AwaitingResponse;
            }
            (AwaitingResponse, E::Received(outcomes)) => {
                self.phase = Rendering;
                self.results = outcomes;
            }
            (Rendering, E::Rendered) => {
                self.progress.advance_to(100);
                self.phase = Idle;
            }
            (Submitting, E::Fail(msg)) | (AwaitingResponse, E::Fail(msg)) => {
                self.phase = Idle;
                self.progress = ProgressState::new();
                self.failure = Some(msg);
            }
            (from, event) => {
                return Err(UploadError::InvalidTransition {
                    from: from.to_string(),
                    event: event.name().to_string(),
                });
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ConversionResult;

    fn sample() -> Vec<FileOutcome> {
        vec![FileOutcome::Converted(ConversionResult {
            filename: "a.ebc".into(),
            used_encoding: "cp037".into(),
            dest_encoding: "UTF-8".into(),
            replacement_count: 0,
            zip_download: "/uploads/a_converted.zip".into(),
        })]
    }

    #[test]
    fn happy_path_returns_to_idle() {
        let s = WorkflowState::new()
            .transition(WorkflowEvent::Submit)
            .unwrap()
            .transition(WorkflowEvent::Validated)
            .unwrap()
            .transition(WorkflowEvent::Progress(40))
            .unwrap()
            .transition(WorkflowEvent::Sent)
            .unwrap()
            .transition(WorkflowEvent::Progress(80))
            .unwrap()
            .transition(WorkflowEvent::Received(sample()))
            .unwrap();
        assert_eq!(s.phase, Phase::Rendering);
        assert_eq!(s.progress.percent(), 80);

        let s = s.transition(WorkflowEvent::Rendered).unwrap();
        assert_eq!(s.phase, Phase::Idle);
        assert_eq!(s.progress.percent(), 100);
        assert_eq!(s.results.len(), 1);
    }

    #[test]
    fn abort_leaves_previous_results_untouched() {
        let mut s = WorkflowState::new();
        s.results = sample();
        let s = s
            .transition(WorkflowEvent::Submit)
            .unwrap()
            .transition(WorkflowEvent::Abort)
            .unwrap();
        assert_eq!(s.phase, Phase::Idle);
        assert_eq!(s.results.len(), 1);
    }

    #[test]
    fn validated_clears_previous_cycle() {
        let mut s = WorkflowState::new();
        s.results = sample();
        s.progress.advance_to(100);
        s.failure = Some("old".into());
        let s = s
            .transition(WorkflowEvent::Submit)
            .unwrap()
            .transition(WorkflowEvent::Validated)
            .unwrap();
        assert!(s.results.is_empty());
        assert_eq!(s.progress.percent(), 0);
        assert!(s.failure.is_none());
    }

    #[test]
    fn transfer_progress_is_capped_and_monotonic() {
        let s = WorkflowState::new()
            .transition(WorkflowEvent::Submit)
            .unwrap()
            .transition(WorkflowEvent::Validated)
            .unwrap()
            .transition(WorkflowEvent::Progress(95))
            .unwrap();
        assert_eq!(s.progress.percent(), 80);
        let s = s.transition(WorkflowEvent::Progress(10)).unwrap();
        assert_eq!(s.progress.percent(), 80);
    }

    #[test]
    fn failure_resets_progress() {
        let s = WorkflowState::new()
            .transition(WorkflowEvent::Submit)
            .unwrap()
            .transition(WorkflowEvent::Validated)
            .unwrap()
            .transition(WorkflowEvent::Progress(60))
            .unwrap()
            .transition(WorkflowEvent::Sent)
            .unwrap()
            .transition(WorkflowEvent::Fail("HTTP 500".into()))
            .unwrap();
        assert_eq!(s.phase, Phase::Idle);
        assert_eq!(s.progress.percent(), 0);
        assert_eq!(s.failure.as_deref(), Some("HTTP 500"));
    }

    #[test]
    fn illegal_edges_are_rejected() {
        let err = WorkflowState::new()
            .transition(WorkflowEvent::Received(vec![]))
            .unwrap_err();
        assert!(matches!(err, UploadError::InvalidTransition { .. }));

        let validating = WorkflowState::new().transition(WorkflowEvent::Submit).unwrap();
        assert!(validating.transition(WorkflowEvent::Fail("x".into())).is_err());
    }
}
