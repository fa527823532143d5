//! The candidate-facing submission workflow.
//!
//! One machine per form session. All transitions run on the caller's task in
//! response to discrete events; the network call inside `submit` is the only
//! suspension point, and at most one is in flight per draft.

mod draft;

pub use draft::{ApplicationDraft, ContactFields, DraftError, SubmissionMode};

use std::sync::Arc;

use tracing::debug;

use crate::config::FilePolicy;
use crate::gateway::{ApplicationForm, ApplicationsApi, GatewayError};
use crate::upload::{self, FileCandidate};

/// Submit lifecycle. `Failed` and `DuplicateRejected` re-enter the flow on
/// the next user-initiated submit only; `Success` consumes the draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitState {
    Idle,
    Validating,
    Submitting,
    Success,
    /// The candidate already applied. Valid prior state, not an error: the
    /// page offers other openings instead of a retry.
    DuplicateRejected,
    Failed { message: String },
}

/// Handle for one submit attempt. A result presented with a stale token —
/// the session was reset while the request was outstanding — is discarded
/// instead of being applied to a dead form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptToken {
    epoch: u64,
}

pub struct SubmissionMachine {
    api: Arc<dyn ApplicationsApi>,
    policy: FilePolicy,
    job_id: String,
    draft: ApplicationDraft,
    state: SubmitState,
    field_error: Option<DraftError>,
    epoch: u64,
}

impl SubmissionMachine {
    pub fn new(api: Arc<dyn ApplicationsApi>, policy: FilePolicy, job_id: impl Into<String>) -> Self {
        SubmissionMachine {
            api,
            policy,
            job_id: job_id.into(),
            draft: ApplicationDraft::default(),
            state: SubmitState::Idle,
            field_error: None,
            epoch: 0,
        }
    }

    pub fn state(&self) -> &SubmitState {
        &self.state
    }

    pub fn draft(&self) -> &ApplicationDraft {
        &self.draft
    }

    /// Inline message for the field the last rejected event belongs to.
    pub fn field_error(&self) -> Option<&DraftError> {
        self.field_error.as_ref()
    }

    /// False while a submission is outstanding or the draft is consumed; the
    /// page uses this to disable the submit control.
    pub fn can_submit(&self) -> bool {
        !matches!(
            self.state,
            SubmitState::Validating | SubmitState::Submitting | SubmitState::Success
        )
    }

    /// Switching mode keeps contact fields and any accepted file; only the
    /// other mode's inline error display is cleared.
    pub fn select_mode(&mut self, mode: SubmissionMode) {
        self.draft.mode = mode;
        self.field_error = None;
    }

    pub fn set_contact(&mut self, contact: ContactFields) {
        self.draft.contact = contact;
    }

    pub fn set_cv_text(&mut self, text: impl Into<String>) {
        self.draft.cv_text = text.into();
    }

    pub fn set_consent(&mut self, consent: bool) {
        self.draft.consent_terms = consent;
    }

    /// Single entry point for both the file picker and drag-and-drop, so the
    /// two affordances can never apply different rules. A rejected candidate
    /// leaves any previously accepted file in place.
    pub fn attach_file(&mut self, candidate: FileCandidate) {
        match upload::validate(&candidate, &self.policy) {
            Ok(()) => {
                debug!(name = %candidate.name, size_mb = %candidate.size_mb(), "file attached");
                self.draft.attached_file = Some(candidate);
                self.field_error = None;
            }
            Err(rejection) => {
                debug!(name = %candidate.name, %rejection, "file rejected");
                self.field_error = Some(DraftError::File(rejection));
            }
        }
    }

    pub fn remove_file(&mut self) {
        self.draft.attached_file = None;
    }

    /// Runs the submit guards. `Some` means the machine entered `Submitting`
    /// and the returned form must be sent exactly once, with the outcome
    /// handed back through [`SubmissionMachine::resolve`]. `None` means no
    /// network call may happen: either a guard failed (state back to `Idle`,
    /// inline message set) or a submission is already outstanding.
    pub fn begin_submit(&mut self) -> Option<(AttemptToken, ApplicationForm)> {
        if !self.can_submit() {
            debug!(state = ?self.state, "submit ignored");
            return None;
        }

        self.state = SubmitState::Validating;
        self.field_error = None;

        match self.draft.seal() {
            Ok(form) => {
                self.state = SubmitState::Submitting;
                Some((AttemptToken { epoch: self.epoch }, form))
            }
            Err(err) => {
                debug!(field = err.field(), %err, "submit blocked by guard");
                self.field_error = Some(err);
                self.state = SubmitState::Idle;
                None
            }
        }
    }

    /// Applies the normalized outcome of one attempt. Results carrying a
    /// stale token, or arriving when no submission is outstanding, are
    /// dropped.
    pub fn resolve(&mut self, token: AttemptToken, result: Result<(), GatewayError>) {
        if token.epoch != self.epoch || self.state != SubmitState::Submitting {
            debug!("discarding stale submission result");
            return;
        }

        self.state = match result {
            Ok(()) => SubmitState::Success,
            Err(err) if err.is_duplicate() => SubmitState::DuplicateRejected,
            Err(err) => SubmitState::Failed {
                message: err.to_string(),
            },
        };
        debug!(state = ?self.state, "submission resolved");
    }

    /// Guard validation, the network round-trip, and outcome mapping in one
    /// call. This is the submit-click handler.
    pub async fn submit(&mut self) -> &SubmitState {
        let Some((token, form)) = self.begin_submit() else {
            return &self.state;
        };

        let result = self.api.submit_application(&self.job_id, form).await;
        self.resolve(token, result);
        &self.state
    }

    /// Fresh draft for a new session; any response still in flight for the
    /// old one will be discarded.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.draft = ApplicationDraft::default();
        self.state = SubmitState::Idle;
        self.field_error = None;
    }
}
