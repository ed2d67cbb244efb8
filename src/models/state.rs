// Wizard state (in-memory, per dialog instance)
//
// NOTE: This is NOT persisted. It lives exactly as long as one open wizard and is
// discarded on close; the only thing that leaves the process is the submit payload.

use crate::error::FieldErrors;
use crate::models::field::FieldMap;
use crate::wizard::store::FormStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Idle => "idle",
            SubmissionStatus::Submitting => "submitting",
            SubmissionStatus::Succeeded => "succeeded",
            SubmissionStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct WizardState {
    pub(crate) active_step: usize,
    pub(crate) form: FormStore,
    pub(crate) submission_status: SubmissionStatus,
    pub(crate) reference_number: Option<String>,
    pub(crate) banner: Option<String>,
    // Errors are computed on every attempted advance but only shown after the first one.
    pub(crate) errors_visible: bool,
}

impl WizardState {
    pub fn new(form: FormStore) -> Self {
        Self {
            active_step: 0,
            form,
            submission_status: SubmissionStatus::Idle,
            reference_number: None,
            banner: None,
            errors_visible: false,
        }
    }

    pub fn active_step(&self) -> usize {
        self.active_step
    }

    pub fn fields(&self) -> &FieldMap {
        self.form.fields()
    }

    pub fn field_errors(&self) -> &FieldErrors {
        self.form.errors()
    }

    pub fn submission_status(&self) -> SubmissionStatus {
        self.submission_status
    }

    pub fn reference_number(&self) -> Option<&str> {
        self.reference_number.as_deref()
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn errors_visible(&self) -> bool {
        self.errors_visible
    }

    /// Back to the entity defaults at step 0.
    pub(crate) fn reset(&mut self) {
        self.form.reset();
        self.active_step = 0;
        self.submission_status = SubmissionStatus::Idle;
        self.reference_number = None;
        self.banner = None;
        self.errors_visible = false;
    }
}
