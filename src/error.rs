// Error taxonomy for the wizard engine
//
// Validation errors come from the review re-check; the other variants cross the
// submission boundary. Every variant becomes a single display string for the banner.

use std::collections::BTreeMap;
use thiserror::Error;

/// Field name (or `list[index].field`) -> human-readable message.
pub type FieldErrors = BTreeMap<String, String>;

pub const GENERIC_SUBMIT_FAILURE: &str = "Submission failed. Please try again.";
pub const GENERIC_UNEXPECTED: &str = "Something went wrong. Please try again.";
pub const SESSION_EXPIRED: &str = "Your session has expired. Please sign in again.";
pub const REVIEW_REJECTED: &str = "Please correct the highlighted fields before submitting.";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WizardError {
    /// One or more fields are missing or malformed. Never reaches the network.
    #[error("{} field(s) need attention", .0.len())]
    Validation(FieldErrors),

    /// The host has no usable session token. The host decides how to re-authenticate.
    #[error("authentication required")]
    AuthenticationRequired,

    /// The backend rejected the submission or could not be reached.
    #[error("submission failed: {0}")]
    SubmissionFailed(String),

    /// Anything not classified above. The message is for logs only.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl WizardError {
    pub fn submission(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            WizardError::SubmissionFailed(GENERIC_SUBMIT_FAILURE.to_string())
        } else {
            WizardError::SubmissionFailed(message)
        }
    }

    /// Text shown in the step banner.
    pub fn user_message(&self) -> String {
        match self {
            WizardError::Validation(_) => REVIEW_REJECTED.to_string(),
            WizardError::AuthenticationRequired => SESSION_EXPIRED.to_string(),
            WizardError::SubmissionFailed(msg) => msg.clone(),
            WizardError::Unexpected(_) => GENERIC_UNEXPECTED.to_string(),
        }
    }

    pub fn is_auth_required(&self) -> bool {
        matches!(self, WizardError::AuthenticationRequired)
    }
}

/// Misuse of the form store (unknown field, wrong field kind, bad index).
/// UI-driven indices make these programming errors, so they carry no user message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("field '{0}' is not a repeatable list")]
    NotAList(String),
    #[error("index {index} is out of range for list '{list}' (len {len})")]
    IndexOutOfRange {
        list: String,
        index: usize,
        len: usize,
    },
    #[error("field '{field}' expects a {expected} value")]
    WrongKind {
        field: String,
        expected: &'static str,
    },
    #[error("field '{0}' cannot be edited directly")]
    ReadOnly(String),
    #[error("the form is locked while a submission is in flight or confirmed")]
    Locked,
}

impl From<StoreError> for WizardError {
    fn from(e: StoreError) -> Self {
        WizardError::Unexpected(e.to_string())
    }
}
