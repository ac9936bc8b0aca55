//! Engine error taxonomy.
//!
//! Every failure surfaces to the caller as a classified reason, never as
//! a raw panic. Submission validation errors are produced before any
//! write attempt; `Config` is fatal at catalog load time.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Submission range start/end missing or non-numeric.
    #[error("Inspection range is missing or not numeric")]
    RangeInvalid,

    #[error("No construction layer selected")]
    LayerMissing,

    #[error("No inspection check selected")]
    CheckMissing,

    #[error("No inspection type remains after filtering")]
    TypeMissing,

    #[error("Appointment date is required")]
    AppointmentMissing,

    #[error("Submission number must be numeric, got '{0}'")]
    SubmissionNumberInvalid(String),

    /// The write collaborator refused the batch. Its detail strings are
    /// surfaced verbatim, joined, next to a generic fallback message.
    #[error("Submission rejected: {}", format_rejection(.details))]
    SubmitRejected { details: Vec<String> },

    /// Workflow template catalog violation. Raised once at load time and
    /// treated as fatal; never a request-time error.
    #[error("Workflow configuration error: {0}")]
    Config(String),
}

fn format_rejection(details: &[String]) -> String {
    if details.is_empty() {
        "the write collaborator gave no detail".to_string()
    } else {
        details.join("; ")
    }
}
