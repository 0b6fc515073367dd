use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::approval::ApprovalStatus;
use crate::domain::offer::OfferStatus;
use crate::domain::slot::SlotStatus;
use crate::flows::FlowTransitionError;
use crate::store::StoreError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid offer transition from {from:?} to {to:?}")]
    InvalidOfferTransition { from: OfferStatus, to: OfferStatus },
    #[error("invalid slot transition from {from:?} to {to:?}")]
    InvalidSlotTransition { from: SlotStatus, to: SlotStatus },
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
}

/// Input problems caught before any persistence write.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("required field `{0}` is missing")]
    MissingField(&'static str),
    #[error("`{0}` is not a valid email address")]
    InvalidEmail(String),
    #[error("slot window ends at or before it starts")]
    EmptyWindow,
    #[error("slot window is {actual} minutes but the offer plays {expected} minutes")]
    WindowDurationMismatch { expected: i64, actual: i64 },
    #[error("unsupported match duration of {0} minutes")]
    UnsupportedDuration(u32),
    #[error("an offer needs at least one time slot")]
    NoSlots,
    #[error("rejecting requires decision notes")]
    MissingDecisionNotes,
    #[error("results can only be recorded on a booked slot")]
    ResultRequiresBookedSlot,
}

/// The failure taxonomy every coordinator operation reports in.
///
/// `AlreadyProcessed` is a normal outcome rather than an exception path: it
/// carries the stored decision so callers can render it read-only.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("approval was already {}", decision.as_str())]
    AlreadyProcessed {
        decision: ApprovalStatus,
        decided_at: Option<DateTime<Utc>>,
        notes: Option<String>,
    },
    #[error("slot is no longer available")]
    SlotUnavailable,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl WorkflowError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    /// Caller-facing summary used by interface layers; detail stays in the
    /// variant for logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "This link is not valid. It may have been removed.",
            Self::AlreadyProcessed { .. } => "This request was already decided.",
            Self::SlotUnavailable => {
                "This slot has been taken by another team. Please select another available slot."
            }
            Self::Validation(_) => "The request could not be processed. Check inputs and try again.",
            Self::Domain(_) => "This action is not possible in the offer's current state.",
            Self::Persistence(_) => "The service is temporarily unavailable. Please retry shortly.",
        }
    }
}

impl From<FlowTransitionError> for WorkflowError {
    fn from(value: FlowTransitionError) -> Self {
        Self::Domain(DomainError::FlowTransition(value))
    }
}
