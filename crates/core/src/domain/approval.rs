use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::offer::OfferId;
use crate::domain::slot::SlotId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// What an approver chose for a pending request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn resolved_status(&self) -> ApprovalStatus {
        match self {
            Self::Approve => ApprovalStatus::Approved,
            Self::Reject => ApprovalStatus::Rejected,
        }
    }
}

/// A pending or resolved human decision gating an offer or slot transition.
///
/// `slot_id` is absent for offer-level approvals. A resolved approval is
/// immutable; its token is single-use.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub id: ApprovalId,
    pub offer_id: OfferId,
    pub slot_id: Option<SlotId>,
    pub approval_token: String,
    pub approver_email: String,
    pub status: ApprovalStatus,
    pub decision_at: Option<DateTime<Utc>>,
    pub decision_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Approval {
    pub fn is_resolved(&self) -> bool {
        self.status != ApprovalStatus::Pending
    }

    pub fn is_offer_level(&self) -> bool {
        self.slot_id.is_none()
    }
}
