use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::offer::OfferId;
use crate::domain::slot::SlotId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipientRole {
    Host,
    Guest,
    Approver,
}

impl RecipientRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Host => "HOST",
            Self::Guest => "GUEST",
            Self::Approver => "APPROVER",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "HOST" => Some(Self::Host),
            "GUEST" => Some(Self::Guest),
            "APPROVER" => Some(Self::Approver),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    SlotSelected,
    ApprovalRequest,
    OfferApprovalRequest,
    Approved,
    Rejected,
    OfferClosed,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SlotSelected => "SLOT_SELECTED",
            Self::ApprovalRequest => "APPROVAL_REQUEST",
            Self::OfferApprovalRequest => "OFFER_APPROVAL_REQUEST",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::OfferClosed => "OFFER_CLOSED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SLOT_SELECTED" => Some(Self::SlotSelected),
            "APPROVAL_REQUEST" => Some(Self::ApprovalRequest),
            "OFFER_APPROVAL_REQUEST" => Some(Self::OfferApprovalRequest),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            "OFFER_CLOSED" => Some(Self::OfferClosed),
            _ => None,
        }
    }
}

/// An outbox row describing an event that needs external delivery. Delivery
/// itself is the dispatcher collaborator's concern; rows are append-only
/// apart from the sent flag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_email: String,
    pub recipient_role: RecipientRole,
    pub kind: NotificationKind,
    pub offer_id: OfferId,
    pub slot_id: Option<SlotId>,
    pub subject: String,
    pub body: String,
    pub sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the outbox; id and timestamps are store-generated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewNotification {
    pub recipient_email: String,
    pub recipient_role: RecipientRole,
    pub kind: NotificationKind,
    pub offer_id: OfferId,
    pub slot_id: Option<SlotId>,
    pub subject: String,
    pub body: String,
}
