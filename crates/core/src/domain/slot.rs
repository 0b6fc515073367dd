use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::offer::OfferId;
use crate::errors::{DomainError, ValidationError};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotStatus {
    Open,
    Held,
    PendingApproval,
    Booked,
    Rejected,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Held => "HELD",
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::Booked => "BOOKED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "OPEN" => Some(Self::Open),
            "HELD" => Some(Self::Held),
            "PENDING_APPROVAL" => Some(Self::PendingApproval),
            "BOOKED" => Some(Self::Booked),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Booked | Self::Rejected)
    }

    /// States a booking request or cascading rejection may still act on.
    pub fn is_claimable(&self) -> bool {
        !self.is_terminal()
    }
}

/// The states a sibling-rejection cascade sweeps over.
pub const CLAIMABLE_STATUSES: &[SlotStatus] =
    &[SlotStatus::Open, SlotStatus::Held, SlotStatus::PendingApproval];

/// Contact details a guest coach attaches when targeting a slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestDetails {
    pub name: String,
    pub club: String,
    pub contact: String,
    pub notes: Option<String>,
}

impl GuestDetails {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("guest_name"));
        }
        if self.club.trim().is_empty() {
            return Err(ValidationError::MissingField("guest_club"));
        }
        if self.contact.trim().is_empty() {
            return Err(ValidationError::MissingField("guest_contact"));
        }
        Ok(())
    }
}

/// Final score recorded by the host after a booked match was played.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub home_score: u32,
    pub away_score: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedResult {
    pub home_score: u32,
    pub away_score: u32,
    pub notes: Option<String>,
    pub saved_at: DateTime<Utc>,
}

/// One concrete time-window option within an offer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    pub offer_id: OfferId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SlotStatus,
    pub held_by_session: Option<String>,
    pub held_at: Option<DateTime<Utc>>,
    pub guest: Option<GuestDetails>,
    pub result: Option<RecordedResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Slot {
    pub fn can_transition_to(&self, next: SlotStatus) -> bool {
        matches!(
            (self.status, next),
            (SlotStatus::Open, SlotStatus::Held)
                | (SlotStatus::Open, SlotStatus::PendingApproval)
                | (SlotStatus::Open, SlotStatus::Booked)
                | (SlotStatus::Open, SlotStatus::Rejected)
                | (SlotStatus::Held, SlotStatus::PendingApproval)
                | (SlotStatus::Held, SlotStatus::Booked)
                | (SlotStatus::Held, SlotStatus::Open)
                | (SlotStatus::Held, SlotStatus::Rejected)
                | (SlotStatus::PendingApproval, SlotStatus::Booked)
                | (SlotStatus::PendingApproval, SlotStatus::Open)
                | (SlotStatus::PendingApproval, SlotStatus::Rejected)
        )
    }

    pub fn transition_to(&mut self, next: SlotStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidSlotTransition { from: self.status, to: next })
    }

    pub fn duration_minutes(&self) -> i64 {
        self.end_time.signed_duration_since(self.start_time).num_minutes()
    }
}

/// Validates a candidate slot window against the offer's match duration.
pub fn validate_window(
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    offer_duration_minutes: u32,
) -> Result<(), ValidationError> {
    if end_time <= start_time {
        return Err(ValidationError::EmptyWindow);
    }

    let actual = end_time.signed_duration_since(start_time).num_minutes();
    if actual != i64::from(offer_duration_minutes) {
        return Err(ValidationError::WindowDurationMismatch {
            expected: i64::from(offer_duration_minutes),
            actual,
        });
    }

    Ok(())
}
