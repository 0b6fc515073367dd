use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::slot::Slot;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OfferId(pub String);

/// Age brackets a match can be offered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgeGroup {
    U8,
    U10,
    U12,
    U14,
    U16,
    U18,
    Open,
}

impl AgeGroup {
    pub const ALL: &'static [AgeGroup] = &[
        AgeGroup::U8,
        AgeGroup::U10,
        AgeGroup::U12,
        AgeGroup::U14,
        AgeGroup::U16,
        AgeGroup::U18,
        AgeGroup::Open,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::U8 => "U8",
            Self::U10 => "U10",
            Self::U12 => "U12",
            Self::U14 => "U14",
            Self::U16 => "U16",
            Self::U18 => "U18",
            Self::Open => "Open",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|group| group.as_str() == value)
    }
}

/// Team sizes supported by the booking flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchFormat {
    FiveASide,
    SevenASide,
    NineASide,
    ElevenASide,
}

impl MatchFormat {
    pub const ALL: &'static [MatchFormat] = &[
        MatchFormat::FiveASide,
        MatchFormat::SevenASide,
        MatchFormat::NineASide,
        MatchFormat::ElevenASide,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FiveASide => "5v5",
            Self::SevenASide => "7v7",
            Self::NineASide => "9v9",
            Self::ElevenASide => "11v11",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|format| format.as_str() == value)
    }
}

/// Match durations the product offers, in minutes.
pub const MATCH_DURATIONS_MINUTES: &[u32] = &[60, 70, 80, 90, 100, 120];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferStatus {
    PendingApproval,
    Open,
    Closed,
    Cancelled,
}

impl OfferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING_APPROVAL" => Some(Self::PendingApproval),
            "OPEN" => Some(Self::Open),
            "CLOSED" => Some(Self::Closed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Cancelled)
    }
}

/// A host coach's proposed match with one or more candidate time slots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOffer {
    pub id: OfferId,
    pub host_name: String,
    pub host_club: Option<String>,
    pub host_contact: Option<String>,
    pub age_group: AgeGroup,
    pub format: MatchFormat,
    pub duration_minutes: u32,
    pub location: String,
    pub notes: Option<String>,
    pub approver_email: String,
    pub status: OfferStatus,
    pub share_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MatchOffer {
    pub fn can_transition_to(&self, next: OfferStatus) -> bool {
        matches!(
            (self.status, next),
            (OfferStatus::PendingApproval, OfferStatus::Open)
                | (OfferStatus::PendingApproval, OfferStatus::Cancelled)
                | (OfferStatus::Open, OfferStatus::Closed)
                | (OfferStatus::Open, OfferStatus::Cancelled)
        )
    }

    pub fn transition_to(&mut self, next: OfferStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidOfferTransition { from: self.status, to: next })
    }
}

/// An offer together with its slots, ordered by start time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferWithSlots {
    pub offer: MatchOffer,
    pub slots: Vec<Slot>,
}
