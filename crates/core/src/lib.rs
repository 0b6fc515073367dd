pub mod config;
pub mod coordinator;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod links;
pub mod notify;
pub mod store;
pub mod token;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use coordinator::{
    ApprovalView, BookingOutcome, BulkDecision, BulkItem, CreatedOffer, DecisionOutcome,
    OfferDecision, OfferDraft, RequestedApproval, SlotDecision, SlotDraft, WorkflowCoordinator,
};
pub use domain::approval::{Approval, ApprovalId, ApprovalStatus, Decision};
pub use domain::notification::{
    NewNotification, Notification, NotificationId, NotificationKind, RecipientRole,
};
pub use domain::offer::{
    AgeGroup, MatchFormat, MatchOffer, OfferId, OfferStatus, OfferWithSlots,
    MATCH_DURATIONS_MINUTES,
};
pub use domain::slot::{
    GuestDetails, MatchResult, RecordedResult, Slot, SlotId, SlotStatus, CLAIMABLE_STATUSES,
};
pub use errors::{DomainError, ValidationError, WorkflowError};
pub use flows::{ApprovalMode, BookingFlow, FlowTransitionError, WorkflowPolicy};
pub use links::LinkBuilder;
pub use store::{
    ApprovalStore, BookingCascade, BookingStore, InMemoryStore, NewApproval, NewOffer, NewSlot,
    NotificationOutbox, StoreError,
};
pub use token::{RandomTokenIssuer, TokenIssuer};
