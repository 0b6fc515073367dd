pub mod engine;
pub mod states;

pub use engine::{BookingFlow, FlowTransitionError};
pub use states::{
    ApprovalMode, FlowAction, OfferEvent, OfferTransition, SlotEvent, SlotTransition,
    WorkflowPolicy,
};
