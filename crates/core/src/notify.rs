//! Outbound message content for every decision point in the booking
//! lifecycle. The coordinator builds these and hands them to the outbox;
//! delivery is external.

use chrono::{DateTime, Utc};

use crate::domain::notification::{NewNotification, NotificationKind, RecipientRole};
use crate::domain::offer::MatchOffer;
use crate::domain::slot::{GuestDetails, Slot};

fn format_start(start: DateTime<Utc>) -> String {
    start.format("%A %e %B, %H:%M").to_string()
}

fn host_display(offer: &MatchOffer) -> String {
    match &offer.host_club {
        Some(club) => format!("{} ({club})", offer.host_name),
        None => offer.host_name.clone(),
    }
}

/// Sent to the approver when a new offer needs sign-off before its share
/// link becomes usable.
pub fn offer_approval_request(
    offer: &MatchOffer,
    slots: &[Slot],
    approval_link: &str,
) -> NewNotification {
    let slot_lines: Vec<String> =
        slots.iter().map(|slot| format!("- {}", format_start(slot.start_time))).collect();

    NewNotification {
        recipient_email: offer.approver_email.clone(),
        recipient_role: RecipientRole::Approver,
        kind: NotificationKind::OfferApprovalRequest,
        offer_id: offer.id.clone(),
        slot_id: None,
        subject: format!(
            "Match Offer Approval Required - {} {}",
            offer.age_group.as_str(),
            offer.format.as_str()
        ),
        body: format!(
            "Hello,\n\n{} has created a match offer that requires your approval before it \
             can be shared with other coaches.\n\nMatch Details:\n- Age Group: {}\n- Format: {}\n\
             - Duration: {} minutes\n- Location: {}\n\nAvailable Time Slots:\n{}\n\n\
             Please review and approve this offer:\n{approval_link}\n\n\
             Once approved, the host can share the link with other coaches.",
            host_display(offer),
            offer.age_group.as_str(),
            offer.format.as_str(),
            offer.duration_minutes,
            offer.location,
            slot_lines.join("\n"),
        ),
    }
}

/// Tells the host their offer went live.
pub fn offer_opened(offer: &MatchOffer, host_contact: &str, share_link: &str) -> NewNotification {
    NewNotification {
        recipient_email: host_contact.to_string(),
        recipient_role: RecipientRole::Host,
        kind: NotificationKind::Approved,
        offer_id: offer.id.clone(),
        slot_id: None,
        subject: "Match Offer Approved!".to_string(),
        body: format!(
            "Hello {},\n\nYour match offer at {} has been approved and is now live.\n\n\
             Share this link with other coaches to let them book a slot:\n{share_link}",
            offer.host_name, offer.location,
        ),
    }
}

/// Tells the host their offer was turned down, with the approver's reason.
pub fn offer_rejected(offer: &MatchOffer, host_contact: &str, reason: &str) -> NewNotification {
    NewNotification {
        recipient_email: host_contact.to_string(),
        recipient_role: RecipientRole::Host,
        kind: NotificationKind::Rejected,
        offer_id: offer.id.clone(),
        slot_id: None,
        subject: "Match Offer Rejected".to_string(),
        body: format!(
            "Hello {},\n\nYour match offer at {} was not approved.\n\nReason: {reason}",
            offer.host_name, offer.location,
        ),
    }
}

/// Tells the host a guest has asked for one of their slots.
pub fn slot_selected(
    offer: &MatchOffer,
    slot: &Slot,
    guest: &GuestDetails,
    host_contact: &str,
) -> NewNotification {
    NewNotification {
        recipient_email: host_contact.to_string(),
        recipient_role: RecipientRole::Host,
        kind: NotificationKind::SlotSelected,
        offer_id: offer.id.clone(),
        slot_id: Some(slot.id.clone()),
        subject: "Slot Booking Requested".to_string(),
        body: format!(
            "Hello {},\n\n{} has requested the slot on {}. The booking is awaiting approval.",
            offer.host_name,
            guest.club,
            format_start(slot.start_time),
        ),
    }
}

/// Sent to the approver when a guest booking needs sign-off.
pub fn slot_approval_request(
    offer: &MatchOffer,
    slot: &Slot,
    guest: &GuestDetails,
    approval_link: &str,
) -> NewNotification {
    NewNotification {
        recipient_email: offer.approver_email.clone(),
        recipient_role: RecipientRole::Approver,
        kind: NotificationKind::ApprovalRequest,
        offer_id: offer.id.clone(),
        slot_id: Some(slot.id.clone()),
        subject: format!(
            "Booking Approval Required - {} {}",
            offer.age_group.as_str(),
            offer.format.as_str()
        ),
        body: format!(
            "Hello,\n\n{} ({}) wants to book the slot on {} at {}.\n\n\
             Contact: {}\n\nPlease review and decide:\n{approval_link}",
            guest.name,
            guest.club,
            format_start(slot.start_time),
            offer.location,
            guest.contact,
        ),
    }
}

/// Tells the host their match is confirmed.
pub fn booking_confirmed_host(
    offer: &MatchOffer,
    slot: &Slot,
    guest: &GuestDetails,
    host_contact: &str,
) -> NewNotification {
    NewNotification {
        recipient_email: host_contact.to_string(),
        recipient_role: RecipientRole::Host,
        kind: NotificationKind::Approved,
        offer_id: offer.id.clone(),
        slot_id: Some(slot.id.clone()),
        subject: "Match Booked!".to_string(),
        body: format!(
            "Hello {},\n\nGreat news! A match has been booked.\n\nOpponent: {}\n\
             Contact: {} ({})\nDate: {}\nLocation: {}\n\n\
             Please contact them to confirm details.",
            offer.host_name,
            guest.club,
            guest.name,
            guest.contact,
            format_start(slot.start_time),
            offer.location,
        ),
    }
}

/// Tells the guest their booking went through.
pub fn booking_confirmed_guest(
    offer: &MatchOffer,
    slot: &Slot,
    guest: &GuestDetails,
) -> NewNotification {
    NewNotification {
        recipient_email: guest.contact.clone(),
        recipient_role: RecipientRole::Guest,
        kind: NotificationKind::Approved,
        offer_id: offer.id.clone(),
        slot_id: Some(slot.id.clone()),
        subject: "Match Confirmed!".to_string(),
        body: format!(
            "Hello {},\n\nYou have booked a match with {}.\n\nDate: {}\nLocation: {}\n\n\
             The host coach will contact you to finalize match details.",
            guest.name,
            host_display(offer),
            format_start(slot.start_time),
            offer.location,
        ),
    }
}

/// Tells the host a pending booking was turned down.
pub fn booking_rejected_host(
    offer: &MatchOffer,
    slot: &Slot,
    host_contact: &str,
) -> NewNotification {
    NewNotification {
        recipient_email: host_contact.to_string(),
        recipient_role: RecipientRole::Host,
        kind: NotificationKind::Rejected,
        offer_id: offer.id.clone(),
        slot_id: Some(slot.id.clone()),
        subject: "Booking Rejected".to_string(),
        body: format!(
            "Hello {},\n\nThe booking request for the slot on {} was rejected. \
             The slot is open again.",
            offer.host_name,
            format_start(slot.start_time),
        ),
    }
}

/// Tells the guest their booking request was turned down.
pub fn booking_rejected_guest(
    offer: &MatchOffer,
    slot: &Slot,
    guest: &GuestDetails,
) -> NewNotification {
    NewNotification {
        recipient_email: guest.contact.clone(),
        recipient_role: RecipientRole::Guest,
        kind: NotificationKind::Rejected,
        offer_id: offer.id.clone(),
        slot_id: Some(slot.id.clone()),
        subject: "Booking Not Confirmed".to_string(),
        body: format!(
            "Hello {},\n\nYour booking request for the match on {} at {} was not approved. \
             You can select another available slot.",
            guest.name,
            format_start(slot.start_time),
            offer.location,
        ),
    }
}

/// Tells the host their offer ended without a booking.
pub fn offer_cancelled(offer: &MatchOffer, host_contact: &str) -> NewNotification {
    NewNotification {
        recipient_email: host_contact.to_string(),
        recipient_role: RecipientRole::Host,
        kind: NotificationKind::OfferClosed,
        offer_id: offer.id.clone(),
        slot_id: None,
        subject: "Match Offer Cancelled".to_string(),
        body: format!(
            "Hello {},\n\nAll slots of your match offer at {} have been rejected. \
             The offer has been cancelled.",
            offer.host_name, offer.location,
        ),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{booking_confirmed_host, offer_approval_request, offer_rejected};
    use crate::domain::notification::{NotificationKind, RecipientRole};
    use crate::domain::offer::{AgeGroup, MatchFormat, MatchOffer, OfferId, OfferStatus};
    use crate::domain::slot::{GuestDetails, Slot, SlotId, SlotStatus};

    fn offer() -> MatchOffer {
        let now = Utc::now();
        MatchOffer {
            id: OfferId("offer-1".to_string()),
            host_name: "Sam Porter".to_string(),
            host_club: Some("Riverside FC".to_string()),
            host_contact: Some("sam@riverside.example".to_string()),
            age_group: AgeGroup::U14,
            format: MatchFormat::NineASide,
            duration_minutes: 80,
            location: "Riverside Park, Pitch 2".to_string(),
            notes: None,
            approver_email: "approver@club.example".to_string(),
            status: OfferStatus::PendingApproval,
            share_token: "share".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn slot() -> Slot {
        let start = Utc.with_ymd_and_hms(2026, 9, 12, 10, 0, 0).single().expect("valid date");
        Slot {
            id: SlotId("slot-1".to_string()),
            offer_id: OfferId("offer-1".to_string()),
            start_time: start,
            end_time: start + Duration::minutes(80),
            status: SlotStatus::Open,
            held_by_session: None,
            held_at: None,
            guest: None,
            result: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn approval_request_goes_to_the_approver_with_the_link() {
        let message =
            offer_approval_request(&offer(), &[slot()], "https://matchslot.app/approve/tok");

        assert_eq!(message.recipient_role, RecipientRole::Approver);
        assert_eq!(message.kind, NotificationKind::OfferApprovalRequest);
        assert_eq!(message.recipient_email, "approver@club.example");
        assert!(message.subject.contains("U14 9v9"));
        assert!(message.body.contains("https://matchslot.app/approve/tok"));
        assert!(message.body.contains("Saturday 12 September, 10:00"));
    }

    #[test]
    fn rejection_notice_carries_the_reason() {
        let message = offer_rejected(&offer(), "sam@riverside.example", "insufficient info");
        assert_eq!(message.kind, NotificationKind::Rejected);
        assert!(message.body.contains("Reason: insufficient info"));
    }

    #[test]
    fn booking_confirmation_names_the_opponent() {
        let guest = GuestDetails {
            name: "Alex Reid".to_string(),
            club: "Visitors United".to_string(),
            contact: "alex@visitors.example".to_string(),
            notes: None,
        };
        let message = booking_confirmed_host(&offer(), &slot(), &guest, "sam@riverside.example");
        assert_eq!(message.subject, "Match Booked!");
        assert!(message.body.contains("Opponent: Visitors United"));
        assert!(message.body.contains("Alex Reid (alex@visitors.example)"));
    }
}
