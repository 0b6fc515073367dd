//! Deterministic demo fixtures: a pair of realistic offers seeded through
//! the real coordinator so every invariant and side effect applies.

use std::sync::Arc;

use chrono::{Duration, Utc};

use matchslot_core::config::AppConfig;
use matchslot_core::coordinator::{OfferDraft, SlotDraft, WorkflowCoordinator};
use matchslot_core::domain::offer::{AgeGroup, MatchFormat, OfferId, OfferStatus};
use matchslot_core::errors::WorkflowError;
use matchslot_core::links::LinkBuilder;
use matchslot_core::token::RandomTokenIssuer;

use crate::store::{SqlApprovalStore, SqlBookingStore, SqlNotificationOutbox};
use crate::DbPool;

#[derive(Clone, Debug)]
pub struct SeededOffer {
    pub offer_id: OfferId,
    pub host_name: String,
    pub status: OfferStatus,
    pub share_link: String,
    pub approval_link: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct SeedSummary {
    pub offers: Vec<SeededOffer>,
}

pub fn coordinator_for(pool: &DbPool, config: &AppConfig) -> WorkflowCoordinator {
    WorkflowCoordinator::new(
        Arc::new(SqlBookingStore::new(pool.clone())),
        Arc::new(SqlApprovalStore::new(pool.clone())),
        Arc::new(SqlNotificationOutbox::new(pool.clone())),
        Arc::new(RandomTokenIssuer),
        LinkBuilder::new(config.links.base_url.as_str()),
        config.workflow.policy(),
    )
}

/// Seeds two demo offers under the configured workflow policy and reports
/// the links an operator needs to walk the flow by hand.
pub async fn seed_demo(pool: &DbPool, config: &AppConfig) -> Result<SeedSummary, WorkflowError> {
    let coordinator = coordinator_for(pool, config);

    let mut summary = SeedSummary::default();
    for draft in demo_drafts() {
        let host_name = draft.host_name.clone();
        let created = coordinator.create_offer(draft).await?;
        summary.offers.push(SeededOffer {
            offer_id: created.offer.id,
            host_name,
            status: created.offer.status,
            share_link: created.share_link,
            approval_link: created.approval_link,
        });
    }

    Ok(summary)
}

fn demo_drafts() -> Vec<OfferDraft> {
    let ten_am = chrono::NaiveTime::from_hms_opt(10, 0, 0).unwrap_or(chrono::NaiveTime::MIN);
    let half_nine = chrono::NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(chrono::NaiveTime::MIN);
    let tomorrow_ten =
        (Utc::now() + Duration::days(1)).date_naive().and_time(ten_am).and_utc();
    let saturday_nine =
        (Utc::now() + Duration::days(3)).date_naive().and_time(half_nine).and_utc();

    vec![
        OfferDraft {
            host_name: "Sam Porter".to_string(),
            host_club: Some("Riverside FC".to_string()),
            host_contact: Some("sam@riverside.example".to_string()),
            age_group: AgeGroup::U12,
            format: MatchFormat::ElevenASide,
            duration_minutes: 90,
            location: "Riverside Park, Pitch 2".to_string(),
            notes: Some("Parking by the clubhouse.".to_string()),
            approver_email: "fixtures@riverside.example".to_string(),
            slots: (0..3)
                .map(|hour| SlotDraft {
                    start_time: tomorrow_ten + Duration::hours(hour),
                    end_time: tomorrow_ten + Duration::hours(hour) + Duration::minutes(90),
                })
                .collect(),
        },
        OfferDraft {
            host_name: "Jo Whitfield".to_string(),
            host_club: Some("Northgate Juniors".to_string()),
            host_contact: Some("jo@northgate.example".to_string()),
            age_group: AgeGroup::U10,
            format: MatchFormat::SevenASide,
            duration_minutes: 60,
            location: "Northgate Rec Ground".to_string(),
            notes: None,
            approver_email: "fixtures@northgate.example".to_string(),
            slots: (0..2)
                .map(|hour| SlotDraft {
                    start_time: saturday_nine + Duration::hours(2 * hour),
                    end_time: saturday_nine + Duration::hours(2 * hour) + Duration::minutes(60),
                })
                .collect(),
        },
    ]
}
