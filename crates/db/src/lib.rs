pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod store;

pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{seed_demo, SeedSummary, SeededOffer};
pub use store::{SqlApprovalStore, SqlBookingStore, SqlNotificationOutbox};
