//! SQLite implementations of the core persistence gateway. Conditional
//! updates are expressed as `UPDATE ... WHERE status IN (...)` so lost races
//! surface as zero affected rows, and the booking cascade runs inside a
//! single transaction.

pub mod approval;
pub mod booking;
pub mod outbox;

pub use approval::SqlApprovalStore;
pub use booking::SqlBookingStore;
pub use outbox::SqlNotificationOutbox;

use chrono::{DateTime, SecondsFormat, Utc};
use matchslot_core::store::StoreError;

pub(crate) fn backend(error: sqlx::Error) -> StoreError {
    StoreError::Backend(error.to_string())
}

pub(crate) fn decode(message: impl Into<String>) -> StoreError {
    StoreError::Decode(message.into())
}

/// Fixed-width UTC timestamps so stored text compares lexicographically.
pub(crate) fn fmt_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(value: &str, column: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| decode(format!("column `{column}` holds invalid timestamp `{value}`")))
}

pub(crate) fn parse_opt_ts(
    value: Option<String>,
    column: &str,
) -> Result<Option<DateTime<Utc>>, StoreError> {
    value.map(|value| parse_ts(&value, column)).transpose()
}

pub(crate) fn new_row_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
