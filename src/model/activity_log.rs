use crate::model::timesheet::Activity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Append-only audit trail of timesheet transitions. Rows are written in the
/// same transaction as the timesheet mutation they describe and are never
/// updated or deleted.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 42,
    "employee_id": 7,
    "timesheet_id": 11,
    "activity": "LUNCH_IN",
    "created_at": "2026-08-29T13:00:00Z"
}))]
pub struct ActivityLog {
    pub id: u64,
    pub employee_id: u64,
    pub timesheet_id: Option<u64>,
    pub activity: Activity,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}
