use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdleSegment {
    #[serde(skip)]
    pub worklog_id: i64,
    #[schema(example = "2025-03-03T09:10:00Z", format = "date-time", value_type = String)]
    pub start: DateTime<Utc>,
    #[schema(example = "2025-03-03T09:15:00Z", format = "date-time", value_type = String)]
    pub end: DateTime<Utc>,
    /// seconds
    #[schema(example = 300)]
    pub duration: i64,
}

/// A persisted work session. Never updated after creation.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkLog {
    pub id: i64,
    pub user_id: i64,
    pub email: String,
    #[schema(example = "2025-03-03T09:00:00Z", format = "date-time", value_type = String)]
    pub start_time: DateTime<Utc>,
    #[schema(example = "2025-03-03T09:30:10Z", format = "date-time", value_type = String)]
    pub end_time: DateTime<Utc>,
    /// seconds
    #[schema(example = 1810)]
    pub duration: i64,
    #[schema(example = 300)]
    pub total_idle_time: i64,
    #[schema(example = 1510)]
    pub effective_duration: i64,
    #[schema(example = "2025-03-03T09:30:11Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub idle_segments: Vec<IdleSegment>,
}

impl WorkLog {
    /// Seconds that count towards pay.
    pub fn paid_seconds(&self) -> u64 {
        self.effective_duration.max(0) as u64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewIdleSegment {
    #[schema(example = "2025-03-03T09:10:00Z", format = "date-time", value_type = String)]
    pub start: DateTime<Utc>,
    #[schema(example = "2025-03-03T09:15:00Z", format = "date-time", value_type = String)]
    pub end: DateTime<Utc>,
    /// Derived from `start`/`end` when omitted.
    #[schema(example = 300)]
    #[serde(default)]
    pub duration: Option<i64>,
}

/// Payload posted when a timer is stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkLog {
    #[schema(example = "2025-03-03T09:00:00Z", format = "date-time", value_type = String)]
    pub start_time: DateTime<Utc>,
    #[schema(example = "2025-03-03T09:30:10Z", format = "date-time", value_type = String)]
    pub end_time: DateTime<Utc>,
    /// Client-measured seconds; derived from the timestamps when omitted.
    #[schema(example = 1810)]
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub idle_segments: Vec<NewIdleSegment>,
}
