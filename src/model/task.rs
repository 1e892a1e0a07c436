use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// A task joined with the names of the assigner and the assignee.
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskRow {
    pub id: i64,
    #[schema(example = "Prepare the weekly report")]
    pub description: String,
    pub assigned_by: i64,
    pub assigned_by_name: String,
    pub assigned_by_email: String,
    pub assigned_to: i64,
    pub assigned_to_name: String,
    pub assigned_to_email: String,
    #[schema(example = "2025-03-03T09:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}
