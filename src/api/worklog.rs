use std::collections::HashMap;

use actix_web::{HttpResponse, web};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::auth::AuthUser,
    error::{ApiError, ApiResult},
    model::worklog::{IdleSegment, NewWorkLog, WorkLog},
    models::MessageResponse,
    tracking::{
        aggregate::daily_summary,
        earnings::Earnings,
        reconcile::{self, ReconciledWorkLog},
    },
    utils::salary_cache::SalaryCache,
};

/// `[start of date, start of next day)` in UTC.
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&date.and_time(NaiveTime::default()));
    (start, start + Duration::days(1))
}

pub async fn insert_worklog(
    pool: &SqlitePool,
    user_id: i64,
    email: &str,
    log: &ReconciledWorkLog,
) -> Result<WorkLog, sqlx::Error> {
    let created_at = Utc::now();
    let mut tx = pool.begin().await?;

    let id = sqlx::query(
        r#"
        INSERT INTO worklogs
            (user_id, email, start_time, end_time, duration, total_idle_time, effective_duration, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(email)
    .bind(log.start_time)
    .bind(log.end_time)
    .bind(log.duration)
    .bind(log.total_idle_time)
    .bind(log.effective_duration)
    .bind(created_at)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let mut idle_segments = Vec::with_capacity(log.idle_segments.len());
    for seg in &log.idle_segments {
        let duration = seg.duration.unwrap_or_default();
        sqlx::query(r#"INSERT INTO idle_segments (worklog_id, start, "end", duration) VALUES (?, ?, ?, ?)"#)
            .bind(id)
            .bind(seg.start)
            .bind(seg.end)
            .bind(duration)
            .execute(&mut *tx)
            .await?;
        idle_segments.push(IdleSegment {
            worklog_id: id,
            start: seg.start,
            end: seg.end,
            duration,
        });
    }

    tx.commit().await?;

    Ok(WorkLog {
        id,
        user_id,
        email: email.to_string(),
        start_time: log.start_time,
        end_time: log.end_time,
        duration: log.duration,
        total_idle_time: log.total_idle_time,
        effective_duration: log.effective_duration,
        created_at,
        idle_segments,
    })
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WorklogFilter {
    pub user_id: Option<i64>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl WorklogFilter {
    pub fn for_user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    /// Restrict to logs that started within `[from, to]` (whole days, inclusive).
    pub fn between_dates(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.from = from.map(|d| day_bounds(d).0);
        self.to = to.map(|d| day_bounds(d).1);
        self
    }
}

// Helper enum for typed SQLx binding
enum FilterValue {
    Id(i64),
    Time(DateTime<Utc>),
}

const SEGMENT_CHUNK: usize = 500;

/// Worklogs matching `filter`, oldest first, with their idle segments.
pub async fn fetch_worklogs(pool: &SqlitePool, filter: WorklogFilter) -> Result<Vec<WorkLog>, sqlx::Error> {
    let mut conditions = Vec::new();
    let mut bindings = Vec::new();

    if let Some(user_id) = filter.user_id {
        conditions.push("user_id = ?");
        bindings.push(FilterValue::Id(user_id));
    }
    if let Some(from) = filter.from {
        conditions.push("start_time >= ?");
        bindings.push(FilterValue::Time(from));
    }
    if let Some(to) = filter.to {
        conditions.push("start_time < ?");
        bindings.push(FilterValue::Time(to));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let sql = format!("SELECT * FROM worklogs {} ORDER BY start_time ASC, id ASC", where_clause);
    debug!(sql = %sql, "Fetching worklogs");

    let mut query = sqlx::query_as::<_, WorkLog>(&sql);
    for b in bindings {
        query = match b {
            FilterValue::Id(v) => query.bind(v),
            FilterValue::Time(v) => query.bind(v),
        };
    }
    let mut logs = query.fetch_all(pool).await?;

    attach_segments(pool, &mut logs).await?;
    Ok(logs)
}

async fn attach_segments(pool: &SqlitePool, logs: &mut [WorkLog]) -> Result<(), sqlx::Error> {
    let mut by_log: HashMap<i64, Vec<IdleSegment>> = HashMap::new();

    let ids: Vec<i64> = logs.iter().map(|l| l.id).collect();
    for chunk in ids.chunks(SEGMENT_CHUNK) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let sql = format!(
            r#"SELECT worklog_id, start, "end", duration FROM idle_segments WHERE worklog_id IN ({}) ORDER BY start"#,
            placeholders
        );
        let mut query = sqlx::query_as::<_, IdleSegment>(&sql);
        for id in chunk {
            query = query.bind(*id);
        }
        for seg in query.fetch_all(pool).await? {
            by_log.entry(seg.worklog_id).or_default().push(seg);
        }
    }

    for log in logs.iter_mut() {
        log.idle_segments = by_log.remove(&log.id).unwrap_or_default();
    }
    Ok(())
}

#[derive(Serialize, ToSchema)]
pub struct WorklogListResponse {
    pub logs: Vec<WorkLog>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct WorklogQuery {
    /// Admins only; other users always get their own logs
    pub user_id: Option<i64>,
    /// First day, inclusive (YYYY-MM-DD)
    #[param(value_type = Option<String>)]
    pub from: Option<NaiveDate>,
    /// Last day, inclusive (YYYY-MM-DD)
    #[param(value_type = Option<String>)]
    pub to: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodayWorklogs {
    #[schema(example = "2025-03-03", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub has_worklog: bool,
    pub logs: Vec<WorkLog>,
    pub total_duration: i64,
    pub total_idle_time: i64,
    pub effective_duration: i64,
    pub monthly_salary: f64,
    pub earnings: Earnings,
}

/// Save a finished work session
#[utoipa::path(
    post,
    path = "/api/worklogs",
    request_body = NewWorkLog,
    responses(
        (status = 201, description = "Work log saved", body = Object, example = json!({
            "message": "Work log saved",
            "worklog": {
                "id": 1, "userId": 1, "email": "asha@company.com",
                "startTime": "2025-03-03T09:00:00Z", "endTime": "2025-03-03T09:30:10Z",
                "duration": 1810, "totalIdleTime": 300, "effectiveDuration": 1510,
                "createdAt": "2025-03-03T09:30:11Z", "idleSegments": []
            }
        })),
        (status = 400, description = "Invalid time range", body = MessageResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Worklog"
)]
pub async fn create_worklog(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<NewWorkLog>,
) -> ApiResult<HttpResponse> {
    let reconciled = reconcile::normalize(&payload)?;
    let log = insert_worklog(pool.get_ref(), auth.user_id, &auth.email, &reconciled).await?;

    info!(
        user_id = auth.user_id,
        worklog_id = log.id,
        duration = log.duration,
        idle = log.total_idle_time,
        "Work log saved"
    );

    Ok(HttpResponse::Created().json(json!({
        "message": "Work log saved",
        "worklog": log
    })))
}

/// List worklogs
#[utoipa::path(
    get,
    path = "/api/worklogs",
    params(WorklogQuery),
    responses(
        (status = 200, description = "Worklogs, oldest first", body = WorklogListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Worklog"
)]
pub async fn list_worklogs(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<WorklogQuery>,
) -> ApiResult<HttpResponse> {
    let user_id = if auth.is_admin() { query.user_id } else { Some(auth.user_id) };

    let filter = WorklogFilter {
        user_id,
        ..WorklogFilter::default()
    }
    .between_dates(query.from, query.to);

    let logs = fetch_worklogs(pool.get_ref(), filter).await?;
    Ok(HttpResponse::Ok().json(WorklogListResponse { logs }))
}

/// Delete a worklog
#[utoipa::path(
    delete,
    path = "/api/worklogs/{id}",
    params(("id" = i64, Path, description = "Worklog ID")),
    responses(
        (status = 200, description = "Work log deleted", body = MessageResponse),
        (status = 403, description = "Admin only", body = MessageResponse),
        (status = 404, description = "Work log not found", body = MessageResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Worklog"
)]
pub async fn delete_worklog(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let worklog_id = path.into_inner();

    let res = sqlx::query("DELETE FROM worklogs WHERE id = ?")
        .bind(worklog_id)
        .execute(pool.get_ref())
        .await?;

    if res.rows_affected() == 0 {
        return Err(ApiError::not_found("Work log not found"));
    }

    info!(worklog_id, deleted_by = auth.user_id, "Work log deleted");
    Ok(HttpResponse::Ok().json(MessageResponse::new("Work log deleted")))
}

/// Today's worklogs and earnings for a user
#[utoipa::path(
    get,
    path = "/api/worklogs/{userId}/today",
    params(("userId" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Today's logs and earnings", body = TodayWorklogs),
        (status = 403, description = "Another user's logs", body = MessageResponse),
        (status = 404, description = "User not found", body = MessageResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Worklog"
)]
pub async fn today_worklogs(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    salaries: web::Data<SalaryCache>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let user_id = path.into_inner();
    auth.require_self_or_admin(user_id)?;

    let salary = salaries
        .salary_of(pool.get_ref(), user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let today = Utc::now().date_naive();
    let filter = WorklogFilter::for_user(user_id).between_dates(Some(today), Some(today));
    let logs = fetch_worklogs(pool.get_ref(), filter).await?;

    let summary = daily_summary(today, &logs, salary);

    Ok(HttpResponse::Ok().json(TodayWorklogs {
        date: today,
        has_worklog: !logs.is_empty(),
        total_duration: summary.total_duration,
        total_idle_time: summary.total_idle_time,
        effective_duration: summary.effective_duration,
        monthly_salary: salary,
        earnings: summary.earnings,
        logs,
    }))
}
