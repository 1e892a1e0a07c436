use std::collections::{BTreeMap, HashMap};

use actix_web::{HttpResponse, http::header, web};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::{
        employee::{fetch_employee, fetch_employees},
        worklog::{WorklogFilter, fetch_worklogs},
    },
    auth::auth::AuthUser,
    error::{ApiError, ApiResult},
    model::user::Employee,
    tracking::aggregate::{self, RoleSummary, SalarySummary, WorklogReport, format_hms},
    utils::salary_cache::SalaryCache,
};

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DailyQuery {
    /// Defaults to the caller
    pub user_id: Option<i64>,
    /// YYYY-MM-DD, defaults to today (UTC)
    #[param(value_type = Option<String>)]
    pub date: Option<NaiveDate>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MonthlyQuery {
    /// Defaults to the caller
    pub user_id: Option<i64>,
    /// YYYY-MM, defaults to the current month (UTC)
    pub month: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    /// Admins only; other users always get their own rows
    pub user_id: Option<i64>,
    /// First day, inclusive (YYYY-MM-DD)
    #[param(value_type = Option<String>)]
    pub from: Option<NaiveDate>,
    /// Last day, inclusive (YYYY-MM-DD)
    #[param(value_type = Option<String>)]
    pub to: Option<NaiveDate>,
    /// `json` (default) or `csv`
    pub format: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalaryReport {
    pub summary: SalarySummary,
    pub roles: Vec<RoleSummary>,
    #[schema(value_type = Object, example = json!({ "employee": 3, "senior": 1 }))]
    pub distribution: BTreeMap<String, usize>,
}

/// Parses `YYYY-MM` into a year and month.
pub fn parse_month(value: &str) -> Option<(i32, u32)> {
    let (year, month) = value.split_once('-')?;
    if year.len() != 4 || month.len() != 2 {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1).map(|_| (year, month))
}

fn month_range(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next.pred_opt()?))
}

async fn salary_for(
    pool: &SqlitePool,
    salaries: &SalaryCache,
    user_id: i64,
) -> Result<f64, ApiError> {
    salaries
        .salary_of(pool, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// One user's totals and earnings for a day
#[utoipa::path(
    get,
    path = "/api/reports/daily",
    params(DailyQuery),
    responses(
        (status = 200, description = "Daily summary", body = crate::tracking::aggregate::DailySummary),
        (status = 403, description = "Another user's report", body = crate::models::MessageResponse),
        (status = 404, description = "User not found", body = crate::models::MessageResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Report"
)]
pub async fn daily_report(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    salaries: web::Data<SalaryCache>,
    query: web::Query<DailyQuery>,
) -> ApiResult<HttpResponse> {
    let user_id = query.user_id.unwrap_or(auth.user_id);
    auth.require_self_or_admin(user_id)?;

    let salary = salary_for(pool.get_ref(), salaries.get_ref(), user_id).await?;
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());

    let filter = WorklogFilter::for_user(user_id).between_dates(Some(date), Some(date));
    let logs = fetch_worklogs(pool.get_ref(), filter).await?;

    Ok(HttpResponse::Ok().json(aggregate::daily_summary(date, &logs, salary)))
}

/// One user's per-day summaries for a month
#[utoipa::path(
    get,
    path = "/api/reports/monthly",
    params(MonthlyQuery),
    responses(
        (status = 200, description = "Monthly summary", body = crate::tracking::aggregate::MonthlySummary),
        (status = 400, description = "Malformed month", body = crate::models::MessageResponse),
        (status = 403, description = "Another user's report", body = crate::models::MessageResponse),
        (status = 404, description = "User not found", body = crate::models::MessageResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Report"
)]
pub async fn monthly_report(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    salaries: web::Data<SalaryCache>,
    query: web::Query<MonthlyQuery>,
) -> ApiResult<HttpResponse> {
    let user_id = query.user_id.unwrap_or(auth.user_id);
    auth.require_self_or_admin(user_id)?;

    let (year, month) = match query.month.as_deref() {
        Some(m) => parse_month(m).ok_or_else(|| ApiError::bad_request("month must be YYYY-MM"))?,
        None => {
            let today = Utc::now().date_naive();
            (today.year(), today.month())
        }
    };
    let (first, last) =
        month_range(year, month).ok_or_else(|| ApiError::bad_request("month must be YYYY-MM"))?;

    let salary = salary_for(pool.get_ref(), salaries.get_ref(), user_id).await?;

    let filter = WorklogFilter::for_user(user_id).between_dates(Some(first), Some(last));
    let logs = fetch_worklogs(pool.get_ref(), filter).await?;

    Ok(HttpResponse::Ok().json(aggregate::monthly_summary(year, month, &logs, salary)))
}

/// Payroll figures across all users
#[utoipa::path(
    get,
    path = "/api/reports/salary",
    responses(
        (status = 200, description = "Salary, role and headcount summaries", body = SalaryReport),
        (status = 403, description = "Admin only", body = crate::models::MessageResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Report"
)]
pub async fn salary_report(auth: AuthUser, pool: web::Data<SqlitePool>) -> ApiResult<HttpResponse> {
    auth.require_admin()?;

    let employees = fetch_employees(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(SalaryReport {
        summary: aggregate::salary_summary(&employees),
        roles: aggregate::role_summaries(&employees),
        distribution: aggregate::role_distribution(&employees),
    }))
}

pub const CSV_HEADER: [&str; 7] = [
    "Employee",
    "Date",
    "Start",
    "End",
    "Duration",
    "Rounded minutes",
    "Earnings",
];

/// Renders the report as CSV, with a trailing totals row.
pub fn report_to_csv(report: &WorklogReport) -> Result<String, csv::Error> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(CSV_HEADER)?;

    for row in &report.rows {
        wtr.write_record([
            row.employee.clone(),
            row.date.to_string(),
            row.start_time.format("%H:%M:%S").to_string(),
            row.end_time.format("%H:%M:%S").to_string(),
            format_hms(row.duration),
            row.rounded_minutes.to_string(),
            row.earnings.to_string(),
        ])?;
    }

    wtr.write_record([
        "Total".to_string(),
        String::new(),
        String::new(),
        String::new(),
        format_hms(report.total_duration),
        String::new(),
        report.total_earnings.to_string(),
    ])?;

    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Worklog report with per-row earnings, as JSON or CSV
#[utoipa::path(
    get,
    path = "/api/reports/worklogs",
    params(ReportQuery),
    responses(
        (status = 200, description = "Report rows and totals, or a CSV export when format=csv", content(
            ("application/json" = WorklogReport),
            ("text/csv" = String)
        )),
        (status = 400, description = "Unknown format", body = crate::models::MessageResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Report"
)]
pub async fn worklog_report(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<ReportQuery>,
) -> ApiResult<HttpResponse> {
    let as_csv = match query.format.as_deref() {
        None | Some("json") => false,
        Some("csv") => true,
        Some(_) => return Err(ApiError::bad_request("format must be json or csv")),
    };

    let user_id = if auth.is_admin() { query.user_id } else { Some(auth.user_id) };

    let filter = WorklogFilter {
        user_id,
        ..WorklogFilter::default()
    }
    .between_dates(query.from, query.to);
    let logs = fetch_worklogs(pool.get_ref(), filter).await?;

    let employees: HashMap<i64, Employee> = match user_id {
        Some(id) => fetch_employee(pool.get_ref(), id).await?.into_iter().map(|e| (e.id, e)).collect(),
        None => fetch_employees(pool.get_ref())
            .await?
            .into_iter()
            .map(|e| (e.id, e))
            .collect(),
    };

    let report = aggregate::worklog_report(&logs, &employees);
    info!(requested_by = auth.user_id, rows = report.rows.len(), as_csv, "Worklog report generated");

    if !as_csv {
        return Ok(HttpResponse::Ok().json(report));
    }

    let body = report_to_csv(&report).map_err(|e| {
        error!(error = %e, "Failed to write CSV report");
        ApiError::Internal
    })?;

    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/csv; charset=utf-8"))
        .insert_header((
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"worklog-report.csv\"",
        ))
        .body(body))
}
