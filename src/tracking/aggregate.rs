//! Dashboard and report figures derived from worklogs and salaries.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::earnings::{self, Earnings};
use crate::model::{user::Employee, worklog::WorkLog};

/// Number of employees listed in [`SalarySummary::top_earners`].
pub const TOP_EARNERS: usize = 5;

/// Worklogs are attributed to the UTC day they started on.
pub fn log_date(log: &WorkLog) -> NaiveDate {
    log.start_time.date_naive()
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    #[schema(example = "2025-03-03", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub sessions: usize,
    pub total_duration: i64,
    pub total_idle_time: i64,
    pub effective_duration: i64,
    pub earnings: Earnings,
}

/// Totals for one day. Earnings are computed on the day's summed paid seconds,
/// so the daily cap applies across sessions.
pub fn daily_summary(date: NaiveDate, logs: &[WorkLog], monthly_salary: f64) -> DailySummary {
    let day: Vec<&WorkLog> = logs.iter().filter(|l| log_date(l) == date).collect();
    let total_duration = day.iter().map(|l| l.duration).fold(0, i64::saturating_add);
    let total_idle_time = day.iter().map(|l| l.total_idle_time).fold(0, i64::saturating_add);
    let paid = day.iter().map(|l| l.paid_seconds()).fold(0, u64::saturating_add);

    DailySummary {
        date,
        sessions: day.len(),
        total_duration,
        total_idle_time,
        effective_duration: i64::try_from(paid).unwrap_or(i64::MAX),
        earnings: earnings::calculate(paid, monthly_salary),
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    #[schema(example = "2025-03")]
    pub month: String,
    pub days: Vec<DailySummary>,
    pub days_worked: usize,
    pub total_duration: i64,
    pub effective_duration: i64,
    pub total_earnings: f64,
}

/// Per-day summaries for every day of `year`/`month` that has at least one log.
pub fn monthly_summary(year: i32, month: u32, logs: &[WorkLog], monthly_salary: f64) -> MonthlySummary {
    let mut by_day: BTreeMap<NaiveDate, Vec<WorkLog>> = BTreeMap::new();
    for log in logs {
        let date = log_date(log);
        if date.year() == year && date.month() == month {
            by_day.entry(date).or_default().push(log.clone());
        }
    }

    let days: Vec<DailySummary> = by_day
        .iter()
        .map(|(date, day_logs)| daily_summary(*date, day_logs, monthly_salary))
        .collect();

    MonthlySummary {
        month: format!("{year:04}-{month:02}"),
        days_worked: days.len(),
        total_duration: days.iter().map(|d| d.total_duration).fold(0, i64::saturating_add),
        effective_duration: days.iter().map(|d| d.effective_duration).fold(0, i64::saturating_add),
        total_earnings: days.iter().map(|d| d.earnings.amount).sum(),
        days,
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalarySummary {
    pub total_employees: usize,
    pub total_payroll: f64,
    /// rounded to whole units
    pub average: i64,
    pub min: f64,
    pub max: f64,
    pub top_earners: Vec<Employee>,
}

fn min_max(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (min, max)
}

fn rounded_average(total: f64, count: usize) -> i64 {
    if count == 0 {
        0
    } else {
        (total / count as f64).round() as i64
    }
}

pub fn salary_summary(employees: &[Employee]) -> SalarySummary {
    let salaries: Vec<f64> = employees
        .iter()
        .map(|e| e.salary)
        .filter(|s| s.is_finite())
        .collect();
    let total_payroll: f64 = salaries.iter().sum();
    let (min, max) = min_max(&salaries);

    let mut top_earners = employees.to_vec();
    top_earners.sort_by(|a, b| b.salary.total_cmp(&a.salary));
    top_earners.truncate(TOP_EARNERS);

    SalarySummary {
        total_employees: employees.len(),
        total_payroll,
        average: rounded_average(total_payroll, employees.len()),
        min,
        max,
        top_earners,
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleSummary {
    #[schema(example = "senior")]
    pub role: String,
    pub count: usize,
    pub total: f64,
    pub average: i64,
    pub min: f64,
    pub max: f64,
}

/// Salary figures for the `employee` and `senior` groups, in that order.
pub fn role_summaries(employees: &[Employee]) -> Vec<RoleSummary> {
    ["employee", "senior"]
        .into_iter()
        .map(|group| {
            let salaries: Vec<f64> = employees
                .iter()
                .filter(|e| e.role.report_group() == group)
                .map(|e| e.salary)
                .collect();
            let total: f64 = salaries.iter().sum();
            let (min, max) = min_max(&salaries);
            RoleSummary {
                role: group.to_string(),
                count: salaries.len(),
                total,
                average: rounded_average(total, salaries.len()),
                min,
                max,
            }
        })
        .collect()
}

/// Headcount per reporting group.
pub fn role_distribution(employees: &[Employee]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for e in employees {
        *counts.entry(e.role.report_group().to_string()).or_insert(0) += 1;
    }
    counts
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub worklog_id: i64,
    pub user_id: i64,
    /// Full name, or the worklog email when the user no longer exists.
    pub employee: String,
    #[schema(example = "2025-03-03", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(format = "date-time", value_type = String)]
    pub start_time: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub end_time: DateTime<Utc>,
    pub duration: i64,
    pub effective_duration: i64,
    pub rounded_minutes: u64,
    /// whole currency units
    pub earnings: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorklogReport {
    pub rows: Vec<ReportRow>,
    pub total_duration: i64,
    pub total_earnings: i64,
}

/// One row per worklog, each capped on its own. Totals add up the rounded
/// per-row amounts, matching what a printed report shows.
pub fn worklog_report(logs: &[WorkLog], employees: &HashMap<i64, Employee>) -> WorklogReport {
    let rows: Vec<ReportRow> = logs
        .iter()
        .map(|log| {
            let employee = employees.get(&log.user_id);
            let salary = employee.map(|e| e.salary).unwrap_or(0.0);
            let pay = earnings::calculate(log.paid_seconds(), salary);
            ReportRow {
                worklog_id: log.id,
                user_id: log.user_id,
                employee: employee
                    .map(|e| e.full_name())
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| log.email.clone()),
                date: log_date(log),
                start_time: log.start_time,
                end_time: log.end_time,
                duration: log.duration,
                effective_duration: log.effective_duration,
                rounded_minutes: pay.rounded_minutes,
                earnings: pay.display_amount(),
            }
        })
        .collect();

    WorklogReport {
        total_duration: rows.iter().map(|r| r.duration).fold(0, i64::saturating_add),
        total_earnings: rows.iter().map(|r| r.earnings).fold(0, i64::saturating_add),
        rows,
    }
}

/// `HH:MM:SS`, hours not wrapped at 24.
pub fn format_hms(seconds: i64) -> String {
    let s = seconds.max(0);
    format!("{:02}:{:02}:{:02}", s / 3600, (s % 3600) / 60, s % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use chrono::{Duration, TimeZone};

    fn log(id: i64, user_id: i64, start: DateTime<Utc>, duration: i64, idle: i64) -> WorkLog {
        WorkLog {
            id,
            user_id,
            email: format!("user{user_id}@company.com"),
            start_time: start,
            end_time: start + Duration::seconds(duration),
            duration,
            total_idle_time: idle,
            effective_duration: (duration - idle).max(0),
            created_at: start + Duration::seconds(duration),
            idle_segments: vec![],
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
    }

    fn employee(id: i64, role: Role, salary: f64) -> Employee {
        Employee {
            id,
            first_name: format!("First{id}"),
            last_name: format!("Last{id}"),
            email: format!("user{id}@company.com"),
            role,
            salary,
        }
    }

    #[test]
    fn daily_summary_sums_sessions_before_rounding() {
        let logs = vec![
            log(1, 1, at(3, 9), 1000, 100),
            log(2, 1, at(3, 13), 910, 0),
            log(3, 1, at(4, 9), 5000, 0),
        ];
        let day = daily_summary(at(3, 0).date_naive(), &logs, 15_000.0);
        assert_eq!(day.sessions, 2);
        assert_eq!(day.total_duration, 1910);
        assert_eq!(day.total_idle_time, 100);
        assert_eq!(day.effective_duration, 1810);
        assert_eq!(day.earnings.rounded_minutes, 35);
        assert_eq!(day.earnings.display_amount(), 36);
    }

    #[test]
    fn monthly_summary_caps_each_day() {
        let logs = vec![
            log(1, 1, at(3, 9), 12 * 3600, 0),
            log(2, 1, at(4, 9), 12 * 3600, 0),
            log(3, 1, Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).unwrap(), 3600, 0),
        ];
        let month = monthly_summary(2025, 3, &logs, 15_000.0);
        assert_eq!(month.month, "2025-03");
        assert_eq!(month.days_worked, 2);
        assert_eq!(month.total_earnings, 1000.0);
    }

    #[test]
    fn salary_and_role_summaries() {
        let staff = vec![
            employee(1, Role::Employee, 10_000.0),
            employee(2, Role::Employee, 20_000.0),
            employee(3, Role::SeniorEmployee, 40_000.0),
            employee(4, Role::Admin, 0.0),
        ];

        let summary = salary_summary(&staff);
        assert_eq!(summary.total_employees, 4);
        assert_eq!(summary.total_payroll, 70_000.0);
        assert_eq!(summary.average, 17_500);
        assert_eq!(summary.min, 0.0);
        assert_eq!(summary.max, 40_000.0);
        assert_eq!(summary.top_earners[0].id, 3);

        let roles = role_summaries(&staff);
        assert_eq!(roles[0].role, "employee");
        assert_eq!(roles[0].count, 3);
        assert_eq!(roles[0].average, 10_000);
        assert_eq!(roles[1].role, "senior");
        assert_eq!(roles[1].count, 1);
        assert_eq!(roles[1].max, 40_000.0);

        let dist = role_distribution(&staff);
        assert_eq!(dist.get("employee"), Some(&3));
        assert_eq!(dist.get("senior"), Some(&1));
    }

    #[test]
    fn empty_inputs_produce_zeroes() {
        let summary = salary_summary(&[]);
        assert_eq!(summary.average, 0);
        assert_eq!(summary.min, 0.0);
        let roles = role_summaries(&[]);
        assert_eq!(roles.len(), 2);
        assert!(roles.iter().all(|r| r.count == 0 && r.average == 0));
    }

    #[test]
    fn report_falls_back_to_email_for_deleted_users() {
        let logs = vec![log(1, 1, at(3, 9), 1810, 0), log(2, 99, at(3, 10), 600, 0)];
        let employees: HashMap<i64, Employee> =
            [(1, employee(1, Role::Employee, 15_000.0))].into_iter().collect();

        let report = worklog_report(&logs, &employees);
        assert_eq!(report.rows[0].employee, "First1 Last1");
        assert_eq!(report.rows[0].earnings, 36);
        assert_eq!(report.rows[1].employee, "user99@company.com");
        assert_eq!(report.rows[1].earnings, 0);
        assert_eq!(report.total_duration, 2410);
        assert_eq!(report.total_earnings, 36);
    }

    #[test]
    fn oversized_totals_saturate() {
        let mut huge = log(1, 1, at(3, 9), 3600, 0);
        huge.duration = i64::MAX;
        huge.effective_duration = i64::MAX;
        let logs = vec![huge.clone(), huge.clone(), log(3, 1, at(3, 12), 600, 0)];

        let day = daily_summary(at(3, 0).date_naive(), &logs, 15_000.0);
        assert_eq!(day.total_duration, i64::MAX);
        assert_eq!(day.effective_duration, i64::MAX);
        assert_eq!(day.earnings.amount, 500.0);

        let month = monthly_summary(2025, 3, &logs, 15_000.0);
        assert_eq!(month.total_duration, i64::MAX);

        let report = worklog_report(&logs, &HashMap::new());
        assert_eq!(report.total_duration, i64::MAX);
    }

    #[test]
    fn hms_formatting() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(1810), "00:30:10");
        assert_eq!(format_hms(90_061), "25:01:01");
    }
}
