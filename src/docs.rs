use crate::api::employee::{EmployeeListResponse, SalaryUpdated, UpdateEmployee, UpdateSalary};
use crate::api::report::SalaryReport;
use crate::api::task::{CreateTask, TaskListResponse};
use crate::api::worklog::{TodayWorklogs, WorklogListResponse};
use crate::model::role::Role;
use crate::model::task::TaskRow;
use crate::model::user::Employee;
use crate::model::worklog::{IdleSegment, NewIdleSegment, NewWorkLog, WorkLog};
use crate::models::{LoginReqDto, LoginResponse, LogoutReq, MessageResponse, SignupReq, TokenPair};
use crate::tracking::aggregate::{
    DailySummary, MonthlySummary, ReportRow, RoleSummary, SalarySummary, WorklogReport,
};
use crate::tracking::earnings::Earnings;
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "WorkTrack API",
        version = "1.0.0",
        description = r#"
## Workforce Time Tracking

Backend for a time-tracking dashboard: employees run a work timer that pauses
itself when they go idle, finished sessions are stored as worklogs, and
earnings are derived from each user's monthly salary.

### 🔹 Key Features
- **Accounts**
  - Sign up, log in, rotate tokens, log out (logout backfills a worklog from the day's session)
- **Employees**
  - List users with salary, update profile and role, set salary, remove users
- **Tasks**
  - Seniors and admins assign tasks; employees see their own
- **Worklogs**
  - Save sessions with idle segments, list and delete logs, today's earnings
- **Reports**
  - Daily and monthly summaries, payroll figures, CSV worklog export

### 💰 Earnings
- Daily rate = monthly salary / 30
- Worked minutes are rounded up to the next multiple of 5
- Per-minute rate = daily rate / 480, capped at the daily rate

### 🔐 Security
All endpoints except signup, login and refresh require a **JWT Bearer** access token.
Signup takes an admin token when creating senior employee or admin accounts.
"#,
    ),
    paths(
        crate::auth::handlers::signup,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::update_salary,
        crate::api::employee::delete_employee,

        crate::api::task::create_task,
        crate::api::task::list_tasks,

        crate::api::worklog::create_worklog,
        crate::api::worklog::list_worklogs,
        crate::api::worklog::delete_worklog,
        crate::api::worklog::today_worklogs,

        crate::api::report::daily_report,
        crate::api::report::monthly_report,
        crate::api::report::salary_report,
        crate::api::report::worklog_report
    ),
    components(
        schemas(
            SignupReq,
            LoginReqDto,
            LoginResponse,
            LogoutReq,
            TokenPair,
            MessageResponse,
            Role,
            Employee,
            EmployeeListResponse,
            UpdateEmployee,
            UpdateSalary,
            SalaryUpdated,
            CreateTask,
            TaskRow,
            TaskListResponse,
            IdleSegment,
            WorkLog,
            NewIdleSegment,
            NewWorkLog,
            WorklogListResponse,
            TodayWorklogs,
            Earnings,
            DailySummary,
            MonthlySummary,
            SalarySummary,
            RoleSummary,
            SalaryReport,
            ReportRow,
            WorklogReport
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Signup, login, token rotation and logout"),
        (name = "Employee", description = "User and salary management APIs"),
        (name = "Task", description = "Task assignment APIs"),
        (name = "Worklog", description = "Work session storage APIs"),
        (name = "Report", description = "Earnings and payroll reports"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for path in [
            "/api/auth/signup",
            "/api/auth/login",
            "/api/auth/refresh",
            "/api/auth/logout",
            "/api/auth/employees",
            "/api/auth/employees/{id}",
            "/api/auth/employees/{id}/salary",
            "/api/tasks",
            "/api/worklogs",
            "/api/worklogs/{id}",
            "/api/worklogs/{userId}/today",
            "/api/reports/daily",
            "/api/reports/monthly",
            "/api/reports/salary",
            "/api/reports/worklogs",
        ] {
            assert!(paths.iter().any(|p| p.as_str() == path), "missing {path}");
        }
        assert!(
            doc.components
                .as_ref()
                .is_some_and(|c| c.security_schemes.contains_key("bearer_auth"))
        );
    }

    #[test]
    fn worklog_report_documents_json_and_csv() {
        use utoipa::openapi::{PathItemType, RefOr};

        let doc = ApiDoc::openapi();
        let op = doc.paths.paths["/api/reports/worklogs"]
            .operations
            .get(&PathItemType::Get)
            .expect("GET operation");
        let RefOr::T(ok) = &op.responses.responses["200"] else {
            panic!("inline 200 response expected");
        };
        assert!(ok.content.contains_key("application/json"));
        assert!(ok.content.contains_key("text/csv"));
    }
}
