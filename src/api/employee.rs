use crate::{
    auth::auth::AuthUser,
    error::{ApiError, ApiResult},
    model::{
        role::Role,
        user::{Employee, User},
    },
    utils::{
        db_utils::{build_update_sql, execute_update},
        salary_cache::SalaryCache,
    },
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;
use utoipa::ToSchema;

/// JSON keys accepted by the profile update, with their columns.
const UPDATABLE_COLUMNS: &[(&str, &str)] = &[
    ("firstName", "first_name"),
    ("lastName", "last_name"),
    ("role", "role"),
];

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub employees: Vec<Employee>,
}

#[derive(Deserialize, ToSchema)]
#[schema(example = json!({ "firstName": "Asha", "role": "senior_employee" }))]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmployee {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<Role>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateSalary {
    #[schema(value_type = f64, example = 18000.0)]
    pub salary: Value,
}

#[derive(Serialize, ToSchema)]
pub struct SalaryUpdated {
    #[schema(example = "Salary updated")]
    pub message: String,
    #[schema(example = 18000.0)]
    pub salary: f64,
}

pub async fn fetch_employees(pool: &SqlitePool) -> Result<Vec<Employee>, sqlx::Error> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id ASC")
        .fetch_all(pool)
        .await?;
    Ok(users.into_iter().map(Employee::from).collect())
}

pub async fn fetch_employee(pool: &SqlitePool, id: i64) -> Result<Option<Employee>, sqlx::Error> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user.map(Employee::from))
}

/// List all users with their salary
#[utoipa::path(
    get,
    path = "/api/auth/employees",
    responses(
        (status = 200, description = "All users", body = EmployeeListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn list_employees(_auth: AuthUser, pool: web::Data<SqlitePool>) -> ApiResult<HttpResponse> {
    let employees = fetch_employees(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(EmployeeListResponse { employees }))
}

/// Get one user
#[utoipa::path(
    get,
    path = "/api/auth/employees/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = Employee),
        (status = 404, description = "User not found", body = crate::models::MessageResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn get_employee(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    match fetch_employee(pool.get_ref(), path.into_inner()).await? {
        Some(emp) => Ok(HttpResponse::Ok().json(emp)),
        None => Err(ApiError::not_found("Employee not found")),
    }
}

fn validate_profile_update(body: &Value) -> Result<(), ApiError> {
    let Some(obj) = body.as_object() else {
        return Err(ApiError::bad_request("Payload must be a JSON object"));
    };
    for (key, value) in obj {
        match key.as_str() {
            "firstName" | "lastName" => {
                if value.as_str().map(str::trim).unwrap_or_default().is_empty() {
                    return Err(ApiError::bad_request(format!("{key} must be a non-empty string")));
                }
            }
            "role" => {
                if value.as_str().and_then(|r| Role::from_str(r).ok()).is_none() {
                    return Err(ApiError::bad_request(
                        "role must be one of employee, senior_employee, admin",
                    ));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Update a user's name or role
#[utoipa::path(
    patch,
    path = "/api/auth/employees/{id}",
    params(("id" = i64, Path, description = "User ID")),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 400, description = "Invalid field", body = crate::models::MessageResponse),
        (status = 403, description = "Admin only", body = crate::models::MessageResponse),
        (status = 404, description = "Employee not found", body = crate::models::MessageResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    body: web::Json<Value>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let employee_id = path.into_inner();

    validate_profile_update(&body)?;
    let update = build_update_sql("users", &body, UPDATABLE_COLUMNS, "id", employee_id)?;

    let affected = execute_update(pool.get_ref(), update).await?;
    if affected == 0 {
        return Err(ApiError::not_found("Employee not found"));
    }

    info!(employee_id, updated_by = auth.user_id, "Employee updated");

    let employee = fetch_employee(pool.get_ref(), employee_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Employee not found"))?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Set a user's monthly salary
#[utoipa::path(
    patch,
    path = "/api/auth/employees/{id}/salary",
    params(("id" = i64, Path, description = "User ID")),
    request_body = UpdateSalary,
    responses(
        (status = 200, description = "Salary updated", body = SalaryUpdated),
        (status = 400, description = "Invalid salary value", body = crate::models::MessageResponse),
        (status = 403, description = "Admin only", body = crate::models::MessageResponse),
        (status = 404, description = "User not found", body = crate::models::MessageResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn update_salary(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    salaries: web::Data<SalaryCache>,
    path: web::Path<i64>,
    body: web::Json<UpdateSalary>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let employee_id = path.into_inner();

    // must be a JSON number, not a numeric string
    let salary = body
        .salary
        .as_f64()
        .filter(|s| s.is_finite() && *s >= 0.0)
        .ok_or_else(|| ApiError::bad_request("Invalid salary value"))?;

    let res = sqlx::query("UPDATE users SET salary = ? WHERE id = ?")
        .bind(salary)
        .bind(employee_id)
        .execute(pool.get_ref())
        .await?;

    if res.rows_affected() == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    // the next read goes to the database
    salaries.invalidate(employee_id).await;
    info!(employee_id, salary, updated_by = auth.user_id, "Salary updated");

    Ok(HttpResponse::Ok().json(SalaryUpdated {
        message: "Salary updated".to_string(),
        salary,
    }))
}

/// Remove a user and everything they own
#[utoipa::path(
    delete,
    path = "/api/auth/employees/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Employee removed", body = crate::models::MessageResponse),
        (status = 403, description = "Admin only", body = crate::models::MessageResponse),
        (status = 404, description = "Employee not found", body = crate::models::MessageResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    salaries: web::Data<SalaryCache>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let employee_id = path.into_inner();

    if employee_id == auth.user_id {
        return Err(ApiError::bad_request("Admins cannot remove themselves"));
    }

    let res = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(employee_id)
        .execute(pool.get_ref())
        .await?;

    if res.rows_affected() == 0 {
        return Err(ApiError::not_found("Employee not found"));
    }

    salaries.invalidate(employee_id).await;
    info!(employee_id, deleted_by = auth.user_id, "Employee removed");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee removed successfully"
    })))
}
