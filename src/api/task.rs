use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::auth::AuthUser,
    error::{ApiError, ApiResult},
    model::{role::Role, task::TaskRow},
};

const TASK_SELECT: &str = r#"
    SELECT
        t.id,
        t.description,
        t.assigned_by,
        TRIM(b.first_name || ' ' || b.last_name) AS assigned_by_name,
        b.email AS assigned_by_email,
        t.assigned_to,
        TRIM(a.first_name || ' ' || a.last_name) AS assigned_to_name,
        a.email AS assigned_to_email,
        t.created_at
    FROM tasks t
    JOIN users b ON b.id = t.assigned_by
    JOIN users a ON a.id = t.assigned_to
"#;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    #[schema(example = "Prepare the weekly report")]
    pub description: String,
    #[schema(example = 2)]
    pub assigned_to: i64,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TaskQuery {
    /// Seniors and admins only; employees always get their own tasks
    pub assigned_to: Option<i64>,
}

#[derive(Serialize, ToSchema)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskRow>,
}

async fn fetch_task(pool: &SqlitePool, id: i64) -> Result<Option<TaskRow>, sqlx::Error> {
    sqlx::query_as::<_, TaskRow>(&format!("{TASK_SELECT} WHERE t.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Assign a task to an employee
#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = CreateTask,
    responses(
        (status = 201, description = "Task created", body = Object, example = json!({
            "message": "Task created",
            "task": {
                "id": 1, "description": "Prepare the weekly report",
                "assignedBy": 3, "assignedByName": "Ravi Iyer", "assignedByEmail": "ravi@company.com",
                "assignedTo": 2, "assignedToName": "Asha Rao", "assignedToEmail": "asha@company.com",
                "createdAt": "2025-03-03T09:00:00Z"
            }
        })),
        (status = 400, description = "Missing description or unknown assignee", body = crate::models::MessageResponse),
        (status = 403, description = "Senior employee/Admin only", body = crate::models::MessageResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Task"
)]
pub async fn create_task(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<CreateTask>,
) -> ApiResult<HttpResponse> {
    auth.require_senior_or_admin()?;

    let description = payload.description.trim();
    if description.is_empty() {
        return Err(ApiError::bad_request("All fields are required"));
    }

    let assignee_exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE id = ?")
        .bind(payload.assigned_to)
        .fetch_one(pool.get_ref())
        .await?
        > 0;
    if !assignee_exists {
        return Err(ApiError::bad_request("Assignee does not exist"));
    }

    let id = sqlx::query(
        "INSERT INTO tasks (description, assigned_by, assigned_to, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(description)
    .bind(auth.user_id)
    .bind(payload.assigned_to)
    .bind(Utc::now())
    .execute(pool.get_ref())
    .await?
    .last_insert_rowid();

    let task = fetch_task(pool.get_ref(), id)
        .await?
        .ok_or(ApiError::Internal)?;

    info!(task_id = id, assigned_by = auth.user_id, assigned_to = payload.assigned_to, "Task created");

    Ok(HttpResponse::Created().json(json!({
        "message": "Task created",
        "task": task
    })))
}

/// List tasks
#[utoipa::path(
    get,
    path = "/api/tasks",
    params(TaskQuery),
    responses(
        (status = 200, description = "Tasks, newest first", body = TaskListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Task"
)]
pub async fn list_tasks(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<TaskQuery>,
) -> ApiResult<HttpResponse> {
    let assigned_to = match auth.role {
        Role::Employee => Some(auth.user_id),
        Role::SeniorEmployee | Role::Admin => query.assigned_to,
    };

    let tasks = match assigned_to {
        Some(user_id) => {
            sqlx::query_as::<_, TaskRow>(&format!(
                "{TASK_SELECT} WHERE t.assigned_to = ? ORDER BY t.created_at DESC, t.id DESC"
            ))
            .bind(user_id)
            .fetch_all(pool.get_ref())
            .await?
        }
        None => {
            sqlx::query_as::<_, TaskRow>(&format!("{TASK_SELECT} ORDER BY t.created_at DESC, t.id DESC"))
                .fetch_all(pool.get_ref())
                .await?
        }
    };

    Ok(HttpResponse::Ok().json(TaskListResponse { tasks }))
}
