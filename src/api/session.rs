//! Per-day login sessions and the logout fallback that turns them into worklogs.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::{
    api::worklog::{day_bounds, insert_worklog},
    error::ApiError,
    model::session::Session,
    tracking::reconcile,
};

/// Records the first login of the day; later logins on the same day keep it.
pub async fn open_session(pool: &SqlitePool, user_id: i64, now: DateTime<Utc>) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO sessions (user_id, date, login_at)
        VALUES (?, ?, ?)
        ON CONFLICT (user_id, date) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(now.date_naive())
    .bind(now)
    .execute(pool)
    .await
    .map(|_| ())
}

pub async fn find_session(
    pool: &SqlitePool,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<Option<Session>, sqlx::Error> {
    sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE user_id = ? AND date = ?")
        .bind(user_id)
        .bind(now.date_naive())
        .fetch_optional(pool)
        .await
}

/// Stamps the logout time on today's session. When the user has no worklog
/// for today, one covering the whole session is created and its id returned.
pub async fn close_session(
    pool: &SqlitePool,
    user_id: i64,
    email: &str,
    now: DateTime<Utc>,
) -> Result<Option<i64>, ApiError> {
    let Some(mut session) = find_session(pool, user_id, now).await? else {
        debug!(user_id, "No session to close");
        return Ok(None);
    };

    let duration = reconcile::session_duration(&session, now);
    sqlx::query("UPDATE sessions SET logout_at = ?, duration = ? WHERE id = ?")
        .bind(now)
        .bind(duration)
        .bind(session.id)
        .execute(pool)
        .await?;
    session.logout_at = Some(now);
    session.duration = Some(duration);

    let (from, to) = day_bounds(session.date);
    let logged_today = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM worklogs WHERE user_id = ? AND start_time >= ? AND start_time < ?",
    )
    .bind(user_id)
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await?;

    if logged_today > 0 {
        return Ok(None);
    }

    let Some(new_log) = reconcile::worklog_from_session(&session) else {
        return Ok(None);
    };
    let log = insert_worklog(pool, user_id, email, &reconcile::normalize(&new_log)?).await?;

    info!(user_id, worklog_id = log.id, duration = log.duration, "Backfilled worklog from session");
    Ok(Some(log.id))
}
