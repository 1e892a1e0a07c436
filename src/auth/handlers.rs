use crate::{
    api::session,
    auth::{
        auth::{AuthUser, bearer_token},
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::{ApiError, ApiResult, is_unique_violation},
    model::{role::Role, user::User},
    models::{Claims, LoginReqDto, LoginResponse, LogoutReq, SignupReq, TokenPair, TokenType},
};
use actix_web::{HttpRequest, HttpResponse, web};
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, error, info, instrument};

fn token_error(e: jsonwebtoken::errors::Error) -> ApiError {
    error!(error = %e, "Failed to sign token");
    ApiError::Internal
}

fn expiry(claims: &Claims) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(claims.exp as i64, 0).unwrap_or_else(Utc::now)
}

async fn store_refresh_token(pool: &SqlitePool, claims: &Claims) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO refresh_tokens (user_id, jti, expires_at) VALUES (?, ?, ?)")
        .bind(claims.user_id)
        .bind(&claims.jti)
        .bind(expiry(claims))
        .execute(pool)
        .await
        .map(|_| ())
}

fn validate_signup(req: &SignupReq) -> Result<(), ApiError> {
    if req.first_name.trim().is_empty()
        || req.last_name.trim().is_empty()
        || req.email.trim().is_empty()
        || req.password.is_empty()
    {
        return Err(ApiError::bad_request("All fields are required"));
    }
    if !req.email.contains('@') {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    if let Some(salary) = req.salary {
        if !salary.is_finite() || salary < 0.0 {
            return Err(ApiError::bad_request("Invalid salary value"));
        }
    }
    Ok(())
}

/// Create an account
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupReq,
    responses(
        (status = 201, description = "User created", body = Object, example = json!({
            "message": "User created successfully",
            "userId": 1
        })),
        (status = 400, description = "Missing or invalid fields", body = crate::models::MessageResponse),
        (status = 403, description = "Elevated role requested without an admin token", body = crate::models::MessageResponse),
        (status = 409, description = "Email already registered", body = crate::models::MessageResponse)
    ),
    security((), ("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn signup(
    auth: Option<AuthUser>,
    user: web::Json<SignupReq>,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> ApiResult<HttpResponse> {
    validate_signup(&user)?;

    let email = user.email.trim().to_lowercase();
    let role = user.role.unwrap_or_default();

    // senior and admin accounts come from an admin, except the very first user
    if role != Role::Employee && !auth.as_ref().is_some_and(AuthUser::is_admin) {
        let has_users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(pool.get_ref())
            .await?
            > 0;
        if has_users {
            debug!(role = %role, "Elevated signup refused");
            return Err(ApiError::forbidden("Only admins can create senior employee or admin accounts"));
        }
    }
    let salary = user.salary.unwrap_or(config.default_salary);

    let hashed = hash_password(&user.password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        ApiError::Internal
    })?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (first_name, last_name, email, password, role, salary, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.first_name.trim())
    .bind(user.last_name.trim())
    .bind(&email)
    .bind(&hashed)
    .bind(role.as_ref())
    .bind(salary)
    .bind(Utc::now())
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) => {
            let user_id = res.last_insert_rowid();
            info!(user_id, role = %role, "User registered");
            Ok(HttpResponse::Created().json(json!({
                "message": "User created successfully",
                "userId": user_id
            })))
        }
        Err(e) if is_unique_violation(&e) => Err(ApiError::conflict("User already exists")),
        Err(e) => Err(e.into()),
    }
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Email and password required", body = crate::models::MessageResponse),
        (status = 401, description = "Invalid credentials or role mismatch", body = crate::models::MessageResponse)
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(email = %user.email)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> ApiResult<HttpResponse> {
    info!("Login request received");

    if user.email.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty email or password");
        return Err(ApiError::bad_request("Email and password required"));
    }

    debug!("Fetching user from database");

    let db_user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(user.email.trim())
        .fetch_optional(pool.get_ref())
        .await?;

    let db_user = match db_user {
        Some(u) => {
            debug!(user_id = u.id, "User found");
            u
        }
        None => {
            info!("Invalid credentials: user not found");
            return Err(ApiError::unauthorized("Invalid credentials"));
        }
    };

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let role = db_user.role();
    if let Some(expected) = user.role {
        if expected != role {
            info!(expected = %expected, actual = %role, "Role mismatch");
            return Err(ApiError::unauthorized("Role mismatch"));
        }
    }

    let access_token = generate_access_token(
        db_user.id,
        &db_user.email,
        role,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(token_error)?;

    let (refresh_token, refresh_claims) = generate_refresh_token(
        db_user.id,
        &db_user.email,
        role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(token_error)?;

    debug!(jti = %refresh_claims.jti, "Storing refresh token");
    store_refresh_token(pool.get_ref(), &refresh_claims).await?;

    let now = Utc::now();

    // bookkeeping below must not fail the login
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
        .bind(now)
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }

    if let Err(e) = session::open_session(pool.get_ref(), db_user.id, now).await {
        error!(error = %e, "Failed to open session");
    }

    info!("Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        message: "Login successful".to_string(),
        user_id: db_user.id,
        name: db_user.full_name(),
        email: db_user.email,
        role,
        access_token,
        refresh_token,
    }))
}

/// Rotate a refresh token
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Missing, invalid or revoked refresh token", body = crate::models::MessageResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> ApiResult<HttpResponse> {
    let token = bearer_token(&req).ok_or_else(|| ApiError::unauthorized("No token"))?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| ApiError::unauthorized("Invalid token"))?;

    if claims.token_type != TokenType::Refresh {
        return Err(ApiError::unauthorized("Refresh token required"));
    }

    let record = sqlx::query_as::<_, (i64, i64, bool)>(
        "SELECT id, user_id, revoked FROM refresh_tokens WHERE jti = ?",
    )
    .bind(&claims.jti)
    .fetch_optional(pool.get_ref())
    .await?;

    let (record_id, user_id) = match record {
        Some((id, user_id, false)) => (id, user_id),
        _ => return Err(ApiError::unauthorized("Refresh token revoked")),
    };

    // the role may have changed since the token was issued
    let role = sqlx::query_scalar::<_, String>("SELECT role FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool.get_ref())
        .await?
        .and_then(|r| r.parse::<Role>().ok())
        .ok_or_else(|| ApiError::unauthorized("User no longer exists"))?;

    sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE id = ?")
        .bind(record_id)
        .execute(pool.get_ref())
        .await?;

    let (new_refresh_token, new_claims) = generate_refresh_token(
        user_id,
        &claims.sub,
        role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(token_error)?;
    store_refresh_token(pool.get_ref(), &new_claims).await?;

    let access_token = generate_access_token(
        user_id,
        &claims.sub,
        role,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(token_error)?;

    Ok(HttpResponse::Ok().json(TokenPair {
        access_token,
        refresh_token: new_refresh_token,
    }))
}

/// Log out: close today's session, backfill a worklog if none was logged
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    request_body(content = LogoutReq, description = "Optional refresh token to revoke"),
    responses(
        (status = 200, description = "Logged out", body = Object, example = json!({
            "message": "Logged out",
            "backfilledWorklogId": 12
        })),
        (status = 401, description = "Unauthorized", body = crate::models::MessageResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    auth: AuthUser,
    body: Option<web::Json<LogoutReq>>,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> ApiResult<HttpResponse> {
    if let Some(token) = body.and_then(|b| b.into_inner().refresh_token) {
        match verify_token(&token, &config.jwt_secret) {
            Ok(claims) if claims.token_type == TokenType::Refresh && claims.user_id == auth.user_id => {
                // idempotent
                sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
                    .bind(&claims.jti)
                    .execute(pool.get_ref())
                    .await?;
            }
            _ => debug!(user_id = auth.user_id, "Ignoring invalid refresh token on logout"),
        }
    }

    let backfilled =
        session::close_session(pool.get_ref(), auth.user_id, &auth.email, Utc::now()).await?;

    info!(user_id = auth.user_id, backfilled = ?backfilled, "User logged out");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Logged out",
        "backfilledWorklogId": backfilled
    })))
}
