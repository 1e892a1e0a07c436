#![allow(dead_code, unused_macros)]
use std::net::SocketAddr;

use actix_web::test::TestRequest;
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use worktrack::{
    auth::jwt::generate_access_token, config::Config, db::init_memory_db, model::role::Role,
    utils::salary_cache::SalaryCache,
};

pub const SECRET: &str = "test-secret";

pub struct TestCtx {
    pub pool: SqlitePool,
    pub config: Config,
    pub salaries: SalaryCache,
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: SECRET.to_string(),
        server_addr: "127.0.0.1:0".to_string(),
        access_token_ttl: 900,
        refresh_token_ttl: 3600,
        rate_login_per_min: 10_000,
        rate_signup_per_min: 10_000,
        rate_refresh_per_min: 10_000,
        rate_protected_per_min: 10_000,
        api_prefix: "/api".to_string(),
        log_dir: "logs".to_string(),
        log_level: "debug".to_string(),
        default_salary: 0.0,
    }
}

pub async fn setup() -> TestCtx {
    TestCtx {
        pool: init_memory_db().await.expect("in-memory db"),
        config: test_config(),
        salaries: SalaryCache::default(),
    }
}

/// Builds the full service the same way `main` does, minus logging and docs.
macro_rules! test_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($ctx.pool.clone()))
                .app_data(actix_web::web::Data::new($ctx.config.clone()))
                .app_data(actix_web::web::Data::new($ctx.salaries.clone()))
                .configure(|cfg| worktrack::routes::configure(cfg, $ctx.config.clone())),
        )
        .await
    };
}

/// Inserts a user directly. The stored password is not a valid hash, so these
/// accounts cannot log in; use the signup endpoint for that.
pub async fn seed_user(pool: &SqlitePool, first_name: &str, email: &str, role: Role, salary: f64) -> i64 {
    sqlx::query(
        "INSERT INTO users (first_name, last_name, email, password, role, salary, created_at)
         VALUES (?, 'Test', ?, 'not-a-hash', ?, ?, ?)",
    )
    .bind(first_name)
    .bind(email)
    .bind(role.as_ref())
    .bind(salary)
    .bind(Utc::now())
    .execute(pool)
    .await
    .expect("seed user")
    .last_insert_rowid()
}

pub fn token(user_id: i64, email: &str, role: Role) -> String {
    generate_access_token(user_id, email, role, SECRET, 900).expect("sign token")
}

pub fn peer() -> SocketAddr {
    "127.0.0.1:40000".parse().expect("socket addr")
}

fn with_auth(req: TestRequest, token: Option<&str>) -> TestRequest {
    let req = req.peer_addr(peer());
    match token {
        Some(t) => req.insert_header(("Authorization", format!("Bearer {t}"))),
        None => req,
    }
}

pub fn get(uri: &str, token: &str) -> TestRequest {
    with_auth(TestRequest::get().uri(uri), Some(token))
}

pub fn delete(uri: &str, token: &str) -> TestRequest {
    with_auth(TestRequest::delete().uri(uri), Some(token))
}

pub fn post_json<T: Serialize>(uri: &str, token: Option<&str>, body: &T) -> TestRequest {
    with_auth(TestRequest::post().uri(uri), token).set_json(body)
}

pub fn patch_json<T: Serialize>(uri: &str, token: &str, body: &T) -> TestRequest {
    with_auth(TestRequest::patch().uri(uri), Some(token)).set_json(body)
}
