#[macro_use]
mod common;

use actix_web::{http::StatusCode, test};
use chrono::Utc;
use common::{get, post_json, seed_user, setup, token};
use serde_json::{Value, json};
use worktrack::{api::worklog::day_bounds, model::role::Role};

#[actix_web::test]
async fn signup_then_login_opens_a_session() {
    let ctx = setup().await;
    let app = test_app!(ctx);

    let req = post_json(
        "/api/auth/signup",
        None,
        &json!({
            "firstName": "Asha",
            "lastName": "Rao",
            "email": "Asha@Company.com",
            "password": "hunter22",
            "salary": 15000
        }),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let user_id = body["userId"].as_i64().unwrap();

    let req = post_json(
        "/api/auth/login",
        None,
        &json!({ "email": "asha@company.com", "password": "hunter22" }),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["userId"], user_id);
    assert_eq!(body["role"], "employee");
    assert_eq!(body["name"], "Asha Rao");
    assert!(body["accessToken"].as_str().is_some());

    let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(sessions, 1);
}

#[actix_web::test]
async fn signup_rejects_duplicates_and_missing_fields() {
    let ctx = setup().await;
    let app = test_app!(ctx);
    seed_user(&ctx.pool, "Asha", "asha@company.com", Role::Employee, 0.0).await;

    let req = post_json(
        "/api/auth/signup",
        None,
        &json!({ "firstName": "A", "lastName": "R", "email": "ASHA@company.com", "password": "pw" }),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "User already exists");

    let req = post_json(
        "/api/auth/signup",
        None,
        &json!({ "firstName": "", "lastName": "R", "email": "new@company.com", "password": "pw" }),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = post_json(
        "/api/auth/signup",
        None,
        &json!({ "firstName": "N", "lastName": "R", "email": "new@company.com", "password": "pw", "salary": -1 }),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn elevated_signup_needs_an_admin_once_users_exist() {
    let ctx = setup().await;
    let app = test_app!(ctx);
    let asha = seed_user(&ctx.pool, "Asha", "asha@company.com", Role::Employee, 0.0).await;
    let admin = seed_user(&ctx.pool, "Meera", "meera@company.com", Role::Admin, 0.0).await;
    let signup = |email: &str, role: &str| {
        json!({ "firstName": "Ravi", "lastName": "Iyer", "email": email, "password": "pw1", "role": role })
    };

    let req = post_json("/api/auth/signup", None, &signup("ravi@company.com", "admin")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Only admins can create senior employee or admin accounts");

    let employee_token = token(asha, "asha@company.com", Role::Employee);
    let req = post_json(
        "/api/auth/signup",
        Some(employee_token.as_str()),
        &signup("ravi@company.com", "senior_employee"),
    )
    .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let admin_token = token(admin, "meera@company.com", Role::Admin);
    let req = post_json(
        "/api/auth/signup",
        Some(admin_token.as_str()),
        &signup("ravi@company.com", "senior_employee"),
    )
    .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    // plain employees can still sign themselves up
    let req = post_json("/api/auth/signup", None, &signup("kiran@company.com", "employee")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let role: String = sqlx::query_scalar("SELECT role FROM users WHERE email = 'ravi@company.com'")
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(role, "senior_employee");
}

#[actix_web::test]
async fn login_with_wrong_role_or_password_is_unauthorized() {
    let ctx = setup().await;
    let app = test_app!(ctx);

    // first account on an empty system may take any role
    let req = post_json(
        "/api/auth/signup",
        None,
        &json!({ "firstName": "Ravi", "lastName": "Iyer", "email": "ravi@company.com", "password": "pw1", "role": "senior_employee" }),
    )
    .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = post_json(
        "/api/auth/login",
        None,
        &json!({ "email": "ravi@company.com", "password": "pw1", "role": "admin" }),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Role mismatch");

    let req = post_json(
        "/api/auth/login",
        None,
        &json!({ "email": "ravi@company.com", "password": "wrong" }),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Invalid credentials");
}

#[actix_web::test]
async fn refresh_rotates_and_revokes_the_old_token() {
    let ctx = setup().await;
    let app = test_app!(ctx);

    let req = post_json(
        "/api/auth/signup",
        None,
        &json!({ "firstName": "Asha", "lastName": "Rao", "email": "asha@company.com", "password": "pw" }),
    )
    .to_request();
    test::call_service(&app, req).await;

    let req = post_json("/api/auth/login", None, &json!({ "email": "asha@company.com", "password": "pw" }))
        .to_request();
    let login: Value = test::call_and_read_body_json(&app, req).await;
    let refresh = login["refreshToken"].as_str().unwrap().to_string();

    let req = post_json("/api/auth/refresh", Some(refresh.as_str()), &json!({})).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let pair: Value = test::read_body_json(resp).await;
    assert_ne!(pair["refreshToken"].as_str().unwrap(), refresh);

    let req = post_json("/api/auth/refresh", Some(refresh.as_str()), &json!({})).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    // access tokens are not accepted for refresh
    let access = login["accessToken"].as_str().unwrap();
    let req = post_json("/api/auth/refresh", Some(access), &json!({})).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn protected_routes_need_an_access_token() {
    let ctx = setup().await;
    let app = test_app!(ctx);

    let req = test::TestRequest::get()
        .uri("/api/auth/employees")
        .peer_addr(common::peer())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = get("/api/auth/employees", "garbage").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn logout_backfills_one_worklog_from_the_session() {
    let ctx = setup().await;
    let app = test_app!(ctx);
    let user_id = seed_user(&ctx.pool, "Asha", "asha@company.com", Role::Employee, 15_000.0).await;
    let access = token(user_id, "asha@company.com", Role::Employee);

    // logged in at midnight so the session and its worklog share today's date
    let today = Utc::now().date_naive();
    let login_at = day_bounds(today).0;
    sqlx::query("INSERT INTO sessions (user_id, date, login_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(today)
        .bind(login_at)
        .execute(&ctx.pool)
        .await
        .unwrap();

    let elapsed = (Utc::now() - login_at).num_seconds();
    let req = post_json("/api/auth/logout", Some(access.as_str()), &json!({})).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Logged out");
    let worklog_id = body["backfilledWorklogId"].as_i64().expect("backfilled id");

    let (duration, email): (i64, String) =
        sqlx::query_as("SELECT duration, email FROM worklogs WHERE id = ?")
            .bind(worklog_id)
            .fetch_one(&ctx.pool)
            .await
            .unwrap();
    assert!((elapsed..=elapsed + 5).contains(&duration));
    assert_eq!(email, "asha@company.com");

    // a second logout the same day finds the worklog and adds nothing
    let req = post_json("/api/auth/logout", Some(access.as_str()), &json!({})).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["backfilledWorklogId"].is_null());

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM worklogs WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[actix_web::test]
async fn logout_without_session_is_fine() {
    let ctx = setup().await;
    let app = test_app!(ctx);
    let user_id = seed_user(&ctx.pool, "Asha", "asha@company.com", Role::Employee, 0.0).await;
    let access = token(user_id, "asha@company.com", Role::Employee);

    let req = post_json("/api/auth/logout", Some(access.as_str()), &json!({ "refreshToken": "bogus" })).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["backfilledWorklogId"].is_null());
}
