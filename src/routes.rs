use crate::{
    api::{employee, report, task, worklog},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("period and burst size are non-zero");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let prefix = config.api_prefix.trim_end_matches('/').to_string();

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let signup_limiter = Arc::new(build_limiter(config.rate_signup_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes. Registered as plain resources ahead of the protected
    // scope, which shares the `/auth` prefix.
    cfg.service(
        web::resource(format!("{prefix}/auth/signup"))
            .wrap(signup_limiter)
            .route(web::post().to(handlers::signup)),
    )
    .service(
        web::resource(format!("{prefix}/auth/login"))
            .wrap(login_limiter)
            .route(web::post().to(handlers::login)),
    )
    .service(
        web::resource(format!("{prefix}/auth/refresh"))
            .wrap(refresh_limiter)
            .route(web::post().to(handlers::refresh_token)),
    );

    // Protected routes
    cfg.service(
        web::scope(&prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/auth")
                    .service(web::resource("/logout").route(web::post().to(handlers::logout)))
                    // /auth/employees
                    .service(
                        web::resource("/employees")
                            .route(web::get().to(employee::list_employees)),
                    )
                    // /auth/employees/{id}
                    .service(
                        web::resource("/employees/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::patch().to(employee::update_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    )
                    // /auth/employees/{id}/salary
                    .service(
                        web::resource("/employees/{id}/salary")
                            .route(web::patch().to(employee::update_salary)),
                    ),
            )
            .service(
                web::resource("/tasks")
                    .route(web::get().to(task::list_tasks))
                    .route(web::post().to(task::create_task)),
            )
            .service(
                web::scope("/worklogs")
                    // /worklogs
                    .service(
                        web::resource("")
                            .route(web::get().to(worklog::list_worklogs))
                            .route(web::post().to(worklog::create_worklog)),
                    )
                    // /worklogs/{id}
                    .service(
                        web::resource("/{id}").route(web::delete().to(worklog::delete_worklog)),
                    )
                    // /worklogs/{userId}/today
                    .service(
                        web::resource("/{user_id}/today")
                            .route(web::get().to(worklog::today_worklogs)),
                    ),
            )
            .service(
                web::scope("/reports")
                    .service(web::resource("/daily").route(web::get().to(report::daily_report)))
                    .service(web::resource("/monthly").route(web::get().to(report::monthly_report)))
                    .service(web::resource("/salary").route(web::get().to(report::salary_report)))
                    .service(
                        web::resource("/worklogs").route(web::get().to(report::worklog_report)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  ├─ refresh_token (7 days)
//  └─ opens today's session

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns a new token pair, old refresh token revoked

// LOGOUT
//  └─ closes today's session, backfills a worklog if none was saved
