use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::role::Role;
use crate::models::TokenType;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;

fn reject(req: ServiceRequest, message: &str) -> Result<ServiceResponse<BoxBody>, Error> {
    let resp = HttpResponse::Unauthorized().json(json!({ "message": message }));
    Ok(req.into_response(resp.map_into_boxed_body()))
}

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let header_value = match req.headers().get("Authorization") {
        Some(h) => match h.to_str() {
            Ok(v) => v.to_owned(),
            Err(_) => return reject(req, "Invalid Authorization header encoding"),
        },
        None => return reject(req, "Missing Authorization header"),
    };

    let token = match header_value.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return reject(req, "Authorization header must start with Bearer"),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected token");
            return reject(req, "Invalid or expired token");
        }
    };

    if claims.token_type != TokenType::Access {
        return reject(req, "Access token required");
    }

    let role = match Role::from_id(claims.role) {
        Some(role) => role,
        None => return reject(req, "Invalid role"),
    };

    req.extensions_mut().insert(AuthUser {
        user_id: claims.user_id,
        email: claims.sub,
        role,
    });

    next.call(req).await
}
