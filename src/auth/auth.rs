use crate::{
    config::Config,
    error::ApiError,
    model::role::Role,
    models::TokenType,
};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

use super::jwt::verify_token;

/// Caller identity, taken from a verified access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
    pub role: Role,
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by auth_middleware on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, ApiError> {
    let token = bearer_token(req).ok_or_else(|| ApiError::unauthorized("Missing token"))?;

    let config = req
        .app_data::<Data<Config>>()
        .ok_or(ApiError::Internal)?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| ApiError::unauthorized("Invalid token"))?;

    if claims.token_type != TokenType::Access {
        return Err(ApiError::unauthorized("Invalid token"));
    }

    let role = Role::from_id(claims.role).ok_or_else(|| ApiError::unauthorized("Invalid role"))?;

    Ok(AuthUser {
        user_id: claims.user_id,
        email: claims.sub,
        role,
    })
}

pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Admin only"))
        }
    }

    pub fn require_senior_or_admin(&self) -> Result<(), ApiError> {
        if matches!(self.role, Role::Admin | Role::SeniorEmployee) {
            Ok(())
        } else {
            Err(ApiError::forbidden("Senior employee/Admin only"))
        }
    }

    /// Users may read their own records; admins may read anyone's.
    pub fn require_self_or_admin(&self, user_id: i64) -> Result<(), ApiError> {
        if self.user_id == user_id || self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Not allowed to access another user's records"))
        }
    }
}
