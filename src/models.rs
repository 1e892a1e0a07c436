use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupReq {
    #[schema(example = "Asha")]
    pub first_name: String,
    #[schema(example = "Rao")]
    pub last_name: String,
    #[schema(example = "asha@company.com", format = "email")]
    pub email: String,
    #[schema(example = "correct horse battery staple")]
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[schema(example = 15000.0)]
    #[serde(default)]
    pub salary: Option<f64>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "asha@company.com")]
    pub email: String,
    pub password: String,
    /// When present, login fails unless the account has this role.
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Deserialize, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogoutReq {
    /// Revoked when supplied.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: String,
    pub user_id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Work log saved")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    /// email
    pub sub: String,
    pub role: u8, // role id
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
