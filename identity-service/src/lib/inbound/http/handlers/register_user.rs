use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiJson;
use super::ApiSuccess;
use crate::domain::auth::models::PlaintextPassword;
use crate::domain::auth::models::RegisterUserPayload;
use crate::domain::auth::models::RegistrationReceipt;
use crate::inbound::http::router::AppState;

pub async fn register_user(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterUserRequest>,
) -> Result<ApiSuccess<RegisterUserResponseData>, ApiError> {
    state
        .auth_service
        .register_user(body.into_payload())
        .await
        .map_err(ApiError::from)
        .map(|ref receipt| ApiSuccess::new(StatusCode::CREATED, receipt.into()))
}

/// HTTP request body for registering a user (raw JSON)
#[derive(Clone, Deserialize)]
pub struct RegisterUserRequest {
    username: String,
    email: String,
    password: String,
}

impl RegisterUserRequest {
    fn into_payload(self) -> RegisterUserPayload {
        RegisterUserPayload {
            username: self.username,
            email: self.email,
            password: PlaintextPassword::new(self.password),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterUserResponseData {
    pub token: String,
    pub invitation_url: String,
}

impl From<&RegistrationReceipt> for RegisterUserResponseData {
    fn from(receipt: &RegistrationReceipt) -> Self {
        Self {
            token: receipt.token.as_str().to_string(),
            invitation_url: receipt.invitation_url.clone(),
        }
    }
}
