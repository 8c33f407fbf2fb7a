use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiJson;
use super::ApiSuccess;
use crate::domain::auth::models::AccessToken;
use crate::domain::auth::models::CreateTokenPayload;
use crate::domain::auth::models::PlaintextPassword;
use crate::inbound::http::router::AppState;

pub async fn create_token(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateTokenRequest>,
) -> Result<ApiSuccess<CreateTokenResponseData>, ApiError> {
    state
        .auth_service
        .create_token(body.into_payload())
        .await
        .map_err(ApiError::from)
        .map(|ref token| ApiSuccess::new(StatusCode::CREATED, token.into()))
}

#[derive(Clone, Deserialize)]
pub struct CreateTokenRequest {
    email: String,
    password: String,
}

impl CreateTokenRequest {
    fn into_payload(self) -> CreateTokenPayload {
        CreateTokenPayload {
            email: self.email,
            password: PlaintextPassword::new(self.password),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateTokenResponseData {
    pub token: String,
}

impl From<&AccessToken> for CreateTokenResponseData {
    fn from(token: &AccessToken) -> Self {
        Self {
            token: token.token.clone(),
        }
    }
}
