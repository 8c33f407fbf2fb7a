use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use crate::domain::auth::errors::AuthError;
use crate::role::errors::AccessError;
use crate::user::errors::UserError;

pub mod activate_user;
pub mod create_token;
pub mod get_user;
pub mod health;
pub mod register_user;

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<ApiResponseBody<T>>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(status, data)))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

/// Client-facing error. Each variant has a stable code.
///
/// `Internal` carries detail for the log only; clients get a generic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InvalidArgument(String),
    InvalidCredentials,
    Unauthenticated,
    DuplicateEmail,
    DuplicateUsername,
    NotFound(String),
    Forbidden,
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidArgument(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InvalidCredentials | ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::DuplicateEmail | ApiError::DuplicateUsername => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidArgument(_) => "InvalidArgument",
            ApiError::InvalidCredentials => "InvalidCredentials",
            ApiError::Unauthenticated => "Unauthenticated",
            ApiError::DuplicateEmail => "DuplicateEmail",
            ApiError::DuplicateUsername => "DuplicateUsername",
            ApiError::NotFound(_) => "NotFound",
            ApiError::Forbidden => "Forbidden",
            ApiError::Internal(_) => "Internal",
        }
    }

    fn message(self) -> String {
        match self {
            ApiError::InvalidArgument(msg) | ApiError::NotFound(msg) => msg,
            ApiError::InvalidCredentials => "Invalid email or password".to_string(),
            ApiError::Unauthenticated => "Missing, invalid or expired token".to_string(),
            ApiError::DuplicateEmail => "Email already exists".to_string(),
            ApiError::DuplicateUsername => "Username already exists".to_string(),
            ApiError::Forbidden => "Insufficient privileges".to_string(),
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                "Internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = self.message();

        (
            status,
            Json(ApiResponseBody::new_error(status, code, message)),
        )
            .into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidArgument(e) => ApiError::InvalidArgument(e.to_string()),
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::Unauthenticated => ApiError::Unauthenticated,
            AuthError::DuplicateEmail => ApiError::DuplicateEmail,
            AuthError::DuplicateUsername => ApiError::DuplicateUsername,
            AuthError::NotFound => ApiError::NotFound("Invitation not found or expired".to_string()),
            AuthError::Internal(detail) | AuthError::Configuration(detail) => {
                ApiError::Internal(detail)
            }
        }
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::InvalidUserId(e) => ApiError::InvalidArgument(e.to_string()),
            UserError::NotFound(_) => ApiError::NotFound("User not found".to_string()),
            UserError::Internal(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Forbidden => ApiError::Forbidden,
            AccessError::Internal(detail) => ApiError::Internal(detail),
        }
    }
}

/// JSON body extractor whose rejections use the API error envelope.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::JsonDataError(_) => "Request body is missing fields or has invalid ones",
            JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON",
            JsonRejection::MissingJsonContentType(_) => "Expected `Content-Type: application/json`",
            _ => "Request body could not be read",
        };
        ApiError::InvalidArgument(message.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    status_code: u16,
    data: T,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    pub fn new(status_code: StatusCode, data: T) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data,
        }
    }
}

impl ApiResponseBody<ApiErrorData> {
    pub fn new_error(status_code: StatusCode, code: &str, message: String) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data: ApiErrorData {
                code: code.to_string(),
                message,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorData {
    pub code: String,
    pub message: String,
}
