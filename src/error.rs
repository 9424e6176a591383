use std::collections::BTreeMap;

use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::authoring::AuthoringError;
use crate::contact::ContactError;
use crate::identity::{AuthError, AuthErrorKind};
use crate::profile::ProfileError;
use crate::repo::RepoError;
use crate::storage::ObjectStoreError;

/// Per-field validation messages, surfaced inline next to each form field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self { Self::default() }
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn get(&self, field: &str) -> Option<&str> { self.0.get(field).map(String::as_str) }
    pub fn contains(&self, field: &str) -> bool { self.0.contains_key(field) }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error("forbidden")] Forbidden(String),
    #[error("unauthorized")] Unauthorized,
    #[error("bad request")] BadRequest(String),
    #[error("validation")] Validation(FieldErrors),
    #[error("auth")] Auth { kind: AuthErrorKind, message: String },
    #[error("rate limited")] RateLimited,
    #[error("internal error")] Internal,
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => ApiError::NotFound,
            RepoError::Conflict => ApiError::Conflict,
            RepoError::Internal(msg) => {
                log::error!("repository failure: {msg}");
                ApiError::Internal
            }
        }
    }
}

impl From<ObjectStoreError> for ApiError {
    fn from(e: ObjectStoreError) -> Self {
        log::error!("object store failure: {e}");
        ApiError::Internal
    }
}

impl From<FieldErrors> for ApiError {
    fn from(e: FieldErrors) -> Self { ApiError::Validation(e) }
}

impl ApiError {
    /// Auth failure carrying the message already resolved for the action.
    pub fn auth(err: &AuthError, message: String) -> Self {
        ApiError::Auth { kind: err.kind, message }
    }
}

impl From<AuthoringError> for ApiError {
    fn from(e: AuthoringError) -> Self {
        match e {
            AuthoringError::Invalid(fields) => ApiError::Validation(fields),
            AuthoringError::Unauthenticated => ApiError::Unauthorized,
            AuthoringError::NotAuthor => ApiError::Forbidden(e.to_string()),
            AuthoringError::NotFound => ApiError::NotFound,
            AuthoringError::Upload(inner) => inner.into(),
            AuthoringError::Repo(inner) => inner.into(),
        }
    }
}

impl From<ContactError> for ApiError {
    fn from(e: ContactError) -> Self {
        match e {
            ContactError::Invalid(fields) => ApiError::Validation(fields),
            ContactError::Repo(inner) => inner.into(),
        }
    }
}

impl From<ProfileError> for ApiError {
    fn from(e: ProfileError) -> Self {
        match e {
            ProfileError::Invalid(fields) => ApiError::Validation(fields),
            ProfileError::Upload(inner) => inner.into(),
            ProfileError::Repo(inner) => inner.into(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Auth { kind: AuthErrorKind::TooManyRequests, .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Auth { .. } => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::Forbidden(msg) | ApiError::BadRequest(msg) => ApiErrorBody {
                error: self.to_string(),
                message: Some(msg.clone()),
                fields: None,
            },
            ApiError::Unauthorized => ApiErrorBody {
                error: self.to_string(),
                message: Some("sign-in required".into()),
                fields: None,
            },
            ApiError::Validation(fields) => ApiErrorBody {
                error: self.to_string(),
                message: None,
                fields: Some(fields.clone()),
            },
            ApiError::Auth { kind, message } => ApiErrorBody {
                error: kind.code().to_string(),
                message: Some(message.clone()),
                fields: None,
            },
            _ => ApiErrorBody { error: self.to_string(), message: None, fields: None },
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
