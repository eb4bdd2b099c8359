//! Session and user identity for an upload request.
//!
//! Authentication happens upstream; the caller forwards identity in the
//! `X-Session-Id` and `X-User-Id` headers.

use axum::{extract::FromRequestParts, http::request::Parts};
use intake_core::AppError;
use uuid::Uuid;

use crate::error::HttpAppError;

pub const SESSION_HEADER: &str = "x-session-id";
pub const USER_HEADER: &str = "x-user-id";
pub const ANONYMOUS_USER: &str = "anonymous";

const MAX_IDENTITY_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    /// Storage scope for every object written by the request
    pub session_id: String,
    pub user_id: String,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
        }
    }
}

/// Session ids become storage key segments, so only a conservative charset is accepted.
fn validate_session_id(value: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty()
        || value.len() > MAX_IDENTITY_LEN
        || !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::BadRequest(format!(
            "Invalid {} header",
            SESSION_HEADER
        )));
    }
    Ok(value.to_string())
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>, AppError> {
    parts
        .headers
        .get(name)
        .map(|v| {
            v.to_str()
                .map_err(|_| AppError::BadRequest(format!("Invalid {} header", name)))
        })
        .transpose()
}

impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session_id = match header(parts, SESSION_HEADER)? {
            Some(value) => validate_session_id(value)?,
            None => Uuid::new_v4().simple().to_string(),
        };

        let user_id = header(parts, USER_HEADER)?
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| v.chars().take(MAX_IDENTITY_LEN).collect())
            .unwrap_or_else(|| ANONYMOUS_USER.to_string());

        Ok(SessionContext {
            session_id,
            user_id,
        })
    }
}
