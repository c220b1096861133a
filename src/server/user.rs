//! Caller identity.
//!
//! Authentication happens upstream; the caller's id arrives in the
//! `X-User-Id` header.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use fairway_common::{Error, UserId};

use super::error::ApiError;

pub const USER_HEADER: &str = "x-user-id";

/// The user making the request.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub UserId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(ApiError(Error::Unauthorized))?;

        value
            .parse::<UserId>()
            .map(CurrentUser)
            .map_err(|_| ApiError(Error::invalid_input("X-User-Id must be a UUID")))
    }
}
