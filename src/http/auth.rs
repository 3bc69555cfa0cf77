//! Authenticated user extraction.
//!
//! Tokens are verified by the authenticating edge, which forwards the user
//! id in the `x-user-id` header. The user is then loaded from the store.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use super::{error::ApiError, AppState};
use crate::domain::aggregates::User;
use crate::EcommerceError;

pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Clone, Debug)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .ok_or(EcommerceError::Unauthorized)?;
        let user = state.users.find_by_id(user_id).await?.ok_or(EcommerceError::Unauthorized)?;
        Ok(Self(user))
    }
}

/// An authenticated user holding the admin flag.
#[derive(Clone, Debug)]
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(EcommerceError::Forbidden.into());
        }
        Ok(Self(user))
    }
}
