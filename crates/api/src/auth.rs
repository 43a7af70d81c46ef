//! Caller identity taken from headers set by the authenticating gateway.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use common::UserId;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Customer,
    Admin,
}

/// Any authenticated caller.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: UserId,
    pub role: Role,
}

/// An authenticated caller holding the admin role.
#[derive(Debug, Clone)]
pub struct AdminCaller(pub Caller);

impl Caller {
    fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
        let user_id = headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Missing caller identity".to_string()))?;

        let role = match headers.get(USER_ROLE_HEADER).and_then(|v| v.to_str().ok()) {
            Some(role) if role.trim().eq_ignore_ascii_case("admin") => Role::Admin,
            _ => Role::Customer,
        };

        Ok(Self {
            user_id: UserId::new(user_id),
            role,
        })
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Caller::from_headers(&parts.headers)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AdminCaller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let caller = Caller::from_headers(&parts.headers)?;
        if caller.role != Role::Admin {
            tracing::warn!(user_id = %caller.user_id, "admin route refused");
            return Err(ApiError::Forbidden("Admin access required".to_string()));
        }
        Ok(AdminCaller(caller))
    }
}
