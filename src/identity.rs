//! Caller identity, resolved upstream of this service.
//!
//! Authentication itself is delegated to the identity provider in front of
//! the service; by the time a request arrives here the gateway has verified
//! the session and stamped the user id and role onto trusted headers. The
//! extractor below turns those headers into an explicit `Identity` value
//! that handlers pass into the engine, replacing any ambient user lookup.

use std::future::{ready, Ready};

use actix_web::{FromRequest, HttpRequest};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Teacher,
    Student,
}

impl UserRole {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "teacher" => Some(UserRole::Teacher),
            "student" => Some(UserRole::Student),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub role: UserRole,
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        ready(identity_from_request(req))
    }
}

fn identity_from_request(req: &HttpRequest) -> Result<Identity, AppError> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Missing user identity".to_string()))?;

    let role = req
        .headers()
        .get(USER_ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(UserRole::parse)
        .ok_or_else(|| AppError::Unauthorized("Missing or unknown user role".to_string()))?;

    Ok(Identity {
        user_id: user_id.to_string(),
        role,
    })
}

pub fn require_teacher(identity: &Identity) -> AppResult<()> {
    if identity.role != UserRole::Teacher {
        return Err(AppError::Forbidden(
            "Only teachers can perform this action".to_string(),
        ));
    }
    Ok(())
}

pub fn require_owner(identity: &Identity, resource_owner: &str) -> AppResult<()> {
    if identity.user_id != resource_owner {
        return Err(AppError::Forbidden(
            "You can only access your own resources".to_string(),
        ));
    }
    Ok(())
}
