use crate::models::api_token::OwnerId;
use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use validator::Validate;

/// Session row as stored in `auth_api_session`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UserSession {
    pub session_key: String,
    pub owner_id: OwnerId,
    pub ip_address: Option<String>,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl UserSession {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired_at(now)
    }
}

#[derive(Debug, Clone)]
pub struct NewUserSession {
    pub session_key: String,
    pub owner_id: OwnerId,
    pub ip_address: Option<String>,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct OpenSessionRequest {
    pub owner_id: OwnerId,
    /// Falls back to the configured default TTL when absent.
    pub ttl_seconds: Option<i64>,
    /// Falls back to the requesting client's address when absent.
    #[validate(ip)]
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExtendSessionRequest {
    pub ttl_seconds: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct SessionValidateRequest {
    #[validate(length(min = 1, max = 128))]
    pub session_key: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct SessionResponse {
    pub session_key: String,
    pub owner_id: OwnerId,
    pub ip_address: Option<String>,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<&UserSession> for SessionResponse {
    fn from(session: &UserSession) -> Self {
        Self {
            session_key: session.session_key.clone(),
            owner_id: session.owner_id,
            ip_address: session.ip_address.clone(),
            user_agent: session.user_agent.clone(),
            created_at: session.created_at,
            updated_at: session.updated_at,
            expires_at: session.expires_at,
        }
    }
}

impl From<UserSession> for SessionResponse {
    fn from(session: UserSession) -> Self {
        Self {
            session_key: session.session_key,
            owner_id: session.owner_id,
            ip_address: session.ip_address,
            user_agent: session.user_agent,
            created_at: session.created_at,
            updated_at: session.updated_at,
            expires_at: session.expires_at,
        }
    }
}
