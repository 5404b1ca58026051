use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use validator::Validate;

pub type OwnerId = i64;

/// API token row as stored in `auth_api_token`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ApiToken {
    pub token: String,
    pub owner_id: OwnerId,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ApiToken {
    /// A token without an expiry never expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired_at(now)
    }
}

/// Values the registry hands to the store when issuing a token.
#[derive(Debug, Clone)]
pub struct NewApiToken {
    pub token: String,
    pub owner_id: OwnerId,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct IssueTokenRequest {
    pub owner_id: OwnerId,
    #[validate(length(max = 100))]
    pub label: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct TokenValidateRequest {
    #[validate(length(min = 1, max = 128))]
    pub token: String,
    /// Record usage when the token turns out to be valid.
    #[serde(default)]
    pub touch: bool,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TokenResponse {
    pub token: String,
    pub owner_id: OwnerId,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl From<&ApiToken> for TokenResponse {
    fn from(token: &ApiToken) -> Self {
        Self {
            token: token.token.clone(),
            owner_id: token.owner_id,
            label: token.label.clone(),
            created_at: token.created_at,
            expires_at: token.expires_at,
            is_active: token.is_active,
            last_used_at: token.last_used_at,
        }
    }
}

impl From<ApiToken> for TokenResponse {
    fn from(token: ApiToken) -> Self {
        Self {
            token: token.token,
            owner_id: token.owner_id,
            label: token.label,
            created_at: token.created_at,
            expires_at: token.expires_at,
            is_active: token.is_active,
            last_used_at: token.last_used_at,
        }
    }
}
