use crate::models::api_token::{ApiToken, OwnerId};
use crate::models::session::UserSession;
use crate::util::key_prefix;
use chrono::{DateTime, Utc};
use rocket::serde::Serialize;
use schemars::JsonSchema;

/// Filters for the token listing. `None` means "don't filter on this".
#[derive(Debug, Clone, Default)]
pub struct TokenListFilter {
    pub owner_id: Option<OwnerId>,
    pub active: Option<bool>,
    pub expired: Option<bool>,
    /// Case-insensitive substring match on the label. Token values are never searchable.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionListFilter {
    pub owner_id: Option<OwnerId>,
    pub expired: Option<bool>,
    /// Case-insensitive substring match on IP address or user agent.
    pub search: Option<String>,
}

/// One token in a listing. Only a prefix of the bearer value is exposed.
#[derive(Debug, Serialize, JsonSchema)]
pub struct TokenReportRow {
    pub token_prefix: String,
    pub owner_id: OwnerId,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub is_expired: bool,
    pub is_valid: bool,
}

impl TokenReportRow {
    pub fn at(token: &ApiToken, now: DateTime<Utc>) -> Self {
        Self {
            token_prefix: key_prefix(&token.token).to_string(),
            owner_id: token.owner_id,
            label: token.label.clone(),
            created_at: token.created_at,
            expires_at: token.expires_at,
            is_active: token.is_active,
            last_used_at: token.last_used_at,
            is_expired: token.is_expired_at(now),
            is_valid: token.is_valid_at(now),
        }
    }
}

/// One session in a listing. The session key is a bearer value too, so it is cut to a prefix.
#[derive(Debug, Serialize, JsonSchema)]
pub struct SessionReportRow {
    pub session_key_prefix: String,
    pub owner_id: OwnerId,
    pub ip_address: Option<String>,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_expired: bool,
}

impl SessionReportRow {
    pub fn at(session: &UserSession, now: DateTime<Utc>) -> Self {
        Self {
            session_key_prefix: key_prefix(&session.session_key).to_string(),
            owner_id: session.owner_id,
            ip_address: session.ip_address.clone(),
            user_agent: session.user_agent.clone(),
            created_at: session.created_at,
            updated_at: session.updated_at,
            expires_at: session.expires_at,
            is_expired: session.is_expired_at(now),
        }
    }
}

/// Counts removed by an owner purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
pub struct OwnerPurgeResponse {
    pub tokens_deleted: u64,
    pub sessions_deleted: u64,
}
