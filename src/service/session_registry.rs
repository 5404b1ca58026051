use crate::clock::{Clock, stored_precision};
use crate::config::SessionConfig;
use crate::database::session::SessionStore;
use crate::error::app_error::AppError;
use crate::models::api_token::OwnerId;
use crate::models::session::{NewUserSession, UserSession};
use crate::models::validation::{InvalidReason, ValidationResult};
use crate::util::{generate_opaque_key, key_prefix};
use chrono::{DateTime, Duration, Utc};
use std::net::IpAddr;
use tracing::{info, warn};

/// Opens, extends and revokes user sessions and evaluates their expiry.
///
/// A session is `Active` while `now <= expires_at` and `Expired` afterwards.
/// `extend` may move an expired session back to `Active`; `revoke` deletes it.
pub struct SessionRegistry<'a, S: SessionStore, C: Clock> {
    store: &'a S,
    clock: &'a C,
    max_attempts: u32,
    generate_key: fn() -> String,
}

impl<'a, S: SessionStore, C: Clock> SessionRegistry<'a, S, C> {
    pub fn new(store: &'a S, clock: &'a C, config: &SessionConfig) -> Self {
        SessionRegistry {
            store,
            clock,
            max_attempts: config.max_open_attempts.max(2),
            generate_key: generate_opaque_key,
        }
    }

    #[cfg(test)]
    fn with_key_generator(mut self, generate_key: fn() -> String) -> Self {
        self.generate_key = generate_key;
        self
    }

    pub async fn open(&self, owner_id: OwnerId, ttl: Duration, ip_address: Option<&str>, user_agent: Option<&str>) -> Result<UserSession, AppError> {
        let ip_address = ip_address.map(normalize_ip).transpose()?;
        let now = stored_precision(self.clock.now());
        let expires_at = expiry_after(now, ttl)?;

        for attempt in 1..=self.max_attempts {
            let candidate = NewUserSession {
                session_key: (self.generate_key)(),
                owner_id,
                ip_address: ip_address.clone(),
                user_agent: user_agent.unwrap_or_default().to_string(),
                created_at: now,
                expires_at,
            };

            match self.store.insert_session(&candidate).await {
                Ok(session) => {
                    info!(owner_id, session = key_prefix(&session.session_key), expires_at = %session.expires_at, "session opened");
                    return Ok(session);
                }
                Err(err) if err.is_unique_violation() => {
                    warn!(owner_id, attempt, max_attempts = self.max_attempts, "generated session key collided, regenerating");
                }
                Err(err) => return Err(err),
            }
        }

        Err(AppError::Conflict(format!(
            "could not generate a unique session key after {} attempts",
            self.max_attempts
        )))
    }

    pub async fn lookup(&self, session_key: &str) -> Result<UserSession, AppError> {
        self.store
            .find_session(session_key)
            .await?
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))
    }

    pub async fn validate(&self, session_key: &str) -> Result<ValidationResult<UserSession>, AppError> {
        let now = self.clock.now();
        let result = match self.store.find_session(session_key).await? {
            None => ValidationResult::not_found(),
            Some(session) if !session.is_valid_at(now) => ValidationResult::invalid(session, InvalidReason::Expired),
            Some(session) => ValidationResult::valid(session),
        };

        Ok(result)
    }

    /// Push the expiry to `now + ttl`. Works on expired sessions too.
    pub async fn extend(&self, session_key: &str, ttl: Duration) -> Result<UserSession, AppError> {
        let now = stored_precision(self.clock.now());
        let expires_at = expiry_after(now, ttl)?;

        let session = self
            .store
            .set_session_expiry(session_key, expires_at, now)
            .await?
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

        info!(session = key_prefix(session_key), expires_at = %expires_at, "session extended");
        Ok(session)
    }

    pub async fn revoke(&self, session_key: &str) -> Result<(), AppError> {
        if self.store.delete_session(session_key).await? {
            info!(session = key_prefix(session_key), "session revoked");
            Ok(())
        } else {
            Err(AppError::NotFound("Session not found".to_string()))
        }
    }

    /// Delete every session that expired before now.
    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        let now = self.clock.now();
        let deleted = self.store.delete_expired_sessions(now).await?;
        info!(deleted, "expired sessions purged");
        Ok(deleted)
    }
}

fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, AppError> {
    if ttl <= Duration::zero() {
        return Err(AppError::InvalidArgument("ttl must be a positive duration".to_string()));
    }

    now.checked_add_signed(ttl)
        .ok_or_else(|| AppError::InvalidArgument("ttl is too large".to_string()))
}

fn normalize_ip(raw: &str) -> Result<String, AppError> {
    raw.trim()
        .parse::<IpAddr>()
        .map(|ip| ip.to_string())
        .map_err(|_| AppError::InvalidArgument(format!("invalid IP address: {raw}")))
}
