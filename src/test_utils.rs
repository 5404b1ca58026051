use crate::clock::Clock;
use crate::database::api_token::TokenStore;
use crate::database::session::SessionStore;
use crate::error::app_error::AppError;
use crate::models::api_token::{ApiToken, NewApiToken, OwnerId};
use crate::models::pagination::PaginationParams;
use crate::models::report::{SessionListFilter, TokenListFilter};
use crate::models::session::{NewUserSession, UserSession};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use tokio::sync::Mutex;

/// Clock that only moves when a test tells it to.
pub struct MockClock {
    current: StdMutex<DateTime<Utc>>,
}

impl MockClock {
    pub fn new(initial: DateTime<Utc>) -> Self {
        Self {
            current: StdMutex::new(initial),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock().unwrap();
        *current += by;
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.current.lock().unwrap() = instant;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new(Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap())
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap()
    }
}

/// Store that keeps rows in memory and enforces key uniqueness like the real tables.
#[derive(Default)]
pub struct InMemoryRepository {
    tokens: Mutex<HashMap<String, ApiToken>>,
    sessions: Mutex<HashMap<String, UserSession>>,
}

impl InMemoryRepository {
    pub async fn token_count(&self) -> usize {
        self.tokens.lock().await.len()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn paginate<T>(mut rows: Vec<T>, pagination: &PaginationParams) -> Vec<T> {
    let offset = pagination.offset() as usize;
    let limit = pagination.effective_limit() as usize;
    if offset >= rows.len() {
        return Vec::new();
    }
    rows.drain(offset..).take(limit).collect()
}

#[async_trait::async_trait]
impl TokenStore for InMemoryRepository {
    async fn insert_token(&self, token: &NewApiToken) -> Result<ApiToken, AppError> {
        let mut tokens = self.tokens.lock().await;
        if tokens.contains_key(&token.token) {
            return Err(AppError::UniqueViolation {
                constraint: "auth_api_token_pkey".to_string(),
            });
        }

        let row = ApiToken {
            token: token.token.clone(),
            owner_id: token.owner_id,
            label: token.label.clone(),
            created_at: token.created_at,
            expires_at: token.expires_at,
            is_active: true,
            last_used_at: None,
        };
        tokens.insert(row.token.clone(), row.clone());
        Ok(row)
    }

    async fn find_token(&self, token: &str) -> Result<Option<ApiToken>, AppError> {
        Ok(self.tokens.lock().await.get(token).cloned())
    }

    async fn set_token_active(&self, token: &str, is_active: bool) -> Result<bool, AppError> {
        let mut tokens = self.tokens.lock().await;
        Ok(tokens.get_mut(token).map(|row| row.is_active = is_active).is_some())
    }

    async fn set_token_last_used(&self, token: &str, used_at: DateTime<Utc>) -> Result<bool, AppError> {
        let mut tokens = self.tokens.lock().await;
        Ok(tokens.get_mut(token).map(|row| row.last_used_at = Some(used_at)).is_some())
    }

    async fn delete_token(&self, token: &str) -> Result<bool, AppError> {
        Ok(self.tokens.lock().await.remove(token).is_some())
    }

    async fn delete_tokens_for_owner(&self, owner_id: OwnerId) -> Result<u64, AppError> {
        let mut tokens = self.tokens.lock().await;
        let before = tokens.len();
        tokens.retain(|_, row| row.owner_id != owner_id);
        Ok((before - tokens.len()) as u64)
    }

    async fn list_tokens(&self, filter: &TokenListFilter, now: DateTime<Utc>, pagination: &PaginationParams) -> Result<(Vec<ApiToken>, i64), AppError> {
        let tokens = self.tokens.lock().await;
        let search = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let mut rows: Vec<ApiToken> = tokens
            .values()
            .filter(|row| filter.owner_id.is_none_or(|owner_id| row.owner_id == owner_id))
            .filter(|row| filter.active.is_none_or(|active| row.is_active == active))
            .filter(|row| filter.expired.is_none_or(|expired| row.is_expired_at(now) == expired))
            .filter(|row| search.is_none_or(|needle| contains_ci(&row.label, needle)))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.token.cmp(&b.token)));

        let total = rows.len() as i64;
        Ok((paginate(rows, pagination), total))
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemoryRepository {
    async fn insert_session(&self, session: &NewUserSession) -> Result<UserSession, AppError> {
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(&session.session_key) {
            return Err(AppError::UniqueViolation {
                constraint: "auth_api_session_pkey".to_string(),
            });
        }

        let row = UserSession {
            session_key: session.session_key.clone(),
            owner_id: session.owner_id,
            ip_address: session.ip_address.clone(),
            user_agent: session.user_agent.clone(),
            created_at: session.created_at,
            updated_at: session.created_at,
            expires_at: session.expires_at,
        };
        sessions.insert(row.session_key.clone(), row.clone());
        Ok(row)
    }

    async fn find_session(&self, session_key: &str) -> Result<Option<UserSession>, AppError> {
        Ok(self.sessions.lock().await.get(session_key).cloned())
    }

    async fn set_session_expiry(&self, session_key: &str, expires_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Result<Option<UserSession>, AppError> {
        let mut sessions = self.sessions.lock().await;
        Ok(sessions.get_mut(session_key).map(|row| {
            row.expires_at = expires_at;
            row.updated_at = updated_at;
            row.clone()
        }))
    }

    async fn delete_session(&self, session_key: &str) -> Result<bool, AppError> {
        Ok(self.sessions.lock().await.remove(session_key).is_some())
    }

    async fn delete_sessions_for_owner(&self, owner_id: OwnerId) -> Result<u64, AppError> {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, row| row.owner_id != owner_id);
        Ok((before - sessions.len()) as u64)
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, row| row.expires_at >= now);
        Ok((before - sessions.len()) as u64)
    }

    async fn list_sessions(&self, filter: &SessionListFilter, now: DateTime<Utc>, pagination: &PaginationParams) -> Result<(Vec<UserSession>, i64), AppError> {
        let sessions = self.sessions.lock().await;
        let search = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let mut rows: Vec<UserSession> = sessions
            .values()
            .filter(|row| filter.owner_id.is_none_or(|owner_id| row.owner_id == owner_id))
            .filter(|row| filter.expired.is_none_or(|expired| row.is_expired_at(now) == expired))
            .filter(|row| {
                search.is_none_or(|needle| {
                    row.ip_address.as_deref().is_some_and(|ip| contains_ci(ip, needle))
                        || contains_ci(&row.user_agent, needle)
                })
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.session_key.cmp(&b.session_key)));

        let total = rows.len() as i64;
        Ok((paginate(rows, pagination), total))
    }
}

/// Key generator that always returns the same value, for forcing collisions.
pub fn fixed_key() -> String {
    "fixed-key-used-to-force-a-collision".to_string()
}
