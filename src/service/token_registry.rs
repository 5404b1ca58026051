use crate::clock::{Clock, stored_precision};
use crate::config::TokenConfig;
use crate::database::api_token::TokenStore;
use crate::error::app_error::AppError;
use crate::models::api_token::{ApiToken, NewApiToken, OwnerId};
use crate::models::validation::{InvalidReason, ValidationResult};
use crate::util::{generate_opaque_key, key_prefix};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

pub const LABEL_MAX_LEN: usize = 100;

/// Issues API tokens and answers whether a presented token is usable.
///
/// The registry keeps no state of its own; uniqueness of token values is
/// enforced by the store, and a rejected insert is retried with a fresh value.
pub struct TokenRegistry<'a, S: TokenStore, C: Clock> {
    store: &'a S,
    clock: &'a C,
    max_attempts: u32,
    generate_key: fn() -> String,
}

impl<'a, S: TokenStore, C: Clock> TokenRegistry<'a, S, C> {
    pub fn new(store: &'a S, clock: &'a C, config: &TokenConfig) -> Self {
        TokenRegistry {
            store,
            clock,
            // the first attempt plus at least one retry
            max_attempts: config.max_issue_attempts.max(2),
            generate_key: generate_opaque_key,
        }
    }

    #[cfg(test)]
    fn with_key_generator(mut self, generate_key: fn() -> String) -> Self {
        self.generate_key = generate_key;
        self
    }

    pub async fn issue(&self, owner_id: OwnerId, label: Option<&str>, expires_at: Option<DateTime<Utc>>) -> Result<ApiToken, AppError> {
        let label = label.unwrap_or_default();
        if label.chars().count() > LABEL_MAX_LEN {
            return Err(AppError::InvalidArgument(format!("label must be at most {LABEL_MAX_LEN} characters")));
        }

        let now = stored_precision(self.clock.now());

        for attempt in 1..=self.max_attempts {
            let candidate = NewApiToken {
                token: (self.generate_key)(),
                owner_id,
                label: label.to_string(),
                created_at: now,
                expires_at,
            };

            match self.store.insert_token(&candidate).await {
                Ok(token) => {
                    info!(owner_id, token = key_prefix(&token.token), expires_at = ?token.expires_at, "api token issued");
                    return Ok(token);
                }
                Err(err) if err.is_unique_violation() => {
                    warn!(owner_id, attempt, max_attempts = self.max_attempts, "generated api token collided, regenerating");
                }
                Err(err) => return Err(err),
            }
        }

        Err(AppError::Conflict(format!(
            "could not generate a unique api token after {} attempts",
            self.max_attempts
        )))
    }

    pub async fn lookup(&self, token: &str) -> Result<ApiToken, AppError> {
        self.store
            .find_token(token)
            .await?
            .ok_or_else(|| AppError::NotFound("API token not found".to_string()))
    }

    /// Combined lookup and validity check. A missing token is an invalid result, not an error.
    pub async fn validate(&self, token: &str) -> Result<ValidationResult<ApiToken>, AppError> {
        let now = self.clock.now();
        let record = self.store.find_token(token).await?;
        Ok(evaluate(record, now))
    }

    /// Validate, and record usage with the same instant only when the token is valid.
    pub async fn validate_and_touch(&self, token: &str) -> Result<ValidationResult<ApiToken>, AppError> {
        let now = stored_precision(self.clock.now());
        let mut result = evaluate(self.store.find_token(token).await?, now);

        if result.valid {
            if !self.store.set_token_last_used(token, now).await? {
                return Ok(ValidationResult::not_found());
            }
            if let Some(record) = result.record.as_mut() {
                record.last_used_at = Some(now);
            }
        }

        Ok(result)
    }

    pub async fn deactivate(&self, token: &str) -> Result<(), AppError> {
        self.set_active(token, false).await
    }

    pub async fn activate(&self, token: &str) -> Result<(), AppError> {
        self.set_active(token, true).await
    }

    pub async fn touch(&self, token: &str) -> Result<(), AppError> {
        let now = stored_precision(self.clock.now());
        if self.store.set_token_last_used(token, now).await? {
            Ok(())
        } else {
            Err(AppError::NotFound("API token not found".to_string()))
        }
    }

    pub async fn delete(&self, token: &str) -> Result<(), AppError> {
        if self.store.delete_token(token).await? {
            info!(token = key_prefix(token), "api token deleted");
            Ok(())
        } else {
            Err(AppError::NotFound("API token not found".to_string()))
        }
    }

    async fn set_active(&self, token: &str, is_active: bool) -> Result<(), AppError> {
        if self.store.set_token_active(token, is_active).await? {
            info!(token = key_prefix(token), is_active, "api token activation changed");
            Ok(())
        } else {
            Err(AppError::NotFound("API token not found".to_string()))
        }
    }
}

fn evaluate(record: Option<ApiToken>, now: DateTime<Utc>) -> ValidationResult<ApiToken> {
    match record {
        None => ValidationResult::not_found(),
        Some(token) if token.is_expired_at(now) => ValidationResult::invalid(token, InvalidReason::Expired),
        Some(token) if !token.is_active => ValidationResult::invalid(token, InvalidReason::Inactive),
        Some(token) => ValidationResult::valid(token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{InMemoryRepository, MockClock, fixed_key};
    use chrono::Duration;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry<'a>(store: &'a InMemoryRepository, clock: &'a MockClock) -> TokenRegistry<'a, InMemoryRepository, MockClock> {
        TokenRegistry::new(store, clock, &TokenConfig::default())
    }

    #[tokio::test]
    async fn issue_then_validate_is_valid() {
        let store = InMemoryRepository::default();
        let clock = MockClock::default();
        let registry = registry(&store, &clock);

        let token = registry.issue(42, Some("ci-bot"), None).await.unwrap();
        assert!(token.token.len() >= 43);
        assert!(token.is_active);
        assert_eq!(token.expires_at, None);
        assert_eq!(token.label, "ci-bot");
        assert_eq!(token.created_at, clock.now());
        assert_eq!(token.last_used_at, None);

        let result = registry.validate(&token.token).await.unwrap();
        assert!(result.valid);
        assert_eq!(result.reason, None);
        assert_eq!(result.record, Some(token));
    }

    #[tokio::test]
    async fn issued_tokens_are_unique() {
        let store = InMemoryRepository::default();
        let clock = MockClock::default();
        let registry = registry(&store, &clock);

        let mut seen = HashSet::new();
        for _ in 0..200 {
            let token = registry.issue(1, None, None).await.unwrap();
            assert!(seen.insert(token.token));
        }
        assert_eq!(store.token_count().await, 200);
    }

    #[tokio::test]
    async fn collision_is_retried_with_a_fresh_value() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        fn collide_once() -> String {
            if CALLS.fetch_add(1, Ordering::SeqCst) == 0 { fixed_key() } else { generate_opaque_key() }
        }

        let store = InMemoryRepository::default();
        let clock = MockClock::default();
        registry(&store, &clock)
            .with_key_generator(fixed_key)
            .issue(1, None, None)
            .await
            .unwrap();

        let token = registry(&store, &clock).with_key_generator(collide_once).issue(2, None, None).await.unwrap();
        assert_ne!(token.token, fixed_key());
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
        assert_eq!(store.token_count().await, 2);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_conflict() {
        let store = InMemoryRepository::default();
        let clock = MockClock::default();
        let registry = registry(&store, &clock).with_key_generator(fixed_key);

        registry.issue(1, None, None).await.unwrap();
        let err = registry.issue(1, None, None).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.token_count().await, 1);
    }

    #[test]
    fn retry_count_never_drops_below_one_retry() {
        let store = InMemoryRepository::default();
        let clock = MockClock::default();
        let registry = TokenRegistry::new(&store, &clock, &TokenConfig { max_issue_attempts: 0 });
        assert_eq!(registry.max_attempts, 2);
    }

    #[tokio::test]
    async fn overlong_label_is_rejected() {
        let store = InMemoryRepository::default();
        let clock = MockClock::default();
        let label = "x".repeat(LABEL_MAX_LEN + 1);

        let err = registry(&store, &clock).issue(1, Some(&label), None).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn expired_token_is_invalid_even_when_active() {
        let store = InMemoryRepository::default();
        let clock = MockClock::default();
        let registry = registry(&store, &clock);

        let token = registry.issue(1, None, Some(clock.now() + Duration::minutes(5))).await.unwrap();
        assert!(registry.validate(&token.token).await.unwrap().valid);

        clock.advance(Duration::minutes(6));
        let result = registry.validate(&token.token).await.unwrap();
        assert!(!result.valid);
        assert_eq!(result.reason, Some(InvalidReason::Expired));
        assert!(result.record.unwrap().is_active);
    }

    #[tokio::test]
    async fn deactivated_token_is_invalid() {
        let store = InMemoryRepository::default();
        let clock = MockClock::default();
        let registry = registry(&store, &clock);

        let token = registry.issue(1, None, None).await.unwrap();
        registry.deactivate(&token.token).await.unwrap();

        let result = registry.validate(&token.token).await.unwrap();
        assert!(!result.valid);
        assert_eq!(result.reason, Some(InvalidReason::Inactive));
    }

    #[tokio::test]
    async fn deactivate_is_idempotent_and_reversible() {
        let store = InMemoryRepository::default();
        let clock = MockClock::default();
        let registry = registry(&store, &clock);

        let token = registry.issue(1, None, None).await.unwrap();
        registry.deactivate(&token.token).await.unwrap();
        let once = registry.lookup(&token.token).await.unwrap();
        registry.deactivate(&token.token).await.unwrap();
        let twice = registry.lookup(&token.token).await.unwrap();
        assert_eq!(once, twice);
        assert!(!twice.is_active);

        registry.activate(&token.token).await.unwrap();
        assert!(registry.validate(&token.token).await.unwrap().valid);
    }

    #[tokio::test]
    async fn unknown_token_validates_as_not_found() {
        let store = InMemoryRepository::default();
        let clock = MockClock::default();
        let registry = registry(&store, &clock);

        let result = registry.validate("missing").await.unwrap();
        assert!(!result.valid);
        assert_eq!(result.reason, Some(InvalidReason::NotFound));
        assert!(result.record.is_none());

        assert!(matches!(registry.lookup("missing").await, Err(AppError::NotFound(_))));
        assert!(matches!(registry.touch("missing").await, Err(AppError::NotFound(_))));
        assert!(matches!(registry.deactivate("missing").await, Err(AppError::NotFound(_))));
        assert!(matches!(registry.delete("missing").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn validate_does_not_record_usage() {
        let store = InMemoryRepository::default();
        let clock = MockClock::default();
        let registry = registry(&store, &clock);

        let token = registry.issue(1, None, None).await.unwrap();
        registry.validate(&token.token).await.unwrap();
        assert_eq!(registry.lookup(&token.token).await.unwrap().last_used_at, None);

        clock.advance(Duration::seconds(30));
        registry.touch(&token.token).await.unwrap();
        assert_eq!(registry.lookup(&token.token).await.unwrap().last_used_at, Some(clock.now()));
    }

    #[tokio::test]
    async fn validate_and_touch_only_records_successful_use() {
        let store = InMemoryRepository::default();
        let clock = MockClock::default();
        let registry = registry(&store, &clock);

        let token = registry.issue(1, None, None).await.unwrap();
        clock.advance(Duration::seconds(10));
        let result = registry.validate_and_touch(&token.token).await.unwrap();
        assert!(result.valid);
        assert_eq!(result.record.unwrap().last_used_at, Some(clock.now()));

        let used_at = clock.now();
        registry.deactivate(&token.token).await.unwrap();
        clock.advance(Duration::seconds(10));
        let result = registry.validate_and_touch(&token.token).await.unwrap();
        assert!(!result.valid);
        assert_eq!(registry.lookup(&token.token).await.unwrap().last_used_at, Some(used_at));
    }

    #[tokio::test]
    async fn recorded_usage_matches_what_the_store_reads_back() {
        let store = InMemoryRepository::default();
        let clock = MockClock::new(DateTime::from_timestamp(1_767_225_600, 123_456_789).unwrap());
        let registry = registry(&store, &clock);

        let token = registry.issue(1, None, None).await.unwrap();
        assert_eq!(token.created_at.timestamp_subsec_nanos(), 123_456_000);

        let returned = registry.validate_and_touch(&token.token).await.unwrap().record.unwrap().last_used_at;
        let stored = registry.lookup(&token.token).await.unwrap().last_used_at;
        assert_eq!(returned, stored);
        assert_eq!(stored.map(|at| at.timestamp_subsec_nanos()), Some(123_456_000));

        clock.advance(Duration::nanoseconds(1_999));
        registry.touch(&token.token).await.unwrap();
        let touched = registry.lookup(&token.token).await.unwrap().last_used_at;
        assert_eq!(touched.map(|at| at.timestamp_subsec_nanos()), Some(123_458_000));
    }

    #[tokio::test]
    async fn delete_removes_the_token() {
        let store = InMemoryRepository::default();
        let clock = MockClock::default();
        let registry = registry(&store, &clock);

        let token = registry.issue(1, None, None).await.unwrap();
        registry.delete(&token.token).await.unwrap();
        assert_eq!(registry.validate(&token.token).await.unwrap().reason, Some(InvalidReason::NotFound));
    }
}
