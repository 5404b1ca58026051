use crate::database::postgres_repository::{PostgresRepository, like_pattern, search_term};
use crate::error::app_error::AppError;
use crate::models::api_token::{ApiToken, NewApiToken, OwnerId};
use crate::models::pagination::PaginationParams;
use crate::models::report::TokenListFilter;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

const COLUMNS: &str = "token, owner_id, label, created_at, expires_at, is_active, last_used_at";

/// Durable storage for API tokens.
///
/// `insert_token` must report a duplicate token value as `AppError::UniqueViolation`.
/// Mutations return whether a row matched so callers can tell a missing token apart.
#[async_trait::async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert_token(&self, token: &NewApiToken) -> Result<ApiToken, AppError>;
    async fn find_token(&self, token: &str) -> Result<Option<ApiToken>, AppError>;
    async fn set_token_active(&self, token: &str, is_active: bool) -> Result<bool, AppError>;
    async fn set_token_last_used(&self, token: &str, used_at: DateTime<Utc>) -> Result<bool, AppError>;
    async fn delete_token(&self, token: &str) -> Result<bool, AppError>;
    async fn delete_tokens_for_owner(&self, owner_id: OwnerId) -> Result<u64, AppError>;
    async fn list_tokens(&self, filter: &TokenListFilter, now: DateTime<Utc>, pagination: &PaginationParams) -> Result<(Vec<ApiToken>, i64), AppError>;
}

#[async_trait::async_trait]
impl TokenStore for PostgresRepository {
    async fn insert_token(&self, token: &NewApiToken) -> Result<ApiToken, AppError> {
        let query = format!(
            r#"
            INSERT INTO auth_api_token (token, owner_id, label, created_at, expires_at, is_active)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            RETURNING {COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, ApiToken>(&query)
            .bind(&token.token)
            .bind(token.owner_id)
            .bind(&token.label)
            .bind(token.created_at)
            .bind(token.expires_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    async fn find_token(&self, token: &str) -> Result<Option<ApiToken>, AppError> {
        let query = format!("SELECT {COLUMNS} FROM auth_api_token WHERE token = $1");
        let row = sqlx::query_as::<_, ApiToken>(&query).bind(token).fetch_optional(&self.pool).await?;

        Ok(row)
    }

    async fn set_token_active(&self, token: &str, is_active: bool) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE auth_api_token SET is_active = $2 WHERE token = $1")
            .bind(token)
            .bind(is_active)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_token_last_used(&self, token: &str, used_at: DateTime<Utc>) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE auth_api_token SET last_used_at = $2 WHERE token = $1")
            .bind(token)
            .bind(used_at)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_token(&self, token: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM auth_api_token WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_tokens_for_owner(&self, owner_id: OwnerId) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM auth_api_token WHERE owner_id = $1")
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn list_tokens(&self, filter: &TokenListFilter, now: DateTime<Utc>, pagination: &PaginationParams) -> Result<(Vec<ApiToken>, i64), AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM auth_api_token");
        push_token_filters(&mut count, filter, now);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM auth_api_token"));
        push_token_filters(&mut select, filter, now);
        select
            .push(" ORDER BY created_at DESC, token LIMIT ")
            .push_bind(pagination.effective_limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let rows = select.build_query_as::<ApiToken>().fetch_all(&self.pool).await?;

        Ok((rows, total))
    }
}

fn push_token_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &TokenListFilter, now: DateTime<Utc>) {
    builder.push(" WHERE TRUE");

    if let Some(owner_id) = filter.owner_id {
        builder.push(" AND owner_id = ").push_bind(owner_id);
    }

    if let Some(active) = filter.active {
        builder.push(" AND is_active = ").push_bind(active);
    }

    match filter.expired {
        Some(true) => {
            builder.push(" AND expires_at IS NOT NULL AND expires_at < ").push_bind(now);
        }
        Some(false) => {
            builder.push(" AND (expires_at IS NULL OR expires_at >= ").push_bind(now).push(")");
        }
        None => {}
    }

    if let Some(search) = search_term(filter.search.as_deref()) {
        let pattern = like_pattern(search);
        builder.push(" AND label ILIKE ").push_bind(pattern);
    }
}
