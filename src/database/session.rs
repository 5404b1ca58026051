use crate::database::postgres_repository::{PostgresRepository, like_pattern, search_term};
use crate::error::app_error::AppError;
use crate::models::api_token::OwnerId;
use crate::models::pagination::PaginationParams;
use crate::models::report::SessionListFilter;
use crate::models::session::{NewUserSession, UserSession};
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

const COLUMNS: &str = "session_key, owner_id, ip_address, user_agent, created_at, updated_at, expires_at";

/// Durable storage for user sessions.
///
/// `insert_session` must report a duplicate session key as `AppError::UniqueViolation`.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, session: &NewUserSession) -> Result<UserSession, AppError>;
    async fn find_session(&self, session_key: &str) -> Result<Option<UserSession>, AppError>;
    async fn set_session_expiry(&self, session_key: &str, expires_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Result<Option<UserSession>, AppError>;
    async fn delete_session(&self, session_key: &str) -> Result<bool, AppError>;
    async fn delete_sessions_for_owner(&self, owner_id: OwnerId) -> Result<u64, AppError>;
    /// Removes every session whose expiry lies strictly before `now`.
    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError>;
    async fn list_sessions(&self, filter: &SessionListFilter, now: DateTime<Utc>, pagination: &PaginationParams) -> Result<(Vec<UserSession>, i64), AppError>;
}

#[async_trait::async_trait]
impl SessionStore for PostgresRepository {
    async fn insert_session(&self, session: &NewUserSession) -> Result<UserSession, AppError> {
        let query = format!(
            r#"
            INSERT INTO auth_api_session (session_key, owner_id, ip_address, user_agent, created_at, updated_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $5, $6)
            RETURNING {COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, UserSession>(&query)
            .bind(&session.session_key)
            .bind(session.owner_id)
            .bind(&session.ip_address)
            .bind(&session.user_agent)
            .bind(session.created_at)
            .bind(session.expires_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    async fn find_session(&self, session_key: &str) -> Result<Option<UserSession>, AppError> {
        let query = format!("SELECT {COLUMNS} FROM auth_api_session WHERE session_key = $1");
        let row = sqlx::query_as::<_, UserSession>(&query)
            .bind(session_key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn set_session_expiry(&self, session_key: &str, expires_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Result<Option<UserSession>, AppError> {
        let query = format!(
            r#"
            UPDATE auth_api_session
            SET expires_at = $2, updated_at = $3
            WHERE session_key = $1
            RETURNING {COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, UserSession>(&query)
            .bind(session_key)
            .bind(expires_at)
            .bind(updated_at)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn delete_session(&self, session_key: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM auth_api_session WHERE session_key = $1")
            .bind(session_key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_sessions_for_owner(&self, owner_id: OwnerId) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM auth_api_session WHERE owner_id = $1")
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM auth_api_session WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn list_sessions(&self, filter: &SessionListFilter, now: DateTime<Utc>, pagination: &PaginationParams) -> Result<(Vec<UserSession>, i64), AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM auth_api_session");
        push_session_filters(&mut count, filter, now);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM auth_api_session"));
        push_session_filters(&mut select, filter, now);
        select
            .push(" ORDER BY created_at DESC, session_key LIMIT ")
            .push_bind(pagination.effective_limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let rows = select.build_query_as::<UserSession>().fetch_all(&self.pool).await?;

        Ok((rows, total))
    }
}

fn push_session_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &SessionListFilter, now: DateTime<Utc>) {
    builder.push(" WHERE TRUE");

    if let Some(owner_id) = filter.owner_id {
        builder.push(" AND owner_id = ").push_bind(owner_id);
    }

    match filter.expired {
        Some(true) => {
            builder.push(" AND expires_at < ").push_bind(now);
        }
        Some(false) => {
            builder.push(" AND expires_at >= ").push_bind(now);
        }
        None => {}
    }

    if let Some(search) = search_term(filter.search.as_deref()) {
        let pattern = like_pattern(search);
        builder
            .push(" AND (ip_address ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR user_agent ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, SubsecRound, TimeZone};

    #[test]
    fn expired_filter_compares_against_now() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let filter = SessionListFilter {
            owner_id: None,
            expired: Some(true),
            search: Some("firefox".to_string()),
        };

        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM auth_api_session");
        push_session_filters(&mut builder, &filter, now);

        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM auth_api_session WHERE TRUE AND expires_at < $1 \
             AND (ip_address ILIKE $2 OR user_agent ILIKE $3)"
        );
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn expiry_update_returns_the_new_row() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
        let pool = sqlx::PgPool::connect(&url).await.expect("pool");
        sqlx::migrate!().run(&pool).await.expect("migrations");
        let repo = PostgresRepository::new(pool);

        let now = Utc::now().trunc_subsecs(0);
        let session = repo
            .insert_session(&NewUserSession {
                session_key: format!("sess-{}", uuid::Uuid::new_v4()),
                owner_id: 7,
                ip_address: Some("127.0.0.1".to_string()),
                user_agent: "test".to_string(),
                created_at: now,
                expires_at: now + Duration::hours(1),
            })
            .await
            .expect("insert");
        assert_eq!(session.created_at, session.updated_at);

        let later = now + Duration::minutes(30);
        let extended = repo
            .set_session_expiry(&session.session_key, later + Duration::hours(1), later)
            .await
            .expect("update")
            .expect("row");
        assert_eq!(extended.updated_at, later);
        assert_eq!(extended.created_at, session.created_at);

        assert!(repo.delete_session(&session.session_key).await.expect("delete"));
        assert!(!repo.delete_session(&session.session_key).await.expect("second delete"));
    }
}
