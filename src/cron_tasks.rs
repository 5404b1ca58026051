use crate::Config;
use crate::clock::SystemClock;
use crate::database::postgres_repository::PostgresRepository;
use crate::db::init_pool;
use crate::service::session_registry::SessionRegistry;

/// Delete every session that has already expired. Returns how many were removed.
pub async fn purge_expired_sessions(config: &Config) -> Result<u64, String> {
    let pool = init_pool(&config.database)
        .await
        .map_err(|err| format!("Failed to initialize database pool: {err}"))?;

    let repo = PostgresRepository::new(pool.clone());
    let deleted = SessionRegistry::new(&repo, &SystemClock, &config.session)
        .purge_expired()
        .await
        .map_err(|err| format!("Failed to purge expired sessions: {err:?}"));

    pool.close().await;

    deleted
}
