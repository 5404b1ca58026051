use crate::database::api_token::TokenStore;
use crate::database::session::SessionStore;
use crate::error::app_error::AppError;
use crate::models::api_token::OwnerId;
use crate::models::report::OwnerPurgeResponse;
use tracing::info;

/// Removes everything an owner holds once the user directory deletes that user.
///
/// Both deletes are idempotent, so a partially applied purge can simply be re-run.
pub struct OwnerCleanup<'a, R: TokenStore + SessionStore> {
    repository: &'a R,
}

impl<'a, R: TokenStore + SessionStore> OwnerCleanup<'a, R> {
    pub fn new(repository: &'a R) -> Self {
        OwnerCleanup { repository }
    }

    pub async fn purge_owner(&self, owner_id: OwnerId) -> Result<OwnerPurgeResponse, AppError> {
        let tokens_deleted = self.repository.delete_tokens_for_owner(owner_id).await?;
        let sessions_deleted = self.repository.delete_sessions_for_owner(owner_id).await?;

        info!(owner_id, tokens_deleted, sessions_deleted, "owner credentials purged");

        Ok(OwnerPurgeResponse {
            tokens_deleted,
            sessions_deleted,
        })
    }
}
