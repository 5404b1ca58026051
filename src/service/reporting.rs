use crate::clock::Clock;
use crate::database::api_token::TokenStore;
use crate::database::session::SessionStore;
use crate::error::app_error::AppError;
use crate::models::pagination::{PaginatedResponse, PaginationParams};
use crate::models::report::{SessionListFilter, SessionReportRow, TokenListFilter, TokenReportRow};

/// Read-only listings over stored tokens and sessions, newest first.
pub struct ReportService<'a, R: TokenStore + SessionStore, C: Clock> {
    repository: &'a R,
    clock: &'a C,
}

impl<'a, R: TokenStore + SessionStore, C: Clock> ReportService<'a, R, C> {
    pub fn new(repository: &'a R, clock: &'a C) -> Self {
        ReportService { repository, clock }
    }

    pub async fn list_tokens(&self, filter: &TokenListFilter, pagination: &PaginationParams) -> Result<PaginatedResponse<TokenReportRow>, AppError> {
        let now = self.clock.now();
        let (rows, total) = self.repository.list_tokens(filter, now, pagination).await?;
        let data = rows.iter().map(|token| TokenReportRow::at(token, now)).collect();

        Ok(PaginatedResponse::new(data, pagination.page(), pagination.effective_limit(), total))
    }

    pub async fn list_sessions(&self, filter: &SessionListFilter, pagination: &PaginationParams) -> Result<PaginatedResponse<SessionReportRow>, AppError> {
        let now = self.clock.now();
        let (rows, total) = self.repository.list_sessions(filter, now, pagination).await?;
        let data = rows.iter().map(|session| SessionReportRow::at(session, now)).collect();

        Ok(PaginatedResponse::new(data, pagination.page(), pagination.effective_limit(), total))
    }
}
