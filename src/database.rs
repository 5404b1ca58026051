pub mod api_token;
pub mod postgres_repository;
pub mod session;
