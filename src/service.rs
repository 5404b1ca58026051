pub mod owner_cleanup;
pub mod reporting;
pub mod session_registry;
pub mod token_registry;
