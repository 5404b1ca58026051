pub mod action;
pub mod api_token;
pub mod health;
pub mod pagination;
pub mod report;
pub mod session;
pub mod validation;
