pub mod action;
pub mod error;
pub mod health;
pub mod owner;
pub mod report;
pub mod session;
pub mod token;
