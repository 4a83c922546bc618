pub mod auth;
pub mod client;
pub mod domain;
pub mod session;
