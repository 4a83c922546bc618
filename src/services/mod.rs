pub mod credentials;
pub mod directory;
pub mod dns;
pub mod domains;
pub mod metrics;
pub mod session;
pub mod token;
