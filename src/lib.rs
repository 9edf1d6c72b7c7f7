// Library interface for testing

// Declare all modules
pub mod client;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod db;
pub mod error;
pub mod models;
pub mod player;
pub mod queries;
pub mod schema;
pub mod serve;
pub mod session;
pub mod store;
pub mod timeline;
pub mod upload;
pub mod upload_session;

// Re-export the expected database version for convenience
pub use constants::EXPECTED_DB_VERSION;
