// Core modules
pub mod api;
pub mod auth;
mod config;
pub mod cors;
mod db;
pub mod server;
mod types;


// Re-export key types and functions
pub use config::{ConfigError, ServerConfig, load_secret};
pub use cors::{CorsPolicy, CorsPolicyError};
pub use db::{
    ApplicationDocument, DatabaseConfig, DeleteResult, InsertResult, JobBoardStore, JobDocument,
    JobWithApplicationCount, UpdateResult, create_connection, ensure_schema,
};
pub use server::{create_app, serve};
pub use types::{ApplicationId, Identity, JobId};
