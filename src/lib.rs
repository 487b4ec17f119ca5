// Cinegraph - social graph and engagement engine for a film catalogue

// Domain models and identifiers
pub mod models;

// Store interfaces and their in-memory / SQLite implementations
pub mod storage;

// Mutation and derived-view services
pub mod services;

// HTTP surface
pub mod interface;

// Common utilities
pub mod app_state;
pub mod config;
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};
