//! HTTP API handlers for the affiliations service

pub mod affiliations;
pub mod auth_middleware;
pub mod error;
pub mod health;
pub mod legacy;
pub mod working_groups;

pub use auth_middleware::auth_middleware;
pub use error::ApiError;
pub use health::health_routes;
