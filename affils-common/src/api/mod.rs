//! API support shared across the service

pub mod auth;
