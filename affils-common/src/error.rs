//! Common error types for the affiliations service

use thiserror::Error;

/// Common result type for affiliations operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types shared across the affiliations service
///
/// Validation failures carry enough structure for the API layer to produce
/// field-attributed reports; they are never silently corrected.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input on a specific request field
    #[error("Invalid input: {field}: {message}")]
    InvalidInput { field: String, message: String },

    /// Computed identifier falls outside its valid numeric band, or the
    /// identifier space is exhausted
    #[error("{0}")]
    OutOfRange(String),

    /// The last three digits of affiliation_id and expert_panel_id disagree
    #[error(
        "Identifier suffixes do not match: affiliation_id {affiliation_id}, \
         expert_panel_id {expert_panel_id}"
    )]
    InconsistentIdentifier {
        affiliation_id: i64,
        expert_panel_id: i64,
    },

    /// A proposed identifier collides with a different existing record;
    /// `fields` names every identifier that collided
    #[error("Identifier already in use: {}", .fields.join(", "))]
    DuplicateIdentifier { fields: Vec<String> },

    /// An update attempted to change protected fields; `fields` names every
    /// offending field in one combined report
    #[error("Read-only field(s) cannot be updated: {}", .fields.join(", "))]
    ImmutableField { fields: Vec<String> },

    /// The declared type requires a specific working group that was not
    /// supplied
    #[error("{0}")]
    TypeWorkingGroupMismatch(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for an [`Error::InvalidInput`] attributed to `field`.
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }
}
