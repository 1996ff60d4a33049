//! API key management and validation
//!
//! All protected API requests carry an `X-API-Key` header. Keys are issued
//! once in raw form and stored only as a SHA-256 hash, together with a
//! `can_write` capability, a revocation flag and an optional expiry date.
//!
//! This module contains only pure functions and database operations. No HTTP
//! framework dependencies (Axum, etc.) - those live in service code.

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};

#[cfg(feature = "sqlx")]
use sqlx::SqlitePool;

/// Length of a raw API key
const KEY_LENGTH: usize = 40;

/// Length of the stored key prefix (shown in listings, never secret)
const PREFIX_LENGTH: usize = 8;

// ========================================
// Error Types
// ========================================

/// Authentication error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiAuthError {
    /// No API key header was provided
    MissingKey,

    /// The provided key matches no stored record
    InvalidKey,

    /// The matched key has been revoked
    Revoked,

    /// The matched key has expired
    Expired,

    /// The matched key does not carry write permission
    WriteForbidden,

    /// Database error while looking up the key
    DatabaseError(String),
}

impl std::fmt::Display for ApiAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiAuthError::MissingKey => {
                write!(f, "No API key was provided in the request headers")
            }
            ApiAuthError::InvalidKey => write!(f, "The provided API key is invalid"),
            ApiAuthError::Revoked => write!(f, "The provided API key has been revoked"),
            ApiAuthError::Expired => write!(f, "The provided API key has expired"),
            ApiAuthError::WriteForbidden => {
                write!(f, "The API key does not have write permissions")
            }
            ApiAuthError::DatabaseError(err) => write!(f, "Database error: {}", err),
        }
    }
}

impl std::error::Error for ApiAuthError {}

// ========================================
// Key Records
// ========================================

/// A stored API key record (hash omitted)
#[derive(Debug, Clone)]
pub struct ApiKeyRecord {
    pub id: i64,
    pub name: String,
    pub prefix: String,
    pub can_write: bool,
    pub revoked: bool,
    pub expiry_date: Option<DateTime<Utc>>,
}

/// Check a matched key record against `now` and the requested capability
///
/// Pure function so the gate logic is testable without a database.
pub fn check_key(
    record: &ApiKeyRecord,
    now: DateTime<Utc>,
    require_write: bool,
) -> Result<(), ApiAuthError> {
    if record.revoked {
        return Err(ApiAuthError::Revoked);
    }

    if let Some(expiry) = record.expiry_date {
        if expiry < now {
            return Err(ApiAuthError::Expired);
        }
    }

    if require_write && !record.can_write {
        return Err(ApiAuthError::WriteForbidden);
    }

    Ok(())
}

/// Generate a new raw API key
pub fn generate_raw_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(KEY_LENGTH)
        .map(char::from)
        .collect()
}

/// Hash a raw key for storage and lookup
pub fn hash_key(raw_key: &str) -> String {
    format!("{:x}", Sha256::digest(raw_key.as_bytes()))
}

// ========================================
// Database Operations
// ========================================

/// Issue a new API key and return the raw key
///
/// The raw key is returned exactly once; only its hash is stored.
#[cfg(feature = "sqlx")]
pub async fn create_api_key(
    db: &SqlitePool,
    name: &str,
    can_write: bool,
    expiry_date: Option<DateTime<Utc>>,
) -> Result<String, ApiAuthError> {
    let raw_key = generate_raw_key();
    let prefix = &raw_key[..PREFIX_LENGTH];

    sqlx::query(
        "INSERT INTO api_keys (name, prefix, key_hash, can_write, revoked, expiry_date) \
         VALUES (?, ?, ?, ?, 0, ?)",
    )
    .bind(name)
    .bind(prefix)
    .bind(hash_key(&raw_key))
    .bind(can_write as i64)
    .bind(expiry_date.map(|d| d.to_rfc3339()))
    .execute(db)
    .await
    .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?;

    Ok(raw_key)
}

/// Validate a raw key against stored records
///
/// Returns the matched record after checking revocation and expiry. Write
/// permission is checked separately by the caller via [`check_key`] so that
/// read-only endpoints accept read-only keys.
#[cfg(feature = "sqlx")]
pub async fn validate_api_key(
    db: &SqlitePool,
    raw_key: &str,
    require_write: bool,
) -> Result<ApiKeyRecord, ApiAuthError> {
    let row: Option<(i64, String, String, i64, i64, Option<String>)> = sqlx::query_as(
        "SELECT id, name, prefix, can_write, revoked, expiry_date \
         FROM api_keys WHERE key_hash = ?",
    )
    .bind(hash_key(raw_key))
    .fetch_optional(db)
    .await
    .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?;

    let Some((id, name, prefix, can_write, revoked, expiry_date)) = row else {
        return Err(ApiAuthError::InvalidKey);
    };

    let expiry_date = match expiry_date {
        Some(text) => Some(
            DateTime::parse_from_rfc3339(&text)
                .map_err(|e| ApiAuthError::DatabaseError(format!("Invalid expiry date: {}", e)))?
                .with_timezone(&Utc),
        ),
        None => None,
    };

    let record = ApiKeyRecord {
        id,
        name,
        prefix,
        can_write: can_write != 0,
        revoked: revoked != 0,
        expiry_date,
    };

    check_key(&record, Utc::now(), require_write)?;

    Ok(record)
}
