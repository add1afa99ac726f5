//! Application-level error type.

use thiserror::Error;

use crate::store::StoreError;

/// Error surfaced to callers of application operations.
///
/// Carries an HTTP-style status code and a stable message key so that an
/// outer layer can translate and render it.
#[derive(Debug, Error)]
#[error("{location}: {id}, {detailed_error}")]
pub struct AppError {
    /// Operation that failed.
    pub location: &'static str,
    /// Stable message key.
    pub id: &'static str,
    pub detailed_error: String,
    pub status_code: u16,
}

impl AppError {
    pub fn new(
        location: &'static str,
        id: &'static str,
        detailed_error: impl Into<String>,
        status_code: u16,
    ) -> Self {
        Self {
            location,
            id,
            detailed_error: detailed_error.into(),
            status_code,
        }
    }

    pub fn not_found(location: &'static str, id: &'static str, detailed_error: impl Into<String>) -> Self {
        Self::new(location, id, detailed_error, 404)
    }

    pub fn internal(location: &'static str, id: &'static str, detailed_error: impl Into<String>) -> Self {
        Self::new(location, id, detailed_error, 500)
    }

    /// Wrap a storage failure raised while serving `location`.
    pub fn store(location: &'static str, err: StoreError) -> Self {
        Self::internal(location, "app.system.store.app_error", err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
