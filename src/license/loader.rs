//! License file loading.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

use crate::license::License;

#[derive(Debug, Error)]
pub enum LicenseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read a license file. Returns `None` when the license has expired.
pub fn load_license(path: &Path) -> Result<Option<License>, LicenseError> {
    let reader = BufReader::new(File::open(path)?);
    let license: License = serde_json::from_reader(reader)?;

    if license.is_expired() {
        tracing::warn!(license_id = %license.id, expires_at = license.expires_at, "License has expired, ignoring");
        return Ok(None);
    }

    tracing::debug!(license_id = %license.id, customer = %license.customer, "License loaded");
    Ok(Some(license))
}
