//! License state.
//!
//! # Data Flow
//! ```text
//! license file (JSON)
//!     → loader.rs (parse, drop expired)
//!     → App::set_license
//!     → LicenseState (atomically swappable, may be absent)
//!     → license listeners fire
//! ```
//!
//! # Design Decisions
//! - No signature verification; the file is trusted as-is
//! - An expired license is treated exactly like no license, whether it was
//!   expired on load or expired while installed
//! - Expiry while running is observed on read at once; the server's periodic
//!   expiry check then removes the license so listeners fire
//! - Controllers only look at presence; capabilities may inspect features

pub mod loader;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};

pub use loader::{load_license, LicenseError};

/// A license granted to this installation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct License {
    pub id: String,
    pub customer: String,
    /// Issue time (seconds since epoch).
    pub issued_at: u64,
    /// Expiry time (seconds since epoch).
    pub expires_at: u64,
    /// Licensed feature names, e.g. "elasticsearch".
    #[serde(default)]
    pub features: Vec<String>,
}

impl License {
    pub fn is_expired(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.expires_at <= now
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }
}

/// Holds the current license, if any.
#[derive(Debug, Default)]
pub struct LicenseState {
    current: ArcSwapOption<License>,
}

impl LicenseState {
    pub fn new(license: Option<License>) -> Self {
        Self {
            current: ArcSwapOption::from(license.map(Arc::new)),
        }
    }

    /// The installed license, unless it has expired since it was loaded.
    pub fn get(&self) -> Option<Arc<License>> {
        self.current.load_full().filter(|license| !license.is_expired())
    }

    pub fn is_present(&self) -> bool {
        self.get().is_some()
    }

    /// The installed license as loaded, expired or not.
    pub fn installed(&self) -> Option<Arc<License>> {
        self.current.load_full()
    }

    /// Install a new license (or none) and return the previous one.
    pub fn replace(&self, license: Option<License>) -> Option<Arc<License>> {
        self.current.swap(license.map(Arc::new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn license(expires_at: u64) -> License {
        License {
            id: "lic-1".into(),
            customer: "Acme".into(),
            issued_at: 0,
            expires_at,
            features: vec!["elasticsearch".into()],
        }
    }

    #[test]
    fn test_expiry_and_features() {
        assert!(license(1).is_expired());
        assert!(!license(u64::MAX).is_expired());
        assert!(license(1).has_feature("elasticsearch"));
        assert!(!license(1).has_feature("ldap"));
    }

    #[test]
    fn test_state_replace() {
        let state = LicenseState::default();
        assert!(!state.is_present());

        assert!(state.replace(Some(license(u64::MAX))).is_none());
        assert!(state.is_present());
        assert_eq!(state.get().unwrap().customer, "Acme");

        let previous = state.replace(None).unwrap();
        assert_eq!(previous.id, "lic-1");
        assert!(state.get().is_none());
    }

    #[test]
    fn test_license_expiring_while_installed_reads_as_absent() {
        let state = LicenseState::new(Some(license(u64::MAX)));
        assert!(state.is_present());

        state.replace(Some(license(1)));
        assert!(!state.is_present());
        assert!(state.get().is_none());
        assert_eq!(state.installed().unwrap().expires_at, 1);
    }
}
