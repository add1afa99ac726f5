//! Search capability lifecycle rules.
//!
//! # Transition Rules
//! ```text
//! old.enabled  new.enabled  connection changed  → action
//! false        true         -                   → Start
//! true         false        -                   → Stop
//! true         true         yes                 → Restart
//! true         true         no                  → none
//! false        false        any                 → none
//!
//! license present → Start
//! license absent  → Stop
//! ```
//!
//! Decisions use only the snapshot pair handed to the listener.

use std::sync::Arc;

use crate::config::SearchSettings;
use crate::events::EventBus;
use crate::license::LicenseState;
use crate::lifecycle::controller::{CapabilityController, LifecycleAction};

/// Action implied by a configuration change, if any.
pub fn config_action(old: &SearchSettings, new: &SearchSettings) -> Option<LifecycleAction> {
    match (old.enable_indexing, new.enable_indexing) {
        (false, true) => Some(LifecycleAction::Start),
        (true, false) => Some(LifecycleAction::Stop),
        (true, true) if old.connection_changed(new) => Some(LifecycleAction::Restart),
        _ => None,
    }
}

/// Action implied by a license change.
pub fn license_action(license_present: bool) -> LifecycleAction {
    if license_present {
        LifecycleAction::Start
    } else {
        LifecycleAction::Stop
    }
}

/// Register the search config and license listeners on `bus`.
pub fn register_listeners(bus: &EventBus, license: Arc<LicenseState>, controller: CapabilityController) {
    let on_config = controller.clone();
    bus.add_config_listener(move |old, new| {
        if let Some(action) = config_action(&old.search, &new.search) {
            tracing::info!(action = action.as_str(), "Search settings changed");
            on_config.dispatch(action);
        }
        Ok(())
    });

    bus.add_license_listener(move || {
        let action = license_action(license.is_present());
        tracing::info!(action = action.as_str(), "License changed");
        controller.dispatch(action);
        Ok(())
    });
}
