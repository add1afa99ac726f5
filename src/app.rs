//! Application context.
//!
//! # Responsibilities
//! - Own the capability slots, event bus, config and license state
//! - Apply configuration and license changes and fan them out
//! - Wire lifecycle controllers for managed capabilities
//! - Serve the diagnostic identifier and installation date
//!
//! # Design Decisions
//! - Assembled once through `AppBuilder`; slots are read-only afterwards
//! - Applying a change is synchronous; capability I/O goes to the task pool

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::runtime::Handle;

use crate::capability::CapabilitySlots;
use crate::config::{AppConfig, ConfigStore};
use crate::error::{AppError, AppResult};
use crate::events::{EventBus, ListenerError};
use crate::license::{License, LicenseState};
use crate::lifecycle::search;
use crate::lifecycle::{CapabilityController, LifecycleAction, TaskPool};
use crate::store::{DiagnosticId, MemoryStore, SystemStore, INSTALLATION_DATE_KEY};

/// Flat, non-secret view of configuration and license for clients.
pub type ClientConfig = HashMap<String, String>;

/// Shared application context.
pub struct App {
    config: Arc<ConfigStore>,
    license: Arc<LicenseState>,
    bus: EventBus,
    slots: CapabilitySlots,
    store: Arc<dyn SystemStore>,
    tasks: TaskPool,
    diagnostic: DiagnosticId,
    client_config: ArcSwap<ClientConfig>,
    search_controller: OnceLock<CapabilityController>,
}

/// Builder for [`App`].
#[derive(Default)]
pub struct AppBuilder {
    config: Option<Arc<ConfigStore>>,
    license: Option<Arc<LicenseState>>,
    slots: CapabilitySlots,
    store: Option<Arc<dyn SystemStore>>,
    handle: Option<Handle>,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an initial configuration snapshot.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(Arc::new(ConfigStore::new(config)));
        self
    }

    /// Share an existing config holder (e.g. with a capability).
    pub fn config_store(mut self, config: Arc<ConfigStore>) -> Self {
        self.config = Some(config);
        self
    }

    pub fn license_state(mut self, license: Arc<LicenseState>) -> Self {
        self.license = Some(license);
        self
    }

    pub fn slots(mut self, slots: CapabilitySlots) -> Self {
        self.slots = slots;
        self
    }

    pub fn store(mut self, store: Arc<dyn SystemStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Runtime for background tasks. Defaults to the current runtime.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn build(self) -> AppResult<Arc<App>> {
        let handle = match self.handle {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|e| {
                AppError::internal("App::build", "app.build.runtime.app_error", e.to_string())
            })?,
        };

        let app = Arc::new_cyclic(|weak: &Weak<App>| {
            let app = App {
                config: self.config.unwrap_or_default(),
                license: self.license.unwrap_or_default(),
                bus: EventBus::new(),
                slots: self.slots,
                store: self.store.unwrap_or_else(|| Arc::new(MemoryStore::new())),
                tasks: TaskPool::new(handle),
                diagnostic: DiagnosticId::new(),
                client_config: ArcSwap::from_pointee(ClientConfig::new()),
                search_controller: OnceLock::new(),
            };
            app.register_client_config_listeners(weak.clone());
            app
        });

        app.regenerate_client_config(&app.config());
        tracing::debug!(capabilities = ?app.slots.present(), "Application assembled");
        Ok(app)
    }
}

impl App {
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    // --- Configuration & license ---

    /// The configuration snapshot in effect right now.
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.current()
    }

    pub fn config_store(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    /// Replace the configuration and notify config listeners with `(old, new)`.
    pub fn update_config(&self, config: AppConfig) -> Result<(), ListenerError> {
        let new = Arc::new(config);
        let old = self.config.replace(new.clone());
        self.bus.fire_config_change(&old, &new)
    }

    pub fn license(&self) -> Option<Arc<License>> {
        self.license.get()
    }

    pub fn license_state(&self) -> &Arc<LicenseState> {
        &self.license
    }

    /// Replace the license (or remove it) and notify license listeners.
    pub fn set_license(&self, license: Option<License>) -> Result<(), ListenerError> {
        match &license {
            Some(l) => tracing::info!(license_id = %l.id, customer = %l.customer, "License installed"),
            None => tracing::info!("License removed"),
        }
        self.license.replace(license);
        self.bus.fire_license_change()
    }

    pub fn add_config_listener<F>(&self, listener: F)
    where
        F: Fn(&AppConfig, &AppConfig) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.bus.add_config_listener(listener);
    }

    pub fn add_license_listener<F>(&self, listener: F)
    where
        F: Fn() -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.bus.add_license_listener(listener);
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    // --- Capabilities ---

    pub fn slots(&self) -> &CapabilitySlots {
        &self.slots
    }

    pub fn tasks(&self) -> &TaskPool {
        &self.tasks
    }

    /// Put the search capability under config/license control.
    ///
    /// Dispatches an initial start and registers the listeners. Returns
    /// `None` when no search capability is present. Calling again returns
    /// the existing controller.
    pub fn start_search_lifecycle(&self) -> Option<CapabilityController> {
        let capability = self.slots.elasticsearch.clone()?;

        let mut created = false;
        let controller = self
            .search_controller
            .get_or_init(|| {
                created = true;
                CapabilityController::spawn(capability, &self.tasks)
            })
            .clone();

        if created {
            controller.dispatch(LifecycleAction::Start);
            search::register_listeners(&self.bus, self.license.clone(), controller.clone());
            tracing::info!("Search lifecycle controller started");
        }
        Some(controller)
    }

    pub fn search_controller(&self) -> Option<&CapabilityController> {
        self.search_controller.get()
    }

    // --- System properties ---

    pub fn store(&self) -> &Arc<dyn SystemStore> {
        &self.store
    }

    pub fn diagnostic_id(&self) -> Option<String> {
        self.diagnostic.get()
    }

    pub fn set_diagnostic_id(&self, id: impl Into<String>) {
        self.diagnostic.set(id);
        self.regenerate_client_config(&self.config());
    }

    /// Make sure the diagnostic identifier is loaded, generating and
    /// persisting one if storage has none. Storage failures are logged and
    /// leave the identifier unset so a later call retries.
    pub async fn ensure_diagnostic_id(&self) -> Option<String> {
        let had_id = self.diagnostic.get().is_some();
        match self.diagnostic.ensure(self.store.as_ref()).await {
            Ok(id) => {
                if !had_id {
                    self.regenerate_client_config(&self.config());
                }
                Some(id)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not load diagnostic id");
                None
            }
        }
    }

    /// Installation date in milliseconds since the Unix epoch.
    pub async fn install_date(&self) -> AppResult<i64> {
        const LOCATION: &str = "App::install_date";

        let value = self
            .store
            .get(INSTALLATION_DATE_KEY)
            .await
            .map_err(|e| AppError::store(LOCATION, e))?
            .ok_or_else(|| {
                AppError::not_found(LOCATION, "app.system_install_date.get.app_error", "installation date not recorded")
            })?;

        value.parse::<i64>().map_err(|e| {
            AppError::internal(LOCATION, "app.system_install_date.parse_int.app_error", e.to_string())
        })
    }

    /// Record the installation date if none is stored yet.
    pub async fn ensure_install_date(&self) -> AppResult<i64> {
        const LOCATION: &str = "App::ensure_install_date";

        match self.install_date().await {
            Ok(date) => Ok(date),
            Err(e) if e.status_code == 404 => {
                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_millis() as i64;
                self.store
                    .save(INSTALLATION_DATE_KEY, &now.to_string())
                    .await
                    .map_err(|e| AppError::store(LOCATION, e))?;
                tracing::info!(install_date = now, "Recorded installation date");
                Ok(now)
            }
            Err(e) => Err(e),
        }
    }

    // --- Client config ---

    pub fn client_config(&self) -> Arc<ClientConfig> {
        self.client_config.load_full()
    }

    fn register_client_config_listeners(&self, app: Weak<App>) {
        let on_config = app.clone();
        self.bus.add_config_listener(move |_, new| {
            if let Some(app) = on_config.upgrade() {
                app.regenerate_client_config(new);
            }
            Ok(())
        });

        self.bus.add_license_listener(move || {
            if let Some(app) = app.upgrade() {
                app.regenerate_client_config(&app.config());
            }
            Ok(())
        });
    }

    fn regenerate_client_config(&self, config: &AppConfig) {
        let license = self.license.get();

        let mut client = ClientConfig::new();
        client.insert("Version".into(), env!("CARGO_PKG_VERSION").into());
        client.insert("EnableSearchIndexing".into(), config.search.enable_indexing.to_string());
        client.insert("IsLicensed".into(), license.is_some().to_string());
        if let Some(license) = &license {
            client.insert("LicenseId".into(), license.id.clone());
            client.insert("LicenseCustomer".into(), license.customer.clone());
        }
        if let Some(id) = self.diagnostic.get() {
            client.insert("DiagnosticId".into(), id);
        }

        self.client_config.store(Arc::new(client));
    }

    // --- Teardown ---

    /// Stop managed capabilities, then drain the task pool.
    ///
    /// Each phase is bounded by `lifecycle.shutdown_timeout_secs`; a stop
    /// that outlives it is aborted with the rest of the pool.
    pub async fn shutdown(&self) {
        let grace = Duration::from_secs(self.config().lifecycle.shutdown_timeout_secs);

        if let Some(controller) = self.search_controller.get() {
            controller.dispatch(LifecycleAction::Stop);
            if tokio::time::timeout(grace, controller.flush()).await.is_err() {
                tracing::warn!(
                    capability = %controller.kind(),
                    grace = ?grace,
                    "Capability did not stop within grace period"
                );
            }
        }

        self.tasks.shutdown(grace).await;
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("slots", &self.slots)
            .field("bus", &self.bus)
            .field("licensed", &self.license.is_present())
            .field("tasks", &self.tasks)
            .finish()
    }
}
