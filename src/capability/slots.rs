//! Capability slot table.

use std::fmt;
use std::sync::Arc;

use crate::capability::{Capability, CapabilityKind};

/// One optional implementation per capability kind.
///
/// Filled once while the process is assembled and only read afterwards.
#[derive(Clone, Default)]
pub struct CapabilitySlots {
    pub account_migration: Option<Arc<dyn Capability>>,
    pub cluster: Option<Arc<dyn Capability>>,
    pub compliance: Option<Arc<dyn Capability>>,
    pub data_retention: Option<Arc<dyn Capability>>,
    pub elasticsearch: Option<Arc<dyn Capability>>,
    pub ldap: Option<Arc<dyn Capability>>,
    pub message_export: Option<Arc<dyn Capability>>,
    pub metrics: Option<Arc<dyn Capability>>,
    pub mfa: Option<Arc<dyn Capability>>,
    pub saml: Option<Arc<dyn Capability>>,
}

impl CapabilitySlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `capability` into the slot named by its kind, replacing any
    /// previous occupant.
    pub fn with(mut self, capability: Arc<dyn Capability>) -> Self {
        let kind = capability.kind();
        *self.slot_mut(kind) = Some(capability);
        self
    }

    pub fn get(&self, kind: CapabilityKind) -> Option<&Arc<dyn Capability>> {
        self.slot(kind).as_ref()
    }

    pub fn is_present(&self, kind: CapabilityKind) -> bool {
        self.slot(kind).is_some()
    }

    /// Kinds that currently have an implementation.
    pub fn present(&self) -> Vec<CapabilityKind> {
        CapabilityKind::ALL
            .into_iter()
            .filter(|kind| self.is_present(*kind))
            .collect()
    }

    fn slot(&self, kind: CapabilityKind) -> &Option<Arc<dyn Capability>> {
        match kind {
            CapabilityKind::AccountMigration => &self.account_migration,
            CapabilityKind::Cluster => &self.cluster,
            CapabilityKind::Compliance => &self.compliance,
            CapabilityKind::DataRetention => &self.data_retention,
            CapabilityKind::Elasticsearch => &self.elasticsearch,
            CapabilityKind::Ldap => &self.ldap,
            CapabilityKind::MessageExport => &self.message_export,
            CapabilityKind::Metrics => &self.metrics,
            CapabilityKind::Mfa => &self.mfa,
            CapabilityKind::Saml => &self.saml,
        }
    }

    fn slot_mut(&mut self, kind: CapabilityKind) -> &mut Option<Arc<dyn Capability>> {
        match kind {
            CapabilityKind::AccountMigration => &mut self.account_migration,
            CapabilityKind::Cluster => &mut self.cluster,
            CapabilityKind::Compliance => &mut self.compliance,
            CapabilityKind::DataRetention => &mut self.data_retention,
            CapabilityKind::Elasticsearch => &mut self.elasticsearch,
            CapabilityKind::Ldap => &mut self.ldap,
            CapabilityKind::MessageExport => &mut self.message_export,
            CapabilityKind::Metrics => &mut self.metrics,
            CapabilityKind::Mfa => &mut self.mfa,
            CapabilityKind::Saml => &mut self.saml,
        }
    }
}

impl fmt::Debug for CapabilitySlots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilitySlots")
            .field("present", &self.present())
            .finish()
    }
}
