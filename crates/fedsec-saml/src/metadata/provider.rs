//! Metadata lookup.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::RoleDescriptor;
use crate::types::QualifiedName;

/// Resolves role metadata for entities.
pub trait MetadataProvider: Send + Sync {
    /// Returns the role of type `role` published by `entity_id` that supports
    /// `protocol`, if any.
    fn role_descriptor(
        &self,
        entity_id: &str,
        role: &QualifiedName,
        protocol: &str,
    ) -> Option<Arc<RoleDescriptor>>;
}

/// In-memory metadata provider.
///
/// Holds a fixed set of roles that can be extended after the provider has
/// been shared.
#[derive(Debug, Default)]
pub struct StaticMetadataProvider {
    roles: RwLock<HashMap<(String, QualifiedName), Vec<Arc<RoleDescriptor>>>>,
}

impl StaticMetadataProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a role, returning the shared handle the provider will hand out.
    pub fn add(&self, role: RoleDescriptor) -> Arc<RoleDescriptor> {
        let role = Arc::new(role);
        self.roles
            .write()
            .entry((role.entity_id.clone(), role.role.clone()))
            .or_default()
            .push(Arc::clone(&role));
        role
    }

    /// Adds a role, builder style.
    #[must_use]
    pub fn with_role(self, role: RoleDescriptor) -> Self {
        self.add(role);
        self
    }

    /// Returns the number of roles held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.read().values().map(Vec::len).sum()
    }

    /// Returns true if no roles are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetadataProvider for StaticMetadataProvider {
    fn role_descriptor(
        &self,
        entity_id: &str,
        role: &QualifiedName,
        protocol: &str,
    ) -> Option<Arc<RoleDescriptor>> {
        let roles = self.roles.read();
        let found = roles
            .get(&(entity_id.to_string(), role.clone()))?
            .iter()
            .find(|r| r.supports_protocol(protocol))
            .cloned();
        if found.is_none() {
            tracing::debug!(entity_id, role = %role, protocol, "no role supports protocol");
        }
        found
    }
}
