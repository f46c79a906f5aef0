//! Peer metadata.
//!
//! A [`RoleDescriptor`] describes one role (identity provider, service
//! provider, attribute authority, ...) played by an entity, including the
//! protocols it supports and the keys it publishes.

mod provider;

pub use provider::{MetadataProvider, StaticMetadataProvider};

use crate::security::{Certificate, CredentialUsage};
use crate::types::{QualifiedName, SAML20MD_NS};

/// Keys published by a role for a given use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDescriptor {
    /// What the keys may be used for.
    pub usage: CredentialUsage,
    /// Certificates carrying the keys.
    pub certificates: Vec<Certificate>,
}

impl KeyDescriptor {
    /// Creates a descriptor for a single certificate.
    #[must_use]
    pub fn new(usage: CredentialUsage, certificate: Certificate) -> Self {
        Self {
            usage,
            certificates: vec![certificate],
        }
    }
}

/// Metadata for one role played by an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDescriptor {
    /// Owning entity's identifier.
    pub entity_id: String,
    /// Role element name, such as `{md}IDPSSODescriptor`.
    pub role: QualifiedName,
    /// Supported protocol enumeration URIs.
    pub protocols: Vec<String>,
    /// Published keys.
    pub key_descriptors: Vec<KeyDescriptor>,
}

impl RoleDescriptor {
    /// Creates a role with no protocols or keys.
    #[must_use]
    pub fn new(entity_id: impl Into<String>, role: QualifiedName) -> Self {
        Self {
            entity_id: entity_id.into(),
            role,
            protocols: Vec::new(),
            key_descriptors: Vec::new(),
        }
    }

    /// Creates a role named by a local name in the SAML 2.0 metadata namespace.
    #[must_use]
    pub fn saml2(entity_id: impl Into<String>, local_name: &str) -> Self {
        Self::new(entity_id, QualifiedName::new(SAML20MD_NS, local_name))
    }

    /// Adds a supported protocol.
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocols.push(protocol.into());
        self
    }

    /// Adds a published key.
    #[must_use]
    pub fn with_key(mut self, usage: CredentialUsage, certificate: Certificate) -> Self {
        self.key_descriptors.push(KeyDescriptor::new(usage, certificate));
        self
    }

    /// Returns true if the role supports `protocol`.
    #[must_use]
    pub fn supports_protocol(&self, protocol: &str) -> bool {
        self.protocols.iter().any(|p| p == protocol)
    }

    /// Returns the certificates usable for `usage`.
    pub fn certificates_for(&self, usage: CredentialUsage) -> impl Iterator<Item = &Certificate> {
        self.key_descriptors
            .iter()
            .filter(move |kd| kd.usage.permits(usage))
            .flat_map(|kd| kd.certificates.iter())
    }
}
