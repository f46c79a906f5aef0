//! Credential trust evaluation.
//!
//! The policy layer never inspects certificates itself. It hands the peer's
//! chain, the issuer's role metadata and a set of criteria to an
//! [`X509TrustEngine`] and acts on the boolean answer.

mod certificate;
mod explicit_key;

pub use certificate::Certificate;
pub use explicit_key::ExplicitKeyTrustEngine;

use serde::{Deserialize, Serialize};

use crate::metadata::RoleDescriptor;

/// Intended use of a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialUsage {
    /// No particular use; matches any usage.
    #[default]
    Unspecified,
    /// Message or document signing.
    Signing,
    /// TLS client or server authentication.
    Tls,
    /// Key transport or encryption.
    Encryption,
}

impl CredentialUsage {
    /// Returns true if a key published for `self` may be used for `wanted`.
    ///
    /// TLS authentication is a signing operation, so signing keys serve both.
    #[must_use]
    pub const fn permits(self, wanted: Self) -> bool {
        matches!(
            (self, wanted),
            (Self::Unspecified, _)
                | (_, Self::Unspecified)
                | (Self::Signing, Self::Signing | Self::Tls)
                | (Self::Tls, Self::Tls)
                | (Self::Encryption, Self::Encryption)
        )
    }
}

/// Constraints applied when validating a credential.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialCriteria {
    /// Name of the peer the credential must belong to.
    pub peer_name: Option<String>,
    /// Use the credential is being validated for.
    pub usage: CredentialUsage,
}

impl CredentialCriteria {
    /// Creates empty criteria.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the expected peer name.
    #[must_use]
    pub fn with_peer_name(mut self, name: impl Into<String>) -> Self {
        self.peer_name = Some(name.into());
        self
    }

    /// Sets the credential usage.
    #[must_use]
    pub const fn with_usage(mut self, usage: CredentialUsage) -> Self {
        self.usage = usage;
        self
    }
}

/// Validates X.509 credentials against issuer metadata.
pub trait X509TrustEngine: Send + Sync {
    /// Returns true if `leaf` (presented with `chain`) is a trusted credential
    /// for the entity owning `role`.
    fn validate(
        &self,
        leaf: &Certificate,
        chain: &[Certificate],
        role: &RoleDescriptor,
        criteria: &CredentialCriteria,
    ) -> bool;
}
