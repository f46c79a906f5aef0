//! Explicit key trust.
//!
//! A credential is trusted when its public key is one the issuer published
//! in metadata. Chains and certificate paths play no part.

use super::{Certificate, CredentialCriteria, X509TrustEngine};
use crate::metadata::RoleDescriptor;

/// Trust engine that matches the leaf key against metadata keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplicitKeyTrustEngine;

impl ExplicitKeyTrustEngine {
    /// Creates the engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl X509TrustEngine for ExplicitKeyTrustEngine {
    fn validate(
        &self,
        leaf: &Certificate,
        _chain: &[Certificate],
        role: &RoleDescriptor,
        criteria: &CredentialCriteria,
    ) -> bool {
        if let Some(peer) = criteria.peer_name.as_deref() {
            if peer != role.entity_id {
                tracing::warn!(
                    peer,
                    entity_id = %role.entity_id,
                    "peer name does not own the supplied role"
                );
                return false;
            }
        }

        let leaf_key = match leaf.public_key_der() {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(error = %e, "unable to extract key from leaf certificate");
                return false;
            }
        };

        let trusted = role
            .certificates_for(criteria.usage)
            .filter_map(|cert| cert.public_key_der().ok())
            .any(|key| key == leaf_key);

        tracing::debug!(
            entity_id = %role.entity_id,
            subject = ?leaf.subject(),
            trusted,
            "explicit key validation"
        );
        trusted
    }
}
