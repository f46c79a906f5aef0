//! Client certificate authentication.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::binding::GenericRequest;
use crate::config::bool_attribute;
use crate::error::{SamlError, SamlResult};
use crate::policy::{PolicyRule, ProtocolMessage, SecurityPolicy};
use crate::security::{CredentialCriteria, CredentialUsage};

/// Rule type name.
pub const CLIENT_CERT_AUTH_RULE: &str = "ClientCertAuth";

/// Client certificate rule configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientCertAuthConfig {
    /// Whether a certificate that fails validation rejects the message.
    ///
    /// When false the rule just declines, leaving later rules free to
    /// authenticate the issuer another way.
    pub error_fatal: bool,
}

impl Default for ClientCertAuthConfig {
    fn default() -> Self {
        Self { error_fatal: true }
    }
}

/// Authenticates the issuer by the TLS client certificate it presented.
///
/// Applies only when the request carries a client certificate chain, the
/// issuer's metadata role is known and the policy has a trust engine.
#[derive(Debug, Clone, Default)]
pub struct ClientCertAuthRule {
    config: ClientCertAuthConfig,
}

impl ClientCertAuthRule {
    /// Creates the rule with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the rule with the given configuration.
    #[must_use]
    pub const fn with_config(config: ClientCertAuthConfig) -> Self {
        Self { config }
    }

    /// Creates the rule from an `errorFatal` attribute.
    #[must_use]
    pub fn from_attributes(attributes: &HashMap<String, String>) -> Self {
        Self::with_config(ClientCertAuthConfig {
            error_fatal: bool_attribute(attributes, "errorFatal", true),
        })
    }
}

impl PolicyRule for ClientCertAuthRule {
    fn rule_type(&self) -> &'static str {
        CLIENT_CERT_AUTH_RULE
    }

    fn evaluate(
        &self,
        _message: &dyn ProtocolMessage,
        request: Option<&dyn GenericRequest>,
        policy: &mut SecurityPolicy,
    ) -> SamlResult<bool> {
        tracing::debug!("evaluating client certificate authentication policy");

        let Some(request) = request else {
            tracing::debug!("ignoring message, no protocol request available");
            return Ok(false);
        };
        let Some(role) = policy.issuer_metadata().cloned() else {
            tracing::debug!("ignoring message, no issuer metadata supplied");
            return Ok(false);
        };
        let Some(engine) = policy.trust_engine().cloned() else {
            tracing::debug!("ignoring message, no trust engine supplied");
            return Ok(false);
        };
        let chain = request.client_certificates();
        let Some(leaf) = chain.first() else {
            tracing::debug!("ignoring message, no client certificates in request");
            return Ok(false);
        };

        let mut criteria = CredentialCriteria::new().with_usage(CredentialUsage::Tls);
        if let Some(issuer) = policy.issuer() {
            criteria = criteria.with_peer_name(issuer.name.clone());
        } else {
            tracing::debug!(
                entity_id = %role.entity_id,
                "no issuer established, validating client certificate without a peer name"
            );
        }

        if !engine.validate(leaf, chain, &role, &criteria) {
            tracing::error!(
                entity_id = %role.entity_id,
                fatal = self.config.error_fatal,
                "unable to verify certificate chain with supplied trust engine"
            );
            if self.config.error_fatal {
                return Err(SamlError::TransportCredentialRejected(format!(
                    "client certificate not trusted for {}",
                    role.entity_id
                )));
            }
            return Ok(false);
        }

        tracing::debug!(entity_id = %role.entity_id, "client certificate verified against message issuer");
        policy.set_authenticated(true);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::binding::{RequestContext, XmlFragment};
    use crate::metadata::RoleDescriptor;
    use crate::security::{Certificate, ExplicitKeyTrustEngine};
    use crate::types::{roles, Issuer};

    const IDP: &str = "https://idp.example.org";
    const IDP_PEM: &str = include_str!("../../../testdata/idp.pem");
    const OTHER_PEM: &str = include_str!("../../../testdata/other.pem");

    fn message() -> XmlFragment {
        XmlFragment::parse(r#"<samlp:ArtifactResolve xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="_r1"/>"#)
            .unwrap()
    }

    fn request(pem: &str) -> RequestContext {
        RequestContext::new("POST", "https://sp.example.org/artifact")
            .unwrap()
            .with_client_certificate(Certificate::from_pem(pem).unwrap())
    }

    fn policy() -> SecurityPolicy {
        let role = RoleDescriptor::saml2(IDP, roles::IDP_SSO_DESCRIPTOR)
            .with_key(CredentialUsage::Signing, Certificate::from_pem(IDP_PEM).unwrap());
        let mut policy = SecurityPolicy::new().with_trust_engine(Arc::new(ExplicitKeyTrustEngine::new()));
        policy.set_issuer(&Issuer::new(IDP)).unwrap();
        policy.set_issuer_metadata(Some(Arc::new(role))).unwrap();
        policy
    }

    #[test]
    fn trusted_certificate_authenticates() {
        let mut policy = policy();
        let request = request(IDP_PEM);
        let rule = ClientCertAuthRule::new();

        assert!(rule.evaluate(&message(), Some(&request), &mut policy).unwrap());
        assert!(policy.is_authenticated());
    }

    #[test]
    fn untrusted_certificate_is_fatal_by_default() {
        let mut policy = policy();
        let request = request(OTHER_PEM);
        let rule = ClientCertAuthRule::new();

        let err = rule
            .evaluate(&message(), Some(&request), &mut policy)
            .unwrap_err();
        assert!(matches!(err, SamlError::TransportCredentialRejected(_)));
        assert!(!policy.is_authenticated());
    }

    #[test]
    fn untrusted_certificate_declines_when_not_fatal() {
        let mut policy = policy();
        let request = request(OTHER_PEM);
        let rule = ClientCertAuthRule::with_config(ClientCertAuthConfig { error_fatal: false });

        assert!(!rule.evaluate(&message(), Some(&request), &mut policy).unwrap());
        assert!(!policy.is_authenticated());
    }

    #[test]
    fn not_applicable_without_prerequisites() {
        let rule = ClientCertAuthRule::new();

        let mut policy = policy();
        assert!(!rule.evaluate(&message(), None, &mut policy).unwrap());

        let bare = RequestContext::new("POST", "https://sp.example.org/artifact").unwrap();
        assert!(!rule.evaluate(&message(), Some(&bare), &mut policy).unwrap());

        let mut no_metadata = SecurityPolicy::new().with_trust_engine(Arc::new(ExplicitKeyTrustEngine::new()));
        let request = request(IDP_PEM);
        assert!(!rule.evaluate(&message(), Some(&request), &mut no_metadata).unwrap());

        let mut no_engine = SecurityPolicy::new();
        no_engine
            .set_issuer_metadata(Some(Arc::new(RoleDescriptor::saml2(IDP, roles::IDP_SSO_DESCRIPTOR))))
            .unwrap();
        assert!(!rule.evaluate(&message(), Some(&request), &mut no_engine).unwrap());
        assert!(!no_engine.is_authenticated());
    }

    #[derive(Default)]
    struct RecordingEngine {
        seen: parking_lot::Mutex<Vec<CredentialCriteria>>,
    }

    impl crate::security::X509TrustEngine for RecordingEngine {
        fn validate(
            &self,
            _leaf: &Certificate,
            _chain: &[Certificate],
            _role: &RoleDescriptor,
            criteria: &CredentialCriteria,
        ) -> bool {
            self.seen.lock().push(criteria.clone());
            true
        }
    }

    #[test]
    fn peer_name_follows_established_issuer() {
        let rule = ClientCertAuthRule::new();
        let request = request(IDP_PEM);
        let role = Arc::new(RoleDescriptor::saml2(IDP, roles::IDP_SSO_DESCRIPTOR));

        let engine = Arc::new(RecordingEngine::default());
        let mut unpinned = SecurityPolicy::new().with_trust_engine(engine.clone());
        unpinned.set_issuer_metadata(Some(role.clone())).unwrap();
        assert!(rule.evaluate(&message(), Some(&request), &mut unpinned).unwrap());

        let mut pinned = SecurityPolicy::new().with_trust_engine(engine.clone());
        pinned.set_issuer(&Issuer::new(IDP)).unwrap();
        pinned.set_issuer_metadata(Some(role)).unwrap();
        assert!(rule.evaluate(&message(), Some(&request), &mut pinned).unwrap());

        let seen = engine.seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].peer_name, None);
        assert_eq!(seen[1].peer_name.as_deref(), Some(IDP));
        assert!(seen.iter().all(|c| c.usage == CredentialUsage::Tls));
    }

    #[test]
    fn error_fatal_attribute() {
        let mut attrs = HashMap::new();
        attrs.insert("errorFatal".to_string(), "false".to_string());
        let rule = ClientCertAuthRule::from_attributes(&attrs);
        assert!(!rule.config.error_fatal);
        assert!(ClientCertAuthRule::from_attributes(&HashMap::new()).config.error_fatal);
    }
}
