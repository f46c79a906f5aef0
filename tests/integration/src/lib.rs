//! Shared fixtures for the fedsec end-to-end tests.
//!
//! [`TestEnv`] wires an identity provider's metadata, a replay cache, a
//! storage service and a manually driven clock together, the way a service
//! provider deployment would.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use fedsec_saml::binding::{ArtifactMap, ArtifactMapConfig, RequestContext, XmlFragment};
use fedsec_saml::config::SecurityConfig;
use fedsec_saml::metadata::{RoleDescriptor, StaticMetadataProvider};
use fedsec_saml::policy::rules::{
    ClientCertAuthRule, MessageExtractionRule, MessageFlowConfig, MessageFlowRule,
};
use fedsec_saml::security::{Certificate, CredentialUsage, ExplicitKeyTrustEngine};
use fedsec_saml::types::{roles, QualifiedName, SAML20MD_NS, SAML20P_NS};
use fedsec_saml::SecurityPolicy;
use fedsec_storage::{Clock, ManualClock, MemoryReplayCache, MemoryStorageService};

/// Identity provider entity ID.
pub const IDP_ENTITY_ID: &str = "https://idp.example.org/idp/shibboleth";

/// Service provider entity ID.
pub const SP_ENTITY_ID: &str = "https://sp.example.org/shibboleth";

/// Certificate published by the identity provider.
pub const IDP_CERT_PEM: &str = include_str!("../fixtures/idp.pem");

/// Certificate nobody published.
pub const ROGUE_CERT_PEM: &str = include_str!("../fixtures/other.pem");

/// Clock skew used by the fixtures, in seconds.
pub const SKEW_SECS: u32 = 5;

/// Freshness window used by the fixtures, in seconds.
pub const EXPIRES_SECS: u32 = 60;

/// A service provider's view of one identity provider.
pub struct TestEnv {
    /// Clock shared by every component.
    pub clock: ManualClock,
    /// Metadata holding the identity provider's role.
    pub metadata: Arc<StaticMetadataProvider>,
    /// The identity provider's published role.
    pub idp_role: Arc<RoleDescriptor>,
    /// Replay cache shared across evaluations.
    pub replay_cache: Arc<MemoryReplayCache>,
    /// Storage backing artifact maps.
    pub storage: Arc<MemoryStorageService>,
}

impl TestEnv {
    /// Creates an environment frozen at 2024-03-01T08:00:00Z.
    pub fn new() -> anyhow::Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("fedsec_saml=debug,fedsec_storage=debug")
            .with_test_writer()
            .try_init();

        let clock = ManualClock::new(Self::start());
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());

        let metadata = Arc::new(StaticMetadataProvider::new());
        let idp_role = metadata.add(
            RoleDescriptor::saml2(IDP_ENTITY_ID, roles::IDP_SSO_DESCRIPTOR)
                .with_protocol(SAML20P_NS)
                .with_key(CredentialUsage::Signing, Certificate::from_pem(IDP_CERT_PEM)?),
        );

        Ok(Self {
            replay_cache: Arc::new(MemoryReplayCache::with_clock(Arc::clone(&shared))),
            storage: Arc::new(MemoryStorageService::with_clock(shared)),
            clock,
            metadata,
            idp_role,
        })
    }

    /// Instant the clock starts at.
    #[must_use]
    pub fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0)
            .single()
            .unwrap_or_default()
    }

    /// Returns the shared clock as a trait object.
    #[must_use]
    pub fn shared_clock(&self) -> Arc<dyn Clock> {
        Arc::new(self.clock.clone())
    }

    /// Builds the policy a service provider applies to identity provider
    /// messages: extraction, freshness/replay, then client certificate.
    #[must_use]
    pub fn policy(&self) -> SecurityPolicy {
        SecurityPolicy::new()
            .with_clock(self.shared_clock())
            .with_config(SecurityConfig::default().with_clock_skew_secs(SKEW_SECS))
            .with_metadata_provider(self.metadata.clone())
            .with_role(QualifiedName::new(SAML20MD_NS, roles::IDP_SSO_DESCRIPTOR))
            .with_trust_engine(Arc::new(ExplicitKeyTrustEngine::new()))
            .with_replay_cache(self.replay_cache.clone())
            .with_audience(SP_ENTITY_ID)
            .with_rule(Arc::new(MessageExtractionRule::new()))
            .with_rule(Arc::new(MessageFlowRule::with_config(MessageFlowConfig {
                expires_secs: Some(EXPIRES_SECS),
                ..MessageFlowConfig::default()
            })))
            .with_rule(Arc::new(ClientCertAuthRule::new()))
    }

    /// Builds an artifact map over the shared storage.
    #[must_use]
    pub fn artifact_map(&self, config: ArtifactMapConfig) -> ArtifactMap {
        ArtifactMap::with_config(self.storage.clone(), config).with_clock(self.shared_clock())
    }

    /// Builds a back-channel request presenting `cert_pem` as client
    /// certificate.
    pub fn tls_request(cert_pem: &str) -> anyhow::Result<RequestContext> {
        Ok(
            RequestContext::new("POST", "https://sp.example.org/Shibboleth.sso/SAML2/SOAP")?
                .with_header("Content-Type", "text/xml")
                .with_remote_addr("192.0.2.10")
                .with_client_certificate(Certificate::from_pem(cert_pem)?),
        )
    }

    /// Builds a response from the identity provider.
    pub fn response(id: &str, issued: DateTime<Utc>) -> anyhow::Result<XmlFragment> {
        Self::response_from(IDP_ENTITY_ID, id, issued)
    }

    /// Builds a response claiming to come from `issuer`.
    pub fn response_from(
        issuer: &str,
        id: &str,
        issued: DateTime<Utc>,
    ) -> anyhow::Result<XmlFragment> {
        let xml = format!(
            r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="{id}" Version="2.0" IssueInstant="{}"><saml:Issuer>{issuer}</saml:Issuer><samlp:Status><samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Success"/></samlp:Status></samlp:Response>"#,
            issued.to_rfc3339()
        );
        Ok(XmlFragment::parse(xml)?)
    }

    /// Returns the fixture start time offset by `secs`.
    #[must_use]
    pub fn at(secs: i64) -> DateTime<Utc> {
        Self::start() + Duration::seconds(secs)
    }
}
