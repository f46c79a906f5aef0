//! Per-message security policy evaluation context.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use fedsec_storage::{Clock, ReplayCache, SystemClock};

use super::{IssuerMatchingPolicy, PolicyRule, ProtocolMessage, DEFAULT_MATCHING_POLICY};
use crate::binding::GenericRequest;
use crate::config::SecurityConfig;
use crate::error::{SamlError, SamlResult};
use crate::metadata::{MetadataProvider, RoleDescriptor};
use crate::security::X509TrustEngine;
use crate::types::{Issuer, QualifiedName};

/// Evaluation context for one inbound message.
///
/// Holds the collaborators rules need (metadata, trust engine, replay
/// cache), the ordered rule chain, and the facts rules establish about the
/// message: identifier, issue instant, issuer, issuer metadata and whether
/// the issuer has been authenticated.
///
/// A policy is owned by one evaluation at a time. It may be reused for the
/// next message after [`reset`](Self::reset).
pub struct SecurityPolicy {
    metadata_provider: Option<Arc<dyn MetadataProvider>>,
    role: Option<QualifiedName>,
    trust_engine: Option<Arc<dyn X509TrustEngine>>,
    replay_cache: Option<Arc<dyn ReplayCache>>,
    config: SecurityConfig,
    clock: Arc<dyn Clock>,

    validating: bool,
    require_entity_issuer: bool,
    audiences: Vec<String>,
    correlation_id: Option<String>,

    time: Cell<Option<DateTime<Utc>>>,
    message_id: Option<String>,
    issue_instant: Option<DateTime<Utc>>,
    issuer: Option<Issuer>,
    issuer_metadata: Option<Arc<RoleDescriptor>>,
    authenticated: bool,

    matching_policy: Option<Box<dyn IssuerMatchingPolicy>>,
    rules: Vec<Arc<dyn PolicyRule>>,
}

impl SecurityPolicy {
    /// Creates an empty policy with no rules or collaborators.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata_provider: None,
            role: None,
            trust_engine: None,
            replay_cache: None,
            config: SecurityConfig::default(),
            clock: SystemClock::shared(),
            validating: true,
            require_entity_issuer: true,
            audiences: Vec::new(),
            correlation_id: None,
            time: Cell::new(None),
            message_id: None,
            issue_instant: None,
            issuer: None,
            issuer_metadata: None,
            authenticated: false,
            matching_policy: None,
            rules: Vec::new(),
        }
    }

    /// Sets the metadata provider used to resolve issuer roles.
    #[must_use]
    pub fn with_metadata_provider(mut self, provider: Arc<dyn MetadataProvider>) -> Self {
        self.metadata_provider = Some(provider);
        self
    }

    /// Sets the metadata role expected of the issuer.
    #[must_use]
    pub fn with_role(mut self, role: QualifiedName) -> Self {
        self.role = Some(role);
        self
    }

    /// Sets the trust engine.
    #[must_use]
    pub fn with_trust_engine(mut self, engine: Arc<dyn X509TrustEngine>) -> Self {
        self.trust_engine = Some(engine);
        self
    }

    /// Sets the replay cache.
    #[must_use]
    pub fn with_replay_cache(mut self, cache: Arc<dyn ReplayCache>) -> Self {
        self.replay_cache = Some(cache);
        self
    }

    /// Sets global security settings.
    #[must_use]
    pub fn with_config(mut self, config: SecurityConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the clock "now" is read from.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Appends a rule to the chain.
    #[must_use]
    pub fn with_rule(mut self, rule: Arc<dyn PolicyRule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Sets whether rules should schema-validate what they process.
    #[must_use]
    pub const fn with_validating(mut self, validating: bool) -> Self {
        self.validating = validating;
        self
    }

    /// Sets whether issuers must use the entity name format.
    #[must_use]
    pub const fn with_require_entity_issuer(mut self, require: bool) -> Self {
        self.require_entity_issuer = require;
        self
    }

    /// Adds an acceptable audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audiences.push(audience.into());
        self
    }

    /// Runs every rule in order against `message`.
    ///
    /// Rules run regardless of what earlier rules returned; the first error
    /// stops the chain and is returned. Inspect
    /// [`is_authenticated`](Self::is_authenticated) afterwards to learn
    /// whether any rule established trust.
    pub fn evaluate(
        &mut self,
        message: &dyn ProtocolMessage,
        request: Option<&dyn GenericRequest>,
    ) -> SamlResult<()> {
        let rules = self.rules.clone();
        for rule in &rules {
            let applied = rule.evaluate(message, request, self).inspect_err(|e| {
                tracing::warn!(rule = rule.rule_type(), error = %e, "message rejected by policy rule");
            })?;
            tracing::trace!(rule = rule.rule_type(), applied, "policy rule evaluated");
        }
        Ok(())
    }

    /// Clears message-scoped state so the policy can evaluate another message.
    ///
    /// The message identifier, issue instant and cached evaluation time are
    /// always cleared. Unless `message_only` is set, the issuer, issuer
    /// metadata and authentication flag are cleared as well.
    pub fn reset(&mut self, message_only: bool) {
        self.message_id = None;
        self.issue_instant = None;
        self.time.set(None);
        if !message_only {
            self.issuer = None;
            self.issuer_metadata = None;
            self.authenticated = false;
        }
    }

    /// Returns the metadata provider.
    #[must_use]
    pub fn metadata_provider(&self) -> Option<&Arc<dyn MetadataProvider>> {
        self.metadata_provider.as_ref()
    }

    /// Returns the expected issuer role.
    #[must_use]
    pub fn role(&self) -> Option<&QualifiedName> {
        self.role.as_ref()
    }

    /// Returns the trust engine.
    #[must_use]
    pub fn trust_engine(&self) -> Option<&Arc<dyn X509TrustEngine>> {
        self.trust_engine.as_ref()
    }

    /// Returns the replay cache.
    #[must_use]
    pub fn replay_cache(&self) -> Option<&Arc<dyn ReplayCache>> {
        self.replay_cache.as_ref()
    }

    /// Returns the tolerated clock skew.
    #[must_use]
    pub fn clock_skew(&self) -> Duration {
        self.config.clock_skew()
    }

    /// Returns true if rules should schema-validate what they process.
    #[must_use]
    pub const fn is_validating(&self) -> bool {
        self.validating
    }

    /// Returns true if issuers must use the entity name format.
    #[must_use]
    pub const fn require_entity_issuer(&self) -> bool {
        self.require_entity_issuer
    }

    /// Sets whether issuers must use the entity name format.
    pub fn set_require_entity_issuer(&mut self, require: bool) {
        self.require_entity_issuer = require;
    }

    /// Returns the acceptable audiences.
    #[must_use]
    pub fn audiences(&self) -> &[String] {
        &self.audiences
    }

    /// Returns the acceptable audiences for modification.
    pub fn audiences_mut(&mut self) -> &mut Vec<String> {
        &mut self.audiences
    }

    /// Returns the identifier of the request this message responds to.
    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Sets the identifier of the request this message responds to.
    pub fn set_correlation_id(&mut self, id: Option<String>) {
        self.correlation_id = id;
    }

    /// Returns the evaluation time.
    ///
    /// The first call reads the clock; later calls return the same instant
    /// until [`set_time`](Self::set_time) or [`reset`](Self::reset).
    pub fn time(&self) -> DateTime<Utc> {
        if let Some(now) = self.time.get() {
            return now;
        }
        let now = self.clock.now();
        self.time.set(Some(now));
        now
    }

    /// Fixes the evaluation time.
    pub fn set_time(&mut self, time: DateTime<Utc>) {
        self.time.set(Some(time));
    }

    /// Returns the message identifier.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// Sets the message identifier.
    pub fn set_message_id(&mut self, id: Option<String>) {
        self.message_id = id;
    }

    /// Returns the message issue instant.
    #[must_use]
    pub const fn issue_instant(&self) -> Option<DateTime<Utc>> {
        self.issue_instant
    }

    /// Sets the message issue instant.
    pub fn set_issue_instant(&mut self, instant: Option<DateTime<Utc>>) {
        self.issue_instant = instant;
    }

    /// Returns the established issuer.
    #[must_use]
    pub fn issuer(&self) -> Option<&Issuer> {
        self.issuer.as_ref()
    }

    /// Records an issuer claim.
    ///
    /// Once an issuer is established, later claims must match it under the
    /// active matching policy. The first claim must use the entity format
    /// when [`require_entity_issuer`](Self::require_entity_issuer) is set;
    /// accepting it clears any previously resolved issuer metadata.
    pub fn set_issuer(&mut self, issuer: &Issuer) -> SamlResult<()> {
        if let Some(existing) = &self.issuer {
            if !self.matching_policy().matches(Some(existing), Some(issuer)) {
                tracing::error!(expected = %existing, actual = %issuer, "issuer conflict");
                return Err(SamlError::IssuerConflict {
                    expected: existing.to_string(),
                    actual: issuer.to_string(),
                });
            }
            return Ok(());
        }

        if self.require_entity_issuer && !issuer.is_entity() {
            tracing::error!(issuer = %issuer, "non-entity issuer supplied");
            return Err(SamlError::NonEntityIssuer(issuer.to_string()));
        }

        self.issuer = Some(issuer.clone());
        self.issuer_metadata = None;
        Ok(())
    }

    /// Records an issuer claim given only as an entity name.
    ///
    /// An empty name is ignored.
    pub fn set_issuer_name(&mut self, name: &str) -> SamlResult<()> {
        if name.is_empty() {
            return Ok(());
        }

        if let Some(existing) = &self.issuer {
            if !self.matching_policy().matches_name(Some(existing), name) {
                tracing::error!(expected = %existing, actual = name, "issuer conflict");
                return Err(SamlError::IssuerConflict {
                    expected: existing.to_string(),
                    actual: name.to_string(),
                });
            }
            return Ok(());
        }

        self.issuer = Some(Issuer::new(name));
        self.issuer_metadata = None;
        Ok(())
    }

    /// Returns the resolved metadata role of the issuer.
    #[must_use]
    pub fn issuer_metadata(&self) -> Option<&Arc<RoleDescriptor>> {
        self.issuer_metadata.as_ref()
    }

    /// Records the issuer's metadata role.
    ///
    /// Replacing an already recorded role with a different one is a
    /// [`SamlError::MetadataConflict`]. Supplying an equal role keeps the
    /// recorded handle; `None` clears it.
    pub fn set_issuer_metadata(&mut self, role: Option<Arc<RoleDescriptor>>) -> SamlResult<()> {
        let Some(new) = role else {
            self.issuer_metadata = None;
            return Ok(());
        };
        match &self.issuer_metadata {
            None => self.issuer_metadata = Some(new),
            Some(current) if Arc::ptr_eq(current, &new) || **current == *new => {}
            Some(current) => {
                tracing::error!(
                    current = %current.entity_id,
                    supplied = %new.entity_id,
                    "conflicting issuer metadata"
                );
                return Err(SamlError::MetadataConflict);
            }
        }
        Ok(())
    }

    /// Returns true if a rule authenticated the issuer.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Sets the authentication flag.
    pub fn set_authenticated(&mut self, authenticated: bool) {
        self.authenticated = authenticated;
    }

    /// Returns the rule chain.
    #[must_use]
    pub fn rules(&self) -> &[Arc<dyn PolicyRule>] {
        &self.rules
    }

    /// Returns the rule chain for modification.
    pub fn rules_mut(&mut self) -> &mut Vec<Arc<dyn PolicyRule>> {
        &mut self.rules
    }

    /// Returns the active issuer matching policy.
    #[must_use]
    pub fn matching_policy(&self) -> &dyn IssuerMatchingPolicy {
        match &self.matching_policy {
            Some(policy) => &**policy,
            None => &DEFAULT_MATCHING_POLICY,
        }
    }

    /// Installs a custom matching policy, or restores the default with `None`.
    pub fn set_matching_policy(&mut self, policy: Option<Box<dyn IssuerMatchingPolicy>>) {
        self.matching_policy = policy;
    }
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityPolicy")
            .field("role", &self.role)
            .field("rules", &self.rules.iter().map(|r| r.rule_type()).collect::<Vec<_>>())
            .field("message_id", &self.message_id)
            .field("issue_instant", &self.issue_instant)
            .field("issuer", &self.issuer)
            .field("authenticated", &self.authenticated)
            .finish_non_exhaustive()
    }
}
