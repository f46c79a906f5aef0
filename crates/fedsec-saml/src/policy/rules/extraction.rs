//! Protocol header extraction.

use crate::binding::GenericRequest;
use crate::error::SamlResult;
use crate::policy::{PolicyRule, ProtocolMessage, SecurityPolicy};

/// Rule type name.
pub const MESSAGE_EXTRACTION_RULE: &str = "MessageExtraction";

/// Copies message identifier, issue instant and issuer into the policy and
/// resolves the issuer's metadata role.
///
/// Usually first in the chain, since the freshness and credential rules
/// work from what it records. It never authenticates anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageExtractionRule;

impl MessageExtractionRule {
    /// Creates the rule.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl PolicyRule for MessageExtractionRule {
    fn rule_type(&self) -> &'static str {
        MESSAGE_EXTRACTION_RULE
    }

    fn evaluate(
        &self,
        message: &dyn ProtocolMessage,
        _request: Option<&dyn GenericRequest>,
        policy: &mut SecurityPolicy,
    ) -> SamlResult<bool> {
        tracing::debug!(element = %message.element_name(), "extracting message details");

        policy.set_message_id(message.message_id().map(String::from));
        policy.set_issue_instant(message.issue_instant());

        let Some(issuer) = message.issuer() else {
            tracing::debug!("message has no issuer");
            return Ok(false);
        };
        policy.set_issuer(issuer)?;

        if policy.issuer_metadata().is_some() {
            tracing::debug!("issuer metadata already resolved");
            return Ok(false);
        }
        if !issuer.is_entity() {
            tracing::debug!(issuer = %issuer, "non-entity issuer, skipping metadata lookup");
            return Ok(false);
        }

        let (Some(provider), Some(role)) = (policy.metadata_provider(), policy.role()) else {
            tracing::debug!("no metadata provider or role configured, skipping metadata lookup");
            return Ok(false);
        };
        let Some(protocol) = message.protocol() else {
            tracing::warn!(element = %message.element_name(), "unable to determine message protocol");
            return Ok(false);
        };

        match provider.role_descriptor(&issuer.name, role, protocol) {
            Some(descriptor) => {
                tracing::debug!(issuer = %issuer.name, role = %role, "resolved issuer metadata");
                policy.set_issuer_metadata(Some(descriptor))?;
            }
            None => {
                tracing::warn!(issuer = %issuer.name, role = %role, protocol, "no metadata found for issuer");
            }
        }
        Ok(false)
    }
}
