//! Unconditional trust.

use crate::binding::GenericRequest;
use crate::error::SamlResult;
use crate::policy::{PolicyRule, ProtocolMessage, SecurityPolicy};

/// Rule type name.
pub const NULL_SECURITY_RULE: &str = "NullSecurity";

/// Marks every message authenticated.
///
/// Only for channels that are trusted by other means, and for testing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSecurityRule;

impl NullSecurityRule {
    /// Creates the rule.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl PolicyRule for NullSecurityRule {
    fn rule_type(&self) -> &'static str {
        NULL_SECURITY_RULE
    }

    fn evaluate(
        &self,
        _message: &dyn ProtocolMessage,
        _request: Option<&dyn GenericRequest>,
        policy: &mut SecurityPolicy,
    ) -> SamlResult<bool> {
        tracing::warn!("security enforced using null policy rule, message accepted without checks");
        policy.set_authenticated(true);
        Ok(true)
    }
}
