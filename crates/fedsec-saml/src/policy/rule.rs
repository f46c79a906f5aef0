//! Policy rule protocol.

use super::{ProtocolMessage, SecurityPolicy};
use crate::binding::GenericRequest;
use crate::error::SamlResult;

/// A pluggable step in a [`SecurityPolicy`] evaluation.
///
/// Rules hold only configuration; everything learned about a message is
/// recorded on the policy passed to [`evaluate`](Self::evaluate).
///
/// - Return `Ok(false)` when the rule does not apply or establishes nothing.
/// - Return `Ok(true)` when the rule's check ran and passed. Rules that
///   establish trust in the issuer also call
///   [`SecurityPolicy::set_authenticated`].
/// - Return `Err` to reject the message. The remaining rules are skipped.
pub trait PolicyRule: Send + Sync {
    /// Short name identifying the rule type in configuration and logs.
    fn rule_type(&self) -> &'static str;

    /// Evaluates the rule against a message and the request it arrived on.
    fn evaluate(
        &self,
        message: &dyn ProtocolMessage,
        request: Option<&dyn GenericRequest>,
        policy: &mut SecurityPolicy,
    ) -> SamlResult<bool>;
}
