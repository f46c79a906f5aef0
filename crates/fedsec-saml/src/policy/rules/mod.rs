//! Built-in policy rules.

mod client_cert;
mod extraction;
mod ignore;
mod message_flow;
mod null;

use std::collections::HashMap;
use std::sync::Arc;

pub use client_cert::*;
pub use extraction::*;
pub use ignore::*;
pub use message_flow::*;
pub use null::*;

use super::PolicyRule;
use crate::error::{SamlError, SamlResult};

/// Builds a built-in rule from its type name and attribute configuration.
pub fn rule_from_attributes(
    rule_type: &str,
    attributes: &HashMap<String, String>,
) -> SamlResult<Arc<dyn PolicyRule>> {
    let rule: Arc<dyn PolicyRule> = match rule_type {
        MESSAGE_FLOW_RULE => Arc::new(MessageFlowRule::from_attributes(attributes)?),
        CLIENT_CERT_AUTH_RULE => Arc::new(ClientCertAuthRule::from_attributes(attributes)),
        MESSAGE_EXTRACTION_RULE => Arc::new(MessageExtractionRule::new()),
        IGNORE_RULE => Arc::new(IgnoreRule::from_attributes(attributes)?),
        NULL_SECURITY_RULE => Arc::new(NullSecurityRule::new()),
        other => {
            return Err(SamlError::Configuration(format!(
                "unknown policy rule type '{other}'"
            )))
        }
    };
    Ok(rule)
}
