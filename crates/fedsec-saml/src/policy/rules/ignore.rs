//! Acknowledging otherwise unhandled content.

use std::collections::HashMap;

use crate::binding::GenericRequest;
use crate::config::string_attribute;
use crate::error::{SamlError, SamlResult};
use crate::policy::{PolicyRule, ProtocolMessage, SecurityPolicy};
use crate::types::QualifiedName;

/// Rule type name.
pub const IGNORE_RULE: &str = "Ignore";

/// Marks content of one type as understood without acting on it.
///
/// Used in condition processing, where an unrecognized condition must
/// normally invalidate an assertion: listing the condition's type with this
/// rule lets it through. The schema type is compared when the content has
/// one, otherwise the element name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreRule {
    name: QualifiedName,
}

impl IgnoreRule {
    /// Creates a rule ignoring content named `name`.
    #[must_use]
    pub const fn new(name: QualifiedName) -> Self {
        Self { name }
    }

    /// Creates the rule from a `type` attribute in `{namespace}local` form.
    pub fn from_attributes(attributes: &HashMap<String, String>) -> SamlResult<Self> {
        let raw = string_attribute(attributes, "type").ok_or_else(|| {
            SamlError::Configuration("Ignore rule requires a type attribute".to_string())
        })?;
        QualifiedName::parse(raw)
            .map(Self::new)
            .ok_or_else(|| SamlError::Configuration(format!("invalid type name '{raw}'")))
    }

    /// Returns the ignored name.
    #[must_use]
    pub const fn name(&self) -> &QualifiedName {
        &self.name
    }
}

impl PolicyRule for IgnoreRule {
    fn rule_type(&self) -> &'static str {
        IGNORE_RULE
    }

    fn evaluate(
        &self,
        message: &dyn ProtocolMessage,
        _request: Option<&dyn GenericRequest>,
        _policy: &mut SecurityPolicy,
    ) -> SamlResult<bool> {
        let actual = message.schema_type().unwrap_or_else(|| message.element_name());
        if *actual != self.name {
            return Ok(false);
        }
        tracing::info!(name = %self.name, "ignoring condition");
        Ok(true)
    }
}
