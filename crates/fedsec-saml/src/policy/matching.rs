//! Issuer identity comparison.

use crate::types::{Issuer, NameIdFormat};

/// Decides whether two issuer claims name the same principal.
///
/// Both methods have default implementations; a deployment that needs
/// looser or stricter comparison overrides one or both and installs the
/// policy with [`SecurityPolicy::set_matching_policy`].
///
/// [`SecurityPolicy::set_matching_policy`]: super::SecurityPolicy::set_matching_policy
pub trait IssuerMatchingPolicy: Send + Sync {
    /// Compares an established issuer with a new claim.
    ///
    /// A missing value on either side matches. Otherwise name, format,
    /// name qualifier and SP name qualifier must all agree, with an absent
    /// format read as the entity format and absent qualifiers as empty. An
    /// explicit empty format is compared as written.
    fn matches(&self, existing: Option<&Issuer>, candidate: Option<&Issuer>) -> bool {
        let (Some(a), Some(b)) = (existing, candidate) else {
            return true;
        };

        a.name == b.name
            && a.effective_format() == b.effective_format()
            && qualifier(a.name_qualifier.as_deref()) == qualifier(b.name_qualifier.as_deref())
            && qualifier(a.sp_name_qualifier.as_deref())
                == qualifier(b.sp_name_qualifier.as_deref())
    }

    /// Compares an established issuer with a bare name.
    ///
    /// A bare name implies the entity format and no qualifiers, so an
    /// established issuer with any qualifier never matches.
    fn matches_name(&self, existing: Option<&Issuer>, name: &str) -> bool {
        let Some(a) = existing else {
            return true;
        };
        if name.is_empty() {
            return true;
        }

        a.name == name
            && a.effective_format() == NameIdFormat::Entity.uri()
            && qualifier(a.name_qualifier.as_deref()).is_empty()
            && qualifier(a.sp_name_qualifier.as_deref()).is_empty()
    }
}

fn qualifier(value: Option<&str>) -> &str {
    value.unwrap_or_default()
}

/// Matching policy using the default comparisons.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultIssuerMatchingPolicy;

impl IssuerMatchingPolicy for DefaultIssuerMatchingPolicy {}

/// Shared default matching policy.
pub static DEFAULT_MATCHING_POLICY: DefaultIssuerMatchingPolicy = DefaultIssuerMatchingPolicy;
