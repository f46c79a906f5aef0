//! SAML issuer identity.
//!
//! The issuer is the claimed sender of a protocol message or assertion. It is
//! a name identifier whose format defaults to the entity format.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::NameIdFormat;

/// SAML issuer.
///
/// Identifies the entity that sent a message. An absent format means the
/// entity format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Issuer {
    /// The issuer's name, usually an entityID.
    pub name: String,

    /// The format of the name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// The security or administrative domain that qualifies the name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_qualifier: Option<String>,

    /// The service provider's entity ID that qualifies the name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sp_name_qualifier: Option<String>,
}

impl Issuer {
    /// Creates an issuer with the given name and no format.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format: None,
            name_qualifier: None,
            sp_name_qualifier: None,
        }
    }

    /// Creates an issuer with an explicit entity format.
    #[must_use]
    pub fn entity(name: impl Into<String>) -> Self {
        Self::new(name).with_format(NameIdFormat::Entity)
    }

    /// Sets the format for this issuer.
    #[must_use]
    pub fn with_format(mut self, format: NameIdFormat) -> Self {
        self.format = Some(format.uri().to_string());
        self
    }

    /// Sets the format for this issuer from a raw URI.
    #[must_use]
    pub fn with_format_uri(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Sets the name qualifier.
    #[must_use]
    pub fn with_name_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.name_qualifier = Some(qualifier.into());
        self
    }

    /// Sets the SP name qualifier.
    #[must_use]
    pub fn with_sp_name_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.sp_name_qualifier = Some(qualifier.into());
        self
    }

    /// Returns the effective format URI.
    ///
    /// Only an absent format defaults to the entity format. An explicit
    /// empty `Format` is kept as is and names no known format.
    #[must_use]
    pub fn effective_format(&self) -> &str {
        self.format.as_deref().unwrap_or(NameIdFormat::Entity.uri())
    }

    /// Returns true if this issuer names an entity.
    #[must_use]
    pub fn is_entity(&self) -> bool {
        self.effective_format() == NameIdFormat::Entity.uri()
    }
}

impl fmt::Display for Issuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.is_entity() {
            write!(f, " ({})", self.effective_format())?;
        }
        Ok(())
    }
}
