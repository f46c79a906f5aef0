//! Namespaces and identifiers the security layer compares against.

/// `saml` (2.0 assertion) namespace.
pub const SAML20_NS: &str = "urn:oasis:names:tc:SAML:2.0:assertion";
/// `samlp` (2.0 protocol) namespace.
pub const SAML20P_NS: &str = "urn:oasis:names:tc:SAML:2.0:protocol";
/// `md` (2.0 metadata) namespace.
pub const SAML20MD_NS: &str = "urn:oasis:names:tc:SAML:2.0:metadata";

/// `saml` (1.x assertion) namespace.
pub const SAML1_NS: &str = "urn:oasis:names:tc:SAML:1.0:assertion";
/// `samlp` (1.x protocol) namespace. Also the SAML 1.0 protocol enumeration.
pub const SAML1P_NS: &str = "urn:oasis:names:tc:SAML:1.0:protocol";

/// Value advertised in `protocolSupportEnumeration` by SAML 1.0 roles.
pub const SAML10_PROTOCOL_ENUM: &str = SAML1P_NS;
/// Value advertised in `protocolSupportEnumeration` by SAML 1.1 roles.
pub const SAML11_PROTOCOL_ENUM: &str = "urn:oasis:names:tc:SAML:1.1:protocol";

/// Namespace of the `xsi:type` attribute.
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Local names of metadata role elements.
pub mod roles {
    /// `md:IDPSSODescriptor`
    pub const IDP_SSO_DESCRIPTOR: &str = "IDPSSODescriptor";
}

/// `entity` name identifier format URI.
pub const ENTITY_FORMAT: &str = "urn:oasis:names:tc:SAML:2.0:nameid-format:entity";
const PERSISTENT_FORMAT: &str = "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent";
const TRANSIENT_FORMAT: &str = "urn:oasis:names:tc:SAML:2.0:nameid-format:transient";
const EMAIL_FORMAT: &str = "urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress";

/// Name identifier formats an issuer may carry.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NameIdFormat {
    /// The format of a federation entityID.
    Entity,
    /// Opaque identifier stable across sessions.
    Persistent,
    /// One-time opaque identifier.
    Transient,
    /// RFC 2822 mailbox.
    Email,
}

impl NameIdFormat {
    /// The URI carried in a `Format` attribute.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match *self {
            NameIdFormat::Entity => ENTITY_FORMAT,
            NameIdFormat::Persistent => PERSISTENT_FORMAT,
            NameIdFormat::Transient => TRANSIENT_FORMAT,
            NameIdFormat::Email => EMAIL_FORMAT,
        }
    }
}
