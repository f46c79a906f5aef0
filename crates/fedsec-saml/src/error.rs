//! SAML security error types.
//!
//! Errors fall into three groups that callers treat differently:
//!
//! - **Policy violations** reject the message being evaluated and abort the
//!   rule chain (see [`SamlError::is_policy_violation`]).
//! - **Contract violations** signal caller misuse, not bad input.
//! - Everything else reports malformed input or a failing collaborator.

use fedsec_storage::StorageError;
use thiserror::Error;

/// Result type for SAML security operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML security errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// Message was issued after the newest acceptable instant.
    #[error("message rejected, was issued in the future")]
    IssuedInFuture,

    /// Message was issued before the oldest acceptable instant.
    #[error("message expired, was issued too long ago")]
    MessageExpired,

    /// Message identifier was already seen.
    #[error("rejecting replayed message ID ({0})")]
    ReplayDetected(String),

    /// Replay checking was required but no replay cache is configured.
    #[error("message rejected, no replay cache instance available")]
    ReplayCacheUnavailable,

    /// A rule supplied an issuer that conflicts with the one already recorded.
    #[error("an issuer was supplied that conflicts with previous results: expected {expected}, got {actual}")]
    IssuerConflict {
        /// The issuer already recorded.
        expected: String,
        /// The conflicting issuer claim.
        actual: String,
    },

    /// A non-entity issuer was supplied while entity issuers are required.
    #[error("a non-entity issuer was supplied, violating policy: {0}")]
    NonEntityIssuer(String),

    /// A rule supplied issuer metadata that conflicts with previous results.
    #[error("a rule supplied issuer metadata that conflicts with previous results")]
    MetadataConflict,

    /// Client certificate chain failed validation against issuer metadata.
    #[error("client certificate rejected: {0}")]
    TransportCredentialRejected(String),

    /// An artifact was presented by a party it was not issued to.
    #[error("artifact was issued to {expected}, but presented by {actual}")]
    ArtifactTrustViolation {
        /// The relying party the artifact was issued to.
        expected: String,
        /// The party presenting the artifact.
        actual: String,
    },

    /// Caller violated an API precondition.
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// Invalid or unsupported artifact.
    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),

    /// Invalid rule or map configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// Base64 decoding error.
    #[error("base64 decode error: {0}")]
    Base64Decode(String),

    /// Cryptographic operation error.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Storage operation error.
    #[error("storage error: {0}")]
    Storage(String),
}

impl SamlError {
    /// Returns true if this error rejects the message under evaluation.
    #[must_use]
    pub const fn is_policy_violation(&self) -> bool {
        matches!(
            self,
            Self::IssuedInFuture
                | Self::MessageExpired
                | Self::ReplayDetected(_)
                | Self::ReplayCacheUnavailable
                | Self::IssuerConflict { .. }
                | Self::NonEntityIssuer(_)
                | Self::MetadataConflict
                | Self::TransportCredentialRejected(_)
                | Self::ArtifactTrustViolation { .. }
        )
    }

    /// Returns the SAML status code for this error.
    #[must_use]
    pub fn status_code(&self) -> &'static str {
        match self {
            Self::IssuedInFuture
            | Self::MessageExpired
            | Self::ReplayDetected(_)
            | Self::IssuerConflict { .. }
            | Self::NonEntityIssuer(_)
            | Self::MetadataConflict
            | Self::TransportCredentialRejected(_)
            | Self::ArtifactTrustViolation { .. }
            | Self::InvalidArtifact(_)
            | Self::XmlParse(_)
            | Self::Base64Decode(_) => "urn:oasis:names:tc:SAML:2.0:status:Requester",
            _ => "urn:oasis:names:tc:SAML:2.0:status:Responder",
        }
    }

    /// Returns a sub-status code if applicable.
    #[must_use]
    pub fn sub_status_code(&self) -> Option<&'static str> {
        match self {
            Self::TransportCredentialRejected(_) | Self::ArtifactTrustViolation { .. } => {
                Some("urn:oasis:names:tc:SAML:2.0:status:RequestDenied")
            }
            Self::InvalidArtifact(_) => {
                Some("urn:oasis:names:tc:SAML:2.0:status:ResourceNotRecognized")
            }
            _ => None,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidArtifact(_)
            | Self::Base64Decode(_)
            | Self::XmlParse(_)
            | Self::IssuedInFuture
            | Self::MessageExpired
            | Self::ReplayDetected(_) => 400,
            Self::TransportCredentialRejected(_) => 401,
            Self::ArtifactTrustViolation { .. }
            | Self::IssuerConflict { .. }
            | Self::NonEntityIssuer(_)
            | Self::MetadataConflict => 403,
            _ => 500,
        }
    }
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for SamlError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Base64Decode(err.to_string())
    }
}

impl From<StorageError> for SamlError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for SamlError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(format!("record encoding: {err}"))
    }
}
