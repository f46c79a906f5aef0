//! SAML artifacts.
//!
//! An artifact is a small binary reference to a protocol message, sent in
//! place of the message and later resolved by the receiver. Every artifact
//! starts with a two byte type code; the remainder depends on the type:
//!
//! | Type | Layout |
//! |------|--------|
//! | `0x0001` (SAML 1.x) | source ID (20) + assertion handle (20) |
//! | `0x0002` (SAML 1.x) | assertion handle (20) + source location URL |
//! | `0x0004` (SAML 2.0) | endpoint index (2) + source ID (20) + message handle (20) |
//!
//! Source IDs are the SHA-1 digest of the issuing entity's ID.

use std::fmt;

use base64::Engine;
use rand::Rng;
use sha1::{Digest, Sha1};

use crate::error::{SamlError, SamlResult};

/// Length of the artifact type code.
pub const TYPECODE_LENGTH: usize = 2;

/// Length of source IDs.
pub const SOURCE_ID_LENGTH: usize = 20;

/// Length of assertion and message handles.
pub const HANDLE_LENGTH: usize = 20;

/// Type code of SAML 1.x source ID artifacts.
pub const TYPE_0001: [u8; 2] = [0x00, 0x01];

/// Type code of SAML 1.x source location artifacts.
pub const TYPE_0002: [u8; 2] = [0x00, 0x02];

/// Type code of SAML 2.0 artifacts.
pub const TYPE_0004: [u8; 2] = [0x00, 0x04];

/// A parsed SAML artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SamlArtifact {
    /// SAML 1.x type 0x0001.
    Type0001 {
        /// SHA-1 digest of the issuer's entity ID.
        source_id: [u8; SOURCE_ID_LENGTH],
        /// Handle of the referenced assertion.
        assertion_handle: [u8; HANDLE_LENGTH],
    },
    /// SAML 1.x type 0x0002.
    Type0002 {
        /// Handle of the referenced assertion.
        assertion_handle: [u8; HANDLE_LENGTH],
        /// URL of the issuer's artifact resolution service.
        source_location: String,
    },
    /// SAML 2.0 type 0x0004.
    Type0004 {
        /// Index of the issuer's artifact resolution endpoint.
        endpoint_index: u16,
        /// SHA-1 digest of the issuer's entity ID.
        source_id: [u8; SOURCE_ID_LENGTH],
        /// Handle of the referenced message.
        message_handle: [u8; HANDLE_LENGTH],
    },
}

impl SamlArtifact {
    /// Creates a type 0x0001 artifact for an issuer with a fresh random handle.
    #[must_use]
    pub fn new_type0001(entity_id: &str) -> Self {
        Self::Type0001 {
            source_id: source_id(entity_id),
            assertion_handle: random_handle(),
        }
    }

    /// Creates a type 0x0002 artifact with a fresh random handle.
    pub fn new_type0002(source_location: &str) -> SamlResult<Self> {
        Self::type0002_with_handle(source_location, &random_handle())
    }

    /// Creates a type 0x0002 artifact with the given handle.
    pub fn type0002_with_handle(source_location: &str, handle: &[u8]) -> SamlResult<Self> {
        if source_location.is_empty() {
            return Err(SamlError::InvalidArtifact(
                "type 0x0002 artifact requires a source location".to_string(),
            ));
        }
        Ok(Self::Type0002 {
            assertion_handle: handle_from(handle)?,
            source_location: source_location.to_string(),
        })
    }

    /// Creates a type 0x0004 artifact for an issuer with a fresh random handle.
    #[must_use]
    pub fn new_type0004(entity_id: &str, endpoint_index: u16) -> Self {
        Self::Type0004 {
            endpoint_index,
            source_id: source_id(entity_id),
            message_handle: random_handle(),
        }
    }

    /// Creates a type 0x0004 artifact with the given handle.
    pub fn type0004_with_handle(
        entity_id: &str,
        endpoint_index: u16,
        handle: &[u8],
    ) -> SamlResult<Self> {
        Ok(Self::Type0004 {
            endpoint_index,
            source_id: source_id(entity_id),
            message_handle: handle_from(handle)?,
        })
    }

    /// Parses a base64-encoded artifact.
    pub fn parse(encoded: &str) -> SamlResult<Self> {
        let raw = base64::engine::general_purpose::STANDARD.decode(encoded.trim())?;
        Self::from_bytes(&raw)
    }

    /// Decodes an artifact from its raw bytes.
    pub fn from_bytes(raw: &[u8]) -> SamlResult<Self> {
        if raw.len() < TYPECODE_LENGTH {
            return Err(SamlError::InvalidArtifact("artifact too short".to_string()));
        }
        let (type_code, rest) = raw.split_at(TYPECODE_LENGTH);

        match [type_code[0], type_code[1]] {
            TYPE_0001 => {
                expect_len(rest, SOURCE_ID_LENGTH + HANDLE_LENGTH, "0x0001")?;
                let (source, handle) = rest.split_at(SOURCE_ID_LENGTH);
                Ok(Self::Type0001 {
                    source_id: source_id_from(source)?,
                    assertion_handle: handle_from(handle)?,
                })
            }
            TYPE_0002 => {
                if rest.len() <= HANDLE_LENGTH {
                    return Err(SamlError::InvalidArtifact(
                        "type 0x0002 artifact is missing its source location".to_string(),
                    ));
                }
                let (handle, location) = rest.split_at(HANDLE_LENGTH);
                let location = std::str::from_utf8(location).map_err(|e| {
                    SamlError::InvalidArtifact(format!("source location is not UTF-8: {e}"))
                })?;
                Self::type0002_with_handle(location, handle)
            }
            TYPE_0004 => {
                expect_len(rest, 2 + SOURCE_ID_LENGTH + HANDLE_LENGTH, "0x0004")?;
                let (index, rest) = rest.split_at(2);
                let (source, handle) = rest.split_at(SOURCE_ID_LENGTH);
                Ok(Self::Type0004 {
                    endpoint_index: u16::from_be_bytes([index[0], index[1]]),
                    source_id: source_id_from(source)?,
                    message_handle: handle_from(handle)?,
                })
            }
            other => Err(SamlError::InvalidArtifact(format!(
                "unknown artifact type code 0x{}",
                hex::encode(other)
            ))),
        }
    }

    /// Returns the two byte type code.
    #[must_use]
    pub const fn type_code(&self) -> [u8; 2] {
        match self {
            Self::Type0001 { .. } => TYPE_0001,
            Self::Type0002 { .. } => TYPE_0002,
            Self::Type0004 { .. } => TYPE_0004,
        }
    }

    /// Returns the raw artifact bytes.
    #[must_use]
    pub fn bytes(&self) -> Vec<u8> {
        let mut raw = self.type_code().to_vec();
        match self {
            Self::Type0001 {
                source_id,
                assertion_handle,
            } => {
                raw.extend_from_slice(source_id);
                raw.extend_from_slice(assertion_handle);
            }
            Self::Type0002 {
                assertion_handle,
                source_location,
            } => {
                raw.extend_from_slice(assertion_handle);
                raw.extend_from_slice(source_location.as_bytes());
            }
            Self::Type0004 {
                endpoint_index,
                source_id,
                message_handle,
            } => {
                raw.extend_from_slice(&endpoint_index.to_be_bytes());
                raw.extend_from_slice(source_id);
                raw.extend_from_slice(message_handle);
            }
        }
        raw
    }

    /// Returns the base64 encoding used on the wire.
    #[must_use]
    pub fn encode(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.bytes())
    }

    /// Returns the raw bytes in hex notation.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes())
    }

    /// Returns a string identifying the issuer.
    ///
    /// Hex-encoded source ID, or the source location for type 0x0002.
    #[must_use]
    pub fn source(&self) -> String {
        match self {
            Self::Type0001 { source_id, .. } | Self::Type0004 { source_id, .. } => {
                hex::encode(source_id)
            }
            Self::Type0002 {
                source_location, ..
            } => source_location.clone(),
        }
    }

    /// Returns the message or assertion handle.
    #[must_use]
    pub const fn message_handle(&self) -> &[u8; HANDLE_LENGTH] {
        match self {
            Self::Type0001 {
                assertion_handle, ..
            }
            | Self::Type0002 {
                assertion_handle, ..
            } => assertion_handle,
            Self::Type0004 { message_handle, .. } => message_handle,
        }
    }

    /// Returns true if this artifact was issued by `entity_id`.
    ///
    /// Type 0x0002 artifacts carry no source ID and never match.
    #[must_use]
    pub fn is_from(&self, entity_id: &str) -> bool {
        match self {
            Self::Type0001 { source_id: id, .. } | Self::Type0004 { source_id: id, .. } => {
                *id == source_id(entity_id)
            }
            Self::Type0002 { .. } => false,
        }
    }
}

impl fmt::Display for SamlArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Computes the SHA-1 source ID of an entity.
#[must_use]
pub fn source_id(entity_id: &str) -> [u8; SOURCE_ID_LENGTH] {
    Sha1::digest(entity_id.as_bytes()).into()
}

fn random_handle() -> [u8; HANDLE_LENGTH] {
    let mut handle = [0u8; HANDLE_LENGTH];
    rand::rng().fill(&mut handle[..]);
    handle
}

fn expect_len(rest: &[u8], expected: usize, type_name: &str) -> SamlResult<()> {
    if rest.len() == expected {
        Ok(())
    } else {
        Err(SamlError::InvalidArtifact(format!(
            "type {type_name} artifact has {} bytes after the type code, expected {expected}",
            rest.len()
        )))
    }
}

fn handle_from(handle: &[u8]) -> SamlResult<[u8; HANDLE_LENGTH]> {
    handle.try_into().map_err(|_| {
        SamlError::InvalidArtifact(format!(
            "handle must be {HANDLE_LENGTH} bytes, got {}",
            handle.len()
        ))
    })
}

fn source_id_from(source: &[u8]) -> SamlResult<[u8; SOURCE_ID_LENGTH]> {
    source.try_into().map_err(|_| {
        SamlError::InvalidArtifact(format!(
            "source ID must be {SOURCE_ID_LENGTH} bytes, got {}",
            source.len()
        ))
    })
}
