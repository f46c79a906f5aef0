//! X.509 certificates presented by peers or published in metadata.

use std::fmt;

use base64::Engine;
use x509_parser::prelude::*;

use crate::error::{SamlError, SamlResult};

/// A DER-encoded X.509 certificate.
///
/// The encoding is checked on construction; accessors re-parse on demand.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Certificate {
    der: Vec<u8>,
}

impl Certificate {
    /// Creates a certificate from DER bytes.
    pub fn from_der(der: impl Into<Vec<u8>>) -> SamlResult<Self> {
        let der = der.into();
        X509Certificate::from_der(&der)
            .map_err(|e| SamlError::Crypto(format!("Failed to parse certificate: {e}")))?;
        Ok(Self { der })
    }

    /// Creates a certificate from a PEM `CERTIFICATE` block.
    pub fn from_pem(pem: &str) -> SamlResult<Self> {
        let der = pem_to_der(pem, "CERTIFICATE")
            .ok_or_else(|| SamlError::Crypto("Invalid certificate PEM".to_string()))?;
        Self::from_der(der)
    }

    /// Creates a certificate from base64 DER, as carried in `ds:X509Certificate`.
    pub fn from_base64(encoded: &str) -> SamlResult<Self> {
        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let der = base64::engine::general_purpose::STANDARD.decode(compact)?;
        Self::from_der(der)
    }

    /// Returns the DER encoding.
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Returns the DER-encoded SubjectPublicKeyInfo.
    pub fn public_key_der(&self) -> SamlResult<Vec<u8>> {
        let (_, cert) = X509Certificate::from_der(&self.der)
            .map_err(|e| SamlError::Crypto(format!("Failed to parse certificate: {e}")))?;
        Ok(cert.public_key().raw.to_vec())
    }

    /// Returns the subject distinguished name, if the certificate parses.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        X509Certificate::from_der(&self.der)
            .ok()
            .map(|(_, cert)| cert.subject().to_string())
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject())
            .field("len", &self.der.len())
            .finish()
    }
}

/// Extracts the DER payload of a PEM block with the given label.
fn pem_to_der(pem: &str, label: &str) -> Option<Vec<u8>> {
    let begin = format!("-----BEGIN {label}-----");
    let end = format!("-----END {label}-----");

    let start = pem.find(&begin)? + begin.len();
    let end_pos = pem[start..].find(&end)? + start;

    let b64_data: String = pem[start..end_pos]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    base64::engine::general_purpose::STANDARD.decode(b64_data).ok()
}
