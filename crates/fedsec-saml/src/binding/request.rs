//! Transport request abstraction.
//!
//! Rules see the inbound request only through [`GenericRequest`], which
//! covers what any transport can provide. HTTP-specific details are on
//! [`HttpRequest`].

use std::collections::HashMap;

use url::Url;

use crate::error::{SamlError, SamlResult};
use crate::security::Certificate;

/// Transport-independent view of an inbound request.
pub trait GenericRequest: Send + Sync {
    /// Returns the first value of a request parameter.
    fn parameter(&self, name: &str) -> Option<&str>;

    /// Returns every value of a request parameter.
    fn parameters(&self, name: &str) -> Vec<&str>;

    /// Returns the client certificate chain presented at the transport layer,
    /// leaf first. Empty when no certificate was presented.
    fn client_certificates(&self) -> &[Certificate];

    /// Returns the peer address, if known.
    fn remote_addr(&self) -> Option<&str>;

    /// Returns true if the request arrived over a confidential channel.
    fn is_secure(&self) -> bool;
}

/// HTTP request.
pub trait HttpRequest: GenericRequest {
    /// Returns the HTTP method.
    fn method(&self) -> &str;

    /// Returns the full request URL.
    fn request_url(&self) -> &str;

    /// Returns a header value, matching the name case-insensitively.
    fn header(&self, name: &str) -> Option<&str>;
}

/// Concrete request built by a binding from whatever its server hands it.
///
/// Parameters are collected from the URL query string and, if supplied, an
/// `application/x-www-form-urlencoded` body.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: String,
    url: Url,
    headers: HashMap<String, String>,
    parameters: HashMap<String, Vec<String>>,
    client_certificates: Vec<Certificate>,
    remote_addr: Option<String>,
}

impl RequestContext {
    /// Creates a request for `method` on `url`.
    pub fn new(method: impl Into<String>, url: &str) -> SamlResult<Self> {
        let url = Url::parse(url)
            .map_err(|e| SamlError::Configuration(format!("invalid request URL '{url}': {e}")))?;

        let mut parameters: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in url.query_pairs() {
            parameters
                .entry(name.into_owned())
                .or_default()
                .push(value.into_owned());
        }

        Ok(Self {
            method: method.into().to_ascii_uppercase(),
            url,
            headers: HashMap::new(),
            parameters,
            client_certificates: Vec::new(),
            remote_addr: None,
        })
    }

    /// Adds parameters from a form-encoded body.
    #[must_use]
    pub fn with_form_body(mut self, body: &str) -> Self {
        for (name, value) in url::form_urlencoded::parse(body.as_bytes()) {
            self.parameters
                .entry(name.into_owned())
                .or_default()
                .push(value.into_owned());
        }
        self
    }

    /// Sets a header, replacing any previous value.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Appends a certificate to the client chain.
    #[must_use]
    pub fn with_client_certificate(mut self, certificate: Certificate) -> Self {
        self.client_certificates.push(certificate);
        self
    }

    /// Sets the peer address.
    #[must_use]
    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }
}

impl GenericRequest for RequestContext {
    fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    fn parameters(&self, name: &str) -> Vec<&str> {
        self.parameters
            .get(name)
            .map(|values| values.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    fn client_certificates(&self) -> &[Certificate] {
        &self.client_certificates
    }

    fn remote_addr(&self) -> Option<&str> {
        self.remote_addr.as_deref()
    }

    fn is_secure(&self) -> bool {
        self.url.scheme() == "https"
    }
}

impl HttpRequest for RequestContext {
    fn method(&self) -> &str {
        &self.method
    }

    fn request_url(&self) -> &str {
        self.url.as_str()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}
