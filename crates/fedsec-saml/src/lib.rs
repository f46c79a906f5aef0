//! SAML message security for federation endpoints.
//!
//! This crate decides whether an inbound SAML message can be trusted, and
//! keeps messages sent by reference until their artifact is redeemed:
//!
//! - **Security policy** - Ordered rule chains evaluated per message, with
//!   issuer consistency checking
//! - **Freshness and replay** - Issue instant windows and replay detection
//! - **Client certificates** - Binding the TLS client certificate to the
//!   issuer's metadata
//! - **Artifact map** - Single-use, expiring, relying-party bound storage
//!   of messages sent by artifact
//!
//! # Architecture
//!
//! - [`policy`] - The evaluation context, rule protocol and built-in rules
//! - [`binding`] - Request abstraction, message fragments and the artifact map
//! - [`security`] - Certificates and trust engines
//! - [`metadata`] - Peer role metadata and lookup
//! - [`types`] - Issuers, artifacts, names and protocol constants
//! - [`config`] - Settings and attribute-style configuration
//! - [`error`] - Error types
//!
//! Storage and replay caching live in `fedsec-storage`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod binding;
pub mod config;
pub mod error;
pub mod metadata;
pub mod policy;
pub mod security;
pub mod types;

pub use error::{SamlError, SamlResult};
pub use policy::{PolicyRule, SecurityPolicy};
pub use types::*;
