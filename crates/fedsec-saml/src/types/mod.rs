//! SAML types and data structures.
//!
//! Issuer identities, artifacts, qualified names and protocol constants
//! shared by the policy and binding layers.

mod artifact;
mod constants;
mod issuer;
mod qname;

pub use artifact::*;
pub use constants::*;
pub use issuer::*;
pub use qname::*;
