//! Binding-side support.
//!
//! What a binding decoder hands to the security layer, and what it uses to
//! send messages by reference:
//!
//! - [`GenericRequest`] / [`HttpRequest`] - The inbound transport request
//! - [`XmlFragment`] - A decoded message element
//! - [`ArtifactMap`] - Single-use storage of messages sent by artifact
//!
//! # Usage
//!
//! ```rust,ignore
//! use fedsec_saml::binding::{ArtifactMap, XmlFragment};
//!
//! let artifact = SamlArtifact::new_type0004(entity_id, 0);
//! map.store_content(XmlFragment::parse(xml)?, &artifact, Some(sp_entity_id)).await?;
//!
//! // later, on the back channel
//! let message = map.retrieve_content(&artifact, Some(requester)).await?;
//! ```

mod artifact_map;
mod content;
mod request;

pub use artifact_map::*;
pub use content::*;
pub use request::*;
