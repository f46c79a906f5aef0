//! Message security policy.
//!
//! A [`SecurityPolicy`] runs an ordered chain of [`PolicyRule`]s over one
//! decoded message. Rules record what they learn (issuer, identifier, issue
//! instant, issuer metadata) on the policy, reject the message by returning
//! an error, and mark the issuer authenticated when they have grounds to.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fedsec_saml::policy::{rules::*, SecurityPolicy};
//!
//! let mut policy = SecurityPolicy::new()
//!     .with_metadata_provider(metadata)
//!     .with_role(idp_role)
//!     .with_trust_engine(Arc::new(ExplicitKeyTrustEngine::new()))
//!     .with_replay_cache(replay_cache)
//!     .with_rule(Arc::new(MessageExtractionRule::new()))
//!     .with_rule(Arc::new(MessageFlowRule::new()))
//!     .with_rule(Arc::new(ClientCertAuthRule::new()));
//!
//! policy.evaluate(&message, Some(&request))?;
//! if !policy.is_authenticated() {
//!     // fall back to message signature checks
//! }
//! ```

mod context;
mod matching;
mod message;
mod rule;
pub mod rules;

pub use context::SecurityPolicy;
pub use matching::{DefaultIssuerMatchingPolicy, IssuerMatchingPolicy, DEFAULT_MATCHING_POLICY};
pub use message::ProtocolMessage;
pub use rule::PolicyRule;
