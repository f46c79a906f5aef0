//! Protocol message view used by policy rules.

use chrono::{DateTime, Utc};

use crate::types::{Issuer, QualifiedName};

/// Read-only view of a decoded protocol message.
///
/// Rules only need a few header values; how the message was decoded and
/// what else it carries is the binding's concern.
pub trait ProtocolMessage: Send + Sync {
    /// Name of the message element.
    fn element_name(&self) -> &QualifiedName;

    /// Declared schema type (`xsi:type`), if any.
    fn schema_type(&self) -> Option<&QualifiedName>;

    /// Message identifier, if the message carries one.
    fn message_id(&self) -> Option<&str>;

    /// Instant the message was issued at.
    fn issue_instant(&self) -> Option<DateTime<Utc>>;

    /// Claimed sender.
    fn issuer(&self) -> Option<&Issuer>;

    /// Protocol support enumeration the message belongs to.
    fn protocol(&self) -> Option<&str>;
}
