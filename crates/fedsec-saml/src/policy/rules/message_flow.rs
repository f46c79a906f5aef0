//! Message freshness and replay detection.

use std::collections::HashMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::binding::GenericRequest;
use crate::config::{bool_attribute, string_attribute, u32_attribute};
use crate::error::{SamlError, SamlResult};
use crate::policy::{PolicyRule, ProtocolMessage, SecurityPolicy};

/// Rule type name.
pub const MESSAGE_FLOW_RULE: &str = "MessageFlow";

/// Namespace message identifiers are recorded under in the replay cache.
pub const DEFAULT_REPLAY_CONTEXT: &str = "SAML";

/// What to do when replay checking is on but the policy has no replay cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingReplayCache {
    /// Reject the message.
    #[default]
    Reject,
    /// Log and skip the replay check.
    Skip,
}

/// Message flow rule configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageFlowConfig {
    /// Whether message identifiers are checked for replay.
    pub check_replay: bool,
    /// How long after issue (beyond clock skew) a message stays acceptable,
    /// in seconds. Defaults to the policy's clock skew.
    pub expires_secs: Option<u32>,
    /// Behaviour when no replay cache is available.
    pub missing_replay_cache: MissingReplayCache,
    /// Replay cache namespace.
    pub replay_context: String,
}

impl Default for MessageFlowConfig {
    fn default() -> Self {
        Self {
            check_replay: true,
            expires_secs: None,
            missing_replay_cache: MissingReplayCache::default(),
            replay_context: DEFAULT_REPLAY_CONTEXT.to_string(),
        }
    }
}

impl MessageFlowConfig {
    /// Reads configuration from `checkReplay`, `expires` and
    /// `missingReplayCache` attributes.
    pub fn from_attributes(attributes: &HashMap<String, String>) -> SamlResult<Self> {
        let missing_replay_cache = match string_attribute(attributes, "missingReplayCache") {
            None => MissingReplayCache::default(),
            Some(v) if v.eq_ignore_ascii_case("reject") => MissingReplayCache::Reject,
            Some(v) if v.eq_ignore_ascii_case("skip") => MissingReplayCache::Skip,
            Some(v) => {
                return Err(SamlError::Configuration(format!(
                    "missingReplayCache must be 'reject' or 'skip', got '{v}'"
                )))
            }
        };

        Ok(Self {
            check_replay: bool_attribute(attributes, "checkReplay", true),
            expires_secs: u32_attribute(attributes, "expires")?,
            missing_replay_cache,
            ..Self::default()
        })
    }
}

/// Rejects stale, future-dated and replayed messages.
///
/// A message is fresh if it was issued no later than `now + skew` and no
/// earlier than `now - skew - expires`. Fresh messages with an identifier
/// are then recorded in the replay cache until they could no longer pass
/// the freshness check; a second sighting in that window is a replay.
#[derive(Debug, Clone, Default)]
pub struct MessageFlowRule {
    config: MessageFlowConfig,
}

impl MessageFlowRule {
    /// Creates the rule with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the rule with the given configuration.
    #[must_use]
    pub const fn with_config(config: MessageFlowConfig) -> Self {
        Self { config }
    }

    /// Creates the rule from attribute-style configuration.
    pub fn from_attributes(attributes: &HashMap<String, String>) -> SamlResult<Self> {
        MessageFlowConfig::from_attributes(attributes).map(Self::with_config)
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &MessageFlowConfig {
        &self.config
    }

    fn expires(&self, policy: &SecurityPolicy) -> Duration {
        self.config
            .expires_secs
            .map_or_else(|| policy.clock_skew(), |secs| Duration::seconds(i64::from(secs)))
    }
}

impl PolicyRule for MessageFlowRule {
    fn rule_type(&self) -> &'static str {
        MESSAGE_FLOW_RULE
    }

    fn evaluate(
        &self,
        _message: &dyn ProtocolMessage,
        _request: Option<&dyn GenericRequest>,
        policy: &mut SecurityPolicy,
    ) -> SamlResult<bool> {
        let now = policy.time();
        let skew = policy.clock_skew();
        let expires = self.expires(policy);

        tracing::debug!(
            check_replay = self.config.check_replay,
            expires_secs = expires.num_seconds(),
            "evaluating message flow policy"
        );

        let issue_instant = match policy.issue_instant() {
            Some(issued) => {
                let newest = now + skew;
                let oldest = now - skew - expires;
                if issued > newest {
                    tracing::error!(%issued, %newest, "rejected not-yet-valid message");
                    return Err(SamlError::IssuedInFuture);
                }
                if issued < oldest {
                    tracing::error!(%issued, %oldest, "rejected expired message");
                    return Err(SamlError::MessageExpired);
                }
                issued
            }
            None => {
                tracing::debug!("no issue instant available, freshness not checked");
                now
            }
        };

        if !self.config.check_replay {
            return Ok(false);
        }

        let Some(id) = policy.message_id().filter(|id| !id.is_empty()) else {
            tracing::debug!("message has no identifier, replay not checked");
            return Ok(false);
        };

        let Some(cache) = policy.replay_cache() else {
            return match self.config.missing_replay_cache {
                MissingReplayCache::Reject => {
                    tracing::error!("replay check required but no replay cache available");
                    Err(SamlError::ReplayCacheUnavailable)
                }
                MissingReplayCache::Skip => {
                    tracing::warn!("no replay cache available, skipping requested replay check");
                    Ok(false)
                }
            };
        };

        let retain_until = issue_instant + skew + expires;
        if !cache.check(&self.config.replay_context, id, retain_until)? {
            tracing::error!(message_id = id, "replay detected");
            return Err(SamlError::ReplayDetected(id.to_string()));
        }

        Ok(true)
    }
}
