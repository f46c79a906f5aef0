//! Artifact correlation.
//!
//! When a message is sent by reference, the sender keeps the message in an
//! [`ArtifactMap`] under the artifact it hands out, and the receiver later
//! redeems the artifact for the message over a back channel. Each entry can
//! be redeemed once, expires after a fixed lifetime, and may be bound to the
//! one relying party allowed to redeem it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use fedsec_storage::{Clock, StorageService, SystemClock};
use serde::{Deserialize, Serialize};

use super::XmlFragment;
use crate::config::{string_attribute, u32_attribute};
use crate::error::{SamlError, SamlResult};
use crate::types::SamlArtifact;

/// Storage context used when none is configured.
pub const DEFAULT_CONTEXT: &str = "opensaml::ArtifactMap";

/// Artifact lifetime used when none is configured, in seconds.
pub const DEFAULT_ARTIFACT_TTL_SECS: u32 = 180;

/// Artifact map configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactMapConfig {
    /// Storage context the map's entries live in.
    pub context: String,
    /// Lifetime of a stored entry, in seconds.
    pub artifact_ttl_secs: u32,
}

impl ArtifactMapConfig {
    /// Reads configuration from `context` and `artifactTTL` attributes.
    pub fn from_attributes(attributes: &HashMap<String, String>) -> SamlResult<Self> {
        let mut config = Self::default();
        if let Some(context) = string_attribute(attributes, "context") {
            config.context = context.to_string();
        }
        if let Some(ttl) = u32_attribute(attributes, "artifactTTL")? {
            config.artifact_ttl_secs = ttl;
        }
        Ok(config)
    }

    /// Returns the entry lifetime.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::seconds(i64::from(self.artifact_ttl_secs))
    }
}

impl Default for ArtifactMapConfig {
    fn default() -> Self {
        Self {
            context: DEFAULT_CONTEXT.to_string(),
            artifact_ttl_secs: DEFAULT_ARTIFACT_TTL_SECS,
        }
    }
}

/// Stored form of an entry.
#[derive(Debug, Serialize, Deserialize)]
struct ArtifactRecord {
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    relying_party: Option<String>,
    expires: DateTime<Utc>,
}

/// Single-use, time-bounded map from artifacts to message content.
pub struct ArtifactMap {
    storage: Arc<dyn StorageService>,
    config: ArtifactMapConfig,
    clock: Arc<dyn Clock>,
}

impl ArtifactMap {
    /// Creates a map with default configuration over `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageService>) -> Self {
        Self::with_config(storage, ArtifactMapConfig::default())
    }

    /// Creates a map with the given configuration over `storage`.
    #[must_use]
    pub fn with_config(storage: Arc<dyn StorageService>, config: ArtifactMapConfig) -> Self {
        Self {
            storage,
            config,
            clock: SystemClock::shared(),
        }
    }

    /// Uses `clock` for expiration stamps and checks.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ArtifactMapConfig {
        &self.config
    }

    /// Stores `content` under `artifact`, optionally bound to `relying_party`.
    ///
    /// The content must be detached from any parent document; passing an
    /// attached fragment is a [`SamlError::ContractViolation`].
    pub async fn store_content(
        &self,
        content: XmlFragment,
        artifact: &SamlArtifact,
        relying_party: Option<&str>,
    ) -> SamlResult<()> {
        if let Some(parent) = content.parent() {
            return Err(SamlError::ContractViolation(format!(
                "cannot store artifact content that has a parent ({parent})"
            )));
        }

        let key = storage_key(artifact);
        let expires = self.clock.now() + self.config.ttl();
        let record = ArtifactRecord {
            content: content.into_xml(),
            relying_party: relying_party.filter(|rp| !rp.is_empty()).map(String::from),
            expires,
        };
        let value = serde_json::to_string(&record)?;

        self.storage
            .create(&self.config.context, &key, &value, expires)
            .await?;

        tracing::debug!(
            artifact = %key,
            relying_party = record.relying_party.as_deref().unwrap_or("(any)"),
            %expires,
            "stored content for artifact"
        );
        Ok(())
    }

    /// Redeems `artifact` for its content.
    ///
    /// The entry is removed whether or not redemption succeeds. Returns
    /// `None` for unknown or expired artifacts. Presenting an artifact bound
    /// to a different relying party fails with
    /// [`SamlError::ArtifactTrustViolation`].
    pub async fn retrieve_content(
        &self,
        artifact: &SamlArtifact,
        relying_party: Option<&str>,
    ) -> SamlResult<Option<XmlFragment>> {
        let key = storage_key(artifact);
        let Some(stored) = self.storage.take(&self.config.context, &key).await? else {
            tracing::debug!(artifact = %key, "artifact not found or expired");
            return Ok(None);
        };

        let now = self.clock.now();
        if stored.is_expired(now) {
            tracing::debug!(artifact = %key, "artifact expired");
            return Ok(None);
        }

        let record: ArtifactRecord = serde_json::from_str(&stored.value)?;
        if record.expires <= now {
            tracing::debug!(artifact = %key, "artifact expired");
            return Ok(None);
        }

        if let Some(bound) = record.relying_party {
            let presenter = relying_party.unwrap_or_default();
            if presenter != bound {
                tracing::warn!(
                    artifact = %key,
                    expected = %bound,
                    actual = presenter,
                    "artifact presented by wrong relying party, entry removed"
                );
                return Err(SamlError::ArtifactTrustViolation {
                    expected: bound,
                    actual: if presenter.is_empty() {
                        "(none)".to_string()
                    } else {
                        presenter.to_string()
                    },
                });
            }
        }

        tracing::debug!(artifact = %key, "artifact redeemed");
        XmlFragment::parse(record.content).map(Some)
    }

    /// Returns the relying party `artifact` is bound to, without redeeming it.
    ///
    /// `Some("")` means the artifact is not bound; `None` means it is unknown
    /// or expired.
    pub async fn relying_party(&self, artifact: &SamlArtifact) -> SamlResult<Option<String>> {
        let key = storage_key(artifact);
        let Some(stored) = self.storage.read(&self.config.context, &key).await? else {
            return Ok(None);
        };
        if stored.is_expired(self.clock.now()) {
            return Ok(None);
        }
        let record: ArtifactRecord = serde_json::from_str(&stored.value)?;
        Ok(Some(record.relying_party.unwrap_or_default()))
    }
}

/// Entries are keyed by message handle, which has a fixed length for every
/// artifact type.
fn storage_key(artifact: &SamlArtifact) -> String {
    hex::encode(artifact.message_handle())
}

impl std::fmt::Debug for ArtifactMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactMap")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
