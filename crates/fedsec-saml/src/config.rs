//! Security layer configuration.
//!
//! Components are configured either from serde-deserialized structs or from
//! attribute-style key/value maps, as found on rule and map declarations in
//! deployment descriptors.

use std::collections::HashMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{SamlError, SamlResult};

/// Default clock skew tolerated between peers, in seconds.
pub const DEFAULT_CLOCK_SKEW_SECS: u32 = 180;

/// Process-wide security settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Tolerated clock skew between peers, in seconds.
    pub clock_skew_secs: u32,
}

impl SecurityConfig {
    /// Returns the clock skew as a duration.
    #[must_use]
    pub fn clock_skew(&self) -> Duration {
        Duration::seconds(i64::from(self.clock_skew_secs))
    }

    /// Sets the clock skew.
    #[must_use]
    pub const fn with_clock_skew_secs(mut self, secs: u32) -> Self {
        self.clock_skew_secs = secs;
        self
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            clock_skew_secs: DEFAULT_CLOCK_SKEW_SECS,
        }
    }
}

/// Reads a boolean attribute.
///
/// Anything other than `false`, `f` or `0` (case-insensitive) is true.
#[must_use]
pub fn bool_attribute(attributes: &HashMap<String, String>, name: &str, default: bool) -> bool {
    match attributes.get(name).map(|v| v.trim()) {
        None | Some("") => default,
        Some(value) => !matches!(value.to_ascii_lowercase().as_str(), "false" | "f" | "0"),
    }
}

/// Reads a non-negative integer attribute.
pub fn u32_attribute(attributes: &HashMap<String, String>, name: &str) -> SamlResult<Option<u32>> {
    match attributes.get(name).map(|v| v.trim()) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|_| {
            SamlError::Configuration(format!("attribute {name} must be a non-negative integer, got '{value}'"))
        }),
    }
}

/// Reads a string attribute, treating empty values as absent.
#[must_use]
pub fn string_attribute<'a>(attributes: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    attributes
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}
