//! Namespace-qualified XML names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An XML name qualified by an optional namespace URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Namespace URI, if the name is namespaced.
    pub namespace: Option<String>,
    /// Local part of the name.
    pub local_name: String,
}

impl QualifiedName {
    /// Creates a namespaced name.
    #[must_use]
    pub fn new(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local_name: local_name.into(),
        }
    }

    /// Creates a name with no namespace.
    #[must_use]
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_name: local_name.into(),
        }
    }

    /// Parses a `{namespace}local` or bare `local` name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(rest) = value.strip_prefix('{') {
            let (ns, local) = rest.split_once('}')?;
            if local.is_empty() {
                return None;
            }
            return Some(if ns.is_empty() {
                Self::local(local)
            } else {
                Self::new(ns, local)
            });
        }
        if value.is_empty() {
            None
        } else {
            Some(Self::local(value))
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{ns}}}{}", self.local_name),
            None => f.write_str(&self.local_name),
        }
    }
}
