// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema-namespaced topic keys.
//!
//! The same topic name can carry several schemas over the life of a source,
//! so per-topic render settings and annotation batches are keyed by
//! `percent(topic) ":" percent(schema)`. Percent-encoding escapes `:` in
//! either part, which keeps the key injective.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Namespaced topic errors.
#[derive(Debug, Error)]
pub enum NamespaceError {
    #[error("Missing ':' separator in namespaced topic '{0}'")]
    MissingSeparator(String),

    #[error("Invalid percent-encoding: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Key derived from a `(topic, schema)` pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamespacedTopic(String);

impl NamespacedTopic {
    /// Build the key for a topic and schema.
    pub fn new(topic: &str, schema_name: &str) -> Self {
        Self(format!(
            "{}:{}",
            urlencoding::encode(topic),
            urlencoding::encode(schema_name)
        ))
    }

    /// Wrap an existing key, checking it has a separator.
    pub fn parse(key: impl Into<String>) -> Result<Self, NamespaceError> {
        let key = key.into();
        if !key.contains(':') {
            return Err(NamespaceError::MissingSeparator(key));
        }
        Ok(Self(key))
    }

    /// Recover the topic name.
    pub fn topic_name(&self) -> Result<String, NamespaceError> {
        let (encoded, _) = self
            .0
            .split_once(':')
            .ok_or_else(|| NamespaceError::MissingSeparator(self.0.clone()))?;
        Ok(urlencoding::decode(encoded)?.into_owned())
    }

    /// The raw key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NamespacedTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key for a topic and schema.
pub fn namespace_topic(topic: &str, schema_name: &str) -> NamespacedTopic {
    NamespacedTopic::new(topic, schema_name)
}

/// Topic name of a namespaced key.
pub fn topic_from_namespaced(key: &NamespacedTopic) -> Result<String, NamespaceError> {
    key.topic_name()
}
