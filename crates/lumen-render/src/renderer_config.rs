// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Persisted renderer settings and their topic-key migration.
//!
//! Version 1 keyed per-topic settings by topic name. Version 2 keys them by
//! [`NamespacedTopic`], so a topic that changes schema does not inherit
//! settings meant for another message type. Entries move one at a time as
//! topic metadata becomes available.

use crate::namespace::NamespacedTopic;
use lumen_player::Topic;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Renderer config errors.
#[derive(Debug, Error)]
pub enum RendererConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Schemas the renderer draws natively.
pub const SUPPORTED_SCHEMAS: &[&str] = &[
    "foxglove.CameraCalibration",
    "foxglove.CompressedImage",
    "foxglove.FrameTransform",
    "foxglove.FrameTransforms",
    "foxglove.Grid",
    "foxglove.ImageAnnotations",
    "foxglove.LaserScan",
    "foxglove.PointCloud",
    "foxglove.PoseInFrame",
    "foxglove.PosesInFrame",
    "foxglove.RawImage",
    "foxglove.SceneUpdate",
    "sensor_msgs/CameraInfo",
    "sensor_msgs/CompressedImage",
    "sensor_msgs/Image",
    "sensor_msgs/LaserScan",
    "sensor_msgs/PointCloud2",
    "sensor_msgs/msg/CameraInfo",
    "sensor_msgs/msg/CompressedImage",
    "sensor_msgs/msg/Image",
    "sensor_msgs/msg/LaserScan",
    "sensor_msgs/msg/PointCloud2",
    "std_msgs/String",
    "std_msgs/msg/String",
];

/// Check if the renderer draws a schema natively.
pub fn is_supported_schema(schema_name: &str) -> bool {
    SUPPORTED_SCHEMAS.contains(&schema_name)
}

fn default_version() -> u32 {
    1
}

/// Persisted renderer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RendererConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Legacy settings keyed by topic name.
    #[serde(default)]
    pub topics: BTreeMap<String, Value>,

    /// Settings keyed by namespaced topic.
    #[serde(default)]
    pub namespaced_topics: BTreeMap<NamespacedTopic, Value>,

    /// Fields this crate does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RendererConfig {
    pub fn from_json_str(content: &str) -> Result<Self, RendererConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RendererConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn to_json_string(&self) -> Result<String, RendererConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Move legacy topic settings to namespaced keys using [`SUPPORTED_SCHEMAS`].
pub fn migrate_topic_settings<'a>(
    config: &'a RendererConfig,
    topics: &[Topic],
) -> Cow<'a, RendererConfig> {
    migrate_topic_settings_with(config, topics, is_supported_schema)
}

/// Move legacy topic settings to namespaced keys.
///
/// A legacy entry moves when its topic is known and either its schema or one
/// of its `converts_to` schemas (first supported one wins) is supported.
/// Other entries stay put. Returns the input untouched when nothing moved.
pub fn migrate_topic_settings_with<'a, F>(
    config: &'a RendererConfig,
    topics: &[Topic],
    is_supported: F,
) -> Cow<'a, RendererConfig>
where
    F: Fn(&str) -> bool,
{
    if topics.is_empty() || config.topics.is_empty() {
        return Cow::Borrowed(config);
    }

    let by_name: BTreeMap<&str, &Topic> = topics.iter().map(|t| (t.name.as_str(), t)).collect();

    let moves: Vec<(&String, NamespacedTopic)> = config
        .topics
        .keys()
        .filter_map(|name| {
            let topic = by_name.get(name.as_str())?;
            let schema = if is_supported(&topic.schema_name) {
                topic.schema_name.as_str()
            } else {
                topic
                    .converts_to
                    .as_deref()?
                    .iter()
                    .map(String::as_str)
                    .find(|&s| is_supported(s))?
            };
            Some((name, NamespacedTopic::new(name, schema)))
        })
        .collect();

    if moves.is_empty() {
        return Cow::Borrowed(config);
    }

    let mut migrated = config.clone();
    for (name, key) in moves {
        if let Some(settings) = migrated.topics.remove(name) {
            tracing::debug!("Migrated settings for {} to {}", name, key);
            migrated.namespaced_topics.insert(key, settings);
        }
    }
    migrated.version = 2;
    Cow::Owned(migrated)
}
