// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Player state data model.
//!
//! A data source emits [`PlayerState`] snapshots. Large, rarely-changing
//! pieces (topic list, statistics, block cache, topic sets) are held behind
//! `Arc` so that consumers can detect "unchanged" with `Arc::ptr_eq` instead
//! of a deep comparison.

use crate::time::Time;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A named stream of messages sharing one schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic {
    /// Topic name.
    pub name: String,

    /// Schema identifier (e.g. `foxglove.RawImage`, `sensor_msgs/msg/Image`).
    pub schema_name: String,

    /// Schemas this topic can be converted to, in order of preference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converts_to: Option<Vec<String>>,

    /// Original name, set when this topic was produced by a mapping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_from_name: Option<String>,
}

impl Topic {
    /// Create a new topic.
    pub fn new(name: impl Into<String>, schema_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema_name: schema_name.into(),
            converts_to: None,
            mapped_from_name: None,
        }
    }

    /// Set the convertible-to schema list.
    pub fn converts_to(mut self, schemas: Vec<String>) -> Self {
        self.converts_to = Some(schemas);
        self
    }

    /// Produce a renamed copy carrying a back-reference to this topic.
    pub fn renamed(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            schema_name: self.schema_name.clone(),
            converts_to: self.converts_to.clone(),
            mapped_from_name: Some(self.name.clone()),
        }
    }
}

/// A single decoded message delivered by a data source.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    /// Topic the message was received on.
    pub topic: String,

    /// Schema of the message.
    pub schema_name: String,

    /// Time the source received the message.
    pub receive_time: Time,

    /// Publish time, when the source records one.
    pub publish_time: Option<Time>,

    /// Decoded payload. Shared between fanned-out copies.
    pub message: Arc<Value>,

    /// Serialized size of the message.
    pub size_in_bytes: u64,
}

impl MessageEvent {
    /// Create a new message event.
    pub fn new(
        topic: impl Into<String>,
        schema_name: impl Into<String>,
        receive_time: Time,
        message: Value,
    ) -> Self {
        Self {
            topic: topic.into(),
            schema_name: schema_name.into(),
            receive_time,
            publish_time: None,
            message: Arc::new(message),
            size_in_bytes: 0,
        }
    }

    /// Copy of this event on another topic. The payload is shared.
    pub fn with_topic(&self, topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            ..self.clone()
        }
    }
}

/// One block of a preloaded message cache.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageBlock {
    /// Messages in this block, bucketed by topic.
    pub messages_by_topic: HashMap<String, Vec<MessageEvent>>,

    /// Total size of the block's messages.
    pub size_in_bytes: u64,
}

/// Block-indexed preloaded message cache. `None` blocks are not loaded yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockCache {
    pub blocks: Arc<Vec<Option<MessageBlock>>>,
    pub start_time: Time,
}

/// A loaded time range, as fractions of the source duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressRange {
    pub start: f64,
    pub end: f64,
}

/// Loading progress of a data source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Progress {
    pub fully_loaded_ranges: Option<Vec<ProgressRange>>,
    pub message_cache: Option<BlockCache>,
}

/// Per-topic message statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicStats {
    pub num_messages: u64,
    pub first_message_time: Option<Time>,
    pub last_message_time: Option<Time>,
}

/// Topics keyed by an owner (client, node) id.
pub type TopicSetMap = HashMap<String, HashSet<String>>;

/// Lifecycle of the data source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlayerPresence {
    #[default]
    NotPresent,
    Initializing,
    Buffering,
    Present,
    Reconnecting,
    Error,
}

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertSeverity {
    Info,
    Warn,
    Error,
}

/// A problem reported alongside player state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerAlert {
    pub severity: AlertSeverity,
    pub message: String,
    pub tip: Option<String>,
}

impl PlayerAlert {
    /// Create a warning alert.
    pub fn warn(message: impl Into<String>, tip: impl Into<String>) -> Self {
        Self {
            severity: AlertSeverity::Warn,
            message: message.into(),
            tip: Some(tip.into()),
        }
    }
}

/// State of an active data source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerStateActiveData {
    /// Messages delivered since the previous snapshot.
    pub messages: Vec<MessageEvent>,

    pub total_bytes_received: u64,
    pub start_time: Time,
    pub end_time: Time,
    pub current_time: Time,
    pub is_playing: bool,
    pub speed: f64,

    /// Bumped by the source whenever it seeks.
    pub last_seek_time: u64,

    pub topics: Arc<Vec<Topic>>,
    pub topic_stats: Arc<HashMap<String, TopicStats>>,
    pub published_topics: Option<Arc<TopicSetMap>>,
    pub subscribed_topics: Option<Arc<TopicSetMap>>,
    pub parameters: Option<Arc<HashMap<String, Value>>>,
}

/// A snapshot emitted by a data source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerState {
    pub presence: PlayerPresence,
    pub progress: Progress,
    pub capabilities: Vec<String>,
    pub profile: Option<String>,
    pub player_id: String,
    pub name: Option<String>,
    pub alerts: Vec<PlayerAlert>,
    pub active_data: Option<PlayerStateActiveData>,
}

/// How much of a topic the consumer wants loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreloadType {
    /// Whole-range preload into the block cache.
    Full,
    /// Only messages near the current playback time.
    #[default]
    Partial,
}

/// A consumer's request to receive a topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscribePayload {
    pub topic: String,

    #[serde(default)]
    pub preload_type: PreloadType,

    /// Restrict decoding to these message fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
}

impl SubscribePayload {
    /// Subscribe to a topic with partial preloading.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            preload_type: PreloadType::Partial,
            fields: None,
        }
    }

    /// Set the preload type.
    pub fn preload(mut self, preload_type: PreloadType) -> Self {
        self.preload_type = preload_type;
        self
    }
}

/// A consumer's request to publish on a topic.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvertiseOptions {
    pub topic: String,
    pub schema_name: String,
    pub options: Option<Value>,
}

/// A message to publish.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishPayload {
    pub topic: String,
    pub msg: Value,
}
