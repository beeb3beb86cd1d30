// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Lumen player pipeline
//!
//! Stream transformers between a data source (recorded log or live
//! connection) and the panels consuming it.
//!
//! # Features
//!
//! - **Topic Mapping**: Registered mappers rename topics; one source may fan
//!   out to several mapped names
//! - **State Rewriting**: Topics, messages, preloaded blocks, topic statistics
//!   and publisher/subscriber sets are rewritten consistently
//! - **Subscription Pass-through**: Subscriptions on mapped names are inverted
//!   back to the original topics
//! - **Referential Stability**: Unchanged inputs yield the same output `Arc`s
//!
//! # Quick Start
//!
//! ```no_run
//! use lumen_player::{MappingConfig, Player, TopicMappingPlayer};
//!
//! # fn run<P: Player>(source: P) -> Result<(), Box<dyn std::error::Error>> {
//! let config = MappingConfig::from_file("mapping.toml")?;
//! let mut player = TopicMappingPlayer::with_mappers(source, config.build_mappers());
//! while let Some(state) = player.next_state()? {
//!     // hand `state` to consumers
//! #   let _ = state;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod mapping;
pub mod mapping_player;
pub mod player;
pub mod time;
pub mod types;

pub use config::{ConfigError, MapperConfig, MappingConfig, RemapMapper, TopicRemap};
pub use mapping::{
    compute_mapping, map_blocks, map_messages, map_topic_sets, map_topic_stats, map_topics,
    mapper_fn, GlobalVariables, IdentityMemo, InverseMapping, MapperInput, MappingResult,
    SharedMapper, TopicMapper, TopicMapping,
};
pub use mapping_player::{MappingMode, TopicMappingPlayer};
pub use player::{states, Player, PlayerError};
pub use time::Time;
pub use types::{
    AdvertiseOptions, AlertSeverity, BlockCache, MessageBlock, MessageEvent, PlayerAlert,
    PlayerPresence, PlayerState, PlayerStateActiveData, PreloadType, Progress, ProgressRange,
    PublishPayload, SubscribePayload, Topic, TopicSetMap, TopicStats,
};
