// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Player wrapper that renames topics.
//!
//! [`TopicMappingPlayer`] sits between a data source and its consumers. States
//! pulled from the inner player are rewritten with the current
//! [`TopicMapping`]; subscriptions from the consumer, which name mapped
//! topics, are inverted back to original names before reaching the source.
//! Every other request passes straight through.

use crate::mapping::{
    compute_mapping, map_blocks, map_messages, map_topic_sets, map_topic_stats, map_topics,
    GlobalVariables, IdentityMemo, InverseMapping, SharedMapper, TopicMapping,
};
use crate::player::{Player, PlayerError};
use crate::time::Time;
use crate::types::{
    AdvertiseOptions, MessageBlock, PlayerAlert, PlayerState, PlayerStateActiveData,
    PublishPayload, SubscribePayload, Topic, TopicSetMap, TopicStats,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Whether states are being rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingMode {
    /// No mappers registered: states pass through untouched.
    Skip,
    /// At least one mapper registered.
    Active,
}

/// Mapping computed for one topic list and one mapper/variable generation.
#[derive(Debug)]
struct MappingContext {
    topics: Arc<Vec<Topic>>,
    mapper_generation: u64,
    variables_generation: u64,
    mapping: TopicMapping,
    inverse: InverseMapping,
    alerts: Vec<PlayerAlert>,
}

impl MappingContext {
    fn is_current(&self, topics: &Arc<Vec<Topic>>, mapper_gen: u64, variables_gen: u64) -> bool {
        Arc::ptr_eq(&self.topics, topics)
            && self.mapper_generation == mapper_gen
            && self.variables_generation == variables_gen
    }
}

/// Per-shape output caches, valid for one [`MappingContext`].
#[derive(Debug, Default)]
struct StateMemos {
    topics: IdentityMemo<Vec<Topic>, Arc<Vec<Topic>>>,
    topic_stats: IdentityMemo<HashMap<String, TopicStats>, Arc<HashMap<String, TopicStats>>>,
    blocks: IdentityMemo<Vec<Option<MessageBlock>>, Arc<Vec<Option<MessageBlock>>>>,
    published_topics: IdentityMemo<TopicSetMap, Arc<TopicSetMap>>,
    subscribed_topics: IdentityMemo<TopicSetMap, Arc<TopicSetMap>>,
}

impl StateMemos {
    fn clear(&mut self) {
        self.topics.clear();
        self.topic_stats.clear();
        self.blocks.clear();
        self.published_topics.clear();
        self.subscribed_topics.clear();
    }
}

/// Player proxy applying topic mappings.
pub struct TopicMappingPlayer<P> {
    inner: P,
    mappers: Vec<SharedMapper>,
    mapper_generation: u64,
    variables: GlobalVariables,
    variables_generation: u64,
    context: Option<MappingContext>,
    memos: StateMemos,
    /// Latest consumer subscriptions, in mapped names.
    subscriptions: Vec<SubscribePayload>,
    /// Latest subscriptions received before any topic list was seen.
    pending_subscriptions: Option<Vec<SubscribePayload>>,
    closed: bool,
}

impl<P: Player> TopicMappingPlayer<P> {
    /// Wrap a player. Starts in [`MappingMode::Skip`].
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            mappers: Vec::new(),
            mapper_generation: 0,
            variables: GlobalVariables::new(),
            variables_generation: 0,
            context: None,
            memos: StateMemos::default(),
            subscriptions: Vec::new(),
            pending_subscriptions: None,
            closed: false,
        }
    }

    /// Wrap a player with an initial mapper list.
    pub fn with_mappers(inner: P, mappers: Vec<SharedMapper>) -> Self {
        let mut player = Self::new(inner);
        player.mappers = mappers;
        player
    }

    /// Current mode.
    pub fn mode(&self) -> MappingMode {
        if self.mappers.is_empty() {
            MappingMode::Skip
        } else {
            MappingMode::Active
        }
    }

    /// Mapping in effect for the most recent state, if one was computed.
    pub fn mapping(&self) -> Option<&TopicMapping> {
        self.context.as_ref().map(|c| &c.mapping)
    }

    /// Access the wrapped player.
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Mutable access to the wrapped player.
    pub fn inner_mut(&mut self) -> &mut P {
        &mut self.inner
    }

    /// Replace the registered mappers.
    ///
    /// The cached mapping is invalidated; the next state pulled is mapped with
    /// the new set. Clearing the mappers returns to [`MappingMode::Skip`] and
    /// hands the consumer's subscriptions to the source unmapped.
    pub fn set_mappers(&mut self, mappers: Vec<SharedMapper>) -> Result<(), PlayerError> {
        self.ensure_open()?;
        let was_active = self.mode() == MappingMode::Active;
        self.mappers = mappers;
        self.mapper_generation += 1;

        if self.mode() == MappingMode::Skip {
            self.context = None;
            self.memos.clear();
            if was_active {
                tracing::debug!("Topic mapping disabled, forwarding subscriptions unmapped");
                if let Some(pending) = self.pending_subscriptions.take() {
                    self.subscriptions = pending;
                }
                self.inner.set_subscriptions(self.subscriptions.clone())?;
            }
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), PlayerError> {
        if self.closed {
            Err(PlayerError::Closed)
        } else {
            Ok(())
        }
    }

    /// Build a fresh context for `topics`, resubscribing if the inversion changed.
    fn build_context(
        &mut self,
        topics: &Arc<Vec<Topic>>,
        previous: Option<MappingContext>,
    ) -> Result<MappingContext, PlayerError> {
        let result = compute_mapping(&self.mappers, topics, &self.variables);
        let inverse = result.mapping.invert();
        tracing::debug!(
            "Recomputed topic mapping: {} renamed sources over {} topics",
            result.mapping.len(),
            topics.len()
        );
        self.memos.clear();

        let inverse_changed = match &previous {
            Some(prev) => prev.inverse != inverse,
            None => !inverse.is_empty(),
        };
        if let Some(pending) = self.pending_subscriptions.take() {
            tracing::debug!("Applying {} pending subscriptions", pending.len());
            self.subscriptions = pending;
            self.inner
                .set_subscriptions(inverse.map_subscriptions(&self.subscriptions))?;
        } else if inverse_changed && !self.subscriptions.is_empty() {
            self.inner
                .set_subscriptions(inverse.map_subscriptions(&self.subscriptions))?;
        }

        Ok(MappingContext {
            topics: Arc::clone(topics),
            mapper_generation: self.mapper_generation,
            variables_generation: self.variables_generation,
            mapping: result.mapping,
            inverse,
            alerts: result.alerts,
        })
    }

    fn map_active_data(
        &mut self,
        active: PlayerStateActiveData,
        context: &MappingContext,
    ) -> PlayerStateActiveData {
        let mapping = &context.mapping;
        let memos = &mut self.memos;
        PlayerStateActiveData {
            messages: map_messages(active.messages, mapping),
            topics: memos
                .topics
                .get_or_compute(&active.topics, |t| map_topics(t, mapping)),
            topic_stats: memos
                .topic_stats
                .get_or_compute(&active.topic_stats, |s| map_topic_stats(s, mapping)),
            published_topics: active.published_topics.map(|sets| {
                memos
                    .published_topics
                    .get_or_compute(&sets, |s| map_topic_sets(s, mapping))
            }),
            subscribed_topics: active.subscribed_topics.map(|sets| {
                memos
                    .subscribed_topics
                    .get_or_compute(&sets, |s| map_topic_sets(s, mapping))
            }),
            ..active
        }
    }

    fn process_state(&mut self, mut state: PlayerState) -> Result<PlayerState, PlayerError> {
        // Without topics there is nothing to map against; pending
        // subscriptions stay buffered.
        let Some(active) = state.active_data.take() else {
            return Ok(state);
        };

        let context = match self.context.take() {
            Some(ctx)
                if ctx.is_current(
                    &active.topics,
                    self.mapper_generation,
                    self.variables_generation,
                ) =>
            {
                ctx
            }
            previous => self.build_context(&active.topics, previous)?,
        };

        state.active_data = Some(self.map_active_data(active, &context));
        if let Some(cache) = state.progress.message_cache.as_mut() {
            cache.blocks = self
                .memos
                .blocks
                .get_or_compute(&cache.blocks, |b| map_blocks(b, &context.mapping));
        }
        state.alerts.extend(context.alerts.iter().cloned());

        self.context = Some(context);
        Ok(state)
    }
}

impl<P: Player> Player for TopicMappingPlayer<P> {
    fn next_state(&mut self) -> Result<Option<PlayerState>, PlayerError> {
        self.ensure_open()?;
        let Some(state) = self.inner.next_state()? else {
            return Ok(None);
        };
        if self.mode() == MappingMode::Skip {
            return Ok(Some(state));
        }
        self.process_state(state).map(Some)
    }

    fn set_subscriptions(
        &mut self,
        subscriptions: Vec<SubscribePayload>,
    ) -> Result<(), PlayerError> {
        self.ensure_open()?;
        if self.mode() == MappingMode::Skip {
            self.pending_subscriptions = None;
            self.subscriptions = subscriptions.clone();
            return self.inner.set_subscriptions(subscriptions);
        }

        match &self.context {
            Some(context) => {
                let mapped = context.inverse.map_subscriptions(&subscriptions);
                self.subscriptions = subscriptions;
                self.inner.set_subscriptions(mapped)
            }
            None => {
                tracing::debug!(
                    "No topics seen yet, deferring {} subscriptions",
                    subscriptions.len()
                );
                self.pending_subscriptions = Some(subscriptions);
                Ok(())
            }
        }
    }

    fn set_publishers(&mut self, publishers: Vec<AdvertiseOptions>) -> Result<(), PlayerError> {
        self.ensure_open()?;
        self.inner.set_publishers(publishers)
    }

    fn publish(&mut self, payload: PublishPayload) -> Result<(), PlayerError> {
        self.ensure_open()?;
        self.inner.publish(payload)
    }

    fn call_service(&mut self, service: &str, request: Value) -> Result<Value, PlayerError> {
        self.ensure_open()?;
        self.inner.call_service(service, request)
    }

    fn set_parameter(&mut self, key: &str, value: Value) -> Result<(), PlayerError> {
        self.ensure_open()?;
        self.inner.set_parameter(key, value)
    }

    fn start_playback(&mut self) -> Result<(), PlayerError> {
        self.ensure_open()?;
        self.inner.start_playback()
    }

    fn pause_playback(&mut self) -> Result<(), PlayerError> {
        self.ensure_open()?;
        self.inner.pause_playback()
    }

    fn seek_playback(&mut self, time: Time) -> Result<(), PlayerError> {
        self.ensure_open()?;
        self.inner.seek_playback(time)
    }

    fn play_until(&mut self, time: Time) -> Result<(), PlayerError> {
        self.ensure_open()?;
        self.inner.play_until(time)
    }

    fn set_playback_speed(&mut self, speed: f64) -> Result<(), PlayerError> {
        self.ensure_open()?;
        self.inner.set_playback_speed(speed)
    }

    /// Update variable bindings. The mapping is recomputed on the next state
    /// only if the bindings actually changed.
    fn set_global_variables(&mut self, variables: &GlobalVariables) -> Result<(), PlayerError> {
        self.ensure_open()?;
        if &self.variables != variables {
            self.variables = variables.clone();
            self.variables_generation += 1;
        }
        self.inner.set_global_variables(variables)
    }

    fn close(&mut self) -> Result<(), PlayerError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.context = None;
        self.memos.clear();
        self.pending_subscriptions = None;
        self.inner.close()
    }
}
