// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Image/annotation message handler.
//!
//! One handler serves one image panel. Unsynchronized, it keeps the last
//! message of each kind. Synchronized, it buffers images and annotation
//! batches in a timestamp-ordered index and renders the newest timestamp
//! that has an image and a batch for every visible annotation topic.

use crate::namespace::NamespacedTopic;
use crate::normalize::{normalize_annotations, Annotation, CameraCalibration, NormalizedImage};
use crate::wire::{AnnotationMessage, CalibrationMessage, DecodeError, ImageMessage};
use lumen_player::{MessageEvent, Time};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Handler configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHandlerConfig {
    /// Render only fully synchronized timestamps.
    #[serde(default)]
    pub synchronize: bool,

    #[serde(default)]
    pub image_topic: Option<String>,

    #[serde(default)]
    pub calibration_topic: Option<String>,

    /// Annotation topics currently shown.
    #[serde(default)]
    pub visible_annotations: BTreeSet<NamespacedTopic>,
}

/// Partial configuration update. `None` leaves a field untouched;
/// `Some(None)` clears a topic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageHandlerConfigUpdate {
    pub synchronize: Option<bool>,
    pub image_topic: Option<Option<String>>,
    pub calibration_topic: Option<Option<String>>,
    pub visible_annotations: Option<BTreeSet<NamespacedTopic>>,
}

/// What should currently be rendered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderState {
    pub image: Option<Arc<NormalizedImage>>,
    pub camera_info: Option<Arc<CameraCalibration>>,
    pub annotations_by_topic: BTreeMap<NamespacedTopic, Arc<Vec<Annotation>>>,
}

/// Messages buffered for one exact timestamp.
#[derive(Debug, Clone, Default)]
pub struct SynchronizationItem {
    pub image: Option<Arc<NormalizedImage>>,
    pub annotations_by_topic: BTreeMap<NamespacedTopic, Arc<Vec<Annotation>>>,
}

impl SynchronizationItem {
    fn is_empty(&self) -> bool {
        self.image.is_none() && self.annotations_by_topic.is_empty()
    }

    /// An image plus exactly the visible annotation topics.
    fn is_synchronized(&self, visible: &BTreeSet<NamespacedTopic>) -> bool {
        self.image.is_some() && self.annotations_by_topic.keys().eq(visible.iter())
    }
}

/// Handle returned by [`MessageHandler::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Called with `(new_state, previous_state)`.
pub type RenderListener = Box<dyn FnMut(&RenderState, Option<&RenderState>)>;

#[derive(Default)]
struct LastReceived {
    image: Option<Arc<NormalizedImage>>,
    camera_info: Option<Arc<CameraCalibration>>,
    annotations_by_topic: BTreeMap<NamespacedTopic, Arc<Vec<Annotation>>>,
}

/// Synchronizing message handler.
pub struct MessageHandler {
    config: MessageHandlerConfig,
    last_received: LastReceived,
    index: BTreeMap<Time, SynchronizationItem>,
    listeners: Vec<(ListenerId, RenderListener)>,
    next_listener_id: u64,
    last_render_state: Option<RenderState>,
}

impl fmt::Debug for MessageHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageHandler")
            .field("config", &self.config)
            .field("index_len", &self.index.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl MessageHandler {
    pub fn new(config: MessageHandlerConfig) -> Self {
        Self {
            config,
            last_received: LastReceived::default(),
            index: BTreeMap::new(),
            listeners: Vec::new(),
            next_listener_id: 0,
            last_render_state: None,
        }
    }

    pub fn config(&self) -> &MessageHandlerConfig {
        &self.config
    }

    /// Number of buffered timestamps.
    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    /// Buffered timestamps, oldest first.
    pub fn buffered_times(&self) -> impl Iterator<Item = Time> + '_ {
        self.index.keys().copied()
    }

    /// State passed to listeners on the last emission.
    pub fn last_render_state(&self) -> Option<&RenderState> {
        self.last_render_state.as_ref()
    }

    /// Register a listener.
    pub fn add_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&RenderState, Option<&RenderState>) + 'static,
    {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Handle an image message.
    pub fn handle_image(&mut self, message: ImageMessage) {
        let image = Arc::new(NormalizedImage::from(message));

        if self.config.synchronize {
            self.index.entry(image.stamp).or_default().image = Some(Arc::clone(&image));
        }
        self.last_received.image = Some(image);

        self.emit_state();
    }

    /// Handle a calibration message. Calibration is never time-indexed.
    pub fn handle_camera_info(&mut self, message: CalibrationMessage) {
        self.last_received.camera_info = Some(Arc::new(CameraCalibration::from(message)));
        self.emit_state();
    }

    /// Handle an annotation message received on `topic` with `schema_name`.
    ///
    /// Batches for topics outside the visible set are dropped. When
    /// synchronized, the batch is also split by per-annotation timestamp.
    pub fn handle_annotations(
        &mut self,
        topic: &str,
        schema_name: &str,
        message: AnnotationMessage,
    ) {
        let key = NamespacedTopic::new(topic, schema_name);
        if !self.config.visible_annotations.contains(&key) {
            tracing::debug!("Dropping annotations for hidden topic {}", key);
            return;
        }

        let annotations = normalize_annotations(message);
        if !self.config.synchronize {
            self.last_received
                .annotations_by_topic
                .insert(key, Arc::new(annotations));
            self.emit_state();
            return;
        }

        let mut groups: BTreeMap<Time, Vec<Annotation>> = BTreeMap::new();
        for annotation in &annotations {
            groups
                .entry(annotation.stamp())
                .or_default()
                .push(annotation.clone());
        }
        for (stamp, group) in groups {
            self.index
                .entry(stamp)
                .or_default()
                .annotations_by_topic
                .insert(key.clone(), Arc::new(group));
        }
        self.last_received
            .annotations_by_topic
            .insert(key, Arc::new(annotations));

        self.emit_state();
    }

    /// Route a player message to the matching handler.
    ///
    /// Images and calibration are accepted only on the configured topics;
    /// annotations on any topic. Returns `Ok(false)` if the event was ignored.
    pub fn handle_message_event(&mut self, event: &MessageEvent) -> Result<bool, DecodeError> {
        let schema = event.schema_name.as_str();
        let topic = event.topic.as_str();
        let warn_undecodable = |e: DecodeError| {
            tracing::warn!("Undecodable {} message on {}: {}", schema, topic, e);
            e
        };

        if ImageMessage::accepts(schema) && self.config.image_topic.as_deref() == Some(topic) {
            let message =
                ImageMessage::decode(schema, &event.message).map_err(warn_undecodable)?;
            self.handle_image(message);
        } else if CalibrationMessage::accepts(schema)
            && self.config.calibration_topic.as_deref() == Some(topic)
        {
            self.handle_camera_info(
                CalibrationMessage::decode(schema, &event.message).map_err(warn_undecodable)?,
            );
        } else if AnnotationMessage::accepts(schema) {
            let message =
                AnnotationMessage::decode(schema, &event.message).map_err(warn_undecodable)?;
            self.handle_annotations(topic, schema, message);
        } else {
            return Ok(false);
        }

        Ok(true)
    }

    /// Compute the current render state.
    ///
    /// Synchronized, this evicts every index entry older than the winning
    /// timestamp. Without a winner only the calibration is returned.
    pub fn get_render_state(&mut self) -> RenderState {
        if !self.config.synchronize {
            return RenderState {
                image: self.last_received.image.clone(),
                camera_info: self.last_received.camera_info.clone(),
                annotations_by_topic: self.last_received.annotations_by_topic.clone(),
            };
        }

        let visible = &self.config.visible_annotations;
        let winner = self
            .index
            .iter()
            .rev()
            .find(|(_, item)| item.is_synchronized(visible))
            .map(|(stamp, _)| *stamp);

        let mut state = RenderState {
            camera_info: self.last_received.camera_info.clone(),
            ..RenderState::default()
        };

        if let Some(stamp) = winner {
            let before = self.index.len();
            self.index = self.index.split_off(&stamp);
            let evicted = before - self.index.len();
            if evicted > 0 {
                tracing::debug!("Synchronized at {}, evicted {} older entries", stamp, evicted);
            }

            if let Some(item) = self.index.get(&stamp) {
                state.image = item.image.clone();
                state.annotations_by_topic = item.annotations_by_topic.clone();
            }
        }

        state
    }

    /// Apply a partial configuration update.
    ///
    /// Listeners are notified only if something changed.
    pub fn set_config(&mut self, update: MessageHandlerConfigUpdate) {
        let mut changed = false;

        if let Some(synchronize) = update.synchronize {
            if synchronize != self.config.synchronize {
                tracing::debug!("Synchronization {}", if synchronize { "on" } else { "off" });
                self.config.synchronize = synchronize;
                self.index.clear();
                changed = true;
            }
        }

        if let Some(image_topic) = update.image_topic {
            if image_topic != self.config.image_topic {
                tracing::debug!("Image topic changed to {:?}", image_topic);
                self.config.image_topic = image_topic;
                self.last_received.image = None;
                for item in self.index.values_mut() {
                    item.image = None;
                }
                self.index.retain(|_, item| !item.is_empty());
                changed = true;
            }
        }

        if let Some(calibration_topic) = update.calibration_topic {
            if calibration_topic != self.config.calibration_topic {
                tracing::debug!("Calibration topic changed to {:?}", calibration_topic);
                self.config.calibration_topic = calibration_topic;
                self.last_received.camera_info = None;
                changed = true;
            }
        }

        if let Some(visible) = update.visible_annotations {
            if visible != self.config.visible_annotations {
                self.last_received
                    .annotations_by_topic
                    .retain(|key, _| visible.contains(key));
                for item in self.index.values_mut() {
                    item.annotations_by_topic.retain(|key, _| visible.contains(key));
                }
                self.index.retain(|_, item| !item.is_empty());
                self.config.visible_annotations = visible;
                changed = true;
            }
        }

        if changed {
            self.emit_state();
        }
    }

    /// Drop all buffered state. The next emission has no previous state.
    pub fn clear(&mut self) {
        self.last_received = LastReceived::default();
        self.index.clear();
        self.last_render_state = None;
    }

    fn emit_state(&mut self) {
        let state = self.get_render_state();
        let previous = self.last_render_state.take();
        for (_, listener) in &mut self.listeners {
            listener(&state, previous.as_ref());
        }
        self.last_render_state = Some(state);
    }
}
