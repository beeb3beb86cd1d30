// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Lumen render-side message handling
//!
//! Turns the mapped message stream into what an image panel draws.
//!
//! # Features
//!
//! - **Wire Normalization**: ROS and Foxglove image, calibration and
//!   annotation messages converge on one canonical shape each
//! - **Synchronization**: Render only timestamps where the image and every
//!   visible annotation topic are present
//! - **Namespaced Topics**: Settings and annotations keyed by `(topic, schema)`
//! - **Config Migration**: Legacy topic-name settings move to namespaced keys
//!
//! # Quick Start
//!
//! ```no_run
//! use lumen_render::{MessageHandler, MessageHandlerConfig};
//!
//! # fn feed(events: Vec<lumen_player::MessageEvent>) -> Result<(), lumen_render::DecodeError> {
//! let mut handler = MessageHandler::new(MessageHandlerConfig {
//!     synchronize: true,
//!     image_topic: Some("/camera/image".into()),
//!     ..Default::default()
//! });
//! handler.add_listener(|state, _previous| {
//!     println!("image: {:?}", state.image.as_ref().map(|i| i.stamp));
//! });
//! for event in &events {
//!     handler.handle_message_event(event)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod handler;
pub mod namespace;
pub mod normalize;
pub mod renderer_config;
pub mod wire;

pub use handler::{
    ListenerId, MessageHandler, MessageHandlerConfig, MessageHandlerConfigUpdate, RenderListener,
    RenderState, SynchronizationItem,
};
pub use namespace::{namespace_topic, topic_from_namespaced, NamespaceError, NamespacedTopic};
pub use normalize::{
    normalize_annotations, Annotation, CameraCalibration, Color, ImageData, NormalizedImage,
    Point2, PointsStyle,
};
pub use renderer_config::{
    is_supported_schema, migrate_topic_settings, migrate_topic_settings_with, RendererConfig,
    RendererConfigError, SUPPORTED_SCHEMAS,
};
pub use wire::{AnnotationMessage, CalibrationMessage, DecodeError, ImageMessage};
