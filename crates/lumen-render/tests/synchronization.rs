// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Mapped player output driving a synchronized image handler.

use lumen_player::{
    mapper_fn, MessageEvent, Player, PlayerError, PlayerState, PlayerStateActiveData,
    SubscribePayload, Time, Topic, TopicMappingPlayer,
};
use lumen_render::{
    migrate_topic_settings, MessageHandler, MessageHandlerConfig, MessageHandlerConfigUpdate,
    NamespacedTopic, RenderState, RendererConfig,
};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

const IMAGE_SCHEMA: &str = "sensor_msgs/msg/Image";
const MARKER_SCHEMA: &str = "visualization_msgs/msg/ImageMarker";
const ANNOTATION_SCHEMA: &str = "foxglove.ImageAnnotations";

#[derive(Default)]
struct ScriptedSource {
    states: VecDeque<PlayerState>,
}

impl Player for ScriptedSource {
    fn next_state(&mut self) -> Result<Option<PlayerState>, PlayerError> {
        Ok(self.states.pop_front())
    }

    fn set_subscriptions(&mut self, _: Vec<SubscribePayload>) -> Result<(), PlayerError> {
        Ok(())
    }
}

fn ros_image(sec: u32) -> Value {
    json!({
        "header": {"stamp": {"sec": sec, "nanosec": 0}, "frame_id": "camera"},
        "height": 1, "width": 1, "encoding": "mono8", "is_bigendian": 0, "step": 1,
        "data": [0]
    })
}

fn ros_marker(sec: u32) -> Value {
    json!({
        "header": {"stamp": {"sec": sec, "nanosec": 0}, "frame_id": "camera"},
        "ns": "", "id": 0, "type": 0, "action": 0,
        "position": {"x": 1.0, "y": 1.0, "z": 0.0}, "scale": 4.0,
        "outline_color": {"r": 1.0, "g": 1.0, "b": 1.0, "a": 1.0},
        "filled": 0, "fill_color": {"r": 0.0, "g": 0.0, "b": 0.0, "a": 0.0},
        "points": [], "outline_colors": []
    })
}

fn foxglove_texts(secs: &[u32]) -> Value {
    let texts: Vec<Value> = secs
        .iter()
        .map(|sec| {
            json!({"timestamp": {"sec": sec, "nsec": 0},
                   "position": {"x": 0.0, "y": 0.0}, "text": format!("t{}", sec)})
        })
        .collect();
    json!({ "texts": texts })
}

fn topics() -> Arc<Vec<Topic>> {
    Arc::new(vec![
        Topic::new("/cam_raw", IMAGE_SCHEMA),
        Topic::new("/detections", MARKER_SCHEMA),
        Topic::new("/labels", ANNOTATION_SCHEMA),
    ])
}

fn state(topics: &Arc<Vec<Topic>>, messages: Vec<MessageEvent>) -> PlayerState {
    PlayerState {
        active_data: Some(PlayerStateActiveData {
            topics: Arc::clone(topics),
            messages,
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn mapped_player(states: Vec<PlayerState>) -> TopicMappingPlayer<ScriptedSource> {
    let mapper = mapper_fn(|_| {
        BTreeMap::from([("/cam_raw".to_string(), "/camera/image".to_string())])
    });
    TopicMappingPlayer::with_mappers(
        ScriptedSource {
            states: states.into(),
        },
        vec![mapper],
    )
}

fn image_stamp(state: &RenderState) -> Option<Time> {
    state.image.as_ref().map(|i| i.stamp)
}

#[test]
fn test_mapped_stream_synchronizes_across_topics() {
    let topics = topics();
    let at = |sec| Time::new(sec, 0);
    let mut player = mapped_player(vec![
        state(
            &topics,
            vec![
                MessageEvent::new("/cam_raw", IMAGE_SCHEMA, at(1), ros_image(1)),
                MessageEvent::new("/detections", MARKER_SCHEMA, at(1), ros_marker(1)),
            ],
        ),
        state(
            &topics,
            vec![
                // Labels for 1 and 2 arrive together, after the newer detection.
                MessageEvent::new("/detections", MARKER_SCHEMA, at(2), ros_marker(2)),
                MessageEvent::new("/labels", ANNOTATION_SCHEMA, at(2), foxglove_texts(&[1, 2])),
            ],
        ),
        state(
            &topics,
            vec![MessageEvent::new("/cam_raw", IMAGE_SCHEMA, at(2), ros_image(2))],
        ),
    ]);

    let visible: BTreeSet<NamespacedTopic> = [
        NamespacedTopic::new("/detections", MARKER_SCHEMA),
        NamespacedTopic::new("/labels", ANNOTATION_SCHEMA),
    ]
    .into_iter()
    .collect();
    let mut handler = MessageHandler::new(MessageHandlerConfig {
        synchronize: true,
        image_topic: Some("/camera/image".into()),
        calibration_topic: None,
        visible_annotations: visible,
    });

    let rendered: Rc<RefCell<Vec<Option<Time>>>> = Rc::default();
    let log = Rc::clone(&rendered);
    handler.add_listener(move |state, _| log.borrow_mut().push(image_stamp(state)));

    let mut after_each_state = Vec::new();
    while let Some(state) = player.next_state().expect("next") {
        for event in &state.active_data.expect("active").messages {
            assert!(handler.handle_message_event(event).expect("decode"));
        }
        after_each_state.push(image_stamp(&handler.get_render_state()));
    }

    assert_eq!(
        after_each_state,
        vec![None, Some(Time::new(1, 0)), Some(Time::new(2, 0))]
    );
    assert_eq!(handler.buffered_times().collect::<Vec<_>>(), vec![Time::new(2, 0)]);
    assert_eq!(rendered.borrow().last(), Some(&Some(Time::new(2, 0))));

    let state = handler.get_render_state();
    let labels = &state.annotations_by_topic[&NamespacedTopic::new("/labels", ANNOTATION_SCHEMA)];
    assert_eq!(labels.len(), 1);
    assert_eq!(labels[0].stamp(), Time::new(2, 0));
}

#[test]
fn test_hiding_a_topic_releases_pending_frame() {
    let topics = topics();
    let mut player = mapped_player(vec![state(
        &topics,
        vec![
            MessageEvent::new("/cam_raw", IMAGE_SCHEMA, Time::new(5, 0), ros_image(5)),
            MessageEvent::new("/detections", MARKER_SCHEMA, Time::new(5, 0), ros_marker(5)),
        ],
    )]);

    let mut handler = MessageHandler::new(MessageHandlerConfig {
        synchronize: true,
        image_topic: Some("/camera/image".into()),
        calibration_topic: None,
        visible_annotations: [
            NamespacedTopic::new("/detections", MARKER_SCHEMA),
            NamespacedTopic::new("/labels", ANNOTATION_SCHEMA),
        ]
        .into_iter()
        .collect(),
    });

    let state = player.next_state().expect("next").expect("state");
    for event in &state.active_data.expect("active").messages {
        handler.handle_message_event(event).expect("decode");
    }
    assert!(handler.get_render_state().image.is_none());

    handler.set_config(MessageHandlerConfigUpdate {
        visible_annotations: Some(
            [NamespacedTopic::new("/detections", MARKER_SCHEMA)]
                .into_iter()
                .collect(),
        ),
        ..Default::default()
    });
    assert_eq!(
        image_stamp(&handler.get_render_state()),
        Some(Time::new(5, 0))
    );
}

#[test]
fn test_settings_migrate_against_mapped_topics() {
    let topics = topics();
    let mut player = mapped_player(vec![state(&topics, vec![])]);
    let mapped_topics = player
        .next_state()
        .expect("next")
        .expect("state")
        .active_data
        .expect("active")
        .topics;

    let config = RendererConfig::from_json_str(
        r#"{"topics": {"/camera/image": {"colorMode": "gray"}, "/cam_raw": {}}}"#,
    )
    .expect("parse");
    let migrated = migrate_topic_settings(&config, &mapped_topics);

    assert_eq!(
        migrated.namespaced_topics[&NamespacedTopic::new("/camera/image", IMAGE_SCHEMA)],
        json!({"colorMode": "gray"})
    );
    // The original name no longer exists after mapping.
    assert!(migrated.topics.contains_key("/cam_raw"));
}
