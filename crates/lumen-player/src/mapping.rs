// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Topic mapping engine.
//!
//! Registered [`TopicMapper`]s each propose a partial `source -> target`
//! renaming. [`compute_mapping`] merges the proposals into one
//! [`TopicMapping`] (a source may fan out to several targets), and the
//! `map_*` functions apply it to every shape of player state.
//!
//! An empty [`TopicMapping`] is the identity: every `map_*` function returns
//! its input untouched (the same `Arc`, for shared inputs) without allocating.

use crate::types::{
    MessageBlock, MessageEvent, PlayerAlert, PreloadType, SubscribePayload, Topic, TopicSetMap,
    TopicStats,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Global variable bindings visible to mappers.
pub type GlobalVariables = BTreeMap<String, Value>;

/// Input handed to every mapper.
#[derive(Debug, Clone, Copy)]
pub struct MapperInput<'a> {
    /// Topics currently known to the data source (unmapped).
    pub topics: &'a [Topic],

    /// Current global variable bindings.
    pub variables: &'a GlobalVariables,
}

/// A pure function proposing topic renames.
///
/// Returns a partial `source name -> target name` mapping. Sources not in the
/// returned map are left alone by this mapper.
pub trait TopicMapper {
    fn map_topics(&self, input: &MapperInput<'_>) -> BTreeMap<String, String>;
}

impl<F> TopicMapper for F
where
    F: Fn(&MapperInput<'_>) -> BTreeMap<String, String>,
{
    fn map_topics(&self, input: &MapperInput<'_>) -> BTreeMap<String, String> {
        self(input)
    }
}

/// A registered mapper.
pub type SharedMapper = Arc<dyn TopicMapper>;

/// Register a closure as a mapper.
pub fn mapper_fn<F>(f: F) -> SharedMapper
where
    F: Fn(&MapperInput<'_>) -> BTreeMap<String, String> + 'static,
{
    Arc::new(f)
}

/// Merged `source -> [targets]` mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicMapping {
    targets: BTreeMap<String, Vec<String>>,
}

impl TopicMapping {
    /// The identity mapping.
    pub fn identity() -> Self {
        Self::default()
    }

    /// True when no topic is renamed.
    pub fn is_identity(&self) -> bool {
        self.targets.is_empty()
    }

    /// Targets for a source, in mapper registration order.
    pub fn targets(&self, source: &str) -> Option<&[String]> {
        self.targets.get(source).map(Vec::as_slice)
    }

    /// Number of renamed sources.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Check if the mapping is empty.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Iterate over `(source, targets)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.targets
            .iter()
            .map(|(source, targets)| (source.as_str(), targets.as_slice()))
    }

    /// Add a target for a source. Returns false if it was already present.
    pub fn insert(&mut self, source: impl Into<String>, target: impl Into<String>) -> bool {
        let target = target.into();
        let targets = self.targets.entry(source.into()).or_default();
        if targets.contains(&target) {
            return false;
        }
        targets.push(target);
        true
    }

    /// Build the `target -> [sources]` inverse.
    pub fn invert(&self) -> InverseMapping {
        let mut sources: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (source, targets) in &self.targets {
            for target in targets {
                let entry = sources.entry(target.clone()).or_default();
                if !entry.contains(source) {
                    entry.push(source.clone());
                }
            }
        }
        InverseMapping { sources }
    }
}

impl<S: Into<String>> FromIterator<(S, S)> for TopicMapping {
    fn from_iter<T: IntoIterator<Item = (S, S)>>(iter: T) -> Self {
        let mut mapping = Self::identity();
        for (source, target) in iter {
            mapping.insert(source, target);
        }
        mapping
    }
}

/// Inverted mapping, used to translate subscriptions back to source names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InverseMapping {
    sources: BTreeMap<String, Vec<String>>,
}

impl InverseMapping {
    /// Original topics feeding a mapped topic.
    pub fn sources(&self, target: &str) -> Option<&[String]> {
        self.sources.get(target).map(Vec::as_slice)
    }

    /// Check if the inverse is empty.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Rewrite subscriptions on mapped names into subscriptions on the
    /// original names feeding them. Unmapped subscriptions pass through.
    ///
    /// Duplicates (same topic and preload type) are collapsed, first wins.
    pub fn map_subscriptions(&self, subscriptions: &[SubscribePayload]) -> Vec<SubscribePayload> {
        if self.sources.is_empty() {
            return subscriptions.to_vec();
        }

        let mut seen: HashSet<(String, PreloadType)> = HashSet::new();
        let mut out = Vec::with_capacity(subscriptions.len());
        for subscription in subscriptions {
            let expanded: Vec<SubscribePayload> = match self.sources.get(&subscription.topic) {
                Some(sources) => sources
                    .iter()
                    .map(|source| SubscribePayload {
                        topic: source.clone(),
                        ..subscription.clone()
                    })
                    .collect(),
                None => vec![subscription.clone()],
            };
            for sub in expanded {
                if seen.insert((sub.topic.clone(), sub.preload_type)) {
                    out.push(sub);
                }
            }
        }
        out
    }
}

/// Result of running the registered mappers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingResult {
    pub mapping: TopicMapping,

    /// Rejected renames.
    pub alerts: Vec<PlayerAlert>,
}

/// Run every mapper and merge the proposals.
///
/// For each source the merged target list is the de-duplicated union of all
/// proposals, in registration order. A target that collides with an existing
/// topic name is rejected with an alert; a target equal to its own source is
/// ignored.
pub fn compute_mapping(
    mappers: &[SharedMapper],
    topics: &[Topic],
    variables: &GlobalVariables,
) -> MappingResult {
    let mut result = MappingResult::default();
    if mappers.is_empty() {
        return result;
    }

    let existing: HashSet<&str> = topics.iter().map(|t| t.name.as_str()).collect();
    let input = MapperInput { topics, variables };

    for mapper in mappers {
        for (source, target) in mapper.map_topics(&input) {
            if source == target {
                continue;
            }
            if existing.contains(target.as_str()) {
                tracing::warn!(
                    "Rejected topic mapping {} -> {}: target already exists",
                    source,
                    target
                );
                result.alerts.push(PlayerAlert::warn(
                    "Disallowed topic mapping",
                    format!(
                        "Cannot map {} to {}: a topic named {} already exists",
                        source, target, target
                    ),
                ));
                continue;
            }
            result.mapping.insert(source, target);
        }
    }

    result
}

/// Replace each mapped topic by one renamed copy per target.
pub fn map_topics(topics: &Arc<Vec<Topic>>, mapping: &TopicMapping) -> Arc<Vec<Topic>> {
    if mapping.is_identity() {
        return Arc::clone(topics);
    }

    let mut out = Vec::with_capacity(topics.len());
    for topic in topics.iter() {
        match mapping.targets(&topic.name) {
            Some(targets) => out.extend(targets.iter().map(|target| topic.renamed(target))),
            None => out.push(topic.clone()),
        }
    }
    Arc::new(out)
}

/// Fan each message on a mapped topic out into one copy per target.
pub fn map_messages(messages: Vec<MessageEvent>, mapping: &TopicMapping) -> Vec<MessageEvent> {
    if mapping.is_identity() {
        return messages;
    }

    let mut out = Vec::with_capacity(messages.len());
    for message in messages {
        match mapping.targets(&message.topic) {
            Some(targets) => out.extend(targets.iter().map(|target| message.with_topic(target))),
            None => out.push(message),
        }
    }
    out
}

fn map_block(block: &MessageBlock, mapping: &TopicMapping) -> MessageBlock {
    let mut messages_by_topic: HashMap<String, Vec<MessageEvent>> =
        HashMap::with_capacity(block.messages_by_topic.len());
    for (topic, messages) in &block.messages_by_topic {
        match mapping.targets(topic) {
            Some(targets) => {
                for target in targets {
                    messages_by_topic.insert(
                        target.clone(),
                        messages.iter().map(|m| m.with_topic(target)).collect(),
                    );
                }
            }
            None => {
                messages_by_topic.insert(topic.clone(), messages.clone());
            }
        }
    }
    MessageBlock {
        messages_by_topic,
        size_in_bytes: block.size_in_bytes,
    }
}

/// Apply the message fan-out to every bucket of every loaded block.
///
/// Block order, unloaded (`None`) blocks and per-block sizes are preserved.
pub fn map_blocks(
    blocks: &Arc<Vec<Option<MessageBlock>>>,
    mapping: &TopicMapping,
) -> Arc<Vec<Option<MessageBlock>>> {
    if mapping.is_identity() {
        return Arc::clone(blocks);
    }

    Arc::new(
        blocks
            .iter()
            .map(|block| block.as_ref().map(|b| map_block(b, mapping)))
            .collect(),
    )
}

/// Map every member of every topic set.
pub fn map_topic_sets(sets: &Arc<TopicSetMap>, mapping: &TopicMapping) -> Arc<TopicSetMap> {
    if mapping.is_identity() {
        return Arc::clone(sets);
    }

    let mut out = TopicSetMap::with_capacity(sets.len());
    for (key, topics) in sets.iter() {
        let mut mapped = HashSet::with_capacity(topics.len());
        for topic in topics {
            match mapping.targets(topic) {
                Some(targets) => mapped.extend(targets.iter().cloned()),
                None => {
                    mapped.insert(topic.clone());
                }
            }
        }
        out.insert(key.clone(), mapped);
    }
    Arc::new(out)
}

/// Copy each mapped topic's statistics to every target name.
pub fn map_topic_stats(
    stats: &Arc<HashMap<String, TopicStats>>,
    mapping: &TopicMapping,
) -> Arc<HashMap<String, TopicStats>> {
    if mapping.is_identity() {
        return Arc::clone(stats);
    }

    let mut out = HashMap::with_capacity(stats.len());
    for (topic, stat) in stats.iter() {
        match mapping.targets(topic) {
            Some(targets) => {
                for target in targets {
                    out.insert(target.clone(), stat.clone());
                }
            }
            None => {
                out.insert(topic.clone(), stat.clone());
            }
        }
    }
    Arc::new(out)
}

/// Single-entry cache keyed on the identity of an `Arc` input.
///
/// Holding the input `Arc` keeps its allocation alive, so a pointer match
/// always means the very same input.
#[derive(Debug)]
pub struct IdentityMemo<I, O> {
    entry: Option<(Arc<I>, O)>,
}

impl<I, O> Default for IdentityMemo<I, O> {
    fn default() -> Self {
        Self { entry: None }
    }
}

impl<I, O: Clone> IdentityMemo<I, O> {
    /// Create an empty memo.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached output for `input`, computing it on a miss.
    pub fn get_or_compute(&mut self, input: &Arc<I>, compute: impl FnOnce(&Arc<I>) -> O) -> O {
        if let Some((cached_input, cached_output)) = &self.entry {
            if Arc::ptr_eq(cached_input, input) {
                return cached_output.clone();
            }
        }
        let output = compute(input);
        self.entry = Some((Arc::clone(input), output.clone()));
        output
    }

    /// Drop the cached entry.
    pub fn clear(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Time;
    use serde_json::json;

    fn rename(pairs: &'static [(&'static str, &'static str)]) -> SharedMapper {
        mapper_fn(move |_| {
            pairs
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect::<BTreeMap<String, String>>()
        })
    }

    fn topics(names: &[&str]) -> Arc<Vec<Topic>> {
        Arc::new(names.iter().map(|n| Topic::new(*n, "schema")).collect())
    }

    fn message(topic: &str) -> MessageEvent {
        MessageEvent::new(topic, "schema", Time::new(1, 0), json!({"value": 1}))
    }

    #[test]
    fn test_no_mappers_is_identity() {
        let result = compute_mapping(&[], &topics(&["/a"]), &GlobalVariables::new());
        assert!(result.mapping.is_identity());
        assert!(result.alerts.is_empty());
    }

    #[test]
    fn test_mapper_proposing_nothing_is_identity() {
        let empty = mapper_fn(|_| BTreeMap::new());
        let result = compute_mapping(&[empty], &topics(&["/a"]), &GlobalVariables::new());
        assert!(result.mapping.is_identity());
    }

    #[test]
    fn test_identity_returns_same_topic_list() {
        let input = topics(&["/a", "/b"]);
        let output = map_topics(&input, &TopicMapping::identity());
        assert!(Arc::ptr_eq(&input, &output));
    }

    #[test]
    fn test_merge_fans_out_in_registration_order() {
        let mappers = vec![rename(&[("/a", "/b")]), rename(&[("/a", "/c")])];
        let result = compute_mapping(&mappers, &topics(&["/a"]), &GlobalVariables::new());
        assert_eq!(
            result.mapping.targets("/a"),
            Some(&["/b".to_string(), "/c".to_string()][..])
        );
    }

    #[test]
    fn test_merge_deduplicates_targets() {
        let mappers = vec![rename(&[("/a", "/b")]), rename(&[("/a", "/b")])];
        let result = compute_mapping(&mappers, &topics(&["/a"]), &GlobalVariables::new());
        assert_eq!(result.mapping.targets("/a"), Some(&["/b".to_string()][..]));
    }

    #[test]
    fn test_collision_with_existing_topic_is_rejected() {
        let mappers = vec![rename(&[("/a", "/b"), ("/c", "/d")])];
        let result =
            compute_mapping(&mappers, &topics(&["/a", "/b", "/c"]), &GlobalVariables::new());
        assert_eq!(result.mapping.targets("/a"), None);
        assert_eq!(result.mapping.targets("/c"), Some(&["/d".to_string()][..]));
        assert_eq!(result.alerts.len(), 1);
        assert_eq!(result.alerts[0].message, "Disallowed topic mapping");
    }

    #[test]
    fn test_self_mapping_is_ignored() {
        let mappers = vec![rename(&[("/a", "/a")])];
        let result = compute_mapping(&mappers, &topics(&["/a"]), &GlobalVariables::new());
        assert!(result.mapping.is_identity());
        assert!(result.alerts.is_empty());
    }

    #[test]
    fn test_mapper_sees_variables() {
        let mapper = mapper_fn(|input| {
            let mut out = BTreeMap::new();
            if let Some(Value::String(robot)) = input.variables.get("robot") {
                out.insert("/camera".to_string(), format!("/{}/camera", robot));
            }
            out
        });
        let mut variables = GlobalVariables::new();
        variables.insert("robot".into(), json!("r2"));
        let result = compute_mapping(&[mapper], &topics(&["/camera"]), &variables);
        assert_eq!(
            result.mapping.targets("/camera"),
            Some(&["/r2/camera".to_string()][..])
        );
    }

    #[test]
    fn test_map_topics_sets_provenance() {
        let mapping: TopicMapping = [("/a", "/b"), ("/a", "/c")].into_iter().collect();
        let input = topics(&["/a", "/x"]);
        let output = map_topics(&input, &mapping);

        let names: Vec<&str> = output.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["/b", "/c", "/x"]);
        assert_eq!(output[0].mapped_from_name.as_deref(), Some("/a"));
        assert_eq!(output[2].mapped_from_name, None);
        // The input list is untouched.
        assert_eq!(input[0].name, "/a");
        assert_eq!(input[0].mapped_from_name, None);
    }

    #[test]
    fn test_map_messages_single_target() {
        let mapping: TopicMapping = [("/a", "/b")].into_iter().collect();
        let original = message("/a");
        let output = map_messages(vec![original.clone(), message("/other")], &mapping);

        assert_eq!(output.len(), 2);
        assert_eq!(output[0].topic, "/b");
        assert_eq!(output[0].receive_time, original.receive_time);
        assert!(Arc::ptr_eq(&output[0].message, &original.message));
        assert_eq!(output[1].topic, "/other");
    }

    #[test]
    fn test_map_messages_fan_out() {
        let mapping: TopicMapping = [("/a", "/b"), ("/a", "/c")].into_iter().collect();
        let output = map_messages(vec![message("/a")], &mapping);
        let names: Vec<&str> = output.iter().map(|m| m.topic.as_str()).collect();
        assert_eq!(names, vec!["/b", "/c"]);
    }

    #[test]
    fn test_map_blocks_preserves_layout() {
        let mapping: TopicMapping = [("/a", "/b")].into_iter().collect();
        let mut first = MessageBlock {
            size_in_bytes: 42,
            ..Default::default()
        };
        first
            .messages_by_topic
            .insert("/a".into(), vec![message("/a"), message("/a")]);
        first.messages_by_topic.insert("/x".into(), vec![message("/x")]);
        let blocks = Arc::new(vec![Some(first), None]);

        let output = map_blocks(&blocks, &mapping);
        assert_eq!(output.len(), 2);
        assert!(output[1].is_none());
        let block = output[0].as_ref().expect("block");
        assert_eq!(block.size_in_bytes, 42);
        assert!(!block.messages_by_topic.contains_key("/a"));
        let mapped = &block.messages_by_topic["/b"];
        assert_eq!(mapped.len(), 2);
        assert!(mapped.iter().all(|m| m.topic == "/b"));
        assert_eq!(block.messages_by_topic["/x"].len(), 1);
    }

    #[test]
    fn test_map_topic_sets() {
        let mapping: TopicMapping = [("/a", "/b"), ("/a", "/c")].into_iter().collect();
        let mut sets = TopicSetMap::new();
        sets.insert(
            "client-1".into(),
            ["/a".to_string(), "/x".to_string()].into_iter().collect(),
        );
        let output = map_topic_sets(&Arc::new(sets), &mapping);
        let expected: HashSet<String> = ["/b", "/c", "/x"].iter().map(|s| s.to_string()).collect();
        assert_eq!(output["client-1"], expected);
    }

    #[test]
    fn test_map_topic_stats() {
        let mapping: TopicMapping = [("/a", "/b")].into_iter().collect();
        let mut stats = HashMap::new();
        stats.insert(
            "/a".to_string(),
            TopicStats {
                num_messages: 3,
                ..Default::default()
            },
        );
        let output = map_topic_stats(&Arc::new(stats), &mapping);
        assert_eq!(output["/b"].num_messages, 3);
        assert!(!output.contains_key("/a"));
    }

    #[test]
    fn test_invert_and_map_subscriptions() {
        let mapping: TopicMapping = [("/a", "/b")].into_iter().collect();
        let inverse = mapping.invert();
        let subs = inverse.map_subscriptions(&[
            SubscribePayload::new("/b").preload(PreloadType::Full),
            SubscribePayload::new("/z"),
        ]);
        assert_eq!(
            subs,
            vec![
                SubscribePayload::new("/a").preload(PreloadType::Full),
                SubscribePayload::new("/z"),
            ]
        );
    }

    #[test]
    fn test_inverse_collects_all_sources() {
        let mapping: TopicMapping = [("/a", "/merged"), ("/b", "/merged")].into_iter().collect();
        let inverse = mapping.invert();
        assert_eq!(
            inverse.sources("/merged"),
            Some(&["/a".to_string(), "/b".to_string()][..])
        );
        let subs = inverse.map_subscriptions(&[SubscribePayload::new("/merged")]);
        assert_eq!(subs.len(), 2);
    }

    #[test]
    fn test_subscription_duplicates_collapse() {
        let mapping: TopicMapping = [("/a", "/b"), ("/a", "/c")].into_iter().collect();
        let subs = mapping
            .invert()
            .map_subscriptions(&[SubscribePayload::new("/b"), SubscribePayload::new("/c")]);
        assert_eq!(subs, vec![SubscribePayload::new("/a")]);
    }

    #[test]
    fn test_identity_memo() {
        let mut memo: IdentityMemo<Vec<Topic>, usize> = IdentityMemo::new();
        let input = topics(&["/a"]);
        let mut calls = 0;
        let first = memo.get_or_compute(&input, |t| {
            calls += 1;
            t.len()
        });
        let second = memo.get_or_compute(&input, |t| {
            calls += 1;
            t.len()
        });
        assert_eq!((first, second, calls), (1, 1, 1));

        // Equal contents, different allocation: recomputed.
        let other = topics(&["/a"]);
        memo.get_or_compute(&other, |t| {
            calls += 1;
            t.len()
        });
        assert_eq!(calls, 2);
    }
}
