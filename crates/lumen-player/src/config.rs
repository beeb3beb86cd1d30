// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Mapping configuration.
//!
//! Mappers can be declared in a TOML file:
//!
//! ```toml
//! name = "lab-robots"
//!
//! [[mappers]]
//! name = "camera-aliases"
//!
//! [[mappers.remaps]]
//! from = "/camera/*"
//! to = "/${robot}/camera/*"
//! ```

use crate::mapping::{GlobalVariables, MapperInput, SharedMapper, TopicMapper};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Mapping configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Configuration name (for identification).
    #[serde(default = "default_name")]
    pub name: String,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Mappers, in registration order.
    #[serde(default)]
    pub mappers: Vec<MapperConfig>,
}

fn default_name() -> String {
    "lumen-mapping".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            mappers: Vec::new(),
        }
    }
}

impl MappingConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mappers.is_empty() {
            return Err(ConfigError::Invalid("No mappers configured".into()));
        }

        for (i, mapper) in self.mappers.iter().enumerate() {
            for remap in &mapper.remaps {
                if remap.from.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "Mapper {} has empty remap source",
                        i
                    )));
                }
                if remap.to.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "Mapper {} has empty remap destination",
                        i
                    )));
                }
                if remap.from.matches('*').count() > 1 {
                    return Err(ConfigError::Invalid(format!(
                        "Mapper {} remap source '{}' has more than one '*'",
                        i, remap.from
                    )));
                }
            }
        }

        Ok(())
    }

    /// Add a mapper.
    pub fn add_mapper(&mut self, mapper: MapperConfig) {
        self.mappers.push(mapper);
    }

    /// Build the registered mapper list, in file order.
    pub fn build_mappers(&self) -> Vec<SharedMapper> {
        self.mappers
            .iter()
            .map(|m| Arc::new(RemapMapper::from_config(m)) as SharedMapper)
            .collect()
    }
}

/// Configuration for a single mapper.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapperConfig {
    /// Mapper name (for logs).
    #[serde(default)]
    pub name: Option<String>,

    /// Topic remaps, first match wins.
    #[serde(default)]
    pub remaps: Vec<TopicRemap>,
}

impl MapperConfig {
    /// Create an empty mapper.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            remaps: Vec::new(),
        }
    }

    /// Add a topic remap.
    pub fn remap(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.remaps.push(TopicRemap::new(from, to));
        self
    }
}

/// Topic remapping rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRemap {
    /// Source topic name (or pattern with one `*`).
    pub from: String,

    /// Destination topic name (or template).
    ///
    /// `*` is replaced by the portion matched in `from`, `${name}` by the
    /// global variable `name`.
    pub to: String,
}

impl TopicRemap {
    /// Create a new remap.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Apply this remap to a topic name.
    ///
    /// Returns `None` if the topic does not match or the template references
    /// an unbound variable.
    pub fn apply(&self, topic: &str, variables: &GlobalVariables) -> Option<String> {
        let target = if let Some(pos) = self.from.find('*') {
            let prefix = &self.from[..pos];
            let suffix = &self.from[pos + 1..];
            if topic.len() < prefix.len() + suffix.len()
                || !topic.starts_with(prefix)
                || !topic.ends_with(suffix)
            {
                return None;
            }
            let matched = &topic[prefix.len()..topic.len() - suffix.len()];
            self.to.replace('*', matched)
        } else if self.from == topic {
            self.to.clone()
        } else {
            return None;
        };

        expand_variables(&target, variables)
    }
}

/// Replace `${name}` references with variable values.
fn expand_variables(template: &str, variables: &GlobalVariables) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}')?;
        let value = variables.get(&after[..end])?;
        match value {
            Value::String(s) => out.push_str(s),
            Value::Number(n) => out.push_str(&n.to_string()),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            _ => return None,
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Some(out)
}

/// Mapper built from a [`MapperConfig`].
#[derive(Debug, Clone)]
pub struct RemapMapper {
    name: String,
    remaps: Vec<TopicRemap>,
}

impl RemapMapper {
    /// Create a mapper from configuration.
    pub fn from_config(config: &MapperConfig) -> Self {
        Self {
            name: config.name.clone().unwrap_or_else(|| "unnamed".to_string()),
            remaps: config.remaps.clone(),
        }
    }

    /// Mapper name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl TopicMapper for RemapMapper {
    fn map_topics(&self, input: &MapperInput<'_>) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for topic in input.topics {
            if let Some(target) = self
                .remaps
                .iter()
                .find_map(|r| r.apply(&topic.name, input.variables))
            {
                tracing::trace!("Mapper {}: {} -> {}", self.name, topic.name, target);
                out.insert(topic.name.clone(), target);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::compute_mapping;
    use crate::types::Topic;
    use serde_json::json;
    use std::io::Write;

    fn no_vars() -> GlobalVariables {
        GlobalVariables::new()
    }

    #[test]
    fn test_topic_remap_exact() {
        let remap = TopicRemap::new("/camera", "/front/camera");
        assert_eq!(
            remap.apply("/camera", &no_vars()),
            Some("/front/camera".into())
        );
        assert_eq!(remap.apply("/lidar", &no_vars()), None);
    }

    #[test]
    fn test_topic_remap_pattern() {
        let remap = TopicRemap::new("/sensor/*", "/vehicle/*");
        assert_eq!(
            remap.apply("/sensor/imu", &no_vars()),
            Some("/vehicle/imu".into())
        );
        assert_eq!(remap.apply("/other/imu", &no_vars()), None);
    }

    #[test]
    fn test_topic_remap_pattern_with_suffix() {
        let remap = TopicRemap::new("/*/image_raw", "/cameras/*");
        assert_eq!(
            remap.apply("/left/image_raw", &no_vars()),
            Some("/cameras/left".into())
        );
        assert_eq!(remap.apply("/image_raw", &no_vars()), None);
    }

    #[test]
    fn test_topic_remap_variables() {
        let remap = TopicRemap::new("/camera/*", "/${robot}/camera/*");
        let mut vars = no_vars();
        assert_eq!(remap.apply("/camera/left", &vars), None);

        vars.insert("robot".into(), json!("r2"));
        assert_eq!(
            remap.apply("/camera/left", &vars),
            Some("/r2/camera/left".into())
        );

        vars.insert("robot".into(), json!(7));
        assert_eq!(
            remap.apply("/camera/left", &vars),
            Some("/7/camera/left".into())
        );
    }

    #[test]
    fn test_remap_mapper_first_match_wins() {
        let mapper = RemapMapper::from_config(
            &MapperConfig::new("test")
                .remap("/camera", "/exact")
                .remap("/*", "/glob/*"),
        );
        let topics = vec![Topic::new("/camera", "s"), Topic::new("/imu", "s")];
        let vars = no_vars();
        let out = mapper.map_topics(&MapperInput {
            topics: &topics,
            variables: &vars,
        });
        assert_eq!(out.get("/camera").map(String::as_str), Some("/exact"));
        assert_eq!(out.get("/imu").map(String::as_str), Some("/glob/imu"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = MappingConfig::default();
        assert!(config.validate().is_err()); // No mappers

        config.add_mapper(MapperConfig::new("bad").remap("", "/x"));
        assert!(config.validate().is_err());

        config.mappers.clear();
        config.add_mapper(MapperConfig::new("bad").remap("/*/x/*", "/y"));
        assert!(config.validate().is_err());

        config.mappers.clear();
        config.add_mapper(MapperConfig::new("ok").remap("/a", "/b"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_file_builds_mappers_in_order() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"
name = "test"

[[mappers]]
name = "first"
remaps = [{{ from = "/a", to = "/b" }}]

[[mappers]]
name = "second"
remaps = [{{ from = "/a", to = "/c" }}]
"#
        )
        .expect("write");

        let config = MappingConfig::from_file(file.path()).expect("load");
        assert_eq!(config.name, "test");
        assert_eq!(config.log_level, "info");

        let mappers = config.build_mappers();
        let topics = vec![Topic::new("/a", "s")];
        let result = compute_mapping(&mappers, &topics, &no_vars());
        assert_eq!(
            result.mapping.targets("/a"),
            Some(&["/b".to_string(), "/c".to_string()][..])
        );
    }

    #[test]
    fn test_config_serialization() {
        let mut config = MappingConfig::default();
        config.add_mapper(MapperConfig::new("m").remap("/a", "/b"));
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        assert!(toml_str.contains("from = \"/a\""));
        let parsed = MappingConfig::from_toml_str(&toml_str).expect("parse");
        assert_eq!(parsed.mappers[0].remaps, config.mappers[0].remaps);
    }
}
