// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Lumen topic mapping CLI
//!
//! Tooling for mapping configuration files.
//!
//! # Usage
//!
//! ```bash
//! # Generate an example configuration
//! lumen-remap gen-config --output mapping.toml
//!
//! # Validate a configuration file
//! lumen-remap validate --config mapping.toml
//!
//! # Show the merged mapping for a topic list
//! lumen-remap preview --config mapping.toml \
//!     --topics /camera/left:foxglove.RawImage,/imu:sensor_msgs/msg/Imu
//! ```

use clap::{Parser, Subcommand};
use lumen_player::{compute_mapping, GlobalVariables, MapperConfig, MappingConfig, Topic};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Lumen topic mapping tool
#[derive(Parser, Debug)]
#[command(name = "lumen-remap")]
#[command(about = "Lumen topic mapping - configuration tooling")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error).
    /// Defaults to the configuration file's `log_level`, then `info`.
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "mapping.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Print the merged mapping for a topic list
    Preview {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,

        /// Topics as name:schema (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        topics: Vec<String>,

        /// Global variables as name=value (comma-separated)
        #[arg(long, value_delimiter = ',')]
        var: Vec<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let level = resolve_log_level(&args);
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match args.command {
        Commands::GenConfig { output } => cmd_gen_config(output),
        Commands::Validate { config } => cmd_validate(config),
        Commands::Preview {
            config,
            topics,
            var,
        } => cmd_preview(config, &topics, &var),
    }
}

/// `--log-level` wins; otherwise the loaded configuration's level.
fn resolve_log_level(args: &Args) -> String {
    if let Some(level) = &args.log_level {
        return level.clone();
    }
    let config_path = match &args.command {
        Commands::Validate { config } | Commands::Preview { config, .. } => Some(config),
        Commands::GenConfig { .. } => None,
    };
    config_path
        .and_then(|path| MappingConfig::from_file(path).ok())
        .map(|config| config.log_level)
        .unwrap_or_else(|| "info".to_string())
}

fn cmd_gen_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = MappingConfig {
        name: "example-mapping".into(),
        ..Default::default()
    };
    config.add_mapper(
        MapperConfig::new("camera-aliases")
            .remap("/camera/*/image_raw", "/${robot}/cameras/*")
            .remap("/camera_info", "/${robot}/calibration"),
    );
    config.add_mapper(MapperConfig::new("legacy-names").remap("/odom", "/odometry"));

    let toml_str = toml::to_string_pretty(&config)?;

    let content = format!(
        r#"# Lumen Topic Mapping Configuration
# Generated by lumen-remap gen-config

{}
"#,
        toml_str
    );

    std::fs::write(&output, content)?;
    println!("Generated configuration file: {}", output.display());
    Ok(())
}

fn cmd_validate(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    match MappingConfig::from_file(&config_path) {
        Ok(config) => {
            println!("Configuration valid!");
            println!();
            println!("Mapping: {}", config.name);
            println!("Mappers: {}", config.mappers.len());
            for (i, mapper) in config.mappers.iter().enumerate() {
                println!(
                    "  [{}] {} ({} remaps)",
                    i,
                    mapper.name.as_deref().unwrap_or("unnamed"),
                    mapper.remaps.len()
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_preview(
    config_path: PathBuf,
    topics: &[String],
    vars: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let config = MappingConfig::from_file(&config_path)?;

    let topics: Vec<Topic> = topics
        .iter()
        .map(|spec| match spec.split_once(':') {
            Some((name, schema)) => Topic::new(name, schema),
            None => Topic::new(spec.as_str(), ""),
        })
        .collect();

    let mut variables = GlobalVariables::new();
    for spec in vars {
        match spec.split_once('=') {
            Some((name, value)) => {
                let value = serde_json::from_str(value)
                    .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
                variables.insert(name.to_string(), value);
            }
            None => tracing::warn!("Invalid variable format: {} (expected name=value)", spec),
        }
    }

    let result = compute_mapping(&config.build_mappers(), &topics, &variables);

    if result.mapping.is_identity() {
        println!("No topics renamed.");
    }
    for (source, targets) in result.mapping.iter() {
        println!("{} -> {}", source, targets.join(", "));
    }
    for alert in &result.alerts {
        println!(
            "[{:?}] {}: {}",
            alert.severity,
            alert.message,
            alert.tip.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_file(log_level: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"
log_level = "{}"

[[mappers]]
remaps = [{{ from = "/a", to = "/b" }}]
"#,
            log_level
        )
        .expect("write");
        file
    }

    #[test]
    fn test_log_level_falls_back_to_config() {
        let file = config_file("debug");
        let path = file.path().to_str().expect("utf-8 path");

        let args = Args::parse_from(["lumen-remap", "validate", "--config", path]);
        assert_eq!(resolve_log_level(&args), "debug");

        let args = Args::parse_from(["lumen-remap", "--log-level", "warn", "validate", "-c", path]);
        assert_eq!(resolve_log_level(&args), "warn");
    }

    #[test]
    fn test_log_level_defaults_to_info() {
        let args = Args::parse_from(["lumen-remap", "gen-config"]);
        assert_eq!(resolve_log_level(&args), "info");

        let args = Args::parse_from(["lumen-remap", "validate", "--config", "/nonexistent.toml"]);
        assert_eq!(resolve_log_level(&args), "info");
    }
}
