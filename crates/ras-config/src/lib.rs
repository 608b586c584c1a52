//! Configuration module for the RAS order manager.
//!
//! This module provides structures and utilities for managing the
//! manager's configuration. It supports loading configuration from
//! TOML files and provides validation to ensure all required values
//! are properly set.

use ras_types::ResourceType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the order manager.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this federation member.
	pub member: MemberConfig,
	/// Sweep cadence of the background processors.
	#[serde(default)]
	pub processors: ProcessorsConfig,
	/// Cloud plugin assignments and per-plugin configuration.
	pub clouds: CloudsConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Identity of the local federation member.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MemberConfig {
	/// Unique identifier of this member in the federation. Orders whose
	/// provider differs from this id are provisioned remotely.
	pub id: String,
}

/// Sweep delays for the background processors, in milliseconds.
///
/// A processor sleeps for its configured delay after finishing a full
/// scan of its container. Zero is a valid value and yields a tight
/// loop.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProcessorsConfig {
	#[serde(default = "default_sleep_ms")]
	pub open_sleep_ms: u64,
	#[serde(default = "default_sleep_ms")]
	pub spawning_sleep_ms: u64,
	#[serde(default = "default_sleep_ms")]
	pub fulfilled_sleep_ms: u64,
	#[serde(default = "default_sleep_ms")]
	pub failed_sleep_ms: u64,
	#[serde(default = "default_sleep_ms")]
	pub closed_sleep_ms: u64,
}

impl Default for ProcessorsConfig {
	fn default() -> Self {
		Self {
			open_sleep_ms: default_sleep_ms(),
			spawning_sleep_ms: default_sleep_ms(),
			fulfilled_sleep_ms: default_sleep_ms(),
			failed_sleep_ms: default_sleep_ms(),
			closed_sleep_ms: default_sleep_ms(),
		}
	}
}

/// Returns the default sweep delay between container scans.
fn default_sleep_ms() -> u64 {
	1000
}

/// Cloud plugin configuration.
///
/// `assignments` binds each resource kind to one of the entries in
/// `implementations`; each implementation receives its own raw TOML
/// table so plugins can define their own configuration format.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CloudsConfig {
	/// Name recorded as the cloud of orders that do not specify one.
	pub default_cloud: String,
	/// Map of resource kind to the plugin implementation serving it.
	pub assignments: HashMap<ResourceType, String>,
	/// Map of plugin implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default = "default_api_enabled")]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
}

fn default_api_enabled() -> bool {
	true
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	8080
}

impl Config {
	/// Loads configuration from a TOML file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = std::fs::read_to_string(path)?;
		content.parse()
	}

	/// Checks cross-section consistency that serde cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.member.id.is_empty() {
			return Err(ConfigError::Validation("member.id must not be empty".into()));
		}
		for (resource, implementation) in &self.clouds.assignments {
			if !self.clouds.implementations.contains_key(implementation) {
				return Err(ConfigError::Validation(format!(
					"resource {} is assigned to implementation '{}' but no such implementation is configured",
					resource, implementation
				)));
			}
		}
		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let config: Config = toml::from_str(s)?;
		config.validate()?;
		Ok(config)
	}
}
