// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the Estate authorization engine.
//!
//! This crate provides:
//! - Layered configuration from defaults, a TOML file and the environment
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`ESTATE_AUTHZ_*`)
//!
//! # Usage
//!
//! ```ignore
//! use estate_authz_config::load_config;
//!
//! let config = load_config()?;
//! println!("max condition depth {}", config.engine.max_condition_depth);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::AuthzConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthzConfig {
	pub engine: EngineConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`ESTATE_AUTHZ_*`)
/// 2. Config file (`/etc/estate/authz.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<AuthzConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only (for testing or simple deployments).
pub fn load_config_from_env() -> Result<AuthzConfig, ConfigError> {
	let mut merged = AuthzConfigLayer::default();
	merged.merge(EnvSource.load()?);
	finalize(merged)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<AuthzConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Merge the given sources in precedence order and finalize.
pub fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<AuthzConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = AuthzConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: AuthzConfigLayer) -> Result<AuthzConfig, ConfigError> {
	let engine = layer.engine.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	validate_config(&engine)?;

	info!(
		essential_fields = ?engine.essential_fields,
		max_condition_depth = engine.max_condition_depth,
		regex_size_limit = engine.regex_size_limit,
		log_decisions = engine.log_decisions,
		"Authorization configuration loaded"
	);

	Ok(AuthzConfig { engine, logging })
}

/// Validate cross-field configuration rules.
fn validate_config(engine: &EngineConfig) -> Result<(), ConfigError> {
	if engine.max_condition_depth == 0 {
		return Err(ConfigError::Validation(
			"max_condition_depth must be at least 1".to_string(),
		));
	}

	if engine.regex_size_limit == 0 {
		return Err(ConfigError::Validation(
			"regex_size_limit must be greater than 0".to_string(),
		));
	}

	if let Some(blank) = engine.essential_fields.iter().find(|f| f.trim().is_empty()) {
		return Err(ConfigError::Validation(format!(
			"essential_fields contains a blank entry {blank:?}"
		)));
	}

	Ok(())
}
