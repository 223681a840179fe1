// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Decision engine configuration section.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_CONDITION_DEPTH: usize = 16;
pub const DEFAULT_REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Fields readable whenever any part of a resource is readable.
pub fn default_essential_fields() -> Vec<String> {
	vec!["id".to_string(), "createdAt".to_string(), "updatedAt".to_string()]
}

/// Engine configuration (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
	pub essential_fields: Vec<String>,
	pub max_condition_depth: usize,
	pub regex_size_limit: usize,
	/// Log every decision at info level instead of debug.
	pub log_decisions: bool,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			essential_fields: default_essential_fields(),
			max_condition_depth: DEFAULT_MAX_CONDITION_DEPTH,
			regex_size_limit: DEFAULT_REGEX_SIZE_LIMIT,
			log_decisions: false,
		}
	}
}

/// Engine configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfigLayer {
	#[serde(default)]
	pub essential_fields: Option<Vec<String>>,
	#[serde(default)]
	pub max_condition_depth: Option<usize>,
	#[serde(default)]
	pub regex_size_limit: Option<usize>,
	#[serde(default)]
	pub log_decisions: Option<bool>,
}

impl EngineConfigLayer {
	pub fn merge(&mut self, other: EngineConfigLayer) {
		if other.essential_fields.is_some() {
			self.essential_fields = other.essential_fields;
		}
		if other.max_condition_depth.is_some() {
			self.max_condition_depth = other.max_condition_depth;
		}
		if other.regex_size_limit.is_some() {
			self.regex_size_limit = other.regex_size_limit;
		}
		if other.log_decisions.is_some() {
			self.log_decisions = other.log_decisions;
		}
	}

	pub fn finalize(self) -> EngineConfig {
		EngineConfig {
			essential_fields: self.essential_fields.unwrap_or_else(default_essential_fields),
			max_condition_depth: self.max_condition_depth.unwrap_or(DEFAULT_MAX_CONDITION_DEPTH),
			regex_size_limit: self.regex_size_limit.unwrap_or(DEFAULT_REGEX_SIZE_LIMIT),
			log_decisions: self.log_decisions.unwrap_or(false),
		}
	}
}
