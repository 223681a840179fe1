// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resource instances presented to the engine.
//!
//! Every resource carries its subject type explicitly. The tag is set when the
//! value is constructed and is never inferred from the shape of the data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AuthzError, Result};
use crate::types::SubjectType;
use crate::value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
	#[serde(rename = "type")]
	subject_type: SubjectType,
	#[serde(flatten)]
	attributes: Map<String, Value>,
}

impl Resource {
	pub fn new(subject_type: impl Into<SubjectType>) -> Self {
		Self {
			subject_type: subject_type.into(),
			attributes: Map::new(),
		}
	}

	/// Creates a resource from its type tag and an attribute object.
	pub fn with_attributes(subject_type: impl Into<SubjectType>, attributes: Map<String, Value>) -> Self {
		Self {
			subject_type: subject_type.into(),
			attributes,
		}
	}

	/// Parses `{"type": "...", ...attributes}`.
	pub fn from_json(value: Value) -> Result<Self> {
		let Value::Object(mut attributes) = value else {
			return Err(AuthzError::Configuration(
				"resource must be a JSON object".to_string(),
			));
		};
		let subject_type = match attributes.remove("type") {
			Some(Value::String(tag)) if !tag.is_empty() => SubjectType::new(tag),
			_ => {
				return Err(AuthzError::Configuration(
					"resource is missing its string `type` tag".to_string(),
				))
			}
		};
		Ok(Self {
			subject_type,
			attributes,
		})
	}

	/// Builder: set an attribute.
	pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
		self.attributes.insert(key.into(), value);
		self
	}

	pub fn subject_type(&self) -> &SubjectType {
		&self.subject_type
	}

	pub fn attributes(&self) -> &Map<String, Value> {
		&self.attributes
	}

	/// Reads an attribute by dotted path.
	pub fn get(&self, path: &str) -> Option<Value> {
		value::field(&self.attributes, path)
	}

	/// Returns a copy with the top-level keys of `patch` overwritten.
	pub fn merged(&self, patch: &Map<String, Value>) -> Self {
		let mut merged = self.clone();
		for (key, value) in patch {
			merged.attributes.insert(key.clone(), value.clone());
		}
		merged
	}
}
