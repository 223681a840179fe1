// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Typed rules compiled from grant records.

use serde::Serialize;
use std::fmt;

use crate::condition::Condition;
use crate::error::{AuthzError, Result};
use crate::grant::{GrantRecord, GrantSource, MAX_PRIORITY, MIN_PRIORITY};
use crate::types::{Action, SubjectType};

/// An entry of a grant's `fields` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum FieldPattern {
	/// `phone`
	Exact(String),
	/// `address.*`: the prefix itself and every path below it.
	Prefix(String),
}

impl FieldPattern {
	pub fn parse(raw: &str) -> Result<Self> {
		let raw = raw.trim();
		let pattern = match raw.strip_suffix(".*") {
			Some(prefix) => FieldPattern::Prefix(prefix.to_string()),
			None => FieldPattern::Exact(raw.to_string()),
		};
		let name = pattern.name();
		if name.is_empty() || name.contains('*') || name.split('.').any(str::is_empty) {
			return Err(AuthzError::Configuration(format!("invalid field pattern '{raw}'")));
		}
		Ok(pattern)
	}

	/// The field name, or the prefix without its `.*`.
	pub fn name(&self) -> &str {
		match self {
			FieldPattern::Exact(name) | FieldPattern::Prefix(name) => name,
		}
	}

	pub fn covers(&self, field: &str) -> bool {
		match self {
			FieldPattern::Exact(name) => name == field,
			FieldPattern::Prefix(prefix) => {
				field == prefix
					|| field
						.strip_prefix(prefix.as_str())
						.is_some_and(|rest| rest.starts_with('.'))
			}
		}
	}
}

impl fmt::Display for FieldPattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FieldPattern::Exact(name) => f.write_str(name),
			FieldPattern::Prefix(prefix) => write!(f, "{prefix}.*"),
		}
	}
}

impl From<FieldPattern> for String {
	fn from(pattern: FieldPattern) -> Self {
		pattern.to_string()
	}
}

/// A grant after validation: parsed action, condition tree and field
/// patterns, tagged with where it came from.
///
/// Rules are immutable once compiled. Binding principal variables produces a
/// new rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
	pub action: Action,
	pub subject: SubjectType,
	pub condition: Option<Condition>,
	pub fields: Option<Vec<FieldPattern>>,
	pub inverted: bool,
	pub priority: i64,
	pub source: GrantSource,
}

impl Rule {
	/// Validates a wire grant and compiles it.
	pub fn compile(record: &GrantRecord, source: GrantSource, max_depth: usize) -> Result<Rule> {
		let action = record.action.parse::<Action>()?;

		let subject = record.subject.trim();
		if subject.is_empty() {
			return Err(AuthzError::Configuration("grant subject is empty".to_string()));
		}

		if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&record.priority) {
			return Err(AuthzError::Configuration(format!(
				"priority {} is outside {MIN_PRIORITY}..={MAX_PRIORITY}",
				record.priority
			)));
		}

		let condition = match &record.conditions {
			None | Some(serde_json::Value::Null) => None,
			Some(serde_json::Value::Object(map)) if map.is_empty() => None,
			Some(document) => Some(Condition::parse(document, max_depth)?),
		};

		let fields = match &record.fields {
			None => None,
			Some(list) if list.is_empty() => {
				return Err(AuthzError::Configuration(
					"grant field list is empty".to_string(),
				))
			}
			Some(list) => Some(
				list
					.iter()
					.map(|raw| FieldPattern::parse(raw))
					.collect::<Result<Vec<_>>>()?,
			),
		};

		Ok(Rule {
			action,
			subject: SubjectType::new(subject),
			condition,
			fields,
			inverted: record.inverted,
			priority: record.priority,
			source,
		})
	}

	pub fn is_allow(&self) -> bool {
		!self.inverted
	}

	pub fn is_conditional(&self) -> bool {
		self.condition.is_some()
	}

	pub fn is_field_restricted(&self) -> bool {
		self.fields.is_some()
	}

	/// Returns true if the rule governs `action` on `subject`.
	pub fn applies_to(&self, action: Action, subject: &str) -> bool {
		self.action.covers(action) && self.subject.covers(subject)
	}

	/// Returns true if one of the rule's field patterns covers `field`.
	pub fn covers_field(&self, field: &str) -> bool {
		match &self.fields {
			None => true,
			Some(patterns) => patterns.iter().any(|p| p.covers(field)),
		}
	}

	/// Field applicability.
	///
	/// Unrestricted rules always apply. With a field argument a restricted
	/// rule applies if it covers the field. Without one, restricted
	/// allow-rules apply (some of the resource is reachable) and restricted
	/// deny-rules do not (they never deny the resource as a whole).
	pub fn matches_field(&self, field: Option<&str>) -> bool {
		match (field, &self.fields) {
			(_, None) => true,
			(Some(field), Some(_)) => self.covers_field(field),
			(None, Some(_)) => self.is_allow(),
		}
	}
}

impl fmt::Display for Rule {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let verb = if self.inverted { "deny" } else { "allow" };
		write!(
			f,
			"{verb} {} {} (priority {}, {})",
			self.action, self.subject, self.priority, self.source
		)
	}
}
