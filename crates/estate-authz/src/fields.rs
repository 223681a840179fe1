// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Field-level visibility.
//!
//! Unlike the yes/no decision, where any matching allow-rule is enough, field
//! visibility is decided by the single highest-priority matching allow-rule.
//! Field lists are never unioned across rules.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::trace;

use estate_authz_core::{Resource, Rule};

use crate::evaluate::{rule_outcome, EvalOptions};

/// The attributes of a resource a principal may read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "fields", rename_all = "snake_case")]
pub enum FieldAccess {
	All,
	/// Exactly these fields. Empty means nothing is readable.
	Only(Vec<String>),
	AllExcept(Vec<String>),
}

impl FieldAccess {
	pub fn none() -> Self {
		FieldAccess::Only(Vec::new())
	}

	/// Returns true if nothing at all is readable.
	pub fn is_none(&self) -> bool {
		matches!(self, FieldAccess::Only(fields) if fields.is_empty())
	}

	/// Returns true if `field` (a dotted path) is readable.
	pub fn permits(&self, field: &str) -> bool {
		match self {
			FieldAccess::All => true,
			FieldAccess::Only(patterns) => patterns.iter().any(|p| covers(p, field)),
			FieldAccess::AllExcept(patterns) => !patterns.iter().any(|p| covers(p, field)),
		}
	}

	/// The explicit list, when access is a list of fields.
	pub fn as_list(&self) -> Option<&[String]> {
		match self {
			FieldAccess::Only(fields) => Some(fields),
			_ => None,
		}
	}

	/// Removes every attribute that is not readable.
	///
	/// Nested objects are redacted recursively when a pattern such as
	/// `address.city` reaches below a top-level key.
	pub fn redact(&self, attributes: &Map<String, Value>) -> Map<String, Value> {
		match self {
			FieldAccess::All => attributes.clone(),
			FieldAccess::Only(patterns) => redact_only(patterns, attributes),
			FieldAccess::AllExcept(patterns) => redact_except(patterns, attributes),
		}
	}
}

/// `address.*` covers `address` and everything below it; other patterns
/// cover exactly one path.
fn covers(pattern: &str, field: &str) -> bool {
	match pattern.strip_suffix(".*") {
		Some(prefix) => {
			field == prefix
				|| field
					.strip_prefix(prefix)
					.is_some_and(|rest| rest.starts_with('.'))
		}
		None => pattern == field,
	}
}

/// Patterns reaching below `key`, relative to it.
fn below(patterns: &[String], key: &str) -> Vec<String> {
	patterns
		.iter()
		.filter_map(|p| p.strip_prefix(key).and_then(|rest| rest.strip_prefix('.')))
		.filter(|rest| !rest.is_empty() && *rest != "*")
		.map(str::to_string)
		.collect()
}

fn redact_only(patterns: &[String], attributes: &Map<String, Value>) -> Map<String, Value> {
	let mut out = Map::new();
	for (key, value) in attributes {
		if patterns.iter().any(|p| covers(p, key)) {
			out.insert(key.clone(), value.clone());
			continue;
		}
		let nested = below(patterns, key);
		match value {
			Value::Object(inner) if !nested.is_empty() => {
				out.insert(key.clone(), Value::Object(redact_only(&nested, inner)));
			}
			_ => {}
		}
	}
	out
}

fn redact_except(patterns: &[String], attributes: &Map<String, Value>) -> Map<String, Value> {
	let mut out = Map::new();
	for (key, value) in attributes {
		if patterns.iter().any(|p| covers(p, key)) {
			continue;
		}
		let nested = below(patterns, key);
		match value {
			Value::Object(inner) if !nested.is_empty() => {
				out.insert(key.clone(), Value::Object(redact_except(&nested, inner)));
			}
			_ => {
				out.insert(key.clone(), value.clone());
			}
		}
	}
	out
}

/// Computes visible fields from the read rules of one subject type.
///
/// Without an instance, conditional rules are treated as matching for
/// allow-rules and as not matching for deny-rules.
pub fn allowed_fields<'a, I>(
	rules: I,
	instance: Option<&Resource>,
	essential_fields: &[String],
	opts: &EvalOptions,
) -> FieldAccess
where
	I: IntoIterator<Item = &'a Rule>,
	I::IntoIter: Clone,
{
	let rules = rules.into_iter();

	let Some(top) = rules
		.clone()
		.filter(|rule| rule.is_allow())
		.find(|rule| match instance {
			Some(resource) => rule_outcome(rule, resource.attributes(), opts).grants(),
			None => true,
		})
	else {
		trace!("no matching allow rule, no fields readable");
		return FieldAccess::none();
	};
	trace!(rule = %top, "top allow rule decides field access");

	let mut denied = Vec::new();
	for rule in rules.filter(|rule| rule.inverted) {
		let matched = match instance {
			Some(resource) => rule_outcome(rule, resource.attributes(), opts).blocks(),
			None => !rule.is_conditional(),
		};
		if !matched {
			continue;
		}
		match &rule.fields {
			None => {
				trace!(rule = %rule, "unrestricted deny rule hides every field");
				return FieldAccess::none();
			}
			Some(patterns) => denied.extend(patterns.iter().map(|p| p.to_string())),
		}
	}

	let is_essential = |pattern: &str| essential_fields.iter().any(|e| covers(pattern, e));

	match &top.fields {
		None => {
			denied.retain(|p| !is_essential(p));
			if denied.is_empty() {
				FieldAccess::All
			} else {
				denied.dedup();
				FieldAccess::AllExcept(denied)
			}
		}
		Some(patterns) => {
			let mut fields: Vec<String> = patterns
				.iter()
				.map(|p| p.to_string())
				.filter(|allowed| {
					!denied
						.iter()
						.any(|deny| covers(deny, strip_wildcard(allowed)) || covers(allowed, strip_wildcard(deny)))
				})
				.collect();
			for essential in essential_fields {
				if !fields.iter().any(|f| covers(f, essential)) {
					fields.push(essential.clone());
				}
			}
			FieldAccess::Only(fields)
		}
	}
}

fn strip_wildcard(pattern: &str) -> &str {
	pattern.strip_suffix(".*").unwrap_or(pattern)
}
