// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Operator semantics against a concrete attribute value.
//!
//! Both the object-mode evaluator and [`Predicate::matches`](crate::Predicate::matches)
//! call into this module, which keeps a condition and its translated
//! predicate in agreement about every row.
//!
//! `actual` is `None` when the attribute is missing. When the attribute holds
//! an array, scalar tests succeed if any element satisfies them.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

use crate::error::AuthzError;
use crate::predicate::{ArrayOp, LikeKind};
use crate::value::{compare, contains_loose, loose_eq};

/// Compiled-program limit for `$regex` patterns when none is configured.
pub const DEFAULT_REGEX_SIZE_LIMIT: usize = 1 << 20;

fn candidates(actual: &Value) -> Vec<&Value> {
	match actual {
		Value::Array(items) => items.iter().collect(),
		other => vec![other],
	}
}

/// Equality, array membership for array attributes, and `null` matching a
/// missing attribute.
pub fn equals(actual: Option<&Value>, expected: &Value) -> bool {
	match actual {
		None | Some(Value::Null) => expected.is_null(),
		Some(Value::Array(items)) => {
			contains_loose(items, expected) || actual.is_some_and(|whole| loose_eq(whole, expected))
		}
		Some(value) => loose_eq(value, expected),
	}
}

pub fn ordering(actual: Option<&Value>, expected: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
	let Some(actual) = actual else {
		return false;
	};
	candidates(actual)
		.into_iter()
		.any(|candidate| compare(candidate, expected).map(&accept).unwrap_or(false))
}

pub fn in_set(actual: Option<&Value>, set: &[Value]) -> bool {
	match actual {
		None | Some(Value::Null) => set.iter().any(Value::is_null),
		Some(Value::Array(items)) => items.iter().any(|item| contains_loose(set, item)),
		Some(value) => contains_loose(set, value),
	}
}

pub fn between(actual: Option<&Value>, low: &Value, high: &Value) -> bool {
	let Some(actual) = actual else {
		return false;
	};
	candidates(actual).into_iter().any(|candidate| {
		matches!(compare(candidate, low), Some(Ordering::Greater | Ordering::Equal))
			&& matches!(compare(candidate, high), Some(Ordering::Less | Ordering::Equal))
	})
}

pub fn exists(actual: Option<&Value>) -> bool {
	!matches!(actual, None | Some(Value::Null))
}

pub fn size(actual: Option<&Value>, expected: u64) -> bool {
	match actual {
		Some(Value::Array(items)) => items.len() as u64 == expected,
		_ => false,
	}
}

pub fn text(actual: Option<&Value>, kind: LikeKind, needle: &str) -> bool {
	let Some(actual) = actual else {
		return false;
	};
	candidates(actual).into_iter().any(|candidate| match candidate {
		Value::String(s) => match kind {
			LikeKind::StartsWith => s.starts_with(needle),
			LikeKind::EndsWith => s.ends_with(needle),
			LikeKind::Substring => s.contains(needle),
		},
		_ => false,
	})
}

pub fn regex(actual: Option<&Value>, pattern: &Regex) -> bool {
	let Some(actual) = actual else {
		return false;
	};
	candidates(actual).into_iter().any(|candidate| match candidate {
		Value::String(s) => pattern.is_match(s),
		_ => false,
	})
}

/// Array operators. A scalar attribute behaves like a one-element array.
pub fn array(actual: Option<&Value>, op: ArrayOp, operand: &[Value]) -> bool {
	let items: Vec<&Value> = match actual {
		None | Some(Value::Null) => return false,
		Some(value) => candidates(value),
	};

	match op {
		ArrayOp::Contains => operand
			.iter()
			.all(|required| items.iter().any(|item| loose_eq(item, required))),
		ArrayOp::Contained => items.iter().all(|item| contains_loose(operand, item)),
		ArrayOp::Overlap => items.iter().any(|item| contains_loose(operand, item)),
	}
}

pub fn compile_regex(pattern: &str, case_insensitive: bool, size_limit: usize) -> Result<Regex, AuthzError> {
	RegexBuilder::new(pattern)
		.case_insensitive(case_insensitive)
		.size_limit(size_limit)
		.build()
		.map_err(|e| AuthzError::evaluation("$regex", e.to_string()))
}

/// A `$regex` operand compiled once under a size limit.
///
/// Two patterns are equal when their source and case flag are. Serialized as
/// [`RegexSource`]; deserializing recompiles under
/// [`DEFAULT_REGEX_SIZE_LIMIT`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RegexSource", into = "RegexSource")]
pub struct RegexPattern {
	source: String,
	case_insensitive: bool,
	regex: Regex,
}

/// Wire form of a [`RegexPattern`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexSource {
	pub pattern: String,
	#[serde(default)]
	pub case_insensitive: bool,
}

impl RegexPattern {
	pub fn new(pattern: &str, case_insensitive: bool, size_limit: usize) -> Result<Self, AuthzError> {
		Ok(Self {
			source: pattern.to_string(),
			case_insensitive,
			regex: compile_regex(pattern, case_insensitive, size_limit)?,
		})
	}

	pub fn as_str(&self) -> &str {
		&self.source
	}

	pub fn case_insensitive(&self) -> bool {
		self.case_insensitive
	}

	pub fn is_match(&self, actual: Option<&Value>) -> bool {
		regex(actual, &self.regex)
	}
}

impl PartialEq for RegexPattern {
	fn eq(&self, other: &Self) -> bool {
		self.source == other.source && self.case_insensitive == other.case_insensitive
	}
}

impl TryFrom<RegexSource> for RegexPattern {
	type Error = AuthzError;

	fn try_from(source: RegexSource) -> Result<Self, Self::Error> {
		RegexPattern::new(&source.pattern, source.case_insensitive, DEFAULT_REGEX_SIZE_LIMIT)
	}
}

impl From<RegexPattern> for RegexSource {
	fn from(pattern: RegexPattern) -> Self {
		RegexSource {
			pattern: pattern.source,
			case_insensitive: pattern.case_insensitive,
		}
	}
}
