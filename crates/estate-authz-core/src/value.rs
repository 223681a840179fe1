// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! JSON value helpers: dotted-path projection and loose comparison.

use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Looks up a dotted path inside an attribute object.
///
/// Numeric segments index into arrays. Any other segment applied to an array
/// is projected over its elements, so `units.status` on a list of unit
/// objects yields the list of their statuses.
pub fn field(attributes: &Map<String, Value>, path: &str) -> Option<Value> {
	let segments: Vec<&str> = path.split('.').collect();
	let (first, rest) = segments.split_first()?;
	project(attributes.get(*first)?, rest)
}

/// Same as [`field`] but starting from an arbitrary value.
pub fn path(value: &Value, path: &str) -> Option<Value> {
	if path.is_empty() {
		return Some(value.clone());
	}
	let segments: Vec<&str> = path.split('.').collect();
	project(value, &segments)
}

fn project(value: &Value, segments: &[&str]) -> Option<Value> {
	let Some((first, rest)) = segments.split_first() else {
		return Some(value.clone());
	};

	match value {
		Value::Object(map) => project(map.get(*first)?, rest),
		Value::Array(items) => {
			if let Ok(index) = first.parse::<usize>() {
				return project(items.get(index)?, rest);
			}
			let projected: Vec<Value> = items
				.iter()
				.filter_map(|item| project(item, segments))
				.collect();
			if projected.is_empty() {
				None
			} else {
				Some(Value::Array(projected))
			}
		}
		_ => None,
	}
}

/// Structural equality that treats `1` and `1.0` as equal.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
	match (a, b) {
		(Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
			(Some(x), Some(y)) => x == y,
			_ => x.as_f64() == y.as_f64(),
		},
		(Value::Array(x), Value::Array(y)) => {
			x.len() == y.len() && x.iter().zip(y).all(|(a, b)| loose_eq(a, b))
		}
		(Value::Object(x), Value::Object(y)) => {
			x.len() == y.len()
				&& x
					.iter()
					.all(|(k, v)| y.get(k).map(|w| loose_eq(v, w)).unwrap_or(false))
		}
		_ => a == b,
	}
}

/// Orders two scalars of the same kind. Mixed kinds are incomparable.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
	match (a, b) {
		(Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
			(Some(x), Some(y)) => Some(x.cmp(&y)),
			_ => x.as_f64()?.partial_cmp(&y.as_f64()?),
		},
		(Value::String(x), Value::String(y)) => Some(x.cmp(y)),
		(Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
		_ => None,
	}
}

/// Returns true for values that can appear on either side of a range check.
pub fn is_comparable(value: &Value) -> bool {
	matches!(value, Value::Number(_) | Value::String(_) | Value::Bool(_))
}

pub fn contains_loose(haystack: &[Value], needle: &Value) -> bool {
	haystack.iter().any(|item| loose_eq(item, needle))
}

pub fn type_name(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}
