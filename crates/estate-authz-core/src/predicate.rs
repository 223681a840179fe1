// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Store-neutral row predicates.
//!
//! A [`Predicate`] is what list queries receive instead of a yes/no answer.
//! It is a closed tree over field primitives that every store understands
//! (equality, ranges, membership, patterns, array containment, length and
//! element matches). Stores either render it
//! ([`Predicate::to_sql`](crate::sql)) or run it in memory with
//! [`Predicate::matches`], which shares its operator semantics with the
//! object-mode evaluator.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

use crate::matching::{self, RegexPattern};
use crate::value;

/// Field name under which an [`ElementForm::Value`] element predicate sees the
/// element itself. Condition documents cannot name it, since `$` keys are
/// operators there.
pub const ELEMENT: &str = "$elem";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
	Eq,
	Ne,
	Gt,
	Gte,
	Lt,
	Lte,
}

impl CompareOp {
	fn accepts(self, ordering: Ordering) -> bool {
		match self {
			CompareOp::Gt => ordering == Ordering::Greater,
			CompareOp::Gte => ordering != Ordering::Less,
			CompareOp::Lt => ordering == Ordering::Less,
			CompareOp::Lte => ordering != Ordering::Greater,
			CompareOp::Eq => ordering == Ordering::Equal,
			CompareOp::Ne => ordering != Ordering::Equal,
		}
	}
}

/// Text pattern anchoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeKind {
	StartsWith,
	EndsWith,
	Substring,
}

/// Array containment relations between an attribute and an operand list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayOp {
	/// Attribute holds every operand value.
	Contains,
	/// Every attribute value is in the operand.
	Contained,
	/// At least one value in common.
	Overlap,
}

/// How a [`Predicate::ElemMatch`] presents each array element to its inner
/// predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementForm {
	/// Any element, addressed as the [`ELEMENT`] field.
	Value,
	/// Object elements only; inner fields are relative to the element.
	Document,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
	Const(bool),
	And(Vec<Predicate>),
	Or(Vec<Predicate>),
	Not(Box<Predicate>),
	Compare {
		field: String,
		op: CompareOp,
		value: Value,
	},
	In {
		field: String,
		values: Vec<Value>,
	},
	NotIn {
		field: String,
		values: Vec<Value>,
	},
	Between {
		field: String,
		low: Value,
		high: Value,
	},
	NotBetween {
		field: String,
		low: Value,
		high: Value,
	},
	Like {
		field: String,
		kind: LikeKind,
		pattern: String,
	},
	Regexp {
		field: String,
		regex: RegexPattern,
	},
	Exists {
		field: String,
		present: bool,
	},
	Array {
		field: String,
		op: ArrayOp,
		values: Vec<Value>,
	},
	/// The attribute is an array of exactly `len` elements.
	Size {
		field: String,
		len: u64,
	},
	/// Some element of the array attribute satisfies `element`.
	ElemMatch {
		field: String,
		form: ElementForm,
		element: Box<Predicate>,
	},
}

impl Predicate {
	pub fn always() -> Self {
		Predicate::Const(true)
	}

	pub fn never() -> Self {
		Predicate::Const(false)
	}

	pub fn compare(field: impl Into<String>, op: CompareOp, value: Value) -> Self {
		Predicate::Compare {
			field: field.into(),
			op,
			value,
		}
	}

	/// Conjunction with constant folding and flattening.
	pub fn and(items: impl IntoIterator<Item = Predicate>) -> Self {
		let mut out = Vec::new();
		for item in items {
			match item {
				Predicate::Const(true) => {}
				Predicate::Const(false) => return Predicate::never(),
				Predicate::And(nested) => out.extend(nested),
				other => out.push(other),
			}
		}
		match out.len() {
			0 => Predicate::always(),
			1 => out.remove(0),
			_ => Predicate::And(out),
		}
	}

	/// Disjunction with constant folding and flattening.
	pub fn or(items: impl IntoIterator<Item = Predicate>) -> Self {
		let mut out = Vec::new();
		for item in items {
			match item {
				Predicate::Const(false) => {}
				Predicate::Const(true) => return Predicate::always(),
				Predicate::Or(nested) => out.extend(nested),
				other => out.push(other),
			}
		}
		match out.len() {
			0 => Predicate::never(),
			1 => out.remove(0),
			_ => Predicate::Or(out),
		}
	}

	#[allow(clippy::should_implement_trait)]
	pub fn not(inner: Predicate) -> Self {
		match inner {
			Predicate::Const(value) => Predicate::Const(!value),
			Predicate::Not(inner) => *inner,
			other => Predicate::Not(Box::new(other)),
		}
	}

	pub fn is_always(&self) -> bool {
		matches!(self, Predicate::Const(true))
	}

	pub fn is_never(&self) -> bool {
		matches!(self, Predicate::Const(false))
	}

	/// Evaluates the predicate against one row.
	pub fn matches(&self, row: &Map<String, Value>) -> bool {
		match self {
			Predicate::Const(value) => *value,
			Predicate::And(items) => items.iter().all(|p| p.matches(row)),
			Predicate::Or(items) => items.iter().any(|p| p.matches(row)),
			Predicate::Not(inner) => !inner.matches(row),
			Predicate::Compare { field, op, value } => {
				let actual = value::field(row, field);
				match op {
					CompareOp::Eq => matching::equals(actual.as_ref(), value),
					CompareOp::Ne => !matching::equals(actual.as_ref(), value),
					_ => matching::ordering(actual.as_ref(), value, |o| op.accepts(o)),
				}
			}
			Predicate::In { field, values } => matching::in_set(value::field(row, field).as_ref(), values),
			Predicate::NotIn { field, values } => {
				!matching::in_set(value::field(row, field).as_ref(), values)
			}
			Predicate::Between { field, low, high } => {
				matching::between(value::field(row, field).as_ref(), low, high)
			}
			Predicate::NotBetween { field, low, high } => {
				!matching::between(value::field(row, field).as_ref(), low, high)
			}
			Predicate::Like { field, kind, pattern } => {
				matching::text(value::field(row, field).as_ref(), *kind, pattern)
			}
			Predicate::Regexp { field, regex } => regex.is_match(value::field(row, field).as_ref()),
			Predicate::Exists { field, present } => {
				matching::exists(value::field(row, field).as_ref()) == *present
			}
			Predicate::Array { field, op, values } => {
				matching::array(value::field(row, field).as_ref(), *op, values)
			}
			Predicate::Size { field, len } => matching::size(value::field(row, field).as_ref(), *len),
			Predicate::ElemMatch { field, form, element } => match value::field(row, field) {
				Some(Value::Array(items)) => items.into_iter().any(|item| match (form, item) {
					(ElementForm::Document, Value::Object(map)) => element.matches(&map),
					(ElementForm::Document, _) => false,
					(ElementForm::Value, item) => {
						let mut wrapped = Map::new();
						wrapped.insert(ELEMENT.to_string(), item);
						element.matches(&wrapped)
					}
				}),
				_ => false,
			},
		}
	}

	/// Distinct field paths referenced by the predicate, in first-use order.
	/// Fields inside an element match are relative to the element and are not
	/// listed.
	pub fn fields(&self) -> Vec<&str> {
		let mut out = Vec::new();
		self.collect_fields(&mut out);
		out
	}

	fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
		let field = match self {
			Predicate::Const(_) => return,
			Predicate::And(items) | Predicate::Or(items) => {
				for item in items {
					item.collect_fields(out);
				}
				return;
			}
			Predicate::Not(inner) => return inner.collect_fields(out),
			Predicate::Compare { field, .. }
			| Predicate::In { field, .. }
			| Predicate::NotIn { field, .. }
			| Predicate::Between { field, .. }
			| Predicate::NotBetween { field, .. }
			| Predicate::Like { field, .. }
			| Predicate::Regexp { field, .. }
			| Predicate::Exists { field, .. }
			| Predicate::Array { field, .. }
			| Predicate::Size { field, .. }
			| Predicate::ElemMatch { field, .. } => field.as_str(),
		};
		if !out.contains(&field) {
			out.push(field);
		}
	}
}
