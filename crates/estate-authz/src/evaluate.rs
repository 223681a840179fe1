// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Object-mode evaluation.
//!
//! Decides rules against one concrete resource. Conditions evaluate to a
//! three-valued [`Outcome`]: an unknown operator or an operand of the wrong
//! shape makes its subtree [`Outcome::Indeterminate`] instead of failing the
//! whole request. Indeterminate never lets an allow-rule match and always lets
//! a deny-rule match.

use serde_json::{Map, Value};
use tracing::{debug, trace};

use estate_authz_core::matching::{self, DEFAULT_REGEX_SIZE_LIMIT};
use estate_authz_core::value::{self, is_comparable};
use estate_authz_core::{
	ArrayOp, AuthzError, Condition, ElemMatch, FieldOp, FieldTest, LikeKind, RegexPattern, Resource, Result, Rule,
};

/// Result of evaluating a condition against a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	Match,
	NoMatch,
	Indeterminate,
}

impl Outcome {
	pub fn from_bool(matched: bool) -> Self {
		if matched {
			Outcome::Match
		} else {
			Outcome::NoMatch
		}
	}

	pub fn and(self, other: Outcome) -> Outcome {
		match (self, other) {
			(Outcome::NoMatch, _) | (_, Outcome::NoMatch) => Outcome::NoMatch,
			(Outcome::Indeterminate, _) | (_, Outcome::Indeterminate) => Outcome::Indeterminate,
			_ => Outcome::Match,
		}
	}

	pub fn or(self, other: Outcome) -> Outcome {
		match (self, other) {
			(Outcome::Match, _) | (_, Outcome::Match) => Outcome::Match,
			(Outcome::Indeterminate, _) | (_, Outcome::Indeterminate) => Outcome::Indeterminate,
			_ => Outcome::NoMatch,
		}
	}

	#[allow(clippy::should_implement_trait)]
	pub fn not(self) -> Outcome {
		match self {
			Outcome::Match => Outcome::NoMatch,
			Outcome::NoMatch => Outcome::Match,
			Outcome::Indeterminate => Outcome::Indeterminate,
		}
	}

	/// Whether an allow-rule with this outcome grants access.
	pub fn grants(self) -> bool {
		self == Outcome::Match
	}

	/// Whether a deny-rule with this outcome blocks access.
	pub fn blocks(self) -> bool {
		self != Outcome::NoMatch
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalOptions {
	pub regex_size_limit: usize,
}

impl Default for EvalOptions {
	fn default() -> Self {
		Self {
			regex_size_limit: DEFAULT_REGEX_SIZE_LIMIT,
		}
	}
}

/// The rules that decided an object-mode check.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluation<'a> {
	/// Highest-priority allow-rule that matched.
	pub allowed_by: Option<&'a Rule>,
	/// Highest-priority deny-rule that matched. Only looked for once an
	/// allow-rule matched.
	pub denied_by: Option<&'a Rule>,
}

impl Evaluation<'_> {
	pub fn is_allowed(&self) -> bool {
		self.allowed_by.is_some() && self.denied_by.is_none()
	}
}

/// Runs the allow-then-deny algorithm over `rules`, which must already be
/// filtered to one action and subject and sorted by priority.
///
/// Without an instance, conditional allow-rules count as matching (some
/// instance may satisfy them) and conditional deny-rules do not (some
/// instance may escape them).
pub fn evaluate<'a, I>(rules: I, instance: Option<&Resource>, field: Option<&str>, opts: &EvalOptions) -> Evaluation<'a>
where
	I: IntoIterator<Item = &'a Rule>,
	I::IntoIter: Clone,
{
	let rules = rules.into_iter().filter(|rule| rule.matches_field(field));

	let allowed_by = rules.clone().filter(|rule| rule.is_allow()).find(|rule| {
		let matched = match instance {
			Some(resource) => rule_outcome(rule, resource.attributes(), opts).grants(),
			None => true,
		};
		trace!(rule = %rule, matched, "allow rule");
		matched
	});

	if allowed_by.is_none() {
		return Evaluation::default();
	}

	let denied_by = rules.filter(|rule| rule.inverted).find(|rule| {
		let matched = match instance {
			Some(resource) => rule_outcome(rule, resource.attributes(), opts).blocks(),
			None => !rule.is_conditional(),
		};
		trace!(rule = %rule, matched, "deny rule");
		matched
	});

	Evaluation {
		allowed_by,
		denied_by,
	}
}

/// Evaluates a rule's condition against an attribute object.
pub fn rule_outcome(rule: &Rule, attributes: &Map<String, Value>, opts: &EvalOptions) -> Outcome {
	match &rule.condition {
		None => Outcome::Match,
		Some(condition) => evaluate_condition(condition, attributes, opts),
	}
}

pub fn evaluate_condition(condition: &Condition, attributes: &Map<String, Value>, opts: &EvalOptions) -> Outcome {
	match condition {
		Condition::All(items) => {
			let mut outcome = Outcome::Match;
			for item in items {
				outcome = outcome.and(evaluate_condition(item, attributes, opts));
				if outcome == Outcome::NoMatch {
					break;
				}
			}
			outcome
		}
		Condition::Any(items) => {
			let mut outcome = Outcome::NoMatch;
			for item in items {
				outcome = outcome.or(evaluate_condition(item, attributes, opts));
				if outcome == Outcome::Match {
					break;
				}
			}
			outcome
		}
		Condition::Not(inner) => evaluate_condition(inner, attributes, opts).not(),
		Condition::Field { path, test } => {
			let actual = value::field(attributes, path);
			match test {
				FieldTest::Literal(expected) => Outcome::from_bool(matching::equals(actual.as_ref(), expected)),
				FieldTest::Operators(ops) => evaluate_ops(ops, actual.as_ref(), opts),
			}
		}
		Condition::Unsupported { operator } => {
			debug!(operator = %operator, "unsupported condition operator");
			Outcome::Indeterminate
		}
	}
}

fn evaluate_ops(ops: &[FieldOp], actual: Option<&Value>, opts: &EvalOptions) -> Outcome {
	let mut outcome = Outcome::Match;
	for op in ops {
		outcome = outcome.and(evaluate_op(op, actual, opts));
		if outcome == Outcome::NoMatch {
			break;
		}
	}
	outcome
}

fn evaluate_op(op: &FieldOp, actual: Option<&Value>, opts: &EvalOptions) -> Outcome {
	match op {
		FieldOp::Not(inner) => evaluate_ops(inner, actual, opts).not(),
		FieldOp::ElemMatch(elem) => evaluate_elem_match(elem, actual, opts),
		FieldOp::Unsupported(name) => {
			debug!(operator = %name, "unsupported field operator");
			Outcome::Indeterminate
		}
		FieldOp::Unbound { operator, token } => {
			debug!(operator = %operator, token = %token, "operand bound to nothing");
			Outcome::Indeterminate
		}
		simple => match check(simple, actual, opts) {
			Ok(matched) => Outcome::from_bool(matched),
			Err(e) => {
				debug!(code = e.code(), error = %e, "operator evaluation failed");
				Outcome::Indeterminate
			}
		},
	}
}

fn evaluate_elem_match(elem: &ElemMatch, actual: Option<&Value>, opts: &EvalOptions) -> Outcome {
	let Some(Value::Array(items)) = actual else {
		return Outcome::NoMatch;
	};
	let mut outcome = Outcome::NoMatch;
	for item in items {
		let item_outcome = match elem {
			ElemMatch::Operators(ops) => evaluate_ops(ops, Some(item), opts),
			ElemMatch::Document(condition) => match item {
				Value::Object(map) => evaluate_condition(condition, map, opts),
				_ => Outcome::NoMatch,
			},
		};
		outcome = outcome.or(item_outcome);
		if outcome == Outcome::Match {
			break;
		}
	}
	outcome
}

fn check(op: &FieldOp, actual: Option<&Value>, opts: &EvalOptions) -> Result<bool> {
	Ok(match op {
		FieldOp::Eq(expected) => matching::equals(actual, expected),
		FieldOp::Ne(expected) => !matching::equals(actual, expected),
		FieldOp::Gt(bound) => matching::ordering(actual, comparable(op, bound)?, |o| o.is_gt()),
		FieldOp::Gte(bound) => matching::ordering(actual, comparable(op, bound)?, |o| o.is_ge()),
		FieldOp::Lt(bound) => matching::ordering(actual, comparable(op, bound)?, |o| o.is_lt()),
		FieldOp::Lte(bound) => matching::ordering(actual, comparable(op, bound)?, |o| o.is_le()),
		FieldOp::In(set) => matching::in_set(actual, list(op, set)?),
		FieldOp::Nin(set) => !matching::in_set(actual, list(op, set)?),
		FieldOp::All(set) | FieldOp::Contains(set) => matching::array(actual, ArrayOp::Contains, list(op, set)?),
		FieldOp::Contained(set) => matching::array(actual, ArrayOp::Contained, list(op, set)?),
		FieldOp::Overlap(set) => matching::array(actual, ArrayOp::Overlap, list(op, set)?),
		FieldOp::Size(n) => {
			let n = n
				.as_u64()
				.ok_or_else(|| AuthzError::evaluation(op.name(), "operand must be a non-negative integer"))?;
			matching::size(actual, n)
		}
		FieldOp::Exists(flag) => {
			let flag = flag
				.as_bool()
				.ok_or_else(|| AuthzError::evaluation(op.name(), "operand must be a boolean"))?;
			matching::exists(actual) == flag
		}
		FieldOp::Between(range) => {
			let (low, high) = range_bounds(op, range)?;
			matching::between(actual, low, high)
		}
		FieldOp::NotBetween(range) => {
			let (low, high) = range_bounds(op, range)?;
			!matching::between(actual, low, high)
		}
		FieldOp::StartsWith(needle) => matching::text(actual, LikeKind::StartsWith, text(op, needle)?),
		FieldOp::EndsWith(needle) => matching::text(actual, LikeKind::EndsWith, text(op, needle)?),
		FieldOp::Substring(needle) => matching::text(actual, LikeKind::Substring, text(op, needle)?),
		FieldOp::Regex {
			compiled: Some(regex), ..
		} => regex.is_match(actual),
		FieldOp::Regex { pattern, options, .. } => {
			let (pattern, case_insensitive) = regex_operand(pattern, options.as_deref())?;
			RegexPattern::new(pattern, case_insensitive, opts.regex_size_limit)?.is_match(actual)
		}
		FieldOp::Not(_) | FieldOp::ElemMatch(_) | FieldOp::Unsupported(_) | FieldOp::Unbound { .. } => {
			return Err(AuthzError::evaluation(op.name(), "not a simple operator"))
		}
	})
}

pub(crate) fn comparable<'v>(op: &FieldOp, operand: &'v Value) -> Result<&'v Value> {
	if is_comparable(operand) {
		Ok(operand)
	} else {
		Err(AuthzError::evaluation(
			op.name(),
			format!("cannot order by a {}", value::type_name(operand)),
		))
	}
}

pub(crate) fn list<'v>(op: &FieldOp, operand: &'v Value) -> Result<&'v [Value]> {
	operand
		.as_array()
		.map(Vec::as_slice)
		.ok_or_else(|| AuthzError::evaluation(op.name(), "operand must be an array"))
}

pub(crate) fn text<'v>(op: &FieldOp, operand: &'v Value) -> Result<&'v str> {
	operand
		.as_str()
		.ok_or_else(|| AuthzError::evaluation(op.name(), "operand must be a string"))
}

pub(crate) fn range_bounds<'v>(op: &FieldOp, operand: &'v Value) -> Result<(&'v Value, &'v Value)> {
	match operand.as_array().map(Vec::as_slice) {
		Some([low, high]) if is_comparable(low) && is_comparable(high) => Ok((low, high)),
		_ => Err(AuthzError::evaluation(
			op.name(),
			"operand must be a [low, high] pair of scalars",
		)),
	}
}

/// Pattern and case flag of a `$regex`. Only the `i` option is supported.
pub(crate) fn regex_operand<'v>(pattern: &'v Value, options: Option<&str>) -> Result<(&'v str, bool)> {
	let pattern = pattern
		.as_str()
		.ok_or_else(|| AuthzError::evaluation("$regex", "pattern must be a string"))?;
	let options = options.unwrap_or("");
	if let Some(flag) = options.chars().find(|c| *c != 'i') {
		return Err(AuthzError::evaluation(
			"$regex",
			format!("unsupported option '{flag}'"),
		));
	}
	Ok((pattern, options.contains('i')))
}
