// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Query-mode translation.
//!
//! Turns the rules governing one action and subject into a single row
//! [`Predicate`]:
//!
//! ```text
//! (allow_1 OR allow_2 OR ...) AND NOT (deny_1 OR deny_2 OR ...)
//! ```
//!
//! `$elemMatch` becomes an element predicate over the array attribute. In its
//! operator form the element itself is addressed as [`ELEMENT`].
//!
//! Unknown operators, ill-shaped operands and operands bound to nothing
//! cannot be translated. An allow-rule using one is dropped, which narrows
//! the filter. A deny-rule using one collapses the filter to "no rows".

use serde_json::Value;
use tracing::{debug, error};

use estate_authz_core::{
	ArrayOp, AuthzError, CompareOp, Condition, ElemMatch, ElementForm, FieldOp, FieldTest, LikeKind, Predicate,
	RegexPattern, Result, Rule, ELEMENT,
};

use crate::evaluate::{comparable, list, range_bounds, regex_operand, text, EvalOptions};

/// Builds the row filter for `rules`, which must already be filtered to one
/// action and subject.
///
/// Returns `None` when every row passes.
pub fn translate<'a, I>(rules: I, opts: &EvalOptions) -> Option<Predicate>
where
	I: IntoIterator<Item = &'a Rule>,
{
	let mut allows = Vec::new();
	let mut denies = Vec::new();

	for rule in rules {
		if rule.is_allow() {
			match &rule.condition {
				None => allows.push(Predicate::always()),
				Some(condition) => match to_predicate(condition, opts) {
					Ok(predicate) => allows.push(predicate),
					Err(e) => {
						error!(rule = %rule, code = e.code(), error = %e, "dropping untranslatable allow rule from filter");
					}
				},
			}
			continue;
		}

		if rule.is_field_restricted() {
			debug!(rule = %rule, "field-restricted deny rule does not narrow rows");
			continue;
		}
		match &rule.condition {
			None => {
				debug!(rule = %rule, "unconditional deny rule excludes every row");
				return Some(Predicate::never());
			}
			Some(condition) => match to_predicate(condition, opts) {
				Ok(predicate) => denies.push(predicate),
				Err(e) => {
					error!(rule = %rule, code = e.code(), error = %e, "untranslatable deny rule, excluding every row");
					return Some(Predicate::never());
				}
			},
		}
	}

	let filter = Predicate::and(vec![Predicate::or(allows), Predicate::not(Predicate::or(denies))]);
	if filter.is_always() {
		None
	} else {
		Some(filter)
	}
}

/// Translates one condition tree.
pub fn to_predicate(condition: &Condition, opts: &EvalOptions) -> Result<Predicate> {
	Ok(match condition {
		Condition::All(items) => Predicate::and(
			items
				.iter()
				.map(|c| to_predicate(c, opts))
				.collect::<Result<Vec<_>>>()?,
		),
		Condition::Any(items) => Predicate::or(
			items
				.iter()
				.map(|c| to_predicate(c, opts))
				.collect::<Result<Vec<_>>>()?,
		),
		Condition::Not(inner) => Predicate::not(to_predicate(inner, opts)?),
		Condition::Field { path, test } => match test {
			FieldTest::Literal(value) => Predicate::compare(path, CompareOp::Eq, value.clone()),
			FieldTest::Operators(ops) => ops_predicate(path, ops, opts)?,
		},
		Condition::Unsupported { operator } => return Err(AuthzError::translation(operator, "(document)")),
	})
}

fn ops_predicate(path: &str, ops: &[FieldOp], opts: &EvalOptions) -> Result<Predicate> {
	Ok(Predicate::and(
		ops
			.iter()
			.map(|op| op_predicate(path, op, opts))
			.collect::<Result<Vec<_>>>()?,
	))
}

fn op_predicate(path: &str, op: &FieldOp, opts: &EvalOptions) -> Result<Predicate> {
	let untranslatable = |_: AuthzError| AuthzError::translation(op.name(), path);
	let field = path.to_string();

	let compare = |cmp: CompareOp, operand: &Value| -> Result<Predicate> {
		Ok(Predicate::compare(path, cmp, comparable(op, operand).map_err(untranslatable)?.clone()))
	};
	let array = |array_op: ArrayOp, operand: &Value| -> Result<Predicate> {
		Ok(Predicate::Array {
			field: path.to_string(),
			op: array_op,
			values: list(op, operand).map_err(untranslatable)?.to_vec(),
		})
	};
	let like = |kind: LikeKind, operand: &Value| -> Result<Predicate> {
		Ok(Predicate::Like {
			field: path.to_string(),
			kind,
			pattern: text(op, operand).map_err(untranslatable)?.to_string(),
		})
	};

	Ok(match op {
		FieldOp::Eq(value) => Predicate::compare(path, CompareOp::Eq, value.clone()),
		FieldOp::Ne(value) => Predicate::compare(path, CompareOp::Ne, value.clone()),
		FieldOp::Gt(value) => compare(CompareOp::Gt, value)?,
		FieldOp::Gte(value) => compare(CompareOp::Gte, value)?,
		FieldOp::Lt(value) => compare(CompareOp::Lt, value)?,
		FieldOp::Lte(value) => compare(CompareOp::Lte, value)?,
		FieldOp::In(values) => Predicate::In {
			field,
			values: list(op, values).map_err(untranslatable)?.to_vec(),
		},
		FieldOp::Nin(values) => Predicate::NotIn {
			field,
			values: list(op, values).map_err(untranslatable)?.to_vec(),
		},
		FieldOp::All(values) | FieldOp::Contains(values) => array(ArrayOp::Contains, values)?,
		FieldOp::Contained(values) => array(ArrayOp::Contained, values)?,
		FieldOp::Overlap(values) => array(ArrayOp::Overlap, values)?,
		FieldOp::Between(range) => {
			let (low, high) = range_bounds(op, range).map_err(untranslatable)?;
			Predicate::Between {
				field,
				low: low.clone(),
				high: high.clone(),
			}
		}
		FieldOp::NotBetween(range) => {
			let (low, high) = range_bounds(op, range).map_err(untranslatable)?;
			Predicate::NotBetween {
				field,
				low: low.clone(),
				high: high.clone(),
			}
		}
		FieldOp::StartsWith(needle) => like(LikeKind::StartsWith, needle)?,
		FieldOp::EndsWith(needle) => like(LikeKind::EndsWith, needle)?,
		FieldOp::Substring(needle) => like(LikeKind::Substring, needle)?,
		FieldOp::Regex {
			compiled: Some(regex), ..
		} => Predicate::Regexp {
			field,
			regex: regex.clone(),
		},
		FieldOp::Regex { pattern, options, .. } => {
			let (pattern, case_insensitive) = regex_operand(pattern, options.as_deref()).map_err(untranslatable)?;
			Predicate::Regexp {
				field,
				regex: RegexPattern::new(pattern, case_insensitive, opts.regex_size_limit).map_err(untranslatable)?,
			}
		}
		FieldOp::Exists(flag) => Predicate::Exists {
			field,
			present: flag.as_bool().ok_or_else(|| AuthzError::translation(op.name(), path))?,
		},
		FieldOp::Not(inner) => Predicate::not(ops_predicate(path, inner, opts)?),
		FieldOp::Size(len) => Predicate::Size {
			field,
			len: len.as_u64().ok_or_else(|| AuthzError::translation(op.name(), path))?,
		},
		FieldOp::ElemMatch(elem) => match elem.as_ref() {
			ElemMatch::Operators(ops) => Predicate::ElemMatch {
				field,
				form: ElementForm::Value,
				element: Box::new(ops_predicate(ELEMENT, ops, opts)?),
			},
			ElemMatch::Document(condition) => Predicate::ElemMatch {
				field,
				form: ElementForm::Document,
				element: Box::new(to_predicate(condition, opts)?),
			},
		},
		FieldOp::Unbound { token, .. } => {
			return Err(AuthzError::Resolution {
				path: token.clone(),
			})
		}
		FieldOp::Unsupported(_) => return Err(AuthzError::translation(op.name(), path)),
	})
}
