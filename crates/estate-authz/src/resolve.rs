// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Binding of principal variables inside condition trees.
//!
//! Any string operand starting with `$principal.` is replaced by the value at
//! that dotted path of the principal. No variable name is special: the path
//! is looked up the same way whatever operator it sits under.
//!
//! A path the principal lacks (or holds `null` at) binds to nothing:
//!
//! - as a whole scalar operand or bare value, the test becomes
//!   [`FieldOp::Unbound`], which never grants and always blocks;
//! - inside a list operand it contributes no element;
//! - nested deeper in an operand it binds to `null`.
//!
//! Operands of list operators are normalized to arrays after binding, so
//! `{"$in": "$principal.settings.managedBranches"}` and
//! `{"$in": ["$principal.branchId", "HQ"]}` both yield a flat list.
//!
//! `$regex` patterns are compiled here, once per request.

use serde_json::{Map, Value};
use tracing::debug;

use estate_authz_core::{Action, Condition, ElemMatch, FieldOp, FieldTest, Principal, RegexPattern, Rule};

use crate::evaluate::{regex_operand, EvalOptions};

pub const VARIABLE_SIGIL: &str = "$principal.";

/// A principal's rules with every variable bound. Lives for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedRuleSet {
	rules: Vec<Rule>,
}

impl ResolvedRuleSet {
	pub fn rules(&self) -> &[Rule] {
		&self.rules
	}

	pub fn len(&self) -> usize {
		self.rules.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rules.is_empty()
	}

	/// Rules governing `action` on `subject`, highest priority first.
	pub fn applicable<'a>(
		&'a self,
		action: Action,
		subject: &'a str,
	) -> impl Iterator<Item = &'a Rule> + Clone + 'a {
		self.rules.iter().filter(move |r| r.applies_to(action, subject))
	}
}

/// Produces a bound copy of every rule. The input rules are left untouched.
pub fn resolve(rules: &[Rule], principal: &Principal, opts: &EvalOptions) -> ResolvedRuleSet {
	let binder = Binder { principal, opts };
	let rules = rules
		.iter()
		.map(|rule| match &rule.condition {
			None => rule.clone(),
			Some(condition) => Rule {
				condition: Some(binder.condition(condition)),
				..rule.clone()
			},
		})
		.collect();
	ResolvedRuleSet { rules }
}

struct Binder<'a> {
	principal: &'a Principal,
	opts: &'a EvalOptions,
}

impl Binder<'_> {
	fn condition(&self, condition: &Condition) -> Condition {
		match condition {
			Condition::All(items) => Condition::All(items.iter().map(|c| self.condition(c)).collect()),
			Condition::Any(items) => Condition::Any(items.iter().map(|c| self.condition(c)).collect()),
			Condition::Not(inner) => Condition::Not(Box::new(self.condition(inner))),
			Condition::Field { path, test } => Condition::Field {
				path: path.clone(),
				test: match test {
					FieldTest::Literal(value) => match self.unbound("$eq", value) {
						Some(op) => FieldTest::Operators(vec![op]),
						None => FieldTest::Literal(resolve_value(value, self.principal)),
					},
					FieldTest::Operators(ops) => FieldTest::Operators(self.ops(ops)),
				},
			},
			Condition::Unsupported { .. } => condition.clone(),
		}
	}

	fn ops(&self, ops: &[FieldOp]) -> Vec<FieldOp> {
		ops.iter().map(|op| self.op(op)).collect()
	}

	fn op(&self, op: &FieldOp) -> FieldOp {
		if let Some(unbound) = scalar_operand(op).and_then(|operand| self.unbound(op.name(), operand)) {
			return unbound;
		}

		let value = |v: &Value| resolve_value(v, self.principal);
		let list = |v: &Value| resolve_list(v, self.principal);

		match op {
			FieldOp::Eq(v) => FieldOp::Eq(value(v)),
			FieldOp::Ne(v) => FieldOp::Ne(value(v)),
			FieldOp::Gt(v) => FieldOp::Gt(value(v)),
			FieldOp::Gte(v) => FieldOp::Gte(value(v)),
			FieldOp::Lt(v) => FieldOp::Lt(value(v)),
			FieldOp::Lte(v) => FieldOp::Lte(value(v)),
			FieldOp::In(v) => FieldOp::In(list(v)),
			FieldOp::Nin(v) => FieldOp::Nin(list(v)),
			FieldOp::All(v) => FieldOp::All(list(v)),
			FieldOp::Size(v) => FieldOp::Size(value(v)),
			FieldOp::Regex { pattern, options, .. } => {
				let pattern = value(pattern);
				let compiled = regex_operand(&pattern, options.as_deref())
					.and_then(|(source, case_insensitive)| {
						RegexPattern::new(source, case_insensitive, self.opts.regex_size_limit)
					})
					.ok();
				FieldOp::Regex {
					pattern,
					options: options.clone(),
					compiled,
				}
			}
			FieldOp::Exists(v) => FieldOp::Exists(value(v)),
			FieldOp::ElemMatch(elem) => FieldOp::ElemMatch(Box::new(match elem.as_ref() {
				ElemMatch::Operators(ops) => ElemMatch::Operators(self.ops(ops)),
				ElemMatch::Document(condition) => ElemMatch::Document(self.condition(condition)),
			})),
			FieldOp::Not(ops) => FieldOp::Not(self.ops(ops)),
			FieldOp::Between(v) => FieldOp::Between(value(v)),
			FieldOp::NotBetween(v) => FieldOp::NotBetween(value(v)),
			FieldOp::StartsWith(v) => FieldOp::StartsWith(value(v)),
			FieldOp::EndsWith(v) => FieldOp::EndsWith(value(v)),
			FieldOp::Substring(v) => FieldOp::Substring(value(v)),
			FieldOp::Contains(v) => FieldOp::Contains(list(v)),
			FieldOp::Contained(v) => FieldOp::Contained(list(v)),
			FieldOp::Overlap(v) => FieldOp::Overlap(list(v)),
			FieldOp::Unsupported(_) | FieldOp::Unbound { .. } => op.clone(),
		}
	}

	/// `Some` when `operand` is a variable the principal cannot bind.
	fn unbound(&self, operator: &str, operand: &Value) -> Option<FieldOp> {
		let path = variable_path(operand)?;
		if self.principal.lookup(path).is_some_and(|v| !v.is_null()) {
			return None;
		}
		debug!(
			path,
			operator,
			principal_id = %self.principal.id,
			code = "RESOLUTION_ERROR",
			"unresolved principal variable"
		);
		Some(FieldOp::Unbound {
			operator: operator.to_string(),
			token: format!("{VARIABLE_SIGIL}{path}"),
		})
	}
}

/// The operand of operators that compare against one value.
fn scalar_operand(op: &FieldOp) -> Option<&Value> {
	match op {
		FieldOp::Eq(v)
		| FieldOp::Ne(v)
		| FieldOp::Gt(v)
		| FieldOp::Gte(v)
		| FieldOp::Lt(v)
		| FieldOp::Lte(v)
		| FieldOp::Size(v)
		| FieldOp::Exists(v)
		| FieldOp::Between(v)
		| FieldOp::NotBetween(v)
		| FieldOp::StartsWith(v)
		| FieldOp::EndsWith(v)
		| FieldOp::Substring(v) => Some(v),
		FieldOp::Regex { pattern, .. } => Some(pattern),
		_ => None,
	}
}

fn variable_path(value: &Value) -> Option<&str> {
	match value {
		Value::String(s) => s.strip_prefix(VARIABLE_SIGIL),
		_ => None,
	}
}

fn lookup(path: &str, principal: &Principal) -> Value {
	match principal.lookup(path) {
		Some(value) => value,
		None => {
			debug!(path, principal_id = %principal.id, "unresolved principal variable, binding null");
			Value::Null
		}
	}
}

/// Deep replacement of variable tokens.
pub fn resolve_value(value: &Value, principal: &Principal) -> Value {
	if let Some(path) = variable_path(value) {
		return lookup(path, principal);
	}
	match value {
		Value::Array(items) => Value::Array(items.iter().map(|v| resolve_value(v, principal)).collect()),
		Value::Object(map) => Value::Object(
			map.iter()
				.map(|(k, v)| (k.clone(), resolve_value(v, principal)))
				.collect::<Map<String, Value>>(),
		),
		other => other.clone(),
	}
}

/// Binds a list operand and normalizes it to a flat array.
///
/// Variables that bind to an array are spliced in; variables that bind to
/// nothing contribute nothing.
pub fn resolve_list(value: &Value, principal: &Principal) -> Value {
	let mut out = Vec::new();
	match value {
		Value::Array(items) => {
			for item in items {
				match variable_path(item) {
					Some(path) => splice(lookup(path, principal), &mut out),
					None => out.push(resolve_value(item, principal)),
				}
			}
		}
		other => splice(resolve_value(other, principal), &mut out),
	}
	Value::Array(out)
}

fn splice(bound: Value, out: &mut Vec<Value>) {
	match bound {
		Value::Null => {}
		Value::Array(items) => out.extend(items),
		scalar => out.push(scalar),
	}
}
