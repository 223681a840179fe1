// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Condition trees.
//!
//! Grants express conditions as Mongo-style JSON documents:
//!
//! ```text
//! { "branchId": { "$in": "$principal.settings.managedBranches" },
//!   "status": "published",
//!   "$or": [ { "price": { "$lt": 500000 } }, { "featured": true } ] }
//! ```
//!
//! [`Condition::parse`] turns such a document into a closed AST with one
//! variant per operator. Keys of one document are AND'ed. Operands stay JSON
//! values because they may still hold `$principal.` variable tokens that are
//! bound later, per principal.
//!
//! Unknown operators are kept as `Unsupported` nodes rather than rejected.
//! What they mean depends on where they are evaluated, and the engine decides
//! that (object mode and query mode fail in different directions).

use serde_json::{Map, Value};

use crate::error::{AuthzError, Result};
use crate::matching::RegexPattern;

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
	/// Conjunction. Also produced for a document with several keys.
	All(Vec<Condition>),
	/// `$or`
	Any(Vec<Condition>),
	/// Document-level `$not`
	Not(Box<Condition>),
	Field { path: String, test: FieldTest },
	/// A `$`-prefixed document key outside the operator set.
	Unsupported { operator: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldTest {
	/// A bare value: equality, or membership when the attribute is an array.
	Literal(Value),
	/// An operator object; its operators are AND'ed.
	Operators(Vec<FieldOp>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
	Eq(Value),
	Ne(Value),
	Gt(Value),
	Gte(Value),
	Lt(Value),
	Lte(Value),
	In(Value),
	Nin(Value),
	All(Value),
	Size(Value),
	/// `compiled` is filled in once the pattern is bound to a principal.
	Regex {
		pattern: Value,
		options: Option<String>,
		compiled: Option<RegexPattern>,
	},
	Exists(Value),
	ElemMatch(Box<ElemMatch>),
	Not(Vec<FieldOp>),
	Between(Value),
	NotBetween(Value),
	StartsWith(Value),
	EndsWith(Value),
	Substring(Value),
	Contains(Value),
	Contained(Value),
	Overlap(Value),
	Unsupported(String),
	/// A scalar operand whose `$principal.` variable bound to nothing. Never
	/// produced by parsing.
	Unbound { operator: String, token: String },
}

/// Sub-condition applied to each element of an array attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum ElemMatch {
	/// `{"$elemMatch": {"$gte": 3}}` for arrays of scalars.
	Operators(Vec<FieldOp>),
	/// `{"$elemMatch": {"status": "free"}}` for arrays of objects.
	Document(Condition),
}

impl FieldOp {
	/// The operator as written in a grant.
	pub fn name(&self) -> &str {
		match self {
			FieldOp::Eq(_) => "$eq",
			FieldOp::Ne(_) => "$ne",
			FieldOp::Gt(_) => "$gt",
			FieldOp::Gte(_) => "$gte",
			FieldOp::Lt(_) => "$lt",
			FieldOp::Lte(_) => "$lte",
			FieldOp::In(_) => "$in",
			FieldOp::Nin(_) => "$nin",
			FieldOp::All(_) => "$all",
			FieldOp::Size(_) => "$size",
			FieldOp::Regex { .. } => "$regex",
			FieldOp::Exists(_) => "$exists",
			FieldOp::ElemMatch(_) => "$elemMatch",
			FieldOp::Not(_) => "$not",
			FieldOp::Between(_) => "$between",
			FieldOp::NotBetween(_) => "$notBetween",
			FieldOp::StartsWith(_) => "$startsWith",
			FieldOp::EndsWith(_) => "$endsWith",
			FieldOp::Substring(_) => "$substring",
			FieldOp::Contains(_) => "$contains",
			FieldOp::Contained(_) => "$contained",
			FieldOp::Overlap(_) => "$overlap",
			FieldOp::Unsupported(name) => name,
			FieldOp::Unbound { operator, .. } => operator,
		}
	}

	/// Operators whose operand is a list of values.
	pub fn takes_list(&self) -> bool {
		matches!(
			self,
			FieldOp::In(_)
				| FieldOp::Nin(_)
				| FieldOp::All(_)
				| FieldOp::Contains(_)
				| FieldOp::Contained(_)
				| FieldOp::Overlap(_)
		)
	}
}

impl Condition {
	/// Parses a condition document, rejecting trees nested deeper than
	/// `max_depth`.
	pub fn parse(document: &Value, max_depth: usize) -> Result<Condition> {
		let map = as_document(document, "conditions")?;
		parse_document(map, 1, max_depth)
	}

	/// Returns true if any node in the tree is an unknown operator.
	pub fn has_unsupported(&self) -> bool {
		match self {
			Condition::All(items) | Condition::Any(items) => items.iter().any(Condition::has_unsupported),
			Condition::Not(inner) => inner.has_unsupported(),
			Condition::Field { test, .. } => match test {
				FieldTest::Literal(_) => false,
				FieldTest::Operators(ops) => ops.iter().any(op_has_unsupported),
			},
			Condition::Unsupported { .. } => true,
		}
	}
}

impl Condition {
	/// Renders the tree back into its document form.
	pub fn to_value(&self) -> Value {
		match self {
			Condition::All(items) => single("$and", Value::Array(items.iter().map(Condition::to_value).collect())),
			Condition::Any(items) => single("$or", Value::Array(items.iter().map(Condition::to_value).collect())),
			Condition::Not(inner) => single("$not", inner.to_value()),
			Condition::Field { path, test } => single(
				path,
				match test {
					FieldTest::Literal(value) => value.clone(),
					FieldTest::Operators(ops) => operators_to_value(ops),
				},
			),
			Condition::Unsupported { operator } => single(operator, Value::Null),
		}
	}
}

fn single(key: &str, value: Value) -> Value {
	let mut map = Map::new();
	map.insert(key.to_string(), value);
	Value::Object(map)
}

fn operators_to_value(ops: &[FieldOp]) -> Value {
	let mut map = Map::new();
	for op in ops {
		let operand = match op {
			FieldOp::Eq(v)
			| FieldOp::Ne(v)
			| FieldOp::Gt(v)
			| FieldOp::Gte(v)
			| FieldOp::Lt(v)
			| FieldOp::Lte(v)
			| FieldOp::In(v)
			| FieldOp::Nin(v)
			| FieldOp::All(v)
			| FieldOp::Size(v)
			| FieldOp::Exists(v)
			| FieldOp::Between(v)
			| FieldOp::NotBetween(v)
			| FieldOp::StartsWith(v)
			| FieldOp::EndsWith(v)
			| FieldOp::Substring(v)
			| FieldOp::Contains(v)
			| FieldOp::Contained(v)
			| FieldOp::Overlap(v) => v.clone(),
			FieldOp::Regex { pattern, options, .. } => {
				if let Some(options) = options {
					map.insert("$options".to_string(), Value::String(options.clone()));
				}
				pattern.clone()
			}
			FieldOp::ElemMatch(elem) => match elem.as_ref() {
				ElemMatch::Operators(inner) => operators_to_value(inner),
				ElemMatch::Document(condition) => condition.to_value(),
			},
			FieldOp::Not(inner) => operators_to_value(inner),
			FieldOp::Unsupported(_) => Value::Null,
			FieldOp::Unbound { token, .. } => Value::String(token.clone()),
		};
		map.insert(op.name().to_string(), operand);
	}
	Value::Object(map)
}

fn op_has_unsupported(op: &FieldOp) -> bool {
	match op {
		FieldOp::Unsupported(_) => true,
		FieldOp::Not(ops) => ops.iter().any(op_has_unsupported),
		FieldOp::ElemMatch(elem) => match elem.as_ref() {
			ElemMatch::Operators(ops) => ops.iter().any(op_has_unsupported),
			ElemMatch::Document(condition) => condition.has_unsupported(),
		},
		_ => false,
	}
}

fn as_document<'a>(value: &'a Value, context: &str) -> Result<&'a Map<String, Value>> {
	value.as_object().ok_or_else(|| {
		AuthzError::Configuration(format!(
			"{context} must be an object, got {}",
			crate::value::type_name(value)
		))
	})
}

fn check_depth(depth: usize, max_depth: usize) -> Result<()> {
	if depth > max_depth {
		return Err(AuthzError::Configuration(format!(
			"condition tree is nested deeper than {max_depth} levels"
		)));
	}
	Ok(())
}

fn parse_document(map: &Map<String, Value>, depth: usize, max_depth: usize) -> Result<Condition> {
	check_depth(depth, max_depth)?;

	let mut clauses = Vec::with_capacity(map.len());
	for (key, value) in map {
		let clause = match key.as_str() {
			"$and" => Condition::All(parse_list(key, value, depth, max_depth)?),
			"$or" => Condition::Any(parse_list(key, value, depth, max_depth)?),
			"$not" => {
				let inner = as_document(value, "$not")?;
				Condition::Not(Box::new(parse_document(inner, depth + 1, max_depth)?))
			}
			"" => {
				return Err(AuthzError::Configuration(
					"condition has an empty field name".to_string(),
				))
			}
			operator if operator.starts_with('$') => Condition::Unsupported {
				operator: operator.to_string(),
			},
			path => Condition::Field {
				path: path.to_string(),
				test: parse_field_test(path, value, depth + 1, max_depth)?,
			},
		};
		clauses.push(clause);
	}

	Ok(match clauses.len() {
		1 => clauses.remove(0),
		_ => Condition::All(clauses),
	})
}

fn parse_list(key: &str, value: &Value, depth: usize, max_depth: usize) -> Result<Vec<Condition>> {
	let items = value
		.as_array()
		.ok_or_else(|| AuthzError::Configuration(format!("{key} expects an array of conditions")))?;
	items
		.iter()
		.map(|item| parse_document(as_document(item, key)?, depth + 1, max_depth))
		.collect()
}

fn is_operator_object(map: &Map<String, Value>) -> Result<bool> {
	let operators = map.keys().filter(|k| k.starts_with('$')).count();
	if operators > 0 && operators < map.len() {
		return Err(AuthzError::Configuration(
			"condition mixes operators and plain keys in one object".to_string(),
		));
	}
	Ok(operators > 0)
}

fn parse_field_test(path: &str, value: &Value, depth: usize, max_depth: usize) -> Result<FieldTest> {
	check_depth(depth, max_depth)?;

	match value {
		Value::Object(map) if !map.is_empty() && is_operator_object(map)? => {
			Ok(FieldTest::Operators(parse_operators(path, map, depth, max_depth)?))
		}
		other => Ok(FieldTest::Literal(other.clone())),
	}
}

fn parse_operators(
	path: &str,
	map: &Map<String, Value>,
	depth: usize,
	max_depth: usize,
) -> Result<Vec<FieldOp>> {
	check_depth(depth, max_depth)?;

	let options = match map.get("$options") {
		None => None,
		Some(Value::String(flags)) => Some(flags.clone()),
		Some(_) => {
			return Err(AuthzError::Configuration(format!(
				"$options on {path} must be a string"
			)))
		}
	};
	if options.is_some() && !map.contains_key("$regex") {
		return Err(AuthzError::Configuration(format!(
			"$options on {path} requires $regex"
		)));
	}

	let mut ops = Vec::with_capacity(map.len());
	for (key, operand) in map {
		let op = match key.as_str() {
			"$eq" => FieldOp::Eq(operand.clone()),
			"$ne" => FieldOp::Ne(operand.clone()),
			"$gt" => FieldOp::Gt(operand.clone()),
			"$gte" => FieldOp::Gte(operand.clone()),
			"$lt" => FieldOp::Lt(operand.clone()),
			"$lte" => FieldOp::Lte(operand.clone()),
			"$in" => FieldOp::In(operand.clone()),
			"$nin" => FieldOp::Nin(operand.clone()),
			"$all" => FieldOp::All(operand.clone()),
			"$size" => FieldOp::Size(operand.clone()),
			"$regex" => FieldOp::Regex {
				pattern: operand.clone(),
				options: options.clone(),
				compiled: None,
			},
			"$options" => continue,
			"$exists" => FieldOp::Exists(operand.clone()),
			"$elemMatch" => FieldOp::ElemMatch(Box::new(parse_elem_match(path, operand, depth + 1, max_depth)?)),
			"$not" => {
				let inner = as_document(operand, "$not")?;
				if inner.is_empty() || !is_operator_object(inner)? {
					return Err(AuthzError::Configuration(format!(
						"$not on {path} expects an operator object"
					)));
				}
				FieldOp::Not(parse_operators(path, inner, depth + 1, max_depth)?)
			}
			"$between" => FieldOp::Between(operand.clone()),
			"$notBetween" => FieldOp::NotBetween(operand.clone()),
			"$startsWith" => FieldOp::StartsWith(operand.clone()),
			"$endsWith" => FieldOp::EndsWith(operand.clone()),
			"$substring" => FieldOp::Substring(operand.clone()),
			"$contains" => FieldOp::Contains(operand.clone()),
			"$contained" => FieldOp::Contained(operand.clone()),
			"$overlap" => FieldOp::Overlap(operand.clone()),
			other => FieldOp::Unsupported(other.to_string()),
		};
		ops.push(op);
	}
	Ok(ops)
}

fn parse_elem_match(path: &str, operand: &Value, depth: usize, max_depth: usize) -> Result<ElemMatch> {
	check_depth(depth, max_depth)?;

	let map = as_document(operand, "$elemMatch")?;
	let logical = map.keys().any(|k| k == "$and" || k == "$or");
	if !map.is_empty() && !logical && is_operator_object(map)? {
		Ok(ElemMatch::Operators(parse_operators(path, map, depth, max_depth)?))
	} else {
		Ok(ElemMatch::Document(parse_document(map, depth, max_depth)?))
	}
}
