// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! PostgreSQL rendering of [`Predicate`] trees.
//!
//! Output is a parameterized `WHERE` fragment: values never appear in the SQL
//! text, only `$n` placeholders. Identifiers are double-quoted and a dotted
//! field path renders as a qualified name (`"listing"."price"`).
//!
//! Negative forms are NULL-safe so that a row with a missing attribute is
//! selected exactly when [`Predicate::matches`] would select it. Negation
//! renders as `(...) IS NOT TRUE`, so a sub-expression that is NULL for a row
//! counts as false on both sides of a `NOT`.
//!
//! Array attributes are native array columns. An element match unnests the
//! column under an alias (`"e1"`, `"e2"` when nested); document elements are
//! composite values whose fields render as `("e1")."status"`.

use serde::Serialize;
use serde_json::Value;

use crate::predicate::{ArrayOp, CompareOp, ElementForm, LikeKind, Predicate, ELEMENT};

/// A rendered fragment and its positional parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlFragment {
	pub sql: String,
	pub params: Vec<Value>,
}

impl Predicate {
	/// Renders the predicate with placeholders starting at `$1`.
	pub fn to_sql(&self) -> SqlFragment {
		self.to_sql_from(0)
	}

	/// Renders the predicate for appending to a statement that already binds
	/// `offset` parameters.
	pub fn to_sql_from(&self, offset: usize) -> SqlFragment {
		let mut writer = SqlWriter {
			offset,
			params: Vec::new(),
			elements: Vec::new(),
		};
		let sql = writer.render(self);
		SqlFragment {
			sql,
			params: writer.params,
		}
	}
}

struct SqlWriter {
	offset: usize,
	params: Vec<Value>,
	/// Enclosing element matches, innermost last.
	elements: Vec<(String, ElementForm)>,
}

impl SqlWriter {
	fn column(&self, field: &str) -> String {
		match self.elements.last() {
			None => quote_path(field),
			Some((alias, ElementForm::Value)) if field == ELEMENT => quote_path(alias),
			Some((alias, _)) => format!("({}).{}", quote_path(alias), quote_path(field)),
		}
	}

	fn bind(&mut self, value: Value) -> String {
		self.params.push(value);
		format!("${}", self.offset + self.params.len())
	}

	fn bind_list(&mut self, values: &[Value]) -> String {
		values
			.iter()
			.map(|v| self.bind(v.clone()))
			.collect::<Vec<_>>()
			.join(", ")
	}

	fn render(&mut self, predicate: &Predicate) -> String {
		match predicate {
			Predicate::Const(true) => "TRUE".to_string(),
			Predicate::Const(false) => "FALSE".to_string(),
			Predicate::And(items) => self.group(items, " AND "),
			Predicate::Or(items) => self.group(items, " OR "),
			Predicate::Not(inner) => format!("({}) IS NOT TRUE", self.render(inner)),
			Predicate::Compare { field, op, value } => self.compare(field, *op, value),
			Predicate::In { field, values } => self.in_list(field, values),
			Predicate::NotIn { field, values } => self.not_in_list(field, values),
			Predicate::Between { field, low, high } => {
				let col = self.column(field);
				let low = self.bind(low.clone());
				let high = self.bind(high.clone());
				format!("{col} BETWEEN {low} AND {high}")
			}
			Predicate::NotBetween { field, low, high } => {
				let col = self.column(field);
				let low = self.bind(low.clone());
				let high = self.bind(high.clone());
				format!("({col} IS NULL OR {col} NOT BETWEEN {low} AND {high})")
			}
			Predicate::Like { field, kind, pattern } => {
				let escaped = escape_like(pattern);
				let pattern = match kind {
					LikeKind::StartsWith => format!("{escaped}%"),
					LikeKind::EndsWith => format!("%{escaped}"),
					LikeKind::Substring => format!("%{escaped}%"),
				};
				let param = self.bind(Value::String(pattern));
				format!("{} LIKE {param} ESCAPE '\\'", self.column(field))
			}
			Predicate::Regexp { field, regex } => {
				let op = if regex.case_insensitive() { "~*" } else { "~" };
				let param = self.bind(Value::String(regex.as_str().to_string()));
				format!("{} {op} {param}", self.column(field))
			}
			Predicate::Exists { field, present } => {
				let test = if *present { "IS NOT NULL" } else { "IS NULL" };
				format!("{} {test}", self.column(field))
			}
			Predicate::Array { field, op, values } => {
				let op = match op {
					ArrayOp::Contains => "@>",
					ArrayOp::Contained => "<@",
					ArrayOp::Overlap => "&&",
				};
				let param = self.bind(Value::Array(values.clone()));
				format!("{} {op} {param}", self.column(field))
			}
			Predicate::Size { field, len } => {
				let col = self.column(field);
				let param = self.bind(Value::from(*len));
				format!("cardinality({col}) = {param}")
			}
			Predicate::ElemMatch { field, form, element } => {
				let col = self.column(field);
				let alias = format!("e{}", self.elements.len() + 1);
				self.elements.push((alias.clone(), *form));
				let inner = self.render(element);
				self.elements.pop();
				format!("EXISTS (SELECT 1 FROM unnest({col}) AS {} WHERE {inner})", quote_path(&alias))
			}
		}
	}

	fn group(&mut self, items: &[Predicate], joiner: &str) -> String {
		let parts: Vec<String> = items.iter().map(|p| self.render(p)).collect();
		format!("({})", parts.join(joiner))
	}

	fn compare(&mut self, field: &str, op: CompareOp, value: &Value) -> String {
		let col = self.column(field);
		match (op, value) {
			(CompareOp::Eq, Value::Null) => format!("{col} IS NULL"),
			(CompareOp::Ne, Value::Null) => format!("{col} IS NOT NULL"),
			(CompareOp::Ne, _) => {
				let param = self.bind(value.clone());
				format!("{col} IS DISTINCT FROM {param}")
			}
			_ => {
				let symbol = match op {
					CompareOp::Eq => "=",
					CompareOp::Ne => "<>",
					CompareOp::Gt => ">",
					CompareOp::Gte => ">=",
					CompareOp::Lt => "<",
					CompareOp::Lte => "<=",
				};
				let param = self.bind(value.clone());
				format!("{col} {symbol} {param}")
			}
		}
	}

	fn in_list(&mut self, field: &str, values: &[Value]) -> String {
		let col = self.column(field);
		let (nulls, present) = split_nulls(values);
		match (nulls, present.is_empty()) {
			(false, true) => "FALSE".to_string(),
			(true, true) => format!("{col} IS NULL"),
			(false, false) => format!("{col} IN ({})", self.bind_list(&present)),
			(true, false) => format!("({col} IS NULL OR {col} IN ({}))", self.bind_list(&present)),
		}
	}

	fn not_in_list(&mut self, field: &str, values: &[Value]) -> String {
		let col = self.column(field);
		let (nulls, present) = split_nulls(values);
		match (nulls, present.is_empty()) {
			(false, true) => "TRUE".to_string(),
			(true, true) => format!("{col} IS NOT NULL"),
			(false, false) => format!("({col} IS NULL OR {col} NOT IN ({}))", self.bind_list(&present)),
			(true, false) => format!(
				"({col} IS NOT NULL AND {col} NOT IN ({}))",
				self.bind_list(&present)
			),
		}
	}
}

fn split_nulls(values: &[Value]) -> (bool, Vec<Value>) {
	let nulls = values.iter().any(Value::is_null);
	let present = values.iter().filter(|v| !v.is_null()).cloned().collect();
	(nulls, present)
}

/// Quotes each segment of a dotted path as an identifier.
pub fn quote_path(path: &str) -> String {
	path
		.split('.')
		.map(|segment| format!("\"{}\"", segment.replace('"', "\"\"")))
		.collect::<Vec<_>>()
		.join(".")
}

fn escape_like(pattern: &str) -> String {
	let mut out = String::with_capacity(pattern.len());
	for ch in pattern.chars() {
		if matches!(ch, '\\' | '%' | '_') {
			out.push('\\');
		}
		out.push(ch);
	}
	out
}
