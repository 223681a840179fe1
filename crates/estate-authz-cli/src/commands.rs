// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Subcommands of the policy debugger.
//!
//! Each command reads JSON fixtures, asks the engine one question and returns
//! the answer as a JSON value. A denial is an answer, not an error.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::{debug, instrument};

use estate_authz::{Authorizer, Target};
use estate_authz_core::{Action, Principal, Resource};

/// Decide one action on a subject type or a resource.
#[derive(Debug, Clone, clap::Args)]
pub struct CheckArgs {
	/// Principal fixture (JSON)
	#[arg(long)]
	pub principal: PathBuf,

	/// create, read, update, delete or manage
	#[arg(long)]
	pub action: Action,

	/// Subject type, e.g. `Branch`
	#[arg(long)]
	pub subject: String,

	/// Resource fixture with a `type` tag (JSON)
	#[arg(long)]
	pub resource: Option<PathBuf>,

	/// Check a single attribute instead of the whole resource
	#[arg(long, conflicts_with = "data")]
	pub field: Option<String>,

	/// Update payload (JSON object)
	#[arg(long)]
	pub data: Option<PathBuf>,
}

/// Print the row filter for list queries.
#[derive(Debug, Clone, clap::Args)]
pub struct FilterArgs {
	#[arg(long)]
	pub principal: PathBuf,

	#[arg(long)]
	pub action: Action,

	#[arg(long)]
	pub subject: String,

	/// Also render the filter as a parameterized SQL fragment
	#[arg(long)]
	pub sql: bool,
}

/// Print the readable fields of a subject type or a resource.
#[derive(Debug, Clone, clap::Args)]
pub struct FieldsArgs {
	#[arg(long)]
	pub principal: PathBuf,

	#[arg(long)]
	pub subject: String,

	/// Resource fixture; its attributes are also printed redacted
	#[arg(long)]
	pub resource: Option<PathBuf>,
}

/// Print the principal's aggregated rules, highest priority first.
#[derive(Debug, Clone, clap::Args)]
pub struct RulesArgs {
	#[arg(long)]
	pub principal: PathBuf,
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
	let raw = fs::read_to_string(path).with_context(|| format!("reading {what} from {}", path.display()))?;
	serde_json::from_str(&raw).with_context(|| format!("parsing {what} in {}", path.display()))
}

fn read_resource(path: &Path, subject: &str) -> Result<Resource> {
	let value: Value = read_json(path, "resource")?;
	let resource = Resource::from_json(value).with_context(|| format!("invalid resource in {}", path.display()))?;
	if resource.subject_type().as_str() != subject {
		bail!(
			"resource in {} is a {}, not a {subject}",
			path.display(),
			resource.subject_type()
		);
	}
	Ok(resource)
}

fn read_object(path: &Path) -> Result<Map<String, Value>> {
	let value: Value = read_json(path, "payload")?;
	match value {
		Value::Object(map) => Ok(map),
		_ => bail!("payload in {} must be a JSON object", path.display()),
	}
}

#[instrument(skip_all, fields(action = %args.action, subject = %args.subject))]
pub fn check(engine: &Authorizer, args: &CheckArgs) -> Result<Value> {
	let principal: Principal = read_json(&args.principal, "principal")?;
	let resource = args
		.resource
		.as_deref()
		.map(|path| read_resource(path, &args.subject))
		.transpose()?;
	let data = args.data.as_deref().map(read_object).transpose()?;

	let target = match &resource {
		Some(resource) => Target::Instance(resource),
		None => Target::Subject(&args.subject),
	};

	let scope = engine.scope(&principal)?;
	let decision = match &args.field {
		Some(field) => scope.check_field(args.action, target, field),
		None => scope.check(args.action, target, data.as_ref()),
	};
	debug!(allowed = decision.allowed, "decided");

	let mut out = serde_json::to_value(&decision)?;
	if let (Some(field), Value::Object(map)) = (&args.field, &mut out) {
		map.insert("field".to_string(), json!(field));
	}
	Ok(out)
}

#[instrument(skip_all, fields(action = %args.action, subject = %args.subject))]
pub fn filter(engine: &Authorizer, args: &FilterArgs) -> Result<Value> {
	let principal: Principal = read_json(&args.principal, "principal")?;
	let filter = engine.filter_for(&principal, args.action, &args.subject)?;

	let mut out = json!({ "filter": filter });
	if args.sql {
		let sql = filter.as_ref().map(|p| p.to_sql());
		out["sql"] = serde_json::to_value(sql)?;
	}
	Ok(out)
}

#[instrument(skip_all, fields(subject = %args.subject))]
pub fn fields(engine: &Authorizer, args: &FieldsArgs) -> Result<Value> {
	let principal: Principal = read_json(&args.principal, "principal")?;
	let resource = args
		.resource
		.as_deref()
		.map(|path| read_resource(path, &args.subject))
		.transpose()?;

	let access = engine.allowed_fields(&principal, &args.subject, resource.as_ref())?;

	let mut out = json!({ "access": access });
	if let Some(resource) = &resource {
		out["redacted"] = Value::Object(access.redact(resource.attributes()));
	}
	Ok(out)
}

#[instrument(skip_all)]
pub fn rules(engine: &Authorizer, args: &RulesArgs) -> Result<Value> {
	let principal: Principal = read_json(&args.principal, "principal")?;
	let rules = engine.rules_for(&principal)?;

	let listed: Vec<Value> = rules
		.iter()
		.map(|rule| {
			json!({
				"effect": if rule.inverted { "deny" } else { "allow" },
				"action": rule.action.as_str(),
				"subject": rule.subject.as_str(),
				"priority": rule.priority,
				"source": rule.source,
				"conditions": rule.condition.as_ref().map(|c| c.to_value()),
				"fields": rule.fields.as_ref().map(|f| f.iter().map(|p| p.to_string()).collect::<Vec<_>>()),
			})
		})
		.collect();
	Ok(json!({ "principal": principal.id, "rules": listed }))
}
