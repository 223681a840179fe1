// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Estate authorization policy debugger.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use estate_authz::{Authorizer, FixedClock, SelfVerificationGuard, TenantBoundaryGuard};
use estate_authz_config::{AuthzConfig, LoggingConfig};

mod commands;

/// estate-authz - evaluate principal and grant fixtures against the engine.
#[derive(Parser, Debug)]
#[command(name = "estate-authz", about = "Estate authorization policy debugger", version)]
struct Args {
	/// Config file (defaults to /etc/estate/authz.toml)
	#[arg(long, global = true, env = "ESTATE_AUTHZ_CONFIG")]
	config: Option<PathBuf>,

	/// Evaluate as of this instant (RFC 3339) instead of now
	#[arg(long, global = true)]
	at: Option<DateTime<Utc>>,

	/// Skip the built-in tenant and self-verification guards
	#[arg(long, global = true)]
	no_guards: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Decide one action on a subject type or a resource
	Check(commands::CheckArgs),
	/// Print the row filter for list queries
	Filter(commands::FilterArgs),
	/// Print the readable fields of a subject type or a resource
	Fields(commands::FieldsArgs),
	/// Print the principal's aggregated rules
	Rules(commands::RulesArgs),
}

fn init_tracing(logging: &LoggingConfig) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
	let registry = tracing_subscriber::registry().with(filter);
	if logging.json {
		registry
			.with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
			.init();
	} else {
		registry
			.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
			.init();
	}
}

fn load_config(path: Option<&PathBuf>) -> Result<AuthzConfig> {
	let config = match path {
		Some(path) => estate_authz_config::load_config_with_file(path.clone()),
		None => estate_authz_config::load_config(),
	};
	config.context("loading authorization config")
}

fn build_authorizer(config: AuthzConfig, at: Option<DateTime<Utc>>, guards: bool) -> Authorizer {
	let mut engine = Authorizer::new(config.engine);
	if let Some(at) = at {
		engine = engine.with_clock(FixedClock(at));
	}
	if guards {
		engine = engine
			.with_guard(TenantBoundaryGuard::default())
			.with_guard(SelfVerificationGuard::default());
	}
	engine
}

fn main() -> Result<()> {
	let args = Args::parse();

	let config = load_config(args.config.as_ref())?;
	init_tracing(&config.logging);

	tracing::debug!(command = ?args.command, at = ?args.at, "running");

	let engine = build_authorizer(config, args.at, !args.no_guards);
	let out = match &args.command {
		Command::Check(check) => commands::check(&engine, check)?,
		Command::Filter(filter) => commands::filter(&engine, filter)?,
		Command::Fields(fields) => commands::fields(&engine, fields)?,
		Command::Rules(rules) => commands::rules(&engine, rules)?,
	};

	println!("{}", serde_json::to_string_pretty(&out)?);
	Ok(())
}
