// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Decision combinator.
//!
//! [`Authorizer`] is the only entry point callers need. Every call hydrates
//! nothing and caches nothing: it aggregates the principal's grants, binds
//! their variables and runs the requested evaluator. Callers answering many
//! questions about one principal in one request should open a
//! [`RequestScope`] instead.

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use estate_authz_config::EngineConfig;
use estate_authz_core::{Action, Predicate, Principal, Resource, Result, Rule};

use crate::aggregate::{aggregate, Clock, SystemClock};
use crate::decision::{AccessDecision, Target};
use crate::evaluate::EvalOptions;
use crate::fields::FieldAccess;
use crate::guards::Guard;
use crate::resolve::resolve;
use crate::scope::RequestScope;

#[derive(Debug, Clone)]
pub struct Authorizer {
	config: EngineConfig,
	clock: Arc<dyn Clock>,
	guards: Vec<Arc<dyn Guard>>,
}

impl Default for Authorizer {
	fn default() -> Self {
		Self::new(EngineConfig::default())
	}
}

impl Authorizer {
	pub fn new(config: EngineConfig) -> Self {
		Self {
			config,
			clock: Arc::new(SystemClock),
			guards: Vec::new(),
		}
	}

	pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
		self.clock = Arc::new(clock);
		self
	}

	/// Adds an invariant checked after the rules allow a request.
	pub fn with_guard(mut self, guard: impl Guard + 'static) -> Self {
		self.guards.push(Arc::new(guard));
		self
	}

	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	pub fn guards(&self) -> &[Arc<dyn Guard>] {
		&self.guards
	}

	pub(crate) fn eval_options(&self) -> EvalOptions {
		EvalOptions {
			regex_size_limit: self.config.regex_size_limit,
		}
	}

	/// Compiled, unresolved rules of `principal`, highest priority first.
	pub fn rules_for(&self, principal: &Principal) -> Result<Vec<Rule>> {
		principal.validate()?;
		Ok(aggregate(
			principal,
			self.clock.now(),
			self.config.max_condition_depth,
		))
	}

	/// Aggregates and resolves once for a run of decisions about `principal`.
	pub fn scope<'a>(&'a self, principal: &'a Principal) -> Result<RequestScope<'a>> {
		let rules = self.rules_for(principal)?;
		let resolved = resolve(&rules, principal, &self.eval_options());
		debug!(principal_id = %principal.id, rules = resolved.len(), "request scope opened");
		Ok(RequestScope::new(self, principal, resolved))
	}

	#[instrument(
		level = "debug",
		skip(self, principal, target, data),
		fields(
			principal_id = %principal.id,
			action = %action,
			subject = target.subject(),
		)
	)]
	pub fn check(
		&self,
		principal: &Principal,
		action: Action,
		target: Target<'_>,
		data: Option<&Map<String, Value>>,
	) -> Result<AccessDecision> {
		Ok(self.scope(principal)?.check(action, target, data))
	}

	pub fn can_perform(
		&self,
		principal: &Principal,
		action: Action,
		target: Target<'_>,
		data: Option<&Map<String, Value>>,
	) -> Result<bool> {
		Ok(self.check(principal, action, target, data)?.allowed)
	}

	#[instrument(
		level = "debug",
		skip(self, principal, target),
		fields(
			principal_id = %principal.id,
			action = %action,
			subject = target.subject(),
		)
	)]
	pub fn can_perform_field(
		&self,
		principal: &Principal,
		action: Action,
		target: Target<'_>,
		field: &str,
	) -> Result<bool> {
		Ok(self.scope(principal)?.can_perform_field(action, target, field))
	}

	#[instrument(
		level = "debug",
		skip(self, principal),
		fields(principal_id = %principal.id, action = %action)
	)]
	pub fn filter_for(&self, principal: &Principal, action: Action, subject: &str) -> Result<Option<Predicate>> {
		Ok(self.scope(principal)?.filter_for(action, subject))
	}

	#[instrument(
		level = "debug",
		skip(self, principal, instance),
		fields(principal_id = %principal.id)
	)]
	pub fn allowed_fields(
		&self,
		principal: &Principal,
		subject: &str,
		instance: Option<&Resource>,
	) -> Result<FieldAccess> {
		Ok(self.scope(principal)?.allowed_fields(subject, instance))
	}

	pub(crate) fn log_decision(
		&self,
		principal: &Principal,
		action: Action,
		subject: &str,
		field: Option<&str>,
		decision: &AccessDecision,
	) {
		if self.config.log_decisions {
			info!(
				principal_id = %principal.id,
				tenant_id = %principal.tenant_id,
				action = %action,
				subject,
				field,
				allowed = decision.allowed,
				reason = ?decision.reason,
				"authorization decision"
			);
		} else {
			debug!(
				principal_id = %principal.id,
				action = %action,
				subject,
				field,
				allowed = decision.allowed,
				reason = ?decision.reason,
				"authorization decision"
			);
		}
	}
}
