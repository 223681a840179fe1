// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-request decision scope.
//!
//! A [`RequestScope`] binds one principal, aggregates and resolves its rules
//! once, and then answers any number of questions about it. It borrows the
//! principal and must not outlive the request that hydrated it.

use serde_json::{Map, Value};
use tracing::debug;

use estate_authz_core::{Action, Predicate, Principal, Resource};

use crate::decision::{AccessDecision, DecisionReason, Target};
use crate::engine::Authorizer;
use crate::evaluate::evaluate;
use crate::fields::{allowed_fields, FieldAccess};
use crate::guards::GuardContext;
use crate::resolve::ResolvedRuleSet;
use crate::translate::translate;

#[derive(Debug)]
pub struct RequestScope<'a> {
	authorizer: &'a Authorizer,
	principal: &'a Principal,
	rules: ResolvedRuleSet,
}

impl<'a> RequestScope<'a> {
	pub(crate) fn new(authorizer: &'a Authorizer, principal: &'a Principal, rules: ResolvedRuleSet) -> Self {
		Self {
			authorizer,
			principal,
			rules,
		}
	}

	pub fn principal(&self) -> &Principal {
		self.principal
	}

	pub fn rules(&self) -> &ResolvedRuleSet {
		&self.rules
	}

	/// Decides `action` on `target`, optionally with an update payload.
	pub fn check(&self, action: Action, target: Target<'_>, data: Option<&Map<String, Value>>) -> AccessDecision {
		let decision = self.decide(action, target, data);
		self.authorizer
			.log_decision(self.principal, action, target.subject(), None, &decision);
		decision
	}

	pub fn can_perform(&self, action: Action, target: Target<'_>, data: Option<&Map<String, Value>>) -> bool {
		self.check(action, target, data).allowed
	}

	/// Decides `action` on one attribute of `target`.
	pub fn check_field(&self, action: Action, target: Target<'_>, field: &str) -> AccessDecision {
		let subject = target.subject();
		let rules = self.rules.applicable(action, subject);
		let evaluation = evaluate(rules, target.instance(), Some(field), &self.authorizer.eval_options());
		let decision = match AccessDecision::from_evaluation(&evaluation) {
			decision if decision.allowed => self.run_guards(action, target, None).unwrap_or(decision),
			decision => decision,
		};
		self.authorizer
			.log_decision(self.principal, action, subject, Some(field), &decision);
		decision
	}

	pub fn can_perform_field(&self, action: Action, target: Target<'_>, field: &str) -> bool {
		self.check_field(action, target, field).allowed
	}

	/// Row filter for list queries. `None` means every row passes.
	pub fn filter_for(&self, action: Action, subject: &str) -> Option<Predicate> {
		let filter = translate(
			self.rules.applicable(action, subject),
			&self.authorizer.eval_options(),
		);
		debug!(
			principal_id = %self.principal.id,
			action = %action,
			subject,
			unrestricted = filter.is_none(),
			"row filter"
		);
		filter
	}

	/// Readable attributes of `subject`, or of one instance of it.
	pub fn allowed_fields(&self, subject: &str, instance: Option<&Resource>) -> FieldAccess {
		let subject = instance.map_or(subject, |resource| resource.subject_type().as_str());
		let access = allowed_fields(
			self.rules.applicable(Action::Read, subject),
			instance,
			&self.authorizer.config().essential_fields,
			&self.authorizer.eval_options(),
		);
		debug!(
			principal_id = %self.principal.id,
			subject,
			access = ?access,
			"field access"
		);
		access
	}

	fn decide(&self, action: Action, target: Target<'_>, data: Option<&Map<String, Value>>) -> AccessDecision {
		let subject = target.subject();
		let instance = target.instance();
		let opts = self.authorizer.eval_options();
		let rules = self.rules.applicable(action, subject);

		let evaluation = evaluate(rules.clone(), instance, None, &opts);
		if !evaluation.is_allowed() {
			return AccessDecision::from_evaluation(&evaluation);
		}

		if let Some(data) = data {
			for field in data.keys() {
				let by_field = evaluate(rules.clone(), instance, Some(field), &opts);
				if !by_field.is_allowed() {
					debug!(field = %field, "payload touches a field that is not writable");
					return AccessDecision::from_evaluation(&by_field);
				}
			}

			let merged = match instance {
				Some(resource) => resource.merged(data),
				None => Resource::with_attributes(subject, data.clone()),
			};
			let after = evaluate(rules, Some(&merged), None, &opts);
			if !after.is_allowed() {
				debug!("payload would move the resource out of scope");
				return AccessDecision::from_evaluation(&after);
			}
		}

		self.run_guards(action, target, data)
			.unwrap_or_else(|| AccessDecision::from_evaluation(&evaluation))
	}

	/// Returns the first guard rejection, if any.
	fn run_guards(&self, action: Action, target: Target<'_>, data: Option<&Map<String, Value>>) -> Option<AccessDecision> {
		let ctx = GuardContext {
			principal: self.principal,
			action,
			subject: target.subject(),
			resource: target.instance(),
			data,
		};
		self.authorizer
			.guards()
			.iter()
			.filter(|guard| guard.applies_to(ctx.subject))
			.find_map(|guard| match guard.check(&ctx) {
				Ok(()) => None,
				Err(violation) => Some(AccessDecision::denied(DecisionReason::GuardRejected {
					guard: guard.name().to_string(),
					message: violation.message,
				})),
			})
	}
}
