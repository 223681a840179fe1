// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rule aggregation.
//!
//! Collects every grant that could apply to a principal during this session
//! and compiles it into a [`Rule`]. Role grants come from the active role
//! only, or from every assigned role when no role is active. Individual
//! grants must be unexpired and either global or scoped to the active role.
//!
//! The result is ordered by priority, highest first. Ties keep source order:
//! role grants in role order, then individual grants.

use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{debug, error, instrument, warn};

use estate_authz_core::{GrantRecord, GrantSource, Principal, Rule};

/// Source of the evaluation instant.
pub trait Clock: Send + Sync + fmt::Debug {
	fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> DateTime<Utc> {
		Utc::now()
	}
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
	fn now(&self) -> DateTime<Utc> {
		self.0
	}
}

/// Aggregates and compiles the principal's applicable rules.
///
/// An active role the principal does not hold yields no rules at all.
#[instrument(
	level = "debug",
	skip(principal),
	fields(
		principal_id = %principal.id,
		active_role = ?principal.active_role_id,
	)
)]
pub fn aggregate(principal: &Principal, now: DateTime<Utc>, max_depth: usize) -> Vec<Rule> {
	let roles: Vec<_> = match &principal.active_role_id {
		Some(active) => match principal.role(active) {
			Some(role) => vec![role],
			None => {
				warn!(
					principal_id = %principal.id,
					active_role = %active,
					"active role is not assigned to principal, denying everything"
				);
				return Vec::new();
			}
		},
		None => principal.roles.iter().collect(),
	};

	let active = principal.active_role_id.as_ref();
	let role_grants = roles.into_iter().flat_map(|role| {
		role.grants.iter().map(move |grant| {
			(
				grant,
				GrantSource::Role {
					role_id: role.id.clone(),
				},
			)
		})
	});
	let individual_grants = principal
		.individual_grants
		.iter()
		.filter(|grant| {
			if grant.is_expired(now) {
				debug!(action = %grant.action, subject = %grant.subject, "skipping expired grant");
				return false;
			}
			grant.applies_in_context(active)
		})
		.map(|grant| (grant, GrantSource::Individual));

	let mut rules: Vec<Rule> = role_grants
		.chain(individual_grants)
		.filter_map(|(grant, source)| compile(grant, source, max_depth))
		.collect();

	// Vec::sort_by is stable.
	rules.sort_by(|a, b| b.priority.cmp(&a.priority));

	debug!(rule_count = rules.len(), "aggregated rules");
	rules
}

fn compile(grant: &GrantRecord, source: GrantSource, max_depth: usize) -> Option<Rule> {
	match Rule::compile(grant, source.clone(), max_depth) {
		Ok(rule) => Some(rule),
		Err(e) => {
			error!(
				source = %source,
				action = %grant.action,
				subject = %grant.subject,
				code = e.code(),
				error = %e,
				"skipping malformed grant"
			);
			None
		}
	}
}
