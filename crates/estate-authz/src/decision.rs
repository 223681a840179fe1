// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Serialize;

use estate_authz_core::{GrantSource, Resource};

use crate::evaluate::Evaluation;

/// What a check is about: a whole subject type, or one resource.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
	Subject(&'a str),
	Instance(&'a Resource),
}

impl<'a> Target<'a> {
	pub fn subject(&self) -> &'a str {
		match *self {
			Target::Subject(subject) => subject,
			Target::Instance(resource) => resource.subject_type().as_str(),
		}
	}

	pub fn instance(&self) -> Option<&'a Resource> {
		match *self {
			Target::Subject(_) => None,
			Target::Instance(resource) => Some(resource),
		}
	}
}

impl<'a> From<&'a Resource> for Target<'a> {
	fn from(resource: &'a Resource) -> Self {
		Target::Instance(resource)
	}
}

impl<'a> From<&'a str> for Target<'a> {
	fn from(subject: &'a str) -> Self {
		Target::Subject(subject)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionReason {
	Allowed { source: GrantSource, priority: i64 },
	DeniedByRule { source: GrantSource, priority: i64 },
	NoMatchingGrant,
	GuardRejected { guard: String, message: String },
}

/// A yes/no answer with the reason, for audit logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
	pub allowed: bool,
	pub reason: DecisionReason,
}

impl AccessDecision {
	pub fn denied(reason: DecisionReason) -> Self {
		Self { allowed: false, reason }
	}

	pub(crate) fn from_evaluation(evaluation: &Evaluation<'_>) -> Self {
		match (evaluation.allowed_by, evaluation.denied_by) {
			(_, Some(rule)) => Self::denied(DecisionReason::DeniedByRule {
				source: rule.source.clone(),
				priority: rule.priority,
			}),
			(Some(rule), None) => Self {
				allowed: true,
				reason: DecisionReason::Allowed {
					source: rule.source.clone(),
					priority: rule.priority,
				},
			},
			(None, None) => Self::denied(DecisionReason::NoMatchingGrant),
		}
	}
}
