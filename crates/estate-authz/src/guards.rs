// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Subject guards.
//!
//! Guards are invariants that hold no matter what the grants say: a user
//! cannot verify themselves, and a resource never crosses a tenant boundary.
//! They run after the rule engine has allowed a request and can only turn an
//! allow into a deny.

use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

use estate_authz_core::{Action, Principal, Resource, SubjectType};

/// What a guard gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct GuardContext<'a> {
	pub principal: &'a Principal,
	pub action: Action,
	pub subject: &'a str,
	pub resource: Option<&'a Resource>,
	/// Update payload, if the request carries one.
	pub data: Option<&'a Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct GuardViolation {
	pub message: String,
}

impl GuardViolation {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}
}

pub trait Guard: Send + Sync + fmt::Debug {
	fn name(&self) -> &str;

	/// Returns true if the guard has an opinion on `subject`.
	fn applies_to(&self, subject: &str) -> bool;

	fn check(&self, ctx: &GuardContext<'_>) -> Result<(), GuardViolation>;
}

/// Stops a principal from changing their own verification flag.
#[derive(Debug, Clone)]
pub struct SelfVerificationGuard {
	subject: SubjectType,
	flag_field: String,
}

impl SelfVerificationGuard {
	pub fn new(subject: impl Into<SubjectType>, flag_field: impl Into<String>) -> Self {
		Self {
			subject: subject.into(),
			flag_field: flag_field.into(),
		}
	}
}

impl Default for SelfVerificationGuard {
	fn default() -> Self {
		Self::new("User", "isVerified")
	}
}

impl Guard for SelfVerificationGuard {
	fn name(&self) -> &str {
		"self-verification"
	}

	fn applies_to(&self, subject: &str) -> bool {
		self.subject.covers(subject)
	}

	fn check(&self, ctx: &GuardContext<'_>) -> Result<(), GuardViolation> {
		let (Some(resource), Some(data)) = (ctx.resource, ctx.data) else {
			return Ok(());
		};
		if !data.contains_key(&self.flag_field) {
			return Ok(());
		}
		let is_self = resource
			.get("id")
			.is_some_and(|id| id.as_str() == Some(ctx.principal.id.as_str()));
		if is_self {
			return Err(GuardViolation::new(format!(
				"principal cannot change their own {}",
				self.flag_field
			)));
		}
		Ok(())
	}
}

/// Keeps every resource and payload inside the principal's tenant.
///
/// Resources without the tenant attribute are not tenant-scoped and pass.
#[derive(Debug, Clone)]
pub struct TenantBoundaryGuard {
	field: String,
}

impl TenantBoundaryGuard {
	pub fn new(field: impl Into<String>) -> Self {
		Self { field: field.into() }
	}
}

impl Default for TenantBoundaryGuard {
	fn default() -> Self {
		Self::new("tenantId")
	}
}

impl Guard for TenantBoundaryGuard {
	fn name(&self) -> &str {
		"tenant-boundary"
	}

	fn applies_to(&self, _subject: &str) -> bool {
		true
	}

	fn check(&self, ctx: &GuardContext<'_>) -> Result<(), GuardViolation> {
		let tenant = ctx.principal.tenant_id.as_str();
		let foreign = |value: Option<&Value>| match value {
			None | Some(Value::Null) => false,
			Some(value) => value.as_str() != Some(tenant),
		};

		if foreign(ctx.resource.and_then(|r| r.attributes().get(&self.field))) {
			return Err(GuardViolation::new(format!(
				"{} belongs to another tenant",
				ctx.subject
			)));
		}
		if foreign(ctx.data.and_then(|d| d.get(&self.field))) {
			return Err(GuardViolation::new(format!(
				"cannot move {} to another tenant",
				ctx.subject
			)));
		}
		Ok(())
	}
}

type GuardFn = dyn Fn(&GuardContext<'_>) -> Result<(), GuardViolation> + Send + Sync;

/// A guard from a closure, for one-off invariants.
pub struct FnGuard {
	name: String,
	subject: SubjectType,
	check: Box<GuardFn>,
}

impl FnGuard {
	pub fn new<F>(name: impl Into<String>, subject: impl Into<SubjectType>, check: F) -> Self
	where
		F: Fn(&GuardContext<'_>) -> Result<(), GuardViolation> + Send + Sync + 'static,
	{
		Self {
			name: name.into(),
			subject: subject.into(),
			check: Box::new(check),
		}
	}
}

impl fmt::Debug for FnGuard {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FnGuard")
			.field("name", &self.name)
			.field("subject", &self.subject)
			.finish_non_exhaustive()
	}
}

impl Guard for FnGuard {
	fn name(&self) -> &str {
		&self.name
	}

	fn applies_to(&self, subject: &str) -> bool {
		self.subject.covers(subject)
	}

	fn check(&self, ctx: &GuardContext<'_>) -> Result<(), GuardViolation> {
		(self.check)(ctx)
	}
}
