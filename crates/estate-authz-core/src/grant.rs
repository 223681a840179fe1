// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Grant wire shape.
//!
//! [`GrantRecord`] mirrors what the role store hands over. Its `action` is a
//! free string so one malformed grant can be rejected on its own when it is
//! compiled into a [`Rule`](crate::Rule), instead of failing deserialization
//! of the whole principal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::types::{Action, RoleId, SubjectType};

pub const MIN_PRIORITY: i64 = 1;
pub const MAX_PRIORITY: i64 = 100;

fn default_priority() -> i64 {
	MIN_PRIORITY
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantRecord {
	pub action: String,
	pub subject: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub conditions: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fields: Option<Vec<String>>,
	#[serde(default)]
	pub inverted: bool,
	#[serde(default = "default_priority")]
	pub priority: i64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub role_context: Option<RoleId>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires_at: Option<DateTime<Utc>>,
}

impl GrantRecord {
	fn new(action: Action, subject: impl Into<SubjectType>, inverted: bool) -> Self {
		Self {
			action: action.as_str().to_string(),
			subject: subject.into().as_str().to_string(),
			conditions: None,
			fields: None,
			inverted,
			priority: default_priority(),
			role_context: None,
			expires_at: None,
		}
	}

	/// An allow-grant.
	pub fn allow(action: Action, subject: impl Into<SubjectType>) -> Self {
		Self::new(action, subject, false)
	}

	/// A deny-grant.
	pub fn deny(action: Action, subject: impl Into<SubjectType>) -> Self {
		Self::new(action, subject, true)
	}

	/// Builder: set the condition tree.
	pub fn with_conditions(mut self, conditions: Value) -> Self {
		self.conditions = Some(conditions);
		self
	}

	/// Builder: restrict the grant to a set of fields.
	pub fn with_fields<I, S>(mut self, fields: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.fields = Some(fields.into_iter().map(Into::into).collect());
		self
	}

	/// Builder: set priority.
	pub fn with_priority(mut self, priority: i64) -> Self {
		self.priority = priority;
		self
	}

	/// Builder: scope an individual grant to one active role.
	pub fn with_role_context(mut self, role_id: impl Into<RoleId>) -> Self {
		self.role_context = Some(role_id.into());
		self
	}

	/// Builder: set expiry.
	pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
		self.expires_at = Some(expires_at);
		self
	}

	/// Returns true once `expires_at` is at or before `now`.
	pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
		self.expires_at.map(|at| at <= now).unwrap_or(false)
	}

	/// Returns true if the grant applies while acting under `active_role`.
	pub fn applies_in_context(&self, active_role: Option<&RoleId>) -> bool {
		match &self.role_context {
			None => true,
			Some(context) => active_role == Some(context),
		}
	}
}

/// Where a rule came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrantSource {
	Role { role_id: RoleId },
	Individual,
}

impl fmt::Display for GrantSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			GrantSource::Role { role_id } => write!(f, "role:{role_id}"),
			GrantSource::Individual => write!(f, "individual"),
		}
	}
}
