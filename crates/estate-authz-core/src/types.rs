// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identifier newtypes, actions and subject types.
//!
//! - **ID newtypes**: [`PrincipalId`], [`TenantId`] and [`RoleId`] wrap the
//!   string identifiers handed over by the identity store so they cannot be
//!   mixed up.
//! - **Actions**: the closed verb set a grant can name ([`Action`]).
//! - **Subjects**: resource-type tags ([`SubjectType`]), including the `all`
//!   wildcard.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AuthzError;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(String);

		impl $name {
			/// Create a new ID from any string-like value.
			pub fn new(id: impl Into<String>) -> Self {
				Self(id.into())
			}

			/// Get the identifier as a string slice.
			pub fn as_str(&self) -> &str {
				&self.0
			}

			/// Get the inner string value.
			pub fn into_inner(self) -> String {
				self.0
			}

			/// Returns true if the identifier is empty or whitespace.
			pub fn is_blank(&self) -> bool {
				self.0.trim().is_empty()
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str(&self.0)
			}
		}

		impl From<&str> for $name {
			fn from(id: &str) -> Self {
				Self(id.to_string())
			}
		}

		impl From<String> for $name {
			fn from(id: String) -> Self {
				Self(id)
			}
		}
	};
}

define_id_type!(PrincipalId, "Unique identifier for an authenticated principal.");
define_id_type!(TenantId, "Unique identifier for a tenant.");
define_id_type!(RoleId, "Unique identifier for a role.");

// =============================================================================
// Actions
// =============================================================================

/// Verbs a grant can allow or deny. `Manage` implies every other action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
	Create,
	Read,
	Update,
	Delete,
	Manage,
}

impl Action {
	/// Returns all available actions.
	pub fn all() -> &'static [Action] {
		&[
			Action::Create,
			Action::Read,
			Action::Update,
			Action::Delete,
			Action::Manage,
		]
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Action::Create => "create",
			Action::Read => "read",
			Action::Update => "update",
			Action::Delete => "delete",
			Action::Manage => "manage",
		}
	}

	/// Returns true if a grant for `self` applies to a request for `requested`.
	pub fn covers(self, requested: Action) -> bool {
		self == Action::Manage || self == requested
	}
}

impl fmt::Display for Action {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Action {
	type Err = AuthzError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Action::all()
			.iter()
			.copied()
			.find(|a| a.as_str().eq_ignore_ascii_case(s.trim()))
			.ok_or_else(|| AuthzError::Configuration(format!("unknown action '{s}'")))
	}
}

// =============================================================================
// Subject Types
// =============================================================================

/// A resource-type tag such as `Branch` or `Asset`.
///
/// Tags are compared case-sensitively. The tag `all` is a wildcard that
/// matches every subject type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectType(String);

impl SubjectType {
	pub const WILDCARD: &'static str = "all";

	pub fn new(tag: impl Into<String>) -> Self {
		Self(tag.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn is_wildcard(&self) -> bool {
		self.0 == Self::WILDCARD
	}

	/// Returns true if a grant on `self` applies to a request on `requested`.
	pub fn covers(&self, requested: &str) -> bool {
		self.is_wildcard() || self.0 == requested
	}
}

impl fmt::Display for SubjectType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for SubjectType {
	fn from(tag: &str) -> Self {
		Self(tag.to_string())
	}
}

impl From<String> for SubjectType {
	fn from(tag: String) -> Self {
		Self(tag)
	}
}
