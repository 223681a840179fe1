// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The authenticated actor and the roles it holds.
//!
//! A [`Principal`] arrives fully hydrated from the identity store: its roles,
//! their grants and the principal's individual grants are already loaded.
//! Besides the fixed identity fields it carries an open attribute bag
//! (`branchId`, `settings.managedBranches`, ...) that condition variables can
//! reference.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AuthzError, Result};
use crate::grant::GrantRecord;
use crate::types::{PrincipalId, RoleId, TenantId};
use crate::value;

/// A named bundle of grants shared by every principal holding it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
	pub id: RoleId,
	pub name: String,
	#[serde(default)]
	pub grants: Vec<GrantRecord>,
}

impl Role {
	pub fn new(id: impl Into<RoleId>, name: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			name: name.into(),
			grants: Vec::new(),
		}
	}

	/// Builder: add a grant.
	pub fn with_grant(mut self, grant: GrantRecord) -> Self {
		self.grants.push(grant);
		self
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
	pub id: PrincipalId,
	pub tenant_id: TenantId,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub active_role_id: Option<RoleId>,
	#[serde(default)]
	pub roles: Vec<Role>,
	#[serde(default)]
	pub individual_grants: Vec<GrantRecord>,
	/// Any other attribute supplied by the identity store.
	#[serde(flatten)]
	pub attributes: Map<String, Value>,
}

impl Principal {
	/// Creates a principal with no roles, grants or attributes.
	pub fn new(id: impl Into<PrincipalId>, tenant_id: impl Into<TenantId>) -> Self {
		Self {
			id: id.into(),
			tenant_id: tenant_id.into(),
			active_role_id: None,
			roles: Vec::new(),
			individual_grants: Vec::new(),
			attributes: Map::new(),
		}
	}

	/// Builder: assign a role.
	pub fn with_role(mut self, role: Role) -> Self {
		self.roles.push(role);
		self
	}

	/// Builder: set the role this session acts under.
	pub fn with_active_role(mut self, role_id: impl Into<RoleId>) -> Self {
		self.active_role_id = Some(role_id.into());
		self
	}

	/// Builder: add an individual grant.
	pub fn with_grant(mut self, grant: GrantRecord) -> Self {
		self.individual_grants.push(grant);
		self
	}

	/// Builder: set an attribute.
	pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
		self.attributes.insert(key.into(), value);
		self
	}

	/// Rejects principals the engine cannot reason about.
	///
	/// A missing identifier is an upstream programming error, not a policy
	/// outcome, so it is the one failure that reaches the caller.
	pub fn validate(&self) -> Result<()> {
		if self.id.is_blank() {
			return Err(AuthzError::InvalidPrincipal(
				"principal id is empty".to_string(),
			));
		}
		if self.tenant_id.is_blank() {
			return Err(AuthzError::InvalidPrincipal(format!(
				"principal {} has an empty tenant id",
				self.id
			)));
		}
		Ok(())
	}

	/// Returns the assigned role with the given id, if any.
	pub fn role(&self, role_id: &RoleId) -> Option<&Role> {
		self.roles.iter().find(|r| &r.id == role_id)
	}

	/// Resolves a dotted path against the principal.
	///
	/// The first segment may name `id`, `tenantId`, `activeRoleId`, `roleIds`
	/// or `roleNames`; anything else is looked up in the attribute bag.
	pub fn lookup(&self, path: &str) -> Option<Value> {
		let (head, rest) = match path.split_once('.') {
			Some((head, rest)) => (head, rest),
			None => (path, ""),
		};

		let root = match head {
			"id" => Value::String(self.id.to_string()),
			"tenantId" => Value::String(self.tenant_id.to_string()),
			"activeRoleId" => Value::String(self.active_role_id.as_ref()?.to_string()),
			"roleIds" => Value::Array(
				self
					.roles
					.iter()
					.map(|r| Value::String(r.id.to_string()))
					.collect(),
			),
			"roleNames" => Value::Array(
				self
					.roles
					.iter()
					.map(|r| Value::String(r.name.clone()))
					.collect(),
			),
			_ => return value::field(&self.attributes, path),
		};

		value::path(&root, rest)
	}
}
