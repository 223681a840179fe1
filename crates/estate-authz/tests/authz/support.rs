// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Map, Value};

use estate_authz::{Authorizer, FixedClock};
use estate_authz_core::{Action, GrantRecord, Principal, Resource, Role};

pub fn now() -> DateTime<Utc> {
	Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap()
}

pub fn authorizer() -> Authorizer {
	Authorizer::default().with_clock(FixedClock(now()))
}

pub fn object(value: Value) -> Map<String, Value> {
	match value {
		Value::Object(map) => map,
		other => panic!("expected an object, got {other}"),
	}
}

pub fn resource(subject: &str, attributes: Value) -> Resource {
	Resource::with_attributes(subject, object(attributes))
}

pub fn principal() -> Principal {
	Principal::new("u-1", "t-1")
}

/// A branch manager of B1 who also oversees B7.
pub fn branch_manager() -> Principal {
	let role = Role::new("r-manager", "BranchManager")
		.with_grant(
			GrantRecord::allow(Action::Read, "Branch")
				.with_conditions(json!({"id": {"$eq": "$principal.branchId"}}))
				.with_priority(50),
		)
		.with_grant(
			GrantRecord::allow(Action::Manage, "Asset")
				.with_conditions(json!({"branchId": {"$in": "$principal.settings.managedBranches"}}))
				.with_priority(40),
		);

	principal()
		.with_attribute("branchId", json!("B1"))
		.with_attribute("settings", json!({"managedBranches": ["B1", "B7"]}))
		.with_role(role)
		.with_active_role("r-manager")
}
