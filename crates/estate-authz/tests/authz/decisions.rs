// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::Duration;
use serde_json::json;

use estate_authz::{DecisionReason, Target};
use estate_authz_core::{Action, AuthzError, GrantRecord, GrantSource, Principal, Role, RoleId};

use super::support::{authorizer, branch_manager, now, object, principal, resource};

#[test]
fn no_grant_means_denied() {
	let engine = authorizer();
	let decision = engine
		.check(&principal(), Action::Read, Target::Subject("Branch"), None)
		.unwrap();
	assert!(!decision.allowed);
	assert_eq!(decision.reason, DecisionReason::NoMatchingGrant);
}

#[test]
fn deny_overrides_allow_whatever_the_priority() {
	let p = principal()
		.with_grant(GrantRecord::allow(Action::Read, "Asset").with_priority(80))
		.with_grant(GrantRecord::deny(Action::Read, "Asset").with_priority(10));
	let decision = authorizer()
		.check(&p, Action::Read, Target::Subject("Asset"), None)
		.unwrap();
	assert!(!decision.allowed);
	assert_eq!(
		decision.reason,
		DecisionReason::DeniedByRule {
			source: GrantSource::Individual,
			priority: 10,
		}
	);
}

#[test]
fn any_allow_wins_for_yes_no() {
	let p = principal()
		.with_attribute("branchId", json!("B1"))
		.with_grant(
			GrantRecord::allow(Action::Read, "Asset")
				.with_conditions(json!({"branchId": "$principal.branchId"}))
				.with_priority(90),
		)
		.with_grant(GrantRecord::allow(Action::Read, "Asset").with_fields(["title"]).with_priority(5));
	let foreign = resource("Asset", json!({"branchId": "B2"}));
	let decision = authorizer().check(&p, Action::Read, (&foreign).into(), None).unwrap();
	assert!(decision.allowed);
	assert_eq!(
		decision.reason,
		DecisionReason::Allowed {
			source: GrantSource::Individual,
			priority: 5,
		}
	);
}

#[test]
fn manage_implies_every_action() {
	let p = principal().with_grant(GrantRecord::allow(Action::Manage, "all"));
	let engine = authorizer();
	for action in Action::all() {
		assert!(engine.can_perform(&p, *action, Target::Subject("Listing"), None).unwrap());
	}
}

mod branch_manager {
	use super::*;

	#[test]
	fn reads_own_branch_only() {
		let engine = authorizer();
		let manager = branch_manager();
		let b1 = resource("Branch", json!({"id": "B1", "name": "Harbour"}));
		let b2 = resource("Branch", json!({"id": "B2", "name": "Hillside"}));
		assert!(engine.can_perform(&manager, Action::Read, (&b1).into(), None).unwrap());
		assert!(!engine.can_perform(&manager, Action::Read, (&b2).into(), None).unwrap());
		assert!(!engine.can_perform(&manager, Action::Update, (&b1).into(), None).unwrap());
	}

	#[test]
	fn manages_assets_of_every_managed_branch() {
		let engine = authorizer();
		let manager = branch_manager();
		for (branch, expected) in [("B1", true), ("B7", true), ("B2", false)] {
			let asset = resource("Asset", json!({"id": "a-1", "branchId": branch}));
			assert_eq!(
				engine.can_perform(&manager, Action::Delete, (&asset).into(), None).unwrap(),
				expected,
				"branch {branch}"
			);
		}
	}

	#[test]
	fn cannot_move_asset_to_unmanaged_branch() {
		let engine = authorizer();
		let manager = branch_manager();
		let asset = resource("Asset", json!({"id": "a-1", "branchId": "B1"}));
		let to_b7 = object(json!({"branchId": "B7"}));
		let to_b2 = object(json!({"branchId": "B2"}));
		assert!(engine.can_perform(&manager, Action::Update, (&asset).into(), Some(&to_b7)).unwrap());
		assert!(!engine.can_perform(&manager, Action::Update, (&asset).into(), Some(&to_b2)).unwrap());
	}

	#[test]
	fn create_payload_must_land_in_scope() {
		let engine = authorizer();
		let manager = branch_manager();
		let inside = object(json!({"branchId": "B1", "title": "Flat"}));
		let outside = object(json!({"branchId": "B9", "title": "Flat"}));
		assert!(engine.can_perform(&manager, Action::Create, Target::Subject("Asset"), Some(&inside)).unwrap());
		assert!(!engine.can_perform(&manager, Action::Create, Target::Subject("Asset"), Some(&outside)).unwrap());
	}
}

mod roles {
	use super::*;

	fn agent_and_admin() -> Principal {
		principal()
			.with_role(Role::new("r-agent", "Agent").with_grant(GrantRecord::allow(Action::Read, "Listing")))
			.with_role(Role::new("r-admin", "Admin").with_grant(GrantRecord::allow(Action::Manage, "all")))
			.with_grant(GrantRecord::allow(Action::Delete, "Contact").with_role_context("r-admin"))
	}

	#[test]
	fn active_role_isolates_grants() {
		let engine = authorizer();
		let agent = agent_and_admin().with_active_role("r-agent");
		assert!(engine.can_perform(&agent, Action::Read, Target::Subject("Listing"), None).unwrap());
		assert!(!engine.can_perform(&agent, Action::Delete, Target::Subject("Listing"), None).unwrap());
		assert!(!engine.can_perform(&agent, Action::Delete, Target::Subject("Contact"), None).unwrap());
	}

	#[test]
	fn contextual_grant_follows_its_role() {
		let engine = authorizer();
		let agent = agent_and_admin().with_active_role("r-agent");
		let admin = agent_and_admin().with_active_role("r-admin");
		assert_eq!(engine.rules_for(&agent).unwrap().len(), 1);
		assert_eq!(engine.rules_for(&admin).unwrap().len(), 2);

		let decision = engine
			.check(&admin, Action::Delete, Target::Subject("Listing"), None)
			.unwrap();
		assert!(decision.allowed);
		assert_eq!(
			decision.reason,
			DecisionReason::Allowed {
				source: GrantSource::Role {
					role_id: RoleId::new("r-admin"),
				},
				priority: 1,
			}
		);
	}

	#[test]
	fn unknown_active_role_yields_nothing() {
		let engine = authorizer();
		let lost = agent_and_admin()
			.with_grant(GrantRecord::allow(Action::Read, "Branch"))
			.with_active_role("r-ghost");
		assert!(!engine.can_perform(&lost, Action::Read, Target::Subject("Listing"), None).unwrap());
		assert!(!engine.can_perform(&lost, Action::Read, Target::Subject("Branch"), None).unwrap());
	}

	#[test]
	fn no_active_role_uses_every_role_but_no_contextual_grant() {
		let engine = authorizer();
		let p = agent_and_admin();
		let rules = engine.rules_for(&p).unwrap();
		assert_eq!(rules.len(), 2);
		assert!(rules.iter().all(|r| r.source != GrantSource::Individual));
		assert!(engine.can_perform(&p, Action::Delete, Target::Subject("Listing"), None).unwrap());
	}
}

#[test]
fn expired_grants_are_ignored() {
	let engine = authorizer();
	let expired = principal().with_grant(GrantRecord::allow(Action::Read, "Asset").expiring_at(now() - Duration::minutes(1)));
	let live = principal().with_grant(GrantRecord::allow(Action::Read, "Asset").expiring_at(now() + Duration::minutes(1)));
	assert!(!engine.can_perform(&expired, Action::Read, Target::Subject("Asset"), None).unwrap());
	assert!(engine.can_perform(&live, Action::Read, Target::Subject("Asset"), None).unwrap());
}

mod fail_closed {
	use super::*;

	#[test]
	fn malformed_grant_is_skipped() {
		let p = principal()
			.with_grant(GrantRecord::allow(Action::Read, "Asset").with_priority(500))
			.with_grant(GrantRecord::allow(Action::Read, "Branch").with_conditions(json!(["not", "a", "document"])));
		let engine = authorizer();
		assert!(!engine.can_perform(&p, Action::Read, Target::Subject("Asset"), None).unwrap());
		assert!(!engine.can_perform(&p, Action::Read, Target::Subject("Branch"), None).unwrap());
	}

	#[test]
	fn unknown_operator_never_grants() {
		let p = principal().with_grant(GrantRecord::allow(Action::Read, "Asset").with_conditions(json!({"price": {"$near": 10}})));
		let asset = resource("Asset", json!({"price": 10}));
		assert!(!authorizer().can_perform(&p, Action::Read, (&asset).into(), None).unwrap());
	}

	#[test]
	fn unknown_operator_in_deny_blocks() {
		let p = principal()
			.with_grant(GrantRecord::allow(Action::Read, "Asset"))
			.with_grant(GrantRecord::deny(Action::Read, "Asset").with_conditions(json!({"price": {"$near": 10}})));
		let asset = resource("Asset", json!({"price": 99}));
		assert!(!authorizer().can_perform(&p, Action::Read, (&asset).into(), None).unwrap());
	}

	#[test]
	fn missing_principal_ids_are_fatal() {
		let engine = authorizer();
		for p in [Principal::new("", "t-1"), Principal::new("u-1", " ")] {
			let err = engine
				.can_perform(&p, Action::Read, Target::Subject("Asset"), None)
				.unwrap_err();
			assert!(matches!(err, AuthzError::InvalidPrincipal(_)));
			assert!(err.is_fatal());
		}
	}
}

#[test]
fn field_checks_honour_restricted_denies() {
	let p = principal()
		.with_grant(GrantRecord::allow(Action::Update, "Contact"))
		.with_grant(GrantRecord::deny(Action::Update, "Contact").with_fields(["email"]));
	let engine = authorizer();
	let contact = resource("Contact", json!({"id": "c-1"}));
	assert!(engine.can_perform(&p, Action::Update, (&contact).into(), None).unwrap());
	assert!(engine.can_perform_field(&p, Action::Update, (&contact).into(), "phone").unwrap());
	assert!(!engine.can_perform_field(&p, Action::Update, (&contact).into(), "email").unwrap());

	let rename = object(json!({"phone": "555"}));
	let readdress = object(json!({"phone": "555", "email": "x@example.com"}));
	assert!(engine.can_perform(&p, Action::Update, (&contact).into(), Some(&rename)).unwrap());
	assert!(!engine.can_perform(&p, Action::Update, (&contact).into(), Some(&readdress)).unwrap());
}

#[test]
fn request_scope_answers_repeatedly() {
	let engine = authorizer();
	let manager = branch_manager();
	let scope = engine.scope(&manager).unwrap();
	assert_eq!(scope.rules().len(), 2);

	let assets: Vec<_> = ["B1", "B2", "B7"]
		.iter()
		.map(|b| resource("Asset", json!({"branchId": b})))
		.collect();
	let visible: Vec<bool> = assets
		.iter()
		.map(|a| scope.can_perform(Action::Read, a.into(), None))
		.collect();
	assert_eq!(visible, vec![true, false, true]);
	assert!(scope.filter_for(Action::Read, "Asset").is_some());
	assert!(!scope.allowed_fields("Asset", None).is_none());
}
