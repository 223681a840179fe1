// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde_json::json;

use estate_authz::{DecisionReason, FnGuard, GuardViolation, SelfVerificationGuard, TenantBoundaryGuard, Target};
use estate_authz_core::{Action, GrantRecord};

use super::support::{authorizer, object, principal, resource};

#[test]
fn principal_cannot_verify_themselves() {
	let engine = authorizer().with_guard(SelfVerificationGuard::default());
	let p = principal().with_grant(GrantRecord::allow(Action::Update, "User"));
	let me = resource("User", json!({"id": "u-1"}));
	let someone = resource("User", json!({"id": "u-2"}));
	let verify = object(json!({"isVerified": true}));

	let decision = engine.check(&p, Action::Update, (&me).into(), Some(&verify)).unwrap();
	assert!(!decision.allowed);
	assert!(matches!(
		decision.reason,
		DecisionReason::GuardRejected { ref guard, .. } if guard == "self-verification"
	));
	assert!(engine.can_perform(&p, Action::Update, (&someone).into(), Some(&verify)).unwrap());
}

#[test]
fn guards_never_grant() {
	let engine = authorizer().with_guard(TenantBoundaryGuard::default());
	let own = resource("Asset", json!({"tenantId": "t-1"}));
	assert!(!engine.can_perform(&principal(), Action::Read, (&own).into(), None).unwrap());
}

#[test]
fn tenant_boundary_applies_to_every_subject() {
	let engine = authorizer().with_guard(TenantBoundaryGuard::default());
	let p = principal().with_grant(GrantRecord::allow(Action::Manage, "all"));
	let own = resource("Listing", json!({"tenantId": "t-1"}));
	let foreign = resource("Listing", json!({"tenantId": "t-2"}));
	assert!(engine.can_perform(&p, Action::Read, (&own).into(), None).unwrap());
	assert!(!engine.can_perform(&p, Action::Read, (&foreign).into(), None).unwrap());
	assert!(!engine.can_perform_field(&p, Action::Read, (&foreign).into(), "title").unwrap());

	let escape = object(json!({"tenantId": "t-2"}));
	assert!(!engine.can_perform(&p, Action::Update, (&own).into(), Some(&escape)).unwrap());
}

#[test]
fn closure_guards_compose() {
	let engine = authorizer()
		.with_guard(TenantBoundaryGuard::default())
		.with_guard(FnGuard::new("published-listings-stay", "Listing", |ctx| {
			let published = ctx
				.resource
				.and_then(|r| r.get("status"))
				.is_some_and(|status| status == json!("published"));
			if ctx.action == Action::Delete && published {
				return Err(GuardViolation::new("published listings cannot be deleted"));
			}
			Ok(())
		}));
	let p = principal().with_grant(GrantRecord::allow(Action::Manage, "all"));
	let published = resource("Listing", json!({"tenantId": "t-1", "status": "published"}));
	let draft = resource("Listing", json!({"tenantId": "t-1", "status": "draft"}));

	let decision = engine.check(&p, Action::Delete, Target::from(&published), None).unwrap();
	assert_eq!(
		decision.reason,
		DecisionReason::GuardRejected {
			guard: "published-listings-stay".to_string(),
			message: "published listings cannot be deleted".to_string(),
		}
	);
	assert!(engine.can_perform(&p, Action::Delete, Target::from(&draft), None).unwrap());
	assert!(engine.can_perform(&p, Action::Update, Target::from(&published), None).unwrap());
}
