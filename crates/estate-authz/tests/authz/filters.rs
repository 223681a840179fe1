// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde_json::json;

use estate_authz::Target;
use estate_authz_core::{Action, CompareOp, ElementForm, GrantRecord, Predicate};

use super::support::{authorizer, branch_manager, object, principal, resource};

#[test]
fn unconditional_allow_lifts_every_restriction() {
	let p = principal()
		.with_attribute("branchId", json!("B1"))
		.with_grant(GrantRecord::allow(Action::Read, "Asset").with_conditions(json!({"branchId": {"$eq": "$principal.branchId"}})))
		.with_grant(GrantRecord::allow(Action::Read, "Asset"));
	assert_eq!(authorizer().filter_for(&p, Action::Read, "Asset").unwrap(), None);
}

#[test]
fn conditional_allow_becomes_bound_predicate() {
	let p = principal()
		.with_attribute("branchId", json!("B1"))
		.with_grant(GrantRecord::allow(Action::Read, "Asset").with_conditions(json!({"branchId": {"$eq": "$principal.branchId"}})));
	let filter = authorizer().filter_for(&p, Action::Read, "Asset").unwrap();
	assert_eq!(filter, Some(Predicate::compare("branchId", CompareOp::Eq, json!("B1"))));

	let sql = filter.unwrap().to_sql();
	assert_eq!(sql.sql, "\"branchId\" = $1");
	assert_eq!(sql.params, vec![json!("B1")]);
}

#[test]
fn no_allow_filters_out_every_row() {
	assert_eq!(
		authorizer().filter_for(&principal(), Action::Read, "Asset").unwrap(),
		Some(Predicate::never())
	);
}

#[test]
fn deny_rules_are_negated() {
	let p = principal()
		.with_grant(GrantRecord::allow(Action::Read, "Asset"))
		.with_grant(GrantRecord::deny(Action::Read, "Asset").with_conditions(json!({"status": "archived"})));
	let filter = authorizer().filter_for(&p, Action::Read, "Asset").unwrap();
	assert_eq!(
		filter,
		Some(Predicate::not(Predicate::compare("status", CompareOp::Eq, json!("archived"))))
	);
}

#[test]
fn negated_deny_keeps_rows_without_the_attribute() {
	let p = principal()
		.with_grant(GrantRecord::allow(Action::Read, "Asset"))
		.with_grant(GrantRecord::deny(Action::Read, "Asset").with_conditions(json!({"status": "draft"})));
	let filter = authorizer().filter_for(&p, Action::Read, "Asset").unwrap().unwrap();

	let sql = filter.to_sql();
	assert_eq!(sql.sql, r#"("status" = $1) IS NOT TRUE"#);
	assert_eq!(sql.params, vec![json!("draft")]);

	let row = object(json!({"id": 1}));
	assert!(filter.matches(&row));
	let instance = resource("Asset", json!({"id": 1}));
	assert!(authorizer().can_perform(&p, Action::Read, Target::from(&instance), None).unwrap());
}

#[test]
fn array_operators_translate() {
	let p = principal()
		.with_grant(
			GrantRecord::allow(Action::Read, "Listing")
				.with_conditions(json!({"tags": {"$size": 2}}))
				.with_priority(50),
		)
		.with_grant(
			GrantRecord::allow(Action::Read, "Listing")
				.with_conditions(json!({"units": {"$elemMatch": {"status": "free"}}}))
				.with_priority(40),
		);
	let engine = authorizer();
	let filter = engine.filter_for(&p, Action::Read, "Listing").unwrap().unwrap();
	assert_eq!(
		filter,
		Predicate::Or(vec![
			Predicate::Size {
				field: "tags".into(),
				len: 2,
			},
			Predicate::ElemMatch {
				field: "units".into(),
				form: ElementForm::Document,
				element: Box::new(Predicate::compare("status", CompareOp::Eq, json!("free"))),
			},
		])
	);

	for (attributes, expected) in [
		(json!({"tags": ["a", "b"]}), true),
		(json!({"units": [{"status": "sold"}, {"status": "free"}]}), true),
		(json!({"tags": ["a"], "units": [{"status": "sold"}]}), false),
		(json!({}), false),
	] {
		let instance = resource("Listing", attributes.clone());
		let in_object = engine.can_perform(&p, Action::Read, Target::from(&instance), None).unwrap();
		assert_eq!(filter.matches(&object(attributes.clone())), expected, "{attributes}");
		assert_eq!(in_object, expected, "{attributes}");
	}
}

mod unresolved_variables {
	use super::*;

	/// Holds the manager's grants but no `branchId` of their own.
	fn detached_manager() -> estate_authz_core::Principal {
		principal().with_grant(
			GrantRecord::allow(Action::Read, "Asset").with_conditions(json!({"branchId": "$principal.branchId"})),
		)
	}

	#[test]
	fn allow_never_matches_rows_missing_the_field() {
		let p = detached_manager();
		let engine = authorizer();

		assert_eq!(
			engine.filter_for(&p, Action::Read, "Asset").unwrap(),
			Some(Predicate::never())
		);
		for attributes in [json!({"id": "a-1"}), json!({"id": "a-2", "branchId": null}), json!({"branchId": "B1"})] {
			let instance = resource("Asset", attributes.clone());
			assert!(
				!engine.can_perform(&p, Action::Read, Target::from(&instance), None).unwrap(),
				"{attributes}"
			);
		}
	}

	#[test]
	fn deny_blocks_in_both_modes() {
		let p = principal()
			.with_grant(GrantRecord::allow(Action::Read, "Asset"))
			.with_grant(
				GrantRecord::deny(Action::Read, "Asset")
					.with_conditions(json!({"$not": {"regionId": {"$eq": "$principal.regionId"}}})),
			);
		let engine = authorizer();

		assert_eq!(
			engine.filter_for(&p, Action::Read, "Asset").unwrap(),
			Some(Predicate::never())
		);
		let instance = resource("Asset", json!({"regionId": "north"}));
		assert!(!engine.can_perform(&p, Action::Read, Target::from(&instance), None).unwrap());
	}
}

#[test]
fn untranslatable_deny_excludes_every_row() {
	let p = principal()
		.with_grant(GrantRecord::allow(Action::Read, "Asset"))
		.with_grant(GrantRecord::deny(Action::Read, "Asset").with_conditions(json!({"geo": {"$near": [0, 0]}})));
	assert_eq!(
		authorizer().filter_for(&p, Action::Read, "Asset").unwrap(),
		Some(Predicate::never())
	);
}

#[test]
fn list_variables_render_as_in() {
	let filter = authorizer()
		.filter_for(&branch_manager(), Action::Read, "Asset")
		.unwrap()
		.unwrap();
	assert_eq!(
		filter,
		Predicate::In {
			field: "branchId".to_string(),
			values: vec![json!("B1"), json!("B7")],
		}
	);
	assert!(filter.matches(json!({"branchId": "B7"}).as_object().unwrap()));
	assert!(!filter.matches(json!({"branchId": "B2"}).as_object().unwrap()));
}
