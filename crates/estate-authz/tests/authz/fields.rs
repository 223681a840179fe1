// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde_json::json;

use estate_authz::FieldAccess;
use estate_authz_config::EngineConfig;
use estate_authz_core::{Action, GrantRecord};

use super::support::{authorizer, now, principal, resource};

#[test]
fn top_priority_rule_decides_not_union() {
	let p = principal()
		.with_grant(GrantRecord::allow(Action::Read, "Contact").with_fields(["phone"]).with_priority(50))
		.with_grant(GrantRecord::allow(Action::Read, "Contact").with_fields(["email"]).with_priority(20))
		.with_grant(GrantRecord::allow(Action::Read, "Contact").with_priority(10));
	let access = authorizer().allowed_fields(&p, "Contact", None).unwrap();
	assert_eq!(
		access,
		FieldAccess::Only(vec![
			"phone".to_string(),
			"id".to_string(),
			"createdAt".to_string(),
			"updatedAt".to_string(),
		])
	);
	assert!(access.permits("phone"));
	assert!(!access.permits("email"));
}

#[test]
fn unrestricted_top_rule_exposes_everything() {
	let p = principal()
		.with_grant(GrantRecord::allow(Action::Read, "Contact").with_priority(60))
		.with_grant(GrantRecord::allow(Action::Read, "Contact").with_fields(["phone"]).with_priority(50));
	assert_eq!(authorizer().allowed_fields(&p, "Contact", None).unwrap(), FieldAccess::All);
}

#[test]
fn nothing_readable_is_distinct_from_everything() {
	let access = authorizer().allowed_fields(&principal(), "Contact", None).unwrap();
	assert!(access.is_none());
	assert_ne!(access, FieldAccess::All);
}

#[test]
fn instance_conditions_pick_the_deciding_rule() {
	let p = principal()
		.with_grant(
			GrantRecord::allow(Action::Read, "Contact")
				.with_conditions(json!({"ownerId": "$principal.id"}))
				.with_priority(90),
		)
		.with_grant(GrantRecord::allow(Action::Read, "Contact").with_fields(["name"]).with_priority(10));
	let engine = authorizer();
	let mine = resource("Contact", json!({"ownerId": "u-1"}));
	let theirs = resource("Contact", json!({"ownerId": "u-2"}));
	assert_eq!(engine.allowed_fields(&p, "Contact", Some(&mine)).unwrap(), FieldAccess::All);
	assert_eq!(
		engine
			.allowed_fields(&p, "Contact", Some(&theirs))
			.unwrap()
			.as_list()
			.map(|fields| fields.to_vec()),
		Some(vec![
			"name".to_string(),
			"id".to_string(),
			"createdAt".to_string(),
			"updatedAt".to_string(),
		])
	);
}

#[test]
fn denied_fields_are_hidden_but_essentials_survive() {
	let p = principal()
		.with_grant(GrantRecord::allow(Action::Read, "Contact"))
		.with_grant(GrantRecord::deny(Action::Read, "Contact").with_fields(["email", "id", "address.*"]));
	let access = authorizer().allowed_fields(&p, "Contact", None).unwrap();
	assert_eq!(
		access,
		FieldAccess::AllExcept(vec!["email".to_string(), "address.*".to_string()])
	);

	let contact = json!({
		"id": "c-1",
		"name": "Ana",
		"email": "ana@example.com",
		"address": {"city": "Porto"},
	});
	let redacted = access.redact(contact.as_object().unwrap());
	assert_eq!(serde_json::Value::Object(redacted), json!({"id": "c-1", "name": "Ana"}));
}

#[test]
fn essential_fields_come_from_config() {
	let config = EngineConfig {
		essential_fields: vec!["uuid".to_string()],
		..EngineConfig::default()
	};
	let engine = estate_authz::Authorizer::new(config).with_clock(estate_authz::FixedClock(now()));
	let p = principal().with_grant(GrantRecord::allow(Action::Read, "Contact").with_fields(["phone"]));
	assert_eq!(
		engine.allowed_fields(&p, "Contact", None).unwrap(),
		FieldAccess::Only(vec!["phone".to_string(), "uuid".to_string()])
	);
}
