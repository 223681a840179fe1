// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! A row passes the list filter exactly when the same row, checked as an
//! instance, is readable.

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use estate_authz::Target;
use estate_authz_core::{Action, GrantRecord, Principal, Resource};

use super::support::{authorizer, branch_manager};

fn listing_agent() -> Principal {
	branch_manager()
		.with_grant(
			GrantRecord::allow(Action::Read, "Listing")
				.with_conditions(json!({
					"branchId": {"$in": "$principal.settings.managedBranches"},
					"price": {"$lt": 500},
				}))
				.with_priority(50),
		)
		.with_grant(
			GrantRecord::allow(Action::Read, "Listing")
				.with_conditions(json!({"$or": [
					{"ownerId": "$principal.id"},
					{"title": {"$startsWith": "Pent"}},
				]}))
				.with_priority(30),
		)
		.with_grant(
			GrantRecord::allow(Action::Read, "Listing")
				.with_conditions(json!({
					"tags": {"$contains": ["featured"]},
					"price": {"$between": [100, 300]},
				}))
				.with_priority(20),
		)
		.with_grant(
			GrantRecord::deny(Action::Read, "Listing")
				.with_conditions(json!({"status": {"$in": ["archived", "withdrawn"]}}))
				.with_priority(10),
		)
		.with_grant(
			GrantRecord::deny(Action::Read, "Listing")
				.with_conditions(json!({"$and": [
					{"archivedAt": {"$exists": true}},
					{"title": {"$regex": "^old", "$options": "i"}},
				]}))
				.with_priority(5),
		)
		.with_grant(
			GrantRecord::deny(Action::Read, "Listing")
				.with_conditions(json!({"price": {"$not": {"$lte": 900}}, "ownerId": {"$ne": "$principal.id"}})),
		)
		.with_grant(
			GrantRecord::allow(Action::Read, "Listing")
				.with_conditions(json!({"tags": {"$size": 2}, "status": {"$nin": ["draft"]}}))
				.with_priority(45),
		)
		.with_grant(
			GrantRecord::allow(Action::Read, "Listing")
				.with_conditions(json!({"units": {"$elemMatch": {"status": "free", "floor": {"$gte": 2}}}}))
				.with_priority(44),
		)
		.with_grant(
			GrantRecord::allow(Action::Read, "Listing")
				.with_conditions(json!({
					"rooms": {"$elemMatch": {"$gt": 3, "$lte": 5}},
					"tags": {"$all": ["new"]},
				}))
				.with_priority(43),
		)
		.with_grant(
			GrantRecord::allow(Action::Read, "Listing")
				.with_conditions(json!({"tags": {"$overlap": ["sea"]}, "price": {"$gte": 900}}))
				.with_priority(42),
		)
		.with_grant(
			GrantRecord::allow(Action::Read, "Listing")
				.with_conditions(json!({"tags": {"$contained": ["new", "sea"]}, "title": {"$endsWith": "barn"}}))
				.with_priority(41),
		)
		.with_grant(
			GrantRecord::allow(Action::Read, "Listing")
				.with_conditions(json!({"$or": [
					{"price": {"$notBetween": [100, 800]}, "title": {"$substring": "mill"}},
					{"price": {"$gt": 950}},
				]}))
				.with_priority(35),
		)
		.with_grant(
			GrantRecord::allow(Action::Read, "Listing")
				.with_conditions(json!({"archivedAt": {"$exists": false}, "tags": "sea", "branchId": null}))
				.with_priority(25),
		)
		.with_grant(
			GrantRecord::deny(Action::Read, "Listing")
				.with_conditions(json!({"rooms": {"$size": 0}}))
				.with_priority(8),
		)
		.with_grant(
			GrantRecord::deny(Action::Read, "Listing")
				.with_conditions(json!({"units": {"$elemMatch": {"$eq": "vacant"}}, "status": {"$exists": false}}))
				.with_priority(7),
		)
}

/// Present, `null`, or missing.
fn nullable(values: impl Strategy<Value = Value> + 'static) -> impl Strategy<Value = Option<Value>> {
	prop_oneof![
		3 => values.prop_map(Some),
		1 => Just(Some(Value::Null)),
		1 => Just(None),
	]
}

fn arb_unit() -> impl Strategy<Value = Value> {
	prop_oneof![
		4 => (prop::sample::select(vec!["free", "sold"]), 0i64..5)
			.prop_map(|(status, floor)| json!({"status": status, "floor": floor})),
		1 => Just(json!("vacant")),
	]
}

fn arb_row() -> impl Strategy<Value = Map<String, Value>> {
	let scalars = (
		nullable(prop::sample::select(vec!["B1", "B2", "B7"]).prop_map(Value::from)),
		nullable((0i64..1000).prop_map(Value::from)),
		prop::sample::select(vec!["u-1", "u-2"]),
		nullable(prop::sample::select(vec!["Penthouse", "Cottage", "old mill", "Old barn", "Pent"]).prop_map(Value::from)),
		nullable(prop::sample::select(vec!["active", "archived", "withdrawn", "draft"]).prop_map(Value::from)),
		any::<bool>(),
	);
	let arrays = (
		nullable(prop::sample::subsequence(vec!["featured", "new", "sea"], 0..=3).prop_map(|tags| json!(tags))),
		nullable(prop::collection::vec(arb_unit(), 0..4).prop_map(Value::Array)),
		nullable(prop::collection::vec(0i64..7, 0..4).prop_map(|rooms| json!(rooms))),
	);

	(scalars, arrays).prop_map(|((branch, price, owner, title, status, archived), (tags, units, rooms))| {
		let mut row = Map::new();
		let mut put = |key: &str, value: Option<Value>| {
			if let Some(value) = value {
				row.insert(key.to_string(), value);
			}
		};
		put("branchId", branch);
		put("price", price);
		put("ownerId", Some(json!(owner)));
		put("title", title);
		put("status", status);
		put("tags", tags);
		put("units", units);
		put("rooms", rooms);
		if archived {
			put("archivedAt", Some(json!("2024-11-02T10:00:00Z")));
		}
		row
	})
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(512))]

	#[test]
	fn filter_agrees_with_instance_checks(row in arb_row()) {
		let engine = authorizer();
		let principal = listing_agent();
		let scope = engine.scope(&principal).unwrap();

		let in_query = scope
			.filter_for(Action::Read, "Listing")
			.map_or(true, |filter| filter.matches(&row));
		let instance = Resource::with_attributes("Listing", row.clone());
		let in_object = scope.can_perform(Action::Read, Target::from(&instance), None);

		prop_assert_eq!(in_query, in_object, "row {:?}", row);
	}

	#[test]
	fn no_grants_match_no_rows(row in arb_row()) {
		let engine = authorizer();
		let principal = super::support::principal();
		let filter = engine.filter_for(&principal, Action::Read, "Listing").unwrap();
		prop_assert!(filter.as_ref().is_some_and(|f| !f.matches(&row)));
		let instance = Resource::with_attributes("Listing", row);
		prop_assert!(!engine.can_perform(&principal, Action::Read, Target::from(&instance), None).unwrap());
	}
}
