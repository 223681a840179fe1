// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization decision engine for Estate.
//!
//! Attribute conditions are layered on role-based grants. A request is
//! decided in stages, each a pure function of the hydrated [`Principal`]:
//!
//! 1. **Aggregation**: grants of the active role plus live individual grants,
//!    compiled and sorted by priority ([`aggregate`])
//! 2. **Resolution**: `$principal.<path>` tokens bound to principal values
//!    ([`resolve`])
//! 3. **Evaluation**: one of object mode ([`evaluate`]), query mode
//!    ([`translate`]) or field access ([`fields`])
//!
//! [`Authorizer`] sequences the stages and applies the subject [`guards`].
//!
//! # Example
//!
//! ```
//! use estate_authz::{Authorizer, Target};
//! use estate_authz_core::{Action, GrantRecord, Principal, Resource};
//! use serde_json::json;
//!
//! let manager = Principal::new("u-1", "t-1")
//!     .with_attribute("branchId", json!("B1"))
//!     .with_grant(
//!         GrantRecord::allow(Action::Read, "Branch")
//!             .with_conditions(json!({"id": {"$eq": "$principal.branchId"}})),
//!     );
//!
//! let engine = Authorizer::default();
//! let own = Resource::new("Branch").with("id", json!("B1"));
//! let other = Resource::new("Branch").with("id", json!("B2"));
//!
//! assert!(engine.can_perform(&manager, Action::Read, Target::from(&own), None).unwrap());
//! assert!(!engine.can_perform(&manager, Action::Read, Target::from(&other), None).unwrap());
//! ```

pub mod aggregate;
pub mod decision;
pub mod engine;
pub mod evaluate;
pub mod fields;
pub mod guards;
pub mod resolve;
pub mod scope;
pub mod translate;

pub use aggregate::{Clock, FixedClock, SystemClock};
pub use decision::{AccessDecision, DecisionReason, Target};
pub use engine::Authorizer;
pub use evaluate::{EvalOptions, Outcome};
pub use fields::FieldAccess;
pub use guards::{FnGuard, Guard, GuardContext, GuardViolation, SelfVerificationGuard, TenantBoundaryGuard};
pub use resolve::ResolvedRuleSet;
pub use scope::RequestScope;
