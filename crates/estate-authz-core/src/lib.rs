// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Estate authorization engine.
//!
//! This crate holds the data the engine reasons about and nothing that makes
//! decisions. It is shared by the engine (`estate-authz`) and by stores that
//! consume its row predicates.
//!
//! # Overview
//!
//! - [`Principal`] and [`Role`]: the hydrated actor and its role bundles
//! - [`GrantRecord`]: the wire shape of one grant, compiled into a [`Rule`]
//! - [`Condition`]: the parsed Mongo-style condition tree of a rule
//! - [`Resource`]: a typed resource instance
//! - [`Predicate`]: a row filter with an in-memory matcher and a SQL renderer
//!
//! # Example
//!
//! ```
//! use estate_authz_core::{Action, GrantRecord, GrantSource, Rule};
//! use serde_json::json;
//!
//! let grant = GrantRecord::allow(Action::Read, "Branch")
//!     .with_conditions(json!({"id": {"$eq": "$principal.branchId"}}))
//!     .with_priority(50);
//!
//! let rule = Rule::compile(&grant, GrantSource::Individual, 16).unwrap();
//! assert!(rule.applies_to(Action::Read, "Branch"));
//! assert!(rule.is_conditional());
//! ```

pub mod condition;
pub mod error;
pub mod grant;
pub mod matching;
pub mod predicate;
pub mod principal;
pub mod resource;
pub mod rule;
pub mod sql;
pub mod types;
pub mod value;

pub use condition::{Condition, ElemMatch, FieldOp, FieldTest};
pub use error::{AuthzError, Result};
pub use grant::{GrantRecord, GrantSource, MAX_PRIORITY, MIN_PRIORITY};
pub use matching::RegexPattern;
pub use predicate::{ArrayOp, CompareOp, ElementForm, LikeKind, Predicate, ELEMENT};
pub use principal::{Principal, Role};
pub use resource::Resource;
pub use rule::{FieldPattern, Rule};
pub use sql::SqlFragment;
pub use types::{Action, PrincipalId, RoleId, SubjectType, TenantId};
