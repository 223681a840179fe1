// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error taxonomy for the authorization engine.
//!
//! Only [`AuthzError::InvalidPrincipal`] ever crosses the engine boundary. The
//! other kinds are produced while compiling or evaluating individual rules and
//! are logged and absorbed by the engine, always in the direction of denial.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuthzError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
	/// A grant is structurally malformed. The grant is skipped.
	#[error("invalid grant: {0}")]
	Configuration(String),

	/// A variable token points at a path the principal does not have.
	#[error("unresolved principal variable: {path}")]
	Resolution { path: String },

	/// An operator cannot be evaluated against a concrete resource.
	#[error("cannot evaluate {operator}: {message}")]
	Evaluation { operator: String, message: String },

	/// An operator has no counterpart in the predicate language.
	#[error("cannot translate {operator} on {field} into a store predicate")]
	Translation { operator: String, field: String },

	/// The principal is missing a required identifier.
	#[error("invalid principal: {0}")]
	InvalidPrincipal(String),
}

impl AuthzError {
	pub fn evaluation(operator: impl Into<String>, message: impl Into<String>) -> Self {
		Self::Evaluation {
			operator: operator.into(),
			message: message.into(),
		}
	}

	pub fn translation(operator: impl Into<String>, field: impl Into<String>) -> Self {
		Self::Translation {
			operator: operator.into(),
			field: field.into(),
		}
	}

	/// Stable error code for logs and audit records.
	pub fn code(&self) -> &'static str {
		match self {
			AuthzError::Configuration(_) => "CONFIGURATION_ERROR",
			AuthzError::Resolution { .. } => "RESOLUTION_ERROR",
			AuthzError::Evaluation { .. } => "EVALUATION_ERROR",
			AuthzError::Translation { .. } => "TRANSLATION_ERROR",
			AuthzError::InvalidPrincipal(_) => "INVALID_PRINCIPAL",
		}
	}

	/// Returns true for errors that must be surfaced to the caller.
	pub fn is_fatal(&self) -> bool {
		matches!(self, AuthzError::InvalidPrincipal(_))
	}
}
