// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod engine;
mod logging;

pub use engine::{
	default_essential_fields, EngineConfig, EngineConfigLayer, DEFAULT_MAX_CONDITION_DEPTH,
	DEFAULT_REGEX_SIZE_LIMIT,
};
pub use logging::{LoggingConfig, LoggingConfigLayer};
