// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod consistency;
mod decisions;
mod fields;
mod filters;
mod guards;
mod support;
