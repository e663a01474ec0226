// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Shared-state safety helpers.

pub mod locks;

pub use locks::{resilient_read, resilient_write, try_resilient_read, try_resilient_write};
