// SPDX-FileCopyrightText: 2026 Deaddrop Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Unix-seconds clock helper shared across the crate.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in seconds. Clamps to 0 on a pre-epoch clock rather
/// than panicking.
pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
