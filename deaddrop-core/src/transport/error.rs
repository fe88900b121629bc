// SPDX-FileCopyrightText: 2026 Deaddrop Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Transport error types.

use thiserror::Error;

/// Transport error types.
///
/// An `Exhausted` value is the structured "sync deferred" outcome: the retry
/// policy gave up and the caller retries on the next sync cycle. Transport
/// errors never propagate as panics.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}
