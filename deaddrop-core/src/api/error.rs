// SPDX-FileCopyrightText: 2026 Deaddrop Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! API Error Types
//!
//! Unified error type for the Deaddrop API layer. No public operation
//! panics; everything resolves to a `DeaddropResult`.

use thiserror::Error;

use crate::engine::EngineError;
use crate::storage::StorageError;
use crate::transport::TransportError;

/// Unified error type for Deaddrop operations.
#[derive(Error, Debug)]
pub enum DeaddropError {
    /// Transport operation failed after exhausting its retry policy.
    /// Callers defer to the next sync cycle.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Storage operation failed (constraint violations included).
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The Session Engine rejected an operation outright.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Contact not found for the current account.
    #[error("contact not found: {0}")]
    ContactNotFound(String),

    /// Discussion not found for the current account.
    #[error("discussion not found: {0}")]
    DiscussionNotFound(String),

    /// The engine reports no active session with this peer. Logged as a
    /// state inconsistency and self-healed on the next sync.
    #[error("no active session with {0}")]
    NoActiveSession(String),

    /// Refusing a discussion requires explicit confirmation.
    #[error("confirmation required")]
    ConfirmationRequired,

    /// No account context: call `login` first.
    #[error("not logged in")]
    NotLoggedIn,

    /// Invalid operation in current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

/// Result type for Deaddrop operations.
pub type DeaddropResult<T> = Result<T, DeaddropError>;
