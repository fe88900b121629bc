// SPDX-FileCopyrightText: 2026 Deaddrop Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Bulletin Store API Trait
//!
//! Backend-agnostic abstraction over the public bulletin store. One method
//! call is one attempt against the remote; retry and backoff live in
//! [`BulletinClient`](super::BulletinClient), not here.

use crate::engine::Seeker;

use super::error::TransportError;

/// One fetched message-board entry.
#[derive(Debug, Clone)]
pub struct BoardEntry {
    /// The seeker (lookup key) this entry was stored under.
    pub seeker: Seeker,
    /// Opaque encrypted payload.
    pub ciphertext: Vec<u8>,
    /// Local unix time at which the entry was fetched. The wire format
    /// carries no timestamp, so this is the client's own clock.
    pub fetched_at: u64,
}

/// Raw bulletin-store operations (single attempt each).
///
/// Implementations: [`HttpBulletinApi`](super::HttpBulletinApi) for the REST
/// binding, [`MemoryBulletin`](super::MemoryBulletin) for tests and loopback
/// use.
pub trait BulletinApi: Send {
    /// Fetches all stored values for the given seekers in one batched call.
    fn fetch_messages(&self, seekers: &[Seeker]) -> Result<Vec<BoardEntry>, TransportError>;

    /// Writes one encrypted message under a seeker. At-least-once semantics;
    /// duplicate writes are harmless at the protocol layer.
    fn post_message(&self, seeker: &Seeker, ciphertext: &[u8]) -> Result<(), TransportError>;

    /// Broadcasts an announcement to the globally readable channel. Returns
    /// the store's sequence counter for the appended entry.
    fn post_announcement(&self, payload: &[u8]) -> Result<String, TransportError>;

    /// Fetches the full announcement history. Callers filter by
    /// decryptability and by their own cursor.
    fn fetch_announcements(&self) -> Result<Vec<Vec<u8>>, TransportError>;
}
