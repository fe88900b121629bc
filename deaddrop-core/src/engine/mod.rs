// SPDX-FileCopyrightText: 2026 Deaddrop Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Session Engine Interface
//!
//! The Session Engine is the external cryptographic subsystem that owns all
//! key material, announcement production/consumption and message board
//! encryption. This crate never implements the primitives; it consumes a
//! conforming engine through the [`SessionEngine`] trait and treats it as
//! authoritative for "does a session with this peer exist".
//!
//! Engines are synchronous and not safe under concurrent mutation for a
//! single account, which the crate enforces by owning each engine behind
//! `&mut` inside the account context.

mod mock;

pub use mock::MockSessionEngine;

use std::fmt;

use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// An opaque, rotating lookup key addressing one encrypted message on the
/// bulletin store. Only the Session Engine interprets seekers; everything
/// else moves them around as bytes.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Seeker(Vec<u8>);

impl Seeker {
    pub fn new(bytes: Vec<u8>) -> Self {
        Seeker(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Seeker {
    fn from(bytes: Vec<u8>) -> Self {
        Seeker(bytes)
    }
}

impl fmt::Debug for Seeker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Truncated hex keeps logs readable without leaking the full key.
        let shown = &self.0[..self.0.len().min(8)];
        write!(f, "Seeker({}…)", hex::encode(shown))
    }
}

/// The account's own key material, passed through to the engine.
///
/// The bytes are opaque to this crate. The secret half is wiped from memory
/// on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyRing {
    #[zeroize(skip)]
    public: Vec<u8>,
    secret: Vec<u8>,
}

impl KeyRing {
    pub fn new(public: Vec<u8>, secret: Vec<u8>) -> Self {
        KeyRing { public, secret }
    }

    pub fn public(&self) -> &[u8] {
        &self.public
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRing")
            .field("public", &hex::encode(&self.public))
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Result of the engine consuming an announcement that was addressed to us.
#[derive(Debug, Clone)]
pub struct SessionUpdate {
    /// The engine's identifier for the announcing peer.
    pub peer_id: String,
    /// The peer's public key material, for contact bootstrap.
    pub peer_public_keys: Vec<u8>,
    /// Optional human-readable text carried in the announcement.
    pub greeting: Option<String>,
}

/// A message the engine decrypted from a message-board read.
#[derive(Debug, Clone)]
pub struct DecryptedMessage {
    /// The engine's identifier for the sending peer.
    pub peer_id: String,
    /// Plaintext content.
    pub content: String,
    /// Sender-claimed unix timestamp (seconds).
    pub timestamp: u64,
    /// The rotated seeker under which the peer's next message will arrive.
    pub next_seeker: Seeker,
}

/// An encrypted outgoing message, ready for the bulletin store.
#[derive(Debug, Clone)]
pub struct OutboundEnvelope {
    pub seeker: Seeker,
    pub ciphertext: Vec<u8>,
}

/// Engine-side view of a peer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerSessionStatus {
    /// No session state for this peer.
    Unknown,
    /// Handshake announced, not yet confirmed by the peer.
    Pending,
    /// Session established; messages can be sent.
    Active,
}

/// Errors surfaced by engine operations that are not a plain "not for us".
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("unknown peer: {0}")]
    UnknownPeer(String),

    #[error("engine rejected operation: {0}")]
    Rejected(String),
}

/// Contract consumed from the external cryptographic engine.
///
/// All correctness properties (forward secrecy, authentication, replay
/// rejection) belong to the implementation behind this trait. `None`
/// returns from the `feed_*` operations are not errors: they mean "not
/// addressed to us", "already consumed" or "no active session", and callers
/// skip them silently.
pub trait SessionEngine: Send {
    /// Produces the encrypted announcement that opens a session towards a
    /// peer identified by its public key material.
    fn establish_outgoing_session(
        &mut self,
        peer_public_keys: &[u8],
        keys: &KeyRing,
        seeker_prefix: &[u8],
    ) -> Result<Vec<u8>, EngineError>;

    /// Attempts to consume a broadcast announcement. Returns `None` when the
    /// announcement is not addressed to this account or was already
    /// processed.
    fn feed_incoming_announcement(
        &mut self,
        announcement: &[u8],
        keys: &KeyRing,
    ) -> Option<SessionUpdate>;

    /// Encrypts a message for a peer. Returns `None` when no active session
    /// exists.
    fn send_message(&mut self, peer_id: &str, message: &str) -> Option<OutboundEnvelope>;

    /// Attempts to decrypt a fetched message-board entry. Returns `None`
    /// when the seeker is not ours or was already consumed.
    fn feed_incoming_board_read(
        &mut self,
        seeker: &Seeker,
        ciphertext: &[u8],
        keys: &KeyRing,
    ) -> Option<DecryptedMessage>;

    /// The set of seekers under which messages addressed to this account may
    /// currently be waiting.
    fn message_board_read_keys(&self) -> Vec<Seeker>;

    /// Identifiers of every peer the engine holds session state for.
    fn peer_list(&self) -> Vec<String>;

    /// Authoritative session status for one peer.
    fn peer_session_status(&self, peer_id: &str) -> PeerSessionStatus;

    /// Drops all session state for a peer.
    fn peer_discard(&mut self, peer_id: &str);

    /// Keep-alive: rotates internal state and returns any additional seekers
    /// that should be polled this cycle.
    fn refresh(&mut self) -> Vec<Seeker>;
}
