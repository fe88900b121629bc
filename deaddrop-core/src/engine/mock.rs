// SPDX-FileCopyrightText: 2026 Deaddrop Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Deterministic in-memory Session Engine for tests.
//!
//! Two `MockSessionEngine` instances derive identical seeker sequences from
//! the pair of public keys involved, so a full announce/accept/message
//! round-trip can be exercised without any real cryptography. "Encryption"
//! is plain JSON; opacity is irrelevant here, the engine contract is what is
//! under test.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{
    DecryptedMessage, EngineError, KeyRing, OutboundEnvelope, PeerSessionStatus, Seeker,
    SessionEngine, SessionUpdate,
};

#[derive(Serialize, Deserialize)]
struct MockAnnouncement {
    from_id: String,
    from_public: Vec<u8>,
    to_public: Vec<u8>,
    seeker_prefix: Vec<u8>,
    greeting: Option<String>,
    nonce: u64,
}

#[derive(Serialize, Deserialize)]
struct MockCiphertext {
    content: String,
    timestamp: u64,
}

struct MockPeer {
    public: Vec<u8>,
    seeker_prefix: Vec<u8>,
    status: PeerSessionStatus,
    initiated_by_us: bool,
    send_counter: u64,
    recv_counter: u64,
}

/// Pairable mock engine. Peer identifiers are the hex encoding of the peer's
/// public key bytes.
pub struct MockSessionEngine {
    self_public: Vec<u8>,
    peers: HashMap<String, MockPeer>,
    consumed: HashSet<Seeker>,
    seen_announcements: HashSet<Vec<u8>>,
    announce_nonce: u64,
    greeting: Option<String>,
}

impl MockSessionEngine {
    pub fn new(self_public: &[u8]) -> Self {
        MockSessionEngine {
            self_public: self_public.to_vec(),
            peers: HashMap::new(),
            consumed: HashSet::new(),
            seen_announcements: HashSet::new(),
            announce_nonce: 0,
            greeting: None,
        }
    }

    /// Sets the human-readable text carried by subsequent announcements.
    pub fn set_greeting(&mut self, greeting: Option<String>) {
        self.greeting = greeting;
    }

    fn derive_seeker(prefix: &[u8], from: &[u8], to: &[u8], counter: u64) -> Seeker {
        let tag = format!(
            "{}|{}>{}|{}",
            hex::encode(prefix),
            hex::encode(from),
            hex::encode(to),
            counter
        );
        Seeker::new(tag.into_bytes())
    }

    fn read_seeker(&self, peer: &MockPeer) -> Seeker {
        Self::derive_seeker(
            &peer.seeker_prefix,
            &peer.public,
            &self.self_public,
            peer.recv_counter,
        )
    }

    fn now() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

impl SessionEngine for MockSessionEngine {
    fn establish_outgoing_session(
        &mut self,
        peer_public_keys: &[u8],
        _keys: &KeyRing,
        seeker_prefix: &[u8],
    ) -> Result<Vec<u8>, EngineError> {
        if peer_public_keys.is_empty() {
            return Err(EngineError::Rejected("empty peer key material".into()));
        }

        let peer_id = hex::encode(peer_public_keys);
        self.announce_nonce += 1;

        // Re-establishing resets counters: a fresh announcement starts a
        // fresh seeker sequence on both sides.
        self.peers.insert(
            peer_id,
            MockPeer {
                public: peer_public_keys.to_vec(),
                seeker_prefix: seeker_prefix.to_vec(),
                status: PeerSessionStatus::Pending,
                initiated_by_us: true,
                send_counter: 0,
                recv_counter: 0,
            },
        );

        let announcement = MockAnnouncement {
            from_id: hex::encode(&self.self_public),
            from_public: self.self_public.clone(),
            to_public: peer_public_keys.to_vec(),
            seeker_prefix: seeker_prefix.to_vec(),
            greeting: self.greeting.clone(),
            nonce: self.announce_nonce,
        };
        serde_json::to_vec(&announcement)
            .map_err(|e| EngineError::Rejected(format!("announcement encode: {}", e)))
    }

    fn feed_incoming_announcement(
        &mut self,
        announcement: &[u8],
        keys: &KeyRing,
    ) -> Option<SessionUpdate> {
        let parsed: MockAnnouncement = serde_json::from_slice(announcement).ok()?;
        if parsed.to_public != keys.public() {
            return None; // Not addressed to us.
        }
        if !self.seen_announcements.insert(announcement.to_vec()) {
            return None; // Replay.
        }

        let peer_id = hex::encode(&parsed.from_public);
        self.peers.insert(
            peer_id.clone(),
            MockPeer {
                public: parsed.from_public.clone(),
                seeker_prefix: parsed.seeker_prefix,
                status: PeerSessionStatus::Active,
                initiated_by_us: false,
                send_counter: 0,
                recv_counter: 0,
            },
        );

        Some(SessionUpdate {
            peer_id,
            peer_public_keys: parsed.from_public,
            greeting: parsed.greeting,
        })
    }

    fn send_message(&mut self, peer_id: &str, message: &str) -> Option<OutboundEnvelope> {
        let self_public = self.self_public.clone();
        let peer = self.peers.get_mut(peer_id)?;
        if peer.status != PeerSessionStatus::Active {
            return None;
        }

        let seeker = Self::derive_seeker(
            &peer.seeker_prefix,
            &self_public,
            &peer.public,
            peer.send_counter,
        );
        peer.send_counter += 1;

        let ciphertext = serde_json::to_vec(&MockCiphertext {
            content: message.to_string(),
            timestamp: Self::now(),
        })
        .ok()?;

        Some(OutboundEnvelope { seeker, ciphertext })
    }

    fn feed_incoming_board_read(
        &mut self,
        seeker: &Seeker,
        ciphertext: &[u8],
        _keys: &KeyRing,
    ) -> Option<DecryptedMessage> {
        if self.consumed.contains(seeker) {
            return None;
        }

        let matching_id = self
            .peers
            .iter()
            .find(|(_, peer)| &self.read_seeker(peer) == seeker)
            .map(|(id, _)| id.clone())?;

        let parsed: MockCiphertext = serde_json::from_slice(ciphertext).ok()?;
        self.consumed.insert(seeker.clone());

        let self_public = self.self_public.clone();
        let peer = self.peers.get_mut(&matching_id)?;
        peer.recv_counter += 1;
        // First message back from the peer confirms the handshake.
        if peer.initiated_by_us && peer.status == PeerSessionStatus::Pending {
            peer.status = PeerSessionStatus::Active;
        }

        let next_seeker = Self::derive_seeker(
            &peer.seeker_prefix,
            &peer.public,
            &self_public,
            peer.recv_counter,
        );

        Some(DecryptedMessage {
            peer_id: matching_id,
            content: parsed.content,
            timestamp: parsed.timestamp,
            next_seeker,
        })
    }

    fn message_board_read_keys(&self) -> Vec<Seeker> {
        self.peers.values().map(|p| self.read_seeker(p)).collect()
    }

    fn peer_list(&self) -> Vec<String> {
        self.peers.keys().cloned().collect()
    }

    fn peer_session_status(&self, peer_id: &str) -> PeerSessionStatus {
        self.peers
            .get(peer_id)
            .map(|p| p.status)
            .unwrap_or(PeerSessionStatus::Unknown)
    }

    fn peer_discard(&mut self, peer_id: &str) {
        self.peers.remove(peer_id);
    }

    fn refresh(&mut self) -> Vec<Seeker> {
        // Nothing rotates in the mock; the current read keys double as the
        // keep-alive set.
        self.message_board_read_keys()
    }
}
