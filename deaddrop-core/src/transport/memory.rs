// SPDX-FileCopyrightText: 2026 Deaddrop Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! In-memory bulletin store.
//!
//! A cloneable handle onto a shared append-only store. Used by tests (with
//! failure injection to exercise the retry policy) and usable as a loopback
//! transport: two accounts handed clones of the same `MemoryBulletin` can
//! exchange messages in-process.

use std::sync::{Arc, Mutex};

use crate::clock;
use crate::engine::Seeker;

use super::api::{BoardEntry, BulletinApi};
use super::error::TransportError;

struct BoardRecord {
    seeker: Vec<u8>,
    value: Vec<u8>,
    posted_at: u64,
}

#[derive(Default)]
struct Inner {
    board: Vec<BoardRecord>,
    announcements: Vec<Vec<u8>>,
    /// Number of upcoming calls that fail with an injected connection error.
    pending_failures: u32,
    fetch_message_calls: u32,
    post_message_calls: u32,
    post_announcement_calls: u32,
    fetch_announcement_calls: u32,
}

impl Inner {
    fn maybe_fail(&mut self) -> Result<(), TransportError> {
        if self.pending_failures > 0 {
            self.pending_failures -= 1;
            return Err(TransportError::Connection("injected failure".into()));
        }
        Ok(())
    }
}

/// Shared in-memory implementation of [`BulletinApi`].
#[derive(Clone, Default)]
pub struct MemoryBulletin {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryBulletin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` calls (any operation) fail.
    pub fn inject_failures(&self, count: u32) {
        self.lock().pending_failures = count;
    }

    /// Total entries ever written to the message board.
    pub fn board_len(&self) -> usize {
        self.lock().board.len()
    }

    /// Total announcements ever broadcast.
    pub fn announcement_len(&self) -> usize {
        self.lock().announcements.len()
    }

    /// How many times `post_message` was invoked (including failed calls).
    pub fn post_message_calls(&self) -> u32 {
        self.lock().post_message_calls
    }

    /// How many times `fetch_messages` was invoked (including failed calls).
    pub fn fetch_message_calls(&self) -> u32 {
        self.lock().fetch_message_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl BulletinApi for MemoryBulletin {
    fn fetch_messages(&self, seekers: &[Seeker]) -> Result<Vec<BoardEntry>, TransportError> {
        let mut inner = self.lock();
        inner.fetch_message_calls += 1;
        inner.maybe_fail()?;

        let fetched_at = clock::now_secs();
        Ok(inner
            .board
            .iter()
            .filter(|record| seekers.iter().any(|s| s.as_bytes() == record.seeker))
            .map(|record| BoardEntry {
                seeker: Seeker::new(record.seeker.clone()),
                ciphertext: record.value.clone(),
                fetched_at: fetched_at.max(record.posted_at),
            })
            .collect())
    }

    fn post_message(&self, seeker: &Seeker, ciphertext: &[u8]) -> Result<(), TransportError> {
        let mut inner = self.lock();
        inner.post_message_calls += 1;
        inner.maybe_fail()?;

        // Append-only: duplicates are stored as-is, consumers dedup.
        inner.board.push(BoardRecord {
            seeker: seeker.as_bytes().to_vec(),
            value: ciphertext.to_vec(),
            posted_at: clock::now_secs(),
        });
        Ok(())
    }

    fn post_announcement(&self, payload: &[u8]) -> Result<String, TransportError> {
        let mut inner = self.lock();
        inner.post_announcement_calls += 1;
        inner.maybe_fail()?;

        inner.announcements.push(payload.to_vec());
        Ok(inner.announcements.len().to_string())
    }

    fn fetch_announcements(&self) -> Result<Vec<Vec<u8>>, TransportError> {
        let mut inner = self.lock();
        inner.fetch_announcement_calls += 1;
        inner.maybe_fail()?;

        Ok(inner.announcements.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_returns_exactly_what_was_stored() {
        let bulletin = MemoryBulletin::new();
        let seeker = Seeker::new(b"abc".to_vec());

        bulletin.post_message(&seeker, b"ciphertext").unwrap();
        let entries = bulletin.fetch_messages(&[seeker.clone()]).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].seeker, seeker);
        assert_eq!(entries[0].ciphertext, b"ciphertext");
    }

    #[test]
    fn fetch_filters_by_seeker() {
        let bulletin = MemoryBulletin::new();
        bulletin
            .post_message(&Seeker::new(b"a".to_vec()), b"one")
            .unwrap();
        bulletin
            .post_message(&Seeker::new(b"b".to_vec()), b"two")
            .unwrap();

        let entries = bulletin
            .fetch_messages(&[Seeker::new(b"b".to_vec())])
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].ciphertext, b"two");
    }

    #[test]
    fn announcement_counter_is_sequential() {
        let bulletin = MemoryBulletin::new();
        assert_eq!(bulletin.post_announcement(b"x").unwrap(), "1");
        assert_eq!(bulletin.post_announcement(b"y").unwrap(), "2");
        assert_eq!(bulletin.fetch_announcements().unwrap().len(), 2);
    }

    #[test]
    fn injected_failures_fail_then_recover() {
        let bulletin = MemoryBulletin::new();
        bulletin.inject_failures(1);
        assert!(bulletin.fetch_announcements().is_err());
        assert!(bulletin.fetch_announcements().is_ok());
    }
}
