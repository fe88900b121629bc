// SPDX-FileCopyrightText: 2026 Deaddrop Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Bulletin Client
//!
//! Wraps any [`BulletinApi`] with the retry policy: configurable attempts,
//! exponential backoff, per-attempt timeout (enforced inside the API
//! implementation). On exhaustion the call returns
//! [`TransportError::Exhausted`] — callers never crash on transport failure,
//! they defer to the next sync cycle.

use std::time::Duration;

use tracing::debug;

use crate::engine::Seeker;

use super::api::{BoardEntry, BulletinApi};
use super::error::TransportError;

/// Retry policy for bulletin-store calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per call (first try included).
    pub attempts: u32,
    /// Backoff unit: the wait after attempt `n` is `base * 2^n` (so 2s, 4s
    /// with the 1s default).
    pub backoff_base: Duration,
    /// Per-attempt request timeout.
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempts: 3,
            backoff_base: Duration::from_secs(1),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Wait before retrying after the `attempt`-th failure (1-based).
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(attempt)
    }
}

/// Retrying client over a raw bulletin API.
pub struct BulletinClient<T: BulletinApi> {
    api: T,
    policy: RetryPolicy,
}

impl<T: BulletinApi> BulletinClient<T> {
    pub fn new(api: T, policy: RetryPolicy) -> Self {
        BulletinClient { api, policy }
    }

    /// Access to the wrapped API (used by tests to reach mock controls).
    pub fn api(&self) -> &T {
        &self.api
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Batched fetch of all stored values for the given seekers.
    pub fn fetch_messages(&self, seekers: &[Seeker]) -> Result<Vec<BoardEntry>, TransportError> {
        self.with_retry("fetch_messages", || self.api.fetch_messages(seekers))
    }

    /// At-least-once message write; duplicate broadcasts are harmless.
    pub fn send_message(&self, seeker: &Seeker, ciphertext: &[u8]) -> Result<(), TransportError> {
        self.with_retry("send_message", || self.api.post_message(seeker, ciphertext))
    }

    /// Broadcasts an announcement; returns the store's sequence counter.
    pub fn send_announcement(&self, payload: &[u8]) -> Result<String, TransportError> {
        self.with_retry("send_announcement", || self.api.post_announcement(payload))
    }

    /// Fetches the full announcement history.
    pub fn fetch_announcements(&self) -> Result<Vec<Vec<u8>>, TransportError> {
        self.with_retry("fetch_announcements", || self.api.fetch_announcements())
    }

    // Retries uniformly on every error kind, including 4xx-equivalent
    // `Status` failures. Kept as observed upstream; review before changing.
    fn with_retry<R>(
        &self,
        op: &str,
        call: impl Fn() -> Result<R, TransportError>,
    ) -> Result<R, TransportError> {
        let mut last: Option<TransportError> = None;

        for attempt in 1..=self.policy.attempts.max(1) {
            match call() {
                Ok(value) => return Ok(value),
                Err(e) => {
                    debug!(op, attempt, error = %e, "bulletin call failed");
                    last = Some(e);
                    if attempt < self.policy.attempts {
                        std::thread::sleep(self.policy.backoff_after(attempt));
                    }
                }
            }
        }

        Err(TransportError::Exhausted {
            attempts: self.policy.attempts,
            last: last
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempts made".into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::super::memory::MemoryBulletin;
    use super::*;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            backoff_base: Duration::from_millis(10),
            request_timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn succeeds_on_third_attempt_with_backoff() {
        let bulletin = MemoryBulletin::new();
        bulletin.post_announcement(b"hello").unwrap();
        bulletin.inject_failures(2);

        let client = BulletinClient::new(bulletin, fast_policy());
        let started = Instant::now();
        let history = client.fetch_announcements().unwrap();
        let elapsed = started.elapsed();

        assert_eq!(history, vec![b"hello".to_vec()]);
        // Waits: base*2 + base*4 = 60ms with a 10ms base.
        assert!(elapsed >= Duration::from_millis(60), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(600), "elapsed {:?}", elapsed);
    }

    #[test]
    fn exhaustion_returns_structured_failure() {
        let bulletin = MemoryBulletin::new();
        bulletin.inject_failures(3);

        let client = BulletinClient::new(bulletin, fast_policy());
        let err = client.fetch_announcements().unwrap_err();

        match err {
            TransportError::Exhausted { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected Exhausted, got {:?}", other),
        }
    }

    #[test]
    fn send_then_fetch_round_trip() {
        let client = BulletinClient::new(MemoryBulletin::new(), fast_policy());
        let seeker = Seeker::new(b"seeker-1".to_vec());

        client.send_message(&seeker, b"ct").unwrap();
        let entries = client.fetch_messages(&[seeker]).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].ciphertext, b"ct");
    }

    #[test]
    fn backoff_grows_exponentially() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_after(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_after(2), Duration::from_secs(4));
    }
}
