// SPDX-FileCopyrightText: 2026 Deaddrop Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Common Test Utilities
//!
//! Paired in-process accounts over one shared in-memory bulletin store, so
//! full announce/accept/message flows run without a network or real
//! cryptography.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use deaddrop_core::{
    CallbackHandler, Deaddrop, DeaddropConfig, DeaddropEvent, KeyRing, MemoryBulletin,
    MockSessionEngine, RetryPolicy,
};

/// Retry policy with millisecond backoff so failure-path tests stay fast.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        attempts: 2,
        backoff_base: Duration::from_millis(1),
        request_timeout: Duration::from_secs(1),
    }
}

pub fn test_config() -> DeaddropConfig {
    DeaddropConfig {
        retry: fast_retry(),
        ..DeaddropConfig::default()
    }
}

/// A logged-in account over a shared bulletin store, with captured events.
pub struct TestAccount {
    pub deaddrop: Deaddrop<MemoryBulletin>,
    pub keys: KeyRing,
    pub user_id: String,
    pub events: Arc<Mutex<Vec<DeaddropEvent>>>,
}

impl TestAccount {
    /// Adds the other account as a contact under the given display name.
    pub fn add_contact(&mut self, other: &TestAccount, name: &str) {
        self.deaddrop
            .create_contact(&other.user_id, name, other.keys.public().to_vec())
            .unwrap();
    }

    pub fn event_count(&self, pred: impl Fn(&DeaddropEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }
}

pub fn make_account(tag: u8, bulletin: &MemoryBulletin) -> TestAccount {
    make_account_with_greeting(tag, bulletin, None)
}

pub fn make_account_with_greeting(
    tag: u8,
    bulletin: &MemoryBulletin,
    greeting: Option<&str>,
) -> TestAccount {
    let keys = KeyRing::new(vec![tag; 8], vec![tag ^ 0xff; 8]);
    let user_id = hex::encode(keys.public());

    let mut engine = MockSessionEngine::new(keys.public());
    engine.set_greeting(greeting.map(str::to_string));

    let mut deaddrop = Deaddrop::new(test_config(), bulletin.clone()).unwrap();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    deaddrop.add_event_handler(Arc::new(CallbackHandler::new(move |event| {
        sink.lock().unwrap().push(event);
    })));
    deaddrop.login(&user_id, keys.clone(), Box::new(engine), b"dd1".to_vec());

    TestAccount {
        deaddrop,
        keys,
        user_id,
        events,
    }
}

/// Two accounts that already know each other as contacts.
pub fn paired_accounts() -> (TestAccount, TestAccount, MemoryBulletin) {
    let bulletin = MemoryBulletin::new();
    let mut alice = make_account(1, &bulletin);
    let mut bob = make_account(2, &bulletin);
    alice.add_contact(&bob, "Bob");
    bob.add_contact(&alice, "Alice");
    (alice, bob, bulletin)
}
