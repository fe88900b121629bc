// SPDX-FileCopyrightText: 2026 Deaddrop Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Account session context.
//!
//! Explicit, lifecycle-scoped state for the logged-in account: created on
//! login, torn down on logout or account switch. Replaces any notion of an
//! ambient "selected account" global. Owning the engine behind `&mut` also
//! serializes all engine mutation for the account, which the engine
//! requires.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::engine::{KeyRing, SessionEngine};

/// Per-account session context.
pub struct AccountContext {
    owner_user_id: String,
    keys: KeyRing,
    engine: Box<dyn SessionEngine>,
    seeker_prefix: Vec<u8>,
    /// At-most-one in-flight sync cycle per account: a trigger arriving
    /// while this is set is coalesced, not queued.
    sync_running: Arc<AtomicBool>,
}

impl AccountContext {
    pub fn new(
        owner_user_id: &str,
        keys: KeyRing,
        engine: Box<dyn SessionEngine>,
        seeker_prefix: Vec<u8>,
    ) -> Self {
        AccountContext {
            owner_user_id: owner_user_id.to_string(),
            keys,
            engine,
            seeker_prefix,
            sync_running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn owner_user_id(&self) -> &str {
        &self.owner_user_id
    }

    pub fn keys(&self) -> &KeyRing {
        &self.keys
    }

    pub fn seeker_prefix(&self) -> &[u8] {
        &self.seeker_prefix
    }

    pub fn engine(&self) -> &dyn SessionEngine {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> &mut dyn SessionEngine {
        self.engine.as_mut()
    }

    /// Split borrow: engine mutation often needs the keys alongside.
    pub fn engine_and_keys(&mut self) -> (&mut dyn SessionEngine, &KeyRing) {
        (self.engine.as_mut(), &self.keys)
    }

    pub(crate) fn sync_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.sync_running)
    }
}
