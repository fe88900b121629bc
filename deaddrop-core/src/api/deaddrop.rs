// SPDX-FileCopyrightText: 2026 Deaddrop Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! High-level Deaddrop API.
//!
//! Coordinates storage, the bulletin client, the injected Session Engine
//! and event handling behind a facade. One `Deaddrop` value serves one
//! logged-in account at a time; `login` creates the session context and
//! `logout` (or a second `login`) tears it down.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::engine::{KeyRing, SessionEngine};
use crate::lifecycle::DiscussionController;
use crate::model::{Contact, Discussion, Message};
use crate::storage::Storage;
use crate::sync::{SyncReport, SyncScheduler, SyncTrigger};
use crate::transport::{BulletinApi, BulletinClient};

use super::account::AccountContext;
use super::config::{DeaddropConfig, StorageLocation};
use super::error::{DeaddropError, DeaddropResult};
use super::events::{EventDispatcher, EventHandler};

/// Deaddrop facade over one local database and one bulletin store.
pub struct Deaddrop<T: BulletinApi> {
    storage: Storage,
    client: BulletinClient<T>,
    events: EventDispatcher,
    config: DeaddropConfig,
    account: Option<AccountContext>,
}

impl<T: BulletinApi> Deaddrop<T> {
    /// Creates a Deaddrop instance over a custom bulletin API.
    pub fn new(config: DeaddropConfig, api: T) -> DeaddropResult<Self> {
        let storage = match &config.storage {
            StorageLocation::Path(path) => Storage::open(path)?,
            StorageLocation::InMemory => Storage::in_memory()?,
        };
        let client = BulletinClient::new(api, config.retry.clone());

        Ok(Deaddrop {
            storage,
            client,
            events: EventDispatcher::new(),
            config,
            account: None,
        })
    }

    /// Registers an event handler.
    pub fn add_event_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.events.add_handler(handler);
    }

    // === Session Context ===

    /// Logs an account in, creating its session context. Logging in while
    /// another account is active tears the previous context down first
    /// (account switch).
    pub fn login(
        &mut self,
        owner_user_id: &str,
        keys: KeyRing,
        engine: Box<dyn SessionEngine>,
        seeker_prefix: Vec<u8>,
    ) {
        self.account = Some(AccountContext::new(
            owner_user_id,
            keys,
            engine,
            seeker_prefix,
        ));
    }

    /// Tears the session context down.
    pub fn logout(&mut self) {
        self.account = None;
    }

    pub fn is_logged_in(&self) -> bool {
        self.account.is_some()
    }

    pub fn owner_user_id(&self) -> Option<&str> {
        self.account.as_ref().map(|a| a.owner_user_id())
    }

    fn owner(&self) -> DeaddropResult<&str> {
        self.account
            .as_ref()
            .map(|a| a.owner_user_id())
            .ok_or(DeaddropError::NotLoggedIn)
    }

    // === Reads (owner-filtered snapshots) ===

    pub fn list_contacts(&self) -> DeaddropResult<Vec<Contact>> {
        Ok(self.storage.list_contacts(self.owner()?)?)
    }

    pub fn get_contact(&self, contact_user_id: &str) -> DeaddropResult<Option<Contact>> {
        Ok(self.storage.get_contact(self.owner()?, contact_user_id)?)
    }

    pub fn list_discussions(&self) -> DeaddropResult<Vec<Discussion>> {
        Ok(self.storage.list_discussions(self.owner()?)?)
    }

    pub fn get_discussion(&self, contact_user_id: &str) -> DeaddropResult<Option<Discussion>> {
        Ok(self.storage.get_discussion(self.owner()?, contact_user_id)?)
    }

    pub fn list_messages(&self, contact_user_id: &str) -> DeaddropResult<Vec<Message>> {
        Ok(self.storage.list_messages(self.owner()?, contact_user_id)?)
    }

    // === Lifecycle Operations ===

    pub fn create_contact(
        &mut self,
        user_id: &str,
        name: &str,
        public_keys: Vec<u8>,
    ) -> DeaddropResult<Contact> {
        let mut controller = self.controller()?;
        controller.create_contact(user_id, name, public_keys)
    }

    pub fn start_discussion(&mut self, contact_user_id: &str) -> DeaddropResult<Discussion> {
        let mut controller = self.controller()?;
        controller.start_discussion(contact_user_id)
    }

    /// Accepts a pending discussion and, per configuration, triggers an
    /// immediate poll for messages the peer may already have posted.
    pub fn accept_discussion(
        &mut self,
        contact_user_id: &str,
        rename: Option<&str>,
    ) -> DeaddropResult<Discussion> {
        let discussion = self.controller()?.accept(contact_user_id, rename)?;

        if self.config.sync.poll_after_accept {
            if let Err(e) = self.sync(SyncTrigger::ManualRefresh) {
                warn!(error = %e, "post-accept poll failed");
            }
        }
        Ok(discussion)
    }

    pub fn refuse_discussion(
        &mut self,
        contact_user_id: &str,
        confirmed: bool,
    ) -> DeaddropResult<()> {
        self.controller()?.refuse(contact_user_id, confirmed)
    }

    pub fn send_message(
        &mut self,
        contact_user_id: &str,
        content: &str,
    ) -> DeaddropResult<Message> {
        self.controller()?.send_message(contact_user_id, content)
    }

    pub fn mark_read(&mut self, contact_user_id: &str) -> DeaddropResult<()> {
        self.controller()?.mark_read(contact_user_id)
    }

    // === Synchronization ===

    /// Runs one sync cycle for the logged-in account. The embedder drives
    /// the triggers (its own timer, foreground transitions, user refresh);
    /// a foreground trigger is ignored when `sync_on_foreground` is off.
    pub fn sync(&mut self, trigger: SyncTrigger) -> DeaddropResult<SyncReport> {
        if trigger == SyncTrigger::Foreground && !self.config.sync.sync_on_foreground {
            debug!("foreground sync disabled, trigger ignored");
            return Ok(SyncReport::default());
        }
        let storage = &self.storage;
        let client = &self.client;
        let events = &self.events;
        let ctx = self.account.as_mut().ok_or(DeaddropError::NotLoggedIn)?;
        SyncScheduler::new(storage, client, ctx, events).run_cycle(trigger)
    }

    // === Accessors ===

    pub fn client(&self) -> &BulletinClient<T> {
        &self.client
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn config(&self) -> &DeaddropConfig {
        &self.config
    }

    fn controller(&mut self) -> DeaddropResult<DiscussionController<'_, T>> {
        let storage = &self.storage;
        let client = &self.client;
        let events = &self.events;
        let ctx = self.account.as_mut().ok_or(DeaddropError::NotLoggedIn)?;
        Ok(DiscussionController::new(storage, client, ctx, events))
    }
}

#[cfg(feature = "network")]
impl Deaddrop<crate::transport::HttpBulletinApi> {
    /// Creates a Deaddrop instance over the HTTP bulletin store named in
    /// the configuration.
    pub fn with_http(config: DeaddropConfig) -> DeaddropResult<Self> {
        let base_url = config.base_url.clone().ok_or_else(|| {
            DeaddropError::InvalidState("base_url required for the HTTP transport".into())
        })?;
        let api = crate::transport::HttpBulletinApi::new(&base_url, &config.retry)?;
        Self::new(config, api)
    }
}
