// SPDX-FileCopyrightText: 2026 Deaddrop Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Synchronization Scheduler
//!
//! Runs the periodic/foreground-triggered sync cycle for one account:
//! re-broadcast deferred writes, consume new announcements, poll the
//! message board under the engine's read keys, and self-heal any drift
//! between discussion rows and the engine's authoritative session state.
//!
//! At most one cycle is in flight per account: a trigger arriving while a
//! cycle runs is coalesced (flag-checked), never queued or run
//! concurrently. Transport failures mark the report deferred; they never
//! propagate as panics.

use std::collections::BTreeSet;
use std::sync::atomic::Ordering;
use std::sync::{atomic::AtomicBool, Arc};

use tracing::{debug, warn};

use crate::api::{AccountContext, DeaddropEvent, DeaddropResult, EventDispatcher};
use crate::clock;
use crate::lifecycle::merge_announcement;
use crate::model::{DiscussionDirection, DiscussionStatus, Message, MessageStatus};
use crate::engine::PeerSessionStatus;
use crate::storage::Storage;
use crate::transport::{BulletinApi, BulletinClient};

/// What woke the scheduler up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    /// App moved to the foreground.
    Foreground,
    /// Explicit user refresh (including the post-accept poll).
    ManualRefresh,
    /// Periodic timer.
    Timer,
}

/// Outcome of one sync cycle.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// The trigger was coalesced into an already-running cycle.
    pub coalesced: bool,
    /// Announcements re-broadcast from earlier deferred writes.
    pub announcements_rebroadcast: usize,
    /// Outbound envelopes flushed from the queue.
    pub envelopes_flushed: usize,
    /// New bulletin entries examined this cycle.
    pub announcements_seen: usize,
    /// Pending/received discussions merged.
    pub discussions_merged: usize,
    /// Incoming messages persisted.
    pub messages_persisted: usize,
    /// Discussion rows re-derived from engine state.
    pub healed: usize,
    /// At least one transport call exhausted its retries; the skipped work
    /// waits for the next cycle.
    pub deferred: bool,
    /// Human-readable error notes, per failed step.
    pub errors: Vec<String>,
}

/// Drives sync cycles for one account.
pub struct SyncScheduler<'a, T: BulletinApi> {
    storage: &'a Storage,
    client: &'a BulletinClient<T>,
    ctx: &'a mut AccountContext,
    events: &'a EventDispatcher,
}

/// Clears the in-flight flag even when a cycle errors out.
struct FlagGuard(Arc<AtomicBool>);

impl Drop for FlagGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<'a, T: BulletinApi> SyncScheduler<'a, T> {
    pub fn new(
        storage: &'a Storage,
        client: &'a BulletinClient<T>,
        ctx: &'a mut AccountContext,
        events: &'a EventDispatcher,
    ) -> Self {
        SyncScheduler {
            storage,
            client,
            ctx,
            events,
        }
    }

    /// Runs one sync cycle. Returns a coalesced report when a cycle is
    /// already in flight for this account.
    pub fn run_cycle(&mut self, trigger: SyncTrigger) -> DeaddropResult<SyncReport> {
        let flag = self.ctx.sync_flag();
        if flag.swap(true, Ordering::SeqCst) {
            debug!(?trigger, "sync trigger coalesced");
            return Ok(SyncReport {
                coalesced: true,
                ..SyncReport::default()
            });
        }
        let _guard = FlagGuard(flag);

        debug!(?trigger, owner = self.ctx.owner_user_id(), "sync cycle start");
        let mut report = SyncReport::default();

        self.rebroadcast_announcements(&mut report)?;
        self.flush_outbound(&mut report)?;
        self.consume_announcements(&mut report)?;
        self.poll_message_board(&mut report)?;
        self.heal_discussions(&mut report)?;

        if report.deferred {
            self.events.dispatch(DeaddropEvent::SyncDeferred {
                error: report.errors.join("; "),
            });
        } else {
            self.events.dispatch(DeaddropEvent::SyncCompleted {
                messages_persisted: report.messages_persisted,
                discussions_merged: report.discussions_merged,
            });
        }
        Ok(report)
    }

    /// Step 1: initiation announcements whose broadcast never succeeded.
    fn rebroadcast_announcements(&mut self, report: &mut SyncReport) -> DeaddropResult<()> {
        let owner = self.ctx.owner_user_id().to_string();
        for discussion in self.storage.list_unsent_announcements(&owner)? {
            let announcement = match &discussion.initiation_announcement {
                Some(bytes) => bytes,
                None => continue,
            };
            match self.client.send_announcement(announcement) {
                Ok(_) => {
                    self.storage.set_announcement_broadcast(
                        &owner,
                        &discussion.contact_user_id,
                        clock::now_secs(),
                    )?;
                    report.announcements_rebroadcast += 1;
                }
                Err(e) => {
                    report.deferred = true;
                    report.errors.push(format!("rebroadcast: {}", e));
                    return Ok(()); // Transport is down; later steps get their own chance.
                }
            }
        }
        Ok(())
    }

    /// Step 2: outbound envelopes parked by failed sends.
    fn flush_outbound(&mut self, report: &mut SyncReport) -> DeaddropResult<()> {
        let owner = self.ctx.owner_user_id().to_string();
        for item in self.storage.list_outbound(&owner)? {
            match self.client.send_message(&item.seeker, &item.ciphertext) {
                Ok(()) => {
                    self.storage.dequeue_outbound(&item.message_id)?;
                    self.storage
                        .set_message_status(&item.message_id, MessageStatus::Sent)?;
                    report.envelopes_flushed += 1;
                }
                Err(e) => {
                    report.deferred = true;
                    report.errors.push(format!("outbound flush: {}", e));
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// Step 3: fetch the announcement history past our cursor and merge
    /// every announcement the engine can decrypt. The cursor only advances
    /// after a successful fetch.
    fn consume_announcements(&mut self, report: &mut SyncReport) -> DeaddropResult<()> {
        let owner = self.ctx.owner_user_id().to_string();
        let history = match self.client.fetch_announcements() {
            Ok(history) => history,
            Err(e) => {
                report.deferred = true;
                report.errors.push(format!("fetch announcements: {}", e));
                return Ok(());
            }
        };

        let cursor = self.storage.announcement_cursor(&owner)? as usize;
        let total = history.len();
        let (engine, keys) = self.ctx.engine_and_keys();

        for announcement in history.into_iter().skip(cursor) {
            report.announcements_seen += 1;
            let update = match engine.feed_incoming_announcement(&announcement, keys) {
                Some(update) => update,
                None => continue, // Not for us, or a replay.
            };
            if merge_announcement(self.storage, self.events, &owner, &update)? {
                report.discussions_merged += 1;
            }
        }

        if total > cursor {
            self.storage.set_announcement_cursor(&owner, total as u64)?;
        }
        Ok(())
    }

    /// Step 4: poll the message board under the engine's read keys and
    /// persist every decrypted message exactly once.
    fn poll_message_board(&mut self, report: &mut SyncReport) -> DeaddropResult<()> {
        let owner = self.ctx.owner_user_id().to_string();

        let mut seekers: BTreeSet<_> = self.ctx.engine_mut().refresh().into_iter().collect();
        seekers.extend(self.ctx.engine().message_board_read_keys());
        if seekers.is_empty() {
            return Ok(());
        }
        let seekers: Vec<_> = seekers.into_iter().collect();

        let entries = match self.client.fetch_messages(&seekers) {
            Ok(entries) => entries,
            Err(e) => {
                report.deferred = true;
                report.errors.push(format!("fetch messages: {}", e));
                return Ok(());
            }
        };

        let now = clock::now_secs();
        for entry in entries {
            // Skip pairs an earlier cycle already persisted, before the
            // engine consumes the seeker.
            if self
                .storage
                .board_read_seen(&owner, &entry.seeker, &entry.ciphertext)?
            {
                continue;
            }

            let (engine, keys) = self.ctx.engine_and_keys();
            let decrypted =
                match engine.feed_incoming_board_read(&entry.seeker, &entry.ciphertext, keys) {
                    Some(decrypted) => decrypted,
                    None => continue, // Not addressed to us, or already consumed.
                };

            let message = Message::incoming(
                &owner,
                &decrypted.peer_id,
                &decrypted.content,
                decrypted.timestamp,
            );
            // Ledger row, message and the discussion/contact stamps commit
            // as one transaction; a failed persist ledgers nothing and the
            // entry is retried next cycle.
            if !self.storage.persist_board_read(
                &owner,
                &entry.seeker,
                &entry.ciphertext,
                &message,
                &decrypted.next_seeker,
                now,
            )? {
                continue;
            }
            report.messages_persisted += 1;

            self.events.dispatch(DeaddropEvent::MessageReceived {
                contact_user_id: decrypted.peer_id.clone(),
                message_id: message.id.clone(),
            });
        }
        Ok(())
    }

    /// Step 5: the engine is authoritative for session existence; re-derive
    /// any discussion row that contradicts it.
    fn heal_discussions(&mut self, report: &mut SyncReport) -> DeaddropResult<()> {
        let owner = self.ctx.owner_user_id().to_string();
        for discussion in self.storage.list_discussions(&owner)? {
            let engine_status = self
                .ctx
                .engine()
                .peer_session_status(&discussion.contact_user_id);

            match (discussion.status, discussion.direction, engine_status) {
                (DiscussionStatus::Active, _, PeerSessionStatus::Unknown) => {
                    warn!(
                        contact = %discussion.contact_user_id,
                        "state inconsistency: active discussion without engine session, closing"
                    );
                    self.storage
                        .close_discussion(&owner, &discussion.contact_user_id)?;
                    self.events.dispatch(DeaddropEvent::DiscussionClosed {
                        contact_user_id: discussion.contact_user_id.clone(),
                    });
                    report.healed += 1;
                }
                (
                    DiscussionStatus::Pending,
                    DiscussionDirection::Initiated,
                    PeerSessionStatus::Active,
                ) => {
                    // The peer confirmed the handshake.
                    self.storage.set_discussion_status(
                        &owner,
                        &discussion.contact_user_id,
                        DiscussionStatus::Active,
                    )?;
                    self.events.dispatch(DeaddropEvent::DiscussionActivated {
                        contact_user_id: discussion.contact_user_id.clone(),
                    });
                    report.healed += 1;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{KeyRing, MockSessionEngine};
    use crate::transport::{MemoryBulletin, RetryPolicy};

    fn context() -> AccountContext {
        let keys = KeyRing::new(vec![7; 4], vec![8; 4]);
        let engine = MockSessionEngine::new(keys.public());
        AccountContext::new("owner", keys, Box::new(engine), b"pfx".to_vec())
    }

    #[test]
    fn triggers_coalesce_while_a_cycle_is_in_flight() {
        let storage = Storage::in_memory().unwrap();
        let client = BulletinClient::new(MemoryBulletin::new(), RetryPolicy::default());
        let events = EventDispatcher::new();
        let mut ctx = context();

        ctx.sync_flag().store(true, Ordering::SeqCst);
        let report = SyncScheduler::new(&storage, &client, &mut ctx, &events)
            .run_cycle(SyncTrigger::Timer)
            .unwrap();
        assert!(report.coalesced);
        assert_eq!(report.announcements_seen, 0);

        // Once the in-flight cycle ends, the next trigger runs normally and
        // the guard releases the flag again.
        ctx.sync_flag().store(false, Ordering::SeqCst);
        let report = SyncScheduler::new(&storage, &client, &mut ctx, &events)
            .run_cycle(SyncTrigger::Timer)
            .unwrap();
        assert!(!report.coalesced);
        assert!(!ctx.sync_flag().load(Ordering::SeqCst));
    }

    #[test]
    fn empty_cycle_completes_without_transport_noise() {
        let storage = Storage::in_memory().unwrap();
        let bulletin = MemoryBulletin::new();
        let client = BulletinClient::new(bulletin.clone(), RetryPolicy::default());
        let events = EventDispatcher::new();
        let mut ctx = context();

        let report = SyncScheduler::new(&storage, &client, &mut ctx, &events)
            .run_cycle(SyncTrigger::Foreground)
            .unwrap();

        assert!(!report.deferred);
        assert_eq!(report.messages_persisted, 0);
        // No peers means no read keys, so the board is never fetched.
        assert_eq!(bulletin.fetch_message_calls(), 0);
    }
}
