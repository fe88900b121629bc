// SPDX-FileCopyrightText: 2026 Deaddrop Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Property tests for the storage invariants: unread accounting, the
//! exactly-once board-read ledger and per-owner discussion uniqueness.

use std::collections::HashSet;

use proptest::prelude::*;

use deaddrop_core::{
    Contact, Discussion, DiscussionStatus, Message, Seeker, Storage, StorageError,
};

fn seeded_storage() -> Storage {
    let storage = Storage::in_memory().unwrap();
    storage
        .save_contact(&Contact::new("owner", "peer", "Peer", vec![1]))
        .unwrap();
    let mut discussion = Discussion::received("owner", "peer");
    discussion.status = DiscussionStatus::Active;
    storage.create_discussion(&discussion).unwrap();
    storage
}

proptest! {
    /// The unread counter always equals the number of incoming messages
    /// since the last read-mark, whatever the interleaving.
    #[test]
    fn unread_count_tracks_incoming_messages(
        batches in proptest::collection::vec(
            (proptest::collection::vec(any::<bool>(), 0..8), any::<bool>()),
            0..6,
        ),
    ) {
        let storage = seeded_storage();
        let mut unread = 0u32;
        let mut total = 0usize;
        let mut last = None;

        for (directions, read_after) in &batches {
            for incoming in directions {
                let content = format!("m{}", total);
                let message = if *incoming {
                    unread += 1;
                    Message::incoming("owner", "peer", &content, total as u64)
                } else {
                    Message::outgoing("owner", "peer", &content)
                };
                storage.add_message(&message).unwrap();
                last = Some(content);
                total += 1;
            }
            if *read_after {
                storage.mark_discussion_read("owner", "peer").unwrap();
                unread = 0;
            }
        }

        let row = storage.get_discussion("owner", "peer").unwrap().unwrap();
        prop_assert_eq!(row.unread_count, unread);
        prop_assert_eq!(row.last_message_content, last);
        prop_assert_eq!(storage.list_messages("owner", "peer").unwrap().len(), total);
    }

    /// The ledger admits each (seeker, ciphertext) pair exactly once per
    /// owner, however often the same bytes are fetched — and every admitted
    /// pair persists exactly one message.
    #[test]
    fn board_ledger_admits_each_pair_once(
        pairs in proptest::collection::vec(
            (
                proptest::collection::vec(any::<u8>(), 1..16),
                proptest::collection::vec(any::<u8>(), 0..24),
            ),
            1..20,
        ),
    ) {
        let storage = seeded_storage();
        let next = Seeker::new(b"next".to_vec());
        let mut seen = HashSet::new();

        for (seeker, ciphertext) in &pairs {
            let message = Message::incoming("owner", "peer", "m", 1);
            let fresh = storage
                .persist_board_read("owner", &Seeker::new(seeker.clone()), ciphertext, &message, &next, 1)
                .unwrap();
            prop_assert_eq!(fresh, seen.insert((seeker.clone(), ciphertext.clone())));
        }
        for (seeker, ciphertext) in &pairs {
            let replay = Message::incoming("owner", "peer", "m", 1);
            prop_assert!(!storage
                .persist_board_read("owner", &Seeker::new(seeker.clone()), ciphertext, &replay, &next, 2)
                .unwrap());
        }
        prop_assert_eq!(storage.list_messages("owner", "peer").unwrap().len(), seen.len());

        // Another owner's ledger is independent.
        let (seeker, ciphertext) = &pairs[0];
        let message = Message::incoming("other", "peer", "m", 1);
        prop_assert!(storage
            .persist_board_read("other", &Seeker::new(seeker.clone()), ciphertext, &message, &next, 3)
            .unwrap());
    }

    /// At most one discussion row per (owner, contact); other owners are
    /// unaffected.
    #[test]
    fn one_discussion_per_owner_and_contact(
        owner in "[a-z0-9]{1,12}",
        contact in "[a-z0-9]{1,12}",
    ) {
        let storage = Storage::in_memory().unwrap();

        storage
            .create_discussion(&Discussion::received(&owner, &contact))
            .unwrap();
        let err = storage
            .create_discussion(&Discussion::received(&owner, &contact))
            .unwrap_err();
        prop_assert!(matches!(err, StorageError::AlreadyExists(_)));

        storage
            .create_discussion(&Discussion::received(&format!("{}x", owner), &contact))
            .unwrap();
    }
}
