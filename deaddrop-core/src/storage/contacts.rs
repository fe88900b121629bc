// SPDX-FileCopyrightText: 2026 Deaddrop Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Contact storage operations.

use rusqlite::params;

use super::{Storage, StorageError};
use crate::model::Contact;

pub(super) struct ContactRow {
    pub owner_user_id: String,
    pub user_id: String,
    pub name: String,
    pub public_keys: Vec<u8>,
    pub is_online: i32,
    pub last_seen: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

const CONTACT_COLUMNS: &str =
    "owner_user_id, user_id, name, public_keys, is_online, last_seen, created_at, updated_at";

fn row_to_contact(row: ContactRow) -> Contact {
    Contact {
        owner_user_id: row.owner_user_id,
        user_id: row.user_id,
        name: row.name,
        public_keys: row.public_keys,
        is_online: row.is_online != 0,
        last_seen: row.last_seen.map(|v| v as u64),
        created_at: row.created_at as u64,
        updated_at: row.updated_at as u64,
    }
}

fn read_row(row: &rusqlite::Row<'_>) -> Result<ContactRow, rusqlite::Error> {
    Ok(ContactRow {
        owner_user_id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        public_keys: row.get(3)?,
        is_online: row.get(4)?,
        last_seen: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl Storage {
    // === Contact Operations ===

    /// Saves a new contact. Enforces per-owner uniqueness both by contact
    /// identifier and by case-insensitive display name; violations surface
    /// as `AlreadyExists` to the action that caused them.
    pub fn save_contact(&self, contact: &Contact) -> Result<(), StorageError> {
        if self
            .get_contact(&contact.owner_user_id, &contact.user_id)?
            .is_some()
        {
            return Err(StorageError::AlreadyExists(format!(
                "contact {}",
                contact.user_id
            )));
        }
        if self.contact_name_taken(&contact.owner_user_id, &contact.name, None)? {
            return Err(StorageError::AlreadyExists(format!(
                "contact name '{}'",
                contact.name
            )));
        }

        self.conn().execute(
            &format!(
                "INSERT INTO contacts ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                CONTACT_COLUMNS
            ),
            params![
                contact.owner_user_id,
                contact.user_id,
                contact.name,
                contact.public_keys,
                contact.is_online as i32,
                contact.last_seen.map(|v| v as i64),
                contact.created_at as i64,
                contact.updated_at as i64,
            ],
        )?;
        Ok(())
    }

    /// Loads one contact of an owner.
    pub fn get_contact(
        &self,
        owner_user_id: &str,
        user_id: &str,
    ) -> Result<Option<Contact>, StorageError> {
        let result = self.conn().query_row(
            &format!(
                "SELECT {} FROM contacts WHERE owner_user_id = ?1 AND user_id = ?2",
                CONTACT_COLUMNS
            ),
            params![owner_user_id, user_id],
            read_row,
        );

        match result {
            Ok(row) => Ok(Some(row_to_contact(row))),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    /// Lists an owner's contacts, sorted by display name.
    pub fn list_contacts(&self, owner_user_id: &str) -> Result<Vec<Contact>, StorageError> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {} FROM contacts WHERE owner_user_id = ?1 ORDER BY name COLLATE NOCASE",
            CONTACT_COLUMNS
        ))?;

        let rows = stmt.query_map(params![owner_user_id], read_row)?;

        let mut contacts = Vec::new();
        for row in rows {
            contacts.push(row_to_contact(row?));
        }
        Ok(contacts)
    }

    /// Renames a contact, keeping the case-insensitive name unique per owner.
    pub fn rename_contact(
        &self,
        owner_user_id: &str,
        user_id: &str,
        new_name: &str,
    ) -> Result<(), StorageError> {
        if self.contact_name_taken(owner_user_id, new_name, Some(user_id))? {
            return Err(StorageError::AlreadyExists(format!(
                "contact name '{}'",
                new_name
            )));
        }

        let updated = self.conn().execute(
            "UPDATE contacts SET name = ?1, updated_at = ?2
             WHERE owner_user_id = ?3 AND user_id = ?4",
            params![
                new_name,
                crate::clock::now_secs() as i64,
                owner_user_id,
                user_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("contact {}", user_id)));
        }
        Ok(())
    }

    fn contact_name_taken(
        &self,
        owner_user_id: &str,
        name: &str,
        exclude_user_id: Option<&str>,
    ) -> Result<bool, StorageError> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM contacts
             WHERE owner_user_id = ?1 AND name = ?2 COLLATE NOCASE
               AND (?3 IS NULL OR user_id != ?3)",
            params![owner_user_id, name, exclude_user_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
