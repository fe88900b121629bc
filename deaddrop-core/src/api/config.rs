// SPDX-FileCopyrightText: 2026 Deaddrop Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration types.

use std::path::PathBuf;

use crate::transport::RetryPolicy;

/// Where the local database lives.
#[derive(Debug, Clone, Default)]
pub enum StorageLocation {
    /// On-disk SQLite database.
    Path(PathBuf),
    /// In-memory database (tests, ephemeral sessions).
    #[default]
    InMemory,
}

/// Synchronization tuning.
///
/// The embedder owns the sync triggers — it calls
/// [`Deaddrop::sync`](super::Deaddrop::sync) from its own timer and on
/// foreground transitions; this config only gates how those triggers are
/// honored.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Honor the app-foreground trigger (ignore it when off).
    pub sync_on_foreground: bool,
    /// Run an immediate poll right after accepting a discussion.
    pub poll_after_accept: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            sync_on_foreground: true,
            poll_after_accept: true,
        }
    }
}

/// Top-level configuration for [`Deaddrop`](super::Deaddrop).
#[derive(Debug, Clone, Default)]
pub struct DeaddropConfig {
    pub storage: StorageLocation,
    pub retry: RetryPolicy,
    pub sync: SyncConfig,
    /// Bulletin store base URL (used by the HTTP transport constructor).
    pub base_url: Option<String>,
}
