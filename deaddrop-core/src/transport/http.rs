// SPDX-FileCopyrightText: 2026 Deaddrop Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! REST binding against the bulletin store.
//!
//! Wire contract (all payloads are opaque byte blobs, base64 inside JSON):
//! - `POST {base}/messages/fetch {"seekers":[..]} -> [{"key":..,"value":..}]`
//! - `POST {base}/messages/ {"key":..,"value":..} -> 200`
//! - `POST {base}/bulletin {"data":..} -> {"counter":"..."}`
//! - `GET  {base}/bulletin -> [.., ..]`

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::clock;
use crate::engine::Seeker;

use super::api::{BoardEntry, BulletinApi};
use super::client::RetryPolicy;
use super::error::TransportError;

#[derive(Serialize)]
struct FetchRequest {
    seekers: Vec<String>,
}

#[derive(Deserialize)]
struct FetchEntry {
    key: String,
    value: String,
}

#[derive(Serialize)]
struct StoreRequest {
    key: String,
    value: String,
}

#[derive(Serialize)]
struct AnnounceRequest {
    data: String,
}

#[derive(Deserialize)]
struct AnnounceResponse {
    counter: String,
}

/// Blocking HTTP implementation of [`BulletinApi`].
///
/// The per-attempt timeout from the retry policy is enforced by the
/// underlying client; a request that exceeds it is abandoned client-side
/// even though the remote write may still complete (safe: duplicate writes
/// are harmless, consumed seekers are ignored by the engine).
pub struct HttpBulletinApi {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpBulletinApi {
    /// Creates a client against `base_url` (no trailing slash).
    pub fn new(base_url: &str, policy: &RetryPolicy) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(policy.request_timeout)
            .build()
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        Ok(HttpBulletinApi {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn map_error(e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_decode() {
            TransportError::Malformed(e.to_string())
        } else {
            TransportError::Connection(e.to_string())
        }
    }

    fn check_status(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(TransportError::Status(status.as_u16()))
        }
    }

    fn decode(field: &str, value: &str) -> Result<Vec<u8>, TransportError> {
        BASE64
            .decode(value)
            .map_err(|e| TransportError::Malformed(format!("{}: {}", field, e)))
    }
}

impl BulletinApi for HttpBulletinApi {
    fn fetch_messages(&self, seekers: &[Seeker]) -> Result<Vec<BoardEntry>, TransportError> {
        let request = FetchRequest {
            seekers: seekers.iter().map(|s| BASE64.encode(s.as_bytes())).collect(),
        };

        let response = self
            .client
            .post(self.url("/messages/fetch"))
            .json(&request)
            .send()
            .map_err(Self::map_error)?;
        let entries: Vec<FetchEntry> = Self::check_status(response)?
            .json()
            .map_err(Self::map_error)?;

        let fetched_at = clock::now_secs();
        entries
            .into_iter()
            .map(|entry| {
                Ok(BoardEntry {
                    seeker: Seeker::new(Self::decode("key", &entry.key)?),
                    ciphertext: Self::decode("value", &entry.value)?,
                    fetched_at,
                })
            })
            .collect()
    }

    fn post_message(&self, seeker: &Seeker, ciphertext: &[u8]) -> Result<(), TransportError> {
        let request = StoreRequest {
            key: BASE64.encode(seeker.as_bytes()),
            value: BASE64.encode(ciphertext),
        };

        let response = self
            .client
            .post(self.url("/messages/"))
            .json(&request)
            .send()
            .map_err(Self::map_error)?;
        Self::check_status(response)?;
        Ok(())
    }

    fn post_announcement(&self, payload: &[u8]) -> Result<String, TransportError> {
        let request = AnnounceRequest {
            data: BASE64.encode(payload),
        };

        let response = self
            .client
            .post(self.url("/bulletin"))
            .json(&request)
            .send()
            .map_err(Self::map_error)?;
        let parsed: AnnounceResponse = Self::check_status(response)?
            .json()
            .map_err(Self::map_error)?;
        Ok(parsed.counter)
    }

    fn fetch_announcements(&self) -> Result<Vec<Vec<u8>>, TransportError> {
        let response = self
            .client
            .get(self.url("/bulletin"))
            .send()
            .map_err(Self::map_error)?;
        let entries: Vec<String> = Self::check_status(response)?
            .json()
            .map_err(Self::map_error)?;

        entries
            .iter()
            .map(|entry| Self::decode("announcement", entry))
            .collect()
    }
}
