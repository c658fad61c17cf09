// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types shared by the transport and storage layers.

use thiserror::Error;

/// Errors raised while talking to the controller.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The link is down; nothing was sent.
    #[error("not connected to the device")]
    NotConnected,

    /// The single connect attempt failed.
    #[error("connection failed: {0}")]
    Connect(#[source] std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request could not be completed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The device answered outside the 2xx range.
    #[error("device responded with HTTP {0}")]
    Status(u16),

    /// Malformed JSON from the device.
    #[error("malformed device response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid Bluetooth address: {0}")]
    InvalidAddress(String),

    /// The configured variant cannot carry this request.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Errors raised by local persistence.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record encoding error: {0}")]
    Json(#[from] serde_json::Error),
}
