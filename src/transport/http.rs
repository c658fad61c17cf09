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

//! HTTP REST transport.
//!
//! Pull-based: commands are confirmed by the response status, and the
//! device state is read with an explicit status query.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use super::protocol::{DeviceStatus, EnableRequest, Mode};
use crate::error::TransportError;
use crate::state::{ConnectionStatus, LinkState};

/// REST client for the controller's `/api` endpoints.
pub struct HttpClient {
    http: reqwest::Client,
    base_url: Url,
    state: Arc<LinkState>,
    network_available: AtomicBool,
}

impl HttpClient {
    /// Create a client for `base_url`, e.g. `http://192.168.4.1`.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Ok(Self::with_client(reqwest::Client::new(), Url::parse(base_url)?))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        let state = LinkState::new();
        state.set_connected();
        Self {
            http,
            base_url,
            state,
            network_available: AtomicBool::new(true),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.status()
    }

    /// Report whether the local network is up. While it is down no
    /// requests are issued.
    pub fn set_network_available(&self, available: bool) {
        self.network_available.store(available, Ordering::SeqCst);
        if available {
            self.state.set_connected();
        } else {
            self.state.set_disconnected();
        }
        let label = if available { "available" } else { "unavailable" };
        info!("Network {}", label);
    }

    pub fn is_network_available(&self) -> bool {
        self.network_available.load(Ordering::SeqCst)
    }

    /// Build `{base}/{path}`.
    fn endpoint_url(&self, path: &str) -> Result<Url, TransportError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{}/{}", base, path.trim_start_matches('/')))?)
    }

    pub async fn set_away(&self, enabled: bool) -> Result<(), TransportError> {
        self.post_enabled("api/away", enabled).await
    }

    pub async fn set_security(&self, enabled: bool) -> Result<(), TransportError> {
        self.post_enabled("api/security", enabled).await
    }

    /// Drive `mode` to `enabled`. Safe mode has no REST endpoint.
    pub async fn set_mode(&self, mode: Mode, enabled: bool) -> Result<(), TransportError> {
        match mode {
            Mode::Away => self.set_away(enabled).await,
            Mode::Security => self.set_security(enabled).await,
            Mode::Safe => Err(TransportError::Unsupported("safe mode over HTTP".to_string())),
        }
    }

    async fn post_enabled(&self, path: &str, enabled: bool) -> Result<(), TransportError> {
        if !self.is_network_available() {
            debug!("Network unavailable, not sending POST {}", path);
            return Err(TransportError::NotConnected);
        }

        let url = self.endpoint_url(path)?;
        debug!("POST {} enabled={}", url, enabled);

        let resp = self
            .http
            .post(url)
            .json(&EnableRequest { enabled })
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::Status(status.as_u16()))
        }
    }

    /// Query the device state. Any failure yields `None`.
    pub async fn get_status(&self) -> Option<DeviceStatus> {
        if !self.is_network_available() {
            debug!("Network unavailable, skipping status query");
            return None;
        }

        match self.fetch_status().await {
            Ok(status) => Some(status),
            Err(e) => {
                warn!("No device status available: {}", e);
                None
            }
        }
    }

    async fn fetch_status(&self) -> Result<DeviceStatus, TransportError> {
        let url = self.endpoint_url("api/status")?;
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let body = resp.text().await?;
        Ok(DeviceStatus::from_json(&body)?)
    }
}
