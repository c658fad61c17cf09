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

//! Device transports.
//!
//! Three variants reach the same controller: Bluetooth RFCOMM and raw TCP
//! push newline-terminated text both ways, HTTP exposes a small REST API.

#[cfg(feature = "bluetooth")]
mod bluetooth;
mod connection;
mod http;
mod protocol;
mod tcp;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

#[cfg(feature = "bluetooth")]
pub use bluetooth::{RfcommConnector, RFCOMM_CHANNEL, SPP_UUID};
pub use connection::{Connector, LinkEvent, SendOutcome, StreamConnection};
pub use http::HttpClient;
pub use protocol::{decode_line, frame_line, DeviceCommand, DeviceStatus, EnableRequest, Mode};
pub use tcp::TcpConnector;

use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::state::ConnectionStatus;

/// Transport variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    #[default]
    Bluetooth,
    Http,
    Tcp,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Bluetooth => "bluetooth",
            Variant::Http => "http",
            Variant::Tcp => "tcp",
        }
    }

    /// Whether the variant can drive `mode`.
    pub fn supports(&self, mode: Mode) -> bool {
        match mode {
            Mode::Away | Mode::Security => true,
            Mode::Safe => matches!(self, Variant::Bluetooth),
        }
    }

    /// Category for device text matching no rule.
    pub fn fallback_kind(&self) -> Mode {
        match self {
            Variant::Bluetooth => Mode::Safe,
            Variant::Http | Variant::Tcp => Mode::Security,
        }
    }

    /// Commands are confirmed by the device (pull variant).
    pub fn confirms_commands(&self) -> bool {
        matches!(self, Variant::Http)
    }

    /// History survives restarts.
    pub fn persists_history(&self) -> bool {
        matches!(self, Variant::Http)
    }
}

/// The configured link to the device.
pub enum Link {
    /// Bluetooth or TCP.
    Stream(StreamConnection),
    Http(HttpClient),
}

impl Link {
    pub fn variant(&self) -> Variant {
        match self {
            Link::Stream(connection) => connection.variant(),
            Link::Http(_) => Variant::Http,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        match self {
            Link::Stream(connection) => connection.status(),
            Link::Http(client) => client.status(),
        }
    }

    /// Single connection attempt; HTTP has nothing to open.
    pub async fn connect(&self) -> ConnectionStatus {
        match self {
            Link::Stream(connection) => connection.connect().await,
            Link::Http(client) => {
                info!("Using REST endpoint {}", client.base_url());
                client.status()
            }
        }
    }

    /// Inbound events; only streaming links have any.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<LinkEvent>> {
        match self {
            Link::Stream(connection) => connection.take_events(),
            Link::Http(_) => None,
        }
    }

    pub async fn close(&self) {
        if let Link::Stream(connection) = self {
            connection.close().await;
        }
    }
}

/// Build the link described by `config`. Nothing is opened yet.
pub fn open(config: &TransportConfig) -> Result<Link, TransportError> {
    match config.variant {
        Variant::Tcp => {
            let connector = TcpConnector::new(config.tcp.host.clone(), config.tcp.port);
            Ok(Link::Stream(StreamConnection::new(Connector::Tcp(connector))))
        }
        Variant::Http => Ok(Link::Http(HttpClient::new(&config.http.base_url)?)),
        #[cfg(feature = "bluetooth")]
        Variant::Bluetooth => {
            let connector =
                RfcommConnector::new(&config.bluetooth.address, config.bluetooth.channel)?;
            Ok(Link::Stream(StreamConnection::new(Connector::Rfcomm(connector))))
        }
        #[cfg(not(feature = "bluetooth"))]
        Variant::Bluetooth => Err(TransportError::Unsupported(
            "built without the `bluetooth` feature".to_string(),
        )),
    }
}
