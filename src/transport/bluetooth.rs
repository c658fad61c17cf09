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

//! Bluetooth RFCOMM client transport.
//!
//! The controller exposes a classic serial port profile; we connect to it
//! as a client on a fixed channel.

use bluer::rfcomm::{SocketAddr, Stream};
use bluer::Address;
use tracing::info;
use uuid::Uuid;

use crate::error::TransportError;

/// Standard SPP UUID.
pub const SPP_UUID: Uuid = Uuid::from_u128(0x00001101_0000_1000_8000_00805F9B34FB);

/// RFCOMM channel used by serial-port modules.
pub const RFCOMM_CHANNEL: u8 = 1;

/// Connects to the controller's serial port service.
#[derive(Debug, Clone)]
pub struct RfcommConnector {
    address: Address,
    channel: u8,
}

impl RfcommConnector {
    /// Parse a `XX:XX:XX:XX:XX:XX` device address.
    pub fn new(address: &str, channel: u8) -> Result<Self, TransportError> {
        let address: Address = address
            .trim()
            .parse()
            .map_err(|_| TransportError::InvalidAddress(address.to_string()))?;
        Ok(Self { address, channel })
    }

    pub fn endpoint(&self) -> String {
        format!("{} channel {}", self.address, self.channel)
    }

    /// Open the RFCOMM stream.
    pub async fn connect(&self) -> Result<Stream, TransportError> {
        info!(
            "Opening RFCOMM stream (SPP {}) to {}",
            SPP_UUID,
            self.endpoint()
        );
        let stream = Stream::connect(SocketAddr::new(self.address, self.channel))
            .await
            .map_err(TransportError::Connect)?;
        Ok(stream)
    }
}
