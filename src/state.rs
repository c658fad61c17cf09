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

//! Connection and mode state.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

use crate::transport::Mode;

/// Connection status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Failed(String),
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Connecting => "Connecting...",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Failed(_) => "Failed",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Failed(reason) => write!(f, "Failed ({})", reason),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Shared state of the single device link.
#[derive(Debug, Default)]
pub struct LinkState {
    /// Current connection status.
    status: RwLock<ConnectionStatus>,
}

impl LinkState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_connecting(&self) {
        *self.status.write() = ConnectionStatus::Connecting;
    }

    pub fn set_connected(&self) {
        *self.status.write() = ConnectionStatus::Connected;
    }

    pub fn set_disconnected(&self) {
        *self.status.write() = ConnectionStatus::Disconnected;
    }

    pub fn set_failed(&self, reason: impl Into<String>) {
        *self.status.write() = ConnectionStatus::Failed(reason.into());
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.read().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.status.read().is_connected()
    }
}

/// Read-only copy of the mode flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeSnapshot {
    pub away: bool,
    pub security: bool,
    pub safe: bool,
}

impl ModeSnapshot {
    pub fn get(&self, mode: Mode) -> bool {
        match mode {
            Mode::Away => self.away,
            Mode::Security => self.security,
            Mode::Safe => self.safe,
        }
    }

    pub fn set(&mut self, mode: Mode, active: bool) {
        match mode {
            Mode::Away => self.away = active,
            Mode::Security => self.security = active,
            Mode::Safe => self.safe = active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_state_transitions() {
        let state = LinkState::new();
        assert_eq!(state.status(), ConnectionStatus::Disconnected);

        state.set_connecting();
        assert_eq!(state.status().as_str(), "Connecting...");

        state.set_connected();
        assert!(state.is_connected());

        state.set_failed("connection reset");
        assert!(!state.is_connected());
        assert_eq!(state.status().to_string(), "Failed (connection reset)");
    }

    #[test]
    fn test_mode_snapshot() {
        let mut modes = ModeSnapshot::default();
        modes.set(Mode::Security, true);
        assert!(modes.get(Mode::Security));
        assert!(!modes.get(Mode::Away));
        assert!(!modes.get(Mode::Safe));
    }
}
