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

//! Mode and history reconciliation.
//!
//! The [`Reconciler`] is the only owner of the mode flags and the alarm
//! history. User toggles, device messages and the startup status sync all
//! go through it, and every change is published to subscribers.

use std::fmt;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::classify::Classifier;
use crate::error::TransportError;
use crate::state::{ConnectionStatus, ModeSnapshot};
use crate::storage::{AlarmHistory, AlarmRecord};
use crate::transport::{DeviceCommand, Link, LinkEvent, Mode, SendOutcome, Variant};

/// Transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The network is down; nothing was sent.
    NotConnected,
    /// The device rejected or never received the request.
    RequestFailed(String),
    /// The variant has no way to drive this mode.
    UnsupportedMode(Mode),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::NotConnected => f.write_str("Not connected to the device"),
            Notice::RequestFailed(reason) => write!(f, "Request failed: {}", reason),
            Notice::UnsupportedMode(mode) => write!(f, "{} mode is not available", mode),
        }
    }
}

/// Notification published after every state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    Modes(ModeSnapshot),
    HistoryAppended(AlarmRecord),
    HistoryCleared,
    Connection(ConnectionStatus),
    Notice(Notice),
}

/// Outcome of a user toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Applied,
    Rejected(Notice),
}

/// Owns mode flags and alarm history.
pub struct Reconciler {
    link: Link,
    modes: ModeSnapshot,
    history: AlarmHistory,
    classifier: Classifier,
    changes: broadcast::Sender<StateChange>,
}

impl Reconciler {
    pub fn new(link: Link, history: AlarmHistory) -> Self {
        let classifier = Classifier::for_variant(link.variant());
        let (changes, _) = broadcast::channel(64);
        Self {
            link,
            modes: ModeSnapshot::default(),
            history,
            classifier,
            changes,
        }
    }

    pub fn variant(&self) -> Variant {
        self.link.variant()
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    /// Receive every subsequent state change.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.changes.subscribe()
    }

    pub fn snapshot(&self) -> ModeSnapshot {
        self.modes
    }

    pub fn is_active(&self, mode: Mode) -> bool {
        self.modes.get(mode)
    }

    pub fn history(&self) -> &[AlarmRecord] {
        self.history.records()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.link.status()
    }

    /// Connect once and, for HTTP, pull the current device state.
    pub async fn start(&mut self) -> ConnectionStatus {
        let status = self.link.connect().await;
        self.notify(StateChange::Connection(status.clone()));

        if self.variant().confirms_commands() {
            self.sync_status().await;
        }
        status
    }

    /// Apply a user toggle of `mode` to `desired`.
    pub async fn toggle(&mut self, mode: Mode, desired: bool) -> ToggleOutcome {
        if !self.variant().supports(mode) {
            return self.reject(Notice::UnsupportedMode(mode));
        }

        match &self.link {
            Link::Stream(connection) => {
                let command = DeviceCommand::for_mode(mode, desired);
                if connection.send(command.as_str()).await == SendOutcome::Dropped {
                    debug!("{} not delivered, applying locally", command.as_str());
                }
            }
            Link::Http(client) => {
                if let Err(e) = client.set_mode(mode, desired).await {
                    warn!("{} mode change rejected: {}", mode, e);
                    let notice = match e {
                        TransportError::NotConnected => Notice::NotConnected,
                        other => Notice::RequestFailed(other.to_string()),
                    };
                    return self.reject(notice);
                }
            }
        }

        self.modes.set(mode, desired);
        let verb = if desired { "armed" } else { "disarmed" };
        info!("{} mode {}", mode, verb);
        self.notify(StateChange::Modes(self.modes));
        self.append(mode.transition_reason(desired), mode);
        ToggleOutcome::Applied
    }

    fn reject(&self, notice: Notice) -> ToggleOutcome {
        self.notify(StateChange::Notice(notice.clone()));
        ToggleOutcome::Rejected(notice)
    }

    /// Record a device message. Flags are left alone.
    pub fn handle_message(&mut self, text: &str) -> Mode {
        let kind = self.classifier.classify(text);
        info!("Device message ({}): {}", kind.as_str(), text);
        self.append(text.to_string(), kind);
        kind
    }

    /// Silent resync from the device. Returns whether a status was applied.
    pub async fn sync_status(&mut self) -> bool {
        let Link::Http(client) = &self.link else {
            debug!("Status sync is only available over HTTP");
            return false;
        };

        match client.get_status().await {
            Some(status) => {
                self.modes.away = status.away;
                self.modes.security = status.security;
                info!(
                    "Synced device status: away={} security={}",
                    status.away, status.security
                );
                self.notify(StateChange::Modes(self.modes));
                true
            }
            None => false,
        }
    }

    /// Process one event from the stream transport.
    pub fn handle_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::MessageReceived(text) => {
                self.handle_message(&text);
            }
            LinkEvent::Connected { endpoint } => {
                info!("Device connected: {}", endpoint);
                self.notify(StateChange::Connection(self.link.status()));
            }
            LinkEvent::Disconnected => {
                warn!("Device disconnected; not reconnecting");
                self.notify(StateChange::Connection(self.link.status()));
            }
            LinkEvent::Error(e) => {
                error!("Connection error: {}", e);
                self.notify(StateChange::Connection(self.link.status()));
            }
        }
    }

    /// Empty the history. Mode flags are untouched.
    pub fn clear_history(&mut self) {
        if let Err(e) = self.history.clear() {
            error!("Failed to persist cleared history: {}", e);
        }
        self.notify(StateChange::HistoryCleared);
    }

    /// Release the link.
    pub async fn shutdown(&self) {
        self.link.close().await;
        self.notify(StateChange::Connection(self.link.status()));
    }

    fn append(&mut self, reason: String, kind: Mode) {
        if let Err(e) = self.history.record(reason, kind) {
            error!("Failed to persist alarm history: {}", e);
        }
        if let Some(record) = self.history.latest() {
            self.notify(StateChange::HistoryAppended(record.clone()));
        }
    }

    fn notify(&self, change: StateChange) {
        // No subscribers is fine.
        let _ = self.changes.send(change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Connector, StreamConnection, TcpConnector};

    fn offline_tcp() -> Reconciler {
        let connector = Connector::Tcp(TcpConnector::new("127.0.0.1", 9));
        let link = Link::Stream(StreamConnection::new(connector));
        Reconciler::new(link, AlarmHistory::in_memory())
    }

    #[tokio::test]
    async fn test_push_toggle_applies_without_connection() {
        let mut reconciler = offline_tcp();
        let mut changes = reconciler.subscribe();

        assert_eq!(reconciler.toggle(Mode::Away, true).await, ToggleOutcome::Applied);
        assert!(reconciler.is_active(Mode::Away));

        let record = reconciler.history().last().unwrap();
        assert_eq!(record.reason, "Away mode armed");
        assert_eq!(record.kind, Mode::Away);

        assert!(matches!(
            changes.recv().await.unwrap(),
            StateChange::Modes(m) if m.away
        ));
        assert!(matches!(
            changes.recv().await.unwrap(),
            StateChange::HistoryAppended(_)
        ));
    }

    #[tokio::test]
    async fn test_safe_mode_rejected_over_tcp() {
        let mut reconciler = offline_tcp();

        assert_eq!(
            reconciler.toggle(Mode::Safe, true).await,
            ToggleOutcome::Rejected(Notice::UnsupportedMode(Mode::Safe))
        );
        assert!(!reconciler.is_active(Mode::Safe));
        assert!(reconciler.history().is_empty());
    }

    #[test]
    fn test_message_does_not_touch_flags() {
        let mut reconciler = offline_tcp();

        assert_eq!(reconciler.handle_message("Away mode armed"), Mode::Away);
        assert_eq!(reconciler.handle_message("Motion detected"), Mode::Security);
        assert_eq!(reconciler.snapshot(), ModeSnapshot::default());

        let history = reconciler.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].reason, "Motion detected");
        assert_eq!(history[1].kind, Mode::Security);
    }

    #[tokio::test]
    async fn test_clear_keeps_flags() {
        let mut reconciler = offline_tcp();
        reconciler.toggle(Mode::Security, true).await;
        let event = LinkEvent::MessageReceived("Security breach".to_string());
        reconciler.handle_link_event(event);
        assert_eq!(reconciler.history().len(), 2);

        reconciler.clear_history();
        assert!(reconciler.history().is_empty());
        assert!(reconciler.is_active(Mode::Security));
    }

    #[tokio::test]
    async fn test_sync_status_needs_http() {
        let mut reconciler = offline_tcp();
        assert!(!reconciler.sync_status().await);
    }

    #[test]
    fn test_notice_text() {
        assert_eq!(
            Notice::NotConnected.to_string(),
            "Not connected to the device"
        );
        assert_eq!(
            Notice::UnsupportedMode(Mode::Safe).to_string(),
            "Safe mode is not available"
        );
    }
}
