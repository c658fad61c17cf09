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

//! Line-oriented console driver.
//!
//! Reads actions from stdin and renders reconciler state as text.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::state::{ConnectionStatus, ModeSnapshot};
use crate::storage::AlarmRecord;
use crate::transport::{Mode, Variant};

pub const HELP: &str =
    "commands: away on|off, security on|off, safe on|off, history, status, clear, quit";

/// Actions that can be triggered from the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleAction {
    Toggle { mode: Mode, enabled: bool },
    ShowHistory,
    ShowStatus,
    ClearHistory,
    Help,
    Quit,
}

impl ConsoleAction {
    /// Parse one input line. Blank or unknown input yields `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.to_lowercase();
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [mode, state] => {
                let mode = Mode::parse(mode)?;
                let enabled = match *state {
                    "on" | "arm" | "1" => true,
                    "off" | "disarm" | "0" => false,
                    _ => return None,
                };
                Some(Self::Toggle { mode, enabled })
            }
            ["history"] => Some(Self::ShowHistory),
            ["status"] => Some(Self::ShowStatus),
            ["clear"] => Some(Self::ClearHistory),
            ["help"] | ["?"] => Some(Self::Help),
            ["quit"] | ["exit"] => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Start reading stdin. End of input becomes `Quit`.
pub fn run_console() -> mpsc::UnboundedReceiver<ConsoleAction> {
    let (action_tx, action_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match ConsoleAction::parse(&line) {
                        Some(action) => {
                            if action_tx.send(action).is_err() {
                                break;
                            }
                        }
                        None => warn!("Unrecognized input '{}'; {}", line.trim(), HELP),
                    }
                }
                Ok(None) | Err(_) => {
                    let _ = action_tx.send(ConsoleAction::Quit);
                    break;
                }
            }
        }
    });

    info!("Console started");
    action_rx
}

/// One-line status header.
pub fn status_text(status: &ConnectionStatus) -> String {
    match status {
        ConnectionStatus::Connected => "● Connected".to_string(),
        ConnectionStatus::Disconnected => "○ Disconnected".to_string(),
        ConnectionStatus::Connecting => "◐ Connecting...".to_string(),
        ConnectionStatus::Failed(reason) => format!("✕ Failed: {}", reason),
    }
}

/// Mode switches available on `variant`.
pub fn render_modes(variant: Variant, modes: &ModeSnapshot) -> String {
    Mode::ALL
        .iter()
        .filter(|mode| variant.supports(**mode))
        .map(|mode| {
            let mark = if modes.get(*mode) { "✓" } else { "○" };
            format!("{} {} mode", mark, mode)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// History listing, newest first.
pub fn render_history(records: &[AlarmRecord]) -> String {
    if records.is_empty() {
        return "No alarm history".to_string();
    }

    records
        .iter()
        .rev()
        .map(|record| {
            format!(
                "[{}] {:<8} {}",
                record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                record.kind.as_str(),
                record.reason
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
