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

//! Controller command vocabulary and wire payloads.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Arming modes known to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Away,
    Security,
    Safe,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Away, Mode::Security, Mode::Safe];

    /// Lowercase tag, as stored in alarm records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Away => "away",
            Self::Security => "security",
            Self::Safe => "safe",
        }
    }

    /// Human-facing name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Away => "Away",
            Self::Security => "Security",
            Self::Safe => "Safe",
        }
    }

    /// Parse from a tag or label, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "away" => Some(Self::Away),
            "security" | "sec" => Some(Self::Security),
            "safe" => Some(Self::Safe),
            _ => None,
        }
    }

    /// History text for a local transition, e.g. "Away mode armed".
    pub fn transition_reason(&self, active: bool) -> String {
        let verb = if active { "armed" } else { "disarmed" };
        format!("{} mode {}", self.label(), verb)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Text commands understood by the controller firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    AwayOn,
    AwayOff,
    SecurityOn,
    SecurityOff,
    /// Safe mode uses single-character commands.
    SafeOn,
    SafeOff,
}

impl DeviceCommand {
    /// Command that drives `mode` to `enabled`.
    pub fn for_mode(mode: Mode, enabled: bool) -> Self {
        match (mode, enabled) {
            (Mode::Away, true) => Self::AwayOn,
            (Mode::Away, false) => Self::AwayOff,
            (Mode::Security, true) => Self::SecurityOn,
            (Mode::Security, false) => Self::SecurityOff,
            (Mode::Safe, true) => Self::SafeOn,
            (Mode::Safe, false) => Self::SafeOff,
        }
    }

    /// Wire text without the line terminator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwayOn => "CMD:AWAY_ON",
            Self::AwayOff => "CMD:AWAY_OFF",
            Self::SecurityOn => "CMD:SEC_ON",
            Self::SecurityOff => "CMD:SEC_OFF",
            Self::SafeOn => "1",
            Self::SafeOff => "0",
        }
    }
}

/// Frame a command for a stream transport: exactly one trailing newline.
pub fn frame_line(text: &str) -> String {
    format!("{}\n", text.trim_end_matches(['\r', '\n']))
}

/// Decode one inbound line. Returns `None` for blank lines.
pub fn decode_line(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Body of `POST /api/away` and `POST /api/security`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnableRequest {
    pub enabled: bool,
}

/// Body of `GET /api/status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub away: bool,
    pub security: bool,
}

impl DeviceStatus {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_vocabulary() {
        let cases = [
            (Mode::Away, true, "CMD:AWAY_ON"),
            (Mode::Away, false, "CMD:AWAY_OFF"),
            (Mode::Security, true, "CMD:SEC_ON"),
            (Mode::Security, false, "CMD:SEC_OFF"),
            (Mode::Safe, true, "1"),
            (Mode::Safe, false, "0"),
        ];
        for (mode, enabled, wire) in cases {
            assert_eq!(DeviceCommand::for_mode(mode, enabled).as_str(), wire);
        }
    }

    #[test]
    fn test_frame_line() {
        assert_eq!(frame_line("CMD:AWAY_ON"), "CMD:AWAY_ON\n");
        assert_eq!(frame_line("CMD:AWAY_ON\n"), "CMD:AWAY_ON\n");
        assert_eq!(frame_line("1\r\n"), "1\n");
    }

    #[test]
    fn test_decode_line() {
        assert_eq!(
            decode_line(b"  Motion detected\r\n"),
            Some("Motion detected".to_string())
        );
        assert_eq!(decode_line(b"\r\n"), None);
        assert_eq!(decode_line(b"Away \xFF\n"), Some("Away \u{FFFD}".to_string()));
    }

    #[test]
    fn test_mode_labels() {
        assert_eq!(Mode::Away.transition_reason(true), "Away mode armed");
        assert_eq!(
            Mode::Security.transition_reason(false),
            "Security mode disarmed"
        );
        assert_eq!(Mode::parse("SEC"), Some(Mode::Security));
        assert_eq!(Mode::parse("panic"), None);
    }

    #[test]
    fn test_status_payloads() {
        let json = r#"{"away":true,"security":false}"#;
        let status = DeviceStatus::from_json(json).unwrap();
        assert_eq!(
            status,
            DeviceStatus {
                away: true,
                security: false
            }
        );

        assert!(DeviceStatus::from_json(r#"{"away":"yes"}"#).is_err());

        let request = EnableRequest { enabled: true };
        let body = serde_json::to_string(&request).unwrap();
        assert_eq!(body, r#"{"enabled":true}"#);
    }
}
