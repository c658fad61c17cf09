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

//! Alarm history.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::Preferences;
use crate::error::StorageError;
use crate::transport::Mode;

/// Preferences key holding the encoded history.
pub const HISTORY_KEY: &str = "alarm_history";

/// A single history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmRecord {
    pub id: String,
    pub timestamp: DateTime<Local>,
    pub reason: String,
    #[serde(rename = "type")]
    pub kind: Mode,
}

impl AlarmRecord {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Encode records, one JSON document per element.
pub fn encode_all(records: &[AlarmRecord]) -> Result<Vec<String>, serde_json::Error> {
    records.iter().map(AlarmRecord::encode).collect()
}

/// Decode records in order, skipping elements that do not parse.
pub fn decode_all(values: &[String]) -> Vec<AlarmRecord> {
    values
        .iter()
        .filter_map(|value| match AlarmRecord::decode(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping undecodable history record: {}", e);
                None
            }
        })
        .collect()
}

/// Microsecond-timestamp ids, strictly increasing within a process.
#[derive(Debug, Default)]
struct IdSequence {
    last: i64,
}

impl IdSequence {
    fn next(&mut self, now: DateTime<Local>) -> String {
        let micros = now.timestamp_micros();
        let id = if micros > self.last {
            micros
        } else {
            self.last + 1
        };
        self.last = id;
        id.to_string()
    }

    fn observe(&mut self, id: &str) {
        if let Ok(value) = id.parse::<i64>() {
            self.last = self.last.max(value);
        }
    }
}

/// Ordered alarm history, optionally mirrored to preferences.
pub struct AlarmHistory {
    records: Vec<AlarmRecord>,
    store: Option<Preferences>,
    ids: IdSequence,
}

impl AlarmHistory {
    /// History kept only for the lifetime of the process.
    pub fn in_memory() -> Self {
        Self {
            records: Vec::new(),
            store: None,
            ids: IdSequence::default(),
        }
    }

    /// History loaded from and written back to `store`.
    pub fn persistent(store: Preferences) -> Result<Self, StorageError> {
        let records = store
            .get_string_list(HISTORY_KEY)?
            .map(|values| decode_all(&values))
            .unwrap_or_default();
        info!("Loaded {} alarm records", records.len());

        let mut ids = IdSequence::default();
        for record in &records {
            ids.observe(&record.id);
        }

        Ok(Self {
            records,
            store: Some(store),
            ids,
        })
    }

    /// Append a record stamped with the current time.
    ///
    /// The record is kept in memory even if writing it back fails.
    pub fn record(
        &mut self,
        reason: impl Into<String>,
        kind: Mode,
    ) -> Result<&AlarmRecord, StorageError> {
        let now = Local::now();
        let record = AlarmRecord {
            id: self.ids.next(now),
            timestamp: now,
            reason: reason.into(),
            kind,
        };
        self.records.push(record);
        self.persist()?;
        Ok(&self.records[self.records.len() - 1])
    }

    pub fn records(&self) -> &[AlarmRecord] {
        &self.records
    }

    pub fn latest(&self) -> Option<&AlarmRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Clear all history.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.records.clear();
        self.persist()?;
        info!("History cleared");
        Ok(())
    }

    fn persist(&self) -> Result<(), StorageError> {
        if let Some(store) = &self.store {
            let values = encode_all(&self.records)?;
            store.set_string_list(HISTORY_KEY, &values)?;
        }
        Ok(())
    }
}
