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

//! Local key-value preferences backed by SQLite.
//!
//! Each key holds an ordered list of strings, stored as a JSON array.

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::StorageError;

/// Preferences database handle.
#[derive(Clone)]
pub struct Preferences {
    conn: Arc<Mutex<Connection>>,
}

impl Preferences {
    /// Create or open the preferences database in `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join("preferences.db");
        info!("Opening preferences database: {:?}", db_path);

        Self::init(Connection::open(&db_path)?)
    }

    /// Volatile store, lost when dropped.
    pub fn in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Read a string list. A missing key yields `None`.
    pub fn get_string_list(&self, key: &str) -> Result<Option<Vec<String>>, StorageError> {
        let conn = self.conn.lock();
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Replace the list stored under `key`.
    pub fn set_string_list(&self, key: &str, values: &[String]) -> Result<(), StorageError> {
        let json = serde_json::to_string(values)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, ?2)",
            params![key, json],
        )?;
        debug!("Stored {} values under '{}'", values.len(), key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_key() {
        let prefs = Preferences::in_memory().unwrap();
        assert_eq!(prefs.get_string_list("nothing").unwrap(), None);
    }

    #[test]
    fn test_list_order_and_replace() {
        let prefs = Preferences::in_memory().unwrap();
        let values = vec!["b".to_string(), "a".to_string(), "c".to_string()];
        prefs.set_string_list("letters", &values).unwrap();
        assert_eq!(prefs.get_string_list("letters").unwrap(), Some(values));

        prefs.set_string_list("letters", &[]).unwrap();
        assert_eq!(prefs.get_string_list("letters").unwrap(), Some(Vec::new()));
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let prefs = Preferences::open(dir.path()).unwrap();
            prefs
                .set_string_list("k", &["one".to_string(), "two".to_string()])
                .unwrap();
        }

        let prefs = Preferences::open(dir.path()).unwrap();
        assert_eq!(
            prefs.get_string_list("k").unwrap(),
            Some(vec!["one".to_string(), "two".to_string()])
        );
    }
}
