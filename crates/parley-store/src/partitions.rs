//! The raw partition contract and its SQLite implementation.
//!
//! A partition is one named slot holding one whole JSON value.  Each call is
//! atomic on its own; nothing spans keys, so a logical operation touching two
//! partitions can be interrupted between them.  Concurrent writers to the same
//! partition are last-write-wins.

use std::sync::Arc;

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::database::Database;
use crate::error::Result;

/// Well-known partition keys.
pub mod keys {
    use parley_shared::types::AccountId;

    /// identifier -> secret
    pub const CREDENTIALS: &str = "accounts.credentials";
    /// identifier -> profile
    pub const PROFILES: &str = "accounts.profiles";
    /// The logged-in account snapshot for this client.
    pub const SESSION: &str = "session.current";
    /// Global story feed.
    pub const STORIES: &str = "stories.feed";

    /// An account's conversation ledger.
    pub fn ledger(owner: &AccountId) -> String {
        format!("ledger.{owner}")
    }
}

/// Whole-value get / set / remove under string keys.
pub trait PartitionStore {
    fn read_raw(&self, key: &str) -> Result<Option<String>>;
    fn write_raw(&self, key: &str, value: &str) -> Result<()>;
    fn erase(&self, key: &str) -> Result<()>;
}

/// Typed access on top of [`PartitionStore`].
pub trait PartitionStoreExt: PartitionStore {
    /// Read and decode a partition.  A value that no longer decodes is logged
    /// and reported as absent.
    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.read_raw(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key, error = %e, "corrupt partition, treating as absent");
                Ok(None)
            }
        }
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.write_raw(key, &json)
    }
}

impl<P: PartitionStore + ?Sized> PartitionStoreExt for P {}

impl PartitionStore for Database {
    fn read_raw(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn()
            .query_row(
                "SELECT value FROM partitions WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write_raw(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO partitions (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        tracing::trace!(key, bytes = value.len(), "partition written");
        Ok(())
    }

    fn erase(&self, key: &str) -> Result<()> {
        self.conn()
            .execute("DELETE FROM partitions WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl<P: PartitionStore + ?Sized> PartitionStore for Arc<P> {
    fn read_raw(&self, key: &str) -> Result<Option<String>> {
        (**self).read_raw(key)
    }

    fn write_raw(&self, key: &str, value: &str) -> Result<()> {
        (**self).write_raw(key, value)
    }

    fn erase(&self, key: &str) -> Result<()> {
        (**self).erase(key)
    }
}

impl<P: PartitionStore + ?Sized> PartitionStore for &P {
    fn read_raw(&self, key: &str) -> Result<Option<String>> {
        (**self).read_raw(key)
    }

    fn write_raw(&self, key: &str, value: &str) -> Result<()> {
        (**self).write_raw(key, value)
    }

    fn erase(&self, key: &str) -> Result<()> {
        (**self).erase(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn read_missing_is_none() {
        let db = Database::open_in_memory().unwrap();
        let value: Option<Vec<String>> = db.read("nothing.here").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn write_then_read() {
        let db = Database::open_in_memory().unwrap();
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), 1u32);
        db.write("some.key", &map).unwrap();

        let back: BTreeMap<String, u32> = db.read("some.key").unwrap().unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn write_replaces_whole_value() {
        let db = Database::open_in_memory().unwrap();
        db.write("k", &vec![1, 2, 3]).unwrap();
        db.write("k", &vec![9]).unwrap();
        let back: Vec<i32> = db.read("k").unwrap().unwrap();
        assert_eq!(back, vec![9]);
    }

    #[test]
    fn corrupt_value_reads_as_absent() {
        let db = Database::open_in_memory().unwrap();
        db.write_raw("k", "{not json").unwrap();
        let value: Option<Vec<i32>> = db.read("k").unwrap();
        assert!(value.is_none());

        db.write_raw("k", "\"a string\"").unwrap();
        let value: Option<Vec<i32>> = db.read("k").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn erase_removes() {
        let db = Database::open_in_memory().unwrap();
        db.write("k", &1).unwrap();
        db.erase("k").unwrap();
        assert!(db.read_raw("k").unwrap().is_none());
        // Erasing again is fine.
        db.erase("k").unwrap();
    }

    #[test]
    fn two_handles_share_partitions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.db");
        let first = Database::open_at(&path).unwrap();
        let second = Database::open_at(&path).unwrap();

        first.write(keys::STORIES, &vec!["x"]).unwrap();
        let seen: Vec<String> = second.read(keys::STORIES).unwrap().unwrap();
        assert_eq!(seen, vec!["x"]);
    }

    #[test]
    fn ledger_key_format() {
        let id = parley_shared::types::AccountId::parse("12345678").unwrap();
        assert_eq!(keys::ledger(&id), "ledger.12345678");
    }
}
