//! Volatile partition store for tests and throwaway sessions.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::Result;
use crate::partitions::PartitionStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    partitions: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A panic mid-insert cannot leave a HashMap half-written.
        self.partitions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PartitionStore for MemoryStore {
    fn read_raw(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn write_raw(&self, key: &str, value: &str) -> Result<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn erase(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partitions::PartitionStoreExt;

    #[test]
    fn behaves_like_a_partition_store() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.write("a", &vec![1u8, 2]).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.read::<Vec<u8>>("a").unwrap(), Some(vec![1, 2]));

        store.write_raw("a", "garbage").unwrap();
        assert_eq!(store.read::<Vec<u8>>("a").unwrap(), None);

        store.erase("a").unwrap();
        assert!(store.is_empty());
    }
}
