//! Typed repositories over the partition layout.
//!
//! Each repository names the partitions it owns and nothing else, so callers
//! can be handed exactly the storage surface they need.  Every partition
//! store gets all four for free.  Absent and corrupt partitions both load as
//! empty.

use parley_shared::types::AccountId;

use crate::error::Result;
use crate::models::{Account, Conversation, Credentials, Profiles, Story};
use crate::partitions::{keys, PartitionStore, PartitionStoreExt};

/// Credentials and the shared profile directory.
pub trait AccountRepository {
    fn load_credentials(&self) -> Result<Credentials>;
    fn save_credentials(&self, credentials: &Credentials) -> Result<()>;
    fn load_profiles(&self) -> Result<Profiles>;
    fn save_profiles(&self, profiles: &Profiles) -> Result<()>;
}

/// Per-account conversation ledgers.
pub trait LedgerRepository {
    fn load_ledger(&self, owner: &AccountId) -> Result<Vec<Conversation>>;
    fn save_ledger(&self, owner: &AccountId, ledger: &[Conversation]) -> Result<()>;
}

/// The global story feed, stored as-is (no expiry filtering).
pub trait StoryRepository {
    fn load_stories(&self) -> Result<Vec<Story>>;
    fn save_stories(&self, stories: &[Story]) -> Result<()>;
}

/// The current-account snapshot for this client instance.
pub trait SessionRepository {
    fn load_session(&self) -> Result<Option<Account>>;
    fn save_session(&self, account: &Account) -> Result<()>;
    fn clear_session(&self) -> Result<()>;
}

impl<P: PartitionStore + ?Sized> AccountRepository for P {
    fn load_credentials(&self) -> Result<Credentials> {
        Ok(self.read(keys::CREDENTIALS)?.unwrap_or_default())
    }

    fn save_credentials(&self, credentials: &Credentials) -> Result<()> {
        self.write(keys::CREDENTIALS, credentials)
    }

    fn load_profiles(&self) -> Result<Profiles> {
        Ok(self.read(keys::PROFILES)?.unwrap_or_default())
    }

    fn save_profiles(&self, profiles: &Profiles) -> Result<()> {
        self.write(keys::PROFILES, profiles)
    }
}

impl<P: PartitionStore + ?Sized> LedgerRepository for P {
    fn load_ledger(&self, owner: &AccountId) -> Result<Vec<Conversation>> {
        Ok(self.read(&keys::ledger(owner))?.unwrap_or_default())
    }

    fn save_ledger(&self, owner: &AccountId, ledger: &[Conversation]) -> Result<()> {
        self.write(&keys::ledger(owner), ledger)
    }
}

impl<P: PartitionStore + ?Sized> StoryRepository for P {
    fn load_stories(&self) -> Result<Vec<Story>> {
        Ok(self.read(keys::STORIES)?.unwrap_or_default())
    }

    fn save_stories(&self, stories: &[Story]) -> Result<()> {
        self.write(keys::STORIES, stories)
    }
}

impl<P: PartitionStore + ?Sized> SessionRepository for P {
    fn load_session(&self) -> Result<Option<Account>> {
        self.read(keys::SESSION)
    }

    fn save_session(&self, account: &Account) -> Result<()> {
        self.write(keys::SESSION, account)
    }

    fn clear_session(&self) -> Result<()> {
        self.erase(keys::SESSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Profile;
    use crate::{Database, MemoryStore};

    fn uid(s: &str) -> AccountId {
        AccountId::parse(s).unwrap()
    }

    #[test]
    fn empty_store_loads_empty_collections() {
        let store = MemoryStore::new();
        assert!(store.load_credentials().unwrap().is_empty());
        assert!(store.load_profiles().unwrap().is_empty());
        assert!(store.load_ledger(&uid("12345678")).unwrap().is_empty());
        assert!(store.load_stories().unwrap().is_empty());
        assert!(store.load_session().unwrap().is_none());
    }

    #[test]
    fn profiles_round_trip_through_sqlite() {
        let db = Database::open_in_memory().unwrap();
        let mut profiles = Profiles::new();
        profiles.insert(uid("12345678"), Profile::new("Ann"));
        db.save_profiles(&profiles).unwrap();
        assert_eq!(db.load_profiles().unwrap(), profiles);
    }

    #[test]
    fn ledgers_are_per_owner() {
        let store = MemoryStore::new();
        let ann = uid("11111111");
        let bob = uid("22222222");
        store
            .save_ledger(&ann, &[Conversation::new(bob.clone())])
            .unwrap();

        assert_eq!(store.load_ledger(&ann).unwrap().len(), 1);
        assert!(store.load_ledger(&bob).unwrap().is_empty());
    }

    #[test]
    fn corrupt_ledger_loads_empty() {
        let store = MemoryStore::new();
        let ann = uid("11111111");
        store.write_raw(&keys::ledger(&ann), "[{").unwrap();
        assert!(store.load_ledger(&ann).unwrap().is_empty());
    }

    #[test]
    fn session_save_and_clear() {
        let store = MemoryStore::new();
        let account = Account::from_profile(uid("12345678"), &Profile::new("Ann"));
        store.save_session(&account).unwrap();
        assert_eq!(store.load_session().unwrap(), Some(account));

        store.clear_session().unwrap();
        assert!(store.load_session().unwrap().is_none());
    }
}
