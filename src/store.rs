use crate::error::Result;
use sled::Tree;
use std::{
    collections::HashMap,
    sync::{
        Mutex,
        MutexGuard,
        PoisonError,
    },
};

/// Durable key-value cells injected by the application session.
///
/// The session owns the store's lifecycle; the client never reaches for
/// ambient storage.
pub trait Store: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// `sled`-backed store used by real sessions.
pub struct SledStore(Tree);

impl SledStore {
    pub fn new(tree: Tree) -> Self {
        Self(tree)
    }
}

impl Store for SledStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.0.get(key)?.map(|ivec| ivec.to_vec()))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.0.insert(key, value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.0.remove(key)?;
        Ok(())
    }
}

/// In-memory store for tests and throwaway sessions.
#[derive(Default)]
pub struct MemStore(Mutex<HashMap<String, Vec<u8>>>);

impl MemStore {
    fn cells(&self) -> MutexGuard<HashMap<String, Vec<u8>>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for MemStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.cells().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.cells().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.cells().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sled_store_round_trips_cells() {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .unwrap();
        let store = SledStore::new(db.open_tree("polls").unwrap());
        assert_eq!(store.get("poll_votes_0").unwrap(), None);
        store.set("poll_votes_0", b"[1,2]").unwrap();
        assert_eq!(
            store.get("poll_votes_0").unwrap(),
            Some(b"[1,2]".to_vec())
        );
        store.remove("poll_votes_0").unwrap();
        assert_eq!(store.get("poll_votes_0").unwrap(), None);
    }
}
