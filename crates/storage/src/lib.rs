//! A generic, durable key-value store backing the frontier's persistent
//! URL map. Plays the same role `shelve` plays in the original
//! implementation: open-or-create, insert with a durable flush, and
//! enumerate on restart.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Value stored per fingerprint: the normalized URL and whether its
/// fetch-and-analyze cycle has completed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UrlRecord {
    pub url: String,
    pub completed: bool,
}

#[derive(Clone)]
pub struct Store {
    tree: sled::Db,
}

impl Store {
    /// Open the store at `path`, creating it if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let tree = sled::open(path.as_ref())
            .with_context(|| format!("opening sled store at {}", path.as_ref().display()))?;
        Ok(Self { tree })
    }

    pub fn get(&self, key: &str) -> Result<Option<UrlRecord>> {
        match self.tree.get(key)? {
            Some(bytes) => Ok(Some(
                bincode::deserialize(&bytes).context("decoding url record")?,
            )),
            None => Ok(None),
        }
    }

    /// Insert `value` under `key`, flushing durably before returning.
    pub fn insert(&self, key: &str, value: &UrlRecord) -> Result<()> {
        let bytes = bincode::serialize(value).context("encoding url record")?;
        self.tree.insert(key, bytes)?;
        self.tree.flush().context("flushing store")?;
        Ok(())
    }

    pub fn contains_key(&self, key: &str) -> Result<bool> {
        Ok(self.tree.contains_key(key)?)
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Iterate all `(fingerprint, record)` pairs. Used on restart to
    /// reseed the in-memory FIFO.
    pub fn iter(&self) -> impl Iterator<Item = Result<(String, UrlRecord)>> + '_ {
        self.tree.iter().map(|entry| {
            let (key, value) = entry?;
            let key = String::from_utf8(key.to_vec()).context("non-utf8 key")?;
            let value: UrlRecord = bincode::deserialize(&value).context("decoding url record")?;
            Ok((key, value))
        })
    }

    /// Drop all entries — used when `restart=true`.
    pub fn clear(&self) -> Result<()> {
        self.tree.clear()?;
        self.tree.flush().context("flushing store after clear")?;
        info!("cleared persistent store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("frontier.sled")).unwrap();
        (dir, store)
    }

    #[test]
    fn insert_and_get_round_trips() {
        let (_dir, store) = open_temp();
        let rec = UrlRecord {
            url: "http://www.ics.uci.edu/".to_string(),
            completed: false,
        };
        store.insert("abc123", &rec).unwrap();
        assert_eq!(store.get("abc123").unwrap(), Some(rec));
    }

    #[test]
    fn missing_key_is_none() {
        let (_dir, store) = open_temp();
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn clear_empties_the_store() {
        let (_dir, store) = open_temp();
        store
            .insert(
                "k",
                &UrlRecord {
                    url: "http://cs.uci.edu/".to_string(),
                    completed: false,
                },
            )
            .unwrap();
        assert!(!store.is_empty());
        store.clear().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn iter_yields_all_entries() {
        let (_dir, store) = open_temp();
        for i in 0..3 {
            store
                .insert(
                    &format!("k{i}"),
                    &UrlRecord {
                        url: format!("http://cs.uci.edu/{i}"),
                        completed: i % 2 == 0,
                    },
                )
                .unwrap();
        }
        let collected: Result<Vec<_>> = store.iter().collect();
        assert_eq!(collected.unwrap().len(), 3);
    }
}
