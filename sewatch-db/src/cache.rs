//! In-memory key-value store.
//!
//! Lock-free `scc` maps standing in for the SQLite store in tests and for
//! throwaway runs where nothing needs to survive a restart.

use async_trait::async_trait;
use scc::hash_map::Entry;

use crate::{KeyValueStore, Result};

#[derive(Default)]
pub struct MemoryStore {
    values: scc::HashMap<String, String>,
    /// Set members in insertion order.
    sets: scc::HashMap<String, Vec<String>>,
    lists: scc::HashMap<String, Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read_async(key, |_, v| v.clone()).await)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        match self.values.entry_async(key.to_string()).await {
            Entry::Occupied(mut entry) => *entry.get_mut() = value.to_string(),
            Entry::Vacant(entry) => {
                entry.insert_entry(value.to_string());
            }
        }
        Ok(())
    }

    async fn set_member(&self, set_key: &str, member: &str) -> Result<bool> {
        Ok(self
            .sets
            .read_async(set_key, |_, members| members.iter().any(|m| m == member))
            .await
            .unwrap_or(false))
    }

    async fn set_add(&self, set_key: &str, member: &str) -> Result<bool> {
        let mut entry = self.sets.entry_async(set_key.to_string()).await.or_default();
        let members = entry.get_mut();
        if members.iter().any(|m| m == member) {
            return Ok(false);
        }
        members.push(member.to_string());
        Ok(true)
    }

    async fn set_remove(&self, set_key: &str, member: &str) -> Result<bool> {
        let removed = self
            .sets
            .update_async(set_key, |_, members| {
                match members.iter().position(|m| m == member) {
                    Some(idx) => {
                        members.remove(idx);
                        true
                    }
                    None => false,
                }
            })
            .await;
        Ok(removed.unwrap_or(false))
    }

    async fn set_members(&self, set_key: &str) -> Result<Vec<String>> {
        Ok(self
            .sets
            .read_async(set_key, |_, members| members.clone())
            .await
            .unwrap_or_default())
    }

    async fn list_append(&self, list_key: &str, value: &str) -> Result<()> {
        let mut entry = self.lists.entry_async(list_key.to_string()).await.or_default();
        entry.get_mut().push(value.to_string());
        Ok(())
    }

    async fn list_range(&self, list_key: &str) -> Result<Vec<String>> {
        Ok(self
            .lists
            .read_async(list_key, |_, items| items.clone())
            .await
            .unwrap_or_default())
    }
}
