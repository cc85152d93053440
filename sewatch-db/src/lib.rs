mod cache;
mod error;
pub mod keys;

pub use cache::MemoryStore;
pub use error::{Result, StoreError};

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_rusqlite::Connection;
use tokio_rusqlite::rusqlite::{self, OptionalExtension, params};
use tracing::{debug, info};

/// Durable string values, string sets and append-only string lists.
///
/// Implementations must be safe to share between the poll loop (reads) and
/// chat commands (writes).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
  /// Value stored under `key`, if any.
  async fn get(&self, key: &str) -> Result<Option<String>>;

  /// Store `value` under `key`, replacing any previous value.
  async fn set(&self, key: &str, value: &str) -> Result<()>;

  /// Whether `member` belongs to the set at `set_key`.
  async fn set_member(&self, set_key: &str, member: &str) -> Result<bool>;

  /// Add `member` to the set. Returns false if it was already present.
  async fn set_add(&self, set_key: &str, member: &str) -> Result<bool>;

  /// Remove `member` from the set. Returns false if it was not present.
  async fn set_remove(&self, set_key: &str, member: &str) -> Result<bool>;

  /// All members of the set in the order they were added.
  async fn set_members(&self, set_key: &str) -> Result<Vec<String>>;

  async fn list_append(&self, list_key: &str, value: &str) -> Result<()>;

  /// Whole list, oldest first.
  async fn list_range(&self, list_key: &str) -> Result<Vec<String>>;
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
  async fn get(&self, key: &str) -> Result<Option<String>> {
    (**self).get(key).await
  }

  async fn set(&self, key: &str, value: &str) -> Result<()> {
    (**self).set(key, value).await
  }

  async fn set_member(&self, set_key: &str, member: &str) -> Result<bool> {
    (**self).set_member(set_key, member).await
  }

  async fn set_add(&self, set_key: &str, member: &str) -> Result<bool> {
    (**self).set_add(set_key, member).await
  }

  async fn set_remove(&self, set_key: &str, member: &str) -> Result<bool> {
    (**self).set_remove(set_key, member).await
  }

  async fn set_members(&self, set_key: &str) -> Result<Vec<String>> {
    (**self).set_members(set_key).await
  }

  async fn list_append(&self, list_key: &str, value: &str) -> Result<()> {
    (**self).list_append(list_key, value).await
  }

  async fn list_range(&self, list_key: &str) -> Result<Vec<String>> {
    (**self).list_range(list_key).await
  }
}

/// SQLite-backed store. Cloning shares the underlying connection thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn: Connection,
}

impl SqliteStore {
  /// Open or create a store at the given path.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = Connection::open(path).await?;
    let store = Self { conn };
    store.initialize().await?;
    Ok(store)
  }

  /// Create an in-memory store (useful for testing).
  pub async fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory().await?;
    let store = Self { conn };
    store.initialize().await?;
    Ok(store)
  }

  async fn initialize(&self) -> Result<()> {
    self
      .conn
      .call(|conn| -> rusqlite::Result<()> {
        // WAL keeps command writes from blocking dispatch reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        conn.execute_batch(
          r#"
                    CREATE TABLE IF NOT EXISTS kv_values (
                        key TEXT PRIMARY KEY,
                        value TEXT NOT NULL
                    );

                    CREATE TABLE IF NOT EXISTS set_members (
                        set_key TEXT NOT NULL,
                        member TEXT NOT NULL,
                        PRIMARY KEY (set_key, member)
                    );

                    -- id gives append order
                    CREATE TABLE IF NOT EXISTS list_items (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        list_key TEXT NOT NULL,
                        value TEXT NOT NULL
                    );

                    CREATE INDEX IF NOT EXISTS idx_list_items_key ON list_items(list_key);
                    "#,
        )?;
        Ok(())
      })
      .await?;

    info!("store initialized");
    Ok(())
  }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
  async fn get(&self, key: &str) -> Result<Option<String>> {
    let key = key.to_string();
    let value = self
      .conn
      .call(move |conn| -> rusqlite::Result<Option<String>> {
        conn
          .prepare_cached("SELECT value FROM kv_values WHERE key = ?1")?
          .query_row(params![&key], |row| row.get(0))
          .optional()
      })
      .await?;

    Ok(value)
  }

  async fn set(&self, key: &str, value: &str) -> Result<()> {
    let key = key.to_string();
    let value = value.to_string();
    let key_log = key.clone();

    self
      .conn
      .call(move |conn| -> rusqlite::Result<()> {
        conn
          .prepare_cached(
            "INSERT INTO kv_values (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
          )?
          .execute(params![&key, &value])?;
        Ok(())
      })
      .await?;

    debug!(key = %key_log, "stored value");
    Ok(())
  }

  async fn set_member(&self, set_key: &str, member: &str) -> Result<bool> {
    let set_key = set_key.to_string();
    let member = member.to_string();
    let exists = self
      .conn
      .call(move |conn| -> rusqlite::Result<bool> {
        conn
          .prepare_cached(
            "SELECT EXISTS(SELECT 1 FROM set_members WHERE set_key = ?1 AND member = ?2)",
          )?
          .query_row(params![&set_key, &member], |row| row.get(0))
      })
      .await?;

    Ok(exists)
  }

  async fn set_add(&self, set_key: &str, member: &str) -> Result<bool> {
    let set_key = set_key.to_string();
    let member = member.to_string();
    let set_key_log = set_key.clone();

    let inserted = self
      .conn
      .call(move |conn| -> rusqlite::Result<usize> {
        conn
          .prepare_cached("INSERT OR IGNORE INTO set_members (set_key, member) VALUES (?1, ?2)")?
          .execute(params![&set_key, &member])
      })
      .await?;

    debug!(set_key = %set_key_log, inserted, "set add");
    Ok(inserted > 0)
  }

  async fn set_remove(&self, set_key: &str, member: &str) -> Result<bool> {
    let set_key = set_key.to_string();
    let member = member.to_string();
    let set_key_log = set_key.clone();

    let deleted = self
      .conn
      .call(move |conn| -> rusqlite::Result<usize> {
        conn
          .prepare_cached("DELETE FROM set_members WHERE set_key = ?1 AND member = ?2")?
          .execute(params![&set_key, &member])
      })
      .await?;

    debug!(set_key = %set_key_log, deleted, "set remove");
    Ok(deleted > 0)
  }

  async fn set_members(&self, set_key: &str) -> Result<Vec<String>> {
    let set_key = set_key.to_string();
    let members = self
      .conn
      .call(move |conn| -> rusqlite::Result<Vec<String>> {
        let mut stmt = conn
          .prepare_cached("SELECT member FROM set_members WHERE set_key = ?1 ORDER BY rowid")?;

        let members = stmt
          .query_map(params![&set_key], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(members)
      })
      .await?;

    Ok(members)
  }

  async fn list_append(&self, list_key: &str, value: &str) -> Result<()> {
    let list_key = list_key.to_string();
    let value = value.to_string();
    let list_key_log = list_key.clone();

    self
      .conn
      .call(move |conn| -> rusqlite::Result<()> {
        conn
          .prepare_cached("INSERT INTO list_items (list_key, value) VALUES (?1, ?2)")?
          .execute(params![&list_key, &value])?;
        Ok(())
      })
      .await?;

    debug!(list_key = %list_key_log, "appended to list");
    Ok(())
  }

  async fn list_range(&self, list_key: &str) -> Result<Vec<String>> {
    let list_key = list_key.to_string();
    let items = self
      .conn
      .call(move |conn| -> rusqlite::Result<Vec<String>> {
        let mut stmt =
          conn.prepare_cached("SELECT value FROM list_items WHERE list_key = ?1 ORDER BY id")?;

        let items = stmt
          .query_map(params![&list_key], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(items)
      })
      .await?;

    Ok(items)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_value_lifecycle() {
    let store = SqliteStore::open_in_memory().await.unwrap();

    assert!(store.get(keys::LOG_CHANNEL).await.unwrap().is_none());

    store.set(keys::LOG_CHANNEL, "123456789").await.unwrap();
    assert_eq!(
      store.get(keys::LOG_CHANNEL).await.unwrap().as_deref(),
      Some("123456789")
    );

    // Overwrite
    store.set(keys::LOG_CHANNEL, "987654321").await.unwrap();
    assert_eq!(
      store.get(keys::LOG_CHANNEL).await.unwrap().as_deref(),
      Some("987654321")
    );
  }

  #[tokio::test]
  async fn test_set_lifecycle() {
    let store = SqliteStore::open_in_memory().await.unwrap();

    assert!(store.set_add(keys::LEAVE_SUBSCRIBERS, "42").await.unwrap());
    assert!(store.set_add(keys::LEAVE_SUBSCRIBERS, "7").await.unwrap());

    // Adding twice is a no-op
    assert!(!store.set_add(keys::LEAVE_SUBSCRIBERS, "42").await.unwrap());

    assert!(store.set_member(keys::LEAVE_SUBSCRIBERS, "42").await.unwrap());
    assert!(!store.set_member(keys::LEAVE_SUBSCRIBERS, "99").await.unwrap());

    let members = store.set_members(keys::LEAVE_SUBSCRIBERS).await.unwrap();
    assert_eq!(members, vec!["42", "7"]);

    assert!(store.set_remove(keys::LEAVE_SUBSCRIBERS, "42").await.unwrap());
    assert!(!store.set_remove(keys::LEAVE_SUBSCRIBERS, "42").await.unwrap());
    assert_eq!(
      store.set_members(keys::LEAVE_SUBSCRIBERS).await.unwrap(),
      vec!["7"]
    );
  }

  #[tokio::test]
  async fn test_sets_are_independent() {
    let store = SqliteStore::open_in_memory().await.unwrap();

    store.set_add("a", "1").await.unwrap();
    store.set_add("b", "2").await.unwrap();

    assert_eq!(store.set_members("a").await.unwrap(), vec!["1"]);
    assert_eq!(store.set_members("b").await.unwrap(), vec!["2"]);
    assert!(store.set_members("c").await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_list_append_order() {
    let store = SqliteStore::open_in_memory().await.unwrap();

    assert!(store.list_range(keys::SUGGESTIONS).await.unwrap().is_empty());

    store
      .list_append(keys::SUGGESTIONS, "add a second server")
      .await
      .unwrap();
    store
      .list_append(keys::SUGGESTIONS, "weekly restarts")
      .await
      .unwrap();
    store
      .list_append(keys::SUGGESTIONS, "add a second server")
      .await
      .unwrap();

    let items = store.list_range(keys::SUGGESTIONS).await.unwrap();
    assert_eq!(
      items,
      vec!["add a second server", "weekly restarts", "add a second server"]
    );
  }

  #[tokio::test]
  async fn test_shared_through_arc() {
    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let clone = store.clone();

    clone.set("k", "v").await.unwrap();
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
  }

  #[tokio::test]
  async fn test_reopen_file_persists() {
    let path = std::env::temp_dir().join(format!("sewatch-test-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);

    {
      let store = SqliteStore::open(&path).await.unwrap();
      store.set(keys::LOG_CHANNEL, "55").await.unwrap();
      store.set_add(keys::LEAVE_SUBSCRIBERS, "1").await.unwrap();
    }

    let store = SqliteStore::open(&path).await.unwrap();
    assert_eq!(store.get(keys::LOG_CHANNEL).await.unwrap().as_deref(), Some("55"));
    assert_eq!(
      store.set_members(keys::LEAVE_SUBSCRIBERS).await.unwrap(),
      vec!["1"]
    );

    for suffix in ["", "-wal", "-shm"] {
      let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
  }
}
