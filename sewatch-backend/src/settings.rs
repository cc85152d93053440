//! Typed access to the watcher's persisted configuration.

use sewatch_db::{KeyValueStore, keys};

/// Log channel, leave subscribers and suggestions, on top of any store.
#[derive(Clone)]
pub struct Settings<S> {
    store: S,
}

impl<S: KeyValueStore> Settings<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn log_channel(&self) -> sewatch_db::Result<Option<String>> {
        self.store.get(keys::LOG_CHANNEL).await
    }

    pub async fn set_log_channel(&self, channel_id: &str) -> sewatch_db::Result<()> {
        self.store.set(keys::LOG_CHANNEL, channel_id).await
    }

    /// Returns false if the user was already subscribed.
    pub async fn subscribe(&self, user_id: &str) -> sewatch_db::Result<bool> {
        self.store.set_add(keys::LEAVE_SUBSCRIBERS, user_id).await
    }

    /// Returns false if the user was not subscribed.
    pub async fn unsubscribe(&self, user_id: &str) -> sewatch_db::Result<bool> {
        self.store.set_remove(keys::LEAVE_SUBSCRIBERS, user_id).await
    }

    pub async fn is_subscribed(&self, user_id: &str) -> sewatch_db::Result<bool> {
        self.store.set_member(keys::LEAVE_SUBSCRIBERS, user_id).await
    }

    pub async fn subscribers(&self) -> sewatch_db::Result<Vec<String>> {
        self.store.set_members(keys::LEAVE_SUBSCRIBERS).await
    }

    pub async fn suggest(&self, text: &str) -> sewatch_db::Result<()> {
        self.store.list_append(keys::SUGGESTIONS, text).await
    }

    pub async fn suggestions(&self) -> sewatch_db::Result<Vec<String>> {
        self.store.list_range(keys::SUGGESTIONS).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sewatch_db::MemoryStore;

    #[tokio::test]
    async fn test_subscription_round() {
        let settings = Settings::new(MemoryStore::new());

        assert!(settings.subscribe("1").await.unwrap());
        assert!(!settings.subscribe("1").await.unwrap());
        assert!(settings.is_subscribed("1").await.unwrap());

        assert!(settings.unsubscribe("1").await.unwrap());
        assert!(!settings.is_subscribed("1").await.unwrap());
        assert!(settings.subscribers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_log_channel_and_suggestions() {
        let settings = Settings::new(MemoryStore::new());
        assert_eq!(settings.log_channel().await.unwrap(), None);

        settings.set_log_channel("555").await.unwrap();
        assert_eq!(settings.log_channel().await.unwrap().as_deref(), Some("555"));

        settings.suggest("more uranium").await.unwrap();
        assert_eq!(settings.suggestions().await.unwrap(), vec!["more uranium"]);
    }
}
