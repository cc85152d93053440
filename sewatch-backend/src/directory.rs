//! Player list client for the game server's query API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::FetchError;

/// One connected player as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    pub name: String,
    pub playtime_seconds: u64,
}

/// Players connected at the time of one fetch, in the order the server lists them.
pub type PlayerSnapshot = Vec<PlayerRecord>;

/// Wire format of one entry in the `/players` response.
#[derive(Debug, Deserialize)]
struct RawPlayer {
    name: String,
    raw: RawStats,
}

#[derive(Debug, Deserialize)]
struct RawStats {
    time: u64,
}

impl From<RawPlayer> for PlayerRecord {
    fn from(raw: RawPlayer) -> Self {
        Self {
            name: raw.name,
            playtime_seconds: raw.raw.time,
        }
    }
}

/// Parse a `/players` response body.
pub fn parse_snapshot(body: &[u8]) -> Result<PlayerSnapshot, FetchError> {
    let players: Vec<RawPlayer> =
        serde_json::from_slice(body).map_err(|e| FetchError::MalformedBody(e.to_string()))?;
    Ok(players.into_iter().map(PlayerRecord::from).collect())
}

/// Source of player snapshots.
#[async_trait]
pub trait PlayerDirectory: Send + Sync {
    async fn fetch(&self) -> Result<PlayerSnapshot, FetchError>;
}

/// HTTP client for the player list endpoint.
#[derive(Debug, Clone)]
pub struct PlayerDirectoryClient {
    client: Client,
    url: String,
}

impl PlayerDirectoryClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Transport)?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl PlayerDirectory for PlayerDirectoryClient {
    async fn fetch(&self) -> Result<PlayerSnapshot, FetchError> {
        let resp = self.client.get(&self.url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::BadStatus(status));
        }

        let body = resp.bytes().await?;
        let snapshot = parse_snapshot(&body)?;
        debug!(players = snapshot.len(), "fetched player list");
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_players() {
        let body = br#"[
            {"name": "Alice", "raw": {"time": 120, "score": 0}},
            {"name": "Bob", "raw": {"time": 7200}, "ping": 30}
        ]"#;
        let snapshot = parse_snapshot(body).unwrap();
        assert_eq!(
            snapshot,
            vec![
                PlayerRecord {
                    name: "Alice".to_string(),
                    playtime_seconds: 120
                },
                PlayerRecord {
                    name: "Bob".to_string(),
                    playtime_seconds: 7200
                },
            ]
        );
    }

    #[test]
    fn test_parse_empty_list() {
        assert!(parse_snapshot(b"[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_missing_time() {
        let result = parse_snapshot(br#"[{"name": "Alice", "raw": {}}]"#);
        assert!(matches!(result, Err(FetchError::MalformedBody(_))));
    }

    #[test]
    fn test_parse_rejects_mistyped_fields() {
        let result = parse_snapshot(br#"[{"name": 5, "raw": {"time": 1}}]"#);
        assert!(matches!(result, Err(FetchError::MalformedBody(_))));

        let result = parse_snapshot(br#"[{"name": "Alice", "raw": {"time": -3}}]"#);
        assert!(matches!(result, Err(FetchError::MalformedBody(_))));
    }

    #[test]
    fn test_parse_rejects_non_array() {
        let result = parse_snapshot(br#"{"error": "Players data not found in response"}"#);
        assert!(matches!(result, Err(FetchError::MalformedBody(_))));

        let result = parse_snapshot(b"not json");
        assert!(matches!(result, Err(FetchError::MalformedBody(_))));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // nothing listens on the discard port
        let client = PlayerDirectoryClient::new("http://127.0.0.1:9/players", Duration::from_secs(2)).unwrap();
        let result = client.fetch().await;
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }
}
