use thiserror::Error;

/// Why a player-list fetch did not produce a snapshot.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected status {0}")]
    BadStatus(reqwest::StatusCode),

    #[error("malformed player list: {0}")]
    MalformedBody(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::MalformedBody(err.to_string())
        } else {
            FetchError::Transport(err)
        }
    }
}

/// Why a single notification was not delivered.
#[derive(Debug, Error, PartialEq)]
pub enum DispatchError {
    #[error("no destination configured")]
    UnresolvedDestination,

    #[error("send failed: {0}")]
    SendFailed(String),
}
