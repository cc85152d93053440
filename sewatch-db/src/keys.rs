//! Well-known keys shared by the watcher and the chat commands.

/// Channel id that receives join/leave/availability notifications.
pub const LOG_CHANNEL: &str = "log_channel";

/// Set of user ids that asked to be pinged when a player leaves.
pub const LEAVE_SUBSCRIBERS: &str = "leave_subscribers";

/// Append-only list of free-text suggestions.
pub const SUGGESTIONS: &str = "suggestions";
