// File: statusbot-common/src/traits/api.rs
//
// The two collaborators the bridge talks to. Handlers only ever see these
// traits, so tests can swap in fakes for both sides.

use async_trait::async_trait;

use crate::error::Error;
use crate::models::StatusSnapshot;

/// A game server that can be asked for its current player counts.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// One query round-trip. Failures are transient and leave no state behind.
    async fn query(&self) -> Result<StatusSnapshot, Error>;

    /// Releases the underlying connection. Safe to call more than once.
    async fn close(&self);
}

/// The outbound half of a chat platform session.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<(), Error>;

    /// Replaces the bot's own presence/status line.
    async fn update_presence(&self, text: &str) -> Result<(), Error>;
}
