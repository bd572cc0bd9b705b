use async_trait::async_trait;
use crate::eventbus::BotEvent;
use crate::services::event_context::EventContext;
use crate::Error;

/// Base trait for everything subscribed to the event bus.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Returns a unique identifier for this handler
    fn id(&self) -> &str;

    /// Event channels this handler subscribes to, see `BotEvent::event_type`.
    fn event_types(&self) -> Vec<String>;

    /// Process the event. Return Ok(true) if handled, Ok(false) if skipped.
    async fn handle(&self, event: &BotEvent, ctx: &EventContext) -> Result<bool, Error>;

    /// Priority for this handler (lower numbers run first)
    fn priority(&self) -> i32 {
        100
    }

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Metadata about a registered handler.
#[derive(Debug, Clone, PartialEq)]
pub struct EventHandlerInfo {
    pub id: String,
    pub event_types: Vec<String>,
    pub priority: i32,
    pub enabled: bool,
}
