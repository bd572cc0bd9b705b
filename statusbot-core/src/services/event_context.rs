use std::sync::Arc;
use statusbot_common::traits::ChatPlatform;

/// What every handler gets alongside the event: the platform to answer on.
#[derive(Clone)]
pub struct EventContext {
    pub chat: Arc<dyn ChatPlatform>,
}

impl EventContext {
    pub fn new(chat: Arc<dyn ChatPlatform>) -> Self {
        Self { chat }
    }
}
