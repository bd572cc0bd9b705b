use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

use crate::Error;
use crate::cache::StatusCache;
use crate::eventbus::BotEvent;
use crate::services::event_context::EventContext;
use crate::services::event_handler::EventHandler;
use statusbot_common::models::StatusSnapshot;
use statusbot_common::traits::{ChatPlatform, StatusSource};

/// What one refresh call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Published(StatusSnapshot),
    Unchanged(StatusSnapshot),
    QueryFailed,
    /// The reading was cached even though the presence update failed.
    PublishFailed(StatusSnapshot),
    /// Another call was already refreshing and picked this request up.
    Coalesced,
}

/// Mirrors the game server's player count into the bot's presence.
///
/// Refresh requests coalesce: while one cycle runs, any number of further
/// requests collapse into a single follow-up cycle run by the same caller.
pub struct PresencePublisher {
    source: Arc<dyn StatusSource>,
    cache: Arc<StatusCache>,
    /// Held for a whole query / compare / publish cycle.
    cycle: Mutex<()>,
    /// A refresh was requested since the last cycle started.
    dirty: AtomicBool,
    /// The next cycle must publish even if the count is unchanged.
    force: AtomicBool,
}

impl PresencePublisher {
    pub fn new(source: Arc<dyn StatusSource>, cache: Arc<StatusCache>) -> Self {
        Self {
            source,
            cache,
            cycle: Mutex::new(()),
            dirty: AtomicBool::new(false),
            force: AtomicBool::new(false),
        }
    }

    pub fn cache(&self) -> &Arc<StatusCache> {
        &self.cache
    }

    /// Publishes only when the player count moved.
    pub async fn refresh(&self, chat: &dyn ChatPlatform) -> PublishOutcome {
        self.request(chat, false).await
    }

    /// Publishes the fresh reading even when the count is unchanged. A new
    /// gateway session starts with no presence, so READY uses this.
    pub async fn refresh_forced(&self, chat: &dyn ChatPlatform) -> PublishOutcome {
        self.request(chat, true).await
    }

    async fn request(&self, chat: &dyn ChatPlatform, force: bool) -> PublishOutcome {
        if force {
            self.force.store(true, Ordering::Release);
        }
        self.dirty.store(true, Ordering::Release);

        let mut outcome = PublishOutcome::Coalesced;
        loop {
            let Ok(guard) = self.cycle.try_lock() else {
                trace!("(PresencePublisher) Refresh already running; coalesced");
                return outcome;
            };
            while self.dirty.swap(false, Ordering::AcqRel) {
                let force = self.force.swap(false, Ordering::AcqRel);
                outcome = self.run_cycle(chat, force).await;
            }
            drop(guard);

            // A request that arrived between the last check and the unlock
            // saw the lock held and left; pick it up here.
            if !self.dirty.load(Ordering::Acquire) {
                return outcome;
            }
        }
    }

    async fn run_cycle(&self, chat: &dyn ChatPlatform, force: bool) -> PublishOutcome {
        let snapshot = match self.source.query().await {
            Ok(s) => s,
            Err(e) => {
                warn!("(PresencePublisher) Status query failed: {e}");
                if force {
                    // Keep the forced publish pending for the next reading.
                    self.force.store(true, Ordering::Release);
                }
                return PublishOutcome::QueryFailed;
            }
        };

        let changed = self.cache.compare_and_set(snapshot);
        if !changed && !force {
            debug!("(PresencePublisher) Player count unchanged at {snapshot}");
            return PublishOutcome::Unchanged(snapshot);
        }

        let text = snapshot.presence_text();
        match chat.update_presence(&text).await {
            Ok(()) => {
                info!("(PresencePublisher) Presence set to '{text}'");
                PublishOutcome::Published(snapshot)
            }
            Err(e) => {
                warn!("(PresencePublisher) Failed to publish '{text}': {e}");
                PublishOutcome::PublishFailed(snapshot)
            }
        }
    }
}

#[async_trait]
impl EventHandler for PresencePublisher {
    fn id(&self) -> &str {
        "status.presence_publisher"
    }

    fn event_types(&self) -> Vec<String> {
        vec!["presence.update".to_string(), "ready".to_string()]
    }

    async fn handle(&self, event: &BotEvent, ctx: &EventContext) -> Result<bool, Error> {
        let outcome = match event {
            BotEvent::Ready { .. } => self.refresh_forced(ctx.chat.as_ref()).await,
            BotEvent::PresenceUpdate { .. } => self.refresh(ctx.chat.as_ref()).await,
            _ => return Ok(false),
        };
        Ok(matches!(outcome, PublishOutcome::Published(_)))
    }
}
