use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

use crate::eventbus::{BotEvent, EventBus};
use crate::services::event_context::EventContext;
use crate::services::event_registry::EventHandlerRegistry;

/// Listens on the EventBus and hands every event to the handlers registered
/// for its channel.
///
/// Each event runs on its own tracked task, so a slow server query in one
/// handler never stops the loop from receiving the next event. Handlers for
/// the same event still run one after another in priority order.
pub struct EventDispatchService {
    event_bus: Arc<EventBus>,
    registry: Arc<EventHandlerRegistry>,
    context: Arc<EventContext>,
    tracker: TaskTracker,
}

impl EventDispatchService {
    pub fn new(
        event_bus: Arc<EventBus>,
        registry: Arc<EventHandlerRegistry>,
        context: Arc<EventContext>,
        tracker: TaskTracker,
    ) -> Self {
        Self {
            event_bus,
            registry,
            context,
            tracker,
        }
    }

    /// Runs until the bus is shut down or every publisher is gone.
    pub async fn start(&self, mut rx: tokio::sync::mpsc::Receiver<BotEvent>) {
        let mut shutdown_rx = self.event_bus.shutdown_rx.clone();
        info!("EventDispatchService: Started, listening on EventBus");

        loop {
            tokio::select! {
                maybe_event = rx.recv() => {
                    match maybe_event {
                        Some(event) => self.spawn_dispatch(event),
                        None => {
                            debug!("EventDispatchService: EventBus closed");
                            break;
                        }
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!("EventDispatchService: Shutting down listener loop");
    }

    fn spawn_dispatch(&self, event: BotEvent) {
        let registry = self.registry.clone();
        let context = self.context.clone();
        self.tracker.spawn(async move {
            dispatch_event(&registry, &context, &event).await;
        });
    }
}

/// Runs every enabled handler for `event` in priority order. Handler errors
/// are logged and do not stop the remaining handlers.
pub async fn dispatch_event(registry: &EventHandlerRegistry, context: &EventContext, event: &BotEvent) {
    let event_type = event.event_type();
    let handlers = registry.get_handlers(event_type).await;

    if handlers.is_empty() {
        debug!("EventDispatchService: No handlers registered for '{event_type}'");
        return;
    }

    debug!("EventDispatchService: Found {} handlers for '{event_type}'", handlers.len());
    for handler in handlers {
        match handler.handle(event, context).await {
            Ok(true) => {
                debug!("EventDispatchService: Handler '{}' processed event successfully", handler.id());
            }
            Ok(false) => {
                debug!("EventDispatchService: Handler '{}' skipped event", handler.id());
            }
            Err(e) => {
                error!("EventDispatchService: Handler '{}' failed: {e}", handler.id());
            }
        }
    }
}

/// Subscribes to the bus and spawns the dispatch loop. The subscription is
/// taken before returning, so no event published afterwards is missed.
pub async fn spawn_event_dispatch_task(
    event_bus: Arc<EventBus>,
    registry: Arc<EventHandlerRegistry>,
    context: Arc<EventContext>,
    tracker: TaskTracker,
) -> JoinHandle<()> {
    let rx = event_bus.subscribe(None).await;
    let service = EventDispatchService::new(event_bus, registry, context, tracker);
    tokio::spawn(async move {
        service.start(rx).await;
    })
}
