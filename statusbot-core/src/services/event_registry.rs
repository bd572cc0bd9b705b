use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, debug};

use crate::Error;
use crate::services::event_handler::{EventHandler, EventHandlerInfo};

/// Named event channels and the handlers subscribed to each, in priority order.
pub struct EventHandlerRegistry {
    /// event_type -> handlers sorted by priority
    handlers: Arc<RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>>,
    /// handler id -> handler
    handlers_by_id: Arc<RwLock<HashMap<String, Arc<dyn EventHandler>>>>,
}

impl Default for EventHandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
            handlers_by_id: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a new event handler. Ids must be unique.
    pub async fn register(&self, handler: Arc<dyn EventHandler>) -> Result<(), Error> {
        let handler_id = handler.id().to_string();
        let event_types = handler.event_types();
        let priority = handler.priority();

        info!(
            "Registering event handler '{}' for events {:?} with priority {}",
            handler_id, event_types, priority
        );

        {
            let mut id_map = self.handlers_by_id.write().await;
            if id_map.contains_key(&handler_id) {
                return Err(Error::EventBus(format!(
                    "Handler with ID '{}' already registered",
                    handler_id
                )));
            }
            id_map.insert(handler_id.clone(), handler.clone());
        }

        let mut handlers_map = self.handlers.write().await;
        for event_type in &event_types {
            let handler_list = handlers_map.entry(event_type.clone()).or_default();

            // Equal priorities keep registration order.
            let insert_pos = handler_list.partition_point(|h| h.priority() <= priority);
            handler_list.insert(insert_pos, handler.clone());

            debug!(
                "Handler '{}' registered for {} at position {}",
                handler_id, event_type, insert_pos
            );
        }

        Ok(())
    }

    /// Unregister a handler by ID
    pub async fn unregister(&self, handler_id: &str) -> Result<(), Error> {
        info!("Unregistering event handler '{}'", handler_id);

        let handler = {
            let mut id_map = self.handlers_by_id.write().await;
            id_map.remove(handler_id).ok_or_else(|| {
                Error::EventBus(format!("Handler '{}' not found", handler_id))
            })?
        };

        let mut handlers_map = self.handlers.write().await;
        for event_type in handler.event_types() {
            if let Some(handler_list) = handlers_map.get_mut(&event_type) {
                handler_list.retain(|h| h.id() != handler_id);
                if handler_list.is_empty() {
                    handlers_map.remove(&event_type);
                }
            }
        }

        Ok(())
    }

    /// Enabled handlers for one event channel, lowest priority number first.
    pub async fn get_handlers(&self, event_type: &str) -> Vec<Arc<dyn EventHandler>> {
        let handlers = self.handlers.read().await;
        handlers
            .get(event_type)
            .map(|list| list.iter().filter(|h| h.is_enabled()).cloned().collect())
            .unwrap_or_default()
    }

    pub async fn get_handler(&self, handler_id: &str) -> Option<Arc<dyn EventHandler>> {
        let handlers = self.handlers_by_id.read().await;
        handlers.get(handler_id).cloned()
    }

    pub async fn list_handlers(&self) -> Vec<EventHandlerInfo> {
        let handlers = self.handlers_by_id.read().await;
        let mut infos: Vec<EventHandlerInfo> = handlers
            .values()
            .map(|h| EventHandlerInfo {
                id: h.id().to_string(),
                event_types: h.event_types(),
                priority: h.priority(),
                enabled: h.is_enabled(),
            })
            .collect();
        infos.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        infos
    }

    pub async fn clear(&self) {
        let mut handlers = self.handlers.write().await;
        let mut handlers_by_id = self.handlers_by_id.write().await;

        handlers.clear();
        handlers_by_id.clear();

        info!("Cleared all event handlers from registry");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::eventbus::BotEvent;
    use crate::services::event_context::EventContext;

    struct TestHandler {
        id: String,
        event_types: Vec<String>,
        priority: i32,
        enabled: bool,
    }

    impl TestHandler {
        fn new(id: &str, event_type: &str, priority: i32) -> Self {
            Self {
                id: id.to_string(),
                event_types: vec![event_type.to_string()],
                priority,
                enabled: true,
            }
        }
    }

    #[async_trait]
    impl EventHandler for TestHandler {
        fn id(&self) -> &str {
            &self.id
        }

        fn event_types(&self) -> Vec<String> {
            self.event_types.clone()
        }

        async fn handle(&self, _event: &BotEvent, _ctx: &EventContext) -> Result<bool, Error> {
            Ok(true)
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }
    }

    #[tokio::test]
    async fn test_handler_registration() {
        let registry = EventHandlerRegistry::new();
        let handler = Arc::new(TestHandler::new("test_handler", "presence.update", 100));

        assert!(registry.register(handler.clone()).await.is_ok());

        // Should fail on duplicate registration
        assert!(matches!(registry.register(handler).await, Err(Error::EventBus(_))));

        let handlers = registry.get_handlers("presence.update").await;
        assert_eq!(handlers.len(), 1);
        assert_eq!(handlers[0].id(), "test_handler");
        assert!(registry.get_handlers("message.create").await.is_empty());
        assert!(registry.get_handler("test_handler").await.is_some());
    }

    #[tokio::test]
    async fn test_priority_ordering() {
        let registry = EventHandlerRegistry::new();

        for (i, priority) in [(1, 200), (2, 100), (3, 150), (4, 100)] {
            let handler = Arc::new(TestHandler::new(&format!("handler_{i}"), "test.event", priority));
            registry.register(handler).await.unwrap();
        }

        let ids: Vec<String> = registry
            .get_handlers("test.event")
            .await
            .iter()
            .map(|h| h.id().to_string())
            .collect();
        assert_eq!(ids, vec!["handler_2", "handler_4", "handler_3", "handler_1"]);
    }

    #[tokio::test]
    async fn test_unregister_and_disabled() {
        let registry = EventHandlerRegistry::new();
        registry.register(Arc::new(TestHandler::new("a", "ready", 10))).await.unwrap();
        let mut disabled = TestHandler::new("b", "ready", 20);
        disabled.enabled = false;
        registry.register(Arc::new(disabled)).await.unwrap();

        // Disabled handlers stay registered but are never returned.
        assert_eq!(registry.get_handlers("ready").await.len(), 1);
        assert_eq!(registry.list_handlers().await.len(), 2);

        registry.unregister("a").await.unwrap();
        assert!(registry.get_handlers("ready").await.is_empty());
        assert!(matches!(registry.unregister("a").await, Err(Error::EventBus(_))));

        registry.clear().await;
        assert!(registry.list_handlers().await.is_empty());
    }
}
