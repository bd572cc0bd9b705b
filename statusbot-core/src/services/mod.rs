// File: src/services/mod.rs

pub mod event_context;
pub mod event_handler;
pub mod event_registry;
pub mod event_dispatch;
pub mod presence_publisher;
pub mod command_service;
pub mod builtin_commands;

pub use event_context::EventContext;
pub use event_handler::EventHandler;
pub use event_registry::EventHandlerRegistry;
pub use event_dispatch::{EventDispatchService, dispatch_event, spawn_event_dispatch_task};
pub use presence_publisher::{PresencePublisher, PublishOutcome};
pub use command_service::{CommandDispatcher, CommandHandler, CommandContext, DispatchOutcome};
