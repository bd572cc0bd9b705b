// File: statusbot-core/src/services/builtin_commands/mod.rs
//! Built-in chat commands. Each command lives in its own file; the dispatcher
//! loads the whole table through `builtin_commands`.

pub mod add_server_command;

use std::sync::Arc;

use crate::services::command_service::CommandHandler;

pub use add_server_command::AddServerCommand;

pub fn builtin_commands() -> Vec<Arc<dyn CommandHandler>> {
    vec![Arc::new(AddServerCommand)]
}
