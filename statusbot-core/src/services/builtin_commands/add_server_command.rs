use async_trait::async_trait;

use crate::Error;
use crate::models::Command;
use crate::services::command_service::{CommandContext, CommandHandler};

/// `addserver <address>`. Acknowledges the request; the watched server is
/// fixed at startup and is not changed here.
pub struct AddServerCommand;

#[async_trait]
impl CommandHandler for AddServerCommand {
    fn verb(&self) -> &str {
        "addserver"
    }

    async fn handle(&self, cmd: &Command, ctx: &CommandContext<'_>) -> Result<Option<String>, Error> {
        let reply = match cmd.args.first() {
            Some(address) => format!("Adding server {address}"),
            None => format!("Usage: {}addserver <address>", ctx.prefix),
        };
        Ok(Some(reply))
    }
}
