use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::Error;
use crate::eventbus::BotEvent;
use crate::services::builtin_commands;
use crate::services::event_context::EventContext;
use crate::services::event_handler::EventHandler;
use statusbot_common::models::{AuthorizedSenders, Command, IncomingMessage};
use statusbot_common::traits::ChatPlatform;

/// Context passed to command handlers.
pub struct CommandContext<'a> {
    pub channel_id: &'a str,
    pub author_id: &'a str,
    pub prefix: &'a str,
}

/// One entry in the verb table.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Verb without the prefix, matched exactly.
    fn verb(&self) -> &str;

    /// Returns the reply to post in the originating channel, if any.
    async fn handle(&self, cmd: &Command, ctx: &CommandContext<'_>) -> Result<Option<String>, Error>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Unauthorized sender, no prefix, or nothing after it. Nothing was sent.
    Ignored,
    /// Unknown verb; an "Invalid command" reply was sent.
    Invalid,
    Handled(String),
}

/// Turns authorized, prefixed chat messages into command invocations.
/// Holds no state between messages.
pub struct CommandDispatcher {
    prefix: String,
    authorized: AuthorizedSenders,
    commands: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandDispatcher {
    /// An empty verb table. Every prefixed message from an authorized sender
    /// will be answered as invalid until handlers are registered.
    pub fn new(prefix: impl Into<String>, authorized: AuthorizedSenders) -> Self {
        Self {
            prefix: prefix.into(),
            authorized,
            commands: HashMap::new(),
        }
    }

    pub fn with_builtin_commands(prefix: impl Into<String>, authorized: AuthorizedSenders) -> Self {
        let mut dispatcher = Self::new(prefix, authorized);
        for handler in builtin_commands::builtin_commands() {
            dispatcher.register(handler);
        }
        dispatcher
    }

    /// Adds `handler` to the verb table, replacing any handler with the same verb.
    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) {
        let verb = handler.verb().to_string();
        if self.commands.insert(verb.clone(), handler).is_some() {
            warn!("(CommandDispatcher) Replaced handler for verb '{verb}'");
        } else {
            debug!("(CommandDispatcher) Registered verb '{verb}'");
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Registered verbs, sorted.
    pub fn verbs(&self) -> Vec<String> {
        let mut verbs: Vec<String> = self.commands.keys().cloned().collect();
        verbs.sort();
        verbs
    }

    /// Errors come from the reply send or from the matched handler itself.
    pub async fn dispatch(
        &self,
        msg: &IncomingMessage,
        chat: &dyn ChatPlatform,
    ) -> Result<DispatchOutcome, Error> {
        if !self.authorized.is_authorized(&msg.author_id) {
            return Ok(DispatchOutcome::Ignored);
        }

        let cmd = match Command::parse(&msg.content, &self.prefix) {
            Some(cmd) => cmd,
            None => return Ok(DispatchOutcome::Ignored),
        };

        let handler = match self.commands.get(&cmd.verb) {
            Some(h) => h.clone(),
            None => {
                info!(
                    "(CommandDispatcher) Unknown command from {} in {}: {}",
                    msg.author_name, msg.channel_id, msg.content
                );
                chat.send_message(&msg.channel_id, &format!("Invalid command [{}]", msg.content))
                    .await?;
                return Ok(DispatchOutcome::Invalid);
            }
        };

        info!(
            "(CommandDispatcher) {} ({}) => {}{}",
            msg.author_name, msg.author_id, self.prefix, cmd.verb
        );

        let ctx = CommandContext {
            channel_id: &msg.channel_id,
            author_id: &msg.author_id,
            prefix: &self.prefix,
        };
        if let Some(reply) = handler.handle(&cmd, &ctx).await? {
            chat.send_message(&msg.channel_id, &reply).await?;
        }

        Ok(DispatchOutcome::Handled(cmd.verb))
    }
}

#[async_trait]
impl EventHandler for CommandDispatcher {
    fn id(&self) -> &str {
        "command.dispatcher"
    }

    fn event_types(&self) -> Vec<String> {
        vec!["message.create".to_string()]
    }

    async fn handle(&self, event: &BotEvent, ctx: &EventContext) -> Result<bool, Error> {
        match event {
            BotEvent::ChatMessage(msg) => {
                let outcome = self.dispatch(msg, ctx.chat.as_ref()).await?;
                Ok(outcome != DispatchOutcome::Ignored)
            }
            _ => Ok(false),
        }
    }
}
