// File: statusbot-core/tests/command_tests.rs

mod test_utils;

use std::sync::Arc;

use async_trait::async_trait;

use statusbot_core::Error;
use statusbot_core::eventbus::BotEvent;
use statusbot_core::models::{AuthorizedSenders, Command, IncomingMessage};
use statusbot_core::services::{
    CommandContext, CommandDispatcher, CommandHandler, DispatchOutcome, EventContext, EventHandler,
};

use test_utils::RecordingChat;

const OWNER: &str = "147064427414798336";

fn dispatcher() -> CommandDispatcher {
    CommandDispatcher::with_builtin_commands("!", AuthorizedSenders::new([OWNER]))
}

fn msg(author: &str, content: &str) -> IncomingMessage {
    IncomingMessage::new("555", author, "someone", content)
}

#[tokio::test]
async fn unauthorized_sender_gets_no_reply() {
    let chat = RecordingChat::new();
    let outcome = dispatcher().dispatch(&msg("1", "!addserver 1.2.3.4"), &chat).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Ignored);
    assert!(chat.messages().is_empty());
}

#[tokio::test]
async fn missing_prefix_gets_no_reply() {
    let chat = RecordingChat::new();
    let d = dispatcher();
    for content in ["addserver 1.2.3.4", "", "   ", "hello !addserver"] {
        assert_eq!(d.dispatch(&msg(OWNER, content), &chat).await.unwrap(), DispatchOutcome::Ignored);
    }
    assert!(chat.messages().is_empty());
}

#[tokio::test]
async fn unknown_verb_replies_once_with_content() {
    let chat = RecordingChat::new();
    let outcome = dispatcher().dispatch(&msg(OWNER, "!frobnicate now"), &chat).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Invalid);
    assert_eq!(
        chat.messages(),
        vec![("555".to_string(), "Invalid command [!frobnicate now]".to_string())]
    );
}

#[tokio::test]
async fn verb_match_is_exact() {
    let chat = RecordingChat::new();
    let d = dispatcher();
    assert_eq!(d.dispatch(&msg(OWNER, "!AddServer x"), &chat).await.unwrap(), DispatchOutcome::Invalid);
    assert_eq!(d.dispatch(&msg(OWNER, "!addservers x"), &chat).await.unwrap(), DispatchOutcome::Invalid);
    assert_eq!(chat.messages().len(), 2);
}

#[tokio::test]
async fn addserver_acknowledges() {
    let chat = RecordingChat::new();
    let outcome = dispatcher().dispatch(&msg(OWNER, "!addserver 10.0.0.5:27016"), &chat).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Handled("addserver".into()));
    assert_eq!(
        chat.messages(),
        vec![("555".to_string(), "Adding server 10.0.0.5:27016".to_string())]
    );
}

#[tokio::test]
async fn addserver_without_address_shows_usage() {
    let chat = RecordingChat::new();
    dispatcher().dispatch(&msg(OWNER, "!addserver"), &chat).await.unwrap();
    assert_eq!(chat.messages()[0].1, "Usage: !addserver <address>");
}

struct SilentCommand;

#[async_trait]
impl CommandHandler for SilentCommand {
    fn verb(&self) -> &str {
        "quiet"
    }

    async fn handle(&self, _cmd: &Command, _ctx: &CommandContext<'_>) -> Result<Option<String>, Error> {
        Ok(None)
    }
}

#[tokio::test]
async fn handler_without_reply_sends_nothing() {
    let mut d = CommandDispatcher::new("?", AuthorizedSenders::new([OWNER]));
    d.register(Arc::new(SilentCommand));
    assert_eq!(d.verbs(), vec!["quiet".to_string()]);

    let chat = RecordingChat::new();
    let outcome = d.dispatch(&msg(OWNER, "?quiet"), &chat).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Handled("quiet".into()));
    assert!(chat.messages().is_empty());
}

#[tokio::test]
async fn dispatches_from_chat_message_events() {
    let d = dispatcher();
    let chat = Arc::new(RecordingChat::new());
    let ctx = EventContext::new(chat.clone());

    assert_eq!(d.event_types(), vec!["message.create"]);
    let event = BotEvent::ChatMessage(msg(OWNER, "!addserver example.org"));
    assert!(d.handle(&event, &ctx).await.unwrap());
    assert!(!d.handle(&BotEvent::Ready { user_name: "statusbot".into() }, &ctx).await.unwrap());
    assert_eq!(chat.messages().len(), 1);
}
