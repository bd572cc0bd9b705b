use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use twilight_gateway::{
    self as gateway,
    CloseFrame,
    Config,
    Event,
    EventTypeFlags,
    Intents,
    MessageSender,
    Shard,
    StreamExt,
};
use twilight_http::Client as HttpClient;
use twilight_http::client::ClientBuilder;
use twilight_model::gateway::payload::outgoing::UpdatePresence;
use twilight_model::gateway::presence::{Activity, ActivityType, MinimalActivity, Status};
use twilight_model::id::marker::ChannelMarker;
use twilight_model::id::Id;

use crate::Error;
use crate::eventbus::{BotEvent, EventBus};
use crate::platforms::{ConnectionStatus, PlatformIntegration};
use statusbot_common::models::{BotCredential, IncomingMessage};
use statusbot_common::traits::ChatPlatform;

/// GUILD_PRESENCES and MESSAGE_CONTENT are privileged and must be enabled
/// for the application in the developer portal.
pub const INTENTS: Intents = Intents::GUILDS
    .union(Intents::GUILD_PRESENCES)
    .union(Intents::GUILD_MESSAGES)
    .union(Intents::DIRECT_MESSAGES)
    .union(Intents::MESSAGE_CONTENT);

const EVENT_TYPES: EventTypeFlags = EventTypeFlags::READY
    .union(EventTypeFlags::PRESENCE_UPDATE)
    .union(EventTypeFlags::MESSAGE_CREATE);

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const SHARD_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Maps the gateway events we care about onto `BotEvent`s. Messages from
/// bots (including ourselves) are dropped here.
pub fn translate_event(event: &Event) -> Option<BotEvent> {
    match event {
        Event::Ready(ready) => Some(BotEvent::Ready {
            user_name: ready.user.name.clone(),
        }),
        Event::PresenceUpdate(update) => {
            let presence = &update.0;
            Some(BotEvent::PresenceUpdate {
                guild_id: presence.guild_id.to_string(),
                user_id: presence.user.id().to_string(),
            })
        }
        Event::MessageCreate(create) => {
            let msg = &create.0;
            if msg.author.bot {
                return None;
            }
            Some(BotEvent::ChatMessage(IncomingMessage {
                channel_id: msg.channel_id.to_string(),
                author_id: msg.author.id.to_string(),
                author_name: msg.author.name.clone(),
                content: msg.content.clone(),
                timestamp: Utc::now(),
            }))
        }
        _ => None,
    }
}

/// Pulls events off one shard and forwards the interesting ones to the bus.
async fn shard_runner(mut shard: Shard, event_bus: Arc<EventBus>) {
    let shard_id = shard.id().number();
    info!("(ShardRunner) Shard {shard_id} started. Listening for events.");

    while let Some(item) = shard.next_event(EVENT_TYPES).await {
        match item {
            Ok(event) => match translate_event(&event) {
                Some(bot_event) => {
                    trace!("Shard {shard_id} => {}", bot_event.event_type());
                    if let BotEvent::Ready { user_name } = &bot_event {
                        info!("Shard {shard_id} => READY as {user_name}");
                    }
                    event_bus.publish(bot_event).await;
                }
                None => trace!("Shard {shard_id} => ignored event {:?}", event.kind()),
            },
            Err(err) => {
                error!("Shard {shard_id} => error receiving event: {err:?}");
            }
        }
    }

    warn!("(ShardRunner) Shard {shard_id} event loop ended.");
}

/// Discord session: one HTTP client plus the recommended number of gateway shards.
pub struct DiscordPlatform {
    credential: BotCredential,
    event_bus: Arc<EventBus>,
    connection_status: Mutex<ConnectionStatus>,
    http: RwLock<Option<Arc<HttpClient>>>,
    shard_senders: Mutex<Vec<MessageSender>>,
    shard_tasks: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl DiscordPlatform {
    pub fn new(credential: BotCredential, event_bus: Arc<EventBus>) -> Self {
        Self {
            credential,
            event_bus,
            connection_status: Mutex::new(ConnectionStatus::Disconnected),
            http: RwLock::new(None),
            shard_senders: Mutex::new(Vec::new()),
            shard_tasks: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shard_senders.lock().len()
    }
}

#[async_trait]
impl PlatformIntegration for DiscordPlatform {
    async fn connect(&self) -> Result<(), Error> {
        if self.connection_status() == ConnectionStatus::Connected {
            info!("(DiscordPlatform) Already connected => skipping");
            return Ok(());
        }

        let token = self.credential.expose().to_string();
        if token.is_empty() {
            return Err(Error::Config("Discord token is empty".into()));
        }

        let http_client = Arc::new(
            ClientBuilder::new()
                .token(token.clone())
                .timeout(HTTP_TIMEOUT)
                .build()
        );

        let config = Config::new(token, INTENTS);

        // Fails on a bad token, since it asks the API for the shard count first.
        let shards = match gateway::create_recommended(&http_client, config, |_, b| b.build()).await {
            Ok(shards) => shards,
            Err(e) => {
                *self.connection_status.lock() = ConnectionStatus::Error(e.to_string());
                return Err(Error::Connection(format!("Failed to open Discord gateway: {e}")));
            }
        };

        let mut senders = Vec::new();
        let mut tasks = Vec::new();
        for shard in shards {
            senders.push(shard.sender());
            let bus_for_shard = self.event_bus.clone();
            tasks.push(tokio::spawn(shard_runner(shard, bus_for_shard)));
        }
        info!("(DiscordPlatform) Connected with {} shard(s)", senders.len());

        *self.http.write() = Some(http_client);
        *self.shard_senders.lock() = senders;
        self.shard_tasks.lock().await.extend(tasks);
        *self.connection_status.lock() = ConnectionStatus::Connected;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), Error> {
        *self.connection_status.lock() = ConnectionStatus::Disconnected;

        let senders = std::mem::take(&mut *self.shard_senders.lock());
        for sender in &senders {
            let _ = sender.close(CloseFrame::NORMAL);
        }

        let tasks = std::mem::take(&mut *self.shard_tasks.lock().await);
        for mut task in tasks {
            if tokio::time::timeout(SHARD_CLOSE_TIMEOUT, &mut task).await.is_err() {
                warn!("(DiscordPlatform) Shard did not close in {SHARD_CLOSE_TIMEOUT:?}; aborting it");
                task.abort();
            }
        }

        *self.http.write() = None;
        debug!("(DiscordPlatform) Disconnected");
        Ok(())
    }

    fn connection_status(&self) -> ConnectionStatus {
        self.connection_status.lock().clone()
    }
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<(), Error> {
        let channel_id_u64: u64 = channel_id.parse().map_err(|_| {
            Error::Platform(format!("Invalid channel ID: {channel_id}"))
        })?;
        let channel_id = Id::<ChannelMarker>::new_checked(channel_id_u64)
            .ok_or_else(|| Error::Platform("Channel ID must be non-zero".into()))?;

        let http = self.http.read().clone()
            .ok_or_else(|| Error::Publish("Discord session is not connected".into()))?;

        http.create_message(channel_id)
            .content(text)
            .await
            .map_err(|e| Error::Publish(format!("Error sending Discord message: {e:?}")))?;

        Ok(())
    }

    async fn update_presence(&self, text: &str) -> Result<(), Error> {
        let activity: Activity = MinimalActivity {
            kind: ActivityType::Playing,
            name: text.to_string(),
            url: None,
        }
        .into();
        let command = UpdatePresence::new(vec![activity], false, None::<u64>, Status::Online)
            .map_err(|e| Error::Publish(format!("Invalid presence payload: {e}")))?;

        let senders = self.shard_senders.lock().clone();
        if senders.is_empty() {
            return Err(Error::Publish("Discord session is not connected".into()));
        }
        for sender in &senders {
            sender
                .command(&command)
                .map_err(|e| Error::Publish(format!("Error queueing presence update: {e}")))?;
        }
        Ok(())
    }
}
