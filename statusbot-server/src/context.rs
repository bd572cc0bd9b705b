//! statusbot-server/src/context.rs
//!
//! Defines the ServerContext: every long-lived piece of the running bot,
//! built in acquisition order.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use statusbot_common::models::{AuthorizedSenders, BotCredential, ServerAddress};
use statusbot_common::traits::StatusSource;
use statusbot_core::Error;
use statusbot_core::cache::StatusCache;
use statusbot_core::eventbus::EventBus;
use statusbot_core::platforms::a2s::A2sClient;
use statusbot_core::platforms::discord::DiscordPlatform;
use statusbot_core::platforms::{PlatformIntegration, UnconfiguredSource};
use statusbot_core::services::{
    spawn_event_dispatch_task, CommandDispatcher, EventContext, EventHandlerRegistry, PresencePublisher,
};

use crate::Args;

/// Validated command-line configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub credential: BotCredential,
    pub server: Option<ServerAddress>,
    pub authorized: AuthorizedSenders,
    pub prefix: String,
    pub query_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl BotConfig {
    pub fn from_args(args: &Args) -> Result<Self, Error> {
        let credential = BotCredential::new(&args.token)?;

        let server = match args.server.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<ServerAddress>()?),
        };

        if args.prefix.is_empty() || args.prefix.chars().any(char::is_whitespace) {
            return Err(Error::Config(format!("Invalid command prefix '{}'", args.prefix)));
        }
        if args.query_timeout_secs == 0 {
            return Err(Error::Config("--query-timeout-secs must be at least 1".into()));
        }

        Ok(Self {
            credential,
            server,
            authorized: AuthorizedSenders::new(args.authorized_users.iter().cloned()),
            prefix: args.prefix.clone(),
            query_timeout: Duration::from_secs(args.query_timeout_secs),
            shutdown_grace: Duration::from_secs(args.shutdown_grace_secs),
        })
    }
}

pub struct ServerContext {
    pub config: BotConfig,
    pub event_bus: Arc<EventBus>,
    pub registry: Arc<EventHandlerRegistry>,
    pub status_source: Arc<dyn StatusSource>,
    pub status_cache: Arc<StatusCache>,
    pub discord: Arc<DiscordPlatform>,
    pub tracker: TaskTracker,
    pub dispatch_handle: JoinHandle<()>,
}

impl ServerContext {
    /// Opens the server query socket, then the Discord session. If Discord
    /// fails, the query socket is closed before the error is returned.
    ///
    /// `event_bus` is created by the caller so signal handling can be live
    /// before any connection is attempted.
    pub async fn new(args: &Args, event_bus: Arc<EventBus>) -> Result<Self, Error> {
        let config = BotConfig::from_args(args)?;

        let status_source: Arc<dyn StatusSource> = match &config.server {
            Some(address) => Arc::new(A2sClient::connect(address, config.query_timeout).await?),
            None => {
                warn!("No --server given; presence will never be published");
                Arc::new(UnconfiguredSource)
            }
        };

        if config.authorized.is_empty() {
            warn!("No --authorized-user given; commands will be ignored");
        }

        let registry = Arc::new(EventHandlerRegistry::new());
        let status_cache = Arc::new(StatusCache::new());
        let discord = Arc::new(DiscordPlatform::new(config.credential.clone(), event_bus.clone()));

        let publisher = Arc::new(PresencePublisher::new(status_source.clone(), status_cache.clone()));
        let dispatcher = Arc::new(CommandDispatcher::with_builtin_commands(
            config.prefix.clone(),
            config.authorized.clone(),
        ));
        registry.register(publisher).await?;
        registry.register(dispatcher).await?;

        // Subscribed before the gateway opens so READY is never missed.
        let tracker = TaskTracker::new();
        let event_ctx = Arc::new(EventContext::new(discord.clone()));
        let dispatch_handle =
            spawn_event_dispatch_task(event_bus.clone(), registry.clone(), event_ctx, tracker.clone()).await;

        let dispatch_handle =
            connect_or_release(discord.as_ref(), &event_bus, dispatch_handle, status_source.as_ref()).await?;
        info!("Discord session established with {} shard(s)", discord.shard_count());

        Ok(Self {
            config,
            event_bus,
            registry,
            status_source,
            status_cache,
            discord,
            tracker,
            dispatch_handle,
        })
    }
}

/// Opens the chat session. If that fails, everything acquired before it is
/// released: the dispatch loop is stopped and the status source closed.
async fn connect_or_release<P>(
    platform: &P,
    event_bus: &EventBus,
    dispatch_handle: JoinHandle<()>,
    status_source: &dyn StatusSource,
) -> Result<JoinHandle<()>, Error>
where
    P: PlatformIntegration + Send + Sync + ?Sized,
{
    match platform.connect().await {
        Ok(()) => Ok(dispatch_handle),
        Err(e) => {
            error!("Discord connection failed: {e}");
            event_bus.shutdown();
            let _ = dispatch_handle.await;
            status_source.close().await;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use clap::Parser;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use statusbot_common::models::StatusSnapshot;
    use statusbot_core::platforms::ConnectionStatus;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["statusbot", "-t", "Bot secret"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn server_is_optional() {
        let config = BotConfig::from_args(&args(&[])).unwrap();
        assert!(config.server.is_none());
        assert_eq!(config.credential.expose(), "secret");
        assert_eq!(config.query_timeout, Duration::from_secs(5));
    }

    #[test]
    fn server_port_defaults() {
        let config = BotConfig::from_args(&args(&["-s", "play.example.org"])).unwrap();
        assert_eq!(config.server, Some(ServerAddress::new("play.example.org", 27015)));
    }

    #[test]
    fn bad_values_are_config_errors() {
        for extra in [
            &["-s", "host:notaport"][..],
            &["--prefix", ""][..],
            &["--query-timeout-secs", "0"][..],
        ] {
            let err = BotConfig::from_args(&args(extra)).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{extra:?} gave {err:?}");
        }
    }

    #[test]
    fn empty_token_is_config_error() {
        let parsed = Args::try_parse_from(["statusbot", "-t", "  "]).unwrap();
        assert!(matches!(BotConfig::from_args(&parsed), Err(Error::Config(_))));
    }

    #[test]
    fn authorized_users_are_collected() {
        let config = BotConfig::from_args(&args(&["-a", "10", "-a", "20"])).unwrap();
        assert!(config.authorized.is_authorized("10"));
        assert!(config.authorized.is_authorized("20"));
        assert!(!config.authorized.is_authorized("30"));
    }

    struct FakePlatform {
        fail: bool,
        connects: AtomicUsize,
    }

    #[async_trait]
    impl PlatformIntegration for FakePlatform {
        async fn connect(&self) -> Result<(), Error> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(Error::Connection("gateway refused the token".into()))
            } else {
                Ok(())
            }
        }

        async fn disconnect(&self) -> Result<(), Error> {
            Ok(())
        }

        fn connection_status(&self) -> ConnectionStatus {
            ConnectionStatus::Disconnected
        }
    }

    #[derive(Default)]
    struct TrackedSource {
        closed: AtomicBool,
    }

    #[async_trait]
    impl StatusSource for TrackedSource {
        async fn query(&self) -> Result<StatusSnapshot, Error> {
            Ok(StatusSnapshot::new(0, 1))
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn dispatch_stub(bus: &EventBus) -> JoinHandle<()> {
        let mut shutdown_rx = bus.shutdown_rx.clone();
        tokio::spawn(async move {
            while !*shutdown_rx.borrow() {
                if shutdown_rx.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    #[tokio::test]
    async fn failed_connect_releases_status_source() {
        let bus = EventBus::new();
        let source = TrackedSource::default();
        let platform = FakePlatform { fail: true, connects: AtomicUsize::new(0) };

        let handle = dispatch_stub(&bus);
        let result = connect_or_release(&platform, &bus, handle, &source).await;

        assert!(matches!(result, Err(Error::Connection(_))));
        assert_eq!(platform.connects.load(Ordering::SeqCst), 1);
        assert!(source.closed.load(Ordering::SeqCst));
        assert!(bus.is_shutdown());
    }

    #[tokio::test]
    async fn successful_connect_keeps_everything_open() {
        let bus = EventBus::new();
        let source = TrackedSource::default();
        let platform = FakePlatform { fail: false, connects: AtomicUsize::new(0) };

        let handle = dispatch_stub(&bus);
        let handle = connect_or_release(&platform, &bus, handle, &source).await.unwrap();

        assert!(!source.closed.load(Ordering::SeqCst));
        assert!(!bus.is_shutdown());
        assert!(!handle.is_finished());

        bus.shutdown();
        handle.await.unwrap();
    }
}
