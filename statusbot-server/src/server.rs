//! statusbot-server/src/server.rs
//!
//! Runs the bot until SIGINT / SIGTERM, then tears everything down in reverse
//! acquisition order.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use statusbot_core::Error;
use statusbot_core::eventbus::EventBus;
use statusbot_core::platforms::PlatformIntegration;

use crate::Args;
use crate::context::ServerContext;

pub async fn run_server(args: Args) -> Result<(), Error> {
    // Listening before any connection is opened, so a signal during startup
    // still ends in an orderly teardown.
    let event_bus = Arc::new(EventBus::new());
    let _signal_handle = spawn_signal_task(event_bus.clone());

    let ctx = ServerContext::new(&args, event_bus).await?;

    for handler in ctx.registry.list_handlers().await {
        debug!("Handler '{}' on {:?} (priority {})", handler.id, handler.event_types, handler.priority);
    }

    wait_for_shutdown(&ctx.event_bus).await;
    info!("Shutdown signaled; releasing connections.");

    shutdown(ctx).await;
    info!("Server shutdown complete.");
    Ok(())
}

/// Returns at once if the flag was raised while the connections were still
/// being opened.
async fn wait_for_shutdown(event_bus: &EventBus) {
    let mut shutdown_rx = event_bus.shutdown_rx.clone();
    while !*shutdown_rx.borrow() {
        if shutdown_rx.changed().await.is_err() {
            break;
        }
    }
}

/// Discord session first, then in-flight handlers, then the query socket.
async fn shutdown(ctx: ServerContext) {
    info!("Closing Discord session...");
    if let Err(e) = ctx.discord.disconnect().await {
        error!("Failed to close Discord session: {e}");
    }

    if let Err(e) = ctx.dispatch_handle.await {
        warn!("Event dispatch task ended abnormally: {e}");
    }
    ctx.tracker.close();
    let grace = ctx.config.shutdown_grace;
    if tokio::time::timeout(grace, ctx.tracker.wait()).await.is_err() {
        warn!("{} event handler(s) still running after {grace:?}; exiting anyway", ctx.tracker.len());
    } else {
        debug!("All event handlers finished");
    }

    if let Some(last) = ctx.status_cache.get() {
        debug!("Last observed status: {last}");
    }

    info!("Closing server query connection...");
    ctx.status_source.close().await;
}

/// SIGINT (Ctrl-C) everywhere, SIGTERM on unix. Either one flips the
/// event bus shutdown flag.
fn spawn_signal_task(event_bus: Arc<EventBus>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(name) => {
                info!("{name} received; shutting down event bus...");
                event_bus.shutdown();
            }
            Err(e) => error!("Failed to listen for termination signals: {e}"),
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() -> Result<&'static str, Error> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.map(|_| "SIGINT").map_err(Error::from),
        _ = term.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Result<&'static str, Error> {
    tokio::signal::ctrl_c().await?;
    Ok("Ctrl-C")
}
