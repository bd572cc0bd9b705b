use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use statusbot_core::Error;

mod context;
mod server;

use server::run_server;

#[derive(Parser, Debug, Clone)]
#[command(name = "statusbot")]
#[command(author, version, about = "Mirrors a game server's player count into a Discord bot's presence")]
pub struct Args {
    /// Discord bot token
    #[arg(short = 't', long)]
    token: String,

    /// Game server to watch, as host or host:port (default port 27015)
    #[arg(short = 's', long)]
    server: Option<String>,

    /// Discord user id allowed to run commands. Repeat for more users.
    #[arg(short = 'a', long = "authorized-user")]
    authorized_users: Vec<String>,

    /// Command prefix
    #[arg(long, default_value = "!")]
    prefix: String,

    /// Upper bound on a single server query, in seconds
    #[arg(long, default_value_t = 5)]
    query_timeout_secs: u64,

    /// How long shutdown waits for in-flight event handlers, in seconds
    #[arg(long, default_value_t = 5)]
    shutdown_grace_secs: u64,
}

fn init_tracing() -> anyhow::Result<()> {
    // Forward `log` records from dependencies into tracing.
    tracing_log::LogTracer::init().context("Failed to install log forwarder")?;

    let filter = EnvFilter::from_default_env()
        .add_directive("statusbot=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub).context("Failed to set global subscriber")?;
    Ok(())
}

/// 2 matches clap's own code for a missing or malformed flag.
fn exit_code_for(err: &Error) -> u8 {
    match err {
        Error::Config(_) => 2,
        Error::Connection(_) => 3,
        _ => 1,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_tracing() {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    info!("statusbot starting. server={:?}, authorized users={}",
          args.server, args.authorized_users.len());

    match run_server(args).await {
        Ok(()) => {
            info!("Main finished. Goodbye!");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Server error: {e}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}
