// File: src/platforms/mod.rs

use async_trait::async_trait;
use tracing::debug;

use statusbot_common::models::StatusSnapshot;
use statusbot_common::traits::StatusSource;
use crate::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Error(String),
}

#[async_trait]
pub trait PlatformIntegration {
    async fn connect(&self) -> Result<(), Error>;
    async fn disconnect(&self) -> Result<(), Error>;
    fn connection_status(&self) -> ConnectionStatus;
}

/// Stands in for the query client when no server address was configured.
/// Every query fails, so presence is simply never published.
#[derive(Debug, Default)]
pub struct UnconfiguredSource;

#[async_trait]
impl StatusSource for UnconfiguredSource {
    async fn query(&self) -> Result<StatusSnapshot, Error> {
        Err(Error::Query("No server address configured".into()))
    }

    async fn close(&self) {
        debug!("(UnconfiguredSource) Nothing to close");
    }
}

pub mod a2s;
pub mod discord;
