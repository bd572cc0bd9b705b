//! statusbot-core/src/platforms/a2s/mod.rs
//!
//! Steam server query (A2S) client. One UDP socket per game server, held for
//! the life of the process.

pub mod packet;

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::{lookup_host, UdpSocket};
use tokio::sync::Mutex;
use tracing::{debug, info, trace};

use statusbot_common::error::Error;
use statusbot_common::models::{ServerAddress, StatusSnapshot};
use statusbot_common::traits::StatusSource;

pub use packet::{InfoResponse, Reply};

/// Largest single-packet reply a server will send.
const MAX_PACKET_SIZE: usize = 1400;

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct A2sClient {
    address: ServerAddress,
    timeout: Duration,
    /// `None` once closed. The lock also pairs each request with its reply.
    socket: Mutex<Option<UdpSocket>>,
}

impl A2sClient {
    /// Resolves `address` and opens a UDP socket connected to it.
    pub async fn connect(address: &ServerAddress, timeout: Duration) -> Result<Self, Error> {
        let peer = lookup_host((address.host.as_str(), address.port))
            .await
            .map_err(|e| Error::Connection(format!("Failed to resolve {address}: {e}")))?
            .next()
            .ok_or_else(|| Error::Connection(format!("{address} did not resolve to any address")))?;

        let local: SocketAddr = if peer.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| Error::Connection(format!("Failed to bind query socket: {e}")))?;
        socket
            .connect(peer)
            .await
            .map_err(|e| Error::Connection(format!("Failed to connect query socket to {peer}: {e}")))?;

        info!("(A2sClient) Query socket for {address} ready (peer={peer}, timeout={timeout:?})");

        Ok(Self {
            address: address.clone(),
            timeout,
            socket: Mutex::new(Some(socket)),
        })
    }

    /// Full A2S_INFO exchange, bounded by the client's timeout.
    pub async fn info(&self) -> Result<InfoResponse, Error> {
        let guard = self.socket.lock().await;
        let socket = guard
            .as_ref()
            .ok_or_else(|| Error::Query(format!("Query connection to {} is closed", self.address)))?;

        match tokio::time::timeout(self.timeout, exchange(socket)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Query(format!(
                "No reply from {} within {:?}",
                self.address, self.timeout
            ))),
        }
    }
}

async fn exchange(socket: &UdpSocket) -> Result<InfoResponse, Error> {
    let mut buf = vec![0u8; MAX_PACKET_SIZE];
    drain_stale_replies(socket, &mut buf);

    let mut challenge = None;
    loop {
        let request = packet::encode_info_request(challenge);
        socket
            .send(&request)
            .await
            .map_err(|e| Error::Query(format!("Failed to send A2S_INFO: {e}")))?;

        let len = socket
            .recv(&mut buf)
            .await
            .map_err(|e| Error::Query(format!("Failed to receive A2S reply: {e}")))?;

        match packet::decode_reply(&buf[..len])? {
            Reply::Info(info) => return Ok(info),
            Reply::Challenge(bytes) => {
                if challenge.is_some() {
                    return Err(Error::Query("Server answered the challenge with another challenge".into()));
                }
                trace!("A2S challenge received, resending request");
                challenge = Some(bytes);
            }
        }
    }
}

/// Replies to an earlier, timed-out request may still be queued on the socket.
fn drain_stale_replies(socket: &UdpSocket, buf: &mut [u8]) {
    while let Ok(len) = socket.try_recv(buf) {
        debug!("Discarding stale {len}-byte A2S reply");
    }
}

#[async_trait]
impl StatusSource for A2sClient {
    async fn query(&self) -> Result<StatusSnapshot, Error> {
        let info = self.info().await?;
        debug!(
            "(A2sClient) {} => '{}' map={} players={}/{} bots={}",
            self.address, info.name, info.map, info.players, info.max_players, info.bots
        );
        Ok(info.snapshot())
    }

    async fn close(&self) {
        if self.socket.lock().await.take().is_some() {
            info!("(A2sClient) Closed query socket for {}", self.address);
        } else {
            debug!("(A2sClient) Query socket for {} already closed", self.address);
        }
    }
}
