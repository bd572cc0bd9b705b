//! statusbot-core/src/platforms/a2s/packet.rs
//!
//! Wire format for the A2S_INFO exchange. Everything is little-endian and
//! strings are NUL-terminated.
//!
//!   request   FF FF FF FF 54 "Source Engine Query\0" [challenge: 4 bytes]
//!   challenge FF FF FF FF 41 <4 bytes>
//!   info      FF FF FF FF 49 <Source info body>
//!   goldsrc   FF FF FF FF 6D <obsolete GoldSrc info body>

use std::io::{Cursor, ErrorKind, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::trace;

use statusbot_common::error::Error;
use statusbot_common::models::StatusSnapshot;

pub const SINGLE_PACKET_HEADER: i32 = -1;
pub const SPLIT_PACKET_HEADER: i32 = -2;

pub const A2S_INFO_REQUEST: u8 = 0x54;
pub const S2C_CHALLENGE: u8 = 0x41;
pub const S2A_INFO_SOURCE: u8 = 0x49;
pub const S2A_INFO_GOLDSRC: u8 = 0x6D;

const INFO_PAYLOAD: &[u8] = b"Source Engine Query\0";

/// App id of "The Ship", whose info reply carries three extra bytes.
const THE_SHIP_APP_ID: u16 = 2400;

const EDF_PORT: u8 = 0x80;
const EDF_STEAM_ID: u8 = 0x10;
const EDF_SOURCE_TV: u8 = 0x40;
const EDF_KEYWORDS: u8 = 0x20;
const EDF_GAME_ID: u8 = 0x01;

/// Everything a server tells us in its info reply. Only the player counts
/// drive presence; the rest is logged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InfoResponse {
    pub protocol: u8,
    pub name: String,
    pub map: String,
    pub folder: String,
    pub game: String,
    pub app_id: u16,
    pub players: u8,
    pub max_players: u8,
    pub bots: u8,
    pub server_type: char,
    pub environment: char,
    pub password_protected: bool,
    pub vac: bool,
    pub version: Option<String>,
    pub port: Option<u16>,
    pub steam_id: Option<u64>,
    pub keywords: Option<String>,
    pub game_id: Option<u64>,
}

impl InfoResponse {
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot::new(u32::from(self.players), u32::from(self.max_players))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The server wants the request repeated with these bytes appended.
    Challenge([u8; 4]),
    Info(InfoResponse),
}

pub fn encode_info_request(challenge: Option<[u8; 4]>) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + 1 + INFO_PAYLOAD.len() + 4);
    // Writes into a Vec cannot fail.
    let _ = buf.write_i32::<LittleEndian>(SINGLE_PACKET_HEADER);
    buf.push(A2S_INFO_REQUEST);
    let _ = buf.write_all(INFO_PAYLOAD);
    if let Some(bytes) = challenge {
        buf.extend_from_slice(&bytes);
    }
    buf
}

pub fn decode_reply(data: &[u8]) -> Result<Reply, Error> {
    let mut reader = PacketReader::new(data);

    let header = reader.read_i32()?;
    if header == SPLIT_PACKET_HEADER {
        return Err(Error::Query("Split-packet info replies are not supported".into()));
    }
    if header != SINGLE_PACKET_HEADER {
        return Err(Error::Query(format!("Unexpected packet header {header:#010x}")));
    }

    let kind = reader.read_u8()?;
    trace!("A2S reply type {kind:#04x}, {} bytes", data.len());
    match kind {
        S2C_CHALLENGE => {
            let mut challenge = [0u8; 4];
            reader.read_exact(&mut challenge)?;
            Ok(Reply::Challenge(challenge))
        }
        S2A_INFO_SOURCE => decode_source_info(&mut reader).map(Reply::Info),
        S2A_INFO_GOLDSRC => decode_goldsrc_info(&mut reader).map(Reply::Info),
        other => Err(Error::Query(format!("Unexpected reply type {other:#04x}"))),
    }
}

fn decode_source_info(reader: &mut PacketReader<'_>) -> Result<InfoResponse, Error> {
    let mut info = InfoResponse {
        protocol: reader.read_u8()?,
        name: reader.read_cstring()?,
        map: reader.read_cstring()?,
        folder: reader.read_cstring()?,
        game: reader.read_cstring()?,
        app_id: reader.read_u16()?,
        players: reader.read_u8()?,
        max_players: reader.read_u8()?,
        bots: reader.read_u8()?,
        server_type: char::from(reader.read_u8()?),
        environment: char::from(reader.read_u8()?),
        password_protected: reader.read_u8()? != 0,
        vac: reader.read_u8()? != 0,
        ..InfoResponse::default()
    };

    // Everything past the VAC flag is optional; older servers stop early.
    if info.app_id == THE_SHIP_APP_ID {
        // mode, witnesses, duration
        if reader.skip(3).is_err() {
            return Ok(info);
        }
    }
    let Ok(version) = reader.read_cstring() else {
        return Ok(info);
    };
    info.version = Some(version);

    let Ok(edf) = reader.read_u8() else {
        return Ok(info);
    };
    if edf & EDF_PORT != 0 {
        info.port = reader.read_u16().ok();
    }
    if edf & EDF_STEAM_ID != 0 {
        info.steam_id = reader.read_u64().ok();
    }
    if edf & EDF_SOURCE_TV != 0 {
        // SourceTV port and name, not needed.
        let _ = reader.read_u16();
        let _ = reader.read_cstring();
    }
    if edf & EDF_KEYWORDS != 0 {
        info.keywords = reader.read_cstring().ok();
    }
    if edf & EDF_GAME_ID != 0 {
        info.game_id = reader.read_u64().ok();
    }

    Ok(info)
}

fn decode_goldsrc_info(reader: &mut PacketReader<'_>) -> Result<InfoResponse, Error> {
    let _address = reader.read_cstring()?;
    let mut info = InfoResponse {
        name: reader.read_cstring()?,
        map: reader.read_cstring()?,
        folder: reader.read_cstring()?,
        game: reader.read_cstring()?,
        players: reader.read_u8()?,
        max_players: reader.read_u8()?,
        ..InfoResponse::default()
    };
    if let Ok(protocol) = reader.read_u8() {
        info.protocol = protocol;
    }
    Ok(info)
}

/// Little-endian cursor over a received datagram.
struct PacketReader<'a> {
    inner: Cursor<&'a [u8]>,
}

impl<'a> PacketReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { inner: Cursor::new(data) }
    }

    fn read_u8(&mut self) -> Result<u8, Error> {
        self.inner.read_u8().map_err(truncated)
    }

    fn read_u16(&mut self) -> Result<u16, Error> {
        self.inner.read_u16::<LittleEndian>().map_err(truncated)
    }

    fn read_i32(&mut self) -> Result<i32, Error> {
        self.inner.read_i32::<LittleEndian>().map_err(truncated)
    }

    fn read_u64(&mut self) -> Result<u64, Error> {
        self.inner.read_u64::<LittleEndian>().map_err(truncated)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        self.inner.read_exact(buf).map_err(truncated)
    }

    fn skip(&mut self, len: usize) -> Result<(), Error> {
        let mut scratch = vec![0u8; len];
        self.read_exact(&mut scratch)
    }

    /// Reads up to the next NUL. Invalid UTF-8 is replaced rather than rejected.
    fn read_cstring(&mut self) -> Result<String, Error> {
        let mut bytes = Vec::new();
        loop {
            match self.read_u8()? {
                0 => break,
                b => bytes.push(b),
            }
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn truncated(err: std::io::Error) -> Error {
    if err.kind() == ErrorKind::UnexpectedEof {
        Error::Query("Truncated A2S reply".into())
    } else {
        Error::Query(format!("Malformed A2S reply: {err}"))
    }
}
