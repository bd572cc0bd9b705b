// File: statusbot-common/src/models/server.rs

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Port a Source dedicated server answers queries on unless told otherwise.
pub const DEFAULT_QUERY_PORT: u16 = 27015;

/// The game server endpoint to query. Immutable once configuration is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

fn parse_port(raw: &str, input: &str) -> Result<u16, Error> {
    raw.parse::<u16>()
        .map_err(|_| Error::Config(format!("Invalid port in server address '{input}'")))
}

/// Accepts `host`, `host:port`, `[v6]`, `[v6]:port` and bare IPv6 literals.
impl FromStr for ServerAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err(Error::Config("Server address is empty".into()));
        }

        if let Some(rest) = input.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(|| {
                Error::Config(format!("Unterminated '[' in server address '{input}'"))
            })?;
            if host.is_empty() {
                return Err(Error::Config(format!("Missing host in server address '{input}'")));
            }
            let port = match tail {
                "" => DEFAULT_QUERY_PORT,
                _ => match tail.strip_prefix(':') {
                    Some(p) => parse_port(p, input)?,
                    None => {
                        return Err(Error::Config(format!(
                            "Unexpected characters after ']' in server address '{input}'"
                        )))
                    }
                },
            };
            return Ok(ServerAddress::new(host, port));
        }

        // More than one colon without brackets can only be a bare IPv6 literal.
        if input.matches(':').count() > 1 {
            return Ok(ServerAddress::new(input, DEFAULT_QUERY_PORT));
        }

        match input.split_once(':') {
            Some((host, port)) => {
                if host.is_empty() {
                    return Err(Error::Config(format!("Missing host in server address '{input}'")));
                }
                Ok(ServerAddress::new(host, parse_port(port, input)?))
            }
            None => Ok(ServerAddress::new(input, DEFAULT_QUERY_PORT)),
        }
    }
}
