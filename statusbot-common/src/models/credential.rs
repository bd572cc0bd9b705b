// File: statusbot-common/src/models/credential.rs

use std::fmt;

use crate::Error;

/// Opaque chat-platform bot token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct BotCredential(String);

impl BotCredential {
    /// Trims whitespace and an optional `Bot ` prefix; the platform client adds its own.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, Error> {
        let trimmed = raw.as_ref().trim();
        let token = trimmed.strip_prefix("Bot ").unwrap_or(trimmed).trim();
        if token.is_empty() {
            return Err(Error::Config("Bot token is empty".into()));
        }
        Ok(Self(token.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BotCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BotCredential(***)")
    }
}
