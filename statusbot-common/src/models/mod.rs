// File: statusbot-common/src/models/mod.rs
pub mod status;
pub mod server;
pub mod credential;
pub mod command;
pub mod message;
pub mod auth;

pub use status::StatusSnapshot;
pub use server::{ServerAddress, DEFAULT_QUERY_PORT};
pub use credential::BotCredential;
pub use command::Command;
pub use message::IncomingMessage;
pub use auth::AuthorizedSenders;
