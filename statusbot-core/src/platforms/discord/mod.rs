pub mod runtime;

pub use runtime::{DiscordPlatform, INTENTS, translate_event};
