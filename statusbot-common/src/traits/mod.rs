pub mod api;

pub use api::{ChatPlatform, StatusSource};
