// src/lib.rs

pub mod cache;
pub mod eventbus;
pub mod platforms;
pub mod services;

pub use statusbot_common::error::Error;
pub use statusbot_common::models;
pub use statusbot_common::traits;
