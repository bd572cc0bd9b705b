// File: statusbot-core/tests/test_utils/mod.rs
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;
use parking_lot::Mutex;

use statusbot_core::Error;
use statusbot_core::models::StatusSnapshot;
use statusbot_core::traits::{ChatPlatform, StatusSource};

mock! {
    pub Source {}

    #[async_trait]
    impl StatusSource for Source {
        async fn query(&self) -> Result<StatusSnapshot, Error>;
        async fn close(&self);
    }
}

/// A source that answers `query` from `script` in order.
pub fn scripted_source(script: Vec<Result<StatusSnapshot, Error>>) -> MockSource {
    let calls = script.len();
    let mut script = VecDeque::from(script);
    let mut source = MockSource::new();
    source
        .expect_query()
        .times(calls)
        .returning(move || script.pop_front().unwrap_or_else(|| Err(Error::Query("script exhausted".into()))));
    source
}

/// A source that takes `delay` to answer and counts how often it was asked.
/// Answers with `reading`, or a query error when it is `None`.
pub struct SlowSource {
    pub delay: Duration,
    pub reading: Option<StatusSnapshot>,
    pub queries: AtomicUsize,
}

impl SlowSource {
    pub fn new(delay: Duration, reading: Option<StatusSnapshot>) -> Self {
        Self { delay, reading, queries: AtomicUsize::new(0) }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusSource for SlowSource {
    async fn query(&self) -> Result<StatusSnapshot, Error> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.reading.ok_or_else(|| Error::Query("server is down".into()))
    }

    async fn close(&self) {}
}

/// Chat platform that remembers everything it was asked to send.
#[derive(Default)]
pub struct RecordingChat {
    pub presences: Mutex<Vec<String>>,
    pub messages: Mutex<Vec<(String, String)>>,
    pub fail_presence: Mutex<bool>,
}

impl RecordingChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_presence() -> Self {
        let chat = Self::default();
        *chat.fail_presence.lock() = true;
        chat
    }

    pub fn presences(&self) -> Vec<String> {
        self.presences.lock().clone()
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl ChatPlatform for RecordingChat {
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<(), Error> {
        self.messages.lock().push((channel_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn update_presence(&self, text: &str) -> Result<(), Error> {
        if *self.fail_presence.lock() {
            return Err(Error::Publish("presence rejected".into()));
        }
        self.presences.lock().push(text.to_string());
        Ok(())
    }
}

/// Polls `check` until it holds or two seconds pass.
pub async fn wait_until<F: Fn() -> bool>(check: F) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
