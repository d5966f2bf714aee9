//! Test doubles for the core ports
//!
//! Available to this crate's tests and, behind the `test-utils` feature, to
//! downstream crates.

// Mutex poisoning is acceptable in test doubles: a panicking test fails anyway.
#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use momo_domain::{HttpMethod, MomoError, Result, TransportRequest, TransportResponse};

use crate::clock::Clock;
use crate::ports::Transport;

type ScriptedQueue = Arc<Mutex<VecDeque<Result<TransportResponse>>>>;
type RequestLog = Arc<Mutex<Vec<TransportRequest>>>;

/// Scripted transport returning queued responses in call order
///
/// Every executed request is recorded. When the queue is exhausted the
/// transport fails with `TransportFailure`, so an unexpected extra network
/// call surfaces as a test failure.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    responses: ScriptedQueue,
    requests: RequestLog,
    latency: Option<Duration>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `latency` (yields to other tasks)
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queue a response with the given status and raw body
    pub fn push_response(&self, status: u16, body: &str) {
        self.responses.lock().unwrap().push_back(Ok(TransportResponse::new(status, body)));
    }

    /// Queue a connection-level failure
    pub fn push_failure(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(MomoError::TransportFailure(message.to_string())));
    }

    /// All requests executed so far
    #[must_use]
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Number of requests whose method matches and whose URL ends with `suffix`
    #[must_use]
    pub fn count_matching(&self, method: HttpMethod, suffix: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|req| req.method == method && req.url.ends_with(suffix))
            .count()
    }

    #[must_use]
    pub fn last_request(&self) -> Option<TransportRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            Err(MomoError::TransportFailure(format!("no scripted response for {url}")))
        })
    }
}

/// Manually advanced clock for deterministic tests
///
/// Clones share the same current time.
#[derive(Debug, Clone)]
pub struct MockClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    /// Clock frozen at `start`
    #[must_use]
    pub fn at(start: DateTime<Utc>) -> Self {
        Self { current: Arc::new(Mutex::new(start)) }
    }

    /// Clock frozen at the current real time
    #[must_use]
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Move time forward by `by`
    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut current) = self.current.lock() {
            *current += by;
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, to: DateTime<Utc>) {
        if let Ok(mut current) = self.current.lock() {
            *current = to;
        }
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        self.current.lock().map(|current| *current).unwrap_or_else(|_| Utc::now())
    }
}
