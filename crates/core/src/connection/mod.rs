//! Reconnection policy for the feature stream.
//!
//! [`ConnectionMachine`] is a pure state machine: it is fed discrete transport
//! signals (open, close, error, retry timer) and answers with what the caller
//! must do next. The socket plumbing lives in [`transport`].

pub mod transport;

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

/// Bounded, fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Consecutive failed connections tolerated before giving up.
    pub max_failures: u32,
    #[serde(rename = "delay_ms", with = "millis")]
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_failures: 5,
            delay: Duration::from_millis(3000),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    /// Waiting out the retry delay after the n-th consecutive failure.
    Disconnected(u32),
    /// Retry budget spent; only [`ConnectionMachine::restart`] leaves this state.
    Exhausted,
}

/// Human-readable connection status for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Retrying { attempt: u32, limit: u32 },
    Exhausted,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Connecting => f.write_str("Connecting..."),
            ConnectionStatus::Connected => f.write_str("Connected!"),
            ConnectionStatus::Retrying { attempt, limit } => {
                write!(f, "Disconnected. Retrying... ({attempt}/{limit})")
            }
            ConnectionStatus::Exhausted => {
                f.write_str("Disconnected. Retry limit reached. Please refresh to reconnect.")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    state: ConnectionState,
    retry_count: u32,
    policy: RetryPolicy,
}

impl ConnectionMachine {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            state: ConnectionState::Connecting,
            retry_count: 0,
            policy,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn status(&self) -> ConnectionStatus {
        match self.state {
            ConnectionState::Connected => ConnectionStatus::Connected,
            ConnectionState::Exhausted => ConnectionStatus::Exhausted,
            ConnectionState::Connecting if self.retry_count == 0 => ConnectionStatus::Connecting,
            ConnectionState::Connecting | ConnectionState::Disconnected(_) => {
                ConnectionStatus::Retrying {
                    attempt: self.retry_count,
                    limit: self.policy.max_failures,
                }
            }
        }
    }

    pub fn on_open(&mut self) {
        if self.state != ConnectionState::Connecting {
            tracing::warn!(state = ?self.state, "ignoring open outside of a connection attempt");
            return;
        }
        self.state = ConnectionState::Connected;
        self.retry_count = 0;
        tracing::info!("connected to feature stream");
    }

    /// Transport errors are only reported; the close that follows them drives
    /// the transition.
    pub fn on_error(&self, error: &dyn fmt::Display) {
        tracing::warn!(state = ?self.state, %error, "transport error");
    }

    /// Handles a closed or failed connection.
    ///
    /// Returns the delay after which a retry should be attempted, or `None`
    /// when no retry must be scheduled.
    pub fn on_close(&mut self) -> Option<Duration> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => {}
            ConnectionState::Disconnected(_) | ConnectionState::Exhausted => {
                tracing::debug!(state = ?self.state, "ignoring duplicate close");
                return None;
            }
        }

        self.retry_count += 1;
        if self.retry_count < self.policy.max_failures {
            self.state = ConnectionState::Disconnected(self.retry_count);
            tracing::info!(
                attempt = self.retry_count,
                limit = self.policy.max_failures,
                delay_ms = self.policy.delay.as_millis() as u64,
                "connection lost, scheduling retry"
            );
            Some(self.policy.delay)
        } else {
            self.state = ConnectionState::Exhausted;
            tracing::error!(
                failures = self.retry_count,
                "retry limit reached, giving up on feature stream"
            );
            None
        }
    }

    /// Called when the retry delay has elapsed. Returns whether a new
    /// connection attempt must be started.
    pub fn on_retry_elapsed(&mut self) -> bool {
        match self.state {
            ConnectionState::Disconnected(attempt) => {
                tracing::debug!(attempt, "retrying connection");
                self.state = ConnectionState::Connecting;
                true
            }
            _ => false,
        }
    }

    /// External recovery, equivalent to reloading the client.
    pub fn restart(&mut self) {
        tracing::info!(state = ?self.state, "restarting connection");
        self.state = ConnectionState::Connecting;
        self.retry_count = 0;
    }
}
