//! Session configuration
//!
//! Tunables for one streaming session: relay endpoints, the fixed reconnect
//! delay, the history suppression window, and protocol limits.

use std::time::Duration;

/// Default reconnect delay after a transient disconnect
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Default history-replay suppression window
pub const DEFAULT_SUPPRESSION_WINDOW: Duration = Duration::from_secs(2);

/// Default maximum frame payload size (8MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 8 * 1024 * 1024;

/// Agents known to replay history with a leading screen clear
const DEFAULT_REPLAY_AGENTS: &[&str] = &["claude-code", "codex", "aider"];

/// Configuration for a relay streaming session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket URL of the relay stream endpoint (e.g. `wss://relay.example.com/stream`)
    pub relay_url: String,

    /// HTTP base URL of the relay API (e.g. `https://relay.example.com`)
    pub api_url: String,

    /// Fixed delay before the single reconnect attempt after a transient drop
    pub reconnect_delay: Duration,

    /// Maximum time history-replay clears are suppressed without an explicit
    /// `history_complete` message
    pub suppression_window: Duration,

    /// Maximum declared frame payload size; larger headers are a protocol violation
    pub max_frame_size: usize,

    /// Agent/app names for which history-replay suppression is enabled
    pub replay_agents: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            relay_url: "wss://localhost:8443/stream".to_string(),
            api_url: "https://localhost:8443".to_string(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            suppression_window: DEFAULT_SUPPRESSION_WINDOW,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            replay_agents: DEFAULT_REPLAY_AGENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl SessionConfig {
    /// Create config pointing at a relay host
    pub fn new(relay_url: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            relay_url: relay_url.into(),
            api_url: api_url.into(),
            ..Default::default()
        }
    }

    /// Override the reconnect delay
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Override the suppression window
    pub fn with_suppression_window(mut self, window: Duration) -> Self {
        self.suppression_window = window;
        self
    }

    /// Override the maximum frame size
    pub fn with_max_frame_size(mut self, max: usize) -> Self {
        self.max_frame_size = max;
        self
    }

    /// Replace the replay-agent allowlist
    pub fn with_replay_agents(mut self, agents: Vec<String>) -> Self {
        self.replay_agents = agents;
        self
    }
}
