//! History-replay clear suppression
//!
//! Some agents replay session history after a (re)connect by first emitting a
//! full-screen-clear escape sequence. Honoring that clear makes the terminal
//! visibly flicker, so for known replaying agents the clears are swallowed
//! during a short window: until the relay sends `history_complete` or the
//! window deadline expires, whichever comes first.

use std::time::Duration;

use tokio::time::Instant;

use crate::protocol::AgentMetadata;

/// Full-screen-clear sequences swallowed during replay:
/// `CSI 2J` (erase display), `CSI 3J` (erase scrollback), `ESC c` (reset)
const CLEAR_SEQUENCES: [&str; 3] = ["\x1b[2J", "\x1b[3J", "\x1bc"];

/// History-replay suppression window over the output text stream
#[derive(Debug)]
pub struct HistorySuppression {
    window: Duration,
    deadline: Option<Instant>,
    complete: bool,
    /// Trailing bytes that may be the start of a clear sequence split
    /// across chunks; flushed once resolved or once the window closes.
    carry: String,
    swallowed: u64,
}

impl HistorySuppression {
    /// Create a policy with the given window length; starts disabled
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
            complete: false,
            carry: String::new(),
            swallowed: 0,
        }
    }

    /// Decide enablement from agent metadata
    ///
    /// A declared `history_policy` wins outright (`"replay"` enables,
    /// anything else disables); without one, a known replaying agent or app
    /// name enables suppression.
    pub fn configure(&mut self, metadata: &AgentMetadata, replay_agents: &[String], now: Instant) {
        let enabled = match metadata.history_policy.as_deref() {
            Some("replay") => true,
            Some(_) => false,
            None => [&metadata.agent, &metadata.app]
                .into_iter()
                .flatten()
                .any(|name| replay_agents.iter().any(|a| a == name)),
        };

        if enabled {
            tracing::debug!("history replay suppression enabled for {:?}", metadata.agent);
            self.deadline = Some(now + self.window);
            self.complete = false;
        }
    }

    /// History replay finished; close the window early
    pub fn mark_complete(&mut self) {
        self.complete = true;
    }

    /// True while clears are being swallowed
    pub fn active(&self, now: Instant) -> bool {
        !self.complete && self.deadline.map_or(false, |deadline| now < deadline)
    }

    /// Number of clear sequences swallowed so far
    pub fn swallowed(&self) -> u64 {
        self.swallowed
    }

    /// Filter one chunk of decoded output text
    ///
    /// Outside the window the text passes through untouched (after flushing
    /// any held-back partial sequence). Inside it, complete clear sequences
    /// are removed and a trailing partial clear prefix is held back until the
    /// next chunk decides it.
    pub fn filter(&mut self, chunk: &str, now: Instant) -> String {
        if !self.active(now) {
            if self.carry.is_empty() {
                return chunk.to_string();
            }
            let mut text = std::mem::take(&mut self.carry);
            text.push_str(chunk);
            return text;
        }

        let mut text = std::mem::take(&mut self.carry);
        text.push_str(chunk);
        self.strip_clears(&text)
    }

    /// Reset all window state (connection teardown)
    pub fn reset(&mut self) {
        self.deadline = None;
        self.complete = false;
        self.carry.clear();
    }

    fn strip_clears(&mut self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut pos = 0;

        while pos < text.len() {
            let Some(esc) = text[pos..].find('\x1b') else {
                out.push_str(&text[pos..]);
                break;
            };
            out.push_str(&text[pos..pos + esc]);
            let rest = &text[pos + esc..];

            if let Some(seq) = CLEAR_SEQUENCES.iter().find(|seq| rest.starts_with(**seq)) {
                self.swallowed += 1;
                tracing::trace!("swallowed history clear sequence");
                pos += esc + seq.len();
                continue;
            }

            // `rest` runs to the end of the chunk; if it could still become
            // a clear sequence, hold it back for the next chunk.
            if CLEAR_SEQUENCES.iter().any(|seq| seq.starts_with(rest)) {
                self.carry = rest.to_string();
                break;
            }

            // Unrelated escape sequence, pass the ESC through.
            out.push('\x1b');
            pos += esc + 1;
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replay_metadata() -> AgentMetadata {
        AgentMetadata {
            history_policy: Some("replay".to_string()),
            agent: None,
            app: None,
        }
    }

    fn agents() -> Vec<String> {
        vec!["claude-code".to_string()]
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_passes_clears_through() {
        let mut policy = HistorySuppression::new(Duration::from_secs(2));
        let now = Instant::now();
        assert_eq!(policy.filter("\x1b[2Jhello", now), "\x1b[2Jhello");
    }

    #[tokio::test(start_paused = true)]
    async fn test_clears_swallowed_while_active() {
        let mut policy = HistorySuppression::new(Duration::from_secs(2));
        let now = Instant::now();
        policy.configure(&replay_metadata(), &agents(), now);

        assert_eq!(policy.filter("\x1b[2J\x1b[3Jhistory", now), "history");
        assert_eq!(policy.swallowed(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mark_complete_closes_window_before_deadline() {
        let mut policy = HistorySuppression::new(Duration::from_secs(2));
        let start = Instant::now();
        policy.configure(&replay_metadata(), &agents(), start);

        // t = 400ms: still swallowing.
        let t1 = start + Duration::from_millis(400);
        assert_eq!(policy.filter("\x1b[2Ja", t1), "a");

        // history_complete at t = 500ms; the 2s deadline no longer matters.
        policy.mark_complete();
        let t2 = start + Duration::from_millis(500);
        assert_eq!(policy.filter("\x1b[2Jb", t2), "\x1b[2Jb");
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expiry_closes_window() {
        let mut policy = HistorySuppression::new(Duration::from_secs(2));
        let start = Instant::now();
        policy.configure(&replay_metadata(), &agents(), start);

        let before = start + Duration::from_millis(1999);
        assert!(policy.active(before));
        assert_eq!(policy.filter("\x1b[2J", before), "");

        let after = start + Duration::from_millis(2000);
        assert!(!policy.active(after));
        assert_eq!(policy.filter("\x1b[2Jdone", after), "\x1b[2Jdone");
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_split_across_chunks() {
        let mut policy = HistorySuppression::new(Duration::from_secs(2));
        let now = Instant::now();
        policy.configure(&replay_metadata(), &agents(), now);

        assert_eq!(policy.filter("abc\x1b[2", now), "abc");
        assert_eq!(policy.filter("Jdef", now), "def");
        assert_eq!(policy.swallowed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_that_never_completes_is_flushed() {
        let mut policy = HistorySuppression::new(Duration::from_secs(2));
        let now = Instant::now();
        policy.configure(&replay_metadata(), &agents(), now);

        assert_eq!(policy.filter("\x1b[", now), "");
        // Next chunk shows it was a cursor move, not a clear.
        assert_eq!(policy.filter("5;1Hx", now), "\x1b[5;1Hx");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrelated_escapes_untouched() {
        let mut policy = HistorySuppression::new(Duration::from_secs(2));
        let now = Instant::now();
        policy.configure(&replay_metadata(), &agents(), now);

        assert_eq!(policy.filter("\x1b[31mred\x1b[0m", now), "\x1b[31mred\x1b[0m");
        assert_eq!(policy.swallowed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enablement_by_agent_allowlist() {
        let mut policy = HistorySuppression::new(Duration::from_secs(2));
        let now = Instant::now();
        let metadata = AgentMetadata {
            history_policy: None,
            agent: Some("claude-code".to_string()),
            app: None,
        };
        policy.configure(&metadata, &agents(), now);
        assert!(policy.active(now));
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_policy_overrides_allowlist() {
        let mut policy = HistorySuppression::new(Duration::from_secs(2));
        let now = Instant::now();
        let metadata = AgentMetadata {
            history_policy: Some("none".to_string()),
            agent: Some("claude-code".to_string()),
            app: None,
        };
        policy.configure(&metadata, &agents(), now);
        assert!(!policy.active(now));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_agent_not_enabled() {
        let mut policy = HistorySuppression::new(Duration::from_secs(2));
        let now = Instant::now();
        let metadata = AgentMetadata {
            history_policy: None,
            agent: Some("mystery".to_string()),
            app: None,
        };
        policy.configure(&metadata, &agents(), now);
        assert!(!policy.active(now));
    }
}
