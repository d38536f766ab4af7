//! Terminal surface abstraction

use crate::error::Result;

/// External rendering collaborator the session writes decoded output to
///
/// Input and resize notifications flow the other way, through
/// [`RelaySession::input`](crate::RelaySession::input) and
/// [`RelaySession::notify_resize`](crate::RelaySession::notify_resize).
pub trait TerminalSurface: Send {
    /// Write decoded terminal output text
    fn write(&mut self, text: &str) -> Result<()>;

    /// Apply a remote geometry change
    fn resize(&mut self, cols: u16, rows: u16) -> Result<()>;
}

/// Mock terminal surface for testing
///
/// Records all writes and resizes for assertion.
#[derive(Debug, Default)]
pub struct MockSurface {
    writes: Vec<String>,
    resizes: Vec<(u16, u16)>,
    fail_resize: bool,
}

impl MockSurface {
    /// Create an empty mock surface
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `resize` calls fail
    pub fn fail_resizes(&mut self) {
        self.fail_resize = true;
    }

    /// All text written so far, concatenated
    pub fn output(&self) -> String {
        self.writes.concat()
    }

    /// Individual write calls
    pub fn writes(&self) -> &[String] {
        &self.writes
    }

    /// Recorded resize calls
    pub fn resizes(&self) -> &[(u16, u16)] {
        &self.resizes
    }
}

impl TerminalSurface for MockSurface {
    fn write(&mut self, text: &str) -> Result<()> {
        self.writes.push(text.to_string());
        Ok(())
    }

    fn resize(&mut self, cols: u16, rows: u16) -> Result<()> {
        if self.fail_resize {
            return Err(crate::error::StreamError::Surface(
                "resize rejected".to_string(),
            ));
        }
        self.resizes.push((cols, rows));
        Ok(())
    }
}
