//! Terminal surface backed by local stdout

use std::io::Write;

use relaystream_core::{Result, TerminalSurface};

/// Passes decoded session output straight through to the attached terminal
pub struct StdoutSurface {
    stdout: std::io::Stdout,
}

impl StdoutSurface {
    pub fn new() -> Self {
        Self {
            stdout: std::io::stdout(),
        }
    }
}

impl TerminalSurface for StdoutSurface {
    fn write(&mut self, text: &str) -> Result<()> {
        let mut lock = self.stdout.lock();
        lock.write_all(text.as_bytes())?;
        lock.flush()?;
        Ok(())
    }

    fn resize(&mut self, cols: u16, rows: u16) -> Result<()> {
        // A passthrough terminal cannot change its own window; the remote
        // geometry is informational here.
        tracing::debug!("remote geometry now {}x{}", cols, rows);
        Ok(())
    }
}
