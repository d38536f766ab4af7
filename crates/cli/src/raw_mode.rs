//! Raw mode terminal wrapper for crossterm
//!
//! Restores the terminal to cooked mode on drop (even on panic).

use anyhow::Result;
use crossterm::terminal;

/// Guard that enables raw mode and restores normal mode on drop
pub struct RawModeGuard;

impl RawModeGuard {
    /// Enable raw mode for the terminal.
    ///
    /// Raw mode disables line buffering and local echo, and delivers Ctrl+C
    /// as a plain 0x03 byte so it reaches the remote session.
    pub fn enable() -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        // Best-effort restore - ignore errors during cleanup
        let _ = terminal::disable_raw_mode();
    }
}
