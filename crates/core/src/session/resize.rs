//! Geometry tracking and resize echo-loop prevention
//!
//! Geometry flows both ways: the local surface reports user resizes that must
//! reach the relay, and the relay pushes remote geometry that must be applied
//! to the surface. Applying remote geometry makes the surface fire its own
//! resize notification; without suppression that notification would be sent
//! straight back to the relay as a `resize_request`, echoing forever.

use crate::error::Result;
use crate::terminal::TerminalSurface;

/// Terminal size in columns and rows, always at least 1x1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub cols: u16,
    pub rows: u16,
}

impl Geometry {
    /// Build a geometry, clamping values below 1 up to 1
    pub fn clamped(cols: u16, rows: u16) -> Self {
        Self {
            cols: cols.max(1),
            rows: rows.max(1),
        }
    }
}

/// Tracks last-known geometry and suppresses echoed resize requests
#[derive(Debug, Default)]
pub struct ResizeCoordinator {
    current: Option<Geometry>,
    suppress: u32,
}

impl ResizeCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last-known geometry, local or remote
    pub fn current(&self) -> Option<Geometry> {
        self.current
    }

    /// Record a locally-reported geometry change
    ///
    /// Returns the geometry to send as a `resize_request`, or `None` when the
    /// notification is an echo of a remote apply (suppress counter non-zero)
    /// or a no-op (geometry unchanged).
    pub fn note_local(&mut self, cols: u16, rows: u16) -> Option<Geometry> {
        let geometry = Geometry::clamped(cols, rows);
        if self.suppress > 0 {
            self.current = Some(geometry);
            return None;
        }
        if self.current == Some(geometry) {
            return None;
        }
        self.current = Some(geometry);
        Some(geometry)
    }

    /// Apply a remote `resize` control message to the surface
    ///
    /// Skips the apply entirely when the geometry already matches. The
    /// suppress counter is held across the apply and released even when the
    /// surface fails, so a failed apply cannot leave resizes muted.
    pub fn apply_remote(
        &mut self,
        surface: &mut dyn TerminalSurface,
        cols: u16,
        rows: u16,
    ) -> Result<()> {
        let geometry = Geometry::clamped(cols, rows);
        if self.current == Some(geometry) {
            return Ok(());
        }

        self.suppress += 1;
        let result = surface.resize(geometry.cols, geometry.rows);
        self.suppress -= 1;
        self.current = Some(geometry);
        result
    }
}
