//! Relaystream Core - Client-side logic for relayed terminal streams
//!
//! This crate provides:
//! - Session lifecycle driver (connect, pump, reconnect)
//! - Wire protocol handling (binary frames, JSON control channel)
//! - Incremental UTF-8 decoding of the output stream
//! - Resize coordination and history-replay suppression
//! - Terminal surface abstraction trait
//! - Session discovery (auth token + relay roster)
//! - Error types

pub mod config;
pub mod error;
pub mod protocol;
pub mod session;
pub mod terminal;
pub mod transport;

// Re-export common types
pub use config::SessionConfig;
pub use error::{Result, StreamError};
pub use protocol::{ClientMessage, ControlMessage, Frame, FrameDecoder, FrameKind};
pub use session::discovery::{AuthProvider, HttpSessionRoster, SessionRoster, StaticTokenProvider};
pub use session::{ConnectionState, Failure, RelaySession};
pub use terminal::{MockSurface, TerminalSurface};
pub use transport::{TransportConnector, WsConnector};
