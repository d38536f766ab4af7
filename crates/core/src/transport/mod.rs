//! Message transport abstraction
//!
//! The relay speaks a message transport with three inbound event kinds:
//! binary messages (terminal output frames), text messages (JSON control),
//! and a close carrying an optional status code. The trait seam exists so the
//! connection lifecycle can be driven by an in-memory transport in tests; the
//! production implementation is WebSocket ([`ws`]).

pub mod ws;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::error::Result;

pub use ws::WsConnector;

/// Close code reserved by the relay for "authentication rejected"
///
/// A close with this code is fatal: no reconnect may ever be scheduled for
/// the session attempt. All other abnormal closes are transient.
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;

/// One inbound transport event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Binary message carrying output protocol frames (arbitrarily fragmented)
    Binary(Bytes),

    /// Text message carrying one JSON control message
    Text(String),

    /// Remote close with the transport-level status code, if any
    Closed { code: Option<u16> },
}

/// Error opening a transport
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The relay rejected the credentials during the handshake; fatal
    #[error("authentication rejected by relay")]
    Rejected,

    /// Anything else (DNS, refused, TLS, ...); treated as transient
    #[error("connection failed: {0}")]
    Failed(String),
}

/// An open, bidirectional message transport
#[async_trait]
pub trait Transport: Send {
    /// Send one text message
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Receive the next inbound event
    ///
    /// `None` means the stream ended without a close frame; callers treat it
    /// like an abnormal close with no code.
    async fn recv(&mut self) -> Option<TransportEvent>;

    /// Close the transport; safe to call on an already-closed transport
    async fn close(&mut self);
}

/// Opens transports toward the relay
#[async_trait]
pub trait TransportConnector: Send + Sync {
    /// Open a transport to `url`, authenticating with the bearer `token`
    async fn connect(
        &self,
        url: &str,
        token: &str,
    ) -> std::result::Result<Box<dyn Transport>, ConnectError>;
}
