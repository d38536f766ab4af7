//! Wire protocol handling
//!
//! Binary output frames (5-byte header + payload) and the JSON control
//! channel that rides the transport's text frames.

pub mod control;
pub mod frame;
pub mod utf8;

pub use control::{AgentMetadata, ClientMessage, ControlMessage};
pub use frame::{ByteAccumulator, Frame, FrameDecoder, FrameKind, FRAME_HEADER_LEN};
pub use utf8::Utf8Stream;
