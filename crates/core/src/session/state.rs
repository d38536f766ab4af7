//! Connection lifecycle states

/// Fatal or surfaced failure classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// No access token was available; requires re-authentication
    AuthMissing,

    /// The relay rejected the credentials (handshake refusal or close 1008)
    AuthRejected,

    /// The session roster query itself failed
    Roster(String),

    /// The relay sent an `error` control message; transport stays open
    Relay(String),
}

impl Failure {
    /// User-facing message for this failure
    pub fn user_message(&self) -> String {
        match self {
            Failure::AuthMissing => "sign in to view the stream".to_string(),
            Failure::AuthRejected => "authentication credentials rejected".to_string(),
            Failure::Roster(msg) => format!("could not reach the relay: {}", msg),
            Failure::Relay(msg) => msg.clone(),
        }
    }

    /// True if the failure stops the session for good (no reconnect)
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Failure::Relay(_))
    }
}

/// Current lifecycle phase of a streaming session
///
/// Exactly one state is active at a time; transitions happen only inside the
/// session driver and are published on a watch channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Created but not yet started
    Idle,

    /// Verifying the token and the relay's active-session roster
    CheckingSession,

    /// The session id is absent from the roster; terminal, no auto-retry
    SessionMissing,

    /// Opening the transport
    Connecting,

    /// Live stream
    Connected,

    /// Transient drop; one reconnect is pending
    Disconnected,

    /// The remote session ended explicitly; terminal
    Ended,

    /// Failed; fatal unless the failure is relay-reported
    Failed(Failure),
}

impl ConnectionState {
    /// User-facing status line for this state, if one applies
    pub fn user_message(&self) -> Option<String> {
        match self {
            ConnectionState::Disconnected => {
                Some("connection lost, reconnecting…".to_string())
            }
            ConnectionState::SessionMissing => {
                Some("session not registered with relay".to_string())
            }
            ConnectionState::Ended => Some("session ended".to_string()),
            ConnectionState::Failed(failure) => Some(failure.user_message()),
            _ => None,
        }
    }

    /// True once the session can make no further progress
    pub fn is_terminal(&self) -> bool {
        match self {
            ConnectionState::SessionMissing | ConnectionState::Ended => true,
            ConnectionState::Failed(failure) => failure.is_fatal(),
            _ => false,
        }
    }
}
