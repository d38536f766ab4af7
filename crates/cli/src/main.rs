//! Interactive relay stream client
//!
//! Attaches the local terminal to a remote session streamed through a relay:
//! output arrives on binary frames and goes to stdout, keystrokes and window
//! size changes go back as JSON control messages.

mod raw_mode;
mod surface;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use crossterm::terminal;
use relaystream_core::{
    ConnectionState, HttpSessionRoster, RelaySession, SessionConfig, StaticTokenProvider,
    WsConnector,
};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use raw_mode::RawModeGuard;
use surface::StdoutSurface;

#[derive(Parser, Debug)]
#[command(name = "relaystream", about = "Attach to a remote terminal session via a relay")]
struct Args {
    /// Session id to attach to
    session: String,

    /// WebSocket URL of the relay stream endpoint
    #[arg(long, default_value = "wss://localhost:8443/stream")]
    relay: String,

    /// HTTP base URL of the relay API
    #[arg(long, default_value = "https://localhost:8443")]
    api: String,

    /// Bearer token; falls back to the RELAY_TOKEN environment variable
    #[arg(long)]
    token: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

/// Local events feeding the main loop
enum CliEvent {
    Input(String),
    Resize(u16, u16),
    Eof,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args.log_level);

    let token = args.token.or_else(|| std::env::var("RELAY_TOKEN").ok());
    let roster = Arc::new(HttpSessionRoster::new(args.api.clone()));
    let config = SessionConfig::new(args.relay, args.api);

    let session = RelaySession::start(
        args.session,
        config,
        Arc::new(StaticTokenProvider::new(token)),
        roster,
        Arc::new(WsConnector::new()),
        Box::new(StdoutSurface::new()),
    );

    // Non-TTY environments still work, just without raw keystrokes.
    let guard = match RawModeGuard::enable() {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: raw mode not available: {}", e);
            None
        }
    };

    if let Ok((cols, rows)) = terminal::size() {
        session.notify_resize(cols, rows);
    }

    let (event_tx, mut event_rx) = mpsc::channel::<CliEvent>(32);

    // SIGWINCH handler for dynamic terminal resize
    let resize_tx = event_tx.clone();
    tokio::spawn(async move {
        let Ok(mut stream) = signal(SignalKind::window_change()) else {
            return;
        };
        while stream.recv().await.is_some() {
            if let Ok((cols, rows)) = terminal::size() {
                if resize_tx.send(CliEvent::Resize(cols, rows)).await.is_err() {
                    break;
                }
            }
        }
    });

    // Raw stdin bytes become input messages; EOF ends the session.
    let stdin_tx = event_tx;
    let stdin_task = tokio::task::spawn_blocking(move || {
        use std::io::Read;

        let mut stdin = std::io::stdin();
        let mut buf = [0u8; 1024];
        loop {
            match stdin.read(&mut buf) {
                Ok(0) | Err(_) => {
                    let _ = stdin_tx.blocking_send(CliEvent::Eof);
                    break;
                }
                Ok(n) => {
                    let data = String::from_utf8_lossy(&buf[..n]).into_owned();
                    if stdin_tx.blocking_send(CliEvent::Input(data)).is_err() {
                        break;
                    }
                }
            }
        }
    });

    enum Tick {
        Event(Option<CliEvent>),
        Changed(bool),
    }

    let mut state = session.watch_state();
    let exit_state = loop {
        let tick = tokio::select! {
            event = event_rx.recv() => Tick::Event(event),
            changed = state.changed() => Tick::Changed(changed.is_ok()),
        };

        match tick {
            Tick::Event(Some(CliEvent::Input(data))) => session.input(data),
            Tick::Event(Some(CliEvent::Resize(cols, rows))) => session.notify_resize(cols, rows),
            Tick::Event(Some(CliEvent::Eof)) | Tick::Event(None) => break None,
            Tick::Changed(true) => {
                let current = state.borrow_and_update().clone();
                if let Some(msg) = current.user_message() {
                    eprintln!("\r[relaystream] {}", msg);
                }
                if current.is_terminal() {
                    break Some(current);
                }
            }
            Tick::Changed(false) => break None,
        }
    };

    stdin_task.abort();
    session.stop().await;
    drop(guard);
    eprintln!("connection closed");

    if let Some(ConnectionState::Failed(failure)) = exit_state {
        anyhow::bail!("{}", failure.user_message());
    }
    Ok(())
}

/// Setup logging with tracing; all output goes to stderr so stdout stays
/// clean for session output.
fn setup_logging(level: &str) {
    let log_level = level.parse::<Level>().unwrap_or(Level::WARN);

    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
