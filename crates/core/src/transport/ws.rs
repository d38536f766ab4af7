//! WebSocket transport

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::Result;

use super::{ConnectError, Transport, TransportConnector, TransportEvent};

/// Production connector: WebSocket with a bearer token on the handshake
#[derive(Debug, Default, Clone)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransportConnector for WsConnector {
    async fn connect(
        &self,
        url: &str,
        token: &str,
    ) -> std::result::Result<Box<dyn Transport>, ConnectError> {
        let mut request = url
            .into_client_request()
            .map_err(|e| ConnectError::Failed(format!("invalid relay url: {}", e)))?;

        let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| ConnectError::Failed(format!("invalid token: {}", e)))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        match connect_async(request).await {
            Ok((stream, _response)) => Ok(Box::new(WsTransport { stream })),
            // A handshake refused on auth grounds is fatal, not transient.
            Err(WsError::Http(response))
                if response.status().as_u16() == 401 || response.status().as_u16() == 403 =>
            {
                Err(ConnectError::Rejected)
            }
            Err(e) => Err(ConnectError::Failed(e.to_string())),
        }
    }
}

/// One open WebSocket connection to the relay
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<TransportEvent> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Binary(data)) => {
                    return Some(TransportEvent::Binary(Bytes::from(data)))
                }
                Ok(Message::Text(text)) => return Some(TransportEvent::Text(text.to_string())),
                Ok(Message::Close(frame)) => {
                    return Some(TransportEvent::Closed {
                        code: frame.map(|f| u16::from(f.code)),
                    })
                }
                // Pings are answered by tungstenite internally.
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!("websocket read error: {}", e);
                    return Some(TransportEvent::Closed { code: None });
                }
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}
