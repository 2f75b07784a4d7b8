// Socket transport seam
//
// The session actor only sees a `Connector` that yields a `Connection`: a
// sink for outbound text and a stream of inbound text. Production uses
// tokio-tungstenite; tests plug in channel-backed connections.

use async_trait::async_trait;
use futures::stream::{BoxStream, SplitSink};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum TransportError {
    #[error("could not connect: {0}")]
    Connect(String),
    #[error("socket error: {0}")]
    Socket(String),
}

/// Inbound text frames; the stream ending means the socket closed
pub type FrameStream = BoxStream<'static, Result<String, TransportError>>;

#[async_trait]
pub trait FrameSink: Send {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;
    async fn close(&mut self);
}

/// An open socket, split into its two halves
pub struct Connection {
    pub sink: Box<dyn FrameSink>,
    pub frames: FrameStream,
}

#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Perform the opening handshake against `url`
    async fn connect(&self, url: &str) -> Result<Connection, TransportError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// WebSocket implementation
// ─────────────────────────────────────────────────────────────────────────────

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Connection, TransportError> {
        let (ws, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let (sink, stream) = ws.split();

        let frames = stream
            .filter_map(|message| async move {
                match message {
                    Ok(Message::Text(text)) => Some(Ok(text)),
                    Ok(Message::Binary(bytes)) => {
                        Some(Ok(String::from_utf8_lossy(&bytes).into_owned()))
                    }
                    // Control frames are answered by tungstenite itself
                    Ok(_) => None,
                    // Orderly shutdown, not a transport error
                    Err(tungstenite::Error::ConnectionClosed)
                    | Err(tungstenite::Error::AlreadyClosed) => None,
                    Err(e) => Some(Err(TransportError::Socket(e.to_string()))),
                }
            })
            .boxed();

        Ok(Connection {
            sink: Box::new(WsSink(sink)),
            frames,
        })
    }
}

struct WsSink(SplitSink<WsStream, Message>);

#[async_trait]
impl FrameSink for WsSink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.0
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::Socket(e.to_string()))
    }

    async fn close(&mut self) {
        if let Err(e) = self.0.close().await {
            tracing::debug!("Socket close: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    /// One-shot server: greets with a text and a binary frame, records what
    /// the client sends back, then closes.
    async fn spawn_ws_server() -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

            ws.send(Message::Text("hello".to_string())).await.unwrap();
            ws.send(Message::Binary(b"caf\xc3\xa9 \xff".to_vec()))
                .await
                .unwrap();

            let mut received = Vec::new();
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                received.push(text);
            }

            ws.close(None).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
            received
        });

        (format!("ws://{}/ws/chat?token=t", addr), server)
    }

    #[tokio::test]
    async fn test_ws_connector_exchanges_frames_and_ends_on_close() {
        let (url, server) = spawn_ws_server().await;

        let Connection {
            mut sink,
            mut frames,
        } = timeout(WAIT, WsConnector.connect(&url))
            .await
            .unwrap()
            .unwrap();

        let first = timeout(WAIT, frames.next()).await.unwrap();
        assert_eq!(first, Some(Ok("hello".to_string())));

        // Binary payloads are decoded lossily
        let second = timeout(WAIT, frames.next()).await.unwrap();
        assert_eq!(second, Some(Ok("café \u{FFFD}".to_string())));

        sink.send_text(r#"{"type":"message","text":"hi"}"#.to_string())
            .await
            .unwrap();

        // A server close ends the stream without an error item
        let end = timeout(WAIT, frames.next()).await.unwrap();
        assert_eq!(end, None);

        let received = timeout(WAIT, server).await.unwrap().unwrap();
        assert_eq!(received, vec![r#"{"type":"message","text":"hi"}"#.to_string()]);
    }

    #[tokio::test]
    async fn test_ws_connector_reports_refused_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = timeout(WAIT, WsConnector.connect(&format!("ws://{}/ws/chat", addr)))
            .await
            .unwrap();
        assert!(matches!(result, Err(TransportError::Connect(_))));
    }
}
