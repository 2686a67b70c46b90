//! WebSocket frame source
//!
//! Connects to the telemetry server, forwards each binary message as one
//! frame buffer, and reconnects after a fixed delay whenever the link
//! drops. Length checks are left to the decoder.

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("connection closed by server")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub url: String,
    pub reconnect_delay_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: "ws://192.168.23.3:8080".to_string(),
            reconnect_delay_secs: 5,
        }
    }
}

/// How a session ended without a transport error
enum SessionEnd {
    /// Nobody is reading frames any more
    ReceiverClosed,
}

pub struct WebSocketSource {
    config: TransportConfig,
}

impl WebSocketSource {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    /// Run until `tx`'s receiver is dropped, reconnecting on every failure.
    pub async fn run(self, tx: mpsc::Sender<Vec<u8>>) {
        let delay = Duration::from_secs(self.config.reconnect_delay_secs);

        loop {
            match self.session(&tx).await {
                Ok(SessionEnd::ReceiverClosed) => break,
                Err(e) => log::warn!("Telemetry link to {} lost: {}", self.config.url, e),
            }

            if tx.is_closed() {
                break;
            }
            log::info!("Reconnecting in {:?}...", delay);
            tokio::time::sleep(delay).await;
            if tx.is_closed() {
                break;
            }
        }

        log::info!("Telemetry source stopped");
    }

    async fn session(&self, tx: &mpsc::Sender<Vec<u8>>) -> Result<SessionEnd, TransportError> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(self.config.url.as_str()).await?;
        log::info!("Connected to {}", self.config.url);

        let (_write, mut read) = ws_stream.split();
        while let Some(msg) = read.next().await {
            match msg? {
                Message::Binary(data) => {
                    if tx.send(data).await.is_err() {
                        return Ok(SessionEnd::ReceiverClosed);
                    }
                }
                Message::Text(text) => log::debug!("Ignoring text message: {}", text),
                Message::Close(_) => return Err(TransportError::Closed),
                _ => {}
            }
        }
        Err(TransportError::Closed)
    }
}
