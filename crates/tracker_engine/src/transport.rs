use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracker_core::{join_channels, Channel};
use tracker_logging::tracker_trace;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("invalid endpoint {url}: {message}")]
    InvalidEndpoint { url: String, message: String },
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),
    #[error("send failed: {0}")]
    Send(String),
    #[error("receive failed: {0}")]
    Receive(String),
}

/// Establishes one duplex link with the channel set encoded in the handshake.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, channels: &[Channel]) -> Result<Box<dyn Link>, TransportError>;
}

/// An established text-frame link.
#[async_trait::async_trait]
pub trait Link: Send {
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Next text payload; `None` once the remote closed the stream.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;
}

/// Websocket connector for the `/api/ws?channels=...` endpoint.
#[derive(Debug, Clone)]
pub struct WsConnector {
    endpoint: String,
    bearer_token: Option<String>,
    connect_timeout: Duration,
}

impl WsConnector {
    pub fn new(
        endpoint: impl Into<String>,
        bearer_token: Option<String>,
        connect_timeout: Duration,
    ) -> Self {
        // Process-wide for `wss://`; a provider installed earlier stays in place.
        let _ = rustls::crypto::ring::default_provider().install_default();
        Self {
            endpoint: endpoint.into(),
            bearer_token,
            connect_timeout,
        }
    }

    pub fn handshake_url(&self, channels: &[Channel]) -> Result<Url, TransportError> {
        let mut url = Url::parse(&self.endpoint).map_err(|err| TransportError::InvalidEndpoint {
            url: self.endpoint.clone(),
            message: err.to_string(),
        })?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(TransportError::InvalidEndpoint {
                url: self.endpoint.clone(),
                message: format!("unsupported scheme {}", url.scheme()),
            });
        }
        if !channels.is_empty() {
            url.query_pairs_mut()
                .append_pair("channels", &join_channels(channels));
        }
        Ok(url)
    }
}

#[async_trait::async_trait]
impl Connector for WsConnector {
    async fn connect(&self, channels: &[Channel]) -> Result<Box<dyn Link>, TransportError> {
        let url = self.handshake_url(channels)?;
        let invalid = |message: String| TransportError::InvalidEndpoint {
            url: url.to_string(),
            message,
        };

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|err| invalid(err.to_string()))?;
        if let Some(token) = &self.bearer_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|err| invalid(err.to_string()))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (stream, _response) = tokio::time::timeout(self.connect_timeout, connect_async(request))
            .await
            .map_err(|_| TransportError::ConnectTimeout(self.connect_timeout))?
            .map_err(|err| TransportError::Connect(err.to_string()))?;

        Ok(Box::new(WsLink { stream }))
    }
}

struct WsLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait::async_trait]
impl Link for WsLink {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|err| TransportError::Send(err.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => tracker_trace!("dropping non-utf8 binary frame"),
                },
                Ok(Message::Close(_)) => return None,
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(err) => return Some(Err(TransportError::Receive(err.to_string()))),
            }
        }
    }
}
