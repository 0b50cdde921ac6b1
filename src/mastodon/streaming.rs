use super::client::MastodonClient;
use super::traits::{EventSource, EventStream};
use super::types::{Status, StreamEvent};
use crate::error::MastodonError;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use url::Url;

/// Mastodon user stream over the streaming WebSocket API.
pub struct UserStream {
    url: Url,
    access_token: String,
}

/// Raw streaming frame: `{"stream": [...], "event": "update", "payload": "..."}`.
/// `payload` is itself JSON-encoded for status events.
#[derive(Debug, Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    payload: Option<String>,
}

impl UserStream {
    pub fn new(client: &MastodonClient) -> Result<Self, MastodonError> {
        Ok(Self {
            url: streaming_url(client.server())?,
            access_token: client.access_token().to_string(),
        })
    }
}

/// `https://host` → `wss://host/api/v1/streaming?stream=user`
pub fn streaming_url(server: &Url) -> Result<Url, MastodonError> {
    let mut url = server
        .join("/api/v1/streaming")
        .map_err(|e| MastodonError::Endpoint(e.to_string()))?;
    let scheme = match server.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => {
            return Err(MastodonError::Endpoint(format!(
                "cannot stream over '{other}'"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| MastodonError::Endpoint(format!("cannot switch {server} to {scheme}")))?;
    url.query_pairs_mut().append_pair("stream", "user");
    Ok(url)
}

/// Decode one text frame. `None` means the frame carried nothing worth
/// reporting (heartbeats, blank keep-alives).
pub fn parse_frame(text: &str) -> Option<StreamEvent> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let frame: Frame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            tracing::debug!(error = %e, "skipping undecodable stream frame");
            return None;
        }
    };

    match frame.event.as_str() {
        "update" => {
            let payload = frame.payload?;
            match serde_json::from_str::<Status>(&payload) {
                Ok(status) => Some(StreamEvent::Update(Box::new(status))),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping update frame with malformed status");
                    None
                }
            }
        }
        "delete" => frame.payload.map(StreamEvent::Delete),
        other => Some(StreamEvent::Other(other.to_string())),
    }
}

#[async_trait]
impl EventSource for UserStream {
    async fn connect(&self) -> Result<EventStream, MastodonError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| MastodonError::Connect(e.to_string()))?;
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.access_token))
            .map_err(|e| MastodonError::Connect(format!("invalid access token header: {e}")))?;
        request.headers_mut().insert("Authorization", auth);

        let (mut ws, _) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| MastodonError::Connect(e.to_string()))?;

        let events = async_stream::stream! {
            while let Some(msg) = ws.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        yield parse_frame(&text).unwrap_or(StreamEvent::Heartbeat);
                    }
                    Ok(Message::Close(frame)) => {
                        let reason = frame
                            .map(|f| {
                                format!(
                                    "closed by server ({}): {}",
                                    u16::from(f.code),
                                    f.reason.as_str()
                                )
                            })
                            .unwrap_or_else(|| "closed by server".to_string());
                        yield StreamEvent::Error(reason);
                        break;
                    }
                    Ok(Message::Ping(_) | Message::Pong(_)) => {
                        yield StreamEvent::Heartbeat;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        yield StreamEvent::Error(e.to_string());
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(events))
    }
}
