//! Server-sent-event subscription handling.
//!
//! The backend streams `data: <json>\n\n` frames. A reader task parses
//! them into `AgentUpdate`s and feeds a channel; dropping the returned
//! stream stops the reader and closes the connection.

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use forge_client_core::{AgentUpdate, ApiError, StreamError, UpdateStream};

/// Open the subscription and spawn its reader task.
pub(crate) async fn open(
    http: reqwest::Client,
    url: String,
    token: Option<String>,
) -> Result<UpdateStream, ApiError> {
    let mut builder = http.get(&url);
    if let Some(token) = token {
        builder = builder.bearer_auth(token);
    }
    let response = builder
        .send()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: crate::http::error_message(status, &body),
        });
    }

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(read_loop(response, tx));
    Ok(UnboundedReceiverStream::new(rx).boxed())
}

async fn read_loop(
    response: reqwest::Response,
    tx: mpsc::UnboundedSender<Result<AgentUpdate, StreamError>>,
) {
    let mut chunks = response.bytes_stream();
    let mut buffer = FrameBuffer::default();

    while let Some(chunk) = chunks.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                let _ = tx.send(Err(StreamError::Connection(e.to_string())));
                return;
            }
        };

        for payload in buffer.push(&String::from_utf8_lossy(&chunk)) {
            match serde_json::from_str::<AgentUpdate>(&payload) {
                Ok(update) => {
                    if tx.send(Ok(update)).is_err() {
                        // Subscriber gone; closing the connection.
                        return;
                    }
                }
                Err(e) => {
                    tracing::debug!("malformed SSE payload: {e}");
                    let _ = tx.send(Err(StreamError::Payload(e.to_string())));
                    return;
                }
            }
        }
    }
}

/// Reassembles `data:` payloads from arbitrarily split byte chunks.
#[derive(Default)]
struct FrameBuffer {
    pending: String,
}

impl FrameBuffer {
    /// Feed a chunk, returning every complete data payload it closed.
    fn push(&mut self, chunk: &str) -> Vec<String> {
        self.pending.push_str(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=pos).collect();
            if let Some(payload) = data_payload(line.trim_end()) {
                payloads.push(payload.to_string());
            }
        }
        payloads
    }
}

/// Strip the `data:` field prefix; blank lines and `:` comments yield
/// nothing.
fn data_payload(line: &str) -> Option<&str> {
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    line.strip_prefix("data:").map(str::trim_start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_prefix_stripping() {
        assert_eq!(data_payload("data: {\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(data_payload("data:{\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(data_payload(""), None);
        assert_eq!(data_payload(": keepalive comment"), None);
        assert_eq!(data_payload("event: message"), None);
    }

    #[test]
    fn test_frame_reassembly_across_chunks() {
        let mut buffer = FrameBuffer::default();
        assert!(buffer.push("data: {\"type\":").is_empty());
        let payloads = buffer.push(" \"keepalive\"}\n\ndata: {\"x\":1}\n");
        assert_eq!(
            payloads,
            vec![r#"{"type": "keepalive"}"#.to_string(), r#"{"x":1}"#.to_string()]
        );
    }

    #[test]
    fn test_keepalive_payload_decodes() {
        let mut buffer = FrameBuffer::default();
        let payloads = buffer.push("data: {\"type\": \"keepalive\"}\n\n");
        let update: AgentUpdate = serde_json::from_str(&payloads[0]).unwrap();
        assert!(update.is_keepalive());
    }

    #[test]
    fn test_crlf_lines() {
        let mut buffer = FrameBuffer::default();
        let payloads = buffer.push("data: {\"type\": \"status\", \"status\": \"queued\"}\r\n\r\n");
        assert_eq!(payloads.len(), 1);
        let update: AgentUpdate = serde_json::from_str(&payloads[0]).unwrap();
        assert!(!update.is_keepalive());
    }
}
