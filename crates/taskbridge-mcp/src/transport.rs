//! Newline-delimited JSON-RPC framing over async byte streams.
//!
//! Each message is a single line of JSON. Blank lines are skipped; anything
//! that fails to parse is surfaced as [`Incoming::Invalid`] so the server can
//! answer with a parse error instead of dropping the connection.

use std::io;

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use crate::protocol::{JsonRpcNotification, JsonRpcRequest};

/// A decoded inbound frame.
#[derive(Debug, Clone)]
pub enum Incoming {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
    /// The line was not a valid JSON-RPC message.
    Invalid(String),
}

/// Reads one JSON-RPC message per line.
pub struct LineReader<R> {
    reader: R,
    line: String,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
        }
    }

    /// Next message, or `None` at end of input.
    pub async fn next_message(&mut self) -> io::Result<Option<Incoming>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line).await? == 0 {
                return Ok(None);
            }

            let line = self.line.trim();
            if line.is_empty() {
                continue;
            }

            trace!(line = %line, "Received frame");
            return Ok(Some(decode(line)));
        }
    }
}

fn decode(line: &str) -> Incoming {
    let value: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => return Incoming::Invalid(e.to_string()),
    };

    // A frame with an `id` expects a response.
    let parsed = if value.get("id").is_some() {
        serde_json::from_value(value).map(Incoming::Request)
    } else {
        serde_json::from_value(value).map(Incoming::Notification)
    };

    parsed.unwrap_or_else(|e| Incoming::Invalid(e.to_string()))
}

/// Writes one JSON message per line and flushes after each.
pub struct LineWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn write<T: Serialize>(&mut self, message: &T) -> io::Result<()> {
        let mut json = serde_json::to_vec(message)?;
        debug!(bytes = json.len(), "Sending frame");
        json.push(b'\n');
        self.writer.write_all(&json).await?;
        self.writer.flush().await
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{JsonRpcResponse, RequestId};
    use serde_json::json;
    use std::io::Cursor;

    async fn read_all(input: &str) -> Vec<Incoming> {
        let mut reader = LineReader::new(Cursor::new(input.as_bytes().to_vec()));
        let mut out = Vec::new();
        while let Some(msg) = reader.next_message().await.unwrap() {
            out.push(msg);
        }
        out
    }

    #[tokio::test]
    async fn test_read_request_and_notification() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
        );

        let messages = read_all(input).await;

        assert_eq!(messages.len(), 2);
        match &messages[0] {
            Incoming::Request(req) => {
                assert_eq!(req.id, RequestId::Number(1));
                assert_eq!(req.method, "tools/list");
            }
            other => panic!("expected request, got {:?}", other),
        }
        match &messages[1] {
            Incoming::Notification(n) => assert_eq!(n.method, "notifications/initialized"),
            other => panic!("expected notification, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_blank_lines_are_skipped() {
        let input = "\n\n  \n{\"jsonrpc\":\"2.0\",\"id\":\"a\",\"method\":\"ping\"}\n\n";

        let messages = read_all(input).await;

        assert_eq!(messages.len(), 1);
        assert!(matches!(&messages[0], Incoming::Request(r) if r.id == RequestId::String("a".into())));
    }

    #[tokio::test]
    async fn test_garbage_is_invalid() {
        let messages = read_all("not json\n{\"id\":1}\n").await;

        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], Incoming::Invalid(_)));
        // Has an id but no method.
        assert!(matches!(messages[1], Incoming::Invalid(_)));
    }

    #[tokio::test]
    async fn test_last_line_without_newline() {
        let messages = read_all(r#"{"jsonrpc":"2.0","method":"x"}"#).await;
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn test_write_is_line_delimited() {
        let mut writer = LineWriter::new(Vec::new());

        writer
            .write(&JsonRpcResponse::success(RequestId::Number(1), json!({})))
            .await
            .unwrap();
        writer
            .write(&JsonRpcResponse::success(RequestId::Number(2), json!({"ok": true})))
            .await
            .unwrap();

        let output = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"jsonrpc":"2.0","id":1,"result":{}}"#);
        assert!(output.ends_with('\n'));
    }
}
