//! Newline-delimited JSON-RPC over stdio.
//!
//! One request is read, dispatched and answered before the next line is
//! read. stdout carries protocol traffic only; logs go to stderr.

use crate::server::McpServer;
use crate::types::{McpError, McpRequest, McpResponse, RequestId};
use serde_json::Value;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, response: &McpResponse) -> io::Result<()> {
    let json = serde_json::to_string(response).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

/// Decode one line into a request, or the error response to send instead.
fn decode(line: &str) -> Result<McpRequest, McpResponse> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| McpResponse::error(RequestId::Null, McpError::parse_error(e)))?;

    let id = value
        .get("id")
        .cloned()
        .and_then(|id| serde_json::from_value::<RequestId>(id).ok())
        .unwrap_or_default();

    serde_json::from_value(value).map_err(|e| McpResponse::error(id, McpError::invalid_request(e)))
}

/// Serve requests from `reader` until end of input.
pub async fn serve_stdio<R, W>(server: &McpServer, reader: R, mut writer: W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("{} v{} serving on stdio", server.info().name, server.info().version);

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request = match decode(line) {
            Ok(request) => request,
            Err(response) => {
                warn!("Rejected malformed request");
                write_response(&mut writer, &response).await?;
                continue;
            }
        };

        debug!("Received {} ({:?})", request.method, request.id);
        if let Some(response) = server.handle_request(request).await {
            write_response(&mut writer, &response).await?;
        }
    }

    info!("Input closed, shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn run(input: &str) -> Vec<Value> {
        let server = McpServer::new("test-bridge", "0.0.0");
        let mut output = Vec::new();
        serve_stdio(&server, BufReader::new(input.as_bytes()), &mut output)
            .await
            .unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_session() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":"p","method":"ping"}"#,
            "\n",
        );
        let responses = run(input).await;
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[0]["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(responses[1]["result"]["tools"], serde_json::json!([]));
        assert_eq!(responses[2]["id"], "p");
    }

    #[tokio::test]
    async fn test_malformed_lines() {
        let input = "{not json\n{\"jsonrpc\":\"2.0\",\"id\":7}\n";
        let responses = run(input).await;
        assert_eq!(responses[0]["error"]["code"], McpError::PARSE_ERROR);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[1]["error"]["code"], McpError::INVALID_REQUEST);
        assert_eq!(responses[1]["id"], 7);
    }
}
