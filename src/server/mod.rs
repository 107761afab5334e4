//! Tool server speaking newline-delimited JSON-RPC 2.0 over stdio.
//!
//! Each inbound line is handled on its own task so a slow generation call
//! does not hold up `tools/list` or `ping`; a single writer task serialises
//! the responses back out, one per line.

pub mod protocol;

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_stream::{wrappers::LinesStream, StreamExt};

use crate::error::{BridgeError, Result};
use crate::jimeng::ImageTools;
use protocol::{
    tool_result, CallToolParams, RpcMessage, RpcResponse, DEFAULT_PROTOCOL_VERSION,
    INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
};

pub const SERVER_NAME: &str = "jimeng-image-generator";

#[derive(Clone)]
pub struct ToolServer {
    tools: Arc<ImageTools>,
}

impl ToolServer {
    pub fn new(tools: ImageTools) -> Self {
        Self {
            tools: Arc::new(tools),
        }
    }

    pub async fn serve_stdio(&self) -> Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        self.serve(stdin, tokio::io::stdout()).await
    }

    /// Runs until `reader` reaches EOF and every in-flight request has answered.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        use tokio::io::AsyncBufReadExt;

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let writer_task = tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                writer.write_all(line.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
            Ok::<_, std::io::Error>(())
        });

        let mut in_flight = JoinSet::new();
        let mut lines = LinesStream::new(reader.lines());
        while let Some(line) = lines.next().await {
            let line = line.map_err(|e| BridgeError::Transport(format!("stdin: {}", e)))?;
            if line.trim().is_empty() {
                continue;
            }
            let server = self.clone();
            let tx = tx.clone();
            in_flight.spawn(async move {
                if let Some(response) = server.handle_line(&line).await {
                    let _ = tx.send(response.to_string());
                }
            });
            // Reap finished handlers so the set does not grow unbounded.
            while in_flight.try_join_next().is_some() {}
        }

        while in_flight.join_next().await.is_some() {}
        drop(tx);

        writer_task
            .await
            .map_err(|e| BridgeError::Transport(format!("writer task: {}", e)))?
            .map_err(|e| BridgeError::Transport(format!("stdout: {}", e)))?;
        log::info!("👋 Input closed, server stopping");
        Ok(())
    }

    /// Handles one raw line. `None` means nothing should be written back.
    pub async fn handle_line(&self, line: &str) -> Option<Value> {
        let message: RpcMessage = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(e) => {
                log::warn!("⚠️  Unparseable message: {}", e);
                return Some(to_value(RpcResponse::error(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {}", e),
                )));
            }
        };
        self.handle_message(message).await.map(to_value)
    }

    pub async fn handle_message(&self, message: RpcMessage) -> Option<RpcResponse> {
        let Some(method) = message.method.clone() else {
            return message.id.map(|id| {
                RpcResponse::error(id, INVALID_REQUEST, "Missing method")
            });
        };

        if message.is_notification() {
            log::debug!("Notification received: {}", method);
            return None;
        }
        let id = message.id.clone().unwrap_or(Value::Null);
        log::debug!("Request {} -> {}", id, method);

        let response = match method.as_str() {
            "initialize" => RpcResponse::success(id, self.initialize(&message.params)),
            "ping" => RpcResponse::success(id, json!({})),
            "tools/list" => RpcResponse::success(
                id,
                json!({ "tools": self.tools.descriptors() }),
            ),
            "tools/call" => self.call_tool(id, message.params).await,
            other => RpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {}", other)),
        };
        Some(response)
    }

    fn initialize(&self, params: &Value) -> Value {
        let protocol_version = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);

        json!({
            "protocolVersion": protocol_version,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            },
        })
    }

    async fn call_tool(&self, id: Value, params: Value) -> RpcResponse {
        let params: CallToolParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => {
                return RpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {}", e))
            }
        };

        log::info!("🔧 Tool call: {}", params.name);
        match self.tools.call(&params.name, params.arguments).await {
            Ok(output) => RpcResponse::success(id, tool_result(output.text, output.is_error)),
            Err(e) => RpcResponse::error(id, INVALID_PARAMS, e.to_string()),
        }
    }
}

fn to_value(response: RpcResponse) -> Value {
    serde_json::to_value(response).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JimengConfig;
    use crate::jimeng::ImageClient;

    fn server() -> ToolServer {
        let config = JimengConfig::new()
            .with_session_id("test-session")
            .with_api_base("http://127.0.0.1:9");
        ToolServer::new(ImageTools::new(ImageClient::new(config).unwrap()))
    }

    #[tokio::test]
    async fn test_initialize_echoes_protocol_version() {
        let response = server()
            .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-03-26"}}"#)
            .await
            .unwrap();
        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], "2025-03-26");
        assert_eq!(response["result"]["serverInfo"]["name"], SERVER_NAME);
    }

    #[tokio::test]
    async fn test_notifications_get_no_reply() {
        let response = server()
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_parse_and_method_errors() {
        let response = server().handle_line("{not json").await.unwrap();
        assert_eq!(response["error"]["code"], PARSE_ERROR);

        let response = server()
            .handle_line(r#"{"jsonrpc":"2.0","id":"a","method":"resources/list"}"#)
            .await
            .unwrap();
        assert_eq!(response["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(response["id"], "a");
    }

    #[tokio::test]
    async fn test_tools_list_and_call() {
        let response = server()
            .handle_line(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
            .await
            .unwrap();
        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 3);
        assert!(tools[0]["inputSchema"]["properties"]["prompt"].is_object());

        let response = server()
            .handle_line(r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"list_available_models"}}"#)
            .await
            .unwrap();
        assert_eq!(response["result"]["isError"], false);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        let parsed: Value = serde_json::from_str(text).unwrap();
        assert_eq!(parsed["available_models"].as_array().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_serve_answers_each_request_line() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"get_generation_tips"}}"#,
            "\n"
        );
        let reader = tokio::io::BufReader::new(input.as_bytes());
        let (out_tx, mut out_rx) = tokio::io::duplex(64 * 1024);
        server().serve(reader, out_tx).await.unwrap();

        let mut output = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut out_rx, &mut output)
            .await
            .unwrap();
        let responses: Vec<Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(responses.len(), 2);
        let mut ids: Vec<i64> = responses.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2]);
    }
}
