use crate::app::App;
use crate::errors::{ErrorCode, ToolError};
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

const PROTOCOL_VERSION: &str = "2025-06-18";
const SERVER_NAME: &str = "aruba-noc";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct McpServer {
    app: App,
}

impl McpServer {
    pub fn new() -> Result<Self, ToolError> {
        Ok(Self {
            app: App::initialize()?,
        })
    }

    fn handle_initialize(&self) -> Value {
        serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {"list": true, "call": true},
                "logging": {},
            },
            "serverInfo": {"name": SERVER_NAME, "version": SERVER_VERSION},
        })
    }

    fn handle_tools_list(&self) -> Value {
        serde_json::json!({ "tools": self.app.dispatcher.list_tools() })
    }

    async fn handle_tools_call(&self, name: &str, args: Value) -> Value {
        let report = self.app.dispatcher.call_tool(name, args).await;
        serde_json::json!({
            "content": [ { "type": "text", "text": report } ]
        })
    }

    pub async fn run_stdio(&self) -> Result<(), ToolError> {
        let stdin = tokio::io::stdin();
        let stdout = tokio::io::stdout();
        let mut reader = BufReader::new(stdin).lines();
        let mut writer = BufWriter::new(stdout);

        while let Some(line) = reader
            .next_line()
            .await
            .map_err(|err| ToolError::internal(format!("stdio read failed: {}", err)))?
        {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let parsed: Value = match serde_json::from_str(trimmed) {
                Ok(value) => value,
                Err(_) => {
                    write_response(
                        &mut writer,
                        &JsonRpcResponse::failure(
                            Value::Null,
                            ErrorCode::ParseError.as_i32(),
                            "Parse error".to_string(),
                        ),
                    )
                    .await?;
                    continue;
                }
            };

            let request: JsonRpcRequest = match serde_json::from_value(parsed) {
                Ok(req) => req,
                Err(_) => {
                    write_response(
                        &mut writer,
                        &JsonRpcResponse::failure(
                            Value::Null,
                            ErrorCode::InvalidRequest.as_i32(),
                            "Invalid request".to_string(),
                        ),
                    )
                    .await?;
                    continue;
                }
            };

            let response = match request.method.as_str() {
                _ if request.method.starts_with("notifications/") && request.id.is_none() => None,
                "notifications/initialized" => request
                    .id
                    .clone()
                    .map(|id| JsonRpcResponse::success(id, serde_json::json!({}))),
                "initialize" => request
                    .id
                    .clone()
                    .map(|id| JsonRpcResponse::success(id, self.handle_initialize())),
                "tools/list" => request
                    .id
                    .clone()
                    .map(|id| JsonRpcResponse::success(id, self.handle_tools_list())),
                "tools/call" => match request.id.clone() {
                    Some(id) => {
                        let params = request.params.as_object().cloned().unwrap_or_default();
                        let name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");
                        if name.is_empty() {
                            Some(JsonRpcResponse::failure(
                                id,
                                ErrorCode::InvalidParams.as_i32(),
                                "Missing tool name".to_string(),
                            ))
                        } else {
                            let args = params
                                .get("arguments")
                                .cloned()
                                .unwrap_or_else(|| Value::Object(Default::default()));
                            Some(JsonRpcResponse::success(
                                id,
                                self.handle_tools_call(name, args).await,
                            ))
                        }
                    }
                    None => None,
                },
                _ => request.id.clone().map(|id| {
                    JsonRpcResponse::failure(
                        id,
                        ErrorCode::MethodNotFound.as_i32(),
                        "Method not found".to_string(),
                    )
                }),
            };

            if let Some(response) = response {
                write_response(&mut writer, &response).await?;
            }
        }

        Ok(())
    }
}

async fn write_response(
    writer: &mut BufWriter<tokio::io::Stdout>,
    response: &JsonRpcResponse,
) -> Result<(), ToolError> {
    let payload = serde_json::to_string(response).unwrap_or_default();
    writer.write_all(payload.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

pub async fn run_stdio() -> Result<(), ToolError> {
    let server = McpServer::new()?;
    server.run_stdio().await
}
