//! HTTP client for the tool-execution engine

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{EngineError, ExecuteRequest, ExecutionOutcome, FirstCallRequest, ToolEngine};
use crate::config::EngineConfig;
use crate::step::ToolCall;

/// Tool engine reached over HTTP/JSON
#[derive(Debug, Clone)]
pub struct HttpToolEngine {
    client: reqwest::Client,
    propose_url: String,
    execute_url: String,
    timeout: Duration,
}

impl HttpToolEngine {
    /// Create a client from engine configuration
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            propose_url: join_url(&config.url, &config.propose_path),
            execute_url: join_url(&config.url, &config.execute_path),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Override the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn propose_url(&self) -> &str {
        &self.propose_url
    }

    pub fn execute_url(&self) -> &str {
        &self.execute_url
    }

    async fn post_json<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<Value, EngineError> {
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let text = response.text().await.map_err(request_error)?;

        if !status.is_success() {
            return Err(EngineError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        tracing::debug!("Engine response: {}", text);
        serde_json::from_str(&text)
            .map_err(|e| EngineError::InvalidResponse(format!("body is not JSON: {}", e)))
    }
}

#[async_trait]
impl ToolEngine for HttpToolEngine {
    async fn propose_first_call(&self, request: &FirstCallRequest) -> Result<ToolCall, EngineError> {
        let body = ProposeBody {
            operating_procedure: &request.procedure,
            user_id: &request.issue.user_id,
            thread_id: &request.thread_id,
            image_url: request.issue.image_url.as_deref(),
            description: &request.issue.issue_description,
        };

        let value = self.post_json(&self.propose_url, &body).await?;
        let response: ProposeResponse = serde_json::from_value(value)
            .map_err(|e| EngineError::InvalidResponse(e.to_string()))?;

        response
            .response
            .unwrap_or_default()
            .into_tool_call()?
            .ok_or_else(|| EngineError::InvalidResponse("no tool call proposed".to_string()))
    }

    async fn execute_or_skip(&self, request: &ExecuteRequest) -> Result<ExecutionOutcome, EngineError> {
        let body = ExecuteBody {
            thread_id: &request.thread_id,
            approved: request.approved,
            feedback: request.feedback.as_deref(),
        };

        let value = self.post_json(&self.execute_url, &body).await?;
        let response: ExecuteResponse = serde_json::from_value(value)
            .map_err(|e| EngineError::InvalidResponse(e.to_string()))?;

        let next_call = if response.has_next_tool {
            let call = response.call.into_tool_call()?.ok_or_else(|| {
                EngineError::InvalidResponse("hasNextTool is set but no tool was named".to_string())
            })?;
            Some(call)
        } else {
            None
        };

        Ok(ExecutionOutcome {
            raw_result: raw_result(response.previous_tool_res),
            next_call,
        })
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ProposeBody<'a> {
    operating_procedure: &'a str,
    #[serde(rename = "userID")]
    user_id: &'a str,
    #[serde(rename = "threadID")]
    thread_id: &'a str,
    #[serde(rename = "imageURL", skip_serializing_if = "Option::is_none")]
    image_url: Option<&'a str>,
    description: &'a str,
}

#[derive(Debug, Deserialize)]
struct ProposeResponse {
    #[serde(default)]
    response: Option<ToolCallWire>,
}

#[derive(Debug, Serialize)]
struct ExecuteBody<'a> {
    #[serde(rename = "threadID")]
    thread_id: &'a str,
    approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    feedback: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    #[serde(default)]
    previous_tool_res: Option<Value>,
    #[serde(rename = "hasNextTool", default)]
    has_next_tool: bool,
    #[serde(flatten)]
    call: ToolCallWire,
}

/// A tool call as the engine reports it: either flattened
/// (`tool_name`/`tool_arguments`) or OpenAI style (`function.name`/`function.arguments`)
#[derive(Debug, Default, Deserialize)]
struct ToolCallWire {
    #[serde(default)]
    tool_name: Option<String>,
    #[serde(default)]
    tool_arguments: Option<Value>,
    #[serde(default)]
    function: Option<FunctionWire>,
}

#[derive(Debug, Default, Deserialize)]
struct FunctionWire {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<Value>,
}

impl ToolCallWire {
    fn into_tool_call(self) -> Result<Option<ToolCall>, EngineError> {
        let function = self.function.unwrap_or_default();
        let name = self
            .tool_name
            .or(function.name)
            .filter(|name| !name.trim().is_empty());

        let Some(name) = name else {
            return Ok(None);
        };

        let arguments = decode_arguments(self.tool_arguments.or(function.arguments))?;
        Ok(Some(ToolCall { name, arguments }))
    }
}

/// Tool arguments arrive either as an object or as a JSON-encoded string
fn decode_arguments(value: Option<Value>) -> Result<Map<String, Value>, EngineError> {
    match value {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(Map::new()),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(&s) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(EngineError::InvalidResponse(format!(
                "tool arguments are not a JSON object: {}",
                s
            ))),
        },
        Some(other) => Err(EngineError::InvalidResponse(format!(
            "tool arguments are not a JSON object: {}",
            other
        ))),
    }
}

/// Raw payload of the previous tool, taken from its `content`
fn raw_result(previous: Option<Value>) -> Option<String> {
    match previous? {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Object(mut map) => match map.remove("content") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        },
        other => Some(other.to_string()),
    }
}

fn request_error(e: reqwest::Error) -> EngineError {
    if e.is_timeout() {
        EngineError::Timeout
    } else {
        EngineError::Transport(e.to_string())
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
