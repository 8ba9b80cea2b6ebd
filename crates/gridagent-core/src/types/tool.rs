//! Tool calling types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A callable tool as presented to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON Schema of the argument object
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: serde_json::json!({ "type": "object", "properties": {} }),
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }
}

/// Tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier chosen by the model, echoed back with the result
    pub id: String,
    pub name: String,
    /// Argument object; not validated at this point
    pub input: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    pub fn get_arg(&self, key: &str) -> Option<&Value> {
        self.input.get(key)
    }

    pub fn get_arg_str(&self, key: &str) -> Option<&str> {
        self.input.get(key).and_then(|v| v.as_str())
    }
}

/// What a tool call produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ToolOutput {
    /// The tool ran; the payload may still report a domain error
    Success(Value),
    /// The call never produced a payload (unknown tool, transport fault)
    Failure(String),
}

/// Result of one tool call, tied to the call that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    #[serde(rename = "callId")]
    pub call_id: String,
    #[serde(rename = "toolName")]
    pub tool_name: String,
    pub output: ToolOutput,
}

impl ToolResult {
    pub fn success(call_id: impl Into<String>, tool_name: impl Into<String>, value: Value) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            output: ToolOutput::Success(value),
        }
    }

    pub fn failure(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            output: ToolOutput::Failure(message.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.output, ToolOutput::Failure(_))
    }

    /// Text handed to the model: strings verbatim, other values as JSON
    pub fn content(&self) -> String {
        match &self.output {
            ToolOutput::Success(Value::String(s)) => s.clone(),
            ToolOutput::Success(v) => v.to_string(),
            ToolOutput::Failure(msg) => msg.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_schema() {
        let tool = ToolDescriptor::new("load_network", "Load a network file").with_schema(json!({
            "type": "object",
            "properties": { "file_path": { "type": "string" } },
            "required": ["file_path"]
        }));
        assert_eq!(tool.name, "load_network");
        assert_eq!(tool.input_schema["required"][0], "file_path");

        let bare = ToolDescriptor::new("get_network_info", "");
        assert_eq!(bare.input_schema["type"], "object");
    }

    #[test]
    fn test_tool_call_args() {
        let call = ToolCall::new("call_1", "load_network", json!({"file_path": "a.json"}));
        assert_eq!(call.get_arg_str("file_path"), Some("a.json"));
        assert_eq!(call.get_arg_str("missing"), None);
    }

    #[test]
    fn test_result_content() {
        let ok = ToolResult::success("c1", "get_network_info", json!({"status": "success"}));
        assert!(!ok.is_failure());
        assert_eq!(ok.content(), r#"{"status":"success"}"#);

        let text = ToolResult::success("c2", "echo", json!("plain"));
        assert_eq!(text.content(), "plain");

        let err = ToolResult::failure("c3", "nope", "Tool 'nope' not found");
        assert!(err.is_failure());
        assert_eq!(err.content(), "Tool 'nope' not found");
    }
}
