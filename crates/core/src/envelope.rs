use serde::Serialize;

use crate::trace::Trace;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self { kind: "text", text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ToolResult {
    pub content: Vec<ContentBlock>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

/// Outer response of one pipeline run. `debug_response` is always present;
/// `error` only when `result.isError` is true.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Envelope {
    pub result: ToolResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub debug_response: Trace,
}

impl Envelope {
    pub fn success(text: impl Into<String>, trace: Trace) -> Self {
        Self {
            result: ToolResult { content: vec![ContentBlock::text(text)], is_error: false },
            error: None,
            debug_response: trace,
        }
    }

    pub fn failure(error_text: impl Into<String>, description: impl Into<String>, trace: Trace) -> Self {
        Self {
            result: ToolResult { content: vec![ContentBlock::text(error_text)], is_error: true },
            error: Some(description.into()),
            debug_response: trace,
        }
    }

    pub fn is_error(&self) -> bool {
        self.result.is_error
    }

    pub fn text(&self) -> &str {
        self.result.content.first().map(|block| block.text.as_str()).unwrap_or_default()
    }

    pub fn trace(&self) -> &Trace {
        &self.debug_response
    }
}
