use productmaster_agent::GuardrailPolicy;
use productmaster_mcp::bootstrap::bootstrap_with_config;
use serde_json::{Map, Value};

use crate::commands::{prepare, CommandResult};

#[derive(Debug, Clone, Default)]
pub struct QueryArgs {
    pub tool: String,
    pub text: String,
    pub limit: Option<u32>,
    pub request_id: Option<String>,
}

impl QueryArgs {
    /// Tool-call arguments exactly as an MCP client would send them.
    pub fn arguments(&self) -> Value {
        let mut arguments = Map::new();
        arguments.insert("text_input".to_string(), Value::String(self.text.clone()));
        if let Some(limit) = self.limit {
            arguments.insert("limit".to_string(), Value::from(limit));
        }
        if let Some(request_id) = &self.request_id {
            arguments.insert("request_id".to_string(), Value::String(request_id.clone()));
        }
        Value::Object(arguments)
    }
}

/// Runs one pipeline request and prints the envelope. Exit code 0 when the
/// envelope is a success, 7 when the pipeline reported `isError`.
pub fn run(args: &QueryArgs) -> CommandResult {
    let (config, runtime) = match prepare("query") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let guardrails = GuardrailPolicy {
        max_input_chars: config.pipeline.max_input_chars,
        max_limit: config.pipeline.max_limit,
    };
    let Some(tool) = productmaster_agent::ToolRegistry::standard().get(&args.tool).cloned() else {
        return CommandResult::failure(
            "query",
            "unknown_tool",
            format!("unknown tool `{}`", args.tool),
            6,
        );
    };
    let request = match guardrails.evaluate(tool.name, &args.arguments()) {
        Ok(request) => request,
        Err(error) => return CommandResult::failure("query", "invalid_input", error.to_string(), 6),
    };

    let result = runtime.block_on(async {
        let app = bootstrap_with_config(config)
            .await
            .map_err(|error| ("bootstrap", error.to_string(), 4u8))?;
        let envelope = app.pipeline.run_request(request).await;
        app.db_pool.close().await;
        Ok::<_, (&'static str, String, u8)>(envelope)
    });

    match result {
        Ok(envelope) => match serde_json::to_string_pretty(&envelope) {
            Ok(output) => CommandResult { exit_code: if envelope.is_error() { 7 } else { 0 }, output },
            Err(error) => CommandResult::failure("query", "serialization", error.to_string(), 5),
        },
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("query", error_class, message, exit_code)
        }
    }
}
