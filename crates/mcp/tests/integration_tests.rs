//! Integration tests for the ProductMaster MCP Server
//!
//! These tests verify that the MCP server correctly handles:
//! - Initialization, tool listing and tool calls
//! - Argument validation before the pipeline runs
//! - Protocol errors (unknown method/tool, malformed JSON)
//! - The stdio line loop

use std::sync::Arc;

use async_trait::async_trait;
use productmaster_agent::llm::{Generation, LlmClient, LlmError};
use productmaster_agent::prompts::RepositoryPromptStore;
use productmaster_agent::{GuardrailPolicy, PipelineSettings, QueryPipeline, ToolRegistry};
use productmaster_db::{demo_catalog, InMemoryProductRepository, InMemoryPromptRepository};
use productmaster_mcp::{McpResponse, ProductMasterMcpServer};
use serde_json::{json, Value};

/// Answers every standardization prompt with low-risk bonds and every
/// formatting prompt with a fixed sentence.
struct FixedLlm;

#[async_trait]
impl LlmClient for FixedLlm {
    async fn generate(&self, prompt: &str) -> Result<Generation, LlmError> {
        let text = if prompt.contains("\n\nOriginal question: ") {
            "Here are the matching bonds.".to_string()
        } else {
            r#"{"product_types":["bond"],"risk_levels":[1,2]}"#.to_string()
        };
        Ok(Generation { text, elapsed_ms: 1 })
    }
}

fn test_server() -> ProductMasterMcpServer {
    let registry = ToolRegistry::standard();
    let prompts = InMemoryPromptRepository::with_prompts(registry.iter().flat_map(|tool| {
        [
            (format!("{}_pre", tool.name), "Extract filters as JSON.".to_string()),
            (format!("{}_post", tool.name), "Summarize the data.".to_string()),
        ]
    }));
    let pipeline = QueryPipeline::new(
        Arc::new(RepositoryPromptStore::new(Arc::new(prompts))),
        Arc::new(FixedLlm),
        Arc::new(InMemoryProductRepository::with_products(demo_catalog())),
        PipelineSettings::default(),
    );
    ProductMasterMcpServer::new(Arc::new(pipeline), registry, GuardrailPolicy::default())
}

async fn call(server: &ProductMasterMcpServer, request: Value) -> McpResponse {
    server.handle_line(&request.to_string()).await.expect("request should be answered")
}

#[tokio::test]
async fn test_initialize_reports_protocol_version_and_tools_capability() {
    let server = test_server();
    let response =
        call(&server, json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}))
            .await;
    let value: Value = serde_json::from_str(&response.to_json().expect("serialize")).expect("json");

    assert_eq!(value["result"]["protocolVersion"], json!("2024-11-05"));
    assert_eq!(value["result"]["serverInfo"]["name"], json!("productmaster-mcp"));
    assert!(value["result"]["capabilities"]["tools"].is_object());
}

#[tokio::test]
async fn test_list_tools() {
    let server = test_server();
    let response = call(&server, json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})).await;
    let value: Value = serde_json::from_str(&response.to_json().expect("serialize")).expect("json");

    let names: Vec<&str> = value["result"]["tools"]
        .as_array()
        .expect("tools array")
        .iter()
        .filter_map(|tool| tool["name"].as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "search_products",
            "filter_products_by_risk_and_type",
            "get_product_details",
            "search_products_by_name_fuzzy",
        ]
    );
    assert_eq!(value["result"]["tools"][0]["inputSchema"]["required"], json!(["text_input"]));
}

#[tokio::test]
async fn test_tool_call_returns_envelope_with_debug_response() {
    let server = test_server();
    let response = call(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": {"name": "search_products", "arguments": {"text_input": "low risk bond products", "request_id": "req-42"}}
        }),
    )
    .await;

    let text = response.to_json().expect("serialize");
    assert!(
        text.starts_with(r#"{"jsonrpc":"2.0","id":7,"result":{"content":[{"type":"text","text":"Here are the matching bonds."}],"isError":false},"debug_response":{"function_name":"search_products","input_params":"#),
        "unexpected response: {text}"
    );

    let envelope = response.envelope().expect("tool call envelope");
    assert!(!envelope.is_error());
    assert_eq!(envelope.trace().request_id(), Some("req-42"));
    assert_eq!(envelope.trace().stage_names(), vec!["standardize", "execute", "format"]);
    let execute = envelope.trace().stage("execute").expect("execute stage");
    assert_eq!(execute["results_count"], json!(3));
}

#[tokio::test]
async fn test_fuzzy_name_search_runs_its_own_prompt_pair() {
    let server = test_server();
    let response = call(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 9,
            "method": "tools/call",
            "params": {"name": "search_products_by_name_fuzzy", "arguments": {"text_input": "that safe bond, treasury something"}}
        }),
    )
    .await;

    let envelope = response.envelope().expect("tool call envelope");
    assert!(!envelope.is_error());
    assert_eq!(envelope.trace().function_name(), "search_products_by_name_fuzzy");
    let standardize = envelope.trace().stage("standardize").expect("standardize stage");
    assert_eq!(standardize["prompt_key"], json!("search_products_by_name_fuzzy_pre"));
    assert_eq!(envelope.trace().stage_names(), vec!["standardize", "execute", "format"]);
}

#[tokio::test]
async fn test_tool_call_with_invalid_arguments_is_rejected_without_trace() {
    let server = test_server();
    let response = call(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 8,
            "method": "tools/call",
            "params": {"name": "search_products", "arguments": {"text_input": "bonds", "limit": 0}}
        }),
    )
    .await;

    let error = response.rpc_error().expect("validation error");
    assert_eq!(error.code, -32602);
    assert!(response.envelope().is_none());
    assert!(!response.to_json().expect("serialize").contains("debug_response"));
}

#[tokio::test]
async fn test_unknown_tool_and_method_are_protocol_errors() {
    let server = test_server();

    let unknown_tool = call(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 9,
            "method": "tools/call",
            "params": {"name": "delete_products", "arguments": {"text_input": "all"}}
        }),
    )
    .await;
    assert_eq!(unknown_tool.rpc_error().map(|error| error.code), Some(-32602));

    let unknown_method =
        call(&server, json!({"jsonrpc": "2.0", "id": 10, "method": "resources/list"})).await;
    assert_eq!(unknown_method.rpc_error().map(|error| error.code), Some(-32601));
    assert_eq!(unknown_method.id(), &json!(10));
}

#[tokio::test]
async fn test_malformed_json_and_notifications() {
    let server = test_server();

    let parse_failure = server.handle_line("{not json").await.expect("parse error response");
    assert_eq!(parse_failure.rpc_error().map(|error| error.code), Some(-32700));
    assert_eq!(parse_failure.id(), &Value::Null);

    let notification = server
        .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
        .await;
    assert!(notification.is_none());

    let null_id = server
        .handle_line(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#)
        .await
        .expect("a null id still gets a reply");
    assert_eq!(null_id.to_json().expect("serialize"), r#"{"jsonrpc":"2.0","id":null,"result":{}}"#);
}

#[tokio::test]
async fn test_serve_answers_one_line_per_request() {
    let server = test_server();
    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
        "\n",
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        "\n\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
        "\n",
    );
    let mut output = Vec::new();

    server.serve(input.as_bytes(), &mut output).await.expect("serve");

    let output = String::from_utf8(output).expect("utf8");
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], r#"{"jsonrpc":"2.0","id":1,"result":{}}"#);
    assert!(lines[1].starts_with(r#"{"jsonrpc":"2.0","id":2,"result":{"tools":["#));
}
