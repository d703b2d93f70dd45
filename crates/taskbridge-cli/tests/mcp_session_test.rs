//! Full-stack tests: MCP session -> registry -> Linear handlers -> in-memory HTTP.
//!
//! These wire the crates together the same way `taskbridge serve` does, with
//! the network replaced by `InMemoryHttp`.

use std::io::Cursor;
use std::sync::Arc;

use serde_json::{json, Value};
use taskbridge_core::InMemoryHttp;
use taskbridge_linear::{build_registry, LinearContext, LinearSettings};
use taskbridge_mcp::McpServer;
use tokio::io::AsyncReadExt;

const URL: &str = "https://linear.test/graphql";

async fn session(http: Arc<InMemoryHttp>, frames: &[Value]) -> Vec<Value> {
    let settings = LinearSettings::new("lin_api_session").with_api_url(URL);
    let registry = build_registry(Arc::new(LinearContext::new(http, settings))).unwrap();

    let input: String = frames.iter().map(|f| format!("{}\n", f)).collect();
    let (mut client, server_side) = tokio::io::duplex(1 << 20);

    McpServer::new(Arc::new(registry))
        .run(Cursor::new(input.into_bytes()), server_side)
        .await
        .unwrap();

    let mut output = String::new();
    client.read_to_string(&mut output).await.unwrap();
    output
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

fn tool_call(id: i64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
}

fn envelope(response: &Value) -> Value {
    serde_json::from_str(response["result"]["content"][0]["text"].as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn test_tools_list_exposes_linear_actions() {
    let responses = session(
        Arc::new(InMemoryHttp::new()),
        &[json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})],
    )
    .await;

    let tools = responses[0]["result"]["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(
        names,
        vec!["search_issues", "get_issue", "update_issue", "add_comment"]
    );
    for tool in tools {
        assert_eq!(tool["inputSchema"]["type"], "object");
        assert!(!tool["description"].as_str().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_search_through_mcp() {
    let http = Arc::new(InMemoryHttp::new().on_json(
        URL,
        200,
        json!({"data": {"searchIssues": {"nodes": [{
            "id": "TEST-123",
            "title": "Test Issue",
            "state": {"name": "In Progress"}
        }]}}}),
    ));

    let responses = session(
        http.clone(),
        &[tool_call(2, "search_issues", json!({"query": "test"}))],
    )
    .await;

    assert!(responses[0]["result"].get("isError").is_none());
    assert_eq!(
        envelope(&responses[0]),
        json!({"result": {"results": [
            {"id": "TEST-123", "title": "Test Issue", "status": "In Progress"}
        ]}})
    );

    let request = http.last_request().unwrap();
    assert_eq!(request.header("authorization"), Some("lin_api_session"));
    assert_eq!(request.json_body().unwrap()["variables"]["first"], 25);
}

#[tokio::test]
async fn test_validation_failure_through_mcp() {
    let http = Arc::new(InMemoryHttp::new());

    let responses = session(
        http.clone(),
        &[tool_call(3, "search_issues", json!({"query": "x", "limit": 0}))],
    )
    .await;

    assert_eq!(responses[0]["result"]["isError"], true);
    let envelope = envelope(&responses[0]);
    assert_eq!(envelope["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(envelope["error"]["details"][0]["path"], "limit");
    assert_eq!(http.call_count(), 0);
}

#[tokio::test]
async fn test_upstream_error_through_mcp() {
    let http = Arc::new(InMemoryHttp::new().on_json(
        URL,
        200,
        json!({"data": null, "errors": [{"message": "Entity not found"}]}),
    ));

    let responses = session(http, &[tool_call(4, "get_issue", json!({"issueId": "ENG-1"}))]).await;

    assert_eq!(responses[0]["result"]["isError"], true);
    let envelope = envelope(&responses[0]);
    assert_eq!(envelope["error"]["code"], "API_ERROR");
    assert!(envelope["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Entity not found"));
}
