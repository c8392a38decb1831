// Real MCP servers over stdio, played by a small POSIX shell script
#![cfg(unix)]

use pipai_core::config::ToolProviderConfig;
use pipai_core::tooling::{
    ConnectionState, DispatchOutcome, RegistryError, RetryPolicy, ToolProviderConnection, ToolProviderError,
    ToolProviderRegistry,
};
use serde_json::json;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

const STUB_SERVER: &str = r##"
reply() {
  printf '%s\n' '{"jsonrpc":"2.0","id":"'"$1"'","result":'"$2"'}'
}
fail() {
  printf '%s\n' '{"jsonrpc":"2.0","id":"'"$1"'","error":{"code":-32000,"message":"'"$2"'"}}'
}
field() {
  printf '%s\n' "$line" | sed -n "s/.*\"$1\":\"\([^\"]*\)\".*/\1/p"
}

printf '\033[32mstub server starting\033[0m\n'
echo "plain log line"
if [ -n "$BINARY_NOISE" ]; then printf '\377\376 binary log\n'; fi

while IFS= read -r line; do
  id=$(field id)
  [ -n "$id" ] || continue
  case "$(field method)" in
    initialize)
      reply "$id" '{"protocolVersion":"2025-06-18","capabilities":{"tools":{}},"serverInfo":{"name":"stub","version":"0.1.0"}}'
      ;;
    tools/list)
      if [ "$(field cursor)" = "page-2" ]; then
        reply "$id" '{"tools":[{"name":"flaky","description":"Always fails","inputSchema":{"type":"object","properties":{}}}]}'
      else
        reply "$id" '{"tools":[{"name":"echo","description":"Echo text back","inputSchema":{"type":"object","properties":{"text":{"type":"string","description":"Text to echo"}},"required":["text"]}}],"nextCursor":"page-2"}'
      fi
      ;;
    tools/call)
      if [ "$(field name)" = "flaky" ]; then
        if [ -n "$CALLS_FILE" ]; then echo "$id" >> "$CALLS_FILE"; fi
        fail "$id" "flaky tool failed"
      else
        reply "$id" '{"content":[{"type":"text","text":"'"$STUB_TAG$(field text)"'"}],"isError":false}'
      fi
      ;;
    *)
      fail "$id" "unknown method"
      ;;
  esac
done
"##;

struct StubServer {
    dir: TempDir,
    script: PathBuf,
}

impl StubServer {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = dir.path().join("stub_server.sh");
        fs::write(&script, STUB_SERVER).expect("write stub server");
        Self { dir, script }
    }

    fn config(&self, name: &str) -> ToolProviderConfig {
        ToolProviderConfig::new(name, "/bin/sh").with_args([self.script.display().to_string()])
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.path().join(file)
    }
}

async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(20), future)
        .await
        .expect("stub server did not answer in time")
}

fn lines_in(path: &Path) -> usize {
    fs::read_to_string(path)
        .map(|content| content.lines().count())
        .unwrap_or(0)
}

#[tokio::test]
async fn connection_lists_and_invokes_tools() {
    let stub = StubServer::new();
    let connection = ToolProviderConnection::new(stub.config("stub"));
    assert_eq!(connection.state().await, ConnectionState::Unstarted);

    within(connection.initialize()).await.expect("initialize");
    assert_eq!(connection.state().await, ConnectionState::Ready);

    let tools = within(connection.list_tools()).await.expect("list tools");
    let names: Vec<_> = tools.iter().map(|tool| tool.name.as_str()).collect();
    assert_eq!(names, vec!["echo", "flaky"]);
    assert_eq!(
        tools[0].render_for_prompt(),
        "Tool: echo\nDescription: Echo text back\nArguments:\n- text: Text to echo (required)\n"
    );

    let payload = within(connection.invoke_tool("echo", json!({"text": "hello"})))
        .await
        .expect("invoke echo");
    assert_eq!(payload["content"][0]["text"], "hello");
    assert_eq!(payload["isError"], false);

    connection.close().await;
    assert_eq!(connection.state().await, ConnectionState::Closed);
    assert!(matches!(
        connection.invoke_tool("echo", json!({"text": "late"})).await,
        Err(ToolProviderError::NotReady { state: ConnectionState::Closed, .. })
    ));
}

#[tokio::test]
async fn failing_tool_is_attempted_exactly_twice() {
    let stub = StubServer::new();
    let calls = stub.path("calls.log");
    let config = stub
        .config("stub")
        .with_env("CALLS_FILE", calls.display().to_string());
    let connection = ToolProviderConnection::new(config)
        .with_retry_policy(RetryPolicy::new(2, Duration::from_millis(20)));
    within(connection.initialize()).await.expect("initialize");

    let result = within(connection.invoke_tool("flaky", json!({}))).await;

    match result {
        Err(ToolProviderError::Rpc { code, message, .. }) => {
            assert_eq!(code, -32000);
            assert_eq!(message, "flaky tool failed");
        }
        other => panic!("expected an RPC error, got {other:?}"),
    }
    assert_eq!(lines_in(&calls), 2);
    assert_eq!(connection.state().await, ConnectionState::Ready);

    connection.close().await;
}

#[tokio::test]
async fn non_utf8_log_lines_are_skipped() {
    let stub = StubServer::new();
    let config = stub.config("stub").with_env("BINARY_NOISE", "1");
    let connection = ToolProviderConnection::new(config);

    within(connection.initialize()).await.expect("initialize");
    assert_eq!(connection.state().await, ConnectionState::Ready);

    let payload = within(connection.invoke_tool("echo", json!({"text": "still here"})))
        .await
        .expect("invoke echo");
    assert_eq!(payload["content"][0]["text"], "still here");

    connection.close().await;
}

#[tokio::test]
async fn server_exiting_during_startup_closes_the_connection() {
    let config = ToolProviderConfig::new("quitter", "/bin/sh").with_args(["-c", "exit 0"]);
    let connection = ToolProviderConnection::new(config);

    let err = within(connection.initialize()).await.expect_err("startup must fail");
    assert!(err.is_connection_error());
    assert_eq!(err.server(), "quitter");
    assert_eq!(connection.state().await, ConnectionState::Closed);

    assert!(matches!(
        connection.initialize().await,
        Err(ToolProviderError::AlreadyStarted { .. })
    ));
}

#[tokio::test]
async fn missing_program_is_a_connection_error() {
    let config = ToolProviderConfig::new("ghost", "/nonexistent/pipai/mcp-server");
    let connection = ToolProviderConnection::new(config);

    let err = within(connection.initialize()).await.expect_err("spawn must fail");
    match err {
        ToolProviderError::Connection { server, source } => {
            assert_eq!(server, "ghost");
            assert!(matches!(*source, ToolProviderError::Spawn { .. }));
        }
        other => panic!("expected Connection, got {other:?}"),
    }
    assert_eq!(connection.state().await, ConnectionState::Closed);
}

#[tokio::test]
async fn registry_routes_to_the_first_server_listing_the_tool() {
    let stub = StubServer::new();
    let servers_file = stub.path("mcp_servers.json");
    let script = stub.script.display().to_string();
    let document = json!({
        "mcpServers": {
            "alpha": { "command": "/bin/sh", "args": [script], "env": { "STUB_TAG": "alpha:" } },
            "beta": { "command": "/bin/sh", "args": [script], "env": { "STUB_TAG": "beta:" } }
        }
    });
    fs::write(&servers_file, document.to_string()).expect("write servers file");

    let registry = ToolProviderRegistry::new();
    within(registry.load_from_path(&servers_file)).await.expect("load");
    assert_eq!(registry.provider_names().await, vec!["alpha", "beta"]);

    let tools = within(registry.list_all_tools()).await.expect("tools");
    assert_eq!(tools.len(), 4);

    let outcome = within(registry.dispatch("echo", json!({"text": "hi"})))
        .await
        .expect("dispatch");
    match outcome {
        DispatchOutcome::Completed { provider, payload } => {
            assert_eq!(provider, "alpha");
            assert_eq!(payload["content"][0]["text"], "alpha:hi");
        }
        other => panic!("expected Completed, got {other:?}"),
    }

    registry.close_all().await;
    assert!(!registry.is_ready().await);
}

#[tokio::test]
async fn registry_start_fails_when_any_server_fails() {
    let stub = StubServer::new();
    let registry = ToolProviderRegistry::new();
    let configs = vec![
        stub.config("healthy"),
        ToolProviderConfig::new("quitter", "/bin/sh").with_args(["-c", "exit 3"]),
    ];

    let err = within(registry.load(configs)).await.expect_err("load must fail");
    match err {
        RegistryError::Init { failures } => {
            let names: Vec<_> = failures.iter().map(|failure| failure.provider.as_str()).collect();
            assert_eq!(names, vec!["quitter"]);
        }
        other => panic!("expected Init, got {other:?}"),
    }
    assert!(!registry.is_ready().await);
}
