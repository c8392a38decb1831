// MCP server document loading from disk

use pipai_core::config::{ConfigError, load_servers};
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::tempdir;

#[test]
fn loads_servers_in_declaration_order() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("mcp_servers.json");
    fs::write(
        &path,
        r#"{
            "mcpServers": {
                "weather": { "command": "npx", "args": ["-y", "@example/weather"] },
                "files": { "command": "/usr/local/bin/files-mcp", "env": { "ROOT": "/tmp" } },
                "git": { "command": "uvx", "args": ["mcp-server-git"] }
            }
        }"#,
    )
    .expect("write servers");

    let servers = load_servers(&path).expect("load");
    let names: Vec<_> = servers.iter().map(|server| server.name.as_str()).collect();
    assert_eq!(names, vec!["weather", "files", "git"]);
    assert_eq!(servers[0].launch_command, "npx");
    assert_eq!(servers[1].env_overrides.get("ROOT").map(String::as_str), Some("/tmp"));
    assert!(servers[2].env_overrides.is_empty());
}

#[test]
fn missing_file_is_servers_not_found() {
    let dir = tempdir().expect("tempdir");
    let result = load_servers(&dir.path().join("mcp_servers.json"));
    match result {
        Err(err @ ConfigError::ServersNotFound { .. }) => {
            assert!(err.user_message().contains("mcpServers"));
        }
        other => panic!("expected ServersNotFound, got {other:?}"),
    }
}

#[test]
fn malformed_document_is_invalid_json() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("mcp_servers.json");
    fs::write(&path, "{ \"mcpServers\": ").expect("write");

    assert!(matches!(load_servers(&path), Err(ConfigError::InvalidJson { .. })));
}

#[test]
#[serial]
fn expands_env_vars() {
    unsafe {
        env::set_var("PIPAI_IT_SERVER_DIR", "/opt/mcp");
    }
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("mcp_servers.json");
    fs::write(
        &path,
        r#"{ "mcpServers": { "local": { "command": "$PIPAI_IT_SERVER_DIR/run", "args": ["$PIPAI_IT_SERVER_DIR/data"] } } }"#,
    )
    .expect("write");

    let servers = load_servers(&path).expect("load");
    assert_eq!(servers[0].launch_command, "/opt/mcp/run");
    assert_eq!(servers[0].launch_args, vec!["/opt/mcp/data"]);

    unsafe {
        env::remove_var("PIPAI_IT_SERVER_DIR");
    }
}
