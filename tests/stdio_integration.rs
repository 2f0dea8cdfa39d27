//! Full MCP stdio sessions over in-memory pipes.

mod common;

use common::{dispatcher, medrxiv_body, StubUpstream};
use healthcare_mcp::transport::serve_stdio;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::test]
async fn session_over_duplex_pipe() {
    let stub = Arc::new(StubUpstream::new().route("api.medrxiv.org", medrxiv_body()));
    let dispatcher = dispatcher(&stub);

    let (client, server) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server);
    let server_task = tokio::spawn(serve_stdio(dispatcher, server_read, server_write));

    let (client_read, mut client_write) = tokio::io::split(client);
    let mut replies = BufReader::new(client_read).lines();

    let requests = [
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {"protocolVersion": "2024-11-05"}}),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
        json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {"name": "medrxiv_search", "arguments": {"query": "long covid", "max_results": 500}}}),
        json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call", "params": {"name": "medrxiv_search", "arguments": {"query": "long covid", "max_results": 100}}}),
    ];
    for request in &requests {
        client_write
            .write_all(format!("{request}\n").as_bytes())
            .await
            .unwrap();
    }

    let mut read = Vec::new();
    for _ in 0..4 {
        let line = replies.next_line().await.unwrap().unwrap();
        read.push(serde_json::from_str::<Value>(&line).unwrap());
    }

    assert_eq!(read[0]["id"], json!(1));
    assert_eq!(read[0]["result"]["serverInfo"]["name"], json!("healthcare-mcp"));
    assert_eq!(read[1]["id"], json!(2));
    assert_eq!(read[1]["result"]["tools"].as_array().unwrap().len(), 11);

    // 500 clamps to 100, so the second call shares the first's cache entry.
    assert_eq!(read[2]["result"], read[3]["result"]);
    let envelope: Value =
        serde_json::from_str(read[2]["result"]["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(envelope["articles"][0]["doi"], json!("10.1101/2024.01.01.000001"));
    assert_eq!(stub.calls(), 1);

    drop(client_write);
    drop(replies);
    server_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn malformed_line_does_not_end_session() {
    let stub = Arc::new(StubUpstream::new());
    let input = b"{broken\n{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"ping\"}\n".to_vec();
    let mut output = Vec::new();

    serve_stdio(dispatcher(&stub), input.as_slice(), &mut output)
        .await
        .unwrap();

    let lines: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines[0]["error"]["code"], json!(-32700));
    assert_eq!(lines[0]["id"], Value::Null);
    assert_eq!(lines[1], json!({"jsonrpc": "2.0", "id": 9, "result": {}}));
}
