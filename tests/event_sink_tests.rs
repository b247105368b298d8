use mcphost::{EventKind, EventSink, JsonlEventSink};
use serde_json::{json, Value};

#[test]
fn records_are_appended_one_json_object_per_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs").join("mcp_log.jsonl");

    let sink = JsonlEventSink::open(&path).unwrap();
    assert_eq!(sink.path(), path.as_path());

    sink.write(EventKind::Connect, json!({"server": "calc", "transport": "process-pipe"}));
    sink.write(
        EventKind::CallToolRequest,
        json!({"server": "calc", "tool": "add", "args": {"a": 2, "b": 3}}),
    );

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);

    let first: Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["event"], "connect");
    assert_eq!(first["payload"]["server"], "calc");
    assert!(first["ts"].as_str().unwrap().contains('T'));

    let second: Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(second["event"], "call_tool.request");
    assert_eq!(second["payload"]["args"]["b"], 3);
}

#[test]
fn reopening_appends_instead_of_truncating() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");

    {
        let sink = JsonlEventSink::open(&path).unwrap();
        sink.write(EventKind::ListTools, json!({"server": "calc", "tools": ["add"]}));
    }
    {
        let sink = JsonlEventSink::open(&path).unwrap();
        sink.write(EventKind::LlmDirectResponse, json!({"text": "hola"}));
    }

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().count(), 2);
}
