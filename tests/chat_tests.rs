use async_trait::async_trait;
use mcphost::{
    ChatMessage, ChatSession, CompletionClient, CompletionRequest, ContentBlock, Host, RemoteTool,
    Role, SessionError, ToolOutcome, ToolSession,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Snapshot of one request the scripted client received.
#[derive(Debug, Clone)]
struct SeenRequest {
    message_count: usize,
    had_tools: bool,
    max_tokens: u32,
    last_message: ChatMessage,
}

/// Completion client that replays canned responses and records requests.
struct ScriptedClient {
    responses: Mutex<VecDeque<Vec<ContentBlock>>>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl ScriptedClient {
    fn new(responses: Vec<Vec<ContentBlock>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(
        &self,
        request: CompletionRequest<'_>,
    ) -> Result<Vec<ContentBlock>, Box<dyn std::error::Error + Send + Sync>> {
        self.seen.lock().unwrap().push(SeenRequest {
            message_count: request.messages.len(),
            had_tools: request.tools.is_some(),
            max_tokens: request.max_tokens,
            last_message: request.messages.last().cloned().expect("empty request"),
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| "scripted client ran out of responses".into())
    }
}

/// Calculator-style session recording call order.
struct CalcSession {
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

#[async_trait]
impl ToolSession for CalcSession {
    async fn list_tools(&mut self) -> Result<Vec<RemoteTool>, SessionError> {
        let tools = json!([
            {"name": "add", "description": "Add two numbers",
             "inputSchema": {"type": "object", "properties": {"a": {"type": "number"}, "b": {"type": "number"}}}},
            {"name": "sub", "description": "Subtract b from a",
             "inputSchema": {"type": "object", "properties": {"a": {"type": "number"}, "b": {"type": "number"}}}}
        ]);
        Ok(serde_json::from_value(tools).unwrap())
    }

    async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<ToolOutcome, SessionError> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.clone()));
        let a = arguments["a"].as_f64().unwrap_or(0.0);
        let b = arguments["b"].as_f64().unwrap_or(0.0);
        let result = match name {
            "add" => a + b,
            "sub" => a - b,
            _ => return Err(format!("unknown tool '{}'", name).into()),
        };
        Ok(ToolOutcome::text(format!("{}", result)))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "scripted"
    }
}

async fn calc_host() -> (Host, Arc<Mutex<Vec<(String, Value)>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut host = Host::new(Vec::new());
    host.attach_session("calc", Box::new(CalcSession { calls: calls.clone() }));
    host.discover_tools().await.unwrap();
    (host, calls)
}

fn tool_use(id: &str, name: &str, input: Value) -> ContentBlock {
    ContentBlock::ToolUse {
        id: id.to_string(),
        name: name.to_string(),
        input,
    }
}

#[tokio::test]
async fn direct_answer_never_triggers_a_second_call() {
    let (host, _) = calc_host().await;
    let client = ScriptedClient::new(vec![vec![ContentBlock::text("Hola!")]]);
    let mut chat = ChatSession::new(host).with_client(client.clone());

    let reply = chat.ask("hola").await.unwrap();
    assert_eq!(reply, "Hola!");

    let seen = client.seen();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].had_tools);
    assert_eq!(seen[0].max_tokens, 600);
    // History: the user message plus the assistant reply.
    assert_eq!(chat.history_len(), 2);
}

#[tokio::test]
async fn two_round_turn_executes_tool_and_composes_reply() {
    let (host, calls) = calc_host().await;
    let client = ScriptedClient::new(vec![
        vec![
            ContentBlock::text("Let me calculate that."),
            tool_use("x", "calc__add", json!({"a": 2, "b": 3})),
        ],
        vec![ContentBlock::text("The result is 5.")],
    ]);
    let mut chat = ChatSession::new(host).with_client(client.clone());

    let reply = chat.ask("what is 2+3").await.unwrap();

    // The session saw the native call with the declared arguments.
    let recorded = calls.lock().unwrap().clone();
    assert_eq!(recorded, vec![("add".to_string(), json!({"a": 2, "b": 3}))]);

    // The reply carries a confirmation naming server and tool, then the text.
    assert!(reply.contains("`calc`"));
    assert!(reply.contains("`add`"));
    assert!(reply.contains("The result is 5."));

    let seen = client.seen();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].had_tools);
    assert!(!seen[1].had_tools, "second pass must not carry the catalog");
    assert_eq!(seen[1].max_tokens, 800);

    // The second request ends with ONE user message holding the tool_result.
    let last = &seen[1].last_message;
    assert_eq!(last.role, Role::User);
    assert_eq!(last.content.len(), 1);
    match &last.content[0] {
        ContentBlock::ToolResult { tool_use_id, content } => {
            assert_eq!(tool_use_id, "x");
            let payload: Value = serde_json::from_str(content).unwrap();
            assert_eq!(payload["server"], "calc");
            assert_eq!(payload["tool"], "add");
            assert_eq!(payload["text"], "5");
        }
        other => panic!("expected tool_result, got {:?}", other),
    }

    // Full turn history: user, assistant, tool results, assistant.
    assert_eq!(chat.history_len(), 4);
}

#[tokio::test]
async fn multiple_tool_uses_run_sequentially_in_response_order() {
    let (host, calls) = calc_host().await;
    let client = ScriptedClient::new(vec![
        vec![
            tool_use("t1", "calc__add", json!({"a": 1, "b": 2})),
            tool_use("t2", "calc__sub", json!({"a": 9, "b": 4})),
        ],
        vec![ContentBlock::text("3 and 5.")],
    ]);
    let mut chat = ChatSession::new(host).with_client(client.clone());

    chat.ask("add 1+2 then subtract 9-4").await.unwrap();

    let recorded = calls.lock().unwrap().clone();
    assert_eq!(recorded[0].0, "add");
    assert_eq!(recorded[1].0, "sub");

    // One combined user message: [tool_result(t1), tool_result(t2)].
    let last = &client.seen()[1].last_message;
    assert_eq!(last.role, Role::User);
    let ids: Vec<&str> = last
        .content
        .iter()
        .map(|block| match block {
            ContentBlock::ToolResult { tool_use_id, .. } => tool_use_id.as_str(),
            other => panic!("expected tool_result, got {:?}", other),
        })
        .collect();
    assert_eq!(ids, vec!["t1", "t2"]);
}

#[tokio::test]
async fn failing_tool_becomes_an_error_tool_result_instead_of_aborting() {
    let (host, _) = calc_host().await;
    let client = ScriptedClient::new(vec![
        vec![tool_use("bad", "calc__mul", json!({"a": 2, "b": 3}))],
        vec![ContentBlock::text("That tool is unavailable.")],
    ]);
    let mut chat = ChatSession::new(host).with_client(client.clone());

    let reply = chat.ask("multiply 2 by 3").await.unwrap();
    assert!(reply.contains("That tool is unavailable."));

    let last = &client.seen()[1].last_message;
    match &last.content[0] {
        ContentBlock::ToolResult { tool_use_id, content } => {
            assert_eq!(tool_use_id, "bad");
            let payload: Value = serde_json::from_str(content).unwrap();
            assert!(payload["error"].as_str().unwrap().contains("calc__mul"));
        }
        other => panic!("expected tool_result, got {:?}", other),
    }
}

#[tokio::test]
async fn offline_mode_echoes_without_contacting_anything() {
    let (host, calls) = calc_host().await;
    let mut chat = ChatSession::new(host);

    let reply = chat.ask("hello there").await.unwrap();
    assert_eq!(reply, "(offline) received: hello there");
    assert_eq!(chat.history_len(), 2);
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn clear_resets_context_for_the_next_turn() {
    let (host, _) = calc_host().await;
    let client = ScriptedClient::new(vec![
        vec![ContentBlock::text("first answer")],
        vec![ContentBlock::text("fresh answer")],
    ]);
    let mut chat = ChatSession::new(host).with_client(client.clone());

    chat.ask("first question").await.unwrap();
    assert_eq!(chat.history_len(), 2);

    chat.clear();
    assert_eq!(chat.history_len(), 0);

    chat.ask("second question").await.unwrap();
    let seen = client.seen();
    // After the clear, the next first pass carries exactly one message.
    assert_eq!(seen[1].message_count, 1);
    assert_eq!(seen[1].last_message, ChatMessage::user_text("second question"));
}
