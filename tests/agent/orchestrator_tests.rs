// End-to-end turns: scripted model, in-memory tool server, real conversation slot

use async_trait::async_trait;
use pipai_core::agent::{
    ConversationOrchestrator, ExpiryDecision, OrchestratorOptions, TurnOutcome, TurnRequest,
    formatting_instructions,
};
use pipai_core::model::{CompletionError, CompletionProvider};
use pipai_core::tooling::{ToolDescriptor, ToolProvider, ToolProviderError, ToolProviderRegistry};
use pipai_core::types::{ChatMessage, MessageRole};
use pipai_session::ConversationStore;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

#[derive(Clone, Default)]
struct ScriptedModel {
    replies: Arc<Mutex<VecDeque<String>>>,
    seen: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl ScriptedModel {
    fn replying(replies: &[&str]) -> Self {
        let model = Self::default();
        model
            .replies
            .lock()
            .expect("replies lock")
            .extend(replies.iter().map(|reply| reply.to_string()));
        model
    }

    fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.seen.lock().expect("seen lock").clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedModel {
    async fn complete(&self, _model: &str, messages: &[ChatMessage]) -> Result<String, CompletionError> {
        self.seen.lock().expect("seen lock").push(messages.to_vec());
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .ok_or_else(|| CompletionError::invalid_response("scripted", "out of replies"))
    }
}

struct WeatherServer {
    calls: Mutex<Vec<Value>>,
}

#[async_trait]
impl ToolProvider for WeatherServer {
    fn name(&self) -> &str {
        "weather"
    }

    async fn initialize(&self) -> Result<(), ToolProviderError> {
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolProviderError> {
        Ok(vec![ToolDescriptor::new(
            "get_forecast",
            "Forecast for a city",
            json!({
                "type": "object",
                "properties": {"city": {"type": "string", "description": "City name"}},
                "required": ["city"]
            }),
        )])
    }

    async fn invoke_tool(&self, _tool: &str, arguments: Value) -> Result<Value, ToolProviderError> {
        self.calls.lock().expect("calls lock").push(arguments);
        Ok(json!({"content": [{"type": "text", "text": "Sunny, 24C"}], "isError": false}))
    }

    async fn close(&self) {}
}

async fn weather_registry() -> (Arc<WeatherServer>, Arc<ToolProviderRegistry>) {
    let server = Arc::new(WeatherServer {
        calls: Mutex::new(Vec::new()),
    });
    let registry = Arc::new(ToolProviderRegistry::new());
    registry
        .load_providers(vec![Arc::clone(&server) as Arc<dyn ToolProvider>])
        .await
        .expect("load weather server");
    (server, registry)
}

#[tokio::test]
async fn tool_round_trip_in_a_persisted_conversation() {
    let dir = tempdir().expect("tempdir");
    let store = ConversationStore::in_dir(dir.path());
    store.start().expect("start conversation");

    let (server, registry) = weather_registry().await;
    let model = ScriptedModel::replying(&[
        r#"{"tool": "get_forecast", "arguments": {"city": "Lisbon"}}"#,
        "It will be sunny in Lisbon, around 24C.",
    ]);
    let orchestrator = ConversationOrchestrator::new(model.clone(), ConversationStore::in_dir(dir.path()))
        .with_registry(Arc::clone(&registry));

    let outcome = orchestrator
        .run_turn(
            TurnRequest::new("gpt-4o", "Weather tomorrow?").with_history(true),
            &ExpiryDecision::Abort,
        )
        .await
        .expect("turn");

    let TurnOutcome::Answered(answer) = outcome else {
        panic!("turn was aborted");
    };
    assert_eq!(answer.response, "It will be sunny in Lisbon, around 24C.");
    let step = answer.tool_step.expect("tool step");
    assert!(step.success);
    assert_eq!(step.tool, "get_forecast");
    assert_eq!(server.calls.lock().expect("calls lock").as_slice(), &[json!({"city": "Lisbon"})]);

    let requests = model.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0][0].role, MessageRole::System);
    assert!(requests[0][0].content.contains("- city: City name (required)"));
    let second = requests[1].last().expect("second request tail");
    assert_eq!(second.role, MessageRole::User);
    assert!(second.content.contains("Sunny, 24C"));

    let roles: Vec<_> = store.history_for_model().iter().map(|message| message.role).collect();
    assert_eq!(
        roles,
        vec![
            MessageRole::System,
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::User,
            MessageRole::Assistant,
        ]
    );

    registry.close_all().await;
}

#[tokio::test]
async fn follow_up_turn_sees_the_previous_exchange() {
    let dir = tempdir().expect("tempdir");
    ConversationStore::in_dir(dir.path()).start().expect("start conversation");

    let first = ScriptedModel::replying(&["Rust 1.85 stabilized async closures."]);
    ConversationOrchestrator::new(first, ConversationStore::in_dir(dir.path()))
        .run_turn(
            TurnRequest::new("gpt-4o", "Summarize").with_context("changelog text").with_history(true),
            &ExpiryDecision::Abort,
        )
        .await
        .expect("first turn");

    let second = ScriptedModel::replying(&["Async closures."]);
    let orchestrator = ConversationOrchestrator::new(second.clone(), ConversationStore::in_dir(dir.path()));
    let outcome = orchestrator
        .run_turn(
            TurnRequest::new("gpt-4o", "Which feature was that?").with_history(true),
            &ExpiryDecision::Abort,
        )
        .await
        .expect("second turn");
    assert_eq!(outcome.response(), Some("Async closures."));

    let request = &second.requests()[0];
    assert_eq!(
        request.as_slice(),
        &[
            ChatMessage::user("Context:\nchangelog text\n\nPrompt: Summarize"),
            ChatMessage::assistant("Rust 1.85 stabilized async closures."),
            ChatMessage::user("Which feature was that?"),
        ]
    );
}

#[tokio::test]
async fn one_shot_turn_with_plain_text_guidance_leaves_no_trace() {
    let dir = tempdir().expect("tempdir");
    let model = ScriptedModel::replying(&["ls -la lists hidden files."]);
    let orchestrator = ConversationOrchestrator::new(model.clone(), ConversationStore::in_dir(dir.path()))
        .with_options(OrchestratorOptions {
            formatting_instructions: formatting_instructions(false),
            ..OrchestratorOptions::default()
        });

    let outcome = orchestrator
        .run_turn(TurnRequest::new("gpt-4o", "How do I list hidden files?"), &ExpiryDecision::Abort)
        .await
        .expect("turn");

    assert_eq!(outcome.response(), Some("ls -la lists hidden files."));
    let request = &model.requests()[0];
    assert_eq!(request.len(), 2);
    assert_eq!(request[0].role, MessageRole::System);
    assert!(request[0].content.contains("plain text"));
    assert!(!ConversationStore::in_dir(dir.path()).is_active());
}

#[tokio::test]
async fn unknown_tool_request_answers_with_the_model_reply() {
    let dir = tempdir().expect("tempdir");
    let (server, registry) = weather_registry().await;
    let envelope = r#"{"tool": "book_flight", "arguments": {"to": "Oslo"}}"#;
    let model = ScriptedModel::replying(&[envelope]);
    let orchestrator = ConversationOrchestrator::new(model.clone(), ConversationStore::in_dir(dir.path()))
        .with_registry(registry);

    let outcome = orchestrator
        .run_turn(TurnRequest::new("gpt-4o", "Book me a flight"), &ExpiryDecision::Abort)
        .await
        .expect("turn");

    let TurnOutcome::Answered(answer) = outcome else {
        panic!("turn was aborted");
    };
    assert_eq!(answer.response, envelope);
    let step = answer.tool_step.expect("tool step");
    assert!(!step.success);
    assert_eq!(step.output, json!("no provider for tool 'book_flight'"));
    assert_eq!(model.requests().len(), 1);
    assert!(server.calls.lock().expect("calls lock").is_empty());
}
