//! Assistant dispatcher tests against a mock service.

mod common;

use std::sync::{Arc, Mutex};

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{CONVERSATION_ID, SharedBuffer, connect, mount_session, reply_body};
use jarvis::assistant::{Assistant, AssistantConfig, Flow, Launcher};
use jarvis::chat::{ChatBot, ChatConfig};
use jarvis::{PlainTextRenderer, Result};

#[derive(Clone, Default)]
struct RecordingLauncher {
    launched: Arc<Mutex<Vec<String>>>,
}

impl RecordingLauncher {
    fn launched(&self) -> Vec<String> {
        self.launched.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Launcher for RecordingLauncher {
    async fn launch_app(&self, path: &str) -> Result<()> {
        self.launched.lock().unwrap().push(format!("app:{path}"));
        Ok(())
    }

    async fn open_url(&self, url: &str) -> Result<()> {
        self.launched.lock().unwrap().push(format!("url:{url}"));
        Ok(())
    }
}

const CONFIG: &str = r#"
apps:
  - name: notepad
    path: /usr/bin/gedit
sites:
  - name: github
    url: https://github.com
"#;

async fn assistant(server: &MockServer) -> (Assistant, RecordingLauncher) {
    let chat = connect(server).await;
    let bot = ChatBot::new(chat, ChatConfig::new().without_color())
        .await
        .unwrap();
    let launcher = RecordingLauncher::default();
    let config = AssistantConfig::from_yaml(CONFIG).unwrap();
    (Assistant::new(bot, launcher.clone(), config), launcher)
}

fn renderer() -> (PlainTextRenderer, SharedBuffer) {
    let buffer = SharedBuffer::default();
    (
        PlainTextRenderer::with_color(false)
            .with_writer(buffer.clone())
            .with_error_writer(buffer.clone()),
        buffer,
    )
}

#[tokio::test]
async fn open_and_search_go_to_the_launcher() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    let (mut assistant, launcher) = assistant(&server).await;
    let (mut renderer, output) = renderer();

    for input in [
        "open Notepad",
        "open github",
        "open docs.rs",
        "play never gonna give you up on youtube",
        "search weather in pune",
    ] {
        assert_eq!(assistant.handle(input, &mut renderer).await, Flow::Continue);
    }
    assert_eq!(
        launcher.launched(),
        vec![
            "app:/usr/bin/gedit".to_string(),
            "url:https://github.com".to_string(),
            "url:https://docs.rs".to_string(),
            "url:https://www.youtube.com/results?search_query=never+gonna+give+you+up".to_string(),
            "url:https://www.google.com/search?q=weather+in+pune".to_string(),
        ]
    );
    assert!(output.contents().contains("Opening notepad"));
}

#[tokio::test]
async fn questions_stream_from_the_model() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    Mock::given(method("POST"))
        .and(path(format!("/chat/conversation/{CONVERSATION_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(reply_body(&[
            json!({"type": "status", "status": "started"}),
            json!({"type": "stream", "token": "It is "}),
            json!({"type": "stream", "token": "sunny."}),
            json!({"type": "finalAnswer", "text": "It is sunny.", "interrupted": false}),
        ])))
        .expect(1)
        .mount(&server)
        .await;
    let (mut assistant, launcher) = assistant(&server).await;
    let (mut renderer, output) = renderer();

    let flow = assistant
        .handle("What is the weather like?", &mut renderer)
        .await;
    assert_eq!(flow, Flow::Continue);
    assert!(launcher.launched().is_empty());
    assert!(output.contents().contains("It is sunny."));
    let stats = assistant.bot().stats();
    assert_eq!(stats.completed_turns, 1);
    assert_eq!(stats.failed_turns, 0);
}

#[tokio::test]
async fn failed_turns_are_reported_not_fatal() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    Mock::given(method("POST"))
        .and(path(format!("/chat/conversation/{CONVERSATION_ID}")))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    let (mut assistant, _) = assistant(&server).await;
    assistant.bot_mut().set_retry_count(1).unwrap();
    let (mut renderer, output) = renderer();

    assert_eq!(assistant.handle("Hello?", &mut renderer).await, Flow::Continue);
    assert!(output.contents().contains("Failed to chat. (502)"));
    assert_eq!(assistant.bot().stats().failed_turns, 1);
}

#[tokio::test]
async fn commands_control_the_session() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    let (mut assistant, _) = assistant(&server).await;
    let (mut renderer, output) = renderer();

    assert_eq!(assistant.handle("/model 1", &mut renderer).await, Flow::Continue);
    assert_eq!(
        assistant.bot().active_llm().id,
        "mistralai/Mistral-7B-Instruct-v0.2"
    );
    assistant.handle("/model 9", &mut renderer).await;
    assert!(output.contents().contains("Out of range of llm index: 9"));

    assistant.handle("/web on", &mut renderer).await;
    assert!(assistant.bot().stats().web_search);

    assistant.handle("/models", &mut renderer).await;
    assert!(output.contents().contains("* 1: mistralai/Mistral-7B-Instruct-v0.2"));

    assistant.handle("/info", &mut renderer).await;
    assert!(output.contents().contains("Title: Greetings"));

    assistant.handle("/dance", &mut renderer).await;
    assert!(output.contents().contains("Unknown command: /dance"));

    assert_eq!(assistant.handle("/quit", &mut renderer).await, Flow::Quit);
}

#[tokio::test]
async fn delete_clears_the_current_conversation() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    Mock::given(method("DELETE"))
        .and(path(format!("/chat/conversation/{CONVERSATION_ID}")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let (mut assistant, _) = assistant(&server).await;
    let (mut renderer, output) = renderer();

    assistant.handle("/delete", &mut renderer).await;
    assert!(assistant.bot().current_conversation().is_none());

    assistant.handle("Anyone there?", &mut renderer).await;
    assert!(output.contents().contains("No conversation selected"));
}

#[tokio::test]
async fn zero_retry_count_is_rejected_before_any_request() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    Mock::given(method("POST"))
        .and(path(format!("/chat/conversation/{CONVERSATION_ID}")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let chat = connect(&server).await;
    let err = ChatBot::new(chat, ChatConfig::new().with_retry_count(0))
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("retry_count"));
}
