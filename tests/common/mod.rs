//! A mock HuggingChat service for integration tests.

#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use jarvis::{ClientOptions, Cookies, HuggingChat};

pub const CONVERSATION_ID: &str = "6650a1c0ffee";

pub fn models_body() -> Value {
    json!({
        "json": [
            {"id": "meta-llama/Meta-Llama-3-70B-Instruct", "name": "meta-llama/Meta-Llama-3-70B-Instruct", "preprompt": ""},
            {"id": "hidden/model", "name": "hidden/model", "unlisted": true},
            {"id": "mistralai/Mistral-7B-Instruct-v0.2", "name": "mistralai/Mistral-7B-Instruct-v0.2", "preprompt": "Be brief."}
        ]
    })
}

pub fn info_body(messages: Value) -> Value {
    json!({
        "json": {
            "model": "meta-llama/Meta-Llama-3-70B-Instruct",
            "preprompt": "You are Jarvis.",
            "title": "Greetings",
            "messages": messages
        }
    })
}

pub fn root_message() -> Value {
    json!([
        {"id": "root", "from": "system", "content": "You are Jarvis.", "createdAt": "2024-05-17T10:04:31.000Z"}
    ])
}

/// Mount the bootstrap, model list, conversation creation and info routes.
pub async fn mount_session(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/chat/api/v2/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(models_body()))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/conversation"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"conversationId": CONVERSATION_ID})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/chat/api/v2/conversations/{CONVERSATION_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(info_body(root_message())))
        .mount(server)
        .await;
}

pub async fn connect(server: &MockServer) -> HuggingChat {
    let cookies: Cookies = [("hf-chat", "session-token")].into_iter().collect();
    HuggingChat::connect(cookies, ClientOptions::default().with_base_url(server.uri()))
        .await
        .unwrap()
}

/// Newline-delimited reply body.
pub fn reply_body(events: &[Value]) -> String {
    let mut body = String::new();
    for event in events {
        body.push_str(&event.to_string());
        body.push('\n');
    }
    body
}

/// A writer whose contents can be read back after the renderer is done.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
