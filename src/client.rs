use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{StreamExt, TryStreamExt};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response, multipart};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::client_logger::ClientLogger;
use crate::cookies::Cookies;
use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, CONVERSATION_CREATE_RETRIES,
    CONVERSATIONS_CREATED, CONVERSATIONS_DELETED, STREAM_BYTES,
};
use crate::stream::{MessageStream, OpenedBody, RequestOpener};
use crate::types::conversation::ConversationInfo;
use crate::types::{Assistant, ChatRequest, Conversation, ConversationRequest, Model};

const DEFAULT_BASE_URL: &str = "https://huggingface.co";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const ASSISTANTS_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/112.0.0.0 Safari/537.36";

/// Attempts made to create a conversation before giving up.
pub const CREATE_CONVERSATION_ATTEMPTS: u32 = 6;

/// Options for connecting to the chat service.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientOptions {
    /// Sets the service's base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the connect timeout and the limit on each non-streaming exchange.
    ///
    /// Streamed replies are bounded only by the connect timeout, since the
    /// model may pause for long stretches between tokens.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// An authenticated session with HuggingChat.
///
/// One value is one session: it owns the cookie jar that the service keeps
/// updating as requests are made.
#[derive(Clone)]
pub struct HuggingChat {
    client: ReqwestClient,
    jar: Arc<Jar>,
    base_url: Url,
    timeout: Duration,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl std::fmt::Debug for HuggingChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingChat")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HuggingChat {
    /// Open a session with the given cookies.
    ///
    /// The session is bootstrapped with a `GET /chat`; its status is ignored
    /// but a transport failure is an error.
    pub async fn connect(cookies: Cookies, options: ClientOptions) -> Result<Self> {
        let base_url = Url::parse(options.base_url.trim_end_matches('/'))
            .map_err(|e| Error::url(format!("Invalid base URL {}: {e}", options.base_url), Some(e)))?;

        let jar = Arc::new(Jar::default());
        for line in cookies.set_cookie_lines() {
            jar.add_cookie_str(&line, &base_url);
        }

        let client = ReqwestClient::builder()
            .connect_timeout(options.timeout)
            .cookie_provider(Arc::clone(&jar))
            .default_headers(Self::default_headers(&base_url))
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        let chat = Self {
            client,
            jar,
            base_url,
            timeout: options.timeout,
            logger: None,
        };
        let response = chat.send(chat.client.get(chat.url("/chat"))).await?;
        tracing::debug!(status = response.status().as_u16(), "session bootstrapped");
        Ok(chat)
    }

    /// Attach a logger that sees every stream event and refreshed conversation.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The base URL of the service.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// The cookies currently held by the session.
    pub fn cookies(&self) -> Cookies {
        self.jar
            .cookies(&self.base_url)
            .and_then(|header| header.to_str().ok().map(Cookies::from_header))
            .unwrap_or_default()
    }

    fn default_headers(base_url: &Url) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        let origin = base_url.origin().ascii_serialization();
        if let Ok(origin) = HeaderValue::from_str(&origin) {
            headers.insert(header::ORIGIN, origin);
        }
        headers
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    fn conversation_referer(&self, conversation_id: &str) -> String {
        self.url(&format!("/chat/conversation/{conversation_id}"))
    }

    /// Send a request whose whole exchange must finish within the timeout.
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        self.send_with_limit(request, Some(self.timeout)).await
    }

    /// Send a request whose body is streamed; only connecting is bounded.
    async fn send_streaming(&self, request: RequestBuilder) -> Result<Response> {
        self.send_with_limit(request, None).await
    }

    async fn send_with_limit(
        &self,
        request: RequestBuilder,
        limit: Option<Duration>,
    ) -> Result<Response> {
        let request = match limit {
            Some(limit) => request.timeout(limit),
            None => request,
        };
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let result = request.send().await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        result.map_err(|e| {
            CLIENT_REQUEST_ERRORS.click();
            if e.is_timeout() {
                let seconds = limit.unwrap_or(self.timeout).as_secs_f64();
                Error::timeout(format!("Request timed out: {e}"), Some(seconds))
            } else {
                Error::from(e)
            }
        })
    }

    async fn expect_ok(response: Response, what: &str) -> Result<Response> {
        let status = response.status().as_u16();
        if status == 200 {
            return Ok(response);
        }
        CLIENT_REQUEST_ERRORS.click();
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status, body = %body, "{what} failed");
        Err(Error::api(
            status,
            format!("Failed to {what} with status code: {status}"),
        ))
    }

    /// Fetch the models offered by the service, skipping unlisted ones.
    ///
    /// A body that is not JSON yields an empty list; an entry that does not
    /// decode as a model is logged and skipped.
    pub async fn remote_llms(&self) -> Result<Vec<Model>> {
        let response = self.send(self.client.get(self.url("/chat/api/v2/models"))).await?;
        let response = Self::expect_ok(response, "get remote LLMs").await?;
        let text = response.text().await?;

        #[derive(Deserialize)]
        struct Envelope {
            json: Vec<Value>,
        }

        let entries = match serde_json::from_str::<Envelope>(&text) {
            Ok(envelope) => envelope.json,
            Err(e) => {
                tracing::error!(error = %e, "error decoding model list");
                Vec::new()
            }
        };
        let mut models = Vec::with_capacity(entries.len());
        for entry in entries {
            let model: Model = match serde_json::from_value(entry) {
                Ok(model) => model,
                Err(e) => {
                    tracing::error!(error = %e, "skipping undecodable model entry");
                    continue;
                }
            };
            if model.unlisted {
                tracing::debug!(model = %model.id, "skipping unlisted model");
                continue;
            }
            models.push(model);
        }
        Ok(models)
    }

    /// Create a remote conversation and return its id.
    ///
    /// Every failure of the exchange is retried until
    /// [`CREATE_CONVERSATION_ATTEMPTS`] attempts have been made.
    pub async fn create_conversation(&self, request: &ConversationRequest) -> Result<String> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_create_conversation(request).await {
                Ok(id) => {
                    CONVERSATIONS_CREATED.click();
                    tracing::debug!(conversation = %id, attempt, "created conversation");
                    return Ok(id);
                }
                Err((status, err)) => {
                    if attempt >= CREATE_CONVERSATION_ATTEMPTS {
                        return Err(Error::create_conversation(err.to_string(), status, attempt));
                    }
                    CONVERSATION_CREATE_RETRIES.click();
                    tracing::debug!(attempt, status, error = %err, "retrying conversation creation");
                }
            }
        }
    }

    async fn try_create_conversation(
        &self,
        request: &ConversationRequest,
    ) -> std::result::Result<String, (Option<u16>, Error)> {
        let builder = self
            .client
            .post(self.url("/chat/conversation"))
            .header(header::REFERER, self.url("/chat"))
            .json(request);
        let response = self.send(builder).await.map_err(|e| (None, e))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| (Some(status), Error::from(e)))?;
        tracing::debug!(status, body = %text, "conversation response");

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Created {
            conversation_id: String,
        }

        serde_json::from_str::<Created>(&text)
            .map(|created| created.conversation_id)
            .map_err(|e| (Some(status), Error::from(e)))
    }

    /// Fetch a conversation's model, prompt, title and message history.
    pub async fn conversation_info(&self, conversation_id: &str) -> Result<Conversation> {
        let mut conversation = Conversation::new(conversation_id);
        self.refresh_conversation(&mut conversation).await?;
        Ok(conversation)
    }

    /// Re-fetch a conversation's info in place.
    pub async fn refresh_conversation(&self, conversation: &mut Conversation) -> Result<()> {
        let url = self.url(&format!("/chat/api/v2/conversations/{}", conversation.id));
        let response = self
            .send(
                self.client
                    .get(url)
                    .header(header::REFERER, self.conversation_referer(&conversation.id)),
            )
            .await?;
        let response = Self::expect_ok(response, "get conversation info").await?;

        #[derive(Deserialize)]
        struct Envelope {
            json: ConversationInfo,
        }

        let envelope: Envelope = serde_json::from_str(&response.text().await?)?;
        envelope.json.apply_to(conversation);
        if let Some(logger) = &self.logger {
            logger.log_conversation(conversation);
        }
        Ok(())
    }

    /// List the conversations stored on the account.
    pub async fn remote_conversations(&self) -> Result<Vec<Conversation>> {
        let response = self.send(self.client.post(self.url("/chat/__data.json"))).await?;
        let response = Self::expect_ok(response, "get remote conversations").await?;
        let text = response.text().await?;
        let first_line = text.lines().next().unwrap_or_default();
        let page: Value = serde_json::from_str(first_line)?;
        let data = page
            .pointer("/nodes/0/data")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::unexpected_response("conversation page has no data node"))?;
        decode_conversations(data)
    }

    /// Fetch one page of published assistants; `None` past the last page.
    pub async fn assistants_page(&self, page: u32) -> Result<Option<Vec<Assistant>>> {
        let url = self.url(&format!(
            "/chat/assistants/__data.json?p={page}&x-sveltekit-invalidated=01"
        ));
        let response = self
            .send_with_limit(self.client.get(url), Some(ASSISTANTS_TIMEOUT))
            .await?;
        let page: Value = serde_json::from_str(&response.text().await?)?;
        let node = page
            .pointer("/nodes/1")
            .ok_or_else(|| Error::unexpected_response("assistant page has no data node"))?;
        if node.get("type").and_then(Value::as_str) == Some("error") {
            return Ok(None);
        }
        let data = node
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::unexpected_response("assistant node has no data"))?;
        decode_assistants(data).map(Some)
    }

    /// Create a public share link for a conversation.
    pub async fn share_conversation(&self, conversation_id: &str) -> Result<String> {
        let url = self.url(&format!("/chat/conversation/{conversation_id}/share"));
        let response = self
            .send(
                self.client
                    .post(url)
                    .header(header::REFERER, self.conversation_referer(conversation_id)),
            )
            .await?;
        let response = Self::expect_ok(response, "share conversation").await?;
        let body: Value = serde_json::from_str(&response.text().await?)?;
        body.get("url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::unexpected_response("Failed to share conversation: no url in response"))
    }

    /// Delete one remote conversation.
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        let url = self.url(&format!("/chat/conversation/{conversation_id}"));
        let response = self.send(self.client.delete(url)).await?;
        let status = response.status().as_u16();
        if status != 200 {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Error::delete_conversation(
                format!("Failed to delete conversation {conversation_id}"),
                status,
            ));
        }
        CONVERSATIONS_DELETED.click();
        Ok(())
    }

    /// Delete every conversation on the account.
    pub async fn delete_all_conversations(&self) -> Result<()> {
        let form = multipart::Form::new().text("", "");
        let response = self
            .send(
                self.client
                    .delete(self.url("/chat/api/conversations/"))
                    .header(header::REFERER, self.url("/chat"))
                    .multipart(form),
            )
            .await?;
        let status = response.status().as_u16();
        if status != 200 {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Error::delete_conversation(
                "Failed to delete ALL conversations",
                status,
            ));
        }
        CONVERSATIONS_DELETED.click();
        Ok(())
    }

    /// Opt in or out of sharing conversations with model authors.
    pub async fn set_share_conversations(&self, share: bool) -> Result<()> {
        let value = if share { "on" } else { "" };
        let form = multipart::Form::new().text("shareConversationsWithModelAuthors", value);
        let response = self
            .send(
                self.client
                    .post(self.url("/chat/settings"))
                    .header(header::REFERER, self.url("/chat"))
                    .multipart(form),
            )
            .await?;
        Self::expect_ok(response, "set share conversations").await?;
        Ok(())
    }

    /// Send a chat turn and stream the reply.
    ///
    /// The request is issued when the stream is first polled. `retry_count`
    /// bounds the number of attempts and must be positive.
    pub fn stream(
        &self,
        conversation_id: &str,
        request: ChatRequest,
        retry_count: u32,
    ) -> Result<MessageStream> {
        let opener = ChatOpener {
            chat: self.clone(),
            url: self.url(&format!("/chat/conversation/{conversation_id}")),
            referer: self.conversation_referer(conversation_id),
            request,
        };
        MessageStream::new(
            conversation_id,
            Arc::new(opener),
            retry_count,
            self.logger.clone(),
        )
    }
}

struct ChatOpener {
    chat: HuggingChat,
    url: String,
    referer: String,
    request: ChatRequest,
}

#[async_trait::async_trait]
impl RequestOpener for ChatOpener {
    async fn open(&self, is_retry: bool) -> Result<OpenedBody> {
        let request = self.request.clone().with_retry(self.request.is_retry || is_retry);
        let data = serde_json::to_string(&request)?;
        let form = multipart::Form::new().text("data", data);
        let response = self
            .chat
            .send_streaming(
                self.chat
                    .client
                    .post(&self.url)
                    .header(header::REFERER, &self.referer)
                    .multipart(form),
            )
            .await?;
        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .inspect_ok(|chunk| STREAM_BYTES.count(chunk.len() as u64))
            .map_err(io::Error::other)
            .boxed();
        Ok(OpenedBody { status, body })
    }
}

fn devalue<'a>(data: &'a [Value], index: &Value) -> Result<&'a Value> {
    index
        .as_u64()
        .and_then(|i| data.get(i as usize))
        .ok_or_else(|| Error::unexpected_response(format!("dangling data reference: {index}")))
}

fn devalue_str(data: &[Value], record: &Value, field: &str) -> Result<String> {
    let index = record
        .get(field)
        .ok_or_else(|| Error::unexpected_response(format!("record has no {field}")))?;
    Ok(match devalue(data, index)? {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn devalue_list<'a>(data: &'a [Value], index: &Value) -> Result<&'a Vec<Value>> {
    devalue(data, index)?
        .as_array()
        .ok_or_else(|| Error::unexpected_response("expected a list of references"))
}

/// Decode the conversation list from a flattened page payload.
fn decode_conversations(data: &[Value]) -> Result<Vec<Conversation>> {
    let root = data
        .first()
        .and_then(|root| root.get("conversations"))
        .ok_or_else(|| Error::unexpected_response("page data has no conversations"))?;
    let mut conversations = Vec::new();
    for index in devalue_list(data, root)? {
        let record = devalue(data, index)?;
        let mut conversation = Conversation::new(devalue_str(data, record, "id")?);
        conversation.title = Some(devalue_str(data, record, "title")?);
        conversation.model = Some(devalue_str(data, record, "model")?);
        conversations.push(conversation);
    }
    Ok(conversations)
}

/// Decode one page of assistants; `data[1]` lists the assistant records.
fn decode_assistants(data: &[Value]) -> Result<Vec<Assistant>> {
    let indices = data
        .get(1)
        .and_then(Value::as_array)
        .ok_or_else(|| Error::unexpected_response("assistant data has no index list"))?;
    let mut assistants = Vec::with_capacity(indices.len());
    for index in indices {
        let record = devalue(data, index)?;
        assistants.push(Assistant {
            assistant_id: devalue_str(data, record, "_id")?,
            author: devalue_str(data, record, "createdByName")?,
            name: devalue_str(data, record, "name")?.trim().to_string(),
            model_name: devalue_str(data, record, "modelId")?,
            pre_prompt: devalue_str(data, record, "preprompt")?,
            description: devalue_str(data, record, "description")?,
        });
    }
    Ok(assistants)
}
