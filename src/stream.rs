//! Streaming chat replies.
//!
//! The service answers a chat turn with newline-delimited JSON objects on a
//! single open connection. [`MessageStream`] turns that body into a stream of
//! [`StreamEvent`]s, reopening the request when the service answers with a
//! non-200 status or the connection drops mid-body.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde_json::Value;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tokio_util::io::StreamReader;

use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::observability::{STREAM_ERRORS, STREAM_EVENTS, STREAM_RETRIES, STREAM_TTFB};
use crate::types::{FinalAnswerEvent, Message, StreamEvent};

const MODEL_OVERLOADED: &str = "Model is overloaded";
const CONVERSATION_NOT_FOUND: &str = "Conversation not found";

/// An opened response: its status and its body.
pub(crate) struct OpenedBody {
    pub status: u16,
    pub body: BoxStream<'static, io::Result<Bytes>>,
}

/// Issues the chat request; called once per attempt.
#[async_trait::async_trait]
pub(crate) trait RequestOpener: Send + Sync {
    async fn open(&self, is_retry: bool) -> Result<OpenedBody>;
}

type Lines = FramedRead<StreamReader<BoxStream<'static, io::Result<Bytes>>, Bytes>, LinesCodec>;

enum State {
    Connecting { is_retry: bool },
    Reading { lines: Lines, opened_at: Option<Instant> },
    Done,
}

struct Inner {
    opener: Arc<dyn RequestOpener>,
    retries_left: u32,
    started_seen: bool,
    state: State,
}

/// Map a failure message onto the error category it names.
pub(crate) fn classify_failure(text: &str, fallback: impl FnOnce() -> Error) -> Error {
    if text.contains(MODEL_OVERLOADED) {
        Error::model_overloaded(text)
    } else if text.contains(CONVERSATION_NOT_FOUND) {
        Error::invalid_conversation_id(text)
    } else {
        fallback()
    }
}

/// What to do with one decoded line.
enum LineOutcome {
    Yield(StreamEvent),
    Finish(StreamEvent),
    Fail(Error),
}

fn decode_line(line: &str, started_seen: &mut bool) -> LineOutcome {
    let value = match serde_json::from_str::<Value>(line) {
        Ok(value) => value,
        Err(_) => {
            return LineOutcome::Fail(classify_failure(line, || {
                Error::chat(format!("Failed to parse response: {line}"))
            }));
        }
    };
    match StreamEvent::from_value(value) {
        event @ StreamEvent::FinalAnswer(_) => LineOutcome::Finish(event),
        StreamEvent::Status(status) if status.is_started() && *started_seen => {
            tracing::debug!("second start status; treating as end of reply");
            LineOutcome::Finish(StreamEvent::FinalAnswer(FinalAnswerEvent::default()))
        }
        StreamEvent::Status(status) => {
            if status.is_started() {
                *started_seen = true;
            }
            LineOutcome::Yield(StreamEvent::Status(status))
        }
        StreamEvent::Error(error)
            if error.message.contains(MODEL_OVERLOADED)
                || error.message.contains(CONVERSATION_NOT_FOUND) =>
        {
            LineOutcome::Fail(classify_failure(&error.message, || {
                Error::chat(error.message.clone())
            }))
        }
        event => LineOutcome::Yield(event),
    }
}

impl Inner {
    /// Consume one attempt; returns false when the budget is exhausted.
    fn consume_attempt(&mut self) -> bool {
        self.retries_left = self.retries_left.saturating_sub(1);
        self.retries_left > 0
    }

    /// Reopen the request; the new response starts its own `started` status.
    fn reconnect(&mut self) {
        self.started_seen = false;
        self.state = State::Connecting { is_retry: true };
    }

    async fn next_item(&mut self) -> Option<Result<StreamEvent>> {
        loop {
            match &mut self.state {
                State::Done => return None,
                State::Connecting { is_retry } => {
                    let is_retry = *is_retry;
                    let opened = match self.opener.open(is_retry).await {
                        Ok(opened) => opened,
                        Err(err) => {
                            self.state = State::Done;
                            STREAM_ERRORS.click();
                            let message = err.to_string();
                            return Some(Err(classify_failure(&message, || err)));
                        }
                    };
                    if opened.status != 200 {
                        tracing::debug!(status = opened.status, "chat request failed");
                        if !self.consume_attempt() {
                            self.state = State::Done;
                            STREAM_ERRORS.click();
                            return Some(Err(Error::chat(format!(
                                "Failed to chat. ({})",
                                opened.status
                            ))));
                        }
                        STREAM_RETRIES.click();
                        self.reconnect();
                        continue;
                    }
                    let lines = FramedRead::new(StreamReader::new(opened.body), LinesCodec::new());
                    self.state = State::Reading {
                        lines,
                        opened_at: Some(Instant::now()),
                    };
                }
                State::Reading { lines, opened_at } => {
                    let line = match lines.next().await {
                        Some(Ok(line)) => line,
                        Some(Err(LinesCodecError::Io(err)))
                            if err.kind() == io::ErrorKind::InvalidData =>
                        {
                            self.state = State::Done;
                            STREAM_ERRORS.click();
                            return Some(Err(Error::encoding(
                                format!("Invalid UTF-8 in stream: {err}"),
                                Some(Box::new(err)),
                            )));
                        }
                        Some(Err(err)) => {
                            tracing::debug!(error = %err, "chat stream interrupted");
                            if !self.consume_attempt() {
                                self.state = State::Done;
                                continue;
                            }
                            STREAM_RETRIES.click();
                            self.reconnect();
                            return Some(Ok(StreamEvent::Restarted));
                        }
                        None => {
                            self.state = State::Done;
                            return None;
                        }
                    };
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if let Some(opened_at) = opened_at.take() {
                        STREAM_TTFB.add(opened_at.elapsed().as_secs_f64());
                    }
                    match decode_line(line, &mut self.started_seen) {
                        LineOutcome::Yield(event) => {
                            STREAM_EVENTS.click();
                            return Some(Ok(event));
                        }
                        LineOutcome::Finish(event) => {
                            STREAM_EVENTS.click();
                            self.state = State::Done;
                            return Some(Ok(event));
                        }
                        LineOutcome::Fail(err) => {
                            STREAM_ERRORS.click();
                            self.state = State::Done;
                            return Some(Err(err));
                        }
                    }
                }
            }
        }
    }
}

/// A streamed chat reply.
///
/// Yields events until a [`StreamEvent::FinalAnswer`] or an error; nothing
/// follows either. Dropping the stream closes the underlying connection.
pub struct MessageStream {
    conversation_id: String,
    logger: Option<Arc<dyn ClientLogger>>,
    inner: Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>,
}

impl MessageStream {
    /// Create a stream that opens its request lazily, on first poll.
    ///
    /// `retry_count` is the total number of attempts and must be positive.
    pub(crate) fn new(
        conversation_id: impl Into<String>,
        opener: Arc<dyn RequestOpener>,
        retry_count: u32,
        logger: Option<Arc<dyn ClientLogger>>,
    ) -> Result<Self> {
        if retry_count == 0 {
            return Err(Error::validation(
                "retry_count must be greater than 0",
                Some("retry_count".to_string()),
            ));
        }
        let inner = Inner {
            opener,
            retries_left: retry_count,
            started_seen: false,
            state: State::Connecting { is_retry: false },
        };
        let inner = stream::unfold(inner, |mut inner| async move {
            let item = inner.next_item().await?;
            Some((item, inner))
        });
        Ok(Self {
            conversation_id: conversation_id.into(),
            logger,
            inner: Box::pin(inner),
        })
    }

    /// The conversation this reply belongs to.
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Drive the stream to completion and collect the reply.
    pub async fn wait_until_done(mut self) -> Result<Message> {
        let mut message = Message::new(self.conversation_id.clone());
        while let Some(event) = self.next().await {
            message.push(event?);
        }
        if let Some(logger) = &self.logger {
            logger.log_stream_message(&message);
        }
        Ok(message)
    }
}

impl Stream for MessageStream {
    type Item = Result<StreamEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let poll = self.inner.as_mut().poll_next(cx);
        if let Poll::Ready(Some(Ok(event))) = &poll {
            if let Some(logger) = &self.logger {
                logger.log_stream_event(event);
            }
        }
        poll
    }
}

impl std::fmt::Debug for MessageStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageStream")
            .field("conversation_id", &self.conversation_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedOpener {
        responses: Mutex<VecDeque<(u16, Vec<io::Result<Bytes>>)>>,
        calls: AtomicUsize,
        retries: Mutex<Vec<bool>>,
    }

    impl ScriptedOpener {
        fn new(responses: Vec<(u16, Vec<io::Result<Bytes>>)>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
                retries: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl RequestOpener for ScriptedOpener {
        async fn open(&self, is_retry: bool) -> Result<OpenedBody> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.retries.lock().unwrap().push(is_retry);
            let (status, chunks) = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or((500, Vec::new()));
            Ok(OpenedBody {
                status,
                body: stream::iter(chunks).boxed(),
            })
        }
    }

    fn body(text: &str) -> Vec<io::Result<Bytes>> {
        vec![Ok(Bytes::from(text.to_string()))]
    }

    async fn collect(stream: MessageStream) -> Vec<Result<StreamEvent>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn final_answer_ends_stream_without_retry() {
        let opener = ScriptedOpener::new(vec![(
            200,
            vec![
                Ok(Bytes::from_static(b"{\"type\":\"status\",\"status\":\"started\"}\n\n{\"type\":\"str")),
                Ok(Bytes::from_static(b"eam\",\"token\":\"Hi\"}\n")),
                Ok(Bytes::from_static(b"{\"type\":\"finalAnswer\",\"text\":\"Hi\"}\n")),
                Ok(Bytes::from_static(b"{\"type\":\"stream\",\"token\":\"ignored\"}\n")),
            ],
        )]);
        let stream = MessageStream::new("c1", opener.clone(), 5, None).unwrap();
        let events = collect(stream).await;
        assert_eq!(events.len(), 3);
        assert!(events[2].as_ref().unwrap().is_terminal());
        assert_eq!(opener.calls(), 1);
    }

    #[tokio::test]
    async fn non_200_past_budget_is_chat_error() {
        let opener = ScriptedOpener::new(vec![
            (500, Vec::new()),
            (500, Vec::new()),
            (503, Vec::new()),
        ]);
        let stream = MessageStream::new("c1", opener.clone(), 3, None).unwrap();
        let events = collect(stream).await;
        assert_eq!(events.len(), 1);
        let err = events.into_iter().next().unwrap().unwrap_err();
        assert!(err.is_chat());
        assert_eq!(err.to_string(), "Chat error: Failed to chat. (503)");
        assert_eq!(opener.calls(), 3);
        assert_eq!(*opener.retries.lock().unwrap(), vec![false, true, true]);
    }

    #[tokio::test]
    async fn retry_after_non_200_succeeds() {
        let opener = ScriptedOpener::new(vec![
            (429, Vec::new()),
            (200, body("{\"type\":\"finalAnswer\",\"text\":\"ok\"}\n")),
        ]);
        let message = MessageStream::new("c1", opener.clone(), 5, None)
            .unwrap()
            .wait_until_done()
            .await
            .unwrap();
        assert_eq!(message.text, "ok");
        assert_eq!(opener.calls(), 2);
    }

    #[tokio::test]
    async fn second_started_status_synthesizes_final_answer() {
        let opener = ScriptedOpener::new(vec![(
            200,
            body(
                "{\"type\":\"status\",\"status\":\"started\"}\n\
                 {\"type\":\"stream\",\"token\":\"a\"}\n\
                 {\"type\":\"status\",\"status\":\"started\"}\n\
                 {\"type\":\"stream\",\"token\":\"b\"}\n",
            ),
        )]);
        let events = collect(MessageStream::new("c1", opener, 5, None).unwrap()).await;
        assert_eq!(events.len(), 3);
        match events[2].as_ref().unwrap() {
            StreamEvent::FinalAnswer(answer) => assert_eq!(answer.text, ""),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unparseable_lines_are_classified() {
        let cases = [
            ("Model is overloaded, please retry", "overloaded"),
            ("Conversation not found", "invalid"),
            ("<html>oops</html>", "chat"),
        ];
        for (line, kind) in cases {
            let opener = ScriptedOpener::new(vec![(200, body(&format!("{line}\n")))]);
            let events = collect(MessageStream::new("c1", opener, 5, None).unwrap()).await;
            assert_eq!(events.len(), 1);
            let err = events.into_iter().next().unwrap().unwrap_err();
            match kind {
                "overloaded" => assert!(err.is_model_overloaded()),
                "invalid" => assert!(err.is_invalid_conversation_id()),
                _ => assert_eq!(
                    err.to_string(),
                    "Chat error: Failed to parse response: <html>oops</html>"
                ),
            }
        }
    }

    #[tokio::test]
    async fn interrupted_body_is_retried() {
        let opener = ScriptedOpener::new(vec![
            (
                200,
                vec![
                    Ok(Bytes::from_static(
                        b"{\"type\":\"status\",\"status\":\"started\"}\n{\"type\":\"stream\",\"token\":\"par\"}\n",
                    )),
                    Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
                ],
            ),
            (
                200,
                body(
                    "{\"type\":\"status\",\"status\":\"started\"}\n\
                     {\"type\":\"stream\",\"token\":\"full\"}\n\
                     {\"type\":\"finalAnswer\",\"text\":\"\"}\n",
                ),
            ),
        ]);
        let message = MessageStream::new("c1", opener.clone(), 5, None)
            .unwrap()
            .wait_until_done()
            .await
            .unwrap();
        assert_eq!(message.text, "full");
        assert!(message.is_complete());
        assert!(message.events.contains(&StreamEvent::Restarted));
        assert_eq!(*opener.retries.lock().unwrap(), vec![false, true]);
    }

    #[tokio::test]
    async fn retry_after_non_200_expects_a_fresh_start() {
        let opener = ScriptedOpener::new(vec![
            (
                200,
                vec![
                    Ok(Bytes::from_static(b"{\"type\":\"status\",\"status\":\"started\"}\n")),
                    Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
                ],
            ),
            (502, Vec::new()),
            (
                200,
                body(
                    "{\"type\":\"status\",\"status\":\"started\"}\n\
                     {\"type\":\"finalAnswer\",\"text\":\"done\"}\n",
                ),
            ),
        ]);
        let message = MessageStream::new("c1", opener.clone(), 5, None)
            .unwrap()
            .wait_until_done()
            .await
            .unwrap();
        assert_eq!(message.text, "done");
        assert_eq!(opener.calls(), 3);
    }

    #[tokio::test]
    async fn interrupted_body_past_budget_ends_stream() {
        let opener = ScriptedOpener::new(vec![(
            200,
            vec![
                Ok(Bytes::from_static(b"{\"type\":\"stream\",\"token\":\"par\"}\n")),
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
            ],
        )]);
        let events = collect(MessageStream::new("c1", opener.clone(), 1, None).unwrap()).await;
        assert_eq!(events.len(), 1);
        assert_eq!(opener.calls(), 1);
    }

    #[tokio::test]
    async fn error_event_with_overload_phrase() {
        let opener = ScriptedOpener::new(vec![(
            200,
            body("{\"type\":\"error\",\"message\":\"Model is overloaded\"}\n"),
        )]);
        let err = MessageStream::new("c1", opener, 5, None)
            .unwrap()
            .wait_until_done()
            .await
            .unwrap_err();
        assert!(err.is_model_overloaded());
    }

    #[test]
    fn zero_retry_count_is_rejected() {
        let opener = ScriptedOpener::new(Vec::new());
        let err = MessageStream::new("c1", opener, 0, None).unwrap_err();
        assert!(err.is_validation());
    }
}
