use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("jarvis.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("jarvis.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("jarvis.client.request_duration_seconds");

pub(crate) static CONVERSATIONS_CREATED: Counter = Counter::new("jarvis.conversation.created");
pub(crate) static CONVERSATION_CREATE_RETRIES: Counter =
    Counter::new("jarvis.conversation.create_retries");
pub(crate) static CONVERSATIONS_DELETED: Counter = Counter::new("jarvis.conversation.deleted");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("jarvis.stream.events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("jarvis.stream.errors");
pub(crate) static STREAM_RETRIES: Counter = Counter::new("jarvis.stream.retries");
pub(crate) static STREAM_BYTES: Counter = Counter::new("jarvis.stream.bytes");
pub(crate) static STREAM_TTFB: Moments = Moments::new("jarvis.stream.ttfb_seconds");

pub(crate) static FACE_AUTH_ATTEMPTS: Counter = Counter::new("jarvis.face.attempts");
pub(crate) static FACE_AUTH_VERIFIED: Counter = Counter::new("jarvis.face.verified");
pub(crate) static FACE_AUTH_UNAVAILABLE: Counter = Counter::new("jarvis.face.unavailable");
pub(crate) static FACE_FRAMES: Counter = Counter::new("jarvis.face.frames");

pub(crate) static COMMANDS_LAUNCHED: Counter = Counter::new("jarvis.assistant.launched");
pub(crate) static COMMANDS_CHAT: Counter = Counter::new("jarvis.assistant.chat_queries");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&CONVERSATIONS_CREATED);
    collector.register_counter(&CONVERSATION_CREATE_RETRIES);
    collector.register_counter(&CONVERSATIONS_DELETED);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_RETRIES);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_TTFB);

    collector.register_counter(&FACE_AUTH_ATTEMPTS);
    collector.register_counter(&FACE_AUTH_VERIFIED);
    collector.register_counter(&FACE_AUTH_UNAVAILABLE);
    collector.register_counter(&FACE_FRAMES);

    collector.register_counter(&COMMANDS_LAUNCHED);
    collector.register_counter(&COMMANDS_CHAT);
}
