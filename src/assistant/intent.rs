//! Interpretation of one line of user input.

use url::Url;

use super::config::AssistantConfig;
use crate::chat::{ChatCommand, parse_command};

const YOUTUBE_SEARCH: &str = "https://www.youtube.com/results";
const WEB_SEARCH: &str = "https://www.google.com/search";

/// What the user asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Nothing to do.
    Empty,
    /// Launch a registered application.
    LaunchApp { name: String, path: String },
    /// Open a URL in the browser.
    OpenUrl { name: String, url: String },
    /// A slash command for the chat session.
    Command(ChatCommand),
    /// A question for the chat model.
    Chat(String),
}

/// Classify `input` against the registered apps and sites.
pub fn parse_intent(input: &str, config: &AssistantConfig) -> Intent {
    let input = input.trim();
    if input.is_empty() {
        return Intent::Empty;
    }
    if let Some(command) = parse_command(input) {
        return Intent::Command(command);
    }
    let lowered = input.to_lowercase();
    if let Some(name) = strip_verb(&lowered, "open") {
        if let Some(app) = config.app(name) {
            return Intent::LaunchApp {
                name: app.name.clone(),
                path: app.path.clone(),
            };
        }
        if let Some(site) = config.site(name) {
            return Intent::OpenUrl {
                name: site.name.clone(),
                url: site.url.clone(),
            };
        }
        if looks_like_domain(name) {
            return Intent::OpenUrl {
                name: name.to_string(),
                url: format!("https://{name}"),
            };
        }
    }
    if let Some(query) = strip_verb(&lowered, "play")
        .and_then(|rest| rest.strip_suffix(" on youtube"))
        .map(str::trim)
        .filter(|query| !query.is_empty())
        && let Some(url) = search_url(YOUTUBE_SEARCH, "search_query", query)
    {
        return Intent::OpenUrl {
            name: "youtube".to_string(),
            url,
        };
    }
    if let Some(query) = strip_verb(&lowered, "search")
        && let Some(url) = search_url(WEB_SEARCH, "q", query)
    {
        return Intent::OpenUrl {
            name: "search".to_string(),
            url,
        };
    }
    Intent::Chat(input.to_string())
}

fn strip_verb<'a>(input: &'a str, verb: &str) -> Option<&'a str> {
    let rest = input.strip_prefix(verb)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim();
    (!rest.is_empty()).then_some(rest)
}

fn looks_like_domain(name: &str) -> bool {
    !name.contains(char::is_whitespace)
        && name.contains('.')
        && !name.starts_with('.')
        && !name.ends_with('.')
        && Url::parse(&format!("https://{name}"))
            .ok()
            .and_then(|url| url.host_str().map(|host| host == name))
            .unwrap_or(false)
}

fn search_url(base: &str, param: &str, query: &str) -> Option<String> {
    Url::parse_with_params(base, &[(param, query)])
        .ok()
        .map(String::from)
}
