//! Cookie bootstrap for an authenticated chat session.
//!
//! A session is authenticated by exactly one of two sources: an in-memory
//! mapping of cookie names to values, or a JSON file exported from a browser
//! that holds a list of cookie objects (each with `name` and `value`).

use std::collections::BTreeMap;
use std::collections::HashMap;

use serde::Deserialize;
use utf8path::Path;

use crate::error::{Error, Result};

/// Hint appended to cookie file errors.
const COOKIE_HELP: &str = "The file must be in JSON format and must contain a list of cookies";

/// An owned set of cookies used to authenticate a chat session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookies {
    values: BTreeMap<String, String>,
}

/// One cookie as exported by browser extensions.  Other keys are ignored.
#[derive(Debug, Deserialize)]
struct CookieObject {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CookieFile {
    List(Vec<CookieObject>),
    Map(BTreeMap<String, String>),
}

impl Cookies {
    /// Resolve the cookies for a session from exactly one source.
    ///
    /// # Errors
    ///
    /// Returns an initialization error if neither or both sources are
    /// supplied, if the file does not exist, or if it cannot be decoded.
    pub fn resolve(
        mapping: Option<HashMap<String, String>>,
        cookie_path: Option<&Path>,
    ) -> Result<Self> {
        match (mapping, cookie_path) {
            (None, None) => Err(Error::init(
                "Authentication is required, but no cookies were provided",
            )),
            (Some(_), Some(_)) => Err(Error::init("Both cookies and cookie_path provided")),
            (Some(mapping), None) => Ok(Self::from_iter(mapping)),
            (None, Some(path)) => Self::from_file(path),
        }
    }

    /// Load cookies from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !std::path::Path::new(path.as_str()).is_file() {
            return Err(Error::init(format!(
                "Cookie file {} not found. {COOKIE_HELP}",
                path.as_str()
            )));
        }
        let content = std::fs::read_to_string(path.as_str())
            .map_err(|err| Error::init(format!("could not read {}: {err}", path.as_str())))?;
        Self::from_json(&content)
    }

    /// Parse cookies from the JSON text of a cookie file.
    pub fn from_json(content: &str) -> Result<Self> {
        let file: CookieFile = serde_json::from_str(content)
            .map_err(|err| Error::init(format!("invalid cookie file: {err}. {COOKIE_HELP}")))?;
        let values = match file {
            CookieFile::List(list) => list.into_iter().map(|c| (c.name, c.value)).collect(),
            CookieFile::Map(map) => map,
        };
        Ok(Self { values })
    }

    /// Look up a cookie by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Insert or replace a cookie.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Number of cookies.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no cookies are present.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse the value of a `Cookie` request header.
    pub fn from_header(header: &str) -> Self {
        let values = header
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                Some((name.trim().to_string(), value.trim().to_string()))
            })
            .collect();
        Self { values }
    }

    /// Render as `Set-Cookie`-style strings suitable for seeding a cookie jar.
    pub(crate) fn set_cookie_lines(&self) -> Vec<String> {
        self.values
            .iter()
            .map(|(name, value)| format!("{name}={value}; Path=/"))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Cookies {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> HashMap<String, String> {
        HashMap::from([("hf-chat".to_string(), "abc123".to_string())])
    }

    #[test]
    fn neither_source_fails() {
        let err = Cookies::resolve(None, None).unwrap_err();
        assert!(err.is_init());
    }

    #[test]
    fn both_sources_fail() {
        let path = Path::from("cookies.json");
        let err = Cookies::resolve(Some(mapping()), Some(&path)).unwrap_err();
        assert!(err.is_init());
        assert!(err.to_string().contains("Both cookies and cookie_path"));
    }

    #[test]
    fn mapping_is_used_verbatim() {
        let cookies = Cookies::resolve(Some(mapping()), None).unwrap();
        assert_eq!(cookies.get("hf-chat"), Some("abc123"));
        assert_eq!(cookies.len(), 1);
    }

    #[test]
    fn missing_file_fails() {
        let path = Path::from("/definitely/not/here/cookies.json");
        let err = Cookies::resolve(None, Some(&path)).unwrap_err();
        assert!(err.is_init());
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn list_of_cookie_objects() {
        let cookies = Cookies::from_json(
            r#"[
                {"domain": ".huggingface.co", "name": "token", "value": "t0k"},
                {"domain": "huggingface.co", "name": "hf-chat", "value": "c1d", "secure": true}
            ]"#,
        )
        .unwrap();
        assert_eq!(cookies.get("token"), Some("t0k"));
        assert_eq!(cookies.get("hf-chat"), Some("c1d"));
    }

    #[test]
    fn plain_mapping_file() {
        let cookies = Cookies::from_json(r#"{"token": "t0k"}"#).unwrap();
        assert_eq!(cookies.get("token"), Some("t0k"));
    }

    #[test]
    fn garbage_file_is_init_error() {
        let err = Cookies::from_json("[1, 2, 3]").unwrap_err();
        assert!(err.is_init());
    }

    #[test]
    fn header_round_trip() {
        let cookies = Cookies::from_header("token=t0k; hf-chat=c1d");
        assert_eq!(cookies.get("token"), Some("t0k"));
        assert_eq!(cookies.get("hf-chat"), Some("c1d"));
        assert_eq!(
            cookies.set_cookie_lines(),
            vec!["hf-chat=c1d; Path=/".to_string(), "token=t0k; Path=/".to_string()]
        );
    }
}
