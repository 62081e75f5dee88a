//! Configuration for the assistant shell.
//!
//! The shell is configured by a YAML file and command-line flags; flags win.
//!
//! ```yaml
//! apps:
//!   - name: notepad
//!     path: /usr/bin/gedit
//! sites:
//!   - name: github
//!     url: https://github.com
//! chat:
//!   cookie_path: cookies.json
//!   model: "0"
//!   system_prompt: You are Jarvis, a helpful assistant.
//! face:
//!   helper: jarvis-face-helper
//!   trainer: trainer/trainer.yml
//!   cascade: haarcascade_frontalface_default.xml
//! ```
//!
//! Relative paths in the file are resolved against the file's directory.

use arrrg_derive::CommandLine;
use serde::Deserialize;
use utf8path::Path;

use crate::chat::{ChatConfig, ChatSection};
use crate::error::{Error, Result};
use crate::face::FaceAuthConfig;

/// An application the assistant can launch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppEntry {
    pub name: String,
    pub path: String,
}

/// A website the assistant can open by name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiteEntry {
    pub name: String,
    pub url: String,
}

/// The assistant's configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssistantConfig {
    pub apps: Vec<AppEntry>,
    pub sites: Vec<SiteEntry>,
    pub chat: ChatSection,
    pub face: FaceAuthConfig,
}

impl AssistantConfig {
    /// Parse a configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, resolving relative paths against its directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_str())
            .map_err(|e| Error::io(format!("failed to read {}: {e}", path.as_str()), e))?;
        let mut config = Self::from_yaml(&content)?;
        let base = std::path::Path::new(path.as_str())
            .parent()
            .and_then(|parent| parent.to_str())
            .filter(|parent| !parent.is_empty())
            .unwrap_or(".");
        let base = Path::from(base);
        if let Some(cookie_path) = &config.chat.cookie_path {
            config.chat.cookie_path = Some(resolve(&base, cookie_path));
        }
        config.face.trainer = resolve(&base, &config.face.trainer);
        config.face.cascade = resolve(&base, &config.face.cascade);
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(app) = self.apps.iter().find(|app| app.name.trim().is_empty()) {
            return Err(Error::config(format!("app with path {} has no name", app.path)));
        }
        if let Some(site) = self.sites.iter().find(|site| site.name.trim().is_empty()) {
            return Err(Error::config(format!("site with url {} has no name", site.url)));
        }
        if let Some(site) = self.sites.iter().find(|site| url::Url::parse(&site.url).is_err()) {
            return Err(Error::config(format!(
                "site {} has an invalid url: {}",
                site.name, site.url
            )));
        }
        Ok(())
    }

    /// Find a registered application by name, ignoring case.
    pub fn app(&self, name: &str) -> Option<&AppEntry> {
        self.apps
            .iter()
            .find(|app| app.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Find a registered website by name, ignoring case.
    pub fn site(&self, name: &str) -> Option<&SiteEntry> {
        self.sites
            .iter()
            .find(|site| site.name.eq_ignore_ascii_case(name.trim()))
    }
}

fn resolve(base: &Path, path: &str) -> String {
    let candidate = Path::from(path);
    if candidate.is_abs() {
        path.to_string()
    } else {
        base.join(candidate).into_owned().as_str().to_string()
    }
}

/// Command-line arguments for the jarvis shell.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct JarvisArgs {
    #[arrrg(optional, "Assistant configuration file (YAML)", "FILE")]
    pub config: Option<String>,

    #[arrrg(optional, "Cookies exported from a logged-in browser (JSON)", "FILE")]
    pub cookie_path: Option<String>,

    #[arrrg(optional, "Model to use, by index or name (default: 0)", "MODEL")]
    pub model: Option<String>,

    #[arrrg(optional, "System prompt for new conversations", "PROMPT")]
    pub system: Option<String>,

    #[arrrg(optional, "Attempts per reply (default: 5)", "N")]
    pub retries: Option<u32>,

    #[arrrg(optional, "Chat service base URL", "URL")]
    pub base_url: Option<String>,

    #[arrrg(flag, "Search the web before answering")]
    pub web_search: bool,

    #[arrrg(flag, "Skip face authentication")]
    pub skip_face_auth: bool,

    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

impl JarvisArgs {
    /// Load the configuration file, if any, and apply the flags on top.
    pub fn load_config(&self) -> Result<AssistantConfig> {
        let mut config = match &self.config {
            Some(path) => AssistantConfig::from_file(&Path::from(path.as_str()))?,
            None => AssistantConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    /// Overlay the flags onto a configuration.
    pub fn apply(&self, config: &mut AssistantConfig) {
        let chat = &mut config.chat;
        if let Some(cookie_path) = &self.cookie_path {
            chat.cookie_path = Some(cookie_path.clone());
        }
        if let Some(model) = &self.model {
            chat.model = Some(model.clone());
        }
        if let Some(system) = &self.system {
            chat.system_prompt = Some(system.clone());
        }
        if let Some(retries) = self.retries {
            chat.retry_count = Some(retries);
        }
        if let Some(base_url) = &self.base_url {
            chat.base_url = Some(base_url.clone());
        }
        if self.web_search {
            chat.web_search = Some(true);
        }
    }

    /// The chat configuration after flags are applied.
    pub fn chat_config(&self, config: &AssistantConfig) -> ChatConfig {
        let chat = ChatConfig::from(&config.chat);
        if self.no_color { chat.without_color() } else { chat }
    }
}

/// Command-line arguments for the standalone face-authentication tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct FaceAuthArgs {
    #[arrrg(optional, "Assistant configuration file (YAML)", "FILE")]
    pub config: Option<String>,

    #[arrrg(optional, "Camera pipeline program", "PROGRAM")]
    pub helper: Option<String>,

    #[arrrg(optional, "Camera index (default: 1)", "INDEX")]
    pub camera: Option<u32>,
}

impl FaceAuthArgs {
    /// The face configuration after flags are applied.
    pub fn face_config(&self) -> Result<FaceAuthConfig> {
        let mut face = match &self.config {
            Some(path) => AssistantConfig::from_file(&Path::from(path.as_str()))?.face,
            None => FaceAuthConfig::default(),
        };
        if let Some(helper) = &self.helper {
            face.helper = helper.clone();
        }
        if let Some(camera) = self.camera {
            face.camera_index = camera;
        }
        Ok(face)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModelSelector;

    const SAMPLE: &str = r#"
apps:
  - name: Notepad
    path: /usr/bin/gedit
sites:
  - name: github
    url: https://github.com
chat:
  cookie_path: cookies.json
  model: "1"
  retry_count: 3
face:
  trainer: trainer/trainer.yml
  cascade: /opt/cascades/frontalface.xml
  threshold: 50
"#;

    #[test]
    fn parse_sample() {
        let config = AssistantConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.app("notepad").unwrap().path, "/usr/bin/gedit");
        assert_eq!(config.site("GitHub").unwrap().url, "https://github.com");
        assert!(config.app("github").is_none());
        assert_eq!(config.face.threshold, 50.0);
        assert_eq!(config.face.camera_index, 1);
    }

    #[test]
    fn from_file_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jarvis.yaml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = AssistantConfig::from_file(&Path::from(path.to_str().unwrap())).unwrap();
        let base = dir.path().to_str().unwrap();
        assert_eq!(
            config.chat.cookie_path.as_deref(),
            Some(format!("{base}/cookies.json").as_str())
        );
        assert_eq!(config.face.trainer, format!("{base}/trainer/trainer.yml"));
        assert_eq!(config.face.cascade, "/opt/cascades/frontalface.xml");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = AssistantConfig::from_yaml("contacts: []\n").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn invalid_site_url_is_rejected() {
        let err = AssistantConfig::from_yaml("sites:\n  - name: x\n    url: not a url\n").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn flags_override_file() {
        let mut config = AssistantConfig::from_yaml(SAMPLE).unwrap();
        let args = JarvisArgs {
            model: Some("mistral".to_string()),
            retries: Some(2),
            web_search: true,
            no_color: true,
            ..JarvisArgs::default()
        };
        args.apply(&mut config);
        let chat = args.chat_config(&config);
        assert_eq!(chat.model, ModelSelector::Name("mistral".to_string()));
        assert_eq!(chat.retry_count, 2);
        assert!(chat.web_search);
        assert!(!chat.use_color);
    }

    #[test]
    fn face_args_override() {
        let args = FaceAuthArgs {
            helper: Some("/usr/local/bin/face".to_string()),
            camera: Some(0),
            ..FaceAuthArgs::default()
        };
        let face = args.face_config().unwrap();
        assert_eq!(face.helper, "/usr/local/bin/face");
        assert_eq!(face.camera_index, 0);
    }
}
