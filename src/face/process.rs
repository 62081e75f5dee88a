use std::process::Stdio;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};

use super::{FaceAuthConfig, FrameSource, Observation};
use crate::error::{Error, Result};

/// One line written by the helper.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HelperLine {
    Error { error: String },
    Frame(Observation),
}

/// Frames produced by the camera helper process.
///
/// The helper writes one JSON object per processed frame on stdout:
/// `{"faces": [{"x", "y", "w", "h", "label", "distance"}], "key": 27}` or
/// `{"error": "..."}`. The process is killed when the source is dropped.
pub struct HelperSource {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
}

impl HelperSource {
    /// Start the helper with the camera and detector settings from `config`.
    pub fn spawn(config: &FaceAuthConfig) -> Result<Self> {
        let mut child = Command::new(&config.helper)
            .args(helper_args(config))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::io(format!("failed to start {}: {e}", config.helper), e))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::face_auth("helper has no stdout"))?;
        tracing::debug!(helper = %config.helper, pid = child.id(), "face helper started");
        Ok(Self {
            child,
            lines: BufReader::new(stdout).lines(),
        })
    }
}

/// Command-line arguments passed to the helper.
pub(crate) fn helper_args(config: &FaceAuthConfig) -> Vec<String> {
    let (min_w, min_h) = config.min_face_size();
    vec![
        "--trainer".to_string(),
        config.trainer.clone(),
        "--cascade".to_string(),
        config.cascade.clone(),
        "--camera".to_string(),
        config.camera_index.to_string(),
        "--width".to_string(),
        config.frame_width.to_string(),
        "--height".to_string(),
        config.frame_height.to_string(),
        "--min-face".to_string(),
        format!("{min_w}x{min_h}"),
        "--scale-factor".to_string(),
        config.scale_factor.to_string(),
        "--min-neighbors".to_string(),
        config.min_neighbors.to_string(),
    ]
}

/// Decode one helper line; blank lines yield `None`.
pub(crate) fn parse_helper_line(line: &str) -> Result<Option<Observation>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    match serde_json::from_str::<HelperLine>(line) {
        Ok(HelperLine::Frame(observation)) => Ok(Some(observation)),
        Ok(HelperLine::Error { error }) => Err(Error::face_auth(error)),
        Err(e) => Err(Error::face_auth(format!("bad helper output {line:?}: {e}"))),
    }
}

#[async_trait::async_trait]
impl FrameSource for HelperSource {
    async fn next_frame(&mut self) -> Result<Option<Observation>> {
        while let Some(line) = self.lines.next_line().await? {
            if let Some(observation) = parse_helper_line(&line)? {
                return Ok(Some(observation));
            }
        }
        let status = self.child.wait().await?;
        tracing::debug!(%status, "face helper exited");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_frames_and_errors() {
        let frame = parse_helper_line(
            r#"{"faces": [{"x": 1, "y": 2, "w": 3, "h": 4, "label": 1, "distance": 42.5}], "key": null}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(frame.faces.len(), 1);
        assert_eq!(frame.faces[0].confidence(), 57.5);
        assert_eq!(frame.key, None);

        let escape = parse_helper_line(r#"{"faces": [], "key": 27}"#).unwrap().unwrap();
        assert_eq!(escape.key, Some(27));

        let err = parse_helper_line(r#"{"error": "camera 1 not found"}"#).unwrap_err();
        assert_eq!(err.to_string(), "Face authentication error: camera 1 not found");

        let unmatched = parse_helper_line(
            r#"{"faces": [{"x": 1, "y": 2, "w": 3, "h": 4, "label": -1, "distance": 30.0}], "key": null}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(unmatched.faces[0].label, -1);

        assert!(parse_helper_line("   ").unwrap().is_none());
        assert!(parse_helper_line("garbage").is_err());
    }

    #[test]
    fn args_carry_detector_settings() {
        let args = helper_args(&FaceAuthConfig::default());
        let joined = args.join(" ");
        assert!(joined.contains("--camera 1"));
        assert!(joined.contains("--min-face 64x48"));
        assert!(joined.contains("--scale-factor 1.1"));
        assert!(joined.contains("--min-neighbors 4"));
    }

    #[tokio::test]
    async fn missing_helper_is_an_error() {
        let config = FaceAuthConfig {
            helper: "/nonexistent/jarvis-face-helper".to_string(),
            ..FaceAuthConfig::default()
        };
        assert!(HelperSource::spawn(&config).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn reads_frames_from_a_script() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("helper.sh");
        std::fs::write(
            &script,
            "#!/bin/sh\necho '{\"faces\": [], \"key\": null}'\necho ''\necho '{\"faces\": [{\"x\":0,\"y\":0,\"w\":9,\"h\":9,\"label\":1,\"distance\":20}], \"key\": null}'\n",
        )
        .unwrap();
        let config = FaceAuthConfig {
            helper: "/bin/sh".to_string(),
            ..FaceAuthConfig::default()
        };
        let mut child = Command::new(&config.helper)
            .arg(&script)
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        let stdout = child.stdout.take().unwrap();
        let mut source = HelperSource {
            child,
            lines: BufReader::new(stdout).lines(),
        };
        let outcome = super::super::authenticate(&mut source, &config).await;
        assert!(outcome.is_verified());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unmatched_faces_keep_the_loop_running() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("helper.sh");
        std::fs::write(
            &script,
            "#!/bin/sh\necho '{\"faces\": [{\"x\":0,\"y\":0,\"w\":9,\"h\":9,\"label\":-1,\"distance\":80}], \"key\": null}'\necho '{\"faces\": [], \"key\": 27}'\n",
        )
        .unwrap();
        let mut child = Command::new("/bin/sh")
            .arg(&script)
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        let stdout = child.stdout.take().unwrap();
        let mut source = HelperSource {
            child,
            lines: BufReader::new(stdout).lines(),
        };
        let outcome = super::super::authenticate(&mut source, &FaceAuthConfig::default()).await;
        assert_eq!(outcome, super::super::AuthOutcome::Cancelled);
    }
}
