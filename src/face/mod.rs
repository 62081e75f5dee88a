//! Face authentication.
//!
//! The camera pipeline (cascade detection and LBPH recognition) runs in a
//! helper process; this module owns the decision. A frame is a list of
//! recognized faces, each with the label the recognizer predicted and the
//! distance of that prediction. Confidence is `100 - distance`, and a face at
//! or above the threshold verifies the user.

mod process;

pub use process::HelperSource;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::observability::{FACE_AUTH_ATTEMPTS, FACE_AUTH_UNAVAILABLE, FACE_AUTH_VERIFIED, FACE_FRAMES};

/// Default minimum confidence for a match.
pub const DEFAULT_THRESHOLD: f64 = 45.0;

/// Key code that cancels authentication.
pub const ESCAPE_KEY: u8 = 27;

/// Label reported for faces with no configured name.
pub const UNKNOWN_NAME: &str = "unknown";

/// Configuration of the face-authentication pipeline (the `face` section of
/// the assistant's YAML configuration).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FaceAuthConfig {
    /// Program that runs the camera pipeline.
    pub helper: String,
    /// Trained LBPH model.
    pub trainer: String,
    /// Haar cascade for frontal faces.
    pub cascade: String,
    /// Minimum confidence (`100 - distance`) for a match.
    pub threshold: f64,
    /// Display names, indexed by recognizer label.
    pub names: Vec<String>,
    pub camera_index: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    /// Smallest face to detect, as a fraction of the frame size.
    pub min_face_ratio: f64,
    pub scale_factor: f64,
    pub min_neighbors: u32,
}

impl Default for FaceAuthConfig {
    fn default() -> Self {
        Self {
            helper: "jarvis-face-helper".to_string(),
            trainer: "engine/auth/trainer/trainer.yml".to_string(),
            cascade: "engine/auth/haarcascade_frontalface_default.xml".to_string(),
            threshold: DEFAULT_THRESHOLD,
            names: vec![String::new(), "susant".to_string()],
            camera_index: 1,
            frame_width: 640,
            frame_height: 480,
            min_face_ratio: 0.1,
            scale_factor: 1.1,
            min_neighbors: 4,
        }
    }
}

impl FaceAuthConfig {
    /// The display name for a recognizer label.
    ///
    /// Negative labels mean the recognizer found no match.
    pub fn name_for(&self, label: i64) -> &str {
        usize::try_from(label)
            .ok()
            .and_then(|index| self.names.get(index))
            .map(String::as_str)
            .unwrap_or(UNKNOWN_NAME)
    }

    /// Smallest face to detect, in pixels.
    pub fn min_face_size(&self) -> (u32, u32) {
        (
            (self.min_face_ratio * f64::from(self.frame_width)) as u32,
            (self.min_face_ratio * f64::from(self.frame_height)) as u32,
        )
    }

    /// Checks that the model files exist; returns the first missing path.
    pub fn missing_model_file(&self) -> Option<&str> {
        [self.trainer.as_str(), self.cascade.as_str()]
            .into_iter()
            .find(|path| !std::path::Path::new(path).is_file())
    }
}

/// One recognized face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceObservation {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    /// Label predicted by the recognizer.
    pub label: i64,
    /// Distance of the prediction; lower is better.
    pub distance: f64,
}

impl FaceObservation {
    pub fn confidence(&self) -> f64 {
        100.0 - self.distance
    }
}

/// One processed camera frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(default)]
    pub faces: Vec<FaceObservation>,
    /// Key pressed while the frame was shown, if any.
    #[serde(default)]
    pub key: Option<u8>,
}

/// The verdict on a single face.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceVerdict {
    pub name: String,
    pub confidence: f64,
    pub matched: bool,
}

/// Judge one face against the threshold.
pub fn judge_face(face: &FaceObservation, config: &FaceAuthConfig) -> FaceVerdict {
    let confidence = face.confidence();
    let matched = confidence >= config.threshold;
    let name = if matched {
        config.name_for(face.label).to_string()
    } else {
        UNKNOWN_NAME.to_string()
    };
    FaceVerdict {
        name,
        confidence,
        matched,
    }
}

/// Judge a frame: the last face in the frame decides.
pub fn judge_frame(observation: &Observation, config: &FaceAuthConfig) -> Option<FaceVerdict> {
    let mut verdict = None;
    for face in &observation.faces {
        let current = judge_face(face, config);
        tracing::debug!(
            name = %current.name,
            confidence = current.confidence,
            matched = current.matched,
            "face"
        );
        verdict = Some(current);
    }
    verdict
}

/// Produces processed camera frames.
#[async_trait::async_trait]
pub trait FrameSource: Send {
    /// The next frame, or `None` once the source has stopped.
    async fn next_frame(&mut self) -> Result<Option<Observation>>;
}

/// The result of an authentication attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    /// A known face was matched.
    Verified { name: String, confidence: f64 },
    /// The user pressed escape.
    Cancelled,
    /// The camera or model files could not be used.
    Unavailable { reason: String },
}

impl AuthOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, AuthOutcome::Verified { .. })
    }
}

/// Run frames through the matcher until a face is verified, the user presses
/// escape, or the source stops.
pub async fn authenticate(source: &mut dyn FrameSource, config: &FaceAuthConfig) -> AuthOutcome {
    FACE_AUTH_ATTEMPTS.click();
    loop {
        let observation = match source.next_frame().await {
            Ok(Some(observation)) => observation,
            Ok(None) => {
                return unavailable("camera stream ended before a face was verified".to_string());
            }
            Err(err) => return unavailable(err.to_string()),
        };
        FACE_FRAMES.click();
        if let Some(verdict) = judge_frame(&observation, config)
            && verdict.matched
        {
            FACE_AUTH_VERIFIED.click();
            tracing::info!(name = %verdict.name, confidence = verdict.confidence, "face verified");
            return AuthOutcome::Verified {
                name: verdict.name,
                confidence: verdict.confidence,
            };
        }
        if observation.key == Some(ESCAPE_KEY) {
            tracing::info!("face authentication cancelled");
            return AuthOutcome::Cancelled;
        }
    }
}

/// Authenticate with the camera helper described by `config`.
///
/// Missing model files or a helper that cannot start are reported as
/// [`AuthOutcome::Unavailable`].
pub async fn authenticate_with_helper(config: &FaceAuthConfig) -> AuthOutcome {
    if let Some(path) = config.missing_model_file() {
        FACE_AUTH_ATTEMPTS.click();
        return unavailable(format!("model file not found: {path}"));
    }
    let mut source = match HelperSource::spawn(config) {
        Ok(source) => source,
        Err(err) => {
            FACE_AUTH_ATTEMPTS.click();
            return unavailable(err.to_string());
        }
    };
    authenticate(&mut source, config).await
}

fn unavailable(reason: String) -> AuthOutcome {
    FACE_AUTH_UNAVAILABLE.click();
    tracing::warn!(reason = %reason, "face authentication unavailable");
    AuthOutcome::Unavailable { reason }
}
