//! Run face authentication once and report the result.
//!
//! Exits with status 0 when a known face is verified and 1 otherwise.
//!
//! ```bash
//! jarvis-face-auth --config jarvis.yaml --camera 0
//! ```

use arrrg::CommandLine;
use tracing_subscriber::EnvFilter;

use jarvis::assistant::FaceAuthArgs;
use jarvis::face::{self, AuthOutcome};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = FaceAuthArgs::from_command_line_relaxed("jarvis-face-auth [OPTIONS]");
    let config = args.face_config()?;
    let outcome = face::authenticate_with_helper(&config).await;
    match &outcome {
        AuthOutcome::Verified { name, confidence } => {
            println!("Authentication result: Success ({name}, {confidence:.0}%)");
        }
        AuthOutcome::Cancelled => println!("Authentication result: Cancelled"),
        AuthOutcome::Unavailable { reason } => {
            println!("Authentication result: Failed ({reason})");
        }
    }
    if !outcome.is_verified() {
        std::process::exit(1);
    }
    Ok(())
}
