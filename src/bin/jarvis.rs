//! Face-gated personal assistant shell.
//!
//! The shell verifies the user's face, then reads requests line by line:
//! launching registered apps, opening sites and searches, or asking the
//! HuggingChat model.
//!
//! # Usage
//!
//! ```bash
//! # Use a configuration file
//! jarvis --config ~/.config/jarvis/jarvis.yaml
//!
//! # Skip the camera and pick a model by name
//! jarvis --cookie-path cookies.json --skip-face-auth --model mistralai/Mistral-7B-Instruct-v0.2
//!
//! # Disable colors (useful for piping output)
//! jarvis --no-color
//! ```
//!
//! While chatting, type `/help` for the slash commands. Ctrl+C interrupts a
//! streamed reply; Ctrl+D exits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;
use utf8path::Path;

use jarvis::assistant::{
    AUTH_FAILURE, AUTH_SUCCESS, Assistant, Flow, GREETING, JarvisArgs, SystemLauncher, WELCOME,
};
use jarvis::chat::ChatBot;
use jarvis::face::{self, AuthOutcome, FaceAuthConfig};
use jarvis::{ClientOptions, Cookies, HuggingChat, PlainTextRenderer, Renderer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = JarvisArgs::from_command_line_relaxed("jarvis [OPTIONS]");
    let config = args.load_config()?;
    let chat_config = args.chat_config(&config);

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    let mut renderer =
        PlainTextRenderer::with_color_and_interrupt(chat_config.use_color, interrupted.clone());
    let mut rl = DefaultEditor::new()?;

    if !args.skip_face_auth && !verify_face(&config.face, &mut renderer, &mut rl).await {
        return Ok(());
    }

    let cookie_path = config.chat.cookie_path.as_deref().map(Path::from);
    let cookies = Cookies::resolve(None, cookie_path.as_ref())?;
    let mut options = ClientOptions::default();
    if let Some(base_url) = &config.chat.base_url {
        options = options.with_base_url(base_url.clone());
    }
    let client = HuggingChat::connect(cookies, options).await?;
    let bot = ChatBot::new(client, chat_config).await?;
    let mut assistant = Assistant::new(bot, SystemLauncher::new(), config);

    renderer.print_announcement(WELCOME);
    renderer.print_info(&format!(
        "Model: {}. Type /help for commands, /quit to exit.",
        assistant.bot().active_llm()
    ));

    loop {
        interrupted.store(false, Ordering::Relaxed);

        match rl.readline("You: ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);
                if assistant.handle(line, &mut renderer).await == Flow::Quit {
                    println!("Goodbye!");
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        }
    }

    Ok(())
}

/// Run face authentication until it succeeds or the user gives up.
async fn verify_face(
    config: &FaceAuthConfig,
    renderer: &mut PlainTextRenderer,
    rl: &mut DefaultEditor,
) -> bool {
    loop {
        renderer.print_announcement(GREETING);
        match face::authenticate_with_helper(config).await {
            AuthOutcome::Verified { name, confidence } => {
                tracing::debug!(%name, confidence, "verified");
                renderer.print_announcement(AUTH_SUCCESS);
                return true;
            }
            AuthOutcome::Cancelled => {}
            AuthOutcome::Unavailable { reason } => renderer.print_error(&reason),
        }
        renderer.print_announcement(AUTH_FAILURE);
        match rl.readline("Try again? [Y/n] ") {
            Ok(answer) if matches!(answer.trim().to_lowercase().as_str(), "" | "y" | "yes") => {}
            _ => return false,
        }
    }
}
