//! Output rendering for the assistant shell.
//!
//! This module provides the [`Renderer`] trait and a plain-text
//! implementation used for streamed chat replies and shell messages.

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::types::WebSearchSource;

/// ANSI escape code for dim text (used for reasoning and status lines).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for italic text (used for reasoning).
const ANSI_ITALIC: &str = "\x1b[3m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for web sources).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for green text (used for assistant announcements).
const ANSI_GREEN: &str = "\x1b[32m";

/// Trait for rendering shell output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
pub trait Renderer: Send {
    /// Print a chunk of reply text, as it streams in.
    fn print_text(&mut self, text: &str);

    /// Print a chunk of model reasoning.
    fn print_reasoning(&mut self, text: &str) {
        _ = text;
    }

    /// Print a progress line such as a web search update.
    fn print_status(&mut self, status: &str) {
        _ = status;
    }

    /// Print the web pages a reply was grounded on.
    fn print_sources(&mut self, sources: &[WebSearchSource]);

    /// Print what the assistant says out loud.
    fn print_announcement(&mut self, text: &str) {
        self.print_info(text);
    }

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Called when a reply is complete.
    fn finish_response(&mut self);

    /// Called when the reply is interrupted by the user.
    fn print_interrupted(&mut self) {}

    /// Returns true if streaming should be interrupted.
    fn should_interrupt(&self) -> bool {
        false
    }
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
    use_color: bool,
    in_reasoning: bool,
    line_start: bool,
    interrupted: Option<Arc<AtomicBool>>,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            out: Box::new(io::stdout()),
            err: Box::new(io::stderr()),
            use_color,
            in_reasoning: false,
            line_start: true,
            interrupted: None,
        }
    }

    /// Sends output somewhere other than stdout.
    pub fn with_writer(mut self, out: impl Write + Send + 'static) -> Self {
        self.out = Box::new(out);
        self
    }

    /// Sends error messages somewhere other than stderr.
    pub fn with_error_writer(mut self, err: impl Write + Send + 'static) -> Self {
        self.err = Box::new(err);
        self
    }

    /// Attaches an interrupt flag to the renderer.
    pub fn with_interrupt(mut self, interrupted: Arc<AtomicBool>) -> Self {
        self.interrupted = Some(interrupted);
        self
    }

    /// Creates a new PlainTextRenderer with specified color and interrupt flag.
    pub fn with_color_and_interrupt(use_color: bool, interrupted: Arc<AtomicBool>) -> Self {
        Self::with_color(use_color).with_interrupt(interrupted)
    }

    fn write(&mut self, text: &str) {
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
        if let Some(last) = text.chars().last() {
            self.line_start = last == '\n';
        }
    }

    fn reset_reasoning(&mut self) {
        if self.in_reasoning {
            if self.use_color {
                self.write(ANSI_RESET);
            }
            self.write("\n");
            self.in_reasoning = false;
        }
    }

    fn ensure_line_start(&mut self) {
        if !self.line_start {
            self.write("\n");
        }
    }

    fn styled(&self, style: &str, text: &str) -> String {
        if self.use_color {
            format!("{style}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_text(&mut self, text: &str) {
        self.reset_reasoning();
        self.write(text);
    }

    fn print_reasoning(&mut self, text: &str) {
        if !self.in_reasoning {
            if self.use_color {
                self.write(ANSI_DIM);
                self.write(ANSI_ITALIC);
            } else {
                self.write("[reasoning] ");
            }
            self.in_reasoning = true;
        }
        self.write(text);
    }

    fn print_status(&mut self, status: &str) {
        self.reset_reasoning();
        self.ensure_line_start();
        let line = self.styled(ANSI_DIM, &format!("[{status}]"));
        self.write(&format!("{line}\n"));
    }

    fn print_sources(&mut self, sources: &[WebSearchSource]) {
        if sources.is_empty() {
            return;
        }
        self.reset_reasoning();
        self.ensure_line_start();
        self.write("Sources:\n");
        for source in sources {
            let title = if source.title.is_empty() {
                &source.hostname
            } else {
                &source.title
            };
            let link = self.styled(ANSI_CYAN, &source.link);
            self.write(&format!("  - {title} {link}\n"));
        }
    }

    fn print_announcement(&mut self, text: &str) {
        self.reset_reasoning();
        self.ensure_line_start();
        let line = self.styled(ANSI_GREEN, text);
        self.write(&format!("{line}\n"));
    }

    fn print_error(&mut self, error: &str) {
        self.reset_reasoning();
        self.ensure_line_start();
        let _ = writeln!(self.err, "Error: {error}");
        let _ = self.err.flush();
    }

    fn print_info(&mut self, info: &str) {
        self.reset_reasoning();
        self.ensure_line_start();
        self.write(&format!("{info}\n"));
    }

    fn finish_response(&mut self) {
        self.reset_reasoning();
        self.write("\n");
    }

    fn print_interrupted(&mut self) {
        self.reset_reasoning();
        self.write("\n[interrupted]\n");
    }

    fn should_interrupt(&self) -> bool {
        self.interrupted
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn errors_go_to_the_error_writer() {
        let out = SharedBuffer::default();
        let err = SharedBuffer::default();
        let mut renderer = PlainTextRenderer::with_color(false)
            .with_writer(out.clone())
            .with_error_writer(err.clone());
        renderer.print_text("partial");
        renderer.print_error("Model is overloaded");
        assert_eq!(out.contents(), "partial\n");
        assert_eq!(err.contents(), "Error: Model is overloaded\n");
    }

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
    }

    #[test]
    fn plain_output_without_color() {
        let buffer = SharedBuffer::default();
        let mut renderer = PlainTextRenderer::with_color(false).with_writer(buffer.clone());
        renderer.print_text("Hello");
        renderer.print_status("searching the web");
        renderer.print_sources(&[WebSearchSource {
            link: "https://www.rust-lang.org".to_string(),
            title: "Rust".to_string(),
            hostname: "www.rust-lang.org".to_string(),
        }]);
        renderer.finish_response();
        assert_eq!(
            buffer.contents(),
            "Hello\n[searching the web]\nSources:\n  - Rust https://www.rust-lang.org\n\n"
        );
    }

    #[test]
    fn reasoning_is_closed_before_text() {
        let buffer = SharedBuffer::default();
        let mut renderer = PlainTextRenderer::with_color(false).with_writer(buffer.clone());
        renderer.print_reasoning("thinking");
        renderer.print_text("answer");
        assert_eq!(buffer.contents(), "[reasoning] thinking\nanswer");
    }

    #[test]
    fn interrupt_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let renderer = PlainTextRenderer::with_color_and_interrupt(false, Arc::clone(&flag));
        assert!(!renderer.should_interrupt());
        flag.store(true, Ordering::Relaxed);
        assert!(renderer.should_interrupt());
    }
}
