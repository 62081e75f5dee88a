use std::process::Stdio;

use tokio::process::Command;

use crate::error::{Error, Result};

/// Starts applications and opens URLs on behalf of the assistant.
#[async_trait::async_trait]
pub trait Launcher: Send + Sync {
    /// Start the application at `path` without waiting for it to exit.
    async fn launch_app(&self, path: &str) -> Result<()>;

    /// Open `url` in the user's browser.
    async fn open_url(&self, url: &str) -> Result<()>;
}

/// Launches processes on the local machine.
#[derive(Debug, Clone, Default)]
pub struct SystemLauncher;

impl SystemLauncher {
    pub fn new() -> Self {
        Self
    }

    fn spawn(mut command: Command, what: &str) -> Result<()> {
        let child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::io(format!("failed to start {what}: {e}"), e))?;
        tracing::debug!(what, pid = child.id(), "launched");
        Ok(())
    }
}

/// The platform's program for opening URLs, with its leading arguments.
pub(crate) fn url_opener() -> (&'static str, &'static [&'static str]) {
    if cfg!(target_os = "macos") {
        ("open", &[])
    } else if cfg!(target_os = "windows") {
        ("cmd", &["/C", "start", ""])
    } else {
        ("xdg-open", &[])
    }
}

#[async_trait::async_trait]
impl Launcher for SystemLauncher {
    async fn launch_app(&self, path: &str) -> Result<()> {
        Self::spawn(Command::new(path), path)
    }

    async fn open_url(&self, url: &str) -> Result<()> {
        let (program, args) = url_opener();
        let mut command = Command::new(program);
        command.args(args).arg(url);
        Self::spawn(command, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_app_is_an_io_error() {
        let err = SystemLauncher::new()
            .launch_app("/nonexistent/jarvis-test-app")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/jarvis-test-app"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn launches_without_waiting() {
        SystemLauncher::new().launch_app("/bin/true").await.unwrap();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn linux_uses_xdg_open() {
        assert_eq!(url_opener(), ("xdg-open", &[][..]));
    }
}
