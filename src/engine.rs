//! Process adapter for the external HTML renderer.
//!
//! `wkhtmltopdf` reads the source document from standard input and writes the
//! PDF to standard output when both positional arguments are `-`; the whole
//! exchange happens over pipes, no temporary files. Each call spawns exactly
//! one child process and owns its buffers, so concurrent renders never share
//! state.

use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Engine binary used when the configuration names none.
pub const DEFAULT_EXECUTABLE: &str = "wkhtmltopdf";

/// Positional argument meaning "standard input" for the source and "standard
/// output" for the destination.
pub const PLACEHOLDER_ARG: &str = "-";

#[derive(Debug, Error)]
pub enum EngineError {
    /// The deadline elapsed (or the caller dropped the call) before the
    /// engine exited. The child has been killed; no bytes are returned.
    #[error("html rendering cancelled before the engine finished")]
    Cancelled,
    #[error("failed to spawn render engine: {0}")]
    Spawn(io::Error),
    #[error("render engine i/o failed: {0}")]
    Io(io::Error),
    /// Non-zero exit with output on stderr; the engine's own message is more
    /// actionable than the exit code, so it becomes the error text.
    #[error("{stderr}")]
    Engine { stderr: String },
    /// Non-zero exit with nothing useful on stderr.
    #[error("render engine exited with code {exit_code:?}")]
    Exit { exit_code: Option<i32> },
}

/// Handle to the external renderer. Cheap to clone; holds only process-wide
/// configuration, which is read-only after startup.
#[derive(Debug, Clone)]
pub struct HtmlEngine {
    binary: PathBuf,
    timeout: Option<Duration>,
}

impl HtmlEngine {
    pub fn new(binary: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    /// Convert an HTML document into PDF bytes.
    ///
    /// The child is spawned with `kill_on_drop`, so every exit path — the
    /// configured deadline, the caller dropping the future, a panic while
    /// awaiting — kills and reaps the process.
    ///
    /// Exit code zero returns exactly the captured stdout, even when it is
    /// empty: whether an empty PDF is an error is the caller's call.
    pub async fn render(&self, html: &str) -> Result<Vec<u8>, EngineError> {
        let mut child = Command::new(&self.binary)
            .arg(PLACEHOLDER_ARG)
            .arg(PLACEHOLDER_ARG)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(EngineError::Spawn)?;

        // Feed the document from its own task so an engine that emits output
        // before draining its input cannot deadlock the pipes.
        let Some(mut stdin) = child.stdin.take() else {
            return Err(EngineError::Io(io::Error::other("stdin not captured")));
        };
        let document = html.as_bytes().to_vec();
        let writer = tokio::spawn(async move {
            // stdin drops at the end of the task, closing the pipe.
            stdin.write_all(&document).await
        });

        let wait = child.wait_with_output();
        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(result) => result.map_err(EngineError::Io)?,
                Err(_) => return Err(EngineError::Cancelled),
            },
            None => wait.await.map_err(EngineError::Io)?,
        };

        // A failed write just means the engine stopped reading early; the
        // exit status decides the outcome.
        if let Ok(Err(err)) = writer.await {
            log::debug!("engine stdin write ended early: {err}");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let trimmed = stderr.trim();
            if !trimmed.is_empty() {
                return Err(EngineError::Engine {
                    stderr: trimmed.to_string(),
                });
            }
            return Err(EngineError::Exit {
                exit_code: output.status.code(),
            });
        }

        Ok(output.stdout)
    }
}

impl Default for HtmlEngine {
    fn default() -> Self {
        Self::new(DEFAULT_EXECUTABLE, None)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-engine");
        fs::write(&path, format!("#!/bin/sh\n{body}")).expect("write script");
        let mut perms = fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("set perms");
        path
    }

    #[tokio::test]
    async fn returns_stdout_bytes_on_success() {
        let dir = TempDir::new().expect("temp dir");
        // Drain stdin, then emit a fixed "document".
        let script = write_script(dir.path(), "cat > /dev/null\nprintf '%%PDF-fake'");
        let engine = HtmlEngine::new(script, None);

        let bytes = engine.render("<p>hola</p>").await.expect("render");
        assert_eq!(bytes, b"%PDF-fake");
    }

    #[tokio::test]
    async fn input_reaches_the_engine_stdin() {
        let dir = TempDir::new().expect("temp dir");
        let script = write_script(dir.path(), "cat");
        let engine = HtmlEngine::new(script, None);

        let bytes = engine.render("<h1>Hola mundo</h1>").await.expect("render");
        assert_eq!(bytes, b"<h1>Hola mundo</h1>");
    }

    #[tokio::test]
    async fn empty_output_with_zero_exit_is_success() {
        let dir = TempDir::new().expect("temp dir");
        let script = write_script(dir.path(), "cat > /dev/null");
        let engine = HtmlEngine::new(script, None);

        let bytes = engine.render("<p>x</p>").await.expect("render");
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn stderr_text_becomes_the_error_message() {
        let dir = TempDir::new().expect("temp dir");
        let script = write_script(dir.path(), "echo 'boom: bad markup' >&2\nexit 42");
        let engine = HtmlEngine::new(script, None);

        let err = engine.render("<p>x</p>").await.expect_err("must fail");
        match err {
            EngineError::Engine { stderr } => assert!(stderr.contains("boom"), "got: {stderr}"),
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn blank_stderr_falls_back_to_the_exit_code() {
        let dir = TempDir::new().expect("temp dir");
        let script = write_script(dir.path(), "printf '  \\n' >&2\nexit 3");
        let engine = HtmlEngine::new(script, None);

        let err = engine.render("<p>x</p>").await.expect_err("must fail");
        match err {
            EngineError::Exit { exit_code } => assert_eq!(exit_code, Some(3)),
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn deadline_yields_cancelled_not_a_process_error() {
        let dir = TempDir::new().expect("temp dir");
        // Produce partial output, then stall well past the deadline.
        let script = write_script(dir.path(), "printf 'partial'\nsleep 5");
        let engine = HtmlEngine::new(script, Some(Duration::from_millis(100)));

        let err = engine.render("<p>x</p>").await.expect_err("must cancel");
        assert!(matches!(err, EngineError::Cancelled));
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let engine = HtmlEngine::new("/nonexistent/certidian-engine", None);
        let err = engine.render("<p>x</p>").await.expect_err("must fail");
        assert!(matches!(err, EngineError::Spawn(_)));
    }
}
