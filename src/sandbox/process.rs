use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::Result;
use crate::sandbox::{clamp_timeout, ExecutionReport, ExecutionSandbox};
use crate::workflow::types::Language;

/// Best-effort sandbox that writes code to a scratch file and runs it under
/// the language's interpreter in a child process. Compiled languages are not
/// runnable here and report failure instead of erroring the stage.
pub struct ProcessSandbox;

impl ProcessSandbox {
    pub fn new() -> Self {
        Self
    }

    fn interpreter(language: Language) -> Option<&'static str> {
        match language {
            Language::Python => Some("python3"),
            Language::JavaScript => Some("node"),
            Language::TypeScript | Language::Rust => None,
        }
    }
}

impl Default for ProcessSandbox {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionSandbox for ProcessSandbox {
    async fn execute(
        &self,
        code: &str,
        language: Language,
        timeout_ms: u64,
    ) -> Result<ExecutionReport> {
        let timeout_ms = clamp_timeout(timeout_ms);

        let Some(interpreter) = Self::interpreter(language) else {
            return Ok(ExecutionReport {
                success: false,
                output: String::new(),
                errors: vec![format!("Execution is not supported for {language}")],
                execution_time_ms: 0,
            });
        };

        let dir = tempfile::tempdir()?;
        let source_path = dir.path().join(format!("main.{}", language.extension()));
        tokio::fs::write(&source_path, code).await?;

        let started = Instant::now();

        let run = tokio::process::Command::new(interpreter)
            .arg(&source_path)
            .current_dir(dir.path())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let outcome = tokio::time::timeout(Duration::from_millis(timeout_ms), run).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                let stderr = String::from_utf8_lossy(&output.stderr);

                let mut errors = Vec::new();
                if !stderr.trim().is_empty() {
                    errors.push(stderr.trim().to_string());
                }
                if !output.status.success() {
                    errors.push(format!(
                        "Process exited with status {}",
                        output.status.code().unwrap_or(-1)
                    ));
                }

                Ok(ExecutionReport {
                    success: output.status.success(),
                    output: stdout,
                    errors,
                    execution_time_ms: elapsed_ms,
                })
            }
            Ok(Err(e)) => Ok(ExecutionReport {
                success: false,
                output: String::new(),
                errors: vec![format!("Failed to launch {interpreter}: {e}")],
                execution_time_ms: elapsed_ms,
            }),
            Err(_) => Ok(ExecutionReport {
                success: false,
                output: String::new(),
                errors: vec![format!("Execution timed out after {timeout_ms}ms")],
                execution_time_ms: elapsed_ms,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unsupported_language_reports_failure_without_erroring() {
        let sandbox = ProcessSandbox::new();
        let report = sandbox
            .execute("fn main() {}", Language::Rust, 1_000)
            .await
            .unwrap();
        assert!(!report.success);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("rust"));
    }

    #[test]
    fn interpreters_cover_the_executable_subset() {
        assert_eq!(ProcessSandbox::interpreter(Language::Python), Some("python3"));
        assert_eq!(ProcessSandbox::interpreter(Language::JavaScript), Some("node"));
        assert_eq!(ProcessSandbox::interpreter(Language::TypeScript), None);
        assert_eq!(ProcessSandbox::interpreter(Language::Rust), None);
    }
}
