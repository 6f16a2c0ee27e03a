//! Sandboxed execution of docstring examples.
//!
//! Every snippet runs in its own `python -I` process inside a throwaway
//! working directory with a scrubbed environment. The process is killed when
//! the timeout elapses. Failures are reported as data, never as errors.

use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::RunnerConfig;
use crate::types::{CodeExample, ExampleTestResult};

const HARNESS: &str = include_str!("harness.py");

/// Variables passed through to the example process; everything else is dropped.
const PASSTHROUGH_ENV: &[&str] = &["PATH", "SYSTEMROOT", "LANG", "LC_ALL"];

const TRUNCATION_MARKER: &str = "... [truncated]";

/// The module a docstring example belongs to. Its source is copied into the
/// sandbox and its public names are in scope when the example runs.
#[derive(Debug, Clone)]
pub struct ModuleContext {
    pub name: String,
    pub source: String,
}

impl ModuleContext {
    /// `None` when `name` cannot be imported as a Python module.
    pub fn new(name: &str, source: &str) -> Option<Self> {
        let mut chars = name.chars();
        let valid = chars
            .next()
            .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
            && chars.all(|c| c == '_' || c.is_ascii_alphanumeric());
        valid.then(|| Self {
            name: name.to_string(),
            source: source.to_string(),
        })
    }
}

pub struct ExampleRunner {
    config: RunnerConfig,
}

impl ExampleRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run an extracted example. Non-Python examples are not executed.
    pub async fn run_example(
        &self,
        example: &CodeExample,
        context: Option<&ModuleContext>,
    ) -> Option<ExampleTestResult> {
        if !example.is_python() {
            debug!(language = ?example.language, "skipping non-python example");
            return None;
        }
        Some(self.run_in(&example.code, context).await)
    }

    pub async fn run(&self, snippet: &str) -> ExampleTestResult {
        self.run_in(snippet, None).await
    }

    pub async fn run_in(&self, snippet: &str, context: Option<&ModuleContext>) -> ExampleTestResult {
        let started = Instant::now();
        let timeout = self.config.timeout();

        let workdir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                return ExampleTestResult::failed(
                    snippet,
                    format!("failed to create sandbox directory: {}", e),
                    started.elapsed(),
                )
            }
        };

        if let Some(context) = context {
            let module_file = workdir.path().join(format!("{}.py", context.name));
            if let Err(e) = std::fs::write(&module_file, &context.source) {
                return ExampleTestResult::failed(
                    snippet,
                    format!("failed to stage module {}: {}", context.name, e),
                    started.elapsed(),
                );
            }
        }

        let mut command = Command::new(&self.config.python);
        command
            .arg("-I")
            .arg("-c")
            .arg(HARNESS)
            .arg(self.config.memory_limit_mb.unwrap_or(0).to_string())
            .args(context.map(|c| c.name.as_str()))
            .current_dir(workdir.path())
            .env_clear()
            .env("PYTHONIOENCODING", "utf-8")
            .env("PYTHONDONTWRITEBYTECODE", "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for key in PASSTHROUGH_ENV {
            if let Some(value) = std::env::var_os(key) {
                command.env(key, value);
            }
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(python = %self.config.python, error = %e, "cannot start example interpreter");
                return ExampleTestResult::failed(
                    snippet,
                    format!("failed to start {}: {}", self.config.python, e),
                    started.elapsed(),
                );
            }
        };

        let input = snippet.to_string();
        let execution = async move {
            if let Some(mut stdin) = child.stdin.take() {
                // A child that exits early closes the pipe; its exit status tells the story.
                let _ = stdin.write_all(input.as_bytes()).await;
            }
            child.wait_with_output().await
        };

        // Dropping `execution` on timeout drops the child, which kills it.
        let outcome = tokio::time::timeout(timeout, execution).await;
        let elapsed = started.elapsed();

        let result = match outcome {
            Err(_) => ExampleTestResult::failed(
                snippet,
                format!("Timed out after {}s", timeout.as_secs()),
                elapsed,
            ),
            Ok(Err(e)) => ExampleTestResult::failed(
                snippet,
                format!("failed to collect example output: {}", e),
                elapsed,
            ),
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                if output.status.success() {
                    ExampleTestResult::passed(snippet, self.clip(stdout.trim_end()), elapsed)
                } else {
                    let message = if stderr.trim().is_empty() {
                        format!("process exited with {}", output.status)
                    } else {
                        stderr.trim_end().to_string()
                    };
                    ExampleTestResult::failed(snippet, self.clip(&message), elapsed)
                }
            }
        };

        debug!(
            status = %result.status,
            elapsed_ms = elapsed.as_millis() as u64,
            "example finished"
        );
        result
    }

    fn clip(&self, text: &str) -> String {
        let max = self.config.max_output_bytes;
        if text.len() <= max {
            return text.to_string();
        }
        let mut cut = max;
        while cut > 0 && !text.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}{}", &text[..cut], TRUNCATION_MARKER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExampleOrigin, ExampleStatus};
    use std::time::Duration;

    fn python_available() -> bool {
        std::process::Command::new("python3")
            .arg("--version")
            .output()
            .is_ok_and(|o| o.status.success())
    }

    fn runner() -> ExampleRunner {
        ExampleRunner::new(RunnerConfig {
            timeout_secs: 2,
            ..RunnerConfig::default()
        })
    }

    #[tokio::test]
    async fn test_assignment_passes() {
        if !python_available() {
            return;
        }
        let result = runner().run("x = 2 + 2").await;
        assert_eq!(result.status, ExampleStatus::Passed, "{}", result.output);
        assert_eq!(result.output, "");
        assert_eq!(result.snippet, "x = 2 + 2");
    }

    #[tokio::test]
    async fn test_stdout_is_captured() {
        if !python_available() {
            return;
        }
        let result = runner().run("for i in range(3):\n    print(i)").await;
        assert!(result.is_passed());
        assert_eq!(result.output, "0\n1\n2");
    }

    #[tokio::test]
    async fn test_division_by_zero_fails() {
        if !python_available() {
            return;
        }
        let result = runner().run("return 1/0").await;
        assert_eq!(result.status, ExampleStatus::Failed);
        assert!(
            result.output.contains("ZeroDivisionError: division by zero"),
            "{}",
            result.output
        );
    }

    #[tokio::test]
    async fn test_top_level_return_value_is_printed() {
        if !python_available() {
            return;
        }
        let result = runner().run("x = 40\nreturn x + 2").await;
        assert!(result.is_passed(), "{}", result.output);
        assert_eq!(result.output, "42");
    }

    #[tokio::test]
    async fn test_system_exit_is_reported() {
        if !python_available() {
            return;
        }
        let result = runner().run("import sys\nsys.exit(2)").await;
        assert_eq!(result.status, ExampleStatus::Failed);
        assert_eq!(result.output, "SystemExit: 2");

        let result = runner().run("raise SystemExit('bad input')").await;
        assert_eq!(result.output, "SystemExit: bad input");

        let result = runner().run("import sys\nprint('done')\nsys.exit(0)").await;
        assert!(result.is_passed(), "{}", result.output);
        assert_eq!(result.output, "done");
    }

    #[tokio::test]
    async fn test_syntax_error_fails() {
        if !python_available() {
            return;
        }
        let result = runner().run("def broken(:").await;
        assert_eq!(result.status, ExampleStatus::Failed);
        assert!(result.output.contains("SyntaxError"), "{}", result.output);
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        if !python_available() {
            return;
        }
        let runner = ExampleRunner::new(RunnerConfig {
            timeout_secs: 1,
            ..RunnerConfig::default()
        });
        let started = Instant::now();
        let result = runner.run("import time\ntime.sleep(30)").await;
        assert_eq!(result.status, ExampleStatus::Failed);
        assert_eq!(result.output, "Timed out after 1s");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_environment_is_scrubbed() {
        if !python_available() {
            return;
        }
        let result = runner()
            .run("import os\nprint(os.environ.get('HOME'))\nprint(os.listdir('.'))")
            .await;
        assert!(result.is_passed(), "{}", result.output);
        assert_eq!(result.output, "None\n[]");
    }

    #[tokio::test]
    async fn test_snippets_do_not_share_state() {
        if !python_available() {
            return;
        }
        let runner = runner();
        assert!(runner.run("shared = 1").await.is_passed());
        let second = runner.run("print(shared)").await;
        assert_eq!(second.status, ExampleStatus::Failed);
        assert!(second.output.contains("NameError"));
    }

    #[tokio::test]
    async fn test_output_is_clipped() {
        if !python_available() {
            return;
        }
        let runner = ExampleRunner::new(RunnerConfig {
            max_output_bytes: 10,
            ..RunnerConfig::default()
        });
        let result = runner.run("print('a' * 100)").await;
        assert_eq!(result.output, format!("aaaaaaaaaa{}", TRUNCATION_MARKER));
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_failure() {
        let runner = ExampleRunner::new(RunnerConfig {
            python: "definitely-not-a-python-interpreter".into(),
            ..RunnerConfig::default()
        });
        let result = runner.run("x = 1").await;
        assert_eq!(result.status, ExampleStatus::Failed);
        assert!(result.output.starts_with("failed to start"));
    }

    #[tokio::test]
    async fn test_non_python_example_is_skipped() {
        let example = CodeExample::new("ls -la".into(), Some("bash".into()), ExampleOrigin::Fence);
        assert!(runner().run_example(&example, None).await.is_none());
    }

    #[test]
    fn test_module_context_requires_identifier() {
        assert!(ModuleContext::new("shapes", "").is_some());
        assert!(ModuleContext::new("_private2", "").is_some());
        assert!(ModuleContext::new("my-module", "").is_none());
        assert!(ModuleContext::new("2fast", "").is_none());
    }

    #[tokio::test]
    async fn test_module_names_are_in_scope() {
        if !python_available() {
            return;
        }
        let context = ModuleContext::new("shapes", "def double(x):\n    return x * 2\n").unwrap();
        let result = runner()
            .run_in("print(double(21))\nprint(shapes.double(1))", Some(&context))
            .await;
        assert!(result.is_passed(), "{}", result.output);
        assert_eq!(result.output, "42\n2");
    }
}
