//! Secondary out-of-process runner.
//!
//! Some sequences fail in-process for reasons specific to the hosting
//! runtime. [`ProcessRunner`] hands their code to an external test command
//! and reads back a JUnit-style verdict from its output.

use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::config::ExternalRunnerConfig;

#[derive(Debug, thiserror::Error)]
pub enum ExternalError {
    #[error("No external command configured")]
    NotConfigured,

    #[error("Failed to launch '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("I/O error talking to the external runner: {0}")]
    Io(#[from] std::io::Error),

    #[error("External run exceeded {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("Unrecognized runner output: {excerpt}")]
    UnrecognizedOutput { excerpt: String },
}

/// Counts reported by the external runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalVerdict {
    pub tests_run: usize,
    pub failures: usize,
}

impl ExternalVerdict {
    pub fn passed(&self) -> bool {
        self.tests_run > 0 && self.failures == 0
    }
}

/// Read a verdict from runner output. Recognizes `OK (N tests)` and
/// `Tests run: N, Failures: M` (with an optional `Errors: E`, counted as
/// failures). The last matching line wins.
pub fn parse_verdict(output: &str) -> Option<ExternalVerdict> {
    output.lines().rev().find_map(|line| {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("OK (") {
            let n = rest.split_whitespace().next()?.parse().ok()?;
            return Some(ExternalVerdict {
                tests_run: n,
                failures: 0,
            });
        }
        if line.starts_with("Tests run:") {
            let mut run = None;
            let mut failures = 0;
            for part in line.split(',') {
                let (key, value) = part.split_once(':')?;
                let value: usize = value.trim().parse().ok()?;
                match key.trim() {
                    "Tests run" => run = Some(value),
                    "Failures" | "Errors" => failures += value,
                    _ => {}
                }
            }
            return Some(ExternalVerdict {
                tests_run: run?,
                failures,
            });
        }
        None
    })
}

pub struct ProcessRunner {
    config: ExternalRunnerConfig,
}

impl ProcessRunner {
    pub fn new(config: ExternalRunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExternalRunnerConfig {
        &self.config
    }

    /// Run `code` through the external command and parse its verdict.
    pub async fn run(&self, code: &str) -> Result<ExternalVerdict, ExternalError> {
        if self.config.command.is_empty() {
            return Err(ExternalError::NotConfigured);
        }
        debug!(command = %self.config.command, bytes = code.len(), "launching external runner");

        let mut child = Command::new(&self.config.command)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExternalError::Spawn {
                command: self.config.command.clone(),
                source,
            })?;

        let stdin = child.stdin.take();
        let exchange = async {
            let feed = async {
                // Input the runner leaves unread is not an error.
                if let Some(mut stdin) = stdin {
                    match stdin.write_all(code.as_bytes()).await {
                        Err(e) if e.kind() != ErrorKind::BrokenPipe => return Err(e),
                        _ => {}
                    }
                }
                Ok::<(), std::io::Error>(())
            };
            let (fed, output) = tokio::join!(feed, child.wait_with_output());
            fed?;
            output
        };

        let budget = Duration::from_millis(self.config.timeout_ms);
        let output = match tokio::time::timeout(budget, exchange).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ExternalError::Timeout {
                    timeout_ms: self.config.timeout_ms,
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(status = %output.status, stdout = %stdout, stderr = %stderr, "external runner finished");

        parse_verdict(&stdout).ok_or_else(|| ExternalError::UnrecognizedOutput {
            excerpt: stdout.lines().last().unwrap_or_default().to_string(),
        })
    }
}
