// proxymirror-core/src/external/mocks.rs

// --- Scripted encoder for tests ---
//
// MockFfmpegSpawner records every invocation and answers with a scripted
// outcome chosen by substring match on the arguments. Unmatched invocations
// succeed and write the output file, so tests only script the interesting jobs.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};

use super::ffmpeg_executor::{FfmpegProcess, FfmpegSpawner};
use crate::error::{CoreError, CoreResult};

/// Builds an exit status carrying `code`.
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

/// Builds an exit status carrying `code`.
#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(code as u32)
}

/// Process returned by [`MockFfmpegSpawner`].
#[derive(Debug, Clone)]
pub struct MockFfmpegProcess {
    /// Lines reported as encoder log output.
    pub stderr_lines: Vec<String>,
    pub exit_status: ExitStatus,
}

impl FfmpegProcess for MockFfmpegProcess {
    fn handle_events<F>(&mut self, mut handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>,
    {
        for line in &self.stderr_lines {
            handler(FfmpegEvent::Log(LogLevel::Error, line.clone()))?;
        }
        Ok(())
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        Ok(self.exit_status)
    }
}

#[derive(Debug, Clone)]
enum MockOutcome {
    Exit { code: i32, stderr: Vec<String> },
    SpawnError(String),
}

#[derive(Debug, Clone)]
struct MockExpectation {
    arg_pattern: String,
    outcome: MockOutcome,
}

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl MockCall {
    /// Value following `flag`, if present.
    pub fn value_after(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    /// Every `-map` selector in order.
    pub fn map_selectors(&self) -> Vec<&str> {
        self.args
            .windows(2)
            .filter(|pair| pair[0] == "-map")
            .map(|pair| pair[1].as_str())
            .collect()
    }

    /// The file the encoder was asked to write.
    pub fn output(&self) -> Option<PathBuf> {
        self.args.last().map(PathBuf::from)
    }
}

/// Thread-safe scripted spawner.
#[derive(Debug, Clone, Default)]
pub struct MockFfmpegSpawner {
    expectations: Arc<Mutex<Vec<MockExpectation>>>,
    received_calls: Arc<Mutex<Vec<MockCall>>>,
    raise_on_spawn: Arc<Mutex<Option<Arc<AtomicBool>>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockFfmpegSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invocations whose arguments contain `arg_pattern` exit with `code`
    /// after reporting `stderr`. A non-zero code leaves no output behind.
    pub fn add_exit_expectation(&self, arg_pattern: &str, code: i32, stderr: &[&str]) {
        lock(&self.expectations).push(MockExpectation {
            arg_pattern: arg_pattern.to_string(),
            outcome: MockOutcome::Exit {
                code,
                stderr: stderr.iter().map(|s| (*s).to_string()).collect(),
            },
        });
    }

    /// Invocations whose arguments contain `arg_pattern` fail to start.
    pub fn add_spawn_error_expectation(&self, arg_pattern: &str, message: &str) {
        lock(&self.expectations).push(MockExpectation {
            arg_pattern: arg_pattern.to_string(),
            outcome: MockOutcome::SpawnError(message.to_string()),
        });
    }

    /// Sets `flag` as soon as any invocation starts, the way a Ctrl-C
    /// arriving during the first encode would.
    pub fn raise_flag_on_spawn(&self, flag: Arc<AtomicBool>) {
        *lock(&self.raise_on_spawn) = Some(flag);
    }

    pub fn received_calls(&self) -> Vec<MockCall> {
        lock(&self.received_calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.received_calls).len()
    }

    fn outcome_for(&self, args: &[String]) -> MockOutcome {
        lock(&self.expectations)
            .iter()
            .find(|exp| args.iter().any(|arg| arg.contains(&exp.arg_pattern)))
            .map(|exp| exp.outcome.clone())
            .unwrap_or(MockOutcome::Exit {
                code: 0,
                stderr: Vec::new(),
            })
    }
}

impl FfmpegSpawner for MockFfmpegSpawner {
    type Process = MockFfmpegProcess;

    fn spawn(&self, program: &Path, args: &[OsString]) -> CoreResult<Self::Process> {
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        lock(&self.received_calls).push(MockCall {
            program: program.to_path_buf(),
            args: args.clone(),
        });
        if let Some(flag) = lock(&self.raise_on_spawn).as_ref() {
            flag.store(true, Ordering::SeqCst);
        }

        match self.outcome_for(&args) {
            MockOutcome::SpawnError(message) => {
                log::warn!("MockFfmpegSpawner simulating spawn error: {message}");
                Err(CoreError::CommandStart(
                    program.display().to_string(),
                    std::io::Error::new(std::io::ErrorKind::NotFound, message),
                ))
            }
            MockOutcome::Exit { code, stderr } => {
                if code == 0 {
                    if let Some(output) = args.last() {
                        if let Err(e) = fs::write(output, b"proxy") {
                            log::error!("MockFfmpegSpawner failed to write {output}: {e}");
                        }
                    }
                }
                Ok(MockFfmpegProcess {
                    stderr_lines: stderr,
                    exit_status: exit_status(code),
                })
            }
        }
    }
}
