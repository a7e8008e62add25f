//! Bounded invocation of external utilities.
//!
//! The live-hardware path shells out to bus utilities that can hang on a
//! wedged bus; every invocation is bounded by a timeout and a timeout is
//! a soft failure for the caller to downgrade, never a crash.

use std::io::Read;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("`{command}` not found on PATH")]
    Missing { command: String },
    #[error("`{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },
    #[error("failed to run `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
}

/// Run a utility, killing it if it exceeds `timeout`.
///
/// Output is read after exit; the utilities invoked here print at most a
/// few hundred bytes, well under the pipe buffer.
pub fn run_with_timeout(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<CommandOutput, ProcessError> {
    let command = program.to_string();

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProcessError::Missing {
                    command: command.clone(),
                }
            } else {
                ProcessError::Io {
                    command: command.clone(),
                    source: e,
                }
            }
        })?;

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if started.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ProcessError::Timeout { command, timeout });
                }
                std::thread::sleep(Duration::from_millis(25));
            }
            Err(e) => {
                return Err(ProcessError::Io {
                    command,
                    source: e,
                });
            }
        }
    };

    let mut stdout = String::new();
    if let Some(mut pipe) = child.stdout.take() {
        let _ = pipe.read_to_string(&mut stdout);
    }

    Ok(CommandOutput {
        success: status.success(),
        stdout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout_of_a_quick_command() {
        let out = run_with_timeout("echo", &["38"], Duration::from_secs(5)).unwrap();

        assert!(out.success);
        assert_eq!(out.stdout.trim(), "38");
    }

    #[test]
    fn missing_program_is_a_distinct_error() {
        let err = run_with_timeout("definitely-not-a-real-utility", &[], Duration::from_secs(1))
            .unwrap_err();

        assert!(matches!(err, ProcessError::Missing { .. }));
    }

    #[test]
    fn slow_command_times_out() {
        let err =
            run_with_timeout("sleep", &["5"], Duration::from_millis(100)).unwrap_err();

        assert!(matches!(err, ProcessError::Timeout { .. }));
    }

    #[test]
    fn nonzero_exit_is_reported_not_raised() {
        let out = run_with_timeout("false", &[], Duration::from_secs(5)).unwrap();
        assert!(!out.success);
    }
}
