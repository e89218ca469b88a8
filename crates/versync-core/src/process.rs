//! Single subprocess primitive for probes and installers.
//!
//! Runs a command with captured output and an optional wall-clock timeout.
//! Reader threads drain stdout/stderr (avoiding pipe-buffer deadlocks) and a
//! waiter thread with `mpsc::recv_timeout` provides timeout support without
//! busy-waiting; on timeout the child is killed by PID.

use std::process::{Command, Stdio};
use std::time::Duration;

/// Combined result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    /// stdout and stderr concatenated, trimmed, capped to the last 10KB.
    pub output: String,
}

/// Why a command produced no output.
#[derive(Debug)]
pub enum RunError {
    /// The program is not on the execution path.
    NotFound,
    TimedOut(Duration),
    Failed(String),
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::NotFound => write!(f, "not found in PATH"),
            RunError::TimedOut(d) => write!(f, "timed out after {}s", d.as_secs()),
            RunError::Failed(e) => write!(f, "{e}"),
        }
    }
}

pub fn run_with_timeout(
    program: &str,
    args: &[&str],
    timeout: Option<Duration>,
) -> Result<CommandOutput, RunError> {
    let mut child = match Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(RunError::NotFound),
        Err(e) => return Err(RunError::Failed(format!("failed to spawn: {e}"))),
    };

    let child_pid = child.id();

    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || -> String {
        let mut buf = String::new();
        if let Some(mut r) = stdout_handle {
            use std::io::Read;
            let _ = r.read_to_string(&mut buf);
        }
        buf
    });
    let stderr_thread = std::thread::spawn(move || -> String {
        let mut buf = String::new();
        if let Some(mut r) = stderr_handle {
            use std::io::Read;
            let _ = r.read_to_string(&mut buf);
        }
        buf
    });

    let wait_result = match timeout {
        None => child.wait(),
        Some(timeout_dur) => {
            // The child is moved to a waiter thread; on timeout we kill by
            // PID and the waiter unblocks once the killed process exits.
            let (tx, rx) = std::sync::mpsc::channel();
            std::thread::spawn(move || {
                let _ = tx.send(child.wait());
            });

            match rx.recv_timeout(timeout_dur) {
                Ok(result) => result,
                Err(_) => {
                    kill_process(child_pid);
                    return Err(RunError::TimedOut(timeout_dur));
                }
            }
        }
    };

    let stdout_buf = stdout_thread.join().unwrap_or_default();
    let stderr_buf = stderr_thread.join().unwrap_or_default();

    let status = match wait_result {
        Ok(s) => s,
        Err(e) => return Err(RunError::Failed(format!("wait failed: {e}"))),
    };

    Ok(CommandOutput {
        success: status.success(),
        output: combine_output(&stdout_buf, &stderr_buf),
    })
}

/// Concatenate stdout/stderr and cap to 10KB, keeping the tail.
fn combine_output(stdout: &str, stderr: &str) -> String {
    let output = if stderr.is_empty() {
        stdout.to_string()
    } else if stdout.is_empty() {
        stderr.to_string()
    } else {
        format!("{stdout}\n{stderr}")
    };
    const MAX_OUTPUT: usize = 10 * 1024;
    let trimmed = output.trim();
    if trimmed.len() > MAX_OUTPUT {
        // The cut may land mid-character; move forward to the next boundary.
        let mut cut = trimmed.len() - MAX_OUTPUT;
        while !trimmed.is_char_boundary(cut) {
            cut += 1;
        }
        trimmed[cut..].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Terminate a process by PID using SIGKILL. Best-effort; errors are silently ignored.
fn kill_process(pid: u32) {
    let _ = Command::new("kill")
        .arg("-9")
        .arg(pid.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout() {
        let out = run_with_timeout("echo", &["hello"], None).unwrap();
        assert!(out.success);
        assert_eq!(out.output, "hello");
    }

    #[test]
    fn captures_stderr_and_exit_status() {
        let out =
            run_with_timeout("sh", &["-c", "echo oops >&2; exit 3"], None).unwrap();
        assert!(!out.success);
        assert_eq!(out.output, "oops");
    }

    #[test]
    fn combines_both_streams() {
        let out = run_with_timeout("sh", &["-c", "echo one; echo two >&2"], None).unwrap();
        assert!(out.output.contains("one"));
        assert!(out.output.contains("two"));
    }

    #[test]
    fn missing_program_is_not_found() {
        let err = run_with_timeout("definitely-not-a-real-binary-xyz", &[], None).unwrap_err();
        assert!(matches!(err, RunError::NotFound));
    }

    #[test]
    fn tail_cap_keeps_last_10kb() {
        let long = "x".repeat(20 * 1024);
        let capped = combine_output(&long, "");
        assert_eq!(capped.len(), 10 * 1024);
    }

    #[test]
    fn tail_cap_respects_char_boundaries() {
        // 4000 three-byte chars: the 10KB cut lands inside a character.
        let long = "€".repeat(4000);
        let capped = combine_output(&long, "");
        assert!(capped.len() <= 10 * 1024);
        assert!(capped.chars().all(|c| c == '€'));
    }

    #[test]
    fn timeout_kills_the_child() {
        let err = run_with_timeout(
            "sleep",
            &["60"],
            Some(Duration::from_millis(150)),
        )
        .unwrap_err();
        assert!(matches!(err, RunError::TimedOut(_)));
    }
}
