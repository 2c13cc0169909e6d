//! Blocking subprocess execution with an optional timeout.
//!
//! Stdout and stderr are drained on dedicated threads (no pipe-buffer
//! deadlocks). A waiter thread plus `mpsc::recv_timeout` implements the
//! timeout without busy-waiting. Each child leads its own process group and
//! on expiry the whole group is killed.

use std::io::Read;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Combined output is capped to this many bytes, keeping the tail.
pub const MAX_OUTPUT: usize = 10 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exit {
    Code(Option<i32>),
    TimedOut(Duration),
    SpawnFailed(String),
}

#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub exit: Exit,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit == Exit::Code(Some(0))
    }

    /// Stdout and stderr joined, trimmed and capped to [`MAX_OUTPUT`].
    pub fn combined(&self) -> String {
        let output = if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        };
        cap_tail(output.trim(), MAX_OUTPUT).to_string()
    }

    /// One-line description of how the process ended.
    pub fn describe_exit(&self) -> String {
        match &self.exit {
            Exit::Code(Some(0)) => "exited successfully".to_string(),
            Exit::Code(Some(code)) => format!("exited with code {code}"),
            Exit::Code(None) => "terminated by signal".to_string(),
            Exit::TimedOut(d) => format!("timed out after {}s", d.as_secs_f32()),
            Exit::SpawnFailed(e) => format!("failed to spawn: {e}"),
        }
    }
}

fn cap_tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

/// Run `sh -c <command>` in `cwd`.
pub fn run_shell(command: &str, cwd: &Path, timeout: Option<Duration>) -> ProcessOutput {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command).current_dir(cwd);
    run(cmd, timeout)
}

/// Run a prepared command to completion. `None` timeout waits indefinitely.
pub fn run(mut cmd: Command, timeout: Option<Duration>) -> ProcessOutput {
    let start = Instant::now();
    let elapsed = |start: Instant| start.elapsed().as_millis() as u64;

    // Own process group, so a timeout can kill everything the command forked.
    cmd.process_group(0);
    let mut child = match cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(c) => c,
        Err(e) => {
            return ProcessOutput {
                exit: Exit::SpawnFailed(e.to_string()),
                stdout: String::new(),
                stderr: String::new(),
                duration_ms: elapsed(start),
            }
        }
    };

    let child_pid = child.id();
    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || drain(stdout_handle));
    let stderr_thread = std::thread::spawn(move || drain(stderr_handle));

    let wait_result = match timeout {
        None => child.wait(),
        Some(timeout_dur) => {
            let (tx, rx) = std::sync::mpsc::channel();
            std::thread::spawn(move || {
                let _ = tx.send(child.wait());
            });

            match rx.recv_timeout(timeout_dur) {
                Ok(result) => result,
                Err(_) => {
                    // Reader threads see EOF once the killed child's pipes close.
                    kill_process_group(child_pid);
                    tracing::warn!(pid = child_pid, ?timeout_dur, "subprocess timed out");
                    return ProcessOutput {
                        exit: Exit::TimedOut(timeout_dur),
                        stdout: String::new(),
                        stderr: String::new(),
                        duration_ms: elapsed(start),
                    };
                }
            }
        }
    };

    let stdout = stdout_thread.join().unwrap_or_default();
    let stderr = stderr_thread.join().unwrap_or_default();

    let exit = match wait_result {
        Ok(status) => Exit::Code(status.code()),
        Err(e) => Exit::SpawnFailed(format!("wait failed: {e}")),
    };

    ProcessOutput {
        exit,
        stdout,
        stderr,
        duration_ms: elapsed(start),
    }
}

/// Read a pipe to EOF. Invalid UTF-8 is replaced rather than discarding the
/// whole stream.
fn drain<R: Read>(handle: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut r) = handle {
        let _ = r.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// SIGKILL the process group led by `pid`. Best-effort.
fn kill_process_group(pid: u32) {
    let _ = Command::new("kill")
        .arg("-9")
        .arg("--")
        .arg(format!("-{pid}"))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

/// Quote `s` for inclusion in a `sh -c` command line.
pub fn shell_quote(s: &str) -> String {
    if !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@".contains(c))
    {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', r"'\''"))
}
