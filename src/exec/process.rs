/// Bounded child-process execution
///
/// Each stage runs as the leader of its own process group so that a
/// timeout can take down everything it spawned. Output is drained on
/// reader threads while the parent polls for exit, so a chatty child can
/// never block on a full pipe. Readers forward chunks as they arrive, so a
/// stream held open by a process outside the group still yields what was
/// written before the drain deadline.
use crate::config::types::{CodeboxError, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, TryRecvError};
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const READ_CHUNK: usize = 8 * 1024;

/// One fully expanded command ready to launch
#[derive(Debug, Clone)]
pub struct StageCommand {
    /// Resolved executable
    pub program: PathBuf,
    pub args: Vec<String>,
    pub workdir: PathBuf,
    /// Bytes fed to standard input; `None` gives the child a null stdin
    pub stdin: Option<String>,
    /// `PATH` handed to the child
    pub search_path: OsString,
    pub timeout: Duration,
    pub kill_grace: Duration,
    pub drain_timeout: Duration,
}

/// Signals delivered to a stage's process group
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillReport {
    pub term_sent: bool,
    pub kill_sent: bool,
    pub waited_ms: u64,
    /// Signal delivery failures
    pub notes: Vec<String>,
}

/// What a stage launch produced
#[derive(Debug)]
pub enum SpawnOutcome {
    /// The executable could not be launched at all
    NotLaunched(io::Error),
    Finished(ProcessOutput),
}

#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    /// Both output streams reached EOF before the drain deadline
    pub output_complete: bool,
    pub kill_report: Option<KillReport>,
    pub elapsed: Duration,
}

/// Launch a command and wait for it within its bound.
pub fn run_stage(cmd: &StageCommand) -> Result<SpawnOutcome> {
    let started = Instant::now();

    let mut command = Command::new(&cmd.program);
    command
        .args(&cmd.args)
        .current_dir(&cmd.workdir)
        .env("PATH", &cmd.search_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if cmd.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .process_group(0);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied) => {
            log::debug!("Failed to launch {}: {}", cmd.program.display(), e);
            return Ok(SpawnOutcome::NotLaunched(e));
        }
        Err(e) => {
            return Err(CodeboxError::Process(format!(
                "spawn {}: {}",
                cmd.program.display(),
                e
            )))
        }
    };

    let group = Pid::from_raw(child.id() as i32);
    log::debug!("Spawned {} as group {}", cmd.program.display(), group);

    feed_stdin(&mut child, cmd.stdin.clone());
    let stdout_rx = spawn_reader(child.stdout.take());
    let stderr_rx = spawn_reader(child.stderr.take());

    let (status, timed_out, kill_report) = wait_bounded(&mut child, group, cmd)?;

    // Leftover descendants would keep the pipes open and outlive the stage.
    match killpg(group, Signal::SIGKILL) {
        Ok(()) => log::debug!("Killed stray processes in group {}", group),
        Err(Errno::ESRCH) => {}
        Err(e) => log::warn!("Failed to sweep process group {}: {}", group, e),
    }

    let drain_deadline = Instant::now() + cmd.drain_timeout;
    let (stdout, stdout_eof) = collect(&stdout_rx, drain_deadline);
    let (stderr, stderr_eof) = collect(&stderr_rx, drain_deadline);
    let output_complete = stdout_eof && stderr_eof;
    if !output_complete {
        log::warn!(
            "Output of group {} still open after {:?}; keeping {} stdout and {} stderr bytes",
            group,
            cmd.drain_timeout,
            stdout.len(),
            stderr.len()
        );
    }

    Ok(SpawnOutcome::Finished(ProcessOutput {
        exit_code: status.code(),
        signal: status.signal(),
        stdout,
        stderr,
        timed_out,
        output_complete,
        kill_report,
        elapsed: started.elapsed(),
    }))
}

fn wait_bounded(
    child: &mut Child,
    group: Pid,
    cmd: &StageCommand,
) -> Result<(std::process::ExitStatus, bool, Option<KillReport>)> {
    let started = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok((status, false, None)),
            Ok(None) => {
                let elapsed = started.elapsed();
                if elapsed >= cmd.timeout {
                    log::info!(
                        "Group {} exceeded {:?}, terminating",
                        group,
                        cmd.timeout
                    );
                    let report = terminate_group(group, cmd.kill_grace);
                    if report.notes.is_empty() {
                        log::debug!(
                            "Group {} torn down in {}ms (term={}, kill={})",
                            group,
                            report.waited_ms,
                            report.term_sent,
                            report.kill_sent
                        );
                    } else {
                        log::warn!(
                            "Group {} teardown incomplete: {}",
                            group,
                            report.notes.join("; ")
                        );
                    }
                    let status = child
                        .wait()
                        .map_err(|e| CodeboxError::Process(format!("wait after kill: {}", e)))?;
                    return Ok((status, true, Some(report)));
                }
                thread::sleep(POLL_INTERVAL.min(cmd.timeout - elapsed));
            }
            Err(e) => return Err(CodeboxError::Process(format!("wait: {}", e))),
        }
    }
}

/// SIGTERM the whole group, give it `grace` to exit, then SIGKILL.
fn terminate_group(group: Pid, grace: Duration) -> KillReport {
    let mut report = KillReport::default();
    let start = Instant::now();

    match killpg(group, Signal::SIGTERM) {
        Ok(()) => report.term_sent = true,
        Err(e) => report.notes.push(format!("group SIGTERM failed: {}", e)),
    }

    thread::sleep(grace);

    match killpg(group, Signal::SIGKILL) {
        Ok(()) => report.kill_sent = true,
        // Already gone after SIGTERM.
        Err(Errno::ESRCH) => {}
        Err(e) => report.notes.push(format!("group SIGKILL failed: {}", e)),
    }

    report.waited_ms = start.elapsed().as_millis() as u64;
    report
}

fn feed_stdin(child: &mut Child, data: Option<String>) {
    let (Some(data), Some(mut stdin)) = (data, child.stdin.take()) else {
        return;
    };
    // Written off-thread: a child that never reads must not stall the wait loop.
    thread::spawn(move || {
        if let Err(e) = stdin.write_all(data.as_bytes()) {
            if e.kind() != io::ErrorKind::BrokenPipe {
                log::debug!("stdin write failed: {}", e);
            }
        }
    });
}

fn spawn_reader<R>(stream: Option<R>) -> Receiver<Vec<u8>>
where
    R: Read + Send + 'static,
{
    // Unbounded: the parent only drains after the child exits.
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        let Some(mut stream) = stream else {
            return;
        };
        let mut buf = [0u8; READ_CHUNK];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::debug!("output read failed: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

/// Everything received before `deadline`, and whether the stream hit EOF.
fn collect(rx: &Receiver<Vec<u8>>, deadline: Instant) -> (String, bool) {
    let mut bytes = Vec::new();
    let eof = loop {
        let now = Instant::now();
        if now >= deadline {
            // A writer outside the group may never stop; take what is queued.
            let queued = rx.len();
            bytes.extend(rx.try_iter().take(queued).flatten());
            break match rx.try_recv() {
                Ok(chunk) => {
                    bytes.extend_from_slice(&chunk);
                    false
                }
                Err(TryRecvError::Disconnected) => true,
                Err(TryRecvError::Empty) => false,
            };
        }
        match rx.recv_timeout(deadline - now) {
            Ok(chunk) => bytes.extend_from_slice(&chunk),
            Err(RecvTimeoutError::Disconnected) => break true,
            Err(RecvTimeoutError::Timeout) => {}
        }
    };
    (String::from_utf8_lossy(&bytes).into_owned(), eof)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str, stdin: Option<&str>, timeout: Duration) -> StageCommand {
        let dir = std::env::temp_dir();
        StageCommand {
            program: PathBuf::from("/bin/sh"),
            args: vec!["-c".to_string(), script.to_string()],
            workdir: dir,
            stdin: stdin.map(str::to_string),
            search_path: std::env::var_os("PATH").unwrap_or_default(),
            timeout,
            kill_grace: Duration::from_millis(100),
            drain_timeout: Duration::from_secs(2),
        }
    }

    fn finished(outcome: SpawnOutcome) -> ProcessOutput {
        match outcome {
            SpawnOutcome::Finished(output) => output,
            SpawnOutcome::NotLaunched(e) => panic!("not launched: {}", e),
        }
    }

    #[test]
    fn captures_both_streams_and_exit_code() {
        let cmd = sh("echo out; echo err >&2; exit 3", None, Duration::from_secs(5));
        let output = finished(run_stage(&cmd).unwrap());
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.signal, None);
        assert!(!output.timed_out);
        assert!(output.output_complete);
    }

    #[test]
    fn stdin_is_delivered_then_closed() {
        let cmd = sh("cat", Some("line one\nline two\n"), Duration::from_secs(5));
        let output = finished(run_stage(&cmd).unwrap());
        assert_eq!(output.stdout, "line one\nline two\n");
        assert_eq!(output.exit_code, Some(0));
    }

    #[test]
    fn absent_stdin_reads_eof() {
        let cmd = sh("cat; echo done", None, Duration::from_secs(5));
        let output = finished(run_stage(&cmd).unwrap());
        assert_eq!(output.stdout, "done\n");
    }

    #[test]
    fn large_output_does_not_deadlock() {
        let cmd = sh(
            "i=0; while [ $i -lt 20000 ]; do echo 0123456789abcdef; i=$((i+1)); done",
            None,
            Duration::from_secs(20),
        );
        let output = finished(run_stage(&cmd).unwrap());
        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.stdout.len(), 20000 * 17);
    }

    #[test]
    fn timeout_kills_the_group() {
        let cmd = sh("sleep 30", None, Duration::from_millis(300));
        let started = Instant::now();
        let output = finished(run_stage(&cmd).unwrap());
        assert!(output.timed_out);
        assert!(started.elapsed() < Duration::from_secs(10));
        let report = output.kill_report.unwrap();
        assert!(report.term_sent);
        assert!(report.notes.is_empty());
    }

    #[test]
    fn ignored_sigterm_escalates_to_sigkill() {
        let mut cmd = sh("trap '' TERM; sleep 30", None, Duration::from_millis(300));
        cmd.kill_grace = Duration::from_millis(200);
        let started = Instant::now();
        let output = finished(run_stage(&cmd).unwrap());
        assert!(output.timed_out);
        assert_eq!(output.signal, Some(9));
        assert!(started.elapsed() < Duration::from_secs(10));

        let report = output.kill_report.unwrap();
        assert!(report.term_sent);
        assert!(report.kill_sent);
        assert!(report.waited_ms >= 200);
        assert!(report.notes.is_empty());
    }

    #[test]
    fn escaped_writer_keeps_output_written_so_far() {
        if crate::judge::Toolchain::from_host().resolve("setsid").is_none() {
            return;
        }
        let mut cmd = sh("echo kept; setsid sleep 5 &", None, Duration::from_secs(5));
        cmd.drain_timeout = Duration::from_millis(300);
        let started = Instant::now();
        let output = finished(run_stage(&cmd).unwrap());
        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.stdout, "kept\n");
        assert!(!output.output_complete);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn timeout_preserves_partial_output() {
        let cmd = sh("echo started; sleep 30", None, Duration::from_millis(500));
        let output = finished(run_stage(&cmd).unwrap());
        assert!(output.timed_out);
        assert_eq!(output.stdout, "started\n");
    }

    #[test]
    fn signal_death_is_reported() {
        let cmd = sh("kill -SEGV $$", None, Duration::from_secs(5));
        let output = finished(run_stage(&cmd).unwrap());
        assert_eq!(output.exit_code, None);
        assert_eq!(output.signal, Some(11));
    }

    #[test]
    fn background_children_do_not_hold_the_stage_open() {
        let cmd = sh("sleep 30 & echo parent-done", None, Duration::from_secs(10));
        let started = Instant::now();
        let output = finished(run_stage(&cmd).unwrap());
        assert_eq!(output.stdout, "parent-done\n");
        assert!(!output.timed_out);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn missing_program_is_not_launched() {
        let mut cmd = sh("true", None, Duration::from_secs(5));
        cmd.program = PathBuf::from("/nonexistent/bin/tool");
        match run_stage(&cmd).unwrap() {
            SpawnOutcome::NotLaunched(e) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            SpawnOutcome::Finished(_) => panic!("expected launch failure"),
        }
    }
}
