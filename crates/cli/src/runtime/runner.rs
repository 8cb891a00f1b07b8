//! Hardened subprocess launcher.
//!
//! Spawns the target with the resolved environment, wraps both stdio pipes
//! in masking writers, and — under lockdown — applies child-side hardening
//! in `pre_exec` and supervises the child with the ptrace gate. The whole
//! run is synchronous and must stay on one thread: `wait4` on a traced
//! child has to come from the tracer thread.

use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use super::masker::{MaskerError, MaskingWriter};

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub command: String,
    pub args: Vec<String>,
    /// Exact child environment; nothing from the parent leaks in.
    pub env: Vec<(String, String)>,
    /// Secret plaintexts to mask in the child's stdout/stderr.
    pub secrets: Vec<String>,
    pub lockdown: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("start command: {0}")]
    Spawn(std::io::Error),
    #[error(transparent)]
    Masker(#[from] MaskerError),
    #[error("wait for command: {0}")]
    Wait(std::io::Error),
    #[error("trace child: {0}")]
    Trace(String),
    #[error("security violation: child attempted forbidden access to {0}")]
    SecurityViolation(String),
    #[error("lockdown is not supported on this platform")]
    LockdownUnsupported,
}

/// Launch the child and block until it exits. Returns the child's exit
/// code, with `128 + signum` for signal deaths. `child_pid` is published
/// for the signal forwarder once the child exists.
pub fn run(cfg: RunConfig, child_pid: &Arc<AtomicI32>) -> Result<i32, RunnerError> {
    let mut command = Command::new(&cfg.command);
    command
        .args(&cfg.args)
        .env_clear()
        .envs(cfg.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    configure_child(&mut command, cfg.lockdown)?;

    let mut child = command.spawn().map_err(RunnerError::Spawn)?;
    child_pid.store(child.id() as i32, Ordering::SeqCst);

    let stdout = child.stdout.take().expect("stdout was piped");
    let stderr = child.stderr.take().expect("stderr was piped");
    let stdout_copier = spawn_copier(stdout, MaskingWriter::new(std::io::stdout(), &cfg.secrets)?);
    let stderr_copier = spawn_copier(stderr, MaskingWriter::new(std::io::stderr(), &cfg.secrets)?);

    let result = wait_for_child(&mut child, cfg.lockdown);

    // Pipes hit EOF once the child is gone; drain fully before returning.
    let _ = stdout_copier.join();
    let _ = stderr_copier.join();

    result
}

fn spawn_copier<R, W>(mut from: R, to: MaskingWriter<W>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    std::thread::spawn(move || {
        let mut buf = [0u8; 8192];
        loop {
            match from.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if to.write_bytes(&buf[..n]).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        let _ = to.finish();
    })
}

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
fn configure_child(command: &mut Command, lockdown: bool) -> Result<(), RunnerError> {
    use std::os::unix::process::CommandExt;
    unsafe {
        if lockdown {
            command.pre_exec(super::lockdown::harden_child);
        } else {
            command.pre_exec(super::lockdown::set_pdeathsig);
        }
    }
    Ok(())
}

#[cfg(all(target_os = "linux", not(target_arch = "x86_64")))]
fn configure_child(command: &mut Command, lockdown: bool) -> Result<(), RunnerError> {
    use std::os::unix::process::CommandExt;
    // Ptrace syscall inspection is x86-64 only; fail closed.
    if lockdown {
        return Err(RunnerError::LockdownUnsupported);
    }
    unsafe {
        command.pre_exec(super::lockdown::set_pdeathsig);
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn configure_child(_command: &mut Command, lockdown: bool) -> Result<(), RunnerError> {
    if lockdown {
        return Err(RunnerError::LockdownUnsupported);
    }
    Ok(())
}

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
fn wait_for_child(child: &mut Child, lockdown: bool) -> Result<i32, RunnerError> {
    use super::tracer::{wait_with_trace, TraceError};

    if !lockdown {
        return wait_plain(child);
    }

    match wait_with_trace(nix::unistd::Pid::from_raw(child.id() as i32)) {
        Ok(code) => Ok(code),
        Err(TraceError::SecurityViolation(path)) => Err(RunnerError::SecurityViolation(path)),
        Err(other) => Err(RunnerError::Trace(other.to_string())),
    }
}

#[cfg(not(all(target_os = "linux", target_arch = "x86_64")))]
fn wait_for_child(child: &mut Child, _lockdown: bool) -> Result<i32, RunnerError> {
    wait_plain(child)
}

fn wait_plain(child: &mut Child) -> Result<i32, RunnerError> {
    let status = child.wait().map_err(RunnerError::Wait)?;
    Ok(exit_code(status))
}

fn exit_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    status.code().unwrap_or(1)
}
