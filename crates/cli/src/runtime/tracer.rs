//! Parent-side ptrace syscall gate.
//!
//! Complements the child's seccomp filter: seccomp blocks the dangerous
//! syscalls outright, the tracer catches path-based attacks seccomp cannot
//! filter on (it never sees argument memory). The loop blocks in `wait4`,
//! so it must run on the thread that spawned the child, never a
//! work-stealing scheduler.

use nix::sys::ptrace;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::Pid;

const MAX_TRACED_PATH_LEN: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("wait for traced child: {0}")]
    Wait(nix::errno::Errno),
    #[error("ptrace: {0}")]
    Ptrace(nix::errno::Errno),
    #[error("unexpected initial wait status: {0}")]
    UnexpectedStop(String),
    #[error("security violation: child attempted forbidden access to {0}")]
    SecurityViolation(String),
}

/// Supervise a child started with `PTRACE_TRACEME`. Returns its exit code,
/// `128 + signum` on signal death, or a [`TraceError::SecurityViolation`]
/// after killing a child caught opening an environ file.
pub fn wait_with_trace(pid: Pid) -> Result<i32, TraceError> {
    // Initial stop from PTRACE_TRACEME at execve.
    match waitpid(pid, None).map_err(TraceError::Wait)? {
        WaitStatus::Exited(_, code) => return Ok(code),
        WaitStatus::Signaled(_, signal, _) => return Ok(128 + signal as i32),
        WaitStatus::Stopped(_, _) => {}
        other => return Err(TraceError::UnexpectedStop(format!("{:?}", other))),
    }

    if let Err(e) = ptrace::setoptions(
        pid,
        ptrace::Options::PTRACE_O_TRACESYSGOOD | ptrace::Options::PTRACE_O_EXITKILL,
    ) {
        let _ = kill(pid, Signal::SIGKILL);
        return Err(TraceError::Ptrace(e));
    }

    let mut in_syscall = false;
    let mut deliver: Option<Signal> = None;

    loop {
        if let Err(e) = ptrace::syscall(pid, deliver) {
            let _ = kill(pid, Signal::SIGKILL);
            return Err(TraceError::Ptrace(e));
        }
        deliver = None;

        let status = match waitpid(pid, None) {
            Ok(status) => status,
            Err(e) => {
                let _ = kill(pid, Signal::SIGKILL);
                return Err(TraceError::Wait(e));
            }
        };

        match status {
            WaitStatus::Exited(_, code) => return Ok(code),
            WaitStatus::Signaled(_, signal, _) => return Ok(128 + signal as i32),
            WaitStatus::PtraceSyscall(_) => {
                // Enter and exit stops alternate under PTRACE_SYSCALL; only
                // enter stops carry inspectable arguments.
                if !in_syscall {
                    match forbidden_open_path(pid) {
                        Ok(Some(path)) => {
                            let _ = kill(pid, Signal::SIGKILL);
                            let _ = waitpid(pid, None);
                            return Err(TraceError::SecurityViolation(path));
                        }
                        Ok(None) => {}
                        Err(e) => {
                            let _ = kill(pid, Signal::SIGKILL);
                            return Err(e);
                        }
                    }
                }
                in_syscall = !in_syscall;
            }
            WaitStatus::Stopped(_, signal) => {
                // Deliver real signals to the child; swallow the traps.
                if signal != Signal::SIGTRAP {
                    deliver = Some(signal);
                }
            }
            _ => {}
        }
    }
}

/// If the stopped child is entering open/openat/openat2 on a forbidden
/// environ path, return that path.
fn forbidden_open_path(pid: Pid) -> Result<Option<String>, TraceError> {
    let regs = ptrace::getregs(pid).map_err(TraceError::Ptrace)?;

    let sysno = regs.orig_rax as i64;
    let path_addr = if sysno == libc::SYS_open {
        regs.rdi
    } else if sysno == libc::SYS_openat || sysno == libc::SYS_openat2 {
        regs.rsi
    } else {
        return Ok(None);
    };

    if path_addr == 0 {
        return Ok(None);
    }

    let path = read_c_string(pid, path_addr, MAX_TRACED_PATH_LEN)?;
    if is_forbidden_environ_path(&path, pid) {
        Ok(Some(path))
    } else {
        Ok(None)
    }
}

/// Read a NUL-terminated string from the child's address space, one word at
/// a time, bounded by `max_len`.
fn read_c_string(pid: Pid, addr: u64, max_len: usize) -> Result<String, TraceError> {
    let mut out: Vec<u8> = Vec::with_capacity(128);

    'words: while out.len() < max_len {
        let word = ptrace::read(pid, (addr + out.len() as u64) as ptrace::AddressType)
            .map_err(TraceError::Ptrace)?;
        for byte in (word as u64).to_ne_bytes() {
            if byte == 0 {
                break 'words;
            }
            out.push(byte);
            if out.len() >= max_len {
                break 'words;
            }
        }
    }

    Ok(String::from_utf8_lossy(&out).into_owned())
}

fn is_forbidden_environ_path(path: &str, pid: Pid) -> bool {
    if path == "/proc/self/environ" || path == "/proc/thread-self/environ" {
        return true;
    }
    if path == format!("/proc/{}/environ", pid) {
        return true;
    }
    // Any pid's environ file counts, including other processes'.
    path.starts_with("/proc/") && path.ends_with("/environ")
}
