//! Child-side hardening, applied between fork and execve via `pre_exec`.
//!
//! Everything here runs in the forked child before the target binary
//! exists, so only raw syscalls are used. The seccomp program is
//! deliberately five instructions; it is meant to be audited, not
//! extended into a filter DSL.

use std::io;

/// Kill the child if the parent dies. Applied on every Linux spawn,
/// lockdown or not, so an orphaned child never outlives the masker.
pub fn set_pdeathsig() -> io::Result<()> {
    if unsafe { libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL, 0, 0, 0) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Full hardening for a traced child:
///
/// 1. `PTRACE_TRACEME` — must run before the seccomp install, because it is
///    itself a ptrace(2) call and the filter would deny it.
/// 2. `PR_SET_NO_NEW_PRIVS` + seccomp: `ptrace` and `process_vm_readv`
///    return EPERM from here on, and the filter survives execve.
/// 3. `PR_SET_DUMPABLE = 0` — blocks `/proc/<pid>/mem` and coredump leaks
///    until execve resets it; seccomp keeps covering the gap after.
/// 4. Parent-death signal.
#[cfg(target_arch = "x86_64")]
pub fn harden_child() -> io::Result<()> {
    nix::sys::ptrace::traceme().map_err(|e| io::Error::from_raw_os_error(e as i32))?;

    install_seccomp_filter()?;

    if unsafe { libc::prctl(libc::PR_SET_DUMPABLE, 0, 0, 0, 0) } != 0 {
        return Err(io::Error::last_os_error());
    }

    set_pdeathsig()
}

#[cfg(target_arch = "x86_64")]
fn install_seccomp_filter() -> io::Result<()> {
    const SECCOMP_SET_MODE_FILTER: libc::c_long = 1;
    const SECCOMP_RET_ALLOW: u32 = 0x7fff_0000;
    const SECCOMP_RET_ERRNO: u32 = 0x0005_0000;

    fn stmt(code: u32, k: u32) -> libc::sock_filter {
        libc::sock_filter {
            code: code as u16,
            jt: 0,
            jf: 0,
            k,
        }
    }

    fn jeq(k: u32, jt: u8) -> libc::sock_filter {
        libc::sock_filter {
            code: (libc::BPF_JMP | libc::BPF_JEQ | libc::BPF_K) as u16,
            jt,
            jf: 0,
            k,
        }
    }

    let filter = [
        // Load the syscall number (offset 0 in seccomp_data).
        stmt((libc::BPF_LD | libc::BPF_W | libc::BPF_ABS) as u32, 0),
        // ptrace → deny
        jeq(libc::SYS_ptrace as u32, 2),
        // process_vm_readv → deny
        jeq(libc::SYS_process_vm_readv as u32, 1),
        // allow
        stmt((libc::BPF_RET | libc::BPF_K) as u32, SECCOMP_RET_ALLOW),
        // deny: EPERM
        stmt(
            (libc::BPF_RET | libc::BPF_K) as u32,
            SECCOMP_RET_ERRNO | libc::EPERM as u32,
        ),
    ];

    let prog = libc::sock_fprog {
        len: filter.len() as u16,
        filter: filter.as_ptr() as *mut libc::sock_filter,
    };

    // Required before SECCOMP_SET_MODE_FILTER without CAP_SYS_ADMIN.
    if unsafe { libc::prctl(libc::PR_SET_NO_NEW_PRIVS, 1, 0, 0, 0) } != 0 {
        return Err(io::Error::last_os_error());
    }

    let rc = unsafe {
        libc::syscall(
            libc::SYS_seccomp,
            SECCOMP_SET_MODE_FILTER,
            0 as libc::c_long,
            &prog as *const libc::sock_fprog,
        )
    };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}
