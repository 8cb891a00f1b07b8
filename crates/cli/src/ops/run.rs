//! `jingui run -- <command> [args...]`
//!
//! Resolve `jingui://` references from the environment, fetch and decrypt
//! the values, then launch the command with the plaintexts injected as
//! environment variables, lockdown applied, and stdout/stderr masked.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use clap::Args;

use jingui::runtime::appkeys::{self, AppKeysError};
use jingui::runtime::envfile::{self, EnvFileError};
use jingui::runtime::envscan;
use jingui::runtime::fetch::{self, FetchError};
use jingui::runtime::runner::{self, RunConfig, RunnerError};
use jingui_common::crypto;

use crate::op::{Op, OpContext, OpOutcome};

const DEFAULT_ENV_FILE: &str = ".env";

#[derive(Args, Debug, Clone)]
pub struct Run {
    /// Path to .env file (the default .env is skipped when absent)
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Disable seccomp/ptrace lockdown on the child process
    #[arg(long)]
    pub no_lockdown: bool,

    /// Command and arguments to execute
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    pub command: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("load private key: {0}")]
    AppKeys(#[from] AppKeysError),
    #[error("parse env file: {0}")]
    EnvFile(#[from] EnvFileError),
    #[error("fetch secrets: {0}")]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Runner(#[from] RunnerError),
    #[error("missing resolved value for {0}")]
    MissingResolvedValue(String),
    #[error("lockdown is currently supported only on linux/x86-64; use --no-lockdown to bypass (not recommended)")]
    UnsupportedArch,
    #[error("runner task failed: {0}")]
    Join(String),
}

#[async_trait::async_trait]
impl Op for Run {
    type Error = RunError;

    async fn execute(&self, ctx: &OpContext) -> Result<OpOutcome, Self::Error> {
        let private_key = appkeys::load_private_key(&ctx.appkeys_path)?;
        let public_key = crypto::derive_public_key(&private_key);
        let fid = crypto::fid(&public_key);

        let entries = match &self.env_file {
            Some(path) => envfile::parse_env_file(path)?,
            None => match envfile::parse_env_file(Path::new(DEFAULT_ENV_FILE)) {
                Ok(entries) => entries,
                Err(EnvFileError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                    Vec::new()
                }
                Err(e) => return Err(e.into()),
            },
        };
        let scan = envscan::merge_with_process_env(&entries);

        let lockdown = resolve_lockdown(self.no_lockdown)?;

        let mut env = scan.plain_env.clone();
        let mut secrets = Vec::new();

        if !scan.refs.is_empty() {
            let mut ref_list = Vec::with_capacity(scan.refs.len());
            let mut seen = HashSet::new();
            for (_, reference) in &scan.refs {
                if seen.insert(reference.clone()) {
                    ref_list.push(reference.clone());
                }
            }

            let resolved =
                fetch::fetch_secrets(&ctx.client, &private_key, &fid, ref_list, "run").await?;

            for (key, reference) in &scan.refs {
                let value = resolved
                    .get(reference)
                    .ok_or_else(|| RunError::MissingResolvedValue(reference.clone()))?;
                let value = String::from_utf8_lossy(value).into_owned();
                secrets.push(value.clone());
                env.push((key.clone(), value));
            }
        }

        let cfg = RunConfig {
            command: self.command[0].clone(),
            args: self.command[1..].to_vec(),
            env,
            secrets,
            lockdown,
        };

        let child_pid = Arc::new(AtomicI32::new(0));
        spawn_signal_forwarder(child_pid.clone());

        // The ptrace loop blocks and must own its thread.
        let pid_slot = child_pid.clone();
        let code = tokio::task::spawn_blocking(move || runner::run(cfg, &pid_slot))
            .await
            .map_err(|e| RunError::Join(e.to_string()))??;

        Ok(OpOutcome::Exit(code))
    }
}

fn resolve_lockdown(no_lockdown: bool) -> Result<bool, RunError> {
    if no_lockdown {
        return Ok(false);
    }
    if cfg!(not(target_os = "linux")) {
        eprintln!("jingui: WARNING: lockdown is unavailable on this platform; running without hardening");
        return Ok(false);
    }
    if cfg!(not(target_arch = "x86_64")) {
        return Err(RunError::UnsupportedArch);
    }
    Ok(true)
}

/// Forward SIGINT/SIGTERM delivered to the runner on to the child.
#[cfg(unix)]
fn spawn_signal_forwarder(child_pid: Arc<AtomicI32>) {
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};

        let (Ok(mut sigint), Ok(mut sigterm)) =
            (signal(SignalKind::interrupt()), signal(SignalKind::terminate()))
        else {
            return;
        };

        loop {
            let signo = tokio::select! {
                _ = sigint.recv() => libc::SIGINT,
                _ = sigterm.recv() => libc::SIGTERM,
            };
            let pid = child_pid.load(Ordering::SeqCst);
            if pid > 0 {
                unsafe {
                    libc::kill(pid, signo);
                }
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_signal_forwarder(_child_pid: Arc<AtomicI32>) {}
