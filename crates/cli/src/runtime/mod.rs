// Client runtime: key material, env plumbing, the fetch protocol, and the
// hardened subprocess launcher.

pub mod appkeys;
pub mod envfile;
pub mod envscan;
pub mod fetch;
pub mod masker;
pub mod runner;

#[cfg(target_os = "linux")]
pub mod lockdown;

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
pub mod tracer;
