//! Process-global OS effects triggered while a configuration loads.
//!
//! # Responsibilities
//! - Apply the file creation mask and the open file limit
//! - Resolve user and group names for privilege dropping
//! - Report the controlling terminal for the emergency fallback
//!
//! # Design Decisions
//! - Effects apply synchronously during the parse and are not rolled back
//!   when the load later fails
//! - A dry-run implementation records requests without touching the
//!   process, for `check` runs and tests

use std::sync::{Mutex, PoisonError};

use crate::error::{ConfError, ConfResult};

/// OS operations the directive handlers need.
pub trait ProcessControl: Send + Sync {
    /// Set the file creation mask, returning the previous one.
    fn set_umask(&self, mode: u32) -> u32;

    /// Set the soft and hard open file limits.
    fn set_max_open_files(&self, limit: u64) -> ConfResult<()>;

    fn lookup_user(&self, name: &str) -> Option<u32>;

    fn lookup_group(&self, name: &str) -> Option<u32>;

    /// Path of the terminal attached to standard input, if any.
    fn controlling_terminal(&self) -> Option<String>;
}

/// Applies effects to the running process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcess;

#[cfg(unix)]
impl ProcessControl for SystemProcess {
    fn set_umask(&self, mode: u32) -> u32 {
        use nix::sys::stat::{umask, Mode};
        let previous = umask(Mode::from_bits_truncate(mode as nix::libc::mode_t));
        previous.bits() as u32
    }

    fn set_max_open_files(&self, limit: u64) -> ConfResult<()> {
        use nix::sys::resource::{setrlimit, Resource};
        let raw = limit as nix::libc::rlim_t;
        setrlimit(Resource::RLIMIT_NOFILE, raw, raw).map_err(|errno| ConfError::ResourceLimit {
            resource: "open file limit",
            requested: limit,
            message: errno.desc().to_string(),
        })
    }

    fn lookup_user(&self, name: &str) -> Option<u32> {
        nix::unistd::User::from_name(name)
            .ok()
            .flatten()
            .map(|user| user.uid.as_raw())
    }

    fn lookup_group(&self, name: &str) -> Option<u32> {
        nix::unistd::Group::from_name(name)
            .ok()
            .flatten()
            .map(|group| group.gid.as_raw())
    }

    fn controlling_terminal(&self) -> Option<String> {
        nix::unistd::ttyname(std::io::stdin())
            .ok()
            .map(|path| path.to_string_lossy().into_owned())
    }
}

#[cfg(not(unix))]
impl ProcessControl for SystemProcess {
    fn set_umask(&self, _mode: u32) -> u32 {
        0
    }

    fn set_max_open_files(&self, limit: u64) -> ConfResult<()> {
        Err(ConfError::ResourceLimit {
            resource: "open file limit",
            requested: limit,
            message: "not supported on this platform".to_string(),
        })
    }

    fn lookup_user(&self, _name: &str) -> Option<u32> {
        None
    }

    fn lookup_group(&self, _name: &str) -> Option<u32> {
        None
    }

    fn controlling_terminal(&self) -> Option<String> {
        None
    }
}

/// An effect a dry run was asked to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEffect {
    Umask(u32),
    MaxOpenFiles(u64),
}

/// Records requested effects instead of applying them. Name lookups and
/// the terminal query still go to the system.
#[derive(Debug, Default)]
pub struct DryRunProcess {
    effects: Mutex<Vec<ProcessEffect>>,
}

impl DryRunProcess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn effects(&self) -> Vec<ProcessEffect> {
        self.effects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, effect: ProcessEffect) {
        self.effects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(effect);
    }
}

impl ProcessControl for DryRunProcess {
    fn set_umask(&self, mode: u32) -> u32 {
        self.push(ProcessEffect::Umask(mode));
        mode
    }

    fn set_max_open_files(&self, limit: u64) -> ConfResult<()> {
        self.push(ProcessEffect::MaxOpenFiles(limit));
        Ok(())
    }

    fn lookup_user(&self, name: &str) -> Option<u32> {
        SystemProcess.lookup_user(name)
    }

    fn lookup_group(&self, name: &str) -> Option<u32> {
        SystemProcess.lookup_group(name)
    }

    fn controlling_terminal(&self) -> Option<String> {
        SystemProcess.controlling_terminal()
    }
}
