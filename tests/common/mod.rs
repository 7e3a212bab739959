//! Shared utilities for integration tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use confstage::error::ConfResult;
use confstage::lifecycle::{Collaborators, ConfigManager};
use confstage::process::ProcessControl;

/// Process control with a fixed terminal and no OS side effects.
#[derive(Debug)]
pub struct FakeProcess {
    tty: Option<String>,
    umask: AtomicU32,
}

impl FakeProcess {
    pub fn new(tty: Option<&str>) -> Self {
        Self {
            tty: tty.map(str::to_string),
            umask: AtomicU32::new(0o022),
        }
    }

    #[allow(dead_code)]
    pub fn umask(&self) -> u32 {
        self.umask.load(Ordering::SeqCst)
    }
}

impl ProcessControl for FakeProcess {
    fn set_umask(&self, mode: u32) -> u32 {
        self.umask.swap(mode, Ordering::SeqCst)
    }

    fn set_max_open_files(&self, _limit: u64) -> ConfResult<()> {
        Ok(())
    }

    fn lookup_user(&self, name: &str) -> Option<u32> {
        (name == "syslog").then_some(104)
    }

    fn lookup_group(&self, name: &str) -> Option<u32> {
        (name == "adm").then_some(4)
    }

    fn controlling_terminal(&self) -> Option<String> {
        self.tty.clone()
    }
}

/// A manager whose process has the given controlling terminal.
pub fn manager_with_tty(tty: Option<&str>) -> ConfigManager {
    let collaborators = Collaborators::default().with_process(Arc::new(FakeProcess::new(tty)));
    ConfigManager::new(collaborators).unwrap()
}

/// Write `content` to `dir/name`, creating parent directories.
pub fn write_config(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}
