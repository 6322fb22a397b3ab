//! Pid namespace mapping via the /proc filesystem.
//!
//! # Implementation
//!
//! On Linux, reads:
//! - `/proc/{pid}/ns/pid` - pid namespace of a process (link text `pid:[inode]`)
//! - `/proc/{pid}/status` - `NSpid:` line, pid in each nested namespace,
//!   outermost first
//!
//! A sandbox pid maps to the host pid of the process in the caller's pid
//! namespace whose innermost `NSpid` value equals it.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::MappingError;
use crate::translate::PidMapper;
use crate::types::AppInfo;

type MapResult<T> = std::result::Result<T, MappingError>;

/// [`PidMapper`] backed by procfs.
#[derive(Debug, Clone)]
pub struct ProcPidMapper {
    proc_root: PathBuf,
}

impl Default for ProcPidMapper {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl ProcPidMapper {
    /// Creates a mapper reading the procfs mounted at `proc_root`.
    #[must_use]
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    /// Returns the procfs mount point in use.
    #[must_use]
    pub fn proc_root(&self) -> &Path {
        &self.proc_root
    }

    /// Maps `pid` from the namespace of `instance_pid` to a host pid.
    ///
    /// Blocking: scans every process directory under the procfs root.
    ///
    /// # Errors
    /// Returns an error if `pid` is not a valid `pid_t`, the sandbox process
    /// is gone, or no process in its namespace carries `pid`.
    pub fn map_blocking(&self, instance_pid: u32, pid: u64) -> MapResult<u64> {
        if pid == 0 || pid > i32::MAX as u64 {
            return Err(MappingError::OutOfRange(pid));
        }

        let sandbox_ns = self
            .pid_namespace(&instance_pid.to_string())
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => MappingError::SandboxGone(instance_pid),
                _ => MappingError::Io(e),
            })?;

        // Sandbox without its own pid namespace
        if self.pid_namespace("self")? == sandbox_ns {
            return Ok(pid);
        }

        for entry in std::fs::read_dir(&self.proc_root)? {
            let Ok(entry) = entry else { continue };
            let name = entry.file_name();
            let Some(host_pid) = name.to_str().and_then(|s| s.parse::<u64>().ok()) else {
                continue;
            };

            // Processes may exit mid-scan
            let Ok(ns) = self.pid_namespace(&host_pid.to_string()) else {
                continue;
            };
            if ns != sandbox_ns {
                continue;
            }
            let Ok(status) = std::fs::read_to_string(entry.path().join("status")) else {
                continue;
            };

            if parse_nspid(&status).and_then(|ids| ids.last().copied()) == Some(pid) {
                return Ok(host_pid);
            }
        }

        Err(MappingError::NotFound(pid))
    }

    fn pid_namespace(&self, process: &str) -> std::io::Result<String> {
        let link = std::fs::read_link(self.proc_root.join(process).join("ns").join("pid"))?;
        Ok(link.to_string_lossy().into_owned())
    }
}

#[async_trait]
impl PidMapper for ProcPidMapper {
    async fn map_pid(&self, app: &AppInfo, pid: u64) -> MapResult<u64> {
        // Host callers never reach a mapper; there is no sandbox to look into
        let instance_pid = match app {
            AppInfo::Host => return Err(MappingError::NoInstance(app.to_string())),
            AppInfo::Flatpak { instance_pid, .. } => *instance_pid,
        };

        let mapper = self.clone();
        tokio::task::spawn_blocking(move || mapper.map_blocking(instance_pid, pid))
            .await
            .map_err(|e| MappingError::Io(std::io::Error::other(e)))?
    }
}

/// Parses the `NSpid:` line of a `/proc/{pid}/status` file.
///
/// Format: `NSpid:\t9001\t42` (tab or space separated).
pub(crate) fn parse_nspid(status: &str) -> Option<Vec<u64>> {
    let line = status.lines().find(|l| l.starts_with("NSpid:"))?;
    let ids: Option<Vec<u64>> = line["NSpid:".len()..]
        .split_whitespace()
        .map(|s| s.parse().ok())
        .collect();
    ids.filter(|ids| !ids.is_empty())
}
