use super::ProcessTree;
use async_trait::async_trait;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::debug;

/// Reads parent pids from the host process table.
///
/// A fresh `System` is built per call so the answer always reflects the
/// current table; nothing is shared between requests.
#[derive(Default)]
pub struct SysinfoProcessTree;

impl SysinfoProcessTree {
    pub fn new() -> Self {
        Self
    }
}

fn read_parent(pid: u32) -> Option<u32> {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::nothing(),
    );
    system
        .process(pid)
        .and_then(|process| process.parent())
        .map(|parent| parent.as_u32())
}

#[async_trait]
impl ProcessTree for SysinfoProcessTree {
    async fn parent_of(&self, pid: u32) -> Option<u32> {
        let parent = tokio::task::spawn_blocking(move || read_parent(pid))
            .await
            .ok()
            .flatten();
        debug!(pid, ?parent, "parent process");
        parent
    }
}
