//! Mapping a local tcp port back to the process that holds it.
//!
//! Only used in host networking mode, where every container shares the host's
//! address and the source port is the one thing that tells two callers apart.

mod fuser;
mod procfs;
mod tree;

use async_trait::async_trait;
use mesos2iam_common::config::{Config, ProcessLookupKind};
use mesos2iam_common::constants::METADATA_PORT;
use mesos2iam_common::ResolutionError;
use mockall::automock;
use std::sync::Arc;

pub use fuser::FuserLookup;
pub use procfs::ProcfsLookup;
pub use tree::SysinfoProcessTree;

/// Finds the process bound to a local tcp port.
#[automock]
#[async_trait]
pub trait PortOwnerLookup: Send + Sync {
    async fn owner_of(&self, port: u16) -> Result<u32, ResolutionError>;
}

/// Parent/child relation between host processes.
#[automock]
#[async_trait]
pub trait ProcessTree: Send + Sync {
    /// `None` when the process is gone or has no parent.
    async fn parent_of(&self, pid: u32) -> Option<u32>;
}

pub fn port_owner_lookup(config: &Config) -> Arc<dyn PortOwnerLookup> {
    match config.process_lookup {
        ProcessLookupKind::Fuser => Arc::new(FuserLookup::new(config.process_lookup_timeout())),
        ProcessLookupKind::Procfs => Arc::new(
            ProcfsLookup::new(config.process_lookup_timeout())
                .with_remote_ports([METADATA_PORT, config.server_port]),
        ),
    }
}
