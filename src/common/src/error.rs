//! Failures of the identity resolution pipeline.
//!
//! Every variant is a "cannot determine identity" condition from the point of
//! view of the caller; the variants only exist so logs can say where the
//! pipeline stopped.

use std::fmt;
use std::net::IpAddr;
use thiserror::Error;

/// What the container inventory was asked to match on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerQuery {
    /// Main process id reported by the runtime.
    MainPid(u32),
    /// Parent of the process that owns the connection could not be read.
    ParentOf(u32),
    /// Address assigned on the bridge network.
    Address(IpAddr),
}

impl fmt::Display for ContainerQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerQuery::MainPid(pid) => write!(f, "main process {pid}"),
            ContainerQuery::ParentOf(pid) => write!(f, "parent of process {pid}"),
            ContainerQuery::Address(ip) => write!(f, "address {ip}"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("no process owns local tcp port {port}")]
    ProcessNotFound { port: u16 },

    #[error("not allowed to inspect the owner of tcp port {port}: {detail}")]
    PermissionDenied { port: u16, detail: String },

    #[error("process lookup for tcp port {port} failed: {detail}")]
    ProcessLookupFailed { port: u16, detail: String },

    #[error("no running container matches {0}")]
    ContainerNotFound(ContainerQuery),

    #[error("container runtime error: {0}")]
    ContainerRuntime(String),

    #[error("container {container} has no {prefix} environment entry")]
    IdentityNotPresent { container: String, prefix: String },

    #[error("job id \"{0}\" is not a valid uuidv4")]
    InvalidIdentity(String),
}

impl ResolutionError {
    /// Pipeline stage at which resolution stopped.
    pub fn stage(&self) -> &'static str {
        match self {
            ResolutionError::ProcessNotFound { .. }
            | ResolutionError::PermissionDenied { .. }
            | ResolutionError::ProcessLookupFailed { .. } => "locate-process",
            ResolutionError::ContainerNotFound(ContainerQuery::ParentOf(_)) => "ascend-parent",
            ResolutionError::ContainerNotFound(_) | ResolutionError::ContainerRuntime(_) => {
                "find-container"
            }
            ResolutionError::IdentityNotPresent { .. } => "extract-identity",
            ResolutionError::InvalidIdentity(_) => "validate-identity",
        }
    }
}
