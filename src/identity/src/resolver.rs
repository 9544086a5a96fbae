//! Turns the source address of a connection into a validated job id.
//!
//! Host mode: the caller shares the host address, so the source port is
//! traced to the process holding it, then to its parent, which is expected to
//! be the container's main process. Exactly one level is climbed: credential
//! clients run as direct children of the container entrypoint. Deeper process
//! trees do not resolve.
//!
//! Bridge mode: every container has its own address and the source address
//! alone picks it.

use crate::containers::{Container, ContainerInventory};
use crate::process::{PortOwnerLookup, ProcessTree};
use mesos2iam_common::{ContainerQuery, JobId, ResolutionError};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, Instrument};
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMode {
    Host,
    Bridge,
}

impl ResolutionMode {
    pub fn select(source_ip: IpAddr, host_ip: IpAddr) -> Self {
        if source_ip.to_canonical() == host_ip.to_canonical() {
            ResolutionMode::Host
        } else {
            ResolutionMode::Bridge
        }
    }
}

fn env_prefix(prefix: String) -> String {
    if prefix.ends_with('=') {
        prefix
    } else {
        format!("{prefix}=")
    }
}

#[derive(TypedBuilder)]
pub struct IdentityResolver {
    host_ip: IpAddr,
    #[builder(setter(transform = |prefix: &str| env_prefix(prefix.to_string())))]
    job_id_prefix: String,
    port_owners: Arc<dyn PortOwnerLookup>,
    processes: Arc<dyn ProcessTree>,
    inventory: ContainerInventory,
}

impl IdentityResolver {
    pub fn host_ip(&self) -> IpAddr {
        self.host_ip
    }

    pub fn mode_for(&self, source_ip: IpAddr) -> ResolutionMode {
        ResolutionMode::select(source_ip, self.host_ip)
    }

    pub async fn resolve(&self, source: SocketAddr) -> Result<JobId, ResolutionError> {
        let mode = self.mode_for(source.ip());
        let span = tracing::debug_span!("resolve", peer = %source, ?mode);

        async move {
            let container = match mode {
                ResolutionMode::Host => self.container_for_port(source.port()).await?,
                ResolutionMode::Bridge => {
                    self.inventory
                        .find_by_address(source.ip().to_canonical())
                        .await?
                }
            };

            let value = container.job_id_value(&self.job_id_prefix).ok_or_else(|| {
                ResolutionError::IdentityNotPresent {
                    container: container.id.clone(),
                    prefix: self.job_id_prefix.clone(),
                }
            })?;

            let job_id = JobId::parse(value)?;
            debug!(container = %container.id, %job_id, "resolved job id");
            Ok(job_id)
        }
        .instrument(span)
        .await
    }

    async fn container_for_port(&self, port: u16) -> Result<Container, ResolutionError> {
        let pid = self.port_owners.owner_of(port).await?;
        debug!(port, pid, "port owner");

        let parent = self
            .processes
            .parent_of(pid)
            .await
            .ok_or(ResolutionError::ContainerNotFound(ContainerQuery::ParentOf(pid)))?;

        self.inventory.find_by_process_id(parent).await
    }
}
