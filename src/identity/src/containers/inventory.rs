use super::{Container, ContainerRuntime};
use mesos2iam_common::{ContainerQuery, ResolutionError};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

/// Looks containers up by main pid or bridge address.
///
/// The runtime is asked again on every call. A stopped container must stop
/// resolving at once, and ports and addresses get reused.
#[derive(Clone)]
pub struct ContainerInventory {
    runtime: Arc<dyn ContainerRuntime>,
}

impl ContainerInventory {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }

    pub async fn find_by_process_id(&self, pid: u32) -> Result<Container, ResolutionError> {
        let container = self
            .find_first(|container| container.main_pid == Some(pid))
            .await?
            .ok_or(ResolutionError::ContainerNotFound(ContainerQuery::MainPid(pid)))?;
        debug!("Found PID: {} in container {}", pid, container.id);
        Ok(container)
    }

    pub async fn find_by_address(&self, ip: IpAddr) -> Result<Container, ResolutionError> {
        let container = self
            .find_first(|container| container.has_address(ip))
            .await?
            .ok_or(ResolutionError::ContainerNotFound(ContainerQuery::Address(ip)))?;
        debug!("Found IP: {} in container {}", ip, container.id);
        Ok(container)
    }

    async fn find_first(
        &self,
        matches: impl Fn(&Container) -> bool,
    ) -> Result<Option<Container>, ResolutionError> {
        for id in self.runtime.running_container_ids().await? {
            if let Some(container) = self.runtime.inspect(&id).await? {
                if matches(&container) {
                    return Ok(Some(container));
                }
            }
        }
        Ok(None)
    }
}
