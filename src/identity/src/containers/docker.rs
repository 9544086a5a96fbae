use super::{Container, ContainerRuntime};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bollard::errors::Error as DockerError;
use bollard::models::{ContainerInspectResponse, EndpointSettings};
use bollard::query_parameters::{InspectContainerOptions, ListContainersOptionsBuilder};
use bollard::Docker;
use mesos2iam_common::ResolutionError;
use std::collections::BTreeMap;

pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connects the way the docker cli does: `DOCKER_HOST` if set, the local
    /// unix socket otherwise. No request is made until the first lookup.
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_defaults().context("Failed to create docker client")?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn running_container_ids(&self) -> Result<Vec<String>, ResolutionError> {
        let options = ListContainersOptionsBuilder::default().all(false).build();

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| ResolutionError::ContainerRuntime(e.to_string()))?;

        Ok(containers
            .into_iter()
            .filter_map(|summary| summary.id)
            .collect())
    }

    async fn inspect(&self, id: &str) -> Result<Option<Container>, ResolutionError> {
        match self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
        {
            Ok(inspect) => Ok(Some(container_from_inspect(id, inspect))),
            Err(DockerError::DockerResponseServerError {
                status_code: 404, ..
            }) => {
                tracing::debug!("Container {} stopped before it could be inspected", id);
                Ok(None)
            }
            Err(e) => Err(ResolutionError::ContainerRuntime(e.to_string())),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

fn container_from_inspect(id: &str, inspect: ContainerInspectResponse) -> Container {
    let name = inspect
        .name
        .unwrap_or_default()
        .trim_start_matches('/')
        .to_string();

    // docker reports pid 0 for containers that are not running
    let main_pid = inspect
        .state
        .as_ref()
        .and_then(|state| state.pid)
        .filter(|pid| *pid > 0)
        .and_then(|pid| u32::try_from(pid).ok());

    let ip_addresses = inspect
        .network_settings
        .map(|net| {
            // sorted by network name so every inspection lists them the same way
            let networks: BTreeMap<String, EndpointSettings> =
                net.networks.unwrap_or_default().into_iter().collect();

            let mut addresses: Vec<String> = Vec::new();
            let candidates = non_empty(net.ip_address).into_iter().chain(
                networks
                    .into_values()
                    .filter_map(|endpoint| non_empty(endpoint.ip_address)),
            );
            for address in candidates {
                if !addresses.contains(&address) {
                    addresses.push(address);
                }
            }
            addresses
        })
        .unwrap_or_default();

    let env = inspect
        .config
        .and_then(|config| config.env)
        .unwrap_or_default();

    Container {
        id: inspect.id.unwrap_or_else(|| id.to_string()),
        name,
        main_pid,
        ip_addresses,
        env,
    }
}
