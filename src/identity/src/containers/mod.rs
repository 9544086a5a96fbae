mod docker;
mod inventory;

use async_trait::async_trait;
use mesos2iam_common::ResolutionError;
use mockall::automock;
use std::net::IpAddr;

pub use docker::DockerRuntime;
pub use inventory::ContainerInventory;

/// What the runtime reports about a running container. Observed, never
/// modified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Container {
    pub id: String,
    pub name: String,
    /// Host pid of the container's main process.
    pub main_pid: Option<u32>,
    /// Addresses on every attached network, the default bridge first and the
    /// others ordered by network name. Empty in host networking mode.
    pub ip_addresses: Vec<String>,
    /// `KEY=VALUE` assignments in the order the runtime reports them.
    pub env: Vec<String>,
}

impl Container {
    pub fn addresses(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.ip_addresses
            .iter()
            .filter_map(|address| address.parse::<IpAddr>().ok())
            .map(|ip| ip.to_canonical())
    }

    pub fn has_address(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();
        self.addresses().any(|address| address == ip)
    }

    /// Value of the first environment entry starting with `prefix`
    /// (`KEY=` form), returned as is.
    pub fn job_id_value(&self, prefix: &str) -> Option<&str> {
        self.env
            .iter()
            .find_map(|assignment| assignment.strip_prefix(prefix))
    }
}

/// The two questions asked of a container runtime.
#[automock]
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn running_container_ids(&self) -> Result<Vec<String>, ResolutionError>;

    /// `Ok(None)` when the container went away after being listed.
    async fn inspect(&self, id: &str) -> Result<Option<Container>, ResolutionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container_with_env(env: &[&str]) -> Container {
        Container {
            id: "c1".into(),
            env: env.iter().map(|e| e.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_job_id_value_returns_first_match_unparsed() {
        let container = container_with_env(&[
            "PATH=/usr/bin",
            "TARDIS_SCHID=4ea13548-caa8-48dc-af69-58a651d9fa3b",
            "TARDIS_SCHID=second",
        ]);
        assert_eq!(
            container.job_id_value("TARDIS_SCHID="),
            Some("4ea13548-caa8-48dc-af69-58a651d9fa3b")
        );
    }

    #[test]
    fn test_job_id_value_needs_exact_key() {
        let container = container_with_env(&["TARDIS_SCHID_OLD=abc", "XTARDIS_SCHID=abc"]);
        assert_eq!(container.job_id_value("TARDIS_SCHID="), None);
    }

    #[test]
    fn test_job_id_value_keeps_equals_in_value() {
        let container = container_with_env(&["TARDIS_SCHID=a=b"]);
        assert_eq!(container.job_id_value("TARDIS_SCHID="), Some("a=b"));
    }

    #[test]
    fn test_has_address_matches_any_network() {
        let container = Container {
            ip_addresses: vec!["10.1.0.7".into(), "10.2.0.9".into()],
            ..Default::default()
        };
        assert!(container.has_address("10.1.0.7".parse().unwrap()));
        assert!(container.has_address("10.2.0.9".parse().unwrap()));
        assert!(container.has_address("::ffff:10.2.0.9".parse().unwrap()));
        assert!(!container.has_address("10.3.0.1".parse().unwrap()));
        assert!(!Container::default().has_address("10.1.0.7".parse().unwrap()));
    }
}
