use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    BACKEND_TIMEOUT_MS, DEFAULT_AWS_CONTAINER_CREDENTIALS_IP, DEFAULT_CREDENTIALS_URL,
    DEFAULT_JOB_ID_PREFIX, DEFAULT_LISTENING_IP, DEFAULT_SERVER_PORT, ENV_PREFIX,
    LEGACY_PREFIX_ENV, PROCESS_LOOKUP_TIMEOUT_MS,
};
use config::{Config as RConfig, Environment, File, FileFormat};

/// How the owner of a local tcp port is found in host networking mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProcessLookupKind {
    /// Ask `fuser <port>/tcp`.
    #[default]
    Fuser,
    /// Walk `/proc/net/tcp*` and `/proc/<pid>/fd` directly.
    Procfs,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    pub host_ip: IpAddr,
    pub listening_ip: IpAddr,
    pub server_port: u16,
    pub aws_container_credentials_ip: IpAddr,
    pub credentials_url: String,
    pub job_id_prefix: String,
    pub backend_timeout_ms: u64,
    pub process_lookup: ProcessLookupKind,
    pub process_lookup_timeout_ms: u64,
    pub iptables: bool,
    pub verbose: bool,
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listening_ip, self.server_port)
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }

    pub fn process_lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.process_lookup_timeout_ms)
    }
}

/// Values given on the command line. They win over the file and the environment.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub host_ip: Option<IpAddr>,
    pub listening_ip: Option<IpAddr>,
    pub server_port: Option<u16>,
    pub aws_container_credentials_ip: Option<IpAddr>,
    pub credentials_url: Option<String>,
    pub job_id_prefix: Option<String>,
    pub process_lookup: Option<ProcessLookupKind>,
    pub iptables: Option<bool>,
    pub verbose: Option<bool>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(config_file: Option<&Path>, overrides: &ConfigOverrides) -> Result<Config> {
        let mut builder = RConfig::builder();

        // set defaults
        builder = builder
            .set_default("host_ip", "")?
            .set_default("listening_ip", DEFAULT_LISTENING_IP)?
            .set_default("server_port", DEFAULT_SERVER_PORT)?
            .set_default(
                "aws_container_credentials_ip",
                DEFAULT_AWS_CONTAINER_CREDENTIALS_IP,
            )?
            .set_default("credentials_url", DEFAULT_CREDENTIALS_URL)?
            .set_default("job_id_prefix", DEFAULT_JOB_ID_PREFIX)?
            .set_default("backend_timeout_ms", BACKEND_TIMEOUT_MS)?
            .set_default("process_lookup", "fuser")?
            .set_default("process_lookup_timeout_ms", PROCESS_LOOKUP_TIMEOUT_MS)?
            .set_default("iptables", false)?
            .set_default("verbose", false)?;

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX));

        // the legacy variable only counts when the current one is unset
        if std::env::var_os(format!("{ENV_PREFIX}_JOB_ID_PREFIX")).is_none() {
            let legacy_prefix = std::env::var(LEGACY_PREFIX_ENV)
                .ok()
                .filter(|prefix| !prefix.is_empty());
            builder = builder.set_override_option("job_id_prefix", legacy_prefix)?;
        }

        // set overrides
        builder = builder
            .set_override_option("host_ip", overrides.host_ip.map(|ip| ip.to_string()))?
            .set_override_option(
                "listening_ip",
                overrides.listening_ip.map(|ip| ip.to_string()),
            )?
            .set_override_option("server_port", overrides.server_port)?
            .set_override_option(
                "aws_container_credentials_ip",
                overrides
                    .aws_container_credentials_ip
                    .map(|ip| ip.to_string()),
            )?
            .set_override_option("credentials_url", overrides.credentials_url.clone())?
            .set_override_option("job_id_prefix", overrides.job_id_prefix.clone())?
            .set_override_option(
                "process_lookup",
                overrides.process_lookup.map(|kind| match kind {
                    ProcessLookupKind::Fuser => "fuser",
                    ProcessLookupKind::Procfs => "procfs",
                }),
            )?
            .set_override_option("iptables", overrides.iptables)?
            .set_override_option("verbose", overrides.verbose)?;

        let settings = builder.build()?;

        if settings
            .get_string("host_ip")
            .map(|ip| ip.trim().is_empty())
            .unwrap_or(true)
        {
            bail!("host_ip can't be empty: pass --host-ip or set {ENV_PREFIX}_HOST_IP");
        }

        let mut config: Config = settings
            .try_deserialize()
            .context("failed to parse configuration")?;

        url::Url::parse(&config.credentials_url)
            .with_context(|| format!("invalid credentials_url {:?}", config.credentials_url))?;

        if config.job_id_prefix.trim_end_matches('=').is_empty() {
            bail!("job_id_prefix can't be empty");
        }
        if !config.job_id_prefix.ends_with('=') {
            config.job_id_prefix.push('=');
        }

        Ok(config)
    }
}
