use clap::Parser;
use mesos2iam_common::config::{ConfigOverrides, ProcessLookupKind};
use std::net::IpAddr;
use std::path::PathBuf;

fn about_message() -> String {
    format!(
        "Serves IAM role credentials to containers, picking the role from the job id of the calling container\nVersion: {}",
        env!("CARGO_PKG_VERSION")
    )
}

fn footer_message() -> String {
    "Every flag can also be set as MESOS2IAM_<NAME> in the environment or in the --config file.\nFlags win over the environment, which wins over the file.".to_string()
}

#[derive(Parser, Clone, Debug)]
#[clap(
    name = "mesos2iam",
    about = about_message(),
    version = env!("CARGO_PKG_VERSION"),
    after_help = footer_message()
)]
pub struct Cli {
    /// TOML file with configuration values
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Enable verbosity
    #[clap(long)]
    pub verbose: bool,

    /// Add the NAT rules redirecting metadata traffic to this proxy (needs --host-ip)
    #[clap(long)]
    pub iptables: bool,

    /// Listening IP address
    #[clap(long)]
    pub listening_ip: Option<IpAddr>,

    /// Address the containers in host networking mode share with the host
    #[clap(long)]
    pub host_ip: Option<IpAddr>,

    /// Port the proxy listens on
    #[clap(long)]
    pub app_port: Option<u16>,

    /// IP address containers use to reach the credentials endpoint
    #[clap(long)]
    pub aws_container_credentials_ip: Option<IpAddr>,

    /// Base url of the credentials backend
    #[clap(long)]
    pub credentials_url: Option<String>,

    /// Environment variable prefix holding the job id, like TARDIS_SCHID=
    #[clap(long, alias = "mesos-2-iam-prefix")]
    pub job_id_prefix: Option<String>,

    /// How the process holding a local port is found in host mode
    #[clap(long, value_enum)]
    pub process_lookup: Option<ProcessLookupKind>,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host_ip: self.host_ip,
            listening_ip: self.listening_ip,
            server_port: self.app_port,
            aws_container_credentials_ip: self.aws_container_credentials_ip,
            credentials_url: self.credentials_url.clone(),
            job_id_prefix: self.job_id_prefix.clone(),
            process_lookup: self.process_lookup,
            // boolean switches can only turn things on
            iptables: self.iptables.then_some(true),
            verbose: self.verbose.then_some(true),
        }
    }
}
