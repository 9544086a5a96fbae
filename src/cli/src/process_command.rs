use crate::commands::Cli;
use crate::interception::{ensure_rules, interception_rules, IptablesNatTable};
use anyhow::{Context, Result};
use clap::Parser;
use mesos2iam_common::config::ConfigLoader;
use mesos2iam_common::logging::setup_logging;
use mesos2iam_daemon::run;
use tracing::info;

pub fn process_cli() -> Result<()> {
    // stays sync: the daemon starts its own runtime
    let cli = Cli::parse();
    let config = ConfigLoader::load(cli.config.as_deref(), &cli.overrides())?;

    setup_logging(config.verbose, config.log_dir.as_deref())?;
    info!("Starting mesos2iam {}", env!("CARGO_PKG_VERSION"));

    if config.iptables {
        let rules = interception_rules(
            config.aws_container_credentials_ip,
            config.host_ip,
            config.server_port,
        );
        let inserted = ensure_rules(&IptablesNatTable::new(), &rules)
            .context("Failed to set up iptables rules")?;
        info!("{} of {} NAT rules added", inserted, rules.len());
    }

    run(config)
}
