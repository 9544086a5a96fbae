//! NAT rules sending metadata traffic to the proxy.
//!
//! Containers call the well known credentials address on port 80. Two rules
//! send that traffic to the proxy: PREROUTING covers bridged containers and
//! OUTPUT covers processes on the host network. Both go to the head of their
//! chain, ahead of anything the container runtime installs.

mod iptables;

use anyhow::Result;
use std::fmt;
use std::net::IpAddr;
use tracing::{debug, info};

pub use iptables::IptablesNatTable;

const METADATA_PORT: u16 = mesos2iam_common::constants::METADATA_PORT;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NatRule {
    pub chain: &'static str,
    pub spec: Vec<String>,
}

impl fmt::Display for NatRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "nat {} {}", self.chain, self.spec.join(" "))
    }
}

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

pub fn interception_rules(metadata_ip: IpAddr, host_ip: IpAddr, port: u16) -> [NatRule; 2] {
    let metadata_ip = metadata_ip.to_string();
    let metadata_port = METADATA_PORT.to_string();
    let port = port.to_string();

    [
        NatRule {
            chain: "PREROUTING",
            spec: args(&[
                "-p",
                "tcp",
                "-d",
                &metadata_ip,
                "--dport",
                &metadata_port,
                "-j",
                "DNAT",
                "--to-destination",
                &format!("{host_ip}:{port}"),
            ]),
        },
        NatRule {
            chain: "OUTPUT",
            spec: args(&[
                "-p",
                "tcp",
                "-m",
                "tcp",
                "-d",
                &metadata_ip,
                "--dport",
                &metadata_port,
                "-j",
                "REDIRECT",
                "--to-ports",
                &port,
            ]),
        },
    ]
}

#[cfg_attr(test, mockall::automock)]
pub trait NatTable {
    fn contains(&self, rule: &NatRule) -> Result<bool>;

    /// Inserts at position 1 of the rule's chain.
    fn insert_first(&self, rule: &NatRule) -> Result<()>;
}

/// Inserts the rules that are missing. Returns how many were added.
pub fn ensure_rules(table: &dyn NatTable, rules: &[NatRule]) -> Result<usize> {
    let mut inserted = 0;
    for rule in rules {
        if table.contains(rule)? {
            debug!("NAT rule already present: {}", rule);
            continue;
        }
        table.insert_first(rule)?;
        info!("Added NAT rule: {}", rule);
        inserted += 1;
    }
    Ok(inserted)
}
