use super::{NatRule, NatTable};
use anyhow::{bail, Context, Result};
use nix::unistd::Uid;
use std::process::{Command, Output};

/// `iptables -t nat`, through `sudo -n` when not running as root.
pub struct IptablesNatTable {
    use_sudo: bool,
}

impl Default for IptablesNatTable {
    fn default() -> Self {
        Self::new()
    }
}

impl IptablesNatTable {
    pub fn new() -> Self {
        Self {
            use_sudo: !Uid::effective().is_root(),
        }
    }

    fn run(&self, args: Vec<String>) -> Result<Output> {
        let mut command = if self.use_sudo {
            let mut command = Command::new("sudo");
            command.args(["-n", "iptables"]);
            command
        } else {
            Command::new("iptables")
        };
        command
            .args(&args)
            .output()
            .with_context(|| format!("Failed to run iptables {}", args.join(" ")))
    }
}

fn check_args(rule: &NatRule) -> Vec<String> {
    let mut args = vec!["-t".to_string(), "nat".into(), "-C".into(), rule.chain.into()];
    args.extend(rule.spec.iter().cloned());
    args
}

fn insert_args(rule: &NatRule) -> Vec<String> {
    let mut args = vec![
        "-t".to_string(),
        "nat".into(),
        "-I".into(),
        rule.chain.into(),
        "1".into(),
    ];
    args.extend(rule.spec.iter().cloned());
    args
}

impl NatTable for IptablesNatTable {
    fn contains(&self, rule: &NatRule) -> Result<bool> {
        let output = self.run(check_args(rule))?;
        match output.status.code() {
            Some(0) => Ok(true),
            // "Bad rule (does a matching rule exist in that chain?)"
            Some(1) => Ok(false),
            _ => bail!(
                "iptables could not check rule {}: {}",
                rule,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        }
    }

    fn insert_first(&self, rule: &NatRule) -> Result<()> {
        let output = self.run(insert_args(rule))?;
        if !output.status.success() {
            bail!(
                "iptables could not insert rule {}: {}",
                rule,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}
