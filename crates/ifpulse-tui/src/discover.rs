//! One-shot interface discovery.
//!
//! Walks a device's ifName/ifDescr/ifAlias tables and prints a
//! ready-to-edit YAML config skeleton on stdout (the interface listing
//! goes to stderr, so the skeleton can be piped straight into a file).

use std::path::Path;
use std::time::Duration;

use color_eyre::eyre::{Result, WrapErr, eyre};

use ifpulse_config::{RawConfig, RawGroup, RawInterface, RawTarget};
use ifpulse_core::{
    CredentialIdentity, InterfaceSpec, SnmpClient, SnmpVersion, TargetSpec, resolve,
};

pub async fn run(
    config_path: &Path,
    host: &str,
    community: &str,
    version: &str,
    port: u16,
) -> Result<()> {
    let version: SnmpVersion = version
        .trim()
        .parse()
        .map_err(|_| eyre!("unknown SNMP version {version:?} (use 1, 2c, or 3)"))?;

    let identity = match version {
        SnmpVersion::V1 | SnmpVersion::V2c => CredentialIdentity::Community(community.to_owned()),
        SnmpVersion::V3 => {
            // v3 needs real credentials — take them from the profile's
            // global block via the normal resolution cascade.
            let config = ifpulse_config::load(config_path)
                .wrap_err("version 3 discovery reads its credentials from the config file")?;
            let spec = TargetSpec {
                host: host.to_owned(),
                label: None,
                version: Some(SnmpVersion::V3),
                community: None,
                port: Some(port),
                credentials: None,
                interfaces: vec![InterfaceSpec::Index(0)],
            };
            resolve::resolve_target(&config.defaults, &spec, &spec.interfaces[0], "discover")?
                .identity
        }
    };

    eprintln!("walking interface tables on {host}:{port} (v{version}) ...");

    let client = SnmpClient::new(Duration::from_secs(5));
    let table = client
        .interface_table(host, port, version, &identity)
        .await?;
    client.shutdown();

    if table.is_empty() {
        return Err(eyre!(
            "no interfaces found — is SNMP reachable on {host}:{port} with these credentials?"
        ));
    }

    let mut names = Vec::new();
    eprintln!("{:>7}  {:<24}  alias", "ifIndex", "name");
    for (if_index, name, alias) in table.iter() {
        eprintln!("{if_index:>7}  {name:<24}  {}", alias.unwrap_or(""));
        names.push(name.to_owned());
    }
    eprintln!();

    let skeleton = RawConfig {
        community: matches!(version, SnmpVersion::V1 | SnmpVersion::V2c)
            .then(|| community.to_owned()),
        version: Some(version.to_string()),
        port: (port != 161).then_some(port),
        groups: vec![RawGroup {
            name: Some("Discovered".to_owned()),
            targets: vec![RawTarget {
                host: Some(host.to_owned()),
                label: Some(host.to_owned()),
                interfaces: names.into_iter().map(RawInterface::Name).collect(),
                ..RawTarget::default()
            }],
        }],
        ..RawConfig::default()
    };

    println!("{}", serde_yaml::to_string(&skeleton)?);
    Ok(())
}
