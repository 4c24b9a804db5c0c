// ── Credential and version resolution ──
//
// Pure three-tier cascade: target override → global default → built-in
// default, applied field by field so precedence stays auditable. The
// security level is re-derived from the RESOLVED secrets — it is never
// inherited as a field of its own, so a target that overrides one
// secret cannot accidentally keep the global block's level.

use ifpulse_snmp::{
    AuthProtocol, CredentialIdentity, PrivProtocol, SecurityLevel, SnmpVersion, UsmUser,
};

use crate::config::{
    CredentialSpec, GlobalDefaults, InterfaceSpec, TargetSpec, DEFAULT_COMMUNITY, DEFAULT_PORT,
};
use crate::error::CoreError;
use crate::model::Target;

const DEFAULT_VERSION: SnmpVersion = SnmpVersion::V2c;
const DEFAULT_AUTH_PROTOCOL: AuthProtocol = AuthProtocol::Sha;
const DEFAULT_PRIV_PROTOCOL: PrivProtocol = PrivProtocol::Aes128;

/// Resolve one device-interface pair into a pollable [`Target`].
///
/// Pure function of its inputs; called once per configured interface at
/// startup (and again on config reload). Fails with a `Config` error
/// naming the target when the resolved version requires fields that
/// remain unset.
pub fn resolve_target(
    defaults: &GlobalDefaults,
    spec: &TargetSpec,
    interface: &InterfaceSpec,
    group: &str,
) -> Result<Target, CoreError> {
    let version = spec.version.or(defaults.version).unwrap_or(DEFAULT_VERSION);
    let port = spec.port.or(defaults.port).unwrap_or(DEFAULT_PORT);

    let identity = match version {
        SnmpVersion::V1 | SnmpVersion::V2c => CredentialIdentity::Community(
            spec.community
                .clone()
                .or_else(|| defaults.community.clone())
                .unwrap_or_else(|| DEFAULT_COMMUNITY.to_owned()),
        ),
        SnmpVersion::V3 => resolve_usm(defaults, spec)?,
    };

    Ok(Target {
        key: format!("{}:{}", spec.host, interface),
        group: group.to_owned(),
        host: spec.host.clone(),
        port,
        version,
        identity,
        interface: interface.clone(),
        label: spec.label.clone().unwrap_or_else(|| spec.host.clone()),
    })
}

/// Cascade one credential field: target block → global block.
fn field<T>(
    target: Option<&CredentialSpec>,
    global: Option<&CredentialSpec>,
    pick: impl Fn(&CredentialSpec) -> Option<T>,
) -> Option<T> {
    target.and_then(&pick).or_else(|| global.and_then(&pick))
}

fn resolve_usm(defaults: &GlobalDefaults, spec: &TargetSpec) -> Result<CredentialIdentity, CoreError> {
    let target = spec.credentials.as_ref();
    let global = defaults.credentials.as_ref();

    let username = field(target, global, |c| c.username.clone())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| {
            CoreError::config(&spec.host, "version 3 requires a credential block with a username")
        })?;

    let auth_protocol =
        field(target, global, |c| c.auth_protocol).unwrap_or(DEFAULT_AUTH_PROTOCOL);
    let priv_protocol =
        field(target, global, |c| c.priv_protocol).unwrap_or(DEFAULT_PRIV_PROTOCOL);
    let auth_secret = field(target, global, |c| c.auth_secret.clone());
    let priv_secret = field(target, global, |c| c.priv_secret.clone());

    // Derive the security level from what is actually present. A priv
    // secret without an auth secret cannot be satisfied at any level —
    // fail loudly instead of silently downgrading.
    let security_level = match (&auth_secret, &priv_secret) {
        (Some(_), Some(_)) => SecurityLevel::AuthPriv,
        (Some(_), None) => SecurityLevel::AuthNoPriv,
        (None, None) => SecurityLevel::NoAuthNoPriv,
        (None, Some(_)) => {
            return Err(CoreError::config(
                &spec.host,
                "privacy secret configured without an authentication secret",
            ));
        }
    };

    Ok(CredentialIdentity::UsmUser(UsmUser {
        username,
        auth_protocol,
        auth_secret,
        priv_protocol,
        priv_secret,
        security_level,
    }))
}
