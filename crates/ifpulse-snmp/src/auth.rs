// ── Polling identity types ──
//
// Who we are when we talk to an agent. A `CredentialIdentity` is the
// fully resolved credential material for one target; resolution itself
// (the target/global/default cascade) happens upstream in ifpulse-core.

use secrecy::{ExposeSecret, SecretString};
use strum::{Display, EnumString};

/// SNMP protocol version of a target.
///
/// Three tiers, matching the three credential shapes we support:
/// v1 and v2c carry a community string, v3 carries a USM user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum SnmpVersion {
    #[strum(serialize = "1")]
    V1,
    #[strum(serialize = "2c")]
    V2c,
    #[strum(serialize = "3")]
    V3,
}

/// USM authentication digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum AuthProtocol {
    #[strum(serialize = "sha")]
    Sha,
    #[strum(serialize = "md5")]
    Md5,
}

/// USM privacy (encryption) cipher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum PrivProtocol {
    #[strum(serialize = "aes128", serialize = "aes")]
    Aes128,
    #[strum(serialize = "des")]
    Des,
}

/// USM security level.
///
/// Always DERIVED from which secrets are present on the resolved user —
/// never configured directly. A priv secret implies auth+priv; an auth
/// secret alone implies auth-only; neither means unauthenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityLevel {
    NoAuthNoPriv,
    AuthNoPriv,
    AuthPriv,
}

impl SecurityLevel {
    /// RFC 3411 wire name, used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoAuthNoPriv => "noAuthNoPriv",
            Self::AuthNoPriv => "authNoPriv",
            Self::AuthPriv => "authPriv",
        }
    }
}

/// A fully resolved USM (v3) user.
///
/// Invariant (enforced by the resolver, relied on here): the secrets
/// present match `security_level` — `AuthPriv` has both secrets,
/// `AuthNoPriv` has an auth secret, `NoAuthNoPriv` has neither.
#[derive(Debug, Clone)]
pub struct UsmUser {
    pub username: String,
    pub auth_protocol: AuthProtocol,
    pub auth_secret: Option<SecretString>,
    pub priv_protocol: PrivProtocol,
    pub priv_secret: Option<SecretString>,
    pub security_level: SecurityLevel,
}

/// The resolved credential material for one target.
#[derive(Debug, Clone)]
pub enum CredentialIdentity {
    /// v1/v2c community string.
    Community(String),
    /// v3 user-based security.
    UsmUser(UsmUser),
}

impl CredentialIdentity {
    /// Stable fingerprint for session-cache keying.
    ///
    /// Two identities with the same fingerprint may share a cached
    /// session, so every field that affects the wire exchange —
    /// including secret material — participates.
    pub fn fingerprint(&self) -> String {
        match self {
            Self::Community(community) => format!("c/{community}"),
            Self::UsmUser(user) => format!(
                "u/{}/{}/{}/{}/{}/{}",
                user.username,
                user.security_level.as_str(),
                user.auth_protocol,
                user.auth_secret
                    .as_ref()
                    .map_or("", |s| s.expose_secret()),
                user.priv_protocol,
                user.priv_secret
                    .as_ref()
                    .map_or("", |s| s.expose_secret()),
            ),
        }
    }
}
