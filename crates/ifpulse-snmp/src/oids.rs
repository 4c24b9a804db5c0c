// ── IF-MIB object identifiers ──
//
// Columnar OIDs are stored without the instance suffix; append the
// ifIndex with `indexed()` before issuing a GET.

/// ifDescr — interface description (ifTable).
pub const IF_DESCR: &[u64] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 2];
/// ifOperStatus — 1=up, 2=down, 3=testing (ifTable).
pub const IF_OPER_STATUS: &[u64] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 8];
/// ifInOctets — 32-bit inbound octet counter (ifTable).
pub const IF_IN_OCTETS: &[u64] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 10];
/// ifOutOctets — 32-bit outbound octet counter (ifTable).
pub const IF_OUT_OCTETS: &[u64] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 16];

/// ifName — interface name (ifXTable).
pub const IF_NAME: &[u64] = &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 1];
/// ifHCInOctets — 64-bit inbound octet counter (ifXTable).
pub const IF_HC_IN_OCTETS: &[u64] = &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 6];
/// ifHCOutOctets — 64-bit outbound octet counter (ifXTable).
pub const IF_HC_OUT_OCTETS: &[u64] = &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 10];
/// ifHighSpeed — interface speed in Mbit/s (ifXTable).
pub const IF_HIGH_SPEED: &[u64] = &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 15];
/// ifAlias — operator-assigned interface description (ifXTable).
pub const IF_ALIAS: &[u64] = &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 18];

/// Append an instance index to a columnar OID.
pub fn indexed(base: &[u64], if_index: u32) -> Vec<u64> {
    let mut oid = Vec::with_capacity(base.len() + 1);
    oid.extend_from_slice(base);
    oid.push(u64::from(if_index));
    oid
}

/// Render an OID in dotted notation for logs and error messages.
pub fn dotted(oid: &[u64]) -> String {
    oid.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}
