// ── Interface discovery ──
//
// Walks the interface naming columns once per device: ifName is the
// preferred key, ifDescr fills gaps for devices with older naming
// conventions, ifAlias carries the operator-assigned description.
// Used at poller startup to resolve configured interface names to
// ifIndex values, and by the one-shot discover mode.

use std::collections::BTreeMap;

use tracing::warn;

use crate::error::SnmpError;
use crate::oids;
use crate::session::Session;

/// Name/index/alias maps for one device, built from a single discovery
/// pass. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct InterfaceTable {
    /// Lookup key: interface name (ifName, with ifDescr filling gaps).
    by_name: BTreeMap<String, u32>,
    /// Canonical display name per ifIndex.
    names: BTreeMap<u32, String>,
    /// Operator-assigned ifAlias per ifIndex, where non-empty.
    aliases: BTreeMap<u32, String>,
}

impl InterfaceTable {
    /// Merge the three walked columns into one table.
    ///
    /// ifName wins for both display and lookup; ifDescr entries are
    /// added only where they do not collide with an existing name.
    pub fn from_columns(
        names: BTreeMap<u32, String>,
        descrs: BTreeMap<u32, String>,
        aliases: BTreeMap<u32, String>,
    ) -> Self {
        let mut by_name = BTreeMap::new();
        let mut canonical = BTreeMap::new();

        for (idx, name) in &names {
            by_name.insert(name.clone(), *idx);
            canonical.insert(*idx, name.clone());
        }
        for (idx, descr) in &descrs {
            by_name.entry(descr.clone()).or_insert(*idx);
            canonical.entry(*idx).or_insert_with(|| descr.clone());
        }

        let aliases = aliases
            .into_iter()
            .filter(|(_, alias)| !alias.is_empty())
            .collect();

        Self {
            by_name,
            names: canonical,
            aliases,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Resolve a configured interface name to its ifIndex.
    pub fn index_of(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    /// Canonical display name for an ifIndex.
    pub fn name_of(&self, if_index: u32) -> Option<&str> {
        self.names.get(&if_index).map(String::as_str)
    }

    /// Operator-assigned alias for an ifIndex, if any.
    pub fn alias_of(&self, if_index: u32) -> Option<&str> {
        self.aliases.get(&if_index).map(String::as_str)
    }

    /// All known interface names, sorted — logged when a configured
    /// name fails to resolve so the operator can fix the config.
    pub fn available_names(&self) -> Vec<&str> {
        self.by_name.keys().map(String::as_str).collect()
    }

    /// Iterate (ifIndex, name, alias) in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str, Option<&str>)> {
        self.names
            .iter()
            .map(|(idx, name)| (*idx, name.as_str(), self.alias_of(*idx)))
    }
}

/// Walk the naming columns of one device and build its table.
///
/// A failed ifName walk degrades to ifDescr; only when both walks fail
/// outright does the error propagate. Empty-but-successful walks yield
/// an empty table — the caller decides how loudly to complain.
pub async fn walk_interfaces(session: &Session) -> Result<InterfaceTable, SnmpError> {
    let endpoint = session.endpoint().to_owned();

    let (names, names_err) = match session.walk_column(oids::IF_NAME).await {
        Ok(map) => (map, None),
        Err(e) => {
            warn!(endpoint = %endpoint, error = %e, "ifName walk failed");
            (BTreeMap::new(), Some(e))
        }
    };
    let (descrs, descrs_err) = match session.walk_column(oids::IF_DESCR).await {
        Ok(map) => (map, None),
        Err(e) => {
            warn!(endpoint = %endpoint, error = %e, "ifDescr walk failed");
            (BTreeMap::new(), Some(e))
        }
    };

    if names.is_empty() && descrs.is_empty() {
        if let (Some(_), Some(e)) = (names_err, descrs_err) {
            return Err(e);
        }
        warn!(endpoint = %endpoint, "no interfaces found via ifName or ifDescr");
    }

    // Aliases are cosmetic — ignore walk failures entirely.
    let aliases = session
        .walk_column(oids::IF_ALIAS)
        .await
        .unwrap_or_default();

    Ok(InterfaceTable::from_columns(names, descrs, aliases))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(u32, &str)]) -> BTreeMap<u32, String> {
        entries
            .iter()
            .map(|(idx, name)| (*idx, (*name).to_owned()))
            .collect()
    }

    #[test]
    fn if_name_wins_over_if_descr() {
        let table = InterfaceTable::from_columns(
            map(&[(1, "Ethernet1")]),
            map(&[(1, "Gig0/1"), (2, "Gig0/2")]),
            BTreeMap::new(),
        );
        assert_eq!(table.index_of("Ethernet1"), Some(1));
        assert_eq!(table.name_of(1), Some("Ethernet1"));
        // ifDescr fills the row ifName didn't have
        assert_eq!(table.index_of("Gig0/2"), Some(2));
        assert_eq!(table.name_of(2), Some("Gig0/2"));
    }

    #[test]
    fn descr_only_devices_still_resolve() {
        let table = InterfaceTable::from_columns(
            BTreeMap::new(),
            map(&[(3, "eth0")]),
            BTreeMap::new(),
        );
        assert_eq!(table.index_of("eth0"), Some(3));
    }

    #[test]
    fn empty_aliases_are_dropped() {
        let table = InterfaceTable::from_columns(
            map(&[(1, "Ethernet1"), (2, "Ethernet2")]),
            BTreeMap::new(),
            map(&[(1, "uplink to core"), (2, "")]),
        );
        assert_eq!(table.alias_of(1), Some("uplink to core"));
        assert_eq!(table.alias_of(2), None);
    }

    #[test]
    fn available_names_are_sorted() {
        let table = InterfaceTable::from_columns(
            map(&[(2, "b"), (1, "a"), (3, "c")]),
            BTreeMap::new(),
            BTreeMap::new(),
        );
        assert_eq!(table.available_names(), vec!["a", "b", "c"]);
    }
}
