//! Records handed to the engine by the extraction layer, and the canonical
//! policy record it hands back.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::addr::Cidr;

/// Coarse trust category of an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Trusted,
    Optional,
    External,
    /// Custom or unclassified interfaces.
    Custom,
}

impl Zone {
    pub const ALL: [Zone; 4] = [Zone::Trusted, Zone::Optional, Zone::External, Zone::Custom];

    /// Map a zone label to a zone. Unknown labels are `Custom`.
    pub fn from_label(label: &str) -> Zone {
        match label.trim().to_ascii_lowercase().as_str() {
            "trusted" => Zone::Trusted,
            "optional" => Zone::Optional,
            "external" => Zone::External,
            _ => Zone::Custom,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Trusted => "trusted",
            Zone::Optional => "optional",
            Zone::External => "external",
            Zone::Custom => "custom",
        }
    }
}

impl Display for Zone {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference names with fixed meaning on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    /// Every address behind every interface.
    Any,
    /// Every address behind the interfaces of one zone.
    Zone(Zone),
    /// The device itself. It has no address space of its own.
    Device,
}

impl Builtin {
    /// Look up a builtin by name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Builtin> {
        let lowered = name.trim().to_ascii_lowercase();
        let builtin = match lowered.as_str() {
            "any" => Builtin::Any,
            "any-trusted" => Builtin::Zone(Zone::Trusted),
            "any-optional" => Builtin::Zone(Zone::Optional),
            "any-external" => Builtin::Zone(Zone::External),
            "any-custom" => Builtin::Zone(Zone::Custom),
            "firebox" => Builtin::Device,
            _ => return None,
        };
        Some(builtin)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Any => "Any",
            Builtin::Zone(Zone::Trusted) => "Any-Trusted",
            Builtin::Zone(Zone::Optional) => "Any-Optional",
            Builtin::Zone(Zone::External) => "Any-External",
            Builtin::Zone(Zone::Custom) => "Any-Custom",
            Builtin::Device => "Firebox",
        }
    }
}

/// A device interface with its addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interface {
    pub name: String,
    pub zone: Zone,
    /// Primary address first, then secondaries.
    pub cidrs: Vec<Cidr>,
    pub vlan: Option<u16>,
}

/// One entry of an address-group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMember {
    Host(Ipv4Addr),
    Network(Cidr),
}

/// A flat, named list of hosts and networks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressGroup {
    pub name: String,
    pub members: Vec<AddressMember>,
}

/// One entry of an alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasMember {
    /// Another alias, by name.
    Alias(String),
    /// An address-group, by name.
    AddressGroup(String),
    /// "Any" restricted to an interface or zone. Neither set means everything.
    InterfaceAny {
        interface: Option<String>,
        zone: Option<Zone>,
    },
    Builtin(Builtin),
}

impl AliasMember {
    /// Name used to prefix notes raised while expanding this member.
    pub fn label(&self) -> String {
        match self {
            AliasMember::Alias(name) | AliasMember::AddressGroup(name) => name.clone(),
            AliasMember::InterfaceAny {
                interface: Some(iface),
                ..
            } => format!("Any@{iface}"),
            AliasMember::InterfaceAny {
                interface: None,
                zone: Some(zone),
            } => format!("Any@{zone}"),
            AliasMember::InterfaceAny {
                interface: None,
                zone: None,
            } => "Any".to_string(),
            AliasMember::Builtin(builtin) => builtin.name().to_string(),
        }
    }
}

/// A named, possibly recursive reference list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub name: String,
    pub members: Vec<AliasMember>,
}

pub type AliasTable = BTreeMap<String, Alias>;
pub type GroupTable = BTreeMap<String, AddressGroup>;

/// Read-only alias and address-group tables of one loaded configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileTables {
    pub aliases: AliasTable,
    pub groups: GroupTable,
}

impl ProfileTables {
    /// Build the tables. When a name repeats, the first definition wins.
    pub fn new(
        aliases: impl IntoIterator<Item = Alias>,
        groups: impl IntoIterator<Item = AddressGroup>,
    ) -> Self {
        let mut out = ProfileTables::default();
        for alias in aliases {
            out.aliases.entry(alias.name.clone()).or_insert(alias);
        }
        for group in groups {
            out.groups.entry(group.name.clone()).or_insert(group);
        }
        out
    }
}

/// NAT features switched on for a policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatFlags {
    #[serde(default)]
    pub dnat: bool,
    #[serde(default)]
    pub one_to_one: bool,
}

impl NatFlags {
    pub fn is_empty(&self) -> bool {
        !self.dnat && !self.one_to_one
    }
}

/// A firewall policy before its endpoints are resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyNode {
    pub name: String,
    /// Explicit identifier from the export, if any.
    pub id: Option<String>,
    pub service: Option<String>,
    pub from: Vec<String>,
    pub to: Vec<String>,
    pub nat: NatFlags,
}

impl PolicyNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Stable identifier: the explicit id, else the name.
    pub fn id(&self) -> &str {
        match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id,
            _ => &self.name,
        }
    }
}

/// An abs-policy: replacement endpoint lists applied to existing policies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayNode {
    pub name: String,
    pub from: Vec<String>,
    pub to: Vec<String>,
    /// Names of the base policies this overlay applies to.
    pub targets: Vec<String>,
}

/// Canonical, resolved policy record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedPolicy {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub from_refs: Vec<String>,
    #[serde(default)]
    pub to_refs: Vec<String>,
    #[serde(default)]
    pub src_cidrs: BTreeSet<Cidr>,
    #[serde(default)]
    pub dst_cidrs: BTreeSet<Cidr>,
    #[serde(default)]
    pub src_hosts: BTreeSet<Ipv4Addr>,
    #[serde(default)]
    pub dst_hosts: BTreeSet<Ipv4Addr>,
    /// Which ingestion source produced the record.
    #[serde(default)]
    pub origin: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nat: Option<NatFlags>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}
