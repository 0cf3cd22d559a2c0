//! Interface and zone lookup tables.

use std::collections::BTreeMap;

use crate::addr::Cidr;
use crate::model::{Interface, Zone};

/// Lookup structure built once from the extracted interface list.
///
/// Zone buckets concatenate interface CIDRs in interface-list order and may
/// contain duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Domain {
    interfaces: Vec<Interface>,
    by_interface: BTreeMap<String, usize>,
    by_zone: BTreeMap<Zone, Vec<Cidr>>,
}

impl Domain {
    /// Build the lookup tables. A repeated interface name keeps its first entry.
    pub fn build(interfaces: Vec<Interface>) -> Domain {
        let mut by_interface = BTreeMap::new();
        let mut by_zone: BTreeMap<Zone, Vec<Cidr>> = BTreeMap::new();
        for (idx, iface) in interfaces.iter().enumerate() {
            by_interface.entry(iface.name.clone()).or_insert(idx);
            by_zone
                .entry(iface.zone)
                .or_default()
                .extend(iface.cidrs.iter().copied());
        }
        Domain {
            interfaces,
            by_interface,
            by_zone,
        }
    }

    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }

    pub fn interface(&self, name: &str) -> Option<&Interface> {
        self.by_interface.get(name).map(|&idx| &self.interfaces[idx])
    }

    pub fn interface_cidrs(&self, name: &str) -> Option<&[Cidr]> {
        self.interface(name).map(|iface| iface.cidrs.as_slice())
    }

    pub fn zone_of(&self, name: &str) -> Option<Zone> {
        self.interface(name).map(|iface| iface.zone)
    }

    /// CIDRs of every interface in `zone`; empty when the zone has none.
    pub fn zone_cidrs(&self, zone: Zone) -> &[Cidr] {
        self.by_zone.get(&zone).map(Vec::as_slice).unwrap_or(&[])
    }

    /// CIDRs of every interface, in interface order.
    pub fn all_cidrs(&self) -> impl Iterator<Item = &Cidr> + '_ {
        self.interfaces.iter().flat_map(|iface| iface.cidrs.iter())
    }
}
