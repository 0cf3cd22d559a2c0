//! Record extraction from a parsed profile tree.
//!
//! Entries with unusable addresses are skipped with a warning; a profile with
//! a few bad members still yields everything else.

use std::net::Ipv4Addr;

use policy_core::{
    network_of, parse_ipv4, prefix_from_mask_with, AddressGroup, AddressMember, Alias,
    AliasMember, Builtin, Cidr, Interface, MaskPolicy, NatFlags, OverlayNode, PolicyNode,
};
use tracing::warn;

use super::tree::ProfileNode;
use crate::settings::Settings;

const MEMBER_HOST: &str = "1";
const MEMBER_NETWORK: &str = "2";
const MEMBER_RANGE: &str = "3";

const ALIAS_MEMBER_ADDRESS: &str = "1";
const ALIAS_MEMBER_ALIAS: &str = "2";

pub fn interfaces(root: &ProfileNode, settings: &Settings) -> Vec<Interface> {
    let policy = settings.mask_policy();
    root.list("interface-list", "interface")
        .filter_map(|node| {
            let Some(name) = node.text_of("name") else {
                warn!("skipping interface without a name");
                return None;
            };
            let zone = settings.zone_for(node.text_of("if-property").unwrap_or_default());
            let mut cidrs = Vec::new();
            cidrs.extend(interface_cidr(name, node, policy));
            for secondary in node.list("secondary-ip-list", "secondary-ip") {
                cidrs.extend(interface_cidr(name, secondary, policy));
            }
            let vlan = node.text_of("vlan-id").and_then(|text| match text.parse::<u16>() {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!(interface = name, vlan = text, "ignoring invalid vlan id");
                    None
                }
            });
            Some(Interface {
                name: name.to_string(),
                zone,
                cidrs,
                vlan,
            })
        })
        .collect()
}

fn interface_cidr(name: &str, node: &ProfileNode, policy: MaskPolicy) -> Option<Cidr> {
    let ip = node.text_of("ip")?;
    let mask = node.text_of("netmask").unwrap_or("32");
    match address_with_mask(ip, mask, policy) {
        Ok(cidr) => Some(cidr),
        Err(err) => {
            warn!(interface = name, ip, mask, %err, "skipping interface address");
            None
        }
    }
}

pub fn address_groups(root: &ProfileNode, settings: &Settings) -> Vec<AddressGroup> {
    let policy = settings.mask_policy();
    root.list("address-group-list", "address-group")
        .filter_map(|node| {
            let name = node.text_of("name")?;
            let members = node
                .list("addr-group-member", "member")
                .filter_map(|member| group_member(name, member, policy))
                .collect();
            Some(AddressGroup {
                name: name.to_string(),
                members,
            })
        })
        .collect()
}

fn group_member(group: &str, node: &ProfileNode, policy: MaskPolicy) -> Option<AddressMember> {
    match node.text_of("type").unwrap_or_default() {
        MEMBER_HOST => {
            let text = node.text_of("host-ip-addr").unwrap_or_default();
            match parse_ipv4(text) {
                Ok(ip) => Some(AddressMember::Host(Ipv4Addr::from(ip))),
                Err(err) => {
                    warn!(group, host = text, %err, "skipping group host");
                    None
                }
            }
        }
        MEMBER_NETWORK => {
            let ip = node.text_of("ip-network-addr").unwrap_or_default();
            let mask = node.text_of("ip-mask").unwrap_or_default();
            match address_with_mask(ip, mask, policy) {
                Ok(cidr) => Some(AddressMember::Network(cidr)),
                Err(err) => {
                    warn!(group, ip, mask, %err, "skipping group network");
                    None
                }
            }
        }
        MEMBER_RANGE => {
            warn!(group, "address ranges are not supported; skipping member");
            None
        }
        other => {
            warn!(group, kind = other, "skipping group member of unknown type");
            None
        }
    }
}

pub fn aliases(root: &ProfileNode) -> Vec<Alias> {
    root.list("alias-list", "alias")
        .filter_map(|node| {
            let name = node.text_of("name")?;
            let members = node
                .list("alias-member-list", "alias-member")
                .filter_map(|member| alias_member(name, member))
                .collect();
            Some(Alias {
                name: name.to_string(),
                members,
            })
        })
        .collect()
}

fn alias_member(alias: &str, node: &ProfileNode) -> Option<AliasMember> {
    match node.text_of("type").unwrap_or_default() {
        ALIAS_MEMBER_ALIAS => match node.text_of("alias-name") {
            Some(target) => Some(AliasMember::Alias(target.to_string())),
            None => {
                warn!(alias, "skipping alias reference without a name");
                None
            }
        },
        ALIAS_MEMBER_ADDRESS => {
            let address = node.text_of("address").unwrap_or("Any");
            if address.eq_ignore_ascii_case("any") {
                return Some(bound_any(node.text_of("interface")));
            }
            Some(match Builtin::from_name(address) {
                Some(builtin) => AliasMember::Builtin(builtin),
                None => AliasMember::AddressGroup(address.to_string()),
            })
        }
        other => {
            warn!(alias, kind = other, "skipping alias member of unknown type");
            None
        }
    }
}

/// "Any" bound to whatever the member's `interface` names.
fn bound_any(interface: Option<&str>) -> AliasMember {
    let unbound = AliasMember::InterfaceAny {
        interface: None,
        zone: None,
    };
    let Some(interface) = interface else {
        return unbound;
    };
    match Builtin::from_name(interface) {
        Some(Builtin::Any) => unbound,
        Some(Builtin::Zone(zone)) => AliasMember::InterfaceAny {
            interface: None,
            zone: Some(zone),
        },
        Some(Builtin::Device) => AliasMember::Builtin(Builtin::Device),
        None => AliasMember::InterfaceAny {
            interface: Some(interface.to_string()),
            zone: None,
        },
    }
}

pub fn policies(root: &ProfileNode) -> Vec<PolicyNode> {
    root.list("policy-list", "policy")
        .filter_map(|node| {
            let name = node.text_of("name")?;
            Some(PolicyNode {
                name: name.to_string(),
                id: node.text_of("id").map(str::to_string),
                service: node.text_of("service").map(str::to_string),
                from: refs(node, "from-alias-list"),
                to: refs(node, "to-alias-list"),
                nat: NatFlags {
                    dnat: flag(node, "dnat-enabled"),
                    one_to_one: flag(node, "one-to-one-nat"),
                },
            })
        })
        .collect()
}

pub fn overlays(root: &ProfileNode) -> Vec<OverlayNode> {
    root.list("abs-policy-list", "abs-policy")
        .filter_map(|node| {
            let name = node.text_of("name")?;
            Some(OverlayNode {
                name: name.to_string(),
                from: refs(node, "from-alias-list"),
                to: refs(node, "to-alias-list"),
                targets: node
                    .list("policy-list", "policy")
                    .map(|target| target.text.clone())
                    .filter(|target| !target.is_empty())
                    .collect(),
            })
        })
        .collect()
}

fn refs(node: &ProfileNode, wrapper: &str) -> Vec<String> {
    node.list(wrapper, "alias")
        .map(|alias| alias.text.clone())
        .filter(|alias| !alias.is_empty())
        .collect()
}

fn flag(node: &ProfileNode, tag: &str) -> bool {
    matches!(
        node.text_of(tag).map(str::to_ascii_lowercase).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

fn address_with_mask(
    ip: &str,
    mask: &str,
    policy: MaskPolicy,
) -> Result<Cidr, policy_core::AddrError> {
    let ip = parse_ipv4(ip)?;
    let prefix = prefix_from_mask_with(mask, policy)?;
    Ok(network_of(ip, prefix))
}
