//! Alias resolution.
//!
//! Expands a reference name into the concrete networks and hosts it stands
//! for. A name is looked up in this order:
//!
//! 1. **Builtins**: `Any`, the `Any-<zone>` names and `Firebox`
//! 2. **Aliases**: members expanded in order, recursively
//! 3. **Address-groups**: hosts and networks taken as-is
//!
//! ## Cycles
//!
//! Aliases may reference each other in loops. Each top-level call keeps the
//! set of aliases currently being expanded; a member that points back into that
//! set contributes nothing and records `Cycle detected at <alias>`, naming the
//! alias whose member closes the loop.
//!
//! Expansion runs on an explicit frame stack, so reference chains of any
//! depth resolve without growing the call stack. An alias that already
//! finished expanding in the current call is not expanded again: everything it
//! reaches is already part of the result.
//!
//! ## Notes
//!
//! Missing data never fails a resolution. It shows up as an empty
//! contribution plus a note. Notes raised by an alias member are prefixed with
//! that member's name; exact duplicates are dropped.

use std::collections::{BTreeSet, HashSet};
use std::net::Ipv4Addr;

use serde::Serialize;
use tracing::{debug, trace};

use crate::addr::Cidr;
use crate::domain::Domain;
use crate::model::{AddressGroup, AddressMember, Alias, AliasMember, Builtin, ProfileTables, Zone};

/// Note recorded when the device builtin is resolved.
pub const DEVICE_NOTE: &str = "device has no address space";

/// Concrete address space behind a reference name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedAlias {
    pub cidrs: BTreeSet<Cidr>,
    /// Hosts named individually by address-groups. Each is also in `cidrs` as a /32.
    pub hosts: BTreeSet<Ipv4Addr>,
    pub notes: Vec<String>,
}

impl ResolvedAlias {
    /// True when no networks or hosts were found.
    pub fn is_empty(&self) -> bool {
        self.cidrs.is_empty() && self.hosts.is_empty()
    }

    /// Union `other` into `self`, prefixing each of its notes with `member`.
    ///
    /// Notes that already end in `: <member>` are kept as they are.
    pub fn absorb_from(&mut self, member: &str, other: ResolvedAlias) {
        self.cidrs.extend(other.cidrs);
        self.hosts.extend(other.hosts);
        let suffix = format!(": {member}");
        for note in other.notes {
            let note = if note.ends_with(&suffix) {
                note
            } else {
                format!("{member}: {note}")
            };
            if !self.notes.contains(&note) {
                self.notes.push(note);
            }
        }
    }
}

/// Resolves reference names against one configuration snapshot.
///
/// The resolver only borrows its inputs. Rebuilding the [`Domain`] after
/// interfaces change means building a new resolver over it.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    domain: &'a Domain,
    tables: &'a ProfileTables,
}

enum Target<'a> {
    Builtin(Builtin),
    Alias(&'a Alias),
    Group(&'a AddressGroup),
    Missing,
}

struct Frame<'a> {
    alias: &'a Alias,
    next: usize,
}

/// State owned by one top-level resolution.
#[derive(Default)]
struct Expansion<'a> {
    stack: Vec<Frame<'a>>,
    on_path: HashSet<&'a str>,
    expanded_aliases: HashSet<&'a str>,
    expanded_groups: HashSet<&'a str>,
    expanded_builtins: HashSet<Builtin>,
    seen_notes: HashSet<String>,
    out: ResolvedAlias,
}

impl<'a> Expansion<'a> {
    fn enter(&mut self, alias: &'a Alias) {
        self.on_path.insert(alias.name.as_str());
        self.expanded_aliases.insert(alias.name.as_str());
        self.stack.push(Frame { alias, next: 0 });
    }

    fn note(&mut self, note: String) {
        if self.seen_notes.insert(note.clone()) {
            self.out.notes.push(note);
        }
    }

    fn extend_cidrs<'c>(&mut self, cidrs: impl IntoIterator<Item = &'c Cidr>) {
        self.out.cidrs.extend(cidrs.into_iter().copied());
    }
}

impl<'a> Resolver<'a> {
    pub fn new(domain: &'a Domain, tables: &'a ProfileTables) -> Self {
        Self { domain, tables }
    }

    pub fn domain(&self) -> &'a Domain {
        self.domain
    }

    pub fn tables(&self) -> &'a ProfileTables {
        self.tables
    }

    /// Resolve `name` into networks, hosts and diagnostic notes.
    pub fn resolve(&self, name: &str) -> ResolvedAlias {
        let mut run = Expansion::default();
        match self.lookup(name) {
            Target::Builtin(builtin) => self.apply_builtin(builtin, None, &mut run),
            Target::Alias(alias) => run.enter(alias),
            Target::Group(group) => self.apply_group(group, &mut run),
            Target::Missing => run.note(format!("alias not found: {name}")),
        }

        while let Some(frame) = run.stack.last_mut() {
            let alias = frame.alias;
            let idx = frame.next;
            frame.next += 1;
            match alias.members.get(idx) {
                Some(member) => self.apply_member(alias, member, &mut run),
                None => {
                    run.stack.pop();
                    run.on_path.remove(alias.name.as_str());
                }
            }
        }

        debug!(
            name,
            cidrs = run.out.cidrs.len(),
            hosts = run.out.hosts.len(),
            notes = run.out.notes.len(),
            "resolved reference"
        );
        run.out
    }

    /// Expand an address-group on its own, without alias or builtin lookup.
    pub fn expand_group(&self, name: &str) -> ResolvedAlias {
        let mut run = Expansion::default();
        match self.tables.groups.get(name) {
            Some(group) => self.apply_group(group, &mut run),
            None => run.note(format!("address-group not found: {name}")),
        }
        run.out
    }

    fn lookup(&self, name: &str) -> Target<'a> {
        if let Some(builtin) = Builtin::from_name(name) {
            return Target::Builtin(builtin);
        }
        if let Some(alias) = self.tables.aliases.get(name) {
            return Target::Alias(alias);
        }
        if let Some(group) = self.tables.groups.get(name) {
            return Target::Group(group);
        }
        Target::Missing
    }

    fn apply_member(&self, owner: &'a Alias, member: &'a AliasMember, run: &mut Expansion<'a>) {
        match member {
            AliasMember::Alias(name) => match self.lookup(name) {
                Target::Builtin(builtin) => self.apply_builtin(builtin, Some(name.as_str()), run),
                Target::Alias(alias) => {
                    if run.on_path.contains(alias.name.as_str()) {
                        trace!(owner = %owner.name, member = %name, "reference cycle");
                        run.note(format!("Cycle detected at {}", owner.name));
                    } else if !run.expanded_aliases.contains(alias.name.as_str()) {
                        run.enter(alias);
                    }
                }
                Target::Group(group) => self.apply_group(group, run),
                Target::Missing => run.note(format!("{name}: alias not found")),
            },
            AliasMember::AddressGroup(name) => match self.tables.groups.get(name) {
                Some(group) => self.apply_group(group, run),
                None => run.note(format!("{name}: address-group not found")),
            },
            AliasMember::InterfaceAny { interface, zone } => {
                self.apply_interface_any(member, interface.as_deref(), *zone, run)
            }
            AliasMember::Builtin(builtin) => self.apply_builtin(*builtin, Some(builtin.name()), run),
        }
    }

    fn apply_builtin(&self, builtin: Builtin, member: Option<&str>, run: &mut Expansion<'a>) {
        if builtin == Builtin::Device {
            match member {
                Some(member) => run.note(format!("{member}: {DEVICE_NOTE}")),
                None => run.note(DEVICE_NOTE.to_string()),
            }
            return;
        }
        if !run.expanded_builtins.insert(builtin) {
            return;
        }
        match builtin {
            Builtin::Any => run.extend_cidrs(self.domain.all_cidrs()),
            Builtin::Zone(zone) => run.extend_cidrs(self.domain.zone_cidrs(zone)),
            Builtin::Device => {}
        }
    }

    fn apply_group(&self, group: &'a AddressGroup, run: &mut Expansion<'a>) {
        if !run.expanded_groups.insert(group.name.as_str()) {
            return;
        }
        for member in &group.members {
            match *member {
                AddressMember::Host(ip) => {
                    run.out.cidrs.insert(Cidr::host(ip));
                    run.out.hosts.insert(ip);
                }
                AddressMember::Network(cidr) => {
                    run.out.cidrs.insert(cidr);
                }
            }
        }
    }

    /// Interface binding first, then zone, then every interface.
    fn apply_interface_any(
        &self,
        member: &AliasMember,
        interface: Option<&str>,
        zone: Option<Zone>,
        run: &mut Expansion<'a>,
    ) {
        if let Some(name) = interface {
            if let Some(cidrs) = self.domain.interface_cidrs(name) {
                run.extend_cidrs(cidrs);
                return;
            }
            run.note(format!("{}: interface not found", member.label()));
        }
        match zone {
            Some(zone) => run.extend_cidrs(self.domain.zone_cidrs(zone)),
            None => self.apply_builtin(Builtin::Any, None, run),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::Interface;

    fn cidr(text: &str) -> Cidr {
        text.parse().expect("cidr")
    }

    fn domain() -> Domain {
        Domain::build(vec![
            Interface {
                name: "Trusted".to_string(),
                zone: Zone::Trusted,
                cidrs: vec![cidr("10.0.1.0/24")],
                vlan: None,
            },
            Interface {
                name: "Guest".to_string(),
                zone: Zone::Optional,
                cidrs: vec![cidr("10.0.50.0/24")],
                vlan: Some(50),
            },
            Interface {
                name: "External".to_string(),
                zone: Zone::External,
                cidrs: vec![cidr("203.0.113.0/29")],
                vlan: None,
            },
        ])
    }

    fn alias(name: &str, members: Vec<AliasMember>) -> Alias {
        Alias {
            name: name.to_string(),
            members,
        }
    }

    fn alias_ref(name: &str) -> AliasMember {
        AliasMember::Alias(name.to_string())
    }

    fn group(name: &str, members: Vec<AddressMember>) -> AddressGroup {
        AddressGroup {
            name: name.to_string(),
            members,
        }
    }

    fn texts(cidrs: &BTreeSet<Cidr>) -> Vec<String> {
        cidrs.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn two_alias_cycle_terminates_with_single_note() {
        let domain = domain();
        let tables = ProfileTables::new(
            vec![
                alias("A", vec![alias_ref("B")]),
                alias("B", vec![alias_ref("A")]),
            ],
            Vec::new(),
        );
        let resolved = Resolver::new(&domain, &tables).resolve("A");
        assert_eq!(
            resolved,
            ResolvedAlias {
                cidrs: BTreeSet::new(),
                hosts: BTreeSet::new(),
                notes: vec!["Cycle detected at B".to_string()],
            }
        );
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let domain = domain();
        let tables = ProfileTables::new(vec![alias("Loop", vec![alias_ref("Loop")])], Vec::new());
        let resolved = Resolver::new(&domain, &tables).resolve("Loop");
        assert_eq!(resolved.notes, vec!["Cycle detected at Loop"]);
    }

    #[test]
    fn diamond_references_are_not_cycles() {
        let domain = domain();
        let tables = ProfileTables::new(
            vec![
                alias("Top", vec![alias_ref("Left"), alias_ref("Right")]),
                alias("Left", vec![alias_ref("Bottom")]),
                alias("Right", vec![alias_ref("Bottom")]),
                alias(
                    "Bottom",
                    vec![AliasMember::AddressGroup("Servers".to_string())],
                ),
            ],
            vec![group(
                "Servers",
                vec![AddressMember::Host(Ipv4Addr::new(10, 0, 1, 10))],
            )],
        );
        let resolved = Resolver::new(&domain, &tables).resolve("Top");
        assert!(resolved.notes.is_empty(), "{:?}", resolved.notes);
        assert_eq!(texts(&resolved.cidrs), vec!["10.0.1.10/32"]);
    }

    #[test]
    fn address_group_hosts_and_networks() {
        let domain = domain();
        let tables = ProfileTables::new(
            Vec::new(),
            vec![group(
                "G",
                vec![
                    AddressMember::Host(Ipv4Addr::new(10, 0, 0, 5)),
                    AddressMember::Network(cidr("10.1.0.0/255.255.255.0")),
                ],
            )],
        );
        let resolved = Resolver::new(&domain, &tables).resolve("G");
        assert_eq!(texts(&resolved.cidrs), vec!["10.0.0.5/32", "10.1.0.0/24"]);
        assert_eq!(
            resolved.hosts.into_iter().collect::<Vec<_>>(),
            vec![Ipv4Addr::new(10, 0, 0, 5)]
        );
        assert!(resolved.notes.is_empty());
    }

    #[test]
    fn builtins_follow_the_domain() {
        let domain = domain();
        let tables = ProfileTables::default();
        let resolver = Resolver::new(&domain, &tables);

        let any = resolver.resolve("Any");
        let expected: BTreeSet<Cidr> = domain.all_cidrs().copied().collect();
        assert_eq!(any.cidrs, expected);

        let optional = resolver.resolve("any-optional");
        assert_eq!(texts(&optional.cidrs), vec!["10.0.50.0/24"]);

        let custom = resolver.resolve("Any-Custom");
        assert!(custom.is_empty());
        assert!(custom.notes.is_empty());

        let device = resolver.resolve("Firebox");
        assert!(device.is_empty());
        assert_eq!(device.notes, vec![DEVICE_NOTE]);
    }

    #[test]
    fn rebuilt_domain_is_seen_by_new_resolver() {
        let tables = ProfileTables::default();
        let first = domain();
        let before = Resolver::new(&first, &tables).resolve("Any");

        let mut interfaces = first.interfaces().to_vec();
        interfaces.push(Interface {
            name: "Lab".to_string(),
            zone: Zone::Custom,
            cidrs: vec![cidr("172.16.0.0/16")],
            vlan: None,
        });
        let rebuilt = Domain::build(interfaces);
        let after = Resolver::new(&rebuilt, &tables).resolve("Any");

        assert_eq!(before.cidrs.len() + 1, after.cidrs.len());
        assert!(after.cidrs.contains(&cidr("172.16.0.0/16")));
    }

    #[test]
    fn interface_any_prefers_interface_then_zone_then_everything() {
        let domain = domain();
        let tables = ProfileTables::new(
            vec![
                alias(
                    "GuestNet",
                    vec![AliasMember::InterfaceAny {
                        interface: Some("Guest".to_string()),
                        zone: Some(Zone::Trusted),
                    }],
                ),
                alias(
                    "ExternalZone",
                    vec![AliasMember::InterfaceAny {
                        interface: None,
                        zone: Some(Zone::External),
                    }],
                ),
                alias(
                    "Unbound",
                    vec![AliasMember::InterfaceAny {
                        interface: None,
                        zone: None,
                    }],
                ),
                alias(
                    "Stale",
                    vec![AliasMember::InterfaceAny {
                        interface: Some("eth9".to_string()),
                        zone: Some(Zone::Trusted),
                    }],
                ),
            ],
            Vec::new(),
        );
        let resolver = Resolver::new(&domain, &tables);

        assert_eq!(texts(&resolver.resolve("GuestNet").cidrs), vec!["10.0.50.0/24"]);
        assert_eq!(
            texts(&resolver.resolve("ExternalZone").cidrs),
            vec!["203.0.113.0/29"]
        );
        assert_eq!(resolver.resolve("Unbound").cidrs.len(), 3);

        let stale = resolver.resolve("Stale");
        assert_eq!(texts(&stale.cidrs), vec!["10.0.1.0/24"]);
        assert_eq!(stale.notes, vec!["Any@eth9: interface not found"]);
        assert!(stale.hosts.is_empty());
    }

    #[test]
    fn missing_references_accumulate_notes() {
        let domain = domain();
        let tables = ProfileTables::new(
            vec![alias(
                "Mixed",
                vec![
                    alias_ref("Gone1"),
                    AliasMember::AddressGroup("Gone2".to_string()),
                    alias_ref("Gone3"),
                    AliasMember::Builtin(Builtin::Device),
                    AliasMember::Builtin(Builtin::Zone(Zone::Trusted)),
                ],
            )],
            Vec::new(),
        );
        let resolved = Resolver::new(&domain, &tables).resolve("Mixed");
        assert_eq!(
            resolved.notes,
            vec![
                "Gone1: alias not found",
                "Gone2: address-group not found",
                "Gone3: alias not found",
                "Firebox: device has no address space",
            ]
        );
        assert_eq!(texts(&resolved.cidrs), vec!["10.0.1.0/24"]);
    }

    #[test]
    fn unknown_top_level_name() {
        let domain = domain();
        let tables = ProfileTables::default();
        let resolved = Resolver::new(&domain, &tables).resolve("Nope");
        assert!(resolved.is_empty());
        assert_eq!(resolved.notes, vec!["alias not found: Nope"]);
    }

    #[test]
    fn builtins_shadow_aliases_of_the_same_name() {
        let domain = domain();
        let tables = ProfileTables::new(vec![alias("Any", Vec::new())], Vec::new());
        let resolved = Resolver::new(&domain, &tables).resolve("Any");
        assert_eq!(resolved.cidrs.len(), 3);
    }

    #[test]
    fn resolution_is_repeatable() {
        let domain = domain();
        let tables = ProfileTables::new(
            vec![
                alias("A", vec![alias_ref("B"), alias_ref("Any-Trusted")]),
                alias("B", vec![alias_ref("A"), alias_ref("Missing")]),
            ],
            Vec::new(),
        );
        let resolver = Resolver::new(&domain, &tables);
        assert_eq!(resolver.resolve("A"), resolver.resolve("A"));
    }

    #[test]
    fn absorb_from_prefixes_and_dedupes_notes() {
        let mut acc = ResolvedAlias::default();
        let part = ResolvedAlias {
            cidrs: [cidr("10.0.0.0/8")].into_iter().collect(),
            hosts: BTreeSet::new(),
            notes: vec!["Gone: alias not found".to_string()],
        };
        acc.absorb_from("X", part.clone());
        acc.absorb_from("X", part);
        assert_eq!(acc.notes, vec!["X: Gone: alias not found"]);
        assert_eq!(acc.cidrs.len(), 1);
    }

    #[test]
    fn absorb_from_does_not_repeat_a_trailing_name() {
        let domain = domain();
        let tables = ProfileTables::default();
        let resolver = Resolver::new(&domain, &tables);
        let mut acc = ResolvedAlias::default();
        acc.absorb_from("Ghost", resolver.resolve("Ghost"));
        assert_eq!(acc.notes, vec!["alias not found: Ghost"]);
    }
}
