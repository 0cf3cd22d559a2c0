//! Alias resolution and policy materialization for firewall profile exports.
//!
//! Firewall policies name their endpoints symbolically: aliases that point at
//! other aliases, address-groups, zones, "Any" bound to an interface, or the
//! device itself. This crate turns those names into concrete networks and
//! hosts and builds a canonical, duplicate-free policy list from them.
//!
//! # Pipeline
//!
//! - [`addr`]: IPv4 parsing, masks, containment and overlap
//! - [`domain`]: interface, zone and CIDR lookup tables
//! - [`resolve`]: reference resolution with cycle detection
//! - [`materialize`]: endpoint resolution for policies and abs-policy overlays
//! - [`unify`]: merging policy sources by content signature
//! - [`query`]: subnet and host filters for consumers
//!
//! Nothing here performs I/O or fails on bad references: missing or cyclic
//! data degrades to empty address sets plus notes on the affected policy.
//!
//! # Examples
//!
//! ```
//! use policy_core::{
//!     materialize, merge, Alias, AliasMember, Domain, Interface, PolicyNode, ProfileTables,
//!     Resolver, Zone,
//! };
//!
//! let domain = Domain::build(vec![Interface {
//!     name: "Trusted".to_string(),
//!     zone: Zone::Trusted,
//!     cidrs: vec!["10.0.1.0/24".parse().unwrap()],
//!     vlan: None,
//! }]);
//! let tables = ProfileTables::new(
//!     vec![Alias {
//!         name: "Inside".to_string(),
//!         members: vec![AliasMember::Alias("Any-Trusted".to_string())],
//!     }],
//!     Vec::new(),
//! );
//! let resolver = Resolver::new(&domain, &tables);
//!
//! let mut policy = PolicyNode::new("Outgoing");
//! policy.from = vec!["Inside".to_string()];
//! policy.to = vec!["Any-External".to_string()];
//!
//! let unified = merge([materialize(&[policy], &[], &resolver)]);
//! assert_eq!(unified[0].src_cidrs.len(), 1);
//! ```

pub mod addr;
pub mod domain;
pub mod materialize;
pub mod model;
pub mod query;
pub mod resolve;
pub mod unify;

pub use addr::{
    contains, network_of, overlap, parse_ipv4, prefix_from_mask, prefix_from_mask_with, to24,
    AddrError, Cidr, MaskPolicy,
};
pub use domain::Domain;
pub use materialize::{materialize, subnet_buckets, Materializer, CONFIG_ORIGIN};
pub use model::{
    AddressGroup, AddressMember, Alias, AliasMember, Builtin, Interface, NatFlags, OverlayNode,
    PolicyNode, ProfileTables, UnifiedPolicy, Zone,
};
pub use query::{PolicyFilter, Side};
pub use resolve::{ResolvedAlias, Resolver};
pub use unify::{canonical_key, merge, PolicyKey};
