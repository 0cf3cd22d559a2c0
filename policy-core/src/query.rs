//! Subnet and host filters over unified policies.
//!
//! Filter text that does not parse makes the filter match nothing.

use tracing::warn;

use crate::addr::{overlap, parse_ipv4, AddrError, Cidr};
use crate::model::UnifiedPolicy;

/// Which endpoint a filter looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Side {
    Source,
    Destination,
    #[default]
    Either,
}

/// Conjunction of an optional subnet and an optional host criterion.
#[derive(Debug, Clone, Default)]
pub struct PolicyFilter {
    subnet: Option<Result<Cidr, AddrError>>,
    host: Option<Result<u32, AddrError>>,
    side: Side,
}

impl PolicyFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep policies with a network overlapping `text` on the chosen side.
    pub fn subnet(mut self, text: &str) -> Self {
        let parsed = text.parse::<Cidr>();
        if let Err(err) = &parsed {
            warn!(%err, "subnet filter will not match anything");
        }
        self.subnet = Some(parsed);
        self
    }

    /// Keep policies with a network containing the host `text` on the chosen side.
    pub fn host(mut self, text: &str) -> Self {
        let parsed = parse_ipv4(text);
        if let Err(err) = &parsed {
            warn!(%err, "host filter will not match anything");
        }
        self.host = Some(parsed);
        self
    }

    pub fn side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.subnet.is_none() && self.host.is_none()
    }

    pub fn matches(&self, policy: &UnifiedPolicy) -> bool {
        if let Some(subnet) = &self.subnet {
            let Ok(subnet) = subnet else {
                return false;
            };
            if !self.any_cidr(policy, |cidr| overlap(cidr, subnet)) {
                return false;
            }
        }
        if let Some(host) = &self.host {
            let Ok(host) = host else {
                return false;
            };
            if !self.any_cidr(policy, |cidr| cidr.contains(*host)) {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, policies: impl IntoIterator<Item = UnifiedPolicy>) -> Vec<UnifiedPolicy> {
        policies
            .into_iter()
            .filter(|policy| self.matches(policy))
            .collect()
    }

    fn any_cidr(&self, policy: &UnifiedPolicy, test: impl Fn(&Cidr) -> bool) -> bool {
        match self.side {
            Side::Source => policy.src_cidrs.iter().any(&test),
            Side::Destination => policy.dst_cidrs.iter().any(&test),
            Side::Either => {
                policy.src_cidrs.iter().any(&test) || policy.dst_cidrs.iter().any(&test)
            }
        }
    }
}

/// Overlap test on text; unparsable input is `false`.
pub fn overlaps_text(a: &str, b: &str) -> bool {
    match (a.parse::<Cidr>(), b.parse::<Cidr>()) {
        (Ok(a), Ok(b)) => overlap(&a, &b),
        _ => false,
    }
}

/// Containment test on text; unparsable input is `false`.
pub fn contains_text(cidr: &str, ip: &str) -> bool {
    match (cidr.parse::<Cidr>(), parse_ipv4(ip)) {
        (Ok(cidr), Ok(ip)) => cidr.contains(ip),
        _ => false,
    }
}
