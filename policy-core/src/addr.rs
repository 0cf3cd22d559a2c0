//! IPv4 address arithmetic.
//!
//! Everything here is pure: parsing dotted quads, turning masks into prefix
//! lengths, computing networks, and the containment/overlap tests used by the
//! query layer. Only the parsers can fail.

use std::fmt::{self, Display, Formatter};
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Longest IPv4 prefix.
pub const MAX_PREFIX: u8 = 32;

/// Errors returned by the address parsers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddrError {
    /// Text is not exactly four decimal octets in 0..=255.
    #[error("invalid IPv4 address '{0}'")]
    InvalidFormat(String),
    /// Text is not a prefix length, `/N` form, or dotted mask.
    #[error("invalid netmask '{0}'")]
    InvalidMask(String),
}

/// How dotted masks are validated.
///
/// `Lenient` counts the set bits of the mask and accepts non-contiguous masks
/// such as `255.0.255.0` (read as /16). `Strict` rejects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskPolicy {
    #[default]
    Lenient,
    Strict,
}

/// An IPv4 network in canonical form (host bits cleared).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cidr {
    network: u32,
    prefix: u8,
}

impl Cidr {
    /// A /32 network for a single host.
    pub fn host(ip: Ipv4Addr) -> Self {
        network_of(u32::from(ip), MAX_PREFIX)
    }

    /// Network address as an integer.
    pub fn network(&self) -> u32 {
        self.network
    }

    /// Network address as an [`Ipv4Addr`].
    pub fn network_addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.network)
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// True when `ip` falls inside this network.
    pub fn contains(&self, ip: u32) -> bool {
        ip & mask_bits(self.prefix) == self.network
    }

    /// True when either network contains the other.
    pub fn overlaps(&self, other: &Cidr) -> bool {
        let shorter = self.prefix.min(other.prefix);
        let mask = mask_bits(shorter);
        self.network & mask == other.network & mask
    }

    /// The /24 bucket holding this network's address.
    pub fn to24(&self) -> Cidr {
        network_of(self.network, 24)
    }
}

impl Display for Cidr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network_addr(), self.prefix)
    }
}

impl FromStr for Cidr {
    type Err = AddrError;

    /// Accepts `a.b.c.d/n`, `a.b.c.d/255.255.255.0` or a bare `a.b.c.d` (/32).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((ip, mask)) => Ok(network_of(parse_ipv4(ip)?, prefix_from_mask(mask)?)),
            None => Ok(network_of(parse_ipv4(s)?, MAX_PREFIX)),
        }
    }
}

impl Serialize for Cidr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cidr {
    fn deserialize<D>(deserializer: D) -> Result<Cidr, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Parse exactly four dot-separated decimal octets.
///
/// Surrounding whitespace is ignored. Each octet must be one to three ASCII
/// digits with a value of at most 255.
pub fn parse_ipv4(text: &str) -> Result<u32, AddrError> {
    let invalid = || AddrError::InvalidFormat(text.to_string());
    let mut value = 0u32;
    let mut octets = 0;
    for part in text.trim().split('.') {
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let octet: u32 = part.parse().map_err(|_| invalid())?;
        if octet > 255 {
            return Err(invalid());
        }
        octets += 1;
        if octets > 4 {
            return Err(invalid());
        }
        value = (value << 8) | octet;
    }
    if octets != 4 {
        return Err(invalid());
    }
    Ok(value)
}

/// Convert `N`, `/N` or a dotted mask into a prefix length, leniently.
pub fn prefix_from_mask(text: &str) -> Result<u8, AddrError> {
    prefix_from_mask_with(text, MaskPolicy::Lenient)
}

/// Convert `N`, `/N` or a dotted mask into a prefix length.
pub fn prefix_from_mask_with(text: &str, policy: MaskPolicy) -> Result<u8, AddrError> {
    let invalid = || AddrError::InvalidMask(text.to_string());
    let raw = text.trim();
    let raw = raw.strip_prefix('/').unwrap_or(raw).trim();
    if raw.is_empty() {
        return Err(invalid());
    }

    if raw.bytes().all(|b| b.is_ascii_digit()) {
        let prefix: u8 = raw.parse().map_err(|_| invalid())?;
        if prefix > MAX_PREFIX {
            return Err(invalid());
        }
        return Ok(prefix);
    }

    if raw.contains('.') {
        let mask = parse_ipv4(raw).map_err(|_| invalid())?;
        // count_ones of a u32 is at most 32
        let prefix = mask.count_ones() as u8;
        if policy == MaskPolicy::Strict && mask != mask_bits(prefix) {
            return Err(invalid());
        }
        return Ok(prefix);
    }

    Err(invalid())
}

/// Mask `ip` down to its network. Prefixes above 32 are clamped to 32.
pub fn network_of(ip: u32, prefix: u8) -> Cidr {
    let prefix = prefix.min(MAX_PREFIX);
    Cidr {
        network: ip & mask_bits(prefix),
        prefix,
    }
}

pub fn contains(cidr: &Cidr, ip: u32) -> bool {
    cidr.contains(ip)
}

pub fn overlap(a: &Cidr, b: &Cidr) -> bool {
    a.overlaps(b)
}

/// Truncate an address or network text to its /24 bucket.
pub fn to24(ip_or_cidr: &str) -> Result<Cidr, AddrError> {
    Ok(ip_or_cidr.parse::<Cidr>()?.to24())
}

fn mask_bits(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (MAX_PREFIX - prefix.min(MAX_PREFIX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dotted_quads() {
        assert_eq!(parse_ipv4("10.0.0.5"), Ok(0x0A00_0005));
        assert_eq!(parse_ipv4(" 255.255.255.255 "), Ok(u32::MAX));
        assert_eq!(parse_ipv4("0.0.0.0"), Ok(0));
    }

    #[test]
    fn rejects_other_shapes() {
        for bad in [
            "", "10.0.0", "10.0.0.0.1", "10.0.0.256", "10..0.1", "a.b.c.d", "10.0.0.-1",
            "1000.0.0.1", "10.0.0.1/24",
        ] {
            assert!(
                matches!(parse_ipv4(bad), Err(AddrError::InvalidFormat(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn mask_forms_convert_to_prefix() {
        assert_eq!(prefix_from_mask("24"), Ok(24));
        assert_eq!(prefix_from_mask("/16"), Ok(16));
        assert_eq!(prefix_from_mask("0"), Ok(0));
        assert_eq!(prefix_from_mask("255.255.255.0"), Ok(24));
        assert_eq!(prefix_from_mask("255.255.255.255"), Ok(32));
        assert_eq!(prefix_from_mask("0.0.0.0"), Ok(0));
    }

    #[test]
    fn invalid_masks_fail() {
        for bad in ["33", "/", "", "abc", "255.255.255", "-1"] {
            assert!(
                matches!(prefix_from_mask(bad), Err(AddrError::InvalidMask(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn non_contiguous_mask_is_lenient_by_default() {
        assert_eq!(prefix_from_mask("255.0.255.0"), Ok(16));
        assert!(prefix_from_mask_with("255.0.255.0", MaskPolicy::Strict).is_err());
        assert_eq!(
            prefix_from_mask_with("255.255.0.0", MaskPolicy::Strict),
            Ok(16)
        );
    }

    #[test]
    fn network_of_clears_host_bits() {
        let cidr = network_of(parse_ipv4("10.1.2.3").expect("ip"), 16);
        assert_eq!(cidr.to_string(), "10.1.0.0/16");
        assert_eq!(network_of(u32::MAX, 0).to_string(), "0.0.0.0/0");
        assert_eq!(network_of(1, 40).prefix(), 32);
    }

    #[test]
    fn cidr_text_forms() {
        let a: Cidr = "10.1.0.7/255.255.255.0".parse().expect("dotted");
        let b: Cidr = "10.1.0.0/24".parse().expect("slash");
        let c: Cidr = "10.0.0.5".parse().expect("bare");
        assert_eq!(a, b);
        assert_eq!(c.to_string(), "10.0.0.5/32");
        assert!("10.1.0.0/40".parse::<Cidr>().is_err());
    }

    #[test]
    fn containment_and_overlap() {
        let net: Cidr = "192.168.0.0/16".parse().expect("net");
        let sub: Cidr = "192.168.10.0/24".parse().expect("sub");
        let other: Cidr = "10.0.0.0/8".parse().expect("other");
        assert!(contains(&net, parse_ipv4("192.168.200.1").expect("ip")));
        assert!(!contains(&sub, parse_ipv4("192.168.11.1").expect("ip")));
        assert!(overlap(&net, &sub));
        assert!(overlap(&sub, &net));
        assert!(!overlap(&net, &other));
        let everything: Cidr = "0.0.0.0/0".parse().expect("any");
        assert!(overlap(&everything, &other));
    }

    #[test]
    fn to24_buckets() {
        assert_eq!(to24("10.0.0.77").expect("ip").to_string(), "10.0.0.0/24");
        assert_eq!(to24("10.0.9.0/30").expect("net").to_string(), "10.0.9.0/24");
        assert!(to24("nonsense").is_err());
    }

    #[test]
    fn serde_uses_text_form() {
        let cidr: Cidr = "172.16.4.0/22".parse().expect("cidr");
        let json = serde_json::to_string(&cidr).expect("serialize");
        assert_eq!(json, "\"172.16.4.0/22\"");
        let back: Cidr = serde_json::from_str("\"172.16.5.9/255.255.252.0\"").expect("deserialize");
        assert_eq!(back, cidr);
        assert!(serde_json::from_str::<Cidr>("\"172.16.5.9/99\"").is_err());
    }
}
