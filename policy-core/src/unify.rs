//! Policy unification.
//!
//! Merges policy lists from several sources into one duplicate-free list.
//! Two records are duplicates when their [`PolicyKey`] is equal; the first one
//! seen is kept and later ones are dropped whole, origin tag included.
//!
//! ## Canonical key
//!
//! - policy name and service (empty when absent)
//! - source and destination CIDRs
//! - source and destination hosts
//!
//! Address lists are compared as sorted, de-duplicated text in plain string
//! order (`10.0.0.0/8` before `9.0.0.0/8`).

use std::collections::{BTreeSet, HashSet};
use std::fmt::Display;

use tracing::debug;

use crate::model::UnifiedPolicy;

/// Content signature deciding whether two policies are the same.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PolicyKey {
    name: String,
    service: String,
    src_cidrs: Vec<String>,
    dst_cidrs: Vec<String>,
    src_hosts: Vec<String>,
    dst_hosts: Vec<String>,
}

/// Compute the canonical key of a policy.
pub fn canonical_key(policy: &UnifiedPolicy) -> PolicyKey {
    PolicyKey {
        name: policy.name.clone(),
        service: policy.service.clone().unwrap_or_default(),
        src_cidrs: sorted_text(&policy.src_cidrs),
        dst_cidrs: sorted_text(&policy.dst_cidrs),
        src_hosts: sorted_text(&policy.src_hosts),
        dst_hosts: sorted_text(&policy.dst_hosts),
    }
}

/// Concatenate `sets` in order and keep the first policy for each key.
pub fn merge<I>(sets: I) -> Vec<UnifiedPolicy>
where
    I: IntoIterator<Item = Vec<UnifiedPolicy>>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut dropped = 0usize;
    for policy in sets.into_iter().flatten() {
        if seen.insert(canonical_key(&policy)) {
            out.push(policy);
        } else {
            dropped += 1;
        }
    }
    debug!(kept = out.len(), dropped, "merged policy sources");
    out
}

fn sorted_text<T: Display>(items: impl IntoIterator<Item = T>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::addr::Cidr;

    fn policy(name: &str, origin: &str, src: &[&str]) -> UnifiedPolicy {
        UnifiedPolicy {
            id: name.to_string(),
            name: name.to_string(),
            service: None,
            from_refs: Vec::new(),
            to_refs: Vec::new(),
            src_cidrs: src
                .iter()
                .map(|c| c.parse::<Cidr>().expect("cidr"))
                .collect(),
            dst_cidrs: BTreeSet::new(),
            src_hosts: BTreeSet::new(),
            dst_hosts: BTreeSet::new(),
            origin: origin.to_string(),
            tags: Vec::new(),
            nat: None,
            notes: Vec::new(),
        }
    }

    #[test]
    fn first_seen_wins_across_sources() {
        let config = vec![policy("X", "config", &["10.0.0.0/24"])];
        let sheet = vec![
            policy("X", "sheet", &["10.0.0.0/24"]),
            policy("Y", "sheet", &["10.0.0.0/24"]),
        ];
        let merged = merge(vec![config, sheet]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].origin, "config");
        assert_eq!(merged[1].name, "Y");
    }

    #[test]
    fn service_is_part_of_the_key() {
        let mut https = policy("X", "config", &["10.0.0.0/24"]);
        https.service = Some("HTTPS".to_string());
        let plain = policy("X", "config", &["10.0.0.0/24"]);
        assert_eq!(merge(vec![vec![https, plain]]).len(), 2);
    }

    #[test]
    fn key_ignores_ids_refs_and_notes() {
        let a = policy("X", "config", &["10.0.0.0/24"]);
        let mut b = policy("X", "sheet", &["10.0.0.0/24"]);
        b.id = "99".to_string();
        b.from_refs = vec!["Inside".to_string()];
        b.notes = vec!["note".to_string()];
        assert_eq!(canonical_key(&a), canonical_key(&b));
    }

    #[test]
    fn key_sorts_as_text() {
        let p = policy("X", "config", &["9.0.0.0/8", "10.0.0.0/8"]);
        let key = canonical_key(&p);
        assert_eq!(key.src_cidrs, vec!["10.0.0.0/8", "9.0.0.0/8"]);
    }
}
