use std::collections::BTreeMap;
use std::fmt::Display;

use colored::Colorize;
use policy_core::{subnet_buckets, Cidr, Interface, NatFlags, ResolvedAlias, UnifiedPolicy};
use serde::Serialize;

/// One resolved name, as printed by `resolve --format json`.
#[derive(Debug, Serialize)]
pub struct ResolvedReport<'a> {
    pub name: &'a str,
    #[serde(flatten)]
    pub resolved: &'a ResolvedAlias,
}

/// Policy counts for one /24 bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubnetBucket {
    pub subnet: Cidr,
    pub src_policies: usize,
    pub dst_policies: usize,
}

/// Render one resolved name.
pub fn render_resolved(name: &str, resolved: &ResolvedAlias) -> String {
    let mut out = vec![name.bold().to_string()];
    out.push(format!("  cidrs: {}", join_or_dash(&resolved.cidrs)));
    out.push(format!("  hosts: {}", join_or_dash(&resolved.hosts)));
    for note in &resolved.notes {
        out.push(format!("  note: {}", note.as_str().yellow()));
    }
    out.join("\n")
}

/// Render policies, one block per record.
pub fn render_policies(policies: &[UnifiedPolicy]) -> String {
    let mut out = Vec::new();
    for policy in policies {
        let mut header = format!(
            "{} id={} service={} origin={}",
            policy.name.as_str().bold(),
            policy.id,
            policy.service.as_deref().unwrap_or("-"),
            policy.origin
        );
        if !policy.tags.is_empty() {
            header.push_str(&format!(" tags={}", policy.tags.join(",")));
        }
        if let Some(nat) = &policy.nat {
            header.push_str(&format!(" nat={}", nat_label(nat)));
        }
        out.push(header);
        out.push(format!(
            "  from: {} -> {}",
            join_or_dash(&policy.from_refs),
            join_or_dash(&policy.src_cidrs)
        ));
        out.push(format!(
            "  to: {} -> {}",
            join_or_dash(&policy.to_refs),
            join_or_dash(&policy.dst_cidrs)
        ));
        for note in &policy.notes {
            out.push(format!("  note: {}", note.as_str().yellow()));
        }
    }
    out.join("\n")
}

/// Render counts by origin plus overlay and note totals.
pub fn render_policy_summary(policies: &[UnifiedPolicy]) -> String {
    let mut by_origin: BTreeMap<&str, usize> = BTreeMap::new();
    for policy in policies {
        *by_origin.entry(policy.origin.as_str()).or_default() += 1;
    }
    let overlays = policies.iter().filter(|p| !p.tags.is_empty()).count();
    let with_notes = policies.iter().filter(|p| !p.notes.is_empty()).count();

    let mut out = vec![format!(
        "policies={} overlay_variants={} with_notes={}",
        policies.len(),
        overlays,
        with_notes
    )
    .cyan()
    .to_string()];
    for (origin, count) in by_origin {
        out.push(format!("- origin {origin}: {count}"));
    }
    out.join("\n")
}

/// Render the interface listing.
pub fn render_interfaces(interfaces: &[Interface]) -> String {
    let mut out = Vec::new();
    for iface in interfaces {
        let vlan = iface
            .vlan
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push(format!(
            "{} zone={} vlan={} cidrs={}",
            iface.name.as_str().bold(),
            iface.zone,
            vlan,
            join_or_dash(&iface.cidrs)
        ));
    }
    out.join("\n")
}

/// Count source and destination policies per /24 bucket.
///
/// A policy is counted once per bucket and side, however many of its networks
/// fall into that bucket.
pub fn subnet_report(policies: &[UnifiedPolicy]) -> Vec<SubnetBucket> {
    let mut counts: BTreeMap<Cidr, (usize, usize)> = BTreeMap::new();
    for policy in policies {
        for bucket in subnet_buckets(&policy.src_cidrs) {
            counts.entry(bucket).or_default().0 += 1;
        }
        for bucket in subnet_buckets(&policy.dst_cidrs) {
            counts.entry(bucket).or_default().1 += 1;
        }
    }
    counts
        .into_iter()
        .map(|(subnet, (src_policies, dst_policies))| SubnetBucket {
            subnet,
            src_policies,
            dst_policies,
        })
        .collect()
}

pub fn render_subnets(buckets: &[SubnetBucket]) -> String {
    buckets
        .iter()
        .map(|bucket| {
            format!(
                "{} src={} dst={}",
                bucket.subnet.to_string().green(),
                bucket.src_policies,
                bucket.dst_policies
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn nat_label(nat: &NatFlags) -> &'static str {
    match (nat.dnat, nat.one_to_one) {
        (true, true) => "dnat,1to1",
        (true, false) => "dnat",
        (false, true) => "1to1",
        (false, false) => "-",
    }
}

fn join_or_dash<T: Display>(items: impl IntoIterator<Item = T>) -> String {
    let joined: Vec<String> = items.into_iter().map(|item| item.to_string()).collect();
    if joined.is_empty() {
        "-".to_string()
    } else {
        joined.join(", ")
    }
}
