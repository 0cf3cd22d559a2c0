//! Policy materialization.
//!
//! Turns [`PolicyNode`]s into [`UnifiedPolicy`] records by resolving every
//! endpoint reference. Abs-policy overlays produce one extra record per
//! targeted base policy, with the overlay's endpoint lists standing in for the
//! base's wherever the overlay supplies them.
//!
//! Each note is prefixed with its side (`from: ` or `to: `) and the endpoint
//! reference it came from.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::addr::Cidr;
use crate::model::{OverlayNode, PolicyNode, UnifiedPolicy};
use crate::resolve::{ResolvedAlias, Resolver};

/// Origin tag for records built from the configuration export.
pub const CONFIG_ORIGIN: &str = "config";

/// Tag prefix marking records produced by an overlay.
pub const OVERLAY_TAG_PREFIX: &str = "abs-policy:";

/// Materialize base policies and overlay variants with the `config` origin.
pub fn materialize(
    policies: &[PolicyNode],
    overlays: &[OverlayNode],
    resolver: &Resolver<'_>,
) -> Vec<UnifiedPolicy> {
    Materializer::new(*resolver).materialize(policies, overlays)
}

/// Builds [`UnifiedPolicy`] records for one ingestion source.
#[derive(Debug, Clone)]
pub struct Materializer<'a> {
    resolver: Resolver<'a>,
    origin: String,
}

impl<'a> Materializer<'a> {
    pub fn new(resolver: Resolver<'a>) -> Self {
        Self {
            resolver,
            origin: CONFIG_ORIGIN.to_string(),
        }
    }

    /// Set the origin tag stamped on every produced record.
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Base policies first, in input order, then overlay variants in overlay order.
    ///
    /// Overlays naming a policy that does not exist are skipped. When several
    /// base policies share a name, overlays apply to the first.
    pub fn materialize(
        &self,
        policies: &[PolicyNode],
        overlays: &[OverlayNode],
    ) -> Vec<UnifiedPolicy> {
        let mut out = Vec::with_capacity(policies.len());
        let mut by_name: BTreeMap<&str, &PolicyNode> = BTreeMap::new();
        for policy in policies {
            by_name.entry(policy.name.as_str()).or_insert(policy);
            out.push(self.build(policy, &policy.from, &policy.to, Vec::new()));
        }

        for overlay in overlays {
            for target in &overlay.targets {
                let Some(base) = by_name.get(target.as_str()) else {
                    debug!(overlay = %overlay.name, target = %target, "overlay targets unknown policy");
                    continue;
                };
                let from = if overlay.from.is_empty() {
                    &base.from
                } else {
                    &overlay.from
                };
                let to = if overlay.to.is_empty() {
                    &base.to
                } else {
                    &overlay.to
                };
                let tags = vec![format!("{OVERLAY_TAG_PREFIX}{}", overlay.name)];
                out.push(self.build(base, from, to, tags));
            }
        }
        out
    }

    fn build(
        &self,
        base: &PolicyNode,
        from: &[String],
        to: &[String],
        tags: Vec<String>,
    ) -> UnifiedPolicy {
        let src = self.resolve_side(from);
        let dst = self.resolve_side(to);

        let notes = src
            .notes
            .iter()
            .map(|note| format!("from: {note}"))
            .chain(dst.notes.iter().map(|note| format!("to: {note}")))
            .collect();

        UnifiedPolicy {
            id: base.id().to_string(),
            name: base.name.clone(),
            service: base.service.clone(),
            from_refs: from.to_vec(),
            to_refs: to.to_vec(),
            src_cidrs: src.cidrs,
            dst_cidrs: dst.cidrs,
            src_hosts: src.hosts,
            dst_hosts: dst.hosts,
            origin: self.origin.clone(),
            tags,
            nat: (!base.nat.is_empty()).then_some(base.nat),
            notes,
        }
    }

    fn resolve_side(&self, refs: &[String]) -> ResolvedAlias {
        let mut side = ResolvedAlias::default();
        for name in refs {
            side.absorb_from(name, self.resolver.resolve(name));
        }
        side
    }
}

/// Collapse networks of /24 or longer into their /24 bucket.
///
/// Wider networks cannot be represented by a single /24 and are kept as-is.
pub fn subnet_buckets<'c>(cidrs: impl IntoIterator<Item = &'c Cidr>) -> BTreeSet<Cidr> {
    cidrs
        .into_iter()
        .map(|cidr| if cidr.prefix() >= 24 { cidr.to24() } else { *cidr })
        .collect()
}
