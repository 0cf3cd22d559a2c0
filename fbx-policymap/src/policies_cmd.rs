use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fbx_policymap::import::load_policy_file;
use fbx_policymap::profile::load_profile;
use fbx_policymap::report::{
    render_policies, render_policy_summary, render_subnets, subnet_report,
};
use fbx_policymap::settings::Settings;
use policy_core::{merge, PolicyFilter, Side, UnifiedPolicy};

use crate::cli::{OutputFormat, PoliciesArgs, SideArg, SubnetsArgs};

pub fn run_policies(args: PoliciesArgs, settings: &Settings) -> Result<()> {
    let policies = collect_policies(&args.profile, &args.imports, settings)?;

    let mut filter = PolicyFilter::new().side(side(args.side));
    if let Some(subnet) = &args.subnet {
        filter = filter.subnet(subnet);
    }
    if let Some(host) = &args.host {
        filter = filter.host(host);
    }
    let policies = if filter.is_empty() {
        policies
    } else {
        filter.apply(policies)
    };

    if args.summary {
        println!("{}", render_policy_summary(&policies));
        return Ok(());
    }

    match args.format {
        OutputFormat::Text => println!("{}", render_policies(&policies)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&policies)?),
    }
    Ok(())
}

pub fn run_subnets(args: SubnetsArgs, settings: &Settings) -> Result<()> {
    let policies = collect_policies(&args.profile, &args.imports, settings)?;
    let buckets = subnet_report(&policies);

    match args.format {
        OutputFormat::Text => println!("{}", render_subnets(&buckets)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&buckets)?),
    }
    Ok(())
}

/// Profile policies first, then each import file in order, deduplicated.
fn collect_policies(
    profile_path: &Path,
    imports: &[PathBuf],
    settings: &Settings,
) -> Result<Vec<UnifiedPolicy>> {
    let profile = load_profile(profile_path, settings)
        .with_context(|| format!("failed to load {}", profile_path.display()))?;
    let mut sets = vec![profile.materialize(&settings.origin)];
    for path in imports {
        let imported = load_policy_file(path)
            .with_context(|| format!("failed to import {}", path.display()))?;
        sets.push(imported);
    }
    Ok(merge(sets))
}

fn side(arg: SideArg) -> Side {
    match arg {
        SideArg::Src => Side::Source,
        SideArg::Dst => Side::Destination,
        SideArg::Either => Side::Either,
    }
}
