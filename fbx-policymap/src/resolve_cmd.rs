use anyhow::{Context, Result};
use fbx_policymap::profile::load_profile;
use fbx_policymap::report::{render_resolved, ResolvedReport};
use fbx_policymap::settings::Settings;

use crate::cli::{OutputFormat, ResolveArgs};

pub fn run_resolve(args: ResolveArgs, settings: &Settings) -> Result<()> {
    let profile = load_profile(&args.profile, settings)
        .with_context(|| format!("failed to load {}", args.profile.display()))?;
    let resolver = profile.resolver();
    let resolved: Vec<_> = args
        .names
        .iter()
        .map(|name| (name.as_str(), resolver.resolve(name)))
        .collect();

    match args.format {
        OutputFormat::Text => {
            let blocks: Vec<String> = resolved
                .iter()
                .map(|(name, result)| render_resolved(name, result))
                .collect();
            println!("{}", blocks.join("\n\n"));
        }
        OutputFormat::Json => {
            let report: Vec<ResolvedReport<'_>> = resolved
                .iter()
                .map(|(name, result)| ResolvedReport {
                    name,
                    resolved: result,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
