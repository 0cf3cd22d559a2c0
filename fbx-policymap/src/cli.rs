use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "fbx-policymap")]
#[command(about = "Resolve aliases and materialize policies from Firebox profile exports")]
pub struct Cli {
    /// Settings file overriding the built-in defaults.
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,
    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Resolve alias, group or builtin names to networks and hosts.
    Resolve(ResolveArgs),
    /// Materialize, merge and filter policies.
    Policies(PoliciesArgs),
    /// List interfaces with zone, VLAN and networks.
    Interfaces(InterfacesArgs),
    /// Count policies per /24 bucket.
    Subnets(SubnetsArgs),
}

#[derive(Parser, Debug)]
pub struct ResolveArgs {
    pub profile: PathBuf,
    #[arg(required = true)]
    pub names: Vec<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct PoliciesArgs {
    pub profile: PathBuf,
    /// JSON policy file merged after the profile's own policies. Repeatable.
    #[arg(long = "import")]
    pub imports: Vec<PathBuf>,
    /// Keep policies with a network overlapping this CIDR.
    #[arg(long)]
    pub subnet: Option<String>,
    /// Keep policies with a network containing this address.
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long, value_enum, default_value_t = SideArg::Either)]
    pub side: SideArg,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Print counts only.
    #[arg(long)]
    pub summary: bool,
}

#[derive(Parser, Debug)]
pub struct InterfacesArgs {
    pub profile: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct SubnetsArgs {
    pub profile: PathBuf,
    /// JSON policy file merged after the profile's own policies. Repeatable.
    #[arg(long = "import")]
    pub imports: Vec<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SideArg {
    Src,
    Dst,
    Either,
}
