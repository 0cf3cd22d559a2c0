//! Firebox profile export reading.
//!
//! The export is read into a small element tree first ([`tree`]) and the
//! engine's input records are pulled out of that ([`extract`]).

use std::fs;
use std::path::Path;

use policy_core::{
    Domain, Materializer, OverlayNode, PolicyNode, ProfileTables, Resolver, UnifiedPolicy,
};
use thiserror::Error;
use tracing::debug;

use crate::settings::Settings;

pub mod extract;
pub mod tree;

pub use tree::{read_tree, ProfileNode};

const ROOT_TAG: &str = "profile";

/// Errors that can occur while reading a profile export.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to read profile {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse profile XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("failed to decode profile text: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),
    #[error("invalid UTF-8 in profile XML: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("malformed profile: {0}")]
    Malformed(String),
}

/// Everything the engine needs from one profile export.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub domain: Domain,
    pub tables: ProfileTables,
    pub policies: Vec<PolicyNode>,
    pub overlays: Vec<OverlayNode>,
}

impl Profile {
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.domain, &self.tables)
    }

    /// Base policies and overlay variants, tagged with `origin`.
    pub fn materialize(&self, origin: &str) -> Vec<UnifiedPolicy> {
        Materializer::new(self.resolver())
            .origin(origin)
            .materialize(&self.policies, &self.overlays)
    }
}

/// Parse a profile export from bytes.
pub fn parse_profile(xml: &[u8], settings: &Settings) -> Result<Profile, ProfileError> {
    let root = read_tree(xml)?;
    if root.tag != ROOT_TAG {
        return Err(ProfileError::Malformed(format!(
            "expected <{ROOT_TAG}> root element, found <{}>",
            root.tag
        )));
    }

    let interfaces = extract::interfaces(&root, settings);
    let tables = ProfileTables::new(
        extract::aliases(&root),
        extract::address_groups(&root, settings),
    );
    let policies = extract::policies(&root);
    let overlays = extract::overlays(&root);
    debug!(
        interfaces = interfaces.len(),
        aliases = tables.aliases.len(),
        groups = tables.groups.len(),
        policies = policies.len(),
        overlays = overlays.len(),
        "extracted profile"
    );

    Ok(Profile {
        domain: Domain::build(interfaces),
        tables,
        policies,
        overlays,
    })
}

/// Read and parse a profile export file.
pub fn load_profile(path: &Path, settings: &Settings) -> Result<Profile, ProfileError> {
    let bytes = fs::read(path).map_err(|source| ProfileError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_profile(&bytes, settings)
}
