use std::fs;
use std::path::Path;

use policy_core::UnifiedPolicy;
use thiserror::Error;

/// Origin tag for imported records that do not carry one.
pub const IMPORT_ORIGIN: &str = "import";

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read policy file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse policy file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Load a JSON array of policy records, as written by `policies --format json`.
pub fn load_policy_file(path: &Path) -> Result<Vec<UnifiedPolicy>, ImportError> {
    let raw = fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_policies(&raw).map_err(|source| ImportError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Parse policy records, filling a missing origin with [`IMPORT_ORIGIN`] and a
/// missing id with the policy name.
pub fn parse_policies(raw: &str) -> Result<Vec<UnifiedPolicy>, serde_json::Error> {
    let mut policies: Vec<UnifiedPolicy> = serde_json::from_str(raw)?;
    for policy in &mut policies {
        if policy.origin.trim().is_empty() {
            policy.origin = IMPORT_ORIGIN.to_string();
        }
        if policy.id.trim().is_empty() {
            policy.id = policy.name.clone();
        }
    }
    Ok(policies)
}
