use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use policy_core::{MaskPolicy, Zone};
use serde::Deserialize;
use thiserror::Error;

/// Tunables for reading a profile export.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Reject non-contiguous dotted netmasks instead of counting their bits.
    #[serde(default)]
    pub strict_masks: bool,
    /// Origin tag for policies built from the profile.
    #[serde(default = "default_origin")]
    pub origin: String,
    /// Interface `if-property` label (lowercase) to zone.
    #[serde(default)]
    pub zone_labels: BTreeMap<String, Zone>,
}

impl Settings {
    pub fn mask_policy(&self) -> MaskPolicy {
        if self.strict_masks {
            MaskPolicy::Strict
        } else {
            MaskPolicy::Lenient
        }
    }

    /// Zone for an interface label; unknown labels fall back to [`Zone::from_label`].
    pub fn zone_for(&self, label: &str) -> Zone {
        let key = label.trim().to_ascii_lowercase();
        self.zone_labels
            .get(&key)
            .copied()
            .unwrap_or_else(|| Zone::from_label(&key))
    }

    fn normalized(mut self) -> Self {
        self.zone_labels = self
            .zone_labels
            .into_iter()
            .map(|(label, zone)| (label.trim().to_ascii_lowercase(), zone))
            .collect();
        if self.origin.trim().is_empty() {
            self.origin = default_origin();
        }
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            strict_masks: false,
            origin: default_origin(),
            zone_labels: BTreeMap::new(),
        }
    }
}

/// Errors returned when loading a settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Load settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<Settings, SettingsError> {
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_settings(&raw, path.display().to_string())
}

const EMBEDDED: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/settings/default.toml"));

/// Built-in settings shipped with the binary.
pub fn default_settings() -> Settings {
    parse_toml(EMBEDDED, "embedded settings".to_string()).unwrap_or_default()
}

/// Parse an override file. Its `zone_labels` are laid over the embedded table.
fn parse_settings(raw: &str, path: String) -> Result<Settings, SettingsError> {
    let mut settings = parse_toml(raw, path)?;
    let mut labels = default_settings().zone_labels;
    labels.append(&mut settings.zone_labels);
    settings.zone_labels = labels;
    Ok(settings)
}

fn parse_toml(raw: &str, path: String) -> Result<Settings, SettingsError> {
    let parsed: Settings =
        toml::from_str(raw).map_err(|source| SettingsError::Parse { path, source })?;
    Ok(parsed.normalized())
}

fn default_origin() -> String {
    policy_core::CONFIG_ORIGIN.to_string()
}
