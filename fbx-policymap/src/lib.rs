//! Firebox profile reading and reporting on top of `policy-core`.
//!
//! - [`profile`]: profile XML into interfaces, alias/group tables, policies
//!   and abs-policy overlays
//! - [`import`]: JSON policy files merged as a secondary source
//! - [`settings`]: embedded TOML defaults with optional override file
//! - [`report`]: terminal and JSON renderings used by the CLI

pub mod import;
pub mod profile;
pub mod report;
pub mod settings;
