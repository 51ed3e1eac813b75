//! CLI command implementations

pub mod decode;
pub mod describe;
pub mod digest;
pub mod encode;
pub mod layout;

use anyhow::{Context, Result};
use entitydef_schema::{DataType, SchemaRegistry};
use std::path::Path;
use std::sync::Arc;

/// Load every definition directory, later ones overriding earlier ones
pub fn load_definitions(defs: &[String]) -> Result<SchemaRegistry> {
    for dir in defs {
        if !Path::new(dir).exists() {
            anyhow::bail!("Definitions directory not found: {}", dir);
        }
    }
    SchemaRegistry::load_from_directories(defs).context("Failed to load definitions")
}

/// Look up a named type or build a bare type token
pub fn resolve_type(schema: &SchemaRegistry, name: &str) -> Result<Arc<dyn DataType>> {
    schema
        .resolve(name)
        .with_context(|| format!("Unknown type '{}'", name))
}

/// Print a value section as a TOML document with a `value` key
pub fn print_value(section: &entitydef_core::DataSection) -> Result<()> {
    let mut document = toml::Table::new();
    document.insert("value".to_string(), section.to_toml());
    print!("{}", toml::to_string(&document).context("Failed to format value")?);
    Ok(())
}
