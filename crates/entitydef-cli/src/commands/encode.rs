//! Value encoding command

use super::{load_definitions, resolve_type};
use anyhow::{Context, Result};
use entitydef_core::{BinaryOStream, DataSection};
use std::fs;

pub fn run(defs: &[String], name: &str, value_path: &str, persistent_only: bool) -> Result<()> {
    let schema = load_definitions(defs)?;
    let data_type = resolve_type(&schema, name)?;

    let content = fs::read_to_string(value_path)
        .with_context(|| format!("Failed to read value file: {}", value_path))?;
    let document: toml::Table = toml::from_str(&content)
        .with_context(|| format!("Failed to parse value file: {}", value_path))?;
    let value = document
        .get("value")
        .with_context(|| format!("No 'value' key in {}", value_path))?;

    let section = DataSection::from_toml("value", value);
    let mut stream = BinaryOStream::new();
    if !data_type.from_section_to_stream(&section, &mut stream, persistent_only) {
        anyhow::bail!("Value does not match type {}", data_type.type_name());
    }

    println!("{}", hex::encode(stream.data()));
    Ok(())
}
