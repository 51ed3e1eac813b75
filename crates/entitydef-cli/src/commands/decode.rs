//! Value decoding command

use super::{load_definitions, print_value, resolve_type};
use anyhow::{Context, Result};
use entitydef_core::{BinaryIStream, DataSection};

pub fn run(defs: &[String], name: &str, hex_bytes: &str, persistent_only: bool) -> Result<()> {
    let schema = load_definitions(defs)?;
    let data_type = resolve_type(&schema, name)?;

    let bytes = hex::decode(hex_bytes.trim()).context("Invalid hex input")?;
    let mut input = BinaryIStream::new(&bytes);
    let mut section = DataSection::new("value");
    if !data_type.from_stream_to_section(&mut input, &mut section, persistent_only) {
        anyhow::bail!("Bytes do not decode as {}", data_type.type_name());
    }
    if !input.is_finished() {
        anyhow::bail!(
            "{} bytes left over after decoding {}",
            input.remaining_length(),
            data_type.type_name()
        );
    }

    print_value(&section)
}
