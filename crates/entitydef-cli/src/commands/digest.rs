//! Schema fingerprint command

use super::load_definitions;
use anyhow::Result;

pub fn run(defs: &[String]) -> Result<()> {
    let schema = load_definitions(defs)?;

    println!("{}", schema.digest());
    for name in schema.type_names() {
        if let Some(data_type) = schema.get_type(name) {
            println!("  {} {}", data_type.digest(), name);
        }
    }
    Ok(())
}
