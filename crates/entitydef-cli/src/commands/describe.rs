//! Type introspection command

use super::{load_definitions, print_value, resolve_type};
use anyhow::Result;
use entitydef_core::DataSection;

pub fn run(defs: &[String], name: Option<&str>) -> Result<()> {
    let schema = load_definitions(defs)?;

    let Some(name) = name else {
        let names = schema.type_names();
        if names.is_empty() {
            println!("No types defined.");
            return Ok(());
        }
        println!("Types:");
        for name in names {
            if let Some(data_type) = schema.get_type(name) {
                println!("  {} : {}", name, data_type.type_name());
            }
        }
        return Ok(());
    };

    let data_type = resolve_type(&schema, name)?;
    println!("Type: {}", name);
    println!("Definition: {}", data_type.type_name());
    match data_type.stream_size() {
        Some(size) => println!("Stream size: {} bytes", size),
        None => println!("Stream size: variable"),
    }
    println!("Digest: {}", data_type.digest());

    let mut section = DataSection::new("value");
    if data_type.value_to_section(&data_type.default_value(), &mut section) {
        println!();
        println!("Default:");
        print_value(&section)?;
    } else {
        log::warn!("Default value of {} cannot be shown", name);
    }

    Ok(())
}
