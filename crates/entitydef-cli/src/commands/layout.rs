//! Stream layout command

use super::{load_definitions, resolve_type};
use anyhow::Result;
use entitydef_schema::{ElementKind, ElementWalker, StreamElement};

pub fn run(defs: &[String], name: &str, persistent_only: bool) -> Result<()> {
    let schema = load_definitions(defs)?;
    let data_type = resolve_type(&schema, name)?;

    for walked in ElementWalker::new(data_type.as_ref(), persistent_only) {
        let element = walked.element.as_ref();
        println!("{}{}", "  ".repeat(walked.depth), describe(element));
    }
    Ok(())
}

fn describe(element: &dyn StreamElement<'_>) -> String {
    let mut line = match element.kind() {
        ElementKind::Value => element.data_type().type_name(),
        ElementKind::Custom => format!("custom {}", element.data_type().type_name()),
        ElementKind::Begin => format!("begin {}", element.data_type().meta_name()),
        ElementKind::End => format!("end {}", element.data_type().meta_name()),
        ElementKind::EnterItem(index) => format!("[{}]", index),
        ElementKind::LeaveItem(index) => format!("[/{}]", index),
        ElementKind::EnterField => format!(".{}", element.field_name().unwrap_or_default()),
        ElementKind::LeaveField => format!("./{}", element.field_name().unwrap_or_default()),
    };

    let flags = [
        (element.is_none_able(), "none-able"),
        (element.is_variable_sized(), "counted"),
        (element.is_substream_start(), "blob start"),
        (element.is_substream_end(), "blob end"),
    ];
    for (set, flag) in flags {
        if set {
            line.push_str(&format!(" ({})", flag));
        }
    }
    line
}
