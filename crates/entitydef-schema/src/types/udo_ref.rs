//! `UDO_REF`: a reference to a user data object by unique id

use super::scalar::{add_token_to_md5, scalar_element, ScalarCodec};
use crate::data_type::DataType;
use crate::sink::DataSink;
use crate::source::DataSource;
use crate::stream_element::StreamElement;
use crate::value::Value;
use entitydef_core::{BinaryIStream, BinaryOStream, DataSection, Md5, UniqueId};
use std::cmp::Ordering;

/// Four u32 words on the wire. The zero id is the null reference. In
/// sections the id is written in its dotted hex form, or left empty.
pub struct UdoRefDataType {
    default: Option<Value>,
}

impl UdoRefDataType {
    pub fn new() -> Self {
        Self { default: None }
    }
}

impl Default for UdoRefDataType {
    fn default() -> Self {
        Self::new()
    }
}

impl ScalarCodec for UdoRefDataType {
    fn encode(&self, source: &mut dyn DataSource, stream: &mut BinaryOStream) -> bool {
        let id = source.read_unique_id();
        for word in id.unwrap_or_default().to_array() {
            stream.write_u32(word);
        }
        id.is_some()
    }

    fn decode(&self, stream: &mut BinaryIStream<'_>, sink: &mut dyn DataSink) -> bool {
        let (Some(a), Some(b), Some(c), Some(d)) = (
            stream.read_u32(),
            stream.read_u32(),
            stream.read_u32(),
            stream.read_u32(),
        ) else {
            return false;
        };
        sink.write_unique_id(&UniqueId::new(a, b, c, d))
    }
}

impl DataType for UdoRefDataType {
    common_type_methods!();

    fn meta_name(&self) -> &str {
        "UDO_REF"
    }

    /// The zero id is only expressed as `Value::None`
    fn is_same_type(&self, value: &Value) -> bool {
        match value {
            Value::None => true,
            Value::UniqueId(id) => !id.is_zero(),
            _ => false,
        }
    }

    fn default_value(&self) -> Value {
        self.default.clone().unwrap_or(Value::None)
    }

    fn stream_size(&self) -> Option<usize> {
        Some(16)
    }

    fn add_to_section(&self, source: &mut dyn DataSource, section: &mut DataSection) -> bool {
        match source.read_unique_id() {
            Some(id) if id.is_zero() => {
                section.set_string("");
                true
            }
            Some(id) => {
                section.set_string(id.to_string());
                true
            }
            None => false,
        }
    }

    fn create_from_section(&self, section: &DataSection, sink: &mut dyn DataSink) -> bool {
        let text = section.as_string().trim();
        if text.is_empty() {
            return sink.write_unique_id(&UniqueId::ZERO);
        }
        match UniqueId::parse(text) {
            Some(id) => sink.write_unique_id(&id),
            None => {
                log::warn!("UDO_REF: cannot read '{}' from section '{}'", text, section.name());
                false
            }
        }
    }

    fn add_to_md5(&self, md5: &mut Md5) {
        add_token_to_md5(md5, "UDO_REF");
    }

    fn stream_element<'a>(
        &'a self,
        index: usize,
        _size: &mut usize,
        _is_none: &mut bool,
        _persistent_only: bool,
    ) -> Option<Box<dyn StreamElement<'a> + 'a>> {
        scalar_element(self, index)
    }

    fn compare_same_meta(&self, _other: &dyn DataType) -> Ordering {
        Ordering::Equal
    }
}
