//! `USER_TYPE`: a value whose representation belongs to a named implementor

use crate::custom::{custom_element, CustomStreaming};
use crate::data_type::{compare_params, DataType};
use crate::meta::MetaDataType;
use crate::registry::Registry;
use crate::sink::DataSink;
use crate::source::DataSource;
use crate::stream_element::StreamElement;
use crate::value::Value;
use entitydef_core::{DataSection, EntityDefError, Md5, Result};
use std::cmp::Ordering;
use std::sync::Arc;

pub struct UserDataType {
    implementor_name: String,
    implementor: Arc<dyn CustomStreaming>,
    default: Option<Value>,
}

impl UserDataType {
    pub fn new(implementor_name: impl Into<String>, implementor: Arc<dyn CustomStreaming>) -> Self {
        Self {
            implementor_name: implementor_name.into(),
            implementor,
            default: None,
        }
    }

    pub fn implementor_name(&self) -> &str {
        &self.implementor_name
    }
}

impl DataType for UserDataType {
    common_type_methods!();

    fn meta_name(&self) -> &str {
        "USER_TYPE"
    }

    fn type_name(&self) -> String {
        format!("USER_TYPE by {}", self.implementor_name)
    }

    fn is_same_type(&self, value: &Value) -> bool {
        self.implementor.is_same_type(value)
    }

    fn default_value(&self) -> Value {
        self.default
            .clone()
            .or_else(|| self.implementor.default_value())
            .unwrap_or_default()
    }

    fn stream_size(&self) -> Option<usize> {
        None
    }

    fn add_to_section(&self, source: &mut dyn DataSource, section: &mut DataSection) -> bool {
        source.read_custom_section(self, section)
    }

    fn create_from_section(&self, section: &DataSection, sink: &mut dyn DataSink) -> bool {
        sink.write_custom_section(self, section)
    }

    fn add_to_md5(&self, md5: &mut Md5) {
        md5.append(b"UserType\0");
        md5.append_str(&self.implementor_name);
    }

    fn stream_element<'a>(
        &'a self,
        index: usize,
        _size: &mut usize,
        _is_none: &mut bool,
        persistent_only: bool,
    ) -> Option<Box<dyn StreamElement<'a> + 'a>> {
        custom_element(self, index, persistent_only)
    }

    fn compare_same_meta(&self, other: &dyn DataType) -> Ordering {
        compare_params(self, other, |a, b| a.implementor_name.cmp(&b.implementor_name))
    }

    fn custom_streaming(&self) -> Option<&dyn CustomStreaming> {
        Some(self.implementor.as_ref())
    }
}

/// Builds `USER_TYPE` types from `implemented_by`
pub struct UserMetaDataType;

impl MetaDataType for UserMetaDataType {
    fn name(&self) -> &str {
        "USER_TYPE"
    }

    fn get_type(&self, section: &DataSection, registry: &Registry) -> Result<Box<dyn DataType>> {
        let name = section
            .read_string("implemented_by")
            .ok_or_else(|| EntityDefError::invalid("USER_TYPE", "missing 'implemented_by'"))?;
        let implementor = registry
            .implementor(name)
            .ok_or_else(|| EntityDefError::UnknownImplementor(name.to_string()))?;
        Ok(Box::new(UserDataType::new(name, implementor)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entitydef_core::{BinaryIStream, BinaryOStream};

    /// Streams a string as its length byte followed by the bytes reversed
    struct Reversed;

    impl CustomStreaming for Reversed {
        fn is_same_type(&self, value: &Value) -> bool {
            matches!(value, Value::String(_))
        }

        fn default_value(&self) -> Option<Value> {
            Some(Value::from("none"))
        }

        fn add_to_stream(&self, value: &Value, stream: &mut BinaryOStream, _persistent_only: bool) -> bool {
            let Some(text) = value.as_str() else {
                return false;
            };
            let bytes: Vec<u8> = text.bytes().rev().collect();
            stream.write_blob(&bytes)
        }

        fn create_from_stream(&self, stream: &mut BinaryIStream<'_>, _persistent_only: bool) -> Option<Value> {
            let bytes: Vec<u8> = stream.read_blob()?.iter().rev().copied().collect();
            String::from_utf8(bytes).ok().map(Value::String)
        }

        fn add_to_section(&self, value: &Value, section: &mut DataSection) -> bool {
            match value.as_str() {
                Some(text) => {
                    section.set_string(text);
                    true
                }
                None => false,
            }
        }

        fn create_from_section(&self, section: &DataSection) -> Option<Value> {
            Some(Value::from(section.as_string()))
        }
    }

    #[test]
    fn test_implementor_owns_the_bytes() {
        let user = UserDataType::new("Reversed", Arc::new(Reversed));
        let data_type: &dyn DataType = &user;

        let mut stream = BinaryOStream::new();
        assert!(data_type.value_to_stream(&Value::from("abc"), &mut stream, false));
        assert_eq!(stream.data(), &[3, b'c', b'b', b'a']);

        let mut input = BinaryIStream::new(stream.data());
        assert_eq!(data_type.value_from_stream(&mut input, false), Some(Value::from("abc")));
    }

    #[test]
    fn test_single_custom_element() {
        let user = UserDataType::new("Reversed", Arc::new(Reversed));
        let mut size = 0;
        let mut is_none = false;
        let first = user.stream_element(0, &mut size, &mut is_none, false);
        assert!(first.is_some_and(|e| e.is_custom_streamed()));
        assert!(user.stream_element(1, &mut size, &mut is_none, false).is_none());
    }

    #[test]
    fn test_default_and_digest() {
        let user = UserDataType::new("Reversed", Arc::new(Reversed));
        assert_eq!(user.default_value(), Value::from("none"));
        assert_eq!(user.type_name(), "USER_TYPE by Reversed");

        let other = UserDataType::new("Other", Arc::new(Reversed));
        let a: &dyn DataType = &user;
        let b: &dyn DataType = &other;
        assert_ne!(a.digest(), b.digest());
        assert_ne!(a.compare(b), Ordering::Equal);
    }
}
