//! Length-prefixed byte types: `STRING`, `UNICODE_STRING` and `BLOB`

use super::scalar::{add_token_to_md5, scalar_element, ScalarCodec};
use crate::data_type::DataType;
use crate::sink::DataSink;
use crate::source::DataSource;
use crate::stream_element::StreamElement;
use crate::value::Value;
use entitydef_core::{BinaryIStream, BinaryOStream, DataSection, Md5};
use std::cmp::Ordering;

/// Write `bytes` length-prefixed, or an empty run if that is not possible
fn write_or_empty(stream: &mut BinaryOStream, bytes: Option<&[u8]>) -> bool {
    match bytes {
        Some(bytes) if stream.write_blob(bytes) => true,
        _ => {
            stream.write_packed_int(0);
            false
        }
    }
}

/// `STRING` and `UNICODE_STRING`. Both carry UTF-8 on the wire.
pub struct StringDataType {
    unicode: bool,
    default: Option<Value>,
}

impl StringDataType {
    pub fn narrow() -> Self {
        Self {
            unicode: false,
            default: None,
        }
    }

    pub fn unicode() -> Self {
        Self {
            unicode: true,
            default: None,
        }
    }

    fn read(&self, source: &mut dyn DataSource) -> Option<String> {
        if self.unicode {
            source.read_wide_string()
        } else {
            source.read_string()
        }
    }

    fn write(&self, sink: &mut dyn DataSink, value: &str) -> bool {
        if self.unicode {
            sink.write_wide_string(value)
        } else {
            sink.write_string(value)
        }
    }
}

impl ScalarCodec for StringDataType {
    fn encode(&self, source: &mut dyn DataSource, stream: &mut BinaryOStream) -> bool {
        let value = self.read(source);
        write_or_empty(stream, value.as_deref().map(str::as_bytes))
    }

    fn decode(&self, stream: &mut BinaryIStream<'_>, sink: &mut dyn DataSink) -> bool {
        let Some(bytes) = stream.read_blob() else {
            return false;
        };
        match std::str::from_utf8(bytes) {
            Ok(text) => self.write(sink, text),
            Err(err) => {
                log::warn!("{}: invalid UTF-8 on stream: {}", self.meta_name(), err);
                false
            }
        }
    }
}

impl DataType for StringDataType {
    common_type_methods!();

    fn meta_name(&self) -> &str {
        if self.unicode {
            "UNICODE_STRING"
        } else {
            "STRING"
        }
    }

    fn is_same_type(&self, value: &Value) -> bool {
        matches!(value, Value::String(_))
    }

    fn default_value(&self) -> Value {
        self.default
            .clone()
            .unwrap_or_else(|| Value::String(String::new()))
    }

    fn stream_size(&self) -> Option<usize> {
        None
    }

    fn add_to_section(&self, source: &mut dyn DataSource, section: &mut DataSection) -> bool {
        match self.read(source) {
            Some(value) => {
                section.set_string(value);
                true
            }
            None => false,
        }
    }

    fn create_from_section(&self, section: &DataSection, sink: &mut dyn DataSink) -> bool {
        self.write(sink, section.as_string())
    }

    fn add_to_md5(&self, md5: &mut Md5) {
        add_token_to_md5(md5, self.meta_name());
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

/// `BLOB`: opaque bytes, base64 text in sections
pub struct BlobDataType {
    default: Option<Value>,
}

impl BlobDataType {
    pub fn new() -> Self {
        Self { default: None }
    }
}

impl Default for BlobDataType {
    fn default() -> Self {
        Self::new()
    }
}

impl ScalarCodec for BlobDataType {
    fn encode(&self, source: &mut dyn DataSource, stream: &mut BinaryOStream) -> bool {
        let value = source.read_blob();
        write_or_empty(stream, value.as_deref())
    }

    fn decode(&self, stream: &mut BinaryIStream<'_>, sink: &mut dyn DataSink) -> bool {
        stream.read_blob().is_some_and(|bytes| sink.write_blob(bytes))
    }
}

impl DataType for BlobDataType {
    common_type_methods!();

    fn meta_name(&self) -> &str {
        "BLOB"
    }

    fn is_same_type(&self, value: &Value) -> bool {
        matches!(value, Value::Blob(_))
    }

    fn default_value(&self) -> Value {
        self.default.clone().unwrap_or(Value::Blob(Vec::new()))
    }

    fn stream_size(&self) -> Option<usize> {
        None
    }

    fn add_to_section(&self, source: &mut dyn DataSource, section: &mut DataSection) -> bool {
        match source.read_blob() {
            Some(bytes) => {
                section.set_blob(&bytes);
                true
            }
            None => false,
        }
    }

    fn create_from_section(&self, section: &DataSection, sink: &mut dyn DataSink) -> bool {
        match section.as_blob() {
            Some(bytes) => sink.write_blob(&bytes),
            None => {
                log::warn!("BLOB: section '{}' is not valid base64", section.name());
                false
            }
        }
    }

    fn add_to_md5(&self, md5: &mut Md5) {
        add_token_to_md5(md5, "BLOB");
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
