//! Fixed-width integer types

use super::scalar::{add_token_to_md5, scalar_element, ScalarCodec};
use crate::data_type::DataType;
use crate::sink::DataSink;
use crate::source::DataSource;
use crate::stream_element::StreamElement;
use crate::value::Value;
use entitydef_core::{BinaryIStream, BinaryOStream, DataSection, Md5};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntKind {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
}

impl IntKind {
    pub const ALL: [IntKind; 8] = [
        IntKind::Int8,
        IntKind::Int16,
        IntKind::Int32,
        IntKind::Int64,
        IntKind::UInt8,
        IntKind::UInt16,
        IntKind::UInt32,
        IntKind::UInt64,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            IntKind::Int8 => "INT8",
            IntKind::Int16 => "INT16",
            IntKind::Int32 => "INT32",
            IntKind::Int64 => "INT64",
            IntKind::UInt8 => "UINT8",
            IntKind::UInt16 => "UINT16",
            IntKind::UInt32 => "UINT32",
            IntKind::UInt64 => "UINT64",
        }
    }

    pub fn size(&self) -> usize {
        match self {
            IntKind::Int8 | IntKind::UInt8 => 1,
            IntKind::Int16 | IntKind::UInt16 => 2,
            IntKind::Int32 | IntKind::UInt32 => 4,
            IntKind::Int64 | IntKind::UInt64 => 8,
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            IntKind::Int8 | IntKind::Int16 | IntKind::Int32 | IntKind::Int64
        )
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            IntKind::Int8 => value.as_i64().is_some_and(|v| i8::try_from(v).is_ok()),
            IntKind::Int16 => value.as_i64().is_some_and(|v| i16::try_from(v).is_ok()),
            IntKind::Int32 => value.as_i64().is_some_and(|v| i32::try_from(v).is_ok()),
            IntKind::Int64 => value.as_i64().is_some(),
            IntKind::UInt8 => value.as_u64().is_some_and(|v| u8::try_from(v).is_ok()),
            IntKind::UInt16 => value.as_u64().is_some_and(|v| u16::try_from(v).is_ok()),
            IntKind::UInt32 => value.as_u64().is_some_and(|v| u32::try_from(v).is_ok()),
            IntKind::UInt64 => value.as_u64().is_some(),
        }
    }
}

/// `INT8` through `UINT64`
pub struct IntegerDataType {
    kind: IntKind,
    default: Option<Value>,
}

impl IntegerDataType {
    pub fn new(kind: IntKind) -> Self {
        Self {
            kind,
            default: None,
        }
    }

    pub fn kind(&self) -> IntKind {
        self.kind
    }
}

impl ScalarCodec for IntegerDataType {
    fn encode(&self, source: &mut dyn DataSource, stream: &mut BinaryOStream) -> bool {
        match self.kind {
            IntKind::Int8 => {
                let v = source.read_i8();
                stream.write_i8(v.unwrap_or_default());
                v.is_some()
            }
            IntKind::Int16 => {
                let v = source.read_i16();
                stream.write_i16(v.unwrap_or_default());
                v.is_some()
            }
            IntKind::Int32 => {
                let v = source.read_i32();
                stream.write_i32(v.unwrap_or_default());
                v.is_some()
            }
            IntKind::Int64 => {
                let v = source.read_i64();
                stream.write_i64(v.unwrap_or_default());
                v.is_some()
            }
            IntKind::UInt8 => {
                let v = source.read_u8();
                stream.write_u8(v.unwrap_or_default());
                v.is_some()
            }
            IntKind::UInt16 => {
                let v = source.read_u16();
                stream.write_u16(v.unwrap_or_default());
                v.is_some()
            }
            IntKind::UInt32 => {
                let v = source.read_u32();
                stream.write_u32(v.unwrap_or_default());
                v.is_some()
            }
            IntKind::UInt64 => {
                let v = source.read_u64();
                stream.write_u64(v.unwrap_or_default());
                v.is_some()
            }
        }
    }

    fn decode(&self, stream: &mut BinaryIStream<'_>, sink: &mut dyn DataSink) -> bool {
        match self.kind {
            IntKind::Int8 => stream.read_i8().is_some_and(|v| sink.write_i8(v)),
            IntKind::Int16 => stream.read_i16().is_some_and(|v| sink.write_i16(v)),
            IntKind::Int32 => stream.read_i32().is_some_and(|v| sink.write_i32(v)),
            IntKind::Int64 => stream.read_i64().is_some_and(|v| sink.write_i64(v)),
            IntKind::UInt8 => stream.read_u8().is_some_and(|v| sink.write_u8(v)),
            IntKind::UInt16 => stream.read_u16().is_some_and(|v| sink.write_u16(v)),
            IntKind::UInt32 => stream.read_u32().is_some_and(|v| sink.write_u32(v)),
            IntKind::UInt64 => stream.read_u64().is_some_and(|v| sink.write_u64(v)),
        }
    }
}

impl DataType for IntegerDataType {
    common_type_methods!();

    fn meta_name(&self) -> &str {
        self.kind.token()
    }

    fn is_same_type(&self, value: &Value) -> bool {
        self.kind.accepts(value)
    }

    fn default_value(&self) -> Value {
        match &self.default {
            Some(value) => value.clone(),
            None if self.kind.is_signed() => Value::Int(0),
            None => Value::UInt(0),
        }
    }

    fn stream_size(&self) -> Option<usize> {
        Some(self.kind.size())
    }

    fn add_to_section(&self, source: &mut dyn DataSource, section: &mut DataSection) -> bool {
        let written = match self.kind {
            IntKind::Int8 => source.read_i8().map(|v| section.set_int(v.into())),
            IntKind::Int16 => source.read_i16().map(|v| section.set_int(v.into())),
            IntKind::Int32 => source.read_i32().map(|v| section.set_int(v.into())),
            IntKind::Int64 => source.read_i64().map(|v| section.set_int(v)),
            IntKind::UInt8 => source.read_u8().map(|v| section.set_uint(v.into())),
            IntKind::UInt16 => source.read_u16().map(|v| section.set_uint(v.into())),
            IntKind::UInt32 => source.read_u32().map(|v| section.set_uint(v.into())),
            IntKind::UInt64 => source.read_u64().map(|v| section.set_uint(v)),
        };
        written.is_some()
    }

    fn create_from_section(&self, section: &DataSection, sink: &mut dyn DataSink) -> bool {
        let ok = match self.kind {
            IntKind::Int8 => section.as_parsed().map(|v| sink.write_i8(v)),
            IntKind::Int16 => section.as_parsed().map(|v| sink.write_i16(v)),
            IntKind::Int32 => section.as_parsed().map(|v| sink.write_i32(v)),
            IntKind::Int64 => section.as_parsed().map(|v| sink.write_i64(v)),
            IntKind::UInt8 => section.as_parsed().map(|v| sink.write_u8(v)),
            IntKind::UInt16 => section.as_parsed().map(|v| sink.write_u16(v)),
            IntKind::UInt32 => section.as_parsed().map(|v| sink.write_u32(v)),
            IntKind::UInt64 => section.as_parsed().map(|v| sink.write_u64(v)),
        };
        if ok.is_none() {
            log::warn!(
                "{}: cannot read '{}' from section '{}'",
                self.kind.token(),
                section.as_string(),
                section.name()
            );
        }
        ok.unwrap_or(false)
    }

    fn add_to_md5(&self, md5: &mut Md5) {
        add_token_to_md5(md5, self.kind.token());
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
