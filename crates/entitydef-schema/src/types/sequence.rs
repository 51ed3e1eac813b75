//! `ARRAY` and `TUPLE`: runs of same-typed elements
//!
//! A sequence with a fixed `size` carries no count on the wire. Otherwise
//! a packed count precedes the elements. With `db_len` set, persistent
//! streaming wraps the whole sequence in a length-prefixed blob.

use crate::data_type::{compare_params, DataType};
use crate::meta::MetaDataType;
use crate::registry::Registry;
use crate::sink::DataSink;
use crate::source::{DataSource, SequenceLength};
use crate::stream_element::{ElementKind, LevelState, StreamElement};
use crate::value::Value;
use entitydef_core::{
    BinaryIStream, BinaryOStream, DataSection, EntityDefError, Md5, Result, ITEM_SECTION,
    MAX_PACKED_INT,
};
use std::cmp::Ordering;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKind {
    Array,
    Tuple,
}

impl SequenceKind {
    pub fn token(&self) -> &'static str {
        match self {
            SequenceKind::Array => "ARRAY",
            SequenceKind::Tuple => "TUPLE",
        }
    }

    fn digest_tag(&self) -> &'static [u8] {
        match self {
            SequenceKind::Array => b"Array\0",
            SequenceKind::Tuple => b"Tuple\0",
        }
    }
}

pub struct SequenceDataType {
    kind: SequenceKind,
    element: Arc<dyn DataType>,
    size: usize,
    db_len: usize,
    default: Option<Value>,
}

impl SequenceDataType {
    /// `size` of 0 means the count is carried on the wire
    pub fn new(kind: SequenceKind, element: Arc<dyn DataType>, size: usize, db_len: usize) -> Self {
        Self {
            kind,
            element,
            size,
            db_len,
            default: None,
        }
    }

    pub fn kind(&self) -> SequenceKind {
        self.kind
    }

    pub fn element_type(&self) -> &Arc<dyn DataType> {
        &self.element
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_fixed_size(&self) -> bool {
        self.size > 0
    }

    pub fn db_len(&self) -> usize {
        self.db_len
    }

    fn is_substream(&self, persistent_only: bool) -> bool {
        persistent_only && self.db_len > 0
    }

    fn begin_sink(&self, sink: &mut dyn DataSink, count: usize) -> bool {
        match self.kind {
            SequenceKind::Array => sink.begin_array(self, count),
            SequenceKind::Tuple => sink.begin_tuple(self, count),
        }
    }

    fn wrap(&self, items: Vec<Value>) -> Value {
        match self.kind {
            SequenceKind::Array => Value::List(items),
            SequenceKind::Tuple => Value::Tuple(items),
        }
    }
}

struct SequenceBegin<'a> {
    seq: &'a SequenceDataType,
    persistent_only: bool,
}

impl<'a> StreamElement<'a> for SequenceBegin<'a> {
    fn kind(&self) -> ElementKind {
        ElementKind::Begin
    }

    fn data_type(&self) -> &'a dyn DataType {
        self.seq
    }

    fn from_source_to_stream(
        &self,
        source: &mut dyn DataSource,
        stream: &mut BinaryOStream,
        state: &mut LevelState,
    ) -> bool {
        let seq = self.seq;
        let (mut count, mut ok) = match source.begin_sequence() {
            SequenceLength::Known(count) => (count, true),
            SequenceLength::Unknown if seq.is_fixed_size() => (seq.size, true),
            SequenceLength::Unknown => {
                log::error!("{}: source cannot report an element count", seq.type_name());
                (0, false)
            }
            SequenceLength::Missing => (0, false),
        };

        if !seq.is_fixed_size() {
            match u32::try_from(count).ok().filter(|c| *c <= MAX_PACKED_INT) {
                Some(packed) => {
                    stream.write_packed_int(packed);
                }
                None => {
                    log::error!(
                        "{}: {} elements is too many to stream",
                        seq.type_name(),
                        count
                    );
                    stream.write_packed_int(0);
                    count = 0;
                    ok = false;
                }
            }
        } else if count != seq.size {
            if ok {
                log::error!(
                    "{}: source has {} elements but the type requires {}",
                    seq.type_name(),
                    count,
                    seq.size
                );
            }
            // Stream exactly `size` elements so the framing stays valid
            count = seq.size;
            ok = false;
        }

        state.size = count;
        ok
    }

    fn from_stream_to_sink(
        &self,
        stream: &mut BinaryIStream<'_>,
        sink: &mut dyn DataSink,
        state: &mut LevelState,
    ) -> bool {
        let seq = self.seq;
        let count = if seq.is_fixed_size() {
            seq.size
        } else {
            match stream.read_packed_int() {
                Some(count) => count as usize,
                None => {
                    log::error!("{}: missing element count", seq.type_name());
                    state.size = 0;
                    return false;
                }
            }
        };

        let per_item = seq.element.min_stream_size(self.persistent_only);
        if per_item.saturating_mul(count) > stream.remaining_length() {
            log::error!(
                "{}: {} elements need more than the {} bytes remaining",
                seq.type_name(),
                count,
                stream.remaining_length()
            );
            stream.set_error();
            state.size = 0;
            return false;
        }

        state.size = count;
        seq.begin_sink(sink, count)
    }

    fn is_variable_sized(&self) -> bool {
        !self.seq.is_fixed_size()
    }

    fn is_substream_start(&self) -> bool {
        self.seq.is_substream(self.persistent_only)
    }
}

struct SequenceItem<'a> {
    seq: &'a SequenceDataType,
    item: usize,
    enter: bool,
}

impl<'a> StreamElement<'a> for SequenceItem<'a> {
    fn kind(&self) -> ElementKind {
        if self.enter {
            ElementKind::EnterItem(self.item)
        } else {
            ElementKind::LeaveItem(self.item)
        }
    }

    fn data_type(&self) -> &'a dyn DataType {
        self.seq
    }

    fn from_source_to_stream(
        &self,
        source: &mut dyn DataSource,
        _stream: &mut BinaryOStream,
        _state: &mut LevelState,
    ) -> bool {
        if self.enter {
            source.enter_item(self.item)
        } else {
            source.leave_item()
        }
    }

    fn from_stream_to_sink(
        &self,
        _stream: &mut BinaryIStream<'_>,
        sink: &mut dyn DataSink,
        _state: &mut LevelState,
    ) -> bool {
        if self.enter {
            sink.enter_item(self.item)
        } else {
            sink.leave_item()
        }
    }

    fn child_type(&self) -> Option<&'a dyn DataType> {
        self.enter.then_some(self.seq.element.as_ref())
    }
}

struct SequenceEnd<'a> {
    seq: &'a SequenceDataType,
    persistent_only: bool,
}

impl<'a> StreamElement<'a> for SequenceEnd<'a> {
    fn kind(&self) -> ElementKind {
        ElementKind::End
    }

    fn data_type(&self) -> &'a dyn DataType {
        self.seq
    }

    fn from_source_to_stream(
        &self,
        _source: &mut dyn DataSource,
        _stream: &mut BinaryOStream,
        _state: &mut LevelState,
    ) -> bool {
        true
    }

    fn from_stream_to_sink(
        &self,
        _stream: &mut BinaryIStream<'_>,
        _sink: &mut dyn DataSink,
        _state: &mut LevelState,
    ) -> bool {
        true
    }

    fn is_substream_end(&self) -> bool {
        self.seq.is_substream(self.persistent_only)
    }
}

impl DataType for SequenceDataType {
    common_type_methods!();

    fn meta_name(&self) -> &str {
        self.kind.token()
    }

    fn type_name(&self) -> String {
        let mut name = self.kind.token().to_string();
        if self.is_fixed_size() {
            name.push_str(&format!(" size {}", self.size));
        }
        name.push_str(&format!(" of ({})", self.element.type_name()));
        name
    }

    fn is_same_type(&self, value: &Value) -> bool {
        let Some(items) = value.as_items() else {
            return false;
        };
        if self.is_fixed_size() && items.len() != self.size {
            return false;
        }
        items.iter().all(|item| self.element.is_same_type(item))
    }

    fn default_value(&self) -> Value {
        if let Some(value) = &self.default {
            return value.clone();
        }
        let item = self.element.default_value();
        self.wrap(vec![item; self.size])
    }

    fn stream_size(&self) -> Option<usize> {
        if !self.is_fixed_size() {
            return None;
        }
        self.element
            .stream_size()
            .map(|size| size.saturating_mul(self.size))
    }

    fn min_stream_size(&self, persistent_only: bool) -> usize {
        if self.is_substream(persistent_only) || !self.is_fixed_size() {
            return 1;
        }
        self.element
            .min_stream_size(persistent_only)
            .saturating_mul(self.size)
    }

    fn add_to_section(&self, source: &mut dyn DataSource, section: &mut DataSection) -> bool {
        let count = match source.begin_sequence() {
            SequenceLength::Known(count) => count,
            SequenceLength::Unknown if self.is_fixed_size() => self.size,
            _ => return false,
        };
        if self.is_fixed_size() && count != self.size {
            log::error!(
                "{}: source has {} elements but the type requires {}",
                self.type_name(),
                count,
                self.size
            );
            return false;
        }

        section.clear();
        let mut ok = true;
        for index in 0..count {
            let child = section.new_section(ITEM_SECTION);
            ok &= source.enter_item(index);
            ok &= self.element.add_to_section(source, child);
            ok &= source.leave_item();
        }
        ok
    }

    fn create_from_section(&self, section: &DataSection, sink: &mut dyn DataSink) -> bool {
        let items: Vec<&DataSection> = section.open_sections(ITEM_SECTION).collect();
        let count = if self.is_fixed_size() {
            if items.len() > self.size {
                log::error!(
                    "{}: section '{}' has {} items, more than the fixed size",
                    self.type_name(),
                    section.name(),
                    items.len()
                );
                return false;
            }
            self.size
        } else {
            items.len()
        };

        let mut ok = self.begin_sink(sink, count);
        for index in 0..count {
            ok &= sink.enter_item(index);
            ok &= match items.get(index) {
                Some(item) => self.element.create_from_section(item, sink),
                None => self.element.write_default(sink),
            };
            ok &= sink.leave_item();
        }
        ok
    }

    fn add_to_md5(&self, md5: &mut Md5) {
        md5.append(self.kind.digest_tag());
        md5.append(&(self.size as i32).to_le_bytes());
        if self.db_len > 0 {
            md5.append(&(self.db_len as i32).to_le_bytes());
        }
        self.element.add_to_md5(md5);
    }

    fn stream_element<'a>(
        &'a self,
        index: usize,
        size: &mut usize,
        _is_none: &mut bool,
        persistent_only: bool,
    ) -> Option<Box<dyn StreamElement<'a> + 'a>> {
        if index == 0 {
            *size = self.size;
            return Some(Box::new(SequenceBegin {
                seq: self,
                persistent_only,
            }));
        }

        let count = *size;
        if index <= 2 * count {
            Some(Box::new(SequenceItem {
                seq: self,
                item: (index - 1) / 2,
                enter: index % 2 == 1,
            }))
        } else if index == 2 * count + 1 {
            Some(Box::new(SequenceEnd {
                seq: self,
                persistent_only,
            }))
        } else {
            None
        }
    }

    fn compare_same_meta(&self, other: &dyn DataType) -> Ordering {
        compare_params(self, other, |a, b| {
            a.size
                .cmp(&b.size)
                .then(a.db_len.cmp(&b.db_len))
                .then_with(|| a.element.compare(b.element.as_ref()))
        })
    }
}

fn read_count(section: &DataSection, key: &str, token: &str) -> Result<usize> {
    match section.open_section(key) {
        None => Ok(0),
        Some(value) => value.as_parsed().ok_or_else(|| {
            EntityDefError::invalid(
                token,
                format!("'{}' must be a non-negative integer, got '{}'", key, value.as_string()),
            )
        }),
    }
}

fn build_sequence(
    kind: SequenceKind,
    section: &DataSection,
    registry: &Registry,
) -> Result<Box<dyn DataType>> {
    let token = kind.token();
    let of = section
        .open_section("of")
        .ok_or_else(|| EntityDefError::invalid(token, "missing element type 'of'"))?;
    let element = registry.build_type(of)?;
    let size = read_count(section, "size", token)?;
    let db_len = read_count(section, "db_len", token)?;
    Ok(Box::new(SequenceDataType::new(kind, element, size, db_len)))
}

/// Builds `ARRAY` types from `of`, `size` and `db_len`
pub struct ArrayMetaDataType;

impl MetaDataType for ArrayMetaDataType {
    fn name(&self) -> &str {
        "ARRAY"
    }

    fn get_type(&self, section: &DataSection, registry: &Registry) -> Result<Box<dyn DataType>> {
        build_sequence(SequenceKind::Array, section, registry)
    }
}

/// Builds `TUPLE` types from `of`, `size` and `db_len`
pub struct TupleMetaDataType;

impl MetaDataType for TupleMetaDataType {
    fn name(&self) -> &str {
        "TUPLE"
    }

    fn get_type(&self, section: &DataSection, registry: &Registry) -> Result<Box<dyn DataType>> {
        build_sequence(SequenceKind::Tuple, section, registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IntKind, IntegerDataType, StringDataType};

    fn int8_array(size: usize, db_len: usize) -> SequenceDataType {
        let element: Arc<dyn DataType> = Arc::new(IntegerDataType::new(IntKind::Int8));
        SequenceDataType::new(SequenceKind::Array, element, size, db_len)
    }

    fn ints(values: &[i64]) -> Value {
        Value::List(values.iter().map(|v| Value::Int(*v)).collect())
    }

    #[test]
    fn test_variable_array_carries_count() {
        let array = int8_array(0, 0);
        let data_type: &dyn DataType = &array;
        let mut stream = BinaryOStream::new();
        assert!(data_type.value_to_stream(&ints(&[1, 2, 3]), &mut stream, false));
        assert_eq!(stream.data(), &[3, 1, 2, 3]);

        let mut input = BinaryIStream::new(stream.data());
        assert_eq!(data_type.value_from_stream(&mut input, false), Some(ints(&[1, 2, 3])));
    }

    #[test]
    fn test_fixed_array_has_no_count() {
        let array = int8_array(2, 0);
        let data_type: &dyn DataType = &array;
        assert_eq!(data_type.stream_size(), Some(2));
        let mut stream = BinaryOStream::new();
        assert!(data_type.value_to_stream(&ints(&[7, 8]), &mut stream, false));
        assert_eq!(stream.data(), &[7, 8]);
    }

    #[test]
    fn test_fixed_size_mismatch_forces_declared_length() {
        let array = int8_array(3, 0);
        let data_type: &dyn DataType = &array;
        assert!(!data_type.is_same_type(&ints(&[1, 2])));

        let mut stream = BinaryOStream::new();
        assert!(!data_type.value_to_stream(&ints(&[1, 2, 3, 4, 5]), &mut stream, false));
        assert_eq!(stream.len(), 3);

        let mut stream = BinaryOStream::new();
        assert!(!data_type.value_to_stream(&ints(&[1]), &mut stream, false));
        assert_eq!(stream.data(), &[1, 0, 0]);
    }

    #[test]
    fn test_truncated_count_rejected() {
        let array = int8_array(0, 0);
        let data_type: &dyn DataType = &array;
        let mut input = BinaryIStream::new(&[200, 1, 2]);
        assert_eq!(data_type.value_from_stream(&mut input, false), None);
        assert!(input.error());
    }

    #[test]
    fn test_db_len_wraps_persistent_stream() {
        let element: Arc<dyn DataType> = Arc::new(StringDataType::narrow());
        let array = SequenceDataType::new(SequenceKind::Array, element, 0, 255);
        let data_type: &dyn DataType = &array;
        let value = Value::List(vec![Value::from("ab")]);

        let mut plain = BinaryOStream::new();
        assert!(data_type.value_to_stream(&value, &mut plain, false));
        assert_eq!(plain.data(), &[1, 2, b'a', b'b']);

        let mut wrapped = BinaryOStream::new();
        assert!(data_type.value_to_stream(&value, &mut wrapped, true));
        assert_eq!(wrapped.data(), &[4, 1, 2, b'a', b'b']);

        let mut input = BinaryIStream::new(wrapped.data());
        assert_eq!(data_type.value_from_stream(&mut input, true), Some(value));
        assert!(input.is_finished());
    }

    #[test]
    fn test_substream_leftover_bytes_fail() {
        let element: Arc<dyn DataType> = Arc::new(StringDataType::narrow());
        let array = SequenceDataType::new(SequenceKind::Array, element, 0, 255);
        let data_type: &dyn DataType = &array;
        // Blob of 5 bytes holding a 4 byte sequence
        let mut input = BinaryIStream::new(&[5, 1, 2, b'a', b'b', 0]);
        assert_eq!(data_type.value_from_stream(&mut input, true), None);
    }

    #[test]
    fn test_section_fills_missing_items() {
        let array = int8_array(3, 0);
        let data_type: &dyn DataType = &array;
        let mut section = DataSection::new("value");
        section.new_section(ITEM_SECTION).set_int(9);
        assert_eq!(data_type.value_from_section(&section), Some(ints(&[9, 0, 0])));

        for _ in 0..3 {
            section.new_section(ITEM_SECTION).set_int(1);
        }
        assert_eq!(data_type.value_from_section(&section), None);
    }

    #[test]
    fn test_type_name_and_default() {
        let array = int8_array(3, 0);
        assert_eq!(array.type_name(), "ARRAY size 3 of (INT8)");
        assert_eq!(array.default_value(), ints(&[0, 0, 0]));
        assert_eq!(int8_array(0, 0).default_value(), ints(&[]));
    }
}
