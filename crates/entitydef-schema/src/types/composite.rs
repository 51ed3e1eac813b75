//! `CLASS` and `FIXED_DICT`: ordered, named fields
//!
//! Field order is wire order. An allow-none composite writes a one byte
//! flag first (0 = none, 1 = present) and nothing else when absent. When
//! streaming persistent data only, non-persistent fields are skipped and
//! filled with their defaults on the way back in.

use crate::custom::{custom_element, CustomStreaming};
use crate::data_type::{compare_params, DataType, Field};
use crate::meta::MetaDataType;
use crate::registry::Registry;
use crate::sink::DataSink;
use crate::source::DataSource;
use crate::stream_element::{ElementKind, LevelState, StreamElement};
use crate::value::Value;
use entitydef_core::{BinaryIStream, BinaryOStream, DataSection, EntityDefError, Md5, Result};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeKind {
    Class,
    FixedDict,
}

impl CompositeKind {
    pub fn token(&self) -> &'static str {
        match self {
            CompositeKind::Class => "CLASS",
            CompositeKind::FixedDict => "FIXED_DICT",
        }
    }
}

pub struct CompositeDataType {
    kind: CompositeKind,
    fields: Vec<Field>,
    /// Indices into `fields` of the persistent fields
    persistent: Vec<usize>,
    allow_none: bool,
    implementor: Option<(String, Arc<dyn CustomStreaming>)>,
    default: Option<Value>,
}

impl CompositeDataType {
    pub fn new(kind: CompositeKind, fields: Vec<Field>, allow_none: bool) -> Result<Self> {
        // A present value with no fields would have the same section as none
        if allow_none && fields.is_empty() {
            return Err(EntityDefError::invalid(
                kind.token(),
                "'allow_none' needs at least one field",
            ));
        }
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(EntityDefError::DuplicateField(field.name.clone()));
            }
        }
        let persistent = fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_persistent)
            .map(|(i, _)| i)
            .collect();

        Ok(Self {
            kind,
            fields,
            persistent,
            allow_none,
            implementor: None,
            default: None,
        })
    }

    /// Attach a named custom streaming implementor
    pub fn with_implementor(mut self, name: impl Into<String>, implementor: Arc<dyn CustomStreaming>) -> Self {
        self.implementor = Some((name.into(), implementor));
        self
    }

    pub fn kind(&self) -> CompositeKind {
        self.kind
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn allow_none(&self) -> bool {
        self.allow_none
    }

    pub fn implementor_name(&self) -> Option<&str> {
        self.implementor.as_ref().map(|(name, _)| name.as_str())
    }

    pub fn field_count(&self, persistent_only: bool) -> usize {
        if persistent_only {
            self.persistent.len()
        } else {
            self.fields.len()
        }
    }

    fn field_at(&self, index: usize, persistent_only: bool) -> Option<&Field> {
        if persistent_only {
            self.persistent.get(index).and_then(|i| self.fields.get(*i))
        } else {
            self.fields.get(index)
        }
    }

    /// Whether the implementor replaces per-field streaming
    pub fn is_custom_streamed(&self) -> bool {
        self.implementor
            .as_ref()
            .is_some_and(|(_, implementor)| implementor.streams_itself())
    }

    fn begin_sink(&self, sink: &mut dyn DataSink) -> bool {
        match self.kind {
            CompositeKind::Class => sink.begin_class(self),
            CompositeKind::FixedDict => sink.begin_dictionary(self),
        }
    }
}

struct CompositeBegin<'a> {
    ty: &'a CompositeDataType,
}

impl<'a> StreamElement<'a> for CompositeBegin<'a> {
    fn kind(&self) -> ElementKind {
        ElementKind::Begin
    }

    fn data_type(&self) -> &'a dyn DataType {
        self.ty
    }

    fn from_source_to_stream(
        &self,
        source: &mut dyn DataSource,
        stream: &mut BinaryOStream,
        state: &mut LevelState,
    ) -> bool {
        let mut ok = true;
        state.is_none = false;

        if self.ty.allow_none {
            let is_none = source.read_none().unwrap_or_else(|| {
                ok = false;
                true
            });
            state.is_none = is_none;
            stream.write_u8(if is_none { 0 } else { 1 });
            if is_none {
                return ok;
            }
        }

        ok && source.begin_class()
    }

    fn from_stream_to_sink(
        &self,
        stream: &mut BinaryIStream<'_>,
        sink: &mut dyn DataSink,
        state: &mut LevelState,
    ) -> bool {
        state.is_none = false;

        if self.ty.allow_none {
            let is_none = match stream.read_u8() {
                Some(0) => true,
                Some(1) => false,
                Some(flag) => {
                    log::error!("{}: invalid none flag {}", self.ty.type_name(), flag);
                    state.is_none = true;
                    return false;
                }
                None => {
                    state.is_none = true;
                    return false;
                }
            };
            state.is_none = is_none;
            if !sink.write_none(is_none) {
                return false;
            }
            if is_none {
                return true;
            }
        }

        self.ty.begin_sink(sink)
    }

    fn is_none_able(&self) -> bool {
        self.ty.allow_none
    }
}

struct CompositeField<'a> {
    ty: &'a CompositeDataType,
    field: &'a Field,
    enter: bool,
}

impl<'a> StreamElement<'a> for CompositeField<'a> {
    fn kind(&self) -> ElementKind {
        if self.enter {
            ElementKind::EnterField
        } else {
            ElementKind::LeaveField
        }
    }

    fn data_type(&self) -> &'a dyn DataType {
        self.ty
    }

    fn from_source_to_stream(
        &self,
        source: &mut dyn DataSource,
        _stream: &mut BinaryOStream,
        _state: &mut LevelState,
    ) -> bool {
        if self.enter {
            source.enter_field(&self.field.name)
        } else {
            source.leave_field()
        }
    }

    fn from_stream_to_sink(
        &self,
        _stream: &mut BinaryIStream<'_>,
        sink: &mut dyn DataSink,
        _state: &mut LevelState,
    ) -> bool {
        if self.enter {
            sink.enter_field(&self.field.name)
        } else {
            sink.leave_field()
        }
    }

    fn child_type(&self) -> Option<&'a dyn DataType> {
        self.enter.then_some(self.field.data_type.as_ref())
    }

    fn field_name(&self) -> Option<&'a str> {
        Some(&self.field.name)
    }
}

struct CompositeEnd<'a> {
    ty: &'a CompositeDataType,
    persistent_only: bool,
}

impl<'a> StreamElement<'a> for CompositeEnd<'a> {
    fn kind(&self) -> ElementKind {
        ElementKind::End
    }

    fn data_type(&self) -> &'a dyn DataType {
        self.ty
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
        sink: &mut dyn DataSink,
        state: &mut LevelState,
    ) -> bool {
        if !self.persistent_only || state.is_none {
            return true;
        }

        let mut ok = true;
        for field in self.ty.fields.iter().filter(|f| !f.is_persistent) {
            ok &= sink.enter_field(&field.name);
            ok &= field.data_type.write_default(sink);
            ok &= sink.leave_field();
        }
        ok
    }
}

impl DataType for CompositeDataType {
    common_type_methods!();

    fn meta_name(&self) -> &str {
        self.kind.token()
    }

    fn type_name(&self) -> String {
        let mut name = self.kind.token().to_string();
        if self.allow_none {
            name.push_str(" [None Allowed]");
        }
        if let Some(implementor) = self.implementor_name() {
            name.push_str(&format!(" [Implemented by {}]", implementor));
        }
        name.push_str(" props");
        for field in &self.fields {
            name.push_str(&format!(" {}:({})", field.name, field.data_type.type_name()));
        }
        name
    }

    fn is_same_type(&self, value: &Value) -> bool {
        if let Some((_, implementor)) = &self.implementor {
            if implementor.streams_itself() {
                return implementor.is_same_type(value);
            }
            if !implementor.is_same_type(value) {
                return false;
            }
        }

        match value {
            Value::None => self.allow_none,
            Value::Dict(map) => {
                map.len() == self.fields.len()
                    && self.fields.iter().all(|field| {
                        map.get(&field.name)
                            .is_some_and(|v| field.data_type.is_same_type(v))
                    })
            }
            _ => false,
        }
    }

    fn default_value(&self) -> Value {
        if let Some(value) = &self.default {
            return value.clone();
        }
        if self.is_custom_streamed() {
            if let Some(value) = self
                .implementor
                .as_ref()
                .and_then(|(_, implementor)| implementor.default_value())
            {
                return value;
            }
        }
        if self.allow_none {
            return Value::None;
        }
        let map: BTreeMap<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.default_value()))
            .collect();
        Value::Dict(map)
    }

    fn stream_size(&self) -> Option<usize> {
        if self.allow_none || self.is_custom_streamed() {
            return None;
        }
        self.fields
            .iter()
            .map(|f| f.data_type.stream_size())
            .sum()
    }

    fn min_stream_size(&self, persistent_only: bool) -> usize {
        if self.allow_none || self.is_custom_streamed() {
            return 1;
        }
        (0..self.field_count(persistent_only))
            .filter_map(|index| self.field_at(index, persistent_only))
            .map(|field| field.data_type.min_stream_size(persistent_only))
            .fold(0, usize::saturating_add)
    }

    fn add_to_section(&self, source: &mut dyn DataSource, section: &mut DataSection) -> bool {
        if self.is_custom_streamed() {
            return source.read_custom_section(self, section);
        }

        section.clear();
        if self.allow_none {
            match source.read_none() {
                None => return false,
                Some(true) => return true,
                Some(false) => {}
            }
        }
        if !source.begin_class() {
            return false;
        }

        let mut ok = true;
        for field in &self.fields {
            let child = section.new_section(field.name.as_str());
            ok &= source.enter_field(&field.name);
            ok &= field.data_type.add_to_section(source, child);
            ok &= source.leave_field();
        }
        ok
    }

    fn create_from_section(&self, section: &DataSection, sink: &mut dyn DataSink) -> bool {
        if self.is_custom_streamed() {
            return sink.write_custom_section(self, section);
        }

        if self.allow_none {
            if section.count_children() == 0 {
                return sink.write_none(true);
            }
            if !sink.write_none(false) {
                return false;
            }
        }

        for child in section.children() {
            if self.field(child.name()).is_none() {
                log::warn!(
                    "{}: ignoring unknown field '{}' in section '{}'",
                    self.kind.token(),
                    child.name(),
                    section.name()
                );
            }
        }

        let mut ok = self.begin_sink(sink);
        for field in &self.fields {
            ok &= sink.enter_field(&field.name);
            ok &= match section.open_section(&field.name) {
                Some(child) => field.data_type.create_from_section(child, sink),
                None => field.data_type.write_default(sink),
            };
            ok &= sink.leave_field();
        }
        ok
    }

    fn add_to_md5(&self, md5: &mut Md5) {
        match self.kind {
            CompositeKind::Class => md5.append(b"Class\0"),
            CompositeKind::FixedDict => {
                md5.append(b"FixedDict\0");
                if let Some(implementor) = self.implementor_name() {
                    md5.append_str(implementor);
                }
            }
        }
        md5.append(&[self.allow_none as u8]);

        for field in &self.fields {
            md5.append_str(&field.name);
            md5.append(&[field.is_persistent as u8]);
            field.data_type.add_to_md5(md5);
        }
    }

    fn stream_element<'a>(
        &'a self,
        index: usize,
        size: &mut usize,
        is_none: &mut bool,
        persistent_only: bool,
    ) -> Option<Box<dyn StreamElement<'a> + 'a>> {
        if self.is_custom_streamed() {
            return custom_element(self, index, persistent_only);
        }

        let count = if *is_none {
            0
        } else {
            self.field_count(persistent_only)
        };
        *size = count;

        if index == 0 {
            Some(Box::new(CompositeBegin { ty: self }))
        } else if index <= 2 * count {
            let field = self.field_at((index - 1) / 2, persistent_only)?;
            Some(Box::new(CompositeField {
                ty: self,
                field,
                enter: index % 2 == 1,
            }))
        } else if index == 2 * count + 1 {
            Some(Box::new(CompositeEnd {
                ty: self,
                persistent_only,
            }))
        } else {
            None
        }
    }

    fn compare_same_meta(&self, other: &dyn DataType) -> Ordering {
        compare_params(self, other, |a, b| {
            a.allow_none
                .cmp(&b.allow_none)
                .then_with(|| a.implementor_name().cmp(&b.implementor_name()))
                .then(a.fields.len().cmp(&b.fields.len()))
                .then_with(|| {
                    a.fields
                        .iter()
                        .zip(&b.fields)
                        .map(|(fa, fb)| {
                            fa.name
                                .cmp(&fb.name)
                                .then(fa.is_persistent.cmp(&fb.is_persistent))
                                .then_with(|| fa.data_type.compare(fb.data_type.as_ref()))
                        })
                        .find(|o| o.is_ne())
                        .unwrap_or(Ordering::Equal)
                })
        })
    }

    fn custom_streaming(&self) -> Option<&dyn CustomStreaming> {
        self.implementor
            .as_ref()
            .map(|(_, implementor)| implementor.as_ref())
    }
}

/// Parse the ordered `properties` table of a composite definition
fn parse_fields(section: &DataSection, registry: &Registry, token: &str) -> Result<Vec<Field>> {
    let mut fields: Vec<Field> = Vec::new();
    let Some(properties) = section.open_section("properties") else {
        return Ok(fields);
    };

    for node in properties.children() {
        let name = node.name();
        if fields.iter().any(|f| f.name == name) {
            return Err(EntityDefError::DuplicateField(name.to_string()));
        }
        let is_persistent = node.read_bool("persistent", true).ok_or_else(|| {
            EntityDefError::invalid(token, format!("field '{}': 'persistent' must be true or false", name))
        })?;
        let data_type = registry.build_type(node)?;
        fields.push(Field::new(name, data_type, is_persistent));
    }
    Ok(fields)
}

fn read_allow_none(section: &DataSection, token: &str) -> Result<bool> {
    section
        .read_bool("allow_none", false)
        .ok_or_else(|| EntityDefError::invalid(token, "'allow_none' must be true or false"))
}

/// Builds `CLASS` types from `properties` and `allow_none`
pub struct ClassMetaDataType;

impl MetaDataType for ClassMetaDataType {
    fn name(&self) -> &str {
        "CLASS"
    }

    fn get_type(&self, section: &DataSection, registry: &Registry) -> Result<Box<dyn DataType>> {
        let token = CompositeKind::Class.token();
        let fields = parse_fields(section, registry, token)?;
        let allow_none = read_allow_none(section, token)?;
        Ok(Box::new(CompositeDataType::new(
            CompositeKind::Class,
            fields,
            allow_none,
        )?))
    }
}

/// Builds `FIXED_DICT` types from `properties`, `allow_none` and
/// `implemented_by`
pub struct FixedDictMetaDataType;

impl MetaDataType for FixedDictMetaDataType {
    fn name(&self) -> &str {
        "FIXED_DICT"
    }

    fn get_type(&self, section: &DataSection, registry: &Registry) -> Result<Box<dyn DataType>> {
        let token = CompositeKind::FixedDict.token();
        let fields = parse_fields(section, registry, token)?;
        let allow_none = read_allow_none(section, token)?;
        let mut data_type = CompositeDataType::new(CompositeKind::FixedDict, fields, allow_none)?;

        if let Some(name) = section.read_string("implemented_by") {
            let implementor = registry
                .implementor(name)
                .ok_or_else(|| EntityDefError::UnknownImplementor(name.to_string()))?;
            data_type = data_type.with_implementor(name, implementor);
        }
        Ok(Box::new(data_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IntKind, IntegerDataType, StringDataType};

    fn point(allow_none: bool) -> CompositeDataType {
        let fields = vec![
            Field::new("x", Arc::new(IntegerDataType::new(IntKind::Int32)), true),
            Field::new("y", Arc::new(StringDataType::narrow()), true),
        ];
        CompositeDataType::new(CompositeKind::FixedDict, fields, allow_none).unwrap()
    }

    fn sample() -> Value {
        Value::dict([("x", Value::Int(5)), ("y", Value::from("hi"))])
    }

    #[test]
    fn test_field_order_is_wire_order() {
        let dict = point(false);
        let data_type: &dyn DataType = &dict;
        let mut stream = BinaryOStream::new();
        assert!(data_type.value_to_stream(&sample(), &mut stream, false));
        assert_eq!(stream.data(), &[5, 0, 0, 0, 2, b'h', b'i']);

        let mut input = BinaryIStream::new(stream.data());
        assert_eq!(data_type.value_from_stream(&mut input, false), Some(sample()));
        assert!(input.is_finished());
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let fields = vec![
            Field::new("a", Arc::new(StringDataType::narrow()), true),
            Field::new("a", Arc::new(StringDataType::narrow()), true),
        ];
        assert!(matches!(
            CompositeDataType::new(CompositeKind::Class, fields, false),
            Err(EntityDefError::DuplicateField(name)) if name == "a"
        ));
    }

    #[test]
    fn test_allow_none_needs_fields() {
        assert!(matches!(
            CompositeDataType::new(CompositeKind::FixedDict, Vec::new(), true),
            Err(EntityDefError::InvalidDefinition { .. })
        ));

        let empty = CompositeDataType::new(CompositeKind::Class, Vec::new(), false).unwrap();
        let data_type: &dyn DataType = &empty;
        let value = Value::Dict(BTreeMap::new());
        let mut section = DataSection::new("value");
        assert!(data_type.value_to_section(&value, &mut section));
        assert_eq!(data_type.value_from_section(&section), Some(value));
    }

    #[test]
    fn test_none_writes_only_flag() {
        let dict = point(true);
        let data_type: &dyn DataType = &dict;
        let mut stream = BinaryOStream::new();
        assert!(data_type.value_to_stream(&Value::None, &mut stream, false));
        assert_eq!(stream.data(), &[0]);

        let mut input = BinaryIStream::new(&[0, 9, 9]);
        assert_eq!(data_type.value_from_stream(&mut input, false), Some(Value::None));
        assert_eq!(input.remaining_length(), 2);
    }

    #[test]
    fn test_present_value_has_flag() {
        let dict = point(true);
        let data_type: &dyn DataType = &dict;
        let mut stream = BinaryOStream::new();
        assert!(data_type.value_to_stream(&sample(), &mut stream, false));
        assert_eq!(stream.data()[0], 1);
        assert_eq!(stream.len(), 8);
    }

    #[test]
    fn test_none_rejected_without_allow_none() {
        let dict = point(false);
        assert!(!dict.is_same_type(&Value::None));
        assert!(!dict.is_same_type(&Value::dict([("x", Value::Int(5))])));
        assert!(dict.is_same_type(&sample()));
    }

    #[test]
    fn test_persistent_only_skips_fields() {
        let fields = vec![
            Field::new("kept", Arc::new(IntegerDataType::new(IntKind::UInt8)), true),
            Field::new("transient", Arc::new(IntegerDataType::new(IntKind::UInt8)), false),
        ];
        let dict = CompositeDataType::new(CompositeKind::FixedDict, fields, false).unwrap();
        let data_type: &dyn DataType = &dict;
        let value = Value::dict([("kept", Value::UInt(7)), ("transient", Value::UInt(9))]);

        let mut stream = BinaryOStream::new();
        assert!(data_type.value_to_stream(&value, &mut stream, true));
        assert_eq!(stream.data(), &[7]);

        let mut input = BinaryIStream::new(stream.data());
        let expected = Value::dict([("kept", Value::UInt(7)), ("transient", Value::UInt(0))]);
        assert_eq!(data_type.value_from_stream(&mut input, true), Some(expected));
    }

    #[test]
    fn test_section_none_and_defaults() {
        let dict = point(true);
        let data_type: &dyn DataType = &dict;

        let mut section = DataSection::new("value");
        assert!(data_type.value_to_section(&Value::None, &mut section));
        assert_eq!(section.count_children(), 0);
        assert_eq!(data_type.value_from_section(&section), Some(Value::None));

        let mut partial = DataSection::new("value");
        partial.new_section("x").set_int(3);
        assert_eq!(
            data_type.value_from_section(&partial),
            Some(Value::dict([("x", Value::Int(3)), ("y", Value::from(""))]))
        );
    }

    #[test]
    fn test_type_name() {
        assert_eq!(
            point(true).type_name(),
            "FIXED_DICT [None Allowed] props x:(INT32) y:(STRING)"
        );
    }
}
