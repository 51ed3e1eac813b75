//! Representation-neutral values and the source/sink pair over them

use crate::data_type::DataType;
use crate::sink::DataSink;
use crate::source::{DataSource, SequenceLength};
use entitydef_core::{
    BinaryIStream, BinaryOStream, DataSection, MailboxRef, UniqueId, Vector2, Vector3, Vector4,
};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A value of any shape the type system can describe
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value of a nullable composite or reference type
    #[default]
    None,
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Blob(Vec<u8>),
    Vector2(Vector2),
    Vector3(Vector3),
    Vector4(Vector4),
    Mailbox(MailboxRef),
    UniqueId(UniqueId),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Dict(BTreeMap<String, Value>),
}

impl Value {
    /// Build a dict from name/value pairs
    pub fn dict<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Dict(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(u) => Some(*u),
            Value::Int(i) => u64::try_from(*i).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::UInt(u) => Some(*u as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Elements of a list or tuple
    pub fn as_items(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Dict(map) => Some(map),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Blob(_) => "blob",
            Value::Vector2(_) => "vector2",
            Value::Vector3(_) => "vector3",
            Value::Vector4(_) => "vector4",
            Value::Mailbox(_) => "mailbox",
            Value::UniqueId(_) => "unique_id",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::None => 0,
            Value::Int(_) => 1,
            Value::UInt(_) => 2,
            Value::Float(_) => 3,
            Value::String(_) => 4,
            Value::Blob(_) => 5,
            Value::Vector2(_) => 6,
            Value::Vector3(_) => 7,
            Value::Vector4(_) => 8,
            Value::Mailbox(_) => 9,
            Value::UniqueId(_) => 10,
            Value::List(_) => 11,
            Value::Tuple(_) => 12,
            Value::Dict(_) => 13,
        }
    }
}

fn compare_floats(a: &[f32], b: &[f32]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::None, Value::None) => Ordering::Equal,
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::UInt(a), Value::UInt(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Blob(a), Value::Blob(b)) => a.cmp(b),
            (Value::Vector2(a), Value::Vector2(b)) => compare_floats(&a.to_array(), &b.to_array()),
            (Value::Vector3(a), Value::Vector3(b)) => compare_floats(&a.to_array(), &b.to_array()),
            (Value::Vector4(a), Value::Vector4(b)) => compare_floats(&a.to_array(), &b.to_array()),
            (Value::Mailbox(a), Value::Mailbox(b)) => a.cmp(b),
            (Value::UniqueId(a), Value::UniqueId(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => a.cmp(b),
            (Value::Tuple(a), Value::Tuple(b)) => a.cmp(b),
            (Value::Dict(a), Value::Dict(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

/// Reads from a borrowed `Value`.
///
/// Entering an item or field that does not exist still pushes a level, so
/// later leaves stay paired; every read inside it fails.
pub struct ValueSource<'v> {
    stack: Vec<Option<&'v Value>>,
}

impl<'v> ValueSource<'v> {
    pub fn new(root: &'v Value) -> Self {
        Self {
            stack: vec![Some(root)],
        }
    }

    fn current(&self) -> Option<&'v Value> {
        self.stack.last().copied().flatten()
    }

    fn push(&mut self, value: Option<&'v Value>) -> bool {
        self.stack.push(value);
        value.is_some()
    }

    fn pop(&mut self) -> bool {
        if self.stack.len() > 1 {
            self.stack.pop();
            true
        } else {
            false
        }
    }
}

impl DataSource for ValueSource<'_> {
    fn read_none(&mut self) -> Option<bool> {
        self.current().map(Value::is_none)
    }

    fn begin_sequence(&mut self) -> SequenceLength {
        match self.current().and_then(Value::as_items) {
            Some(items) => SequenceLength::Known(items.len()),
            None => SequenceLength::Missing,
        }
    }

    fn enter_item(&mut self, index: usize) -> bool {
        let item = self
            .current()
            .and_then(Value::as_items)
            .and_then(|items| items.get(index));
        self.push(item)
    }

    fn leave_item(&mut self) -> bool {
        self.pop()
    }

    fn begin_class(&mut self) -> bool {
        matches!(self.current(), Some(Value::Dict(_)))
    }

    fn enter_field(&mut self, name: &str) -> bool {
        let field = self
            .current()
            .and_then(Value::as_dict)
            .and_then(|map| map.get(name));
        self.push(field)
    }

    fn leave_field(&mut self) -> bool {
        self.pop()
    }

    fn read_i8(&mut self) -> Option<i8> {
        self.current()?.as_i64().and_then(|v| i8::try_from(v).ok())
    }

    fn read_i16(&mut self) -> Option<i16> {
        self.current()?.as_i64().and_then(|v| i16::try_from(v).ok())
    }

    fn read_i32(&mut self) -> Option<i32> {
        self.current()?.as_i64().and_then(|v| i32::try_from(v).ok())
    }

    fn read_i64(&mut self) -> Option<i64> {
        self.current()?.as_i64()
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.current()?.as_u64().and_then(|v| u8::try_from(v).ok())
    }

    fn read_u16(&mut self) -> Option<u16> {
        self.current()?.as_u64().and_then(|v| u16::try_from(v).ok())
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.current()?.as_u64().and_then(|v| u32::try_from(v).ok())
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.current()?.as_u64()
    }

    fn read_f32(&mut self) -> Option<f32> {
        self.current()?.as_f64().map(|v| v as f32)
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.current()?.as_f64()
    }

    fn read_string(&mut self) -> Option<String> {
        self.current()?.as_str().map(str::to_string)
    }

    fn read_wide_string(&mut self) -> Option<String> {
        self.read_string()
    }

    fn read_blob(&mut self) -> Option<Vec<u8>> {
        match self.current()? {
            Value::Blob(bytes) => Some(bytes.clone()),
            _ => None,
        }
    }

    fn read_vector2(&mut self) -> Option<Vector2> {
        match self.current()? {
            Value::Vector2(v) => Some(*v),
            _ => None,
        }
    }

    fn read_vector3(&mut self) -> Option<Vector3> {
        match self.current()? {
            Value::Vector3(v) => Some(*v),
            _ => None,
        }
    }

    fn read_vector4(&mut self) -> Option<Vector4> {
        match self.current()? {
            Value::Vector4(v) => Some(*v),
            _ => None,
        }
    }

    fn read_mailbox(&mut self) -> Option<MailboxRef> {
        match self.current()? {
            Value::Mailbox(mailbox) => Some(*mailbox),
            Value::None => Some(MailboxRef::none()),
            _ => None,
        }
    }

    fn read_unique_id(&mut self) -> Option<UniqueId> {
        match self.current()? {
            Value::UniqueId(id) => Some(*id),
            Value::None => Some(UniqueId::ZERO),
            _ => None,
        }
    }

    fn read_custom_type(
        &mut self,
        data_type: &dyn DataType,
        stream: &mut BinaryOStream,
        persistent_only: bool,
    ) -> bool {
        match (self.current(), data_type.custom_streaming()) {
            (Some(value), Some(implementor)) => {
                implementor.add_to_stream(value, stream, persistent_only)
            }
            _ => false,
        }
    }

    fn read_custom_section(&mut self, data_type: &dyn DataType, section: &mut DataSection) -> bool {
        match (self.current(), data_type.custom_streaming()) {
            (Some(value), Some(implementor)) => implementor.add_to_section(value, section),
            _ => false,
        }
    }
}

enum Slot {
    Root,
    Item(usize),
    Field(String),
}

struct Node {
    slot: Slot,
    value: Option<Value>,
}

/// Sequences longer than this grow as items arrive
const PREALLOCATE_LIMIT: usize = 1024;

/// Builds a `Value` from the calls a type makes while decoding.
pub struct ValueSink {
    stack: Vec<Node>,
}

impl Default for ValueSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueSink {
    pub fn new() -> Self {
        Self {
            stack: vec![Node {
                slot: Slot::Root,
                value: None,
            }],
        }
    }

    /// The finished value, if one was completely built
    pub fn into_value(mut self) -> Option<Value> {
        if self.stack.len() != 1 {
            return None;
        }
        self.stack.pop()?.value
    }

    fn set(&mut self, value: Value) -> bool {
        match self.stack.last_mut() {
            Some(node) => {
                node.value = Some(value);
                true
            }
            None => false,
        }
    }

    fn enter(&mut self, slot: Slot) -> bool {
        self.stack.push(Node { slot, value: None });
        true
    }

    fn leave(&mut self) -> bool {
        if self.stack.len() < 2 {
            return false;
        }
        let Some(node) = self.stack.pop() else {
            return false;
        };
        let complete = node.value.is_some();
        let child = node.value.unwrap_or_default();

        let Some(Node {
            value: Some(parent),
            ..
        }) = self.stack.last_mut()
        else {
            return false;
        };

        let placed = match (parent, node.slot) {
            (Value::List(items) | Value::Tuple(items), Slot::Item(index)) => {
                if index == items.len() {
                    items.push(child);
                    true
                } else if index < items.len() {
                    items[index] = child;
                    true
                } else {
                    false
                }
            }
            (Value::Dict(map), Slot::Field(name)) => {
                map.insert(name, child);
                true
            }
            _ => false,
        };
        complete && placed
    }
}

impl DataSink for ValueSink {
    fn write_none(&mut self, is_none: bool) -> bool {
        if is_none {
            self.set(Value::None)
        } else {
            true
        }
    }

    fn begin_array(&mut self, _data_type: &dyn DataType, count: usize) -> bool {
        self.set(Value::List(Vec::with_capacity(count.min(PREALLOCATE_LIMIT))))
    }

    fn begin_tuple(&mut self, _data_type: &dyn DataType, count: usize) -> bool {
        self.set(Value::Tuple(Vec::with_capacity(count.min(PREALLOCATE_LIMIT))))
    }

    fn enter_item(&mut self, index: usize) -> bool {
        self.enter(Slot::Item(index))
    }

    fn leave_item(&mut self) -> bool {
        self.leave()
    }

    fn begin_class(&mut self, _data_type: &dyn DataType) -> bool {
        self.set(Value::Dict(BTreeMap::new()))
    }

    fn begin_dictionary(&mut self, _data_type: &dyn DataType) -> bool {
        self.set(Value::Dict(BTreeMap::new()))
    }

    fn enter_field(&mut self, name: &str) -> bool {
        self.enter(Slot::Field(name.to_string()))
    }

    fn leave_field(&mut self) -> bool {
        self.leave()
    }

    fn write_i8(&mut self, value: i8) -> bool {
        self.set(Value::Int(value.into()))
    }

    fn write_i16(&mut self, value: i16) -> bool {
        self.set(Value::Int(value.into()))
    }

    fn write_i32(&mut self, value: i32) -> bool {
        self.set(Value::Int(value.into()))
    }

    fn write_i64(&mut self, value: i64) -> bool {
        self.set(Value::Int(value))
    }

    fn write_u8(&mut self, value: u8) -> bool {
        self.set(Value::UInt(value.into()))
    }

    fn write_u16(&mut self, value: u16) -> bool {
        self.set(Value::UInt(value.into()))
    }

    fn write_u32(&mut self, value: u32) -> bool {
        self.set(Value::UInt(value.into()))
    }

    fn write_u64(&mut self, value: u64) -> bool {
        self.set(Value::UInt(value))
    }

    fn write_f32(&mut self, value: f32) -> bool {
        self.set(Value::Float(value.into()))
    }

    fn write_f64(&mut self, value: f64) -> bool {
        self.set(Value::Float(value))
    }

    fn write_string(&mut self, value: &str) -> bool {
        self.set(Value::String(value.to_string()))
    }

    fn write_wide_string(&mut self, value: &str) -> bool {
        self.set(Value::String(value.to_string()))
    }

    fn write_blob(&mut self, value: &[u8]) -> bool {
        self.set(Value::Blob(value.to_vec()))
    }

    fn write_vector2(&mut self, value: Vector2) -> bool {
        self.set(Value::Vector2(value))
    }

    fn write_vector3(&mut self, value: Vector3) -> bool {
        self.set(Value::Vector3(value))
    }

    fn write_vector4(&mut self, value: Vector4) -> bool {
        self.set(Value::Vector4(value))
    }

    fn write_mailbox(&mut self, value: &MailboxRef) -> bool {
        if value.is_none() {
            self.set(Value::None)
        } else {
            self.set(Value::Mailbox(*value))
        }
    }

    fn write_unique_id(&mut self, value: &UniqueId) -> bool {
        if value.is_zero() {
            self.set(Value::None)
        } else {
            self.set(Value::UniqueId(*value))
        }
    }

    fn write_custom_type(
        &mut self,
        data_type: &dyn DataType,
        stream: &mut BinaryIStream<'_>,
        persistent_only: bool,
    ) -> bool {
        let value = data_type
            .custom_streaming()
            .and_then(|implementor| implementor.create_from_stream(stream, persistent_only));
        match value {
            Some(value) => self.set(value),
            None => false,
        }
    }

    fn write_custom_section(&mut self, data_type: &dyn DataType, section: &DataSection) -> bool {
        let value = data_type
            .custom_streaming()
            .and_then(|implementor| implementor.create_from_section(section));
        match value {
            Some(value) => self.set(value),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_is_total() {
        assert!(Value::None < Value::Int(0));
        assert!(Value::Int(5) < Value::Int(6));
        assert!(Value::Float(f64::NAN) == Value::Float(f64::NAN));
        assert!(Value::Float(-1.0) < Value::Float(1.0));
        assert_ne!(Value::List(vec![]), Value::Tuple(vec![]));
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(Value::UInt(7).as_i64(), Some(7));
        assert_eq!(Value::Int(-1).as_u64(), None);
        assert_eq!(Value::UInt(u64::MAX).as_i64(), None);
        assert_eq!(Value::Int(2).as_f64(), Some(2.0));
    }

    #[test]
    fn test_source_reads_nested_values() {
        let value = Value::dict([
            ("x", Value::Int(5)),
            ("items", Value::List(vec![Value::Int(1), Value::Int(300)])),
        ]);
        let mut source = ValueSource::new(&value);

        assert!(source.begin_class());
        assert!(source.enter_field("x"));
        assert_eq!(source.read_i32(), Some(5));
        assert!(source.leave_field());

        assert!(source.enter_field("items"));
        assert_eq!(source.begin_sequence(), SequenceLength::Known(2));
        assert!(source.enter_item(1));
        assert_eq!(source.read_u8(), None);
        assert_eq!(source.read_u16(), Some(300));
        assert!(source.leave_item());
        assert!(source.leave_field());
    }

    #[test]
    fn test_source_missing_entries_stay_paired() {
        let value = Value::List(vec![]);
        let mut source = ValueSource::new(&value);
        assert!(!source.enter_item(3));
        assert_eq!(source.read_i32(), None);
        assert!(source.leave_item());
        // Root can never be popped
        assert!(!source.leave_item());
    }

    #[test]
    fn test_source_reference_none() {
        let mut source = ValueSource::new(&Value::None);
        assert_eq!(source.read_none(), Some(true));
        assert_eq!(source.read_mailbox(), Some(MailboxRef::none()));
        assert_eq!(source.read_unique_id(), Some(UniqueId::ZERO));
    }

    #[test]
    fn test_sink_builds_nested_value() {
        let mut sink = ValueSink::new();
        let unsupported = crate::types::UnsupportedDataType::new("PYTHON");
        assert!(sink.begin_class(&unsupported));
        assert!(sink.enter_field("a"));
        assert!(sink.begin_array(&unsupported, 2));
        for i in 0..2 {
            assert!(sink.enter_item(i));
            assert!(sink.write_u8(i as u8));
            assert!(sink.leave_item());
        }
        assert!(sink.leave_field());

        let expected = Value::dict([("a", Value::List(vec![Value::UInt(0), Value::UInt(1)]))]);
        assert_eq!(sink.into_value(), Some(expected));
    }

    #[test]
    fn test_sink_incomplete_child_fails() {
        let mut sink = ValueSink::new();
        let unsupported = crate::types::UnsupportedDataType::new("PYTHON");
        assert!(sink.begin_dictionary(&unsupported));
        assert!(sink.enter_field("a"));
        assert!(!sink.leave_field());
        assert!(!sink.leave_field());
    }

    #[test]
    fn test_sink_null_references() {
        let mut sink = ValueSink::new();
        assert!(sink.write_mailbox(&MailboxRef::none()));
        assert_eq!(sink.into_value(), Some(Value::None));

        let mut sink = ValueSink::new();
        assert!(sink.write_unique_id(&UniqueId::new(1, 2, 3, 4)));
        assert_eq!(sink.into_value(), Some(Value::UniqueId(UniqueId::new(1, 2, 3, 4))));
    }
}
