//! The `DataType` contract shared by every concrete type

use crate::custom::CustomStreaming;
use crate::sink::DataSink;
use crate::source::DataSource;
use crate::stream_element::{walk, Decoder, Encoder, StreamElement};
use crate::value::{Value, ValueSink, ValueSource};
use entitydef_core::{BinaryIStream, BinaryOStream, DataSection, Digest, Md5};
use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Describes the shape of one value and how it moves between
/// representations.
///
/// A type is immutable once built by its meta type. Only the explicit
/// default is set afterwards, during definition loading, before the type
/// is shared.
pub trait DataType: Send + Sync + Any {
    /// The schema token of the meta type that built this type
    fn meta_name(&self) -> &str;

    /// Human-readable description including parameters
    fn type_name(&self) -> String {
        self.meta_name().to_string()
    }

    fn as_any(&self) -> &dyn Any;

    /// Whether `value` has a shape this type can transcode
    fn is_same_type(&self, value: &Value) -> bool;

    /// The default value: the explicit default if one was configured,
    /// otherwise the type's natural zero
    fn default_value(&self) -> Value;

    fn set_default(&mut self, value: Value);

    fn explicit_default(&self) -> Option<&Value>;

    /// Constant stream size in bytes, if every value has the same size
    fn stream_size(&self) -> Option<usize>;

    /// Fewest bytes any value of this type occupies on the stream.
    /// Variable-sized values take at least one byte.
    fn min_stream_size(&self, _persistent_only: bool) -> usize {
        self.stream_size().unwrap_or(1)
    }

    fn add_to_section(&self, source: &mut dyn DataSource, section: &mut DataSection) -> bool;

    fn create_from_section(&self, section: &DataSection, sink: &mut dyn DataSink) -> bool;

    /// Append this type's fingerprint
    fn add_to_md5(&self, md5: &mut Md5);

    /// The element at `index` in this type's flat expansion, or `None`
    /// past the end. `size` and `is_none` belong to the caller's level and
    /// may be updated here and by the returned element.
    fn stream_element<'a>(
        &'a self,
        index: usize,
        size: &mut usize,
        is_none: &mut bool,
        persistent_only: bool,
    ) -> Option<Box<dyn StreamElement<'a> + 'a>>;

    /// Order against another type with the same meta name
    fn compare_same_meta(&self, other: &dyn DataType) -> Ordering;

    fn custom_streaming(&self) -> Option<&dyn CustomStreaming> {
        None
    }
}

impl<'t> dyn DataType + 't {
    /// Encode the value supplied by `source` onto `stream`
    pub fn add_to_stream(
        &self,
        source: &mut dyn DataSource,
        stream: &mut BinaryOStream,
        persistent_only: bool,
    ) -> bool {
        walk(self, persistent_only, &mut Encoder::new(source, stream))
    }

    /// Decode one value from `stream` into `sink`
    pub fn create_from_stream(
        &self,
        stream: &mut BinaryIStream<'_>,
        sink: &mut dyn DataSink,
        persistent_only: bool,
    ) -> bool {
        walk(self, persistent_only, &mut Decoder::new(stream, sink))
    }

    /// Write the default value into `sink`
    pub fn write_default(&self, sink: &mut dyn DataSink) -> bool {
        let value = self.default_value();
        let mut stream = BinaryOStream::new();
        if !self.value_to_stream(&value, &mut stream, false) {
            return false;
        }
        let mut input = BinaryIStream::new(stream.data());
        self.create_from_stream(&mut input, sink, false) && input.is_finished()
    }

    pub fn value_to_stream(
        &self,
        value: &Value,
        stream: &mut BinaryOStream,
        persistent_only: bool,
    ) -> bool {
        self.add_to_stream(&mut ValueSource::new(value), stream, persistent_only)
    }

    pub fn value_from_stream(
        &self,
        stream: &mut BinaryIStream<'_>,
        persistent_only: bool,
    ) -> Option<Value> {
        let mut sink = ValueSink::new();
        if !self.create_from_stream(stream, &mut sink, persistent_only) {
            return None;
        }
        sink.into_value()
    }

    pub fn value_to_section(&self, value: &Value, section: &mut DataSection) -> bool {
        self.add_to_section(&mut ValueSource::new(value), section)
    }

    pub fn value_from_section(&self, section: &DataSection) -> Option<Value> {
        let mut sink = ValueSink::new();
        if !self.create_from_section(section, &mut sink) {
            return None;
        }
        sink.into_value()
    }

    /// Decode a value from `stream` and store it in `section`
    pub fn from_stream_to_section(
        &self,
        stream: &mut BinaryIStream<'_>,
        section: &mut DataSection,
        persistent_only: bool,
    ) -> bool {
        match self.value_from_stream(stream, persistent_only) {
            Some(value) => self.value_to_section(&value, section),
            None => false,
        }
    }

    /// Read a value from `section` and encode it onto `stream`
    pub fn from_section_to_stream(
        &self,
        section: &DataSection,
        stream: &mut BinaryOStream,
        persistent_only: bool,
    ) -> bool {
        match self.value_from_section(section) {
            Some(value) => self.value_to_stream(&value, stream, persistent_only),
            None => false,
        }
    }

    /// The fingerprint of this type alone
    pub fn digest(&self) -> Digest {
        let mut md5 = Md5::new();
        self.add_to_md5(&mut md5);
        md5.finish()
    }

    /// Total order: meta name, then parameters, then default value
    pub fn compare(&self, other: &dyn DataType) -> Ordering {
        self.meta_name()
            .cmp(other.meta_name())
            .then_with(|| self.compare_same_meta(other))
            .then_with(|| self.explicit_default().cmp(&other.explicit_default()))
    }

    /// Downcast to a concrete type
    pub fn downcast_ref<T: DataType>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for dyn DataType + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataType({})", self.type_name())
    }
}

/// Compare two types known to share a meta name
pub(crate) fn compare_params<T: DataType>(
    this: &T,
    other: &dyn DataType,
    by: impl FnOnce(&T, &T) -> Ordering,
) -> Ordering {
    match other.as_any().downcast_ref::<T>() {
        Some(other) => by(this, other),
        None => Ordering::Equal,
    }
}

/// A shared type ordered by `compare`, used for interning
#[derive(Clone)]
pub(crate) struct TypeKey(pub Arc<dyn DataType>);

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TypeKey {}

impl PartialOrd for TypeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.compare(other.0.as_ref())
    }
}

/// A named member of a composite type
#[derive(Clone)]
pub struct Field {
    pub name: String,
    pub data_type: Arc<dyn DataType>,
    pub is_persistent: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: Arc<dyn DataType>, is_persistent: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            is_persistent,
        }
    }

    pub fn default_value(&self) -> Value {
        self.data_type.default_value()
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("type", &self.data_type.type_name())
            .field("persistent", &self.is_persistent)
            .finish()
    }
}
