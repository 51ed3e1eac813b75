//! Custom streaming hooks for user-implemented types

use crate::data_type::DataType;
use crate::sink::DataSink;
use crate::source::DataSource;
use crate::stream_element::{ElementKind, LevelState, StreamElement};
use crate::value::Value;
use entitydef_core::{BinaryIStream, BinaryOStream, DataSection};

/// An implementor registered by name and referenced from definitions with
/// `implemented_by`.
///
/// For `USER_TYPE` the implementor owns the whole representation. For
/// `FIXED_DICT` it may take over streaming (`streams_itself`) or only add
/// a value check on top of the per-field layout.
pub trait CustomStreaming: Send + Sync {
    /// Whether the implementor replaces per-field streaming of a
    /// `FIXED_DICT`
    fn streams_itself(&self) -> bool {
        true
    }

    /// Extra acceptance check applied to values
    fn is_same_type(&self, _value: &Value) -> bool {
        true
    }

    /// Default value when the type has no explicit one
    fn default_value(&self) -> Option<Value> {
        None
    }

    fn add_to_stream(&self, value: &Value, stream: &mut BinaryOStream, persistent_only: bool) -> bool;

    fn create_from_stream(&self, stream: &mut BinaryIStream<'_>, persistent_only: bool) -> Option<Value>;

    fn add_to_section(&self, value: &Value, section: &mut DataSection) -> bool;

    fn create_from_section(&self, section: &DataSection) -> Option<Value>;
}

/// The single element of a custom-streamed type's expansion
pub(crate) struct CustomElement<'a> {
    data_type: &'a dyn DataType,
    persistent_only: bool,
}

impl<'a> StreamElement<'a> for CustomElement<'a> {
    fn kind(&self) -> ElementKind {
        ElementKind::Custom
    }

    fn data_type(&self) -> &'a dyn DataType {
        self.data_type
    }

    fn from_source_to_stream(
        &self,
        source: &mut dyn DataSource,
        stream: &mut BinaryOStream,
        _state: &mut LevelState,
    ) -> bool {
        source.read_custom_type(self.data_type, stream, self.persistent_only)
    }

    fn from_stream_to_sink(
        &self,
        stream: &mut BinaryIStream<'_>,
        sink: &mut dyn DataSink,
        _state: &mut LevelState,
    ) -> bool {
        sink.write_custom_type(self.data_type, stream, self.persistent_only)
    }

    fn is_custom_streamed(&self) -> bool {
        true
    }
}

pub(crate) fn custom_element(
    data_type: &dyn DataType,
    index: usize,
    persistent_only: bool,
) -> Option<Box<dyn StreamElement<'_> + '_>> {
    if index == 0 {
        Some(Box::new(CustomElement {
            data_type,
            persistent_only,
        }))
    } else {
        None
    }
}
