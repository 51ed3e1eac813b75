//! Push interface for building values in some representation

use crate::data_type::DataType;
use entitydef_core::{BinaryIStream, DataSection, MailboxRef, UniqueId, Vector2, Vector3, Vector4};

/// Receives the parts of a value as a `DataType` produces them.
///
/// Every method defaults to failing. A `false` return means the value
/// being built is invalid; whatever was already written for it must be
/// discarded by the owner of the destination.
pub trait DataSink {
    /// Declare whether the current value is absent. Nothing further is
    /// written for an absent value.
    fn write_none(&mut self, _is_none: bool) -> bool {
        false
    }

    fn begin_array(&mut self, _data_type: &dyn DataType, _count: usize) -> bool {
        false
    }

    fn begin_tuple(&mut self, _data_type: &dyn DataType, _count: usize) -> bool {
        false
    }

    fn enter_item(&mut self, _index: usize) -> bool {
        false
    }

    fn leave_item(&mut self) -> bool {
        false
    }

    fn begin_class(&mut self, _data_type: &dyn DataType) -> bool {
        false
    }

    fn begin_dictionary(&mut self, _data_type: &dyn DataType) -> bool {
        false
    }

    fn enter_field(&mut self, _name: &str) -> bool {
        false
    }

    fn leave_field(&mut self) -> bool {
        false
    }

    fn write_i8(&mut self, _value: i8) -> bool {
        false
    }

    fn write_i16(&mut self, _value: i16) -> bool {
        false
    }

    fn write_i32(&mut self, _value: i32) -> bool {
        false
    }

    fn write_i64(&mut self, _value: i64) -> bool {
        false
    }

    fn write_u8(&mut self, _value: u8) -> bool {
        false
    }

    fn write_u16(&mut self, _value: u16) -> bool {
        false
    }

    fn write_u32(&mut self, _value: u32) -> bool {
        false
    }

    fn write_u64(&mut self, _value: u64) -> bool {
        false
    }

    fn write_f32(&mut self, _value: f32) -> bool {
        false
    }

    fn write_f64(&mut self, _value: f64) -> bool {
        false
    }

    fn write_string(&mut self, _value: &str) -> bool {
        false
    }

    fn write_wide_string(&mut self, _value: &str) -> bool {
        false
    }

    fn write_blob(&mut self, _value: &[u8]) -> bool {
        false
    }

    fn write_vector2(&mut self, _value: Vector2) -> bool {
        false
    }

    fn write_vector3(&mut self, _value: Vector3) -> bool {
        false
    }

    fn write_vector4(&mut self, _value: Vector4) -> bool {
        false
    }

    fn write_mailbox(&mut self, _value: &MailboxRef) -> bool {
        false
    }

    fn write_unique_id(&mut self, _value: &UniqueId) -> bool {
        false
    }

    /// Let a custom-streamed type build the current value straight from the
    /// stream
    fn write_custom_type(
        &mut self,
        _data_type: &dyn DataType,
        _stream: &mut BinaryIStream<'_>,
        _persistent_only: bool,
    ) -> bool {
        false
    }

    /// Let a custom-streamed type build the current value straight from a
    /// section
    fn write_custom_section(&mut self, _data_type: &dyn DataType, _section: &DataSection) -> bool {
        false
    }
}

/// A sink that accepts nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedDataSink;

impl DataSink for UnsupportedDataSink {}
