//! Pull interface for reading values out of some representation

use crate::data_type::DataType;
use entitydef_core::{BinaryOStream, DataSection, MailboxRef, UniqueId, Vector2, Vector3, Vector4};

/// What a source knows about the sequence it is positioned at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceLength {
    /// The source holds this many elements
    Known(usize),
    /// A sequence whose length only a fixed-size type can supply
    Unknown,
    /// The current value is not a sequence
    Missing,
}

/// Supplies the parts of a value as a `DataType` asks for them.
///
/// Every method defaults to failing, so an implementation only overrides
/// what it can actually provide. A `None` or `false` return means the shape
/// the type expects cannot be satisfied and the current top-level value
/// must be abandoned.
pub trait DataSource {
    /// Whether the current value is absent. Asked before reading a nullable
    /// composite.
    fn read_none(&mut self) -> Option<bool> {
        None
    }

    /// Start reading a sequence
    fn begin_sequence(&mut self) -> SequenceLength {
        SequenceLength::Missing
    }

    fn enter_item(&mut self, _index: usize) -> bool {
        false
    }

    fn leave_item(&mut self) -> bool {
        false
    }

    fn begin_class(&mut self) -> bool {
        false
    }

    fn enter_field(&mut self, _name: &str) -> bool {
        false
    }

    fn leave_field(&mut self) -> bool {
        false
    }

    fn read_i8(&mut self) -> Option<i8> {
        None
    }

    fn read_i16(&mut self) -> Option<i16> {
        None
    }

    fn read_i32(&mut self) -> Option<i32> {
        None
    }

    fn read_i64(&mut self) -> Option<i64> {
        None
    }

    fn read_u8(&mut self) -> Option<u8> {
        None
    }

    fn read_u16(&mut self) -> Option<u16> {
        None
    }

    fn read_u32(&mut self) -> Option<u32> {
        None
    }

    fn read_u64(&mut self) -> Option<u64> {
        None
    }

    fn read_f32(&mut self) -> Option<f32> {
        None
    }

    fn read_f64(&mut self) -> Option<f64> {
        None
    }

    fn read_string(&mut self) -> Option<String> {
        None
    }

    fn read_wide_string(&mut self) -> Option<String> {
        None
    }

    fn read_blob(&mut self) -> Option<Vec<u8>> {
        None
    }

    fn read_vector2(&mut self) -> Option<Vector2> {
        None
    }

    fn read_vector3(&mut self) -> Option<Vector3> {
        None
    }

    fn read_vector4(&mut self) -> Option<Vector4> {
        None
    }

    /// Read a mailbox. An absent mailbox is returned as `MailboxRef::none()`.
    fn read_mailbox(&mut self) -> Option<MailboxRef> {
        None
    }

    /// Read a unique id. An absent reference is returned as `UniqueId::ZERO`.
    fn read_unique_id(&mut self) -> Option<UniqueId> {
        None
    }

    /// Let a custom-streamed type write the current value straight to the
    /// stream
    fn read_custom_type(
        &mut self,
        _data_type: &dyn DataType,
        _stream: &mut BinaryOStream,
        _persistent_only: bool,
    ) -> bool {
        false
    }

    /// Let a custom-streamed type write the current value straight to a
    /// section
    fn read_custom_section(&mut self, _data_type: &dyn DataType, _section: &mut DataSection) -> bool {
        false
    }
}

/// A source that can never supply anything
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedDataSource;

impl DataSource for UnsupportedDataSource {}
