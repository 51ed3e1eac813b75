//! `MAILBOX`: a reference to a remote entity

use super::scalar::{add_token_to_md5, scalar_element, ScalarCodec};
use crate::data_type::DataType;
use crate::sink::DataSink;
use crate::source::DataSource;
use crate::stream_element::StreamElement;
use crate::value::Value;
use entitydef_core::{
    BinaryIStream, BinaryOStream, DataSection, EntityId, MailboxComponent, MailboxRef, Md5,
};
use std::cmp::Ordering;

/// Wire layout: entity id (i32), ip (u32), port (u16), then component and
/// entity type id packed into one u16. The null mailbox is all zeros and
/// maps to `Value::None`.
pub struct MailboxDataType {
    default: Option<Value>,
}

impl MailboxDataType {
    pub const STREAM_SIZE: usize = 12;

    pub fn new() -> Self {
        Self { default: None }
    }
}

impl Default for MailboxDataType {
    fn default() -> Self {
        Self::new()
    }
}

fn read_section(section: &DataSection) -> Option<MailboxRef> {
    if section.count_children() == 0 {
        return Some(MailboxRef::none());
    }
    let id = section.open_section("id")?.as_parsed()?;
    let ip = section.open_section("ip")?.as_parsed()?;
    let port = section.open_section("port")?.as_parsed()?;
    let component = MailboxComponent::from_name(section.read_string("component")?)?;
    let type_id = section.open_section("type_id")?.as_parsed()?;
    if type_id > MailboxRef::MAX_TYPE_ID {
        return None;
    }
    Some(MailboxRef::new(EntityId(id), ip, port, component, type_id))
}

impl ScalarCodec for MailboxDataType {
    fn encode(&self, source: &mut dyn DataSource, stream: &mut BinaryOStream) -> bool {
        let mailbox = source.read_mailbox();
        let ok = mailbox.is_some_and(|m| m.type_id <= MailboxRef::MAX_TYPE_ID);
        let mailbox = mailbox.unwrap_or_default();
        stream.write_i32(mailbox.id.raw());
        stream.write_u32(mailbox.ip);
        stream.write_u16(mailbox.port);
        stream.write_u16(mailbox.salt());
        ok
    }

    fn decode(&self, stream: &mut BinaryIStream<'_>, sink: &mut dyn DataSink) -> bool {
        let (Some(id), Some(ip), Some(port), Some(salt)) = (
            stream.read_i32(),
            stream.read_u32(),
            stream.read_u16(),
            stream.read_u16(),
        ) else {
            return false;
        };
        let (component, type_id) = MailboxRef::split_salt(salt);
        sink.write_mailbox(&MailboxRef::new(EntityId(id), ip, port, component, type_id))
    }
}

impl DataType for MailboxDataType {
    common_type_methods!();

    fn meta_name(&self) -> &str {
        "MAILBOX"
    }

    /// The null mailbox is only expressed as `Value::None`
    fn is_same_type(&self, value: &Value) -> bool {
        match value {
            Value::None => true,
            Value::Mailbox(mailbox) => {
                !mailbox.is_none() && mailbox.type_id <= MailboxRef::MAX_TYPE_ID
            }
            _ => false,
        }
    }

    fn default_value(&self) -> Value {
        self.default.clone().unwrap_or(Value::None)
    }

    fn stream_size(&self) -> Option<usize> {
        Some(Self::STREAM_SIZE)
    }

    fn add_to_section(&self, source: &mut dyn DataSource, section: &mut DataSection) -> bool {
        let Some(mailbox) = source.read_mailbox() else {
            return false;
        };
        section.clear();
        if !mailbox.is_none() {
            section.new_section("id").set_int(mailbox.id.raw().into());
            section.new_section("ip").set_uint(mailbox.ip.into());
            section.new_section("port").set_uint(mailbox.port.into());
            section
                .new_section("component")
                .set_string(mailbox.component.name());
            section.new_section("type_id").set_uint(mailbox.type_id.into());
        }
        true
    }

    fn create_from_section(&self, section: &DataSection, sink: &mut dyn DataSink) -> bool {
        match read_section(section) {
            Some(mailbox) => sink.write_mailbox(&mailbox),
            None => {
                log::warn!("MAILBOX: malformed section '{}'", section.name());
                false
            }
        }
    }

    fn add_to_md5(&self, md5: &mut Md5) {
        add_token_to_md5(md5, "MAILBOX");
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

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MailboxRef {
        MailboxRef::new(EntityId(1234), 0x0A000001, 20013, MailboxComponent::Cell, 5)
    }

    #[test]
    fn test_wire_layout() {
        let data_type: &dyn DataType = &MailboxDataType::new();
        let mut stream = BinaryOStream::new();
        assert!(data_type.value_to_stream(&Value::Mailbox(sample()), &mut stream, false));
        assert_eq!(stream.len(), MailboxDataType::STREAM_SIZE);
        assert_eq!(&stream.data()[..4], &1234i32.to_le_bytes());

        let mut input = BinaryIStream::new(stream.data());
        assert_eq!(
            data_type.value_from_stream(&mut input, false),
            Some(Value::Mailbox(sample()))
        );
    }

    #[test]
    fn test_none_is_zero_bytes() {
        let data_type: &dyn DataType = &MailboxDataType::new();
        let mut stream = BinaryOStream::new();
        assert!(data_type.value_to_stream(&Value::None, &mut stream, false));
        assert_eq!(stream.data(), &[0u8; 12]);
        let mut input = BinaryIStream::new(stream.data());
        assert_eq!(data_type.value_from_stream(&mut input, false), Some(Value::None));
    }

    #[test]
    fn test_section_roundtrip() {
        let data_type: &dyn DataType = &MailboxDataType::new();
        let mut section = DataSection::new("owner");
        assert!(data_type.value_to_section(&Value::Mailbox(sample()), &mut section));
        assert_eq!(section.read_string("component"), Some("cell"));
        assert_eq!(
            data_type.value_from_section(&section),
            Some(Value::Mailbox(sample()))
        );

        let empty = DataSection::new("owner");
        assert_eq!(data_type.value_from_section(&empty), Some(Value::None));
    }

    #[test]
    fn test_null_and_oversized_mailboxes_rejected() {
        let data_type: &dyn DataType = &MailboxDataType::new();
        assert!(data_type.is_same_type(&Value::None));
        assert!(data_type.is_same_type(&Value::Mailbox(sample())));
        assert!(!data_type.is_same_type(&Value::Mailbox(MailboxRef::none())));

        let oversized = MailboxRef {
            type_id: MailboxRef::MAX_TYPE_ID + 1,
            ..sample()
        };
        assert!(!data_type.is_same_type(&Value::Mailbox(oversized)));
        let mut stream = BinaryOStream::new();
        assert!(!data_type.value_to_stream(&Value::Mailbox(oversized), &mut stream, false));
    }
}
