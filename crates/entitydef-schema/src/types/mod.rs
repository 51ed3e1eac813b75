//! Concrete data types and their meta types

/// Trait methods every concrete type implements the same way
macro_rules! common_type_methods {
    () => {
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn set_default(&mut self, value: crate::value::Value) {
            self.default = Some(value);
        }

        fn explicit_default(&self) -> Option<&crate::value::Value> {
            self.default.as_ref()
        }
    };
}

mod composite;
mod float;
mod integer;
mod mailbox;
mod scalar;
mod sequence;
mod string;
mod udo_ref;
mod unsupported;
mod user;
mod vector;

pub use composite::{ClassMetaDataType, CompositeDataType, CompositeKind, FixedDictMetaDataType};
pub use float::FloatDataType;
pub use integer::{IntKind, IntegerDataType};
pub use mailbox::MailboxDataType;
pub use sequence::{ArrayMetaDataType, SequenceDataType, SequenceKind, TupleMetaDataType};
pub use string::{BlobDataType, StringDataType};
pub use udo_ref::UdoRefDataType;
pub use unsupported::{UnsupportedDataType, UnsupportedMetaDataType};
pub use user::{UserDataType, UserMetaDataType};
pub use vector::{VectorDataType, VectorMetaDataType};
