//! Meta types: named factories that build `DataType`s from definitions

use crate::data_type::DataType;
use crate::registry::Registry;
use entitydef_core::{DataSection, Result};

/// Parses the parameters of one type token into a concrete type.
///
/// `section` is the definition node. Nested type nodes (array elements,
/// fields) are built through `registry` so that aliases and interning
/// apply at every depth.
pub trait MetaDataType: Send + Sync {
    /// The type token this meta type is registered under
    fn name(&self) -> &str;

    fn get_type(&self, section: &DataSection, registry: &Registry) -> Result<Box<dyn DataType>>;
}

/// A meta type for parameterless types
pub struct SimpleMetaDataType {
    name: String,
    factory: fn() -> Box<dyn DataType>,
}

impl SimpleMetaDataType {
    pub fn new(name: impl Into<String>, factory: fn() -> Box<dyn DataType>) -> Self {
        Self {
            name: name.into(),
            factory,
        }
    }
}

impl MetaDataType for SimpleMetaDataType {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_type(&self, _section: &DataSection, _registry: &Registry) -> Result<Box<dyn DataType>> {
        Ok((self.factory)())
    }
}
