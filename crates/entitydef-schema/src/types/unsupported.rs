//! Stand-in for type tokens this build cannot transcode, such as `PYTHON`
//!
//! Definitions that name such a type still load. Every operation on the
//! resulting type fails, and the first use is logged as an error.

use crate::data_type::DataType;
use crate::meta::MetaDataType;
use crate::registry::Registry;
use crate::sink::DataSink;
use crate::source::DataSource;
use crate::stream_element::{ElementKind, LevelState, StreamElement};
use crate::value::Value;
use entitydef_core::{BinaryIStream, BinaryOStream, DataSection, Md5, Result};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

pub struct UnsupportedDataType {
    token: String,
    reported: AtomicBool,
    default: Option<Value>,
}

impl UnsupportedDataType {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            reported: AtomicBool::new(false),
            default: None,
        }
    }

    fn report(&self) {
        if !self.reported.swap(true, AtomicOrdering::Relaxed) {
            log::error!("{} is not supported in this build", self.token);
        }
    }
}

struct UnsupportedElement<'a> {
    ty: &'a UnsupportedDataType,
}

impl<'a> StreamElement<'a> for UnsupportedElement<'a> {
    fn kind(&self) -> ElementKind {
        ElementKind::Value
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
        self.ty.report();
        false
    }

    fn from_stream_to_sink(
        &self,
        _stream: &mut BinaryIStream<'_>,
        _sink: &mut dyn DataSink,
        _state: &mut LevelState,
    ) -> bool {
        self.ty.report();
        false
    }
}

impl DataType for UnsupportedDataType {
    common_type_methods!();

    fn meta_name(&self) -> &str {
        &self.token
    }

    fn is_same_type(&self, _value: &Value) -> bool {
        false
    }

    fn default_value(&self) -> Value {
        Value::None
    }

    fn stream_size(&self) -> Option<usize> {
        None
    }

    fn add_to_section(&self, _source: &mut dyn DataSource, _section: &mut DataSection) -> bool {
        self.report();
        false
    }

    fn create_from_section(&self, _section: &DataSection, _sink: &mut dyn DataSink) -> bool {
        self.report();
        false
    }

    fn add_to_md5(&self, md5: &mut Md5) {
        self.report();
        md5.append(b"Unsupported\0");
        md5.append_str(&self.token);
    }

    fn stream_element<'a>(
        &'a self,
        index: usize,
        _size: &mut usize,
        _is_none: &mut bool,
        _persistent_only: bool,
    ) -> Option<Box<dyn StreamElement<'a> + 'a>> {
        (index == 0).then(|| Box::new(UnsupportedElement { ty: self }) as Box<dyn StreamElement<'a> + 'a>)
    }

    fn compare_same_meta(&self, _other: &dyn DataType) -> Ordering {
        Ordering::Equal
    }
}

pub struct UnsupportedMetaDataType {
    token: String,
}

impl UnsupportedMetaDataType {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl MetaDataType for UnsupportedMetaDataType {
    fn name(&self) -> &str {
        &self.token
    }

    fn get_type(&self, _section: &DataSection, _registry: &Registry) -> Result<Box<dyn DataType>> {
        Ok(Box::new(UnsupportedDataType::new(self.token.as_str())))
    }
}
