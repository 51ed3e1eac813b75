//! `FLOAT32` and `FLOAT64`

use super::scalar::{add_token_to_md5, scalar_element, ScalarCodec};
use crate::data_type::DataType;
use crate::sink::DataSink;
use crate::source::DataSource;
use crate::stream_element::StreamElement;
use crate::value::Value;
use entitydef_core::{BinaryIStream, BinaryOStream, DataSection, Md5};
use std::cmp::Ordering;

pub struct FloatDataType {
    double: bool,
    default: Option<Value>,
}

impl FloatDataType {
    pub fn single() -> Self {
        Self {
            double: false,
            default: None,
        }
    }

    pub fn double() -> Self {
        Self {
            double: true,
            default: None,
        }
    }
}

impl ScalarCodec for FloatDataType {
    fn encode(&self, source: &mut dyn DataSource, stream: &mut BinaryOStream) -> bool {
        if self.double {
            let v = source.read_f64();
            stream.write_f64(v.unwrap_or_default());
            v.is_some()
        } else {
            let v = source.read_f32();
            stream.write_f32(v.unwrap_or_default());
            v.is_some()
        }
    }

    fn decode(&self, stream: &mut BinaryIStream<'_>, sink: &mut dyn DataSink) -> bool {
        if self.double {
            stream.read_f64().is_some_and(|v| sink.write_f64(v))
        } else {
            stream.read_f32().is_some_and(|v| sink.write_f32(v))
        }
    }
}

impl DataType for FloatDataType {
    common_type_methods!();

    fn meta_name(&self) -> &str {
        if self.double {
            "FLOAT64"
        } else {
            "FLOAT32"
        }
    }

    fn is_same_type(&self, value: &Value) -> bool {
        value.as_f64().is_some()
    }

    fn default_value(&self) -> Value {
        self.default.clone().unwrap_or(Value::Float(0.0))
    }

    fn stream_size(&self) -> Option<usize> {
        Some(if self.double { 8 } else { 4 })
    }

    fn add_to_section(&self, source: &mut dyn DataSource, section: &mut DataSection) -> bool {
        let written = if self.double {
            source.read_f64().map(|v| section.set_float(v))
        } else {
            source.read_f32().map(|v| section.set_float32(v))
        };
        written.is_some()
    }

    fn create_from_section(&self, section: &DataSection, sink: &mut dyn DataSink) -> bool {
        let ok = if self.double {
            section.as_parsed().map(|v| sink.write_f64(v))
        } else {
            section.as_parsed().map(|v| sink.write_f32(v))
        };
        if ok.is_none() {
            log::warn!(
                "{}: cannot read '{}' from section '{}'",
                self.meta_name(),
                section.as_string(),
                section.name()
            );
        }
        ok.unwrap_or(false)
    }

    fn add_to_md5(&self, md5: &mut Md5) {
        add_token_to_md5(md5, self.meta_name());
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
