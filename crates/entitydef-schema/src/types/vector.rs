//! `VECTOR2`, `VECTOR3` and `VECTOR4`: packed f32 components

use super::scalar::{add_token_to_md5, scalar_element, ScalarCodec};
use crate::data_type::DataType;
use crate::meta::MetaDataType;
use crate::registry::Registry;
use crate::sink::DataSink;
use crate::source::DataSource;
use crate::stream_element::StreamElement;
use crate::value::Value;
use entitydef_core::{
    BinaryIStream, BinaryOStream, DataSection, EntityDefError, Md5, Result, Vector2, Vector3, Vector4,
};
use std::cmp::Ordering;

pub struct VectorDataType {
    dims: usize,
    default: Option<Value>,
}

impl VectorDataType {
    /// A vector type with 2, 3 or 4 components
    pub fn new(dims: usize) -> Option<Self> {
        (2..=4).contains(&dims).then_some(Self {
            dims,
            default: None,
        })
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    fn read(&self, source: &mut dyn DataSource) -> Option<Vec<f32>> {
        match self.dims {
            2 => source.read_vector2().map(|v| v.to_array().to_vec()),
            3 => source.read_vector3().map(|v| v.to_array().to_vec()),
            _ => source.read_vector4().map(|v| v.to_array().to_vec()),
        }
    }

    fn write(&self, sink: &mut dyn DataSink, c: &[f32]) -> bool {
        match (self.dims, c) {
            (2, &[x, y]) => sink.write_vector2(Vector2::new(x, y)),
            (3, &[x, y, z]) => sink.write_vector3(Vector3::new(x, y, z)),
            (4, &[x, y, z, w]) => sink.write_vector4(Vector4::new(x, y, z, w)),
            _ => false,
        }
    }

    fn parse_text(&self, text: &str) -> Option<Vec<f32>> {
        let parts: Vec<f32> = text
            .split_whitespace()
            .map(|part| part.parse().ok())
            .collect::<Option<_>>()?;
        (parts.len() == self.dims).then_some(parts)
    }
}

impl ScalarCodec for VectorDataType {
    fn encode(&self, source: &mut dyn DataSource, stream: &mut BinaryOStream) -> bool {
        let components = self.read(source);
        let ok = components.is_some();
        let components = components.unwrap_or_else(|| vec![0.0; self.dims]);
        for c in components {
            stream.write_f32(c);
        }
        ok
    }

    fn decode(&self, stream: &mut BinaryIStream<'_>, sink: &mut dyn DataSink) -> bool {
        let components: Option<Vec<f32>> = (0..self.dims).map(|_| stream.read_f32()).collect();
        components.is_some_and(|c| self.write(sink, &c))
    }
}

impl DataType for VectorDataType {
    common_type_methods!();

    fn meta_name(&self) -> &str {
        match self.dims {
            2 => "VECTOR2",
            3 => "VECTOR3",
            _ => "VECTOR4",
        }
    }

    fn is_same_type(&self, value: &Value) -> bool {
        matches!(
            (self.dims, value),
            (2, Value::Vector2(_)) | (3, Value::Vector3(_)) | (4, Value::Vector4(_))
        )
    }

    fn default_value(&self) -> Value {
        if let Some(value) = &self.default {
            return value.clone();
        }
        match self.dims {
            2 => Value::Vector2(Vector2::ZERO),
            3 => Value::Vector3(Vector3::ZERO),
            _ => Value::Vector4(Vector4::ZERO),
        }
    }

    fn stream_size(&self) -> Option<usize> {
        Some(self.dims * 4)
    }

    fn add_to_section(&self, source: &mut dyn DataSource, section: &mut DataSection) -> bool {
        match self.read(source) {
            Some(components) => {
                let parts: Vec<String> = components.iter().map(|c| c.to_string()).collect();
                section.set_string(parts.join(" "));
                true
            }
            None => false,
        }
    }

    fn create_from_section(&self, section: &DataSection, sink: &mut dyn DataSink) -> bool {
        match self.parse_text(section.as_string()) {
            Some(components) => self.write(sink, &components),
            None => {
                log::warn!(
                    "{}: cannot read '{}' from section '{}'",
                    self.meta_name(),
                    section.as_string(),
                    section.name()
                );
                false
            }
        }
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

/// Builds one of the `VECTORn` types. They take no parameters.
pub struct VectorMetaDataType {
    name: String,
    dims: usize,
}

impl VectorMetaDataType {
    pub fn new(dims: usize) -> Self {
        Self {
            name: format!("VECTOR{}", dims),
            dims,
        }
    }
}

impl MetaDataType for VectorMetaDataType {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_type(&self, _section: &DataSection, _registry: &Registry) -> Result<Box<dyn DataType>> {
        match VectorDataType::new(self.dims) {
            Some(data_type) => Ok(Box::new(data_type)),
            None => Err(EntityDefError::invalid(&self.name, "vectors have 2, 3 or 4 components")),
        }
    }
}
