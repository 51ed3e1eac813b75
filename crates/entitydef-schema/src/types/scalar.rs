//! Single-step stream element shared by all scalar types

use crate::data_type::DataType;
use crate::sink::DataSink;
use crate::source::DataSource;
use crate::stream_element::{ElementKind, LevelState, StreamElement};
use entitydef_core::{BinaryIStream, BinaryOStream, Md5};

/// Wire transfer for a type that is one fixed step.
///
/// `encode` must write a full-width placeholder when the source cannot
/// supply a value, so the bytes that follow stay aligned.
pub(crate) trait ScalarCodec: DataType + Sized {
    fn encode(&self, source: &mut dyn DataSource, stream: &mut BinaryOStream) -> bool;

    fn decode(&self, stream: &mut BinaryIStream<'_>, sink: &mut dyn DataSink) -> bool;
}

struct ScalarElement<'a, T> {
    data_type: &'a T,
}

impl<'a, T: ScalarCodec> StreamElement<'a> for ScalarElement<'a, T> {
    fn kind(&self) -> ElementKind {
        ElementKind::Value
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
        self.data_type.encode(source, stream)
    }

    fn from_stream_to_sink(
        &self,
        stream: &mut BinaryIStream<'_>,
        sink: &mut dyn DataSink,
        _state: &mut LevelState,
    ) -> bool {
        self.data_type.decode(stream, sink)
    }
}

/// The single element of a scalar type's expansion
pub(crate) fn scalar_element<T: ScalarCodec>(
    data_type: &T,
    index: usize,
) -> Option<Box<dyn StreamElement<'_> + '_>> {
    if index == 0 {
        Some(Box::new(ScalarElement { data_type }))
    } else {
        None
    }
}

/// Fingerprint of a parameterless type: its token and a terminator
pub(crate) fn add_token_to_md5(md5: &mut Md5, token: &str) {
    md5.append_str(token);
    md5.append(&[0]);
}
