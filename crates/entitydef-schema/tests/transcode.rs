//! End-to-end transcoding through types loaded from definitions

use entitydef_core::{BinaryIStream, BinaryOStream, DataSection};
use entitydef_schema::{
    CustomStreaming, DataSource, DataType, ElementKind, ElementWalker, Registry, SchemaRegistry,
    SequenceLength, UnsupportedDataSink, UnsupportedDataSource, Value,
};
use std::sync::Arc;

const DEFS: &str = r#"
[alias]
Point = { type = "FIXED_DICT", properties = { x = "INT32", y = "STRING" } }
MaybeLevel = { type = "FIXED_DICT", allow_none = true, properties = { level = "UINT8" } }
Levels = { type = "ARRAY", of = "MaybeLevel" }
Triple = { type = "ARRAY", of = "INT8", size = 3 }
Inventory = { type = "ARRAY", of = "UINT8", db_len = 16 }
Numbers = { type = "ARRAY", of = "INT32" }

[alias.Guarded]
type = "FIXED_DICT"
properties = { values = "Triple", tail = "UINT8" }

[alias.Player]
type = "CLASS"
properties = { name = "STRING", session = { type = "UINT32", persistent = false } }

[alias.Players]
type = "ARRAY"
of = "Player"

[alias.Deep]
type = "ARRAY"
of = { type = "TUPLE", size = 2, of = { type = "CLASS", properties = { tags = { type = "ARRAY", of = "STRING" } } } }
"#;

fn schema() -> SchemaRegistry {
    let mut schema = SchemaRegistry::new();
    schema.load_string(DEFS).unwrap();
    schema
}

fn encode(data_type: &Arc<dyn DataType>, value: &Value, persistent_only: bool) -> (bool, Vec<u8>) {
    let mut stream = BinaryOStream::new();
    let ok = data_type.value_to_stream(value, &mut stream, persistent_only);
    (ok, stream.into_inner())
}

fn decode(data_type: &Arc<dyn DataType>, bytes: &[u8], persistent_only: bool) -> Option<Value> {
    let mut input = BinaryIStream::new(bytes);
    let value = data_type.value_from_stream(&mut input, persistent_only)?;
    input.is_finished().then_some(value)
}

fn point(x: i64, y: &str) -> Value {
    Value::dict([("x", Value::Int(x)), ("y", Value::from(y))])
}

#[test]
fn test_fixed_dict_wire_bytes() {
    let point_type = schema().get_type("Point").unwrap();
    let (ok, bytes) = encode(&point_type, &point(5, "hi"), false);
    assert!(ok);
    assert_eq!(bytes, vec![0x05, 0x00, 0x00, 0x00, 0x02, 0x68, 0x69]);
    assert_eq!(decode(&point_type, &bytes, false), Some(point(5, "hi")));
}

#[test]
fn test_element_index_law() {
    let point_type = schema().get_type("Point").unwrap();
    let mut size = 0;
    let mut is_none = false;
    for index in 0..=5 {
        assert!(
            point_type.stream_element(index, &mut size, &mut is_none, false).is_some(),
            "index {}",
            index
        );
    }
    assert_eq!(size, 2);
    assert!(point_type.stream_element(6, &mut size, &mut is_none, false).is_none());
}

#[test]
fn test_walker_flattens_nesting() {
    let point_type = schema().get_type("Point").unwrap();
    let walked: Vec<(usize, ElementKind)> = ElementWalker::new(point_type.as_ref(), false)
        .map(|walked| (walked.depth, walked.element.kind()))
        .collect();

    assert_eq!(
        walked,
        vec![
            (0, ElementKind::Begin),
            (0, ElementKind::EnterField),
            (1, ElementKind::Value),
            (0, ElementKind::LeaveField),
            (0, ElementKind::EnterField),
            (1, ElementKind::Value),
            (0, ElementKind::LeaveField),
            (0, ElementKind::End),
        ]
    );

    let triple = schema().get_type("Triple").unwrap();
    let kinds: Vec<ElementKind> = ElementWalker::new(triple.as_ref(), false)
        .map(|walked| walked.element.kind())
        .collect();
    assert_eq!(kinds.len(), 2 + 3 * 3);
    assert_eq!(kinds[1], ElementKind::EnterItem(0));
    assert_eq!(kinds[9], ElementKind::LeaveItem(2));
}

#[test]
fn test_walker_field_names() {
    let point_type = schema().get_type("Point").unwrap();
    let names: Vec<&str> = ElementWalker::new(point_type.as_ref(), false)
        .filter(|walked| walked.element.kind() == ElementKind::EnterField)
        .filter_map(|walked| walked.element.field_name())
        .collect();
    assert_eq!(names, vec!["x", "y"]);
}

#[test]
fn test_nullable_items() {
    let levels = schema().get_type("Levels").unwrap();
    let value = Value::List(vec![
        Value::None,
        Value::dict([("level", Value::UInt(9))]),
    ]);
    let (ok, bytes) = encode(&levels, &value, false);
    assert!(ok);
    assert_eq!(bytes, vec![2, 0, 1, 9]);
    assert_eq!(decode(&levels, &bytes, false), Some(value));
}

#[test]
fn test_failed_field_keeps_framing() {
    let guarded = schema().get_type("Guarded").unwrap();
    let value = Value::dict([
        ("values", Value::List(vec![Value::Int(1), Value::Int(2)])),
        ("tail", Value::UInt(9)),
    ]);
    let (ok, bytes) = encode(&guarded, &value, false);
    assert!(!ok);
    // The short array is padded to its declared size and the next field
    // still lands where a decoder expects it
    assert_eq!(bytes, vec![1, 2, 0, 9]);

    let padded = decode(&guarded, &bytes, false).unwrap();
    assert_eq!(padded.as_dict().unwrap()["tail"], Value::UInt(9));
}

#[test]
fn test_out_of_range_field_fails_alone() {
    let point_type = schema().get_type("Point").unwrap();
    let value = Value::dict([("x", Value::Int(1 << 40)), ("y", Value::from("ok"))]);
    let (ok, bytes) = encode(&point_type, &value, false);
    assert!(!ok);
    assert_eq!(bytes, vec![0, 0, 0, 0, 2, b'o', b'k']);
}

#[test]
fn test_persistent_only_streaming() {
    let schema = schema();
    let player = schema.get_type("Player").unwrap();
    let value = Value::dict([("name", Value::from("al")), ("session", Value::UInt(7))]);

    let (ok, bytes) = encode(&player, &value, true);
    assert!(ok);
    assert_eq!(bytes, vec![2, b'a', b'l']);
    assert_eq!(
        decode(&player, &bytes, true),
        Some(Value::dict([("name", Value::from("al")), ("session", Value::UInt(0))]))
    );

    let (_, all) = encode(&player, &value, false);
    assert_eq!(all, vec![2, b'a', b'l', 7, 0, 0, 0]);
}

#[test]
fn test_db_len_persists_as_blob() {
    let inventory = schema().get_type("Inventory").unwrap();
    let value = Value::List(vec![Value::UInt(1), Value::UInt(2)]);

    let (_, plain) = encode(&inventory, &value, false);
    assert_eq!(plain, vec![2, 1, 2]);

    let (ok, persisted) = encode(&inventory, &value, true);
    assert!(ok);
    assert_eq!(persisted, vec![3, 2, 1, 2]);
    assert_eq!(decode(&inventory, &persisted, true), Some(value));
}

#[test]
fn test_deep_nesting() {
    let deep = schema().get_type("Deep").unwrap();
    let tags = |items: &[&str]| Value::dict([(
        "tags",
        Value::List(items.iter().map(|t| Value::from(*t)).collect()),
    )]);
    let value = Value::List(vec![Value::Tuple(vec![tags(&["a"]), tags(&[])])]);

    let (ok, bytes) = encode(&deep, &value, false);
    assert!(ok);
    assert_eq!(bytes, vec![1, 1, 1, b'a', 0]);
    assert_eq!(decode(&deep, &bytes, false), Some(value));
}

#[test]
fn test_truncated_input_fails() {
    let point_type = schema().get_type("Point").unwrap();
    let (_, bytes) = encode(&point_type, &point(5, "hi"), false);
    for len in 0..bytes.len() {
        assert_eq!(decode(&point_type, &bytes[..len], false), None, "prefix {}", len);
    }
}

#[test]
fn test_stream_section_bridge() {
    let point_type = schema().get_type("Point").unwrap();
    let (_, bytes) = encode(&point_type, &point(-3, "there"), false);

    let mut section = DataSection::new("point");
    let mut input = BinaryIStream::new(&bytes);
    assert!(point_type.from_stream_to_section(&mut input, &mut section, false));
    assert_eq!(section.read_string("x"), Some("-3"));
    assert_eq!(section.read_string("y"), Some("there"));

    let mut stream = BinaryOStream::new();
    assert!(point_type.from_section_to_stream(&section, &mut stream, false));
    assert_eq!(stream.data(), bytes.as_slice());
}

/// Streams `{r, g, b}` as one little-endian u32 and `#RRGGBB` text
struct Colour;

fn rgb(value: &Value) -> Option<[u8; 3]> {
    let map = value.as_dict()?;
    let channel = |name: &str| -> Option<u8> { u8::try_from(map.get(name)?.as_u64()?).ok() };
    Some([channel("r")?, channel("g")?, channel("b")?])
}

fn colour(r: u8, g: u8, b: u8) -> Value {
    Value::dict([
        ("r", Value::UInt(r.into())),
        ("g", Value::UInt(g.into())),
        ("b", Value::UInt(b.into())),
    ])
}

impl CustomStreaming for Colour {
    fn is_same_type(&self, value: &Value) -> bool {
        rgb(value).is_some()
    }

    fn add_to_stream(&self, value: &Value, stream: &mut BinaryOStream, _persistent_only: bool) -> bool {
        match rgb(value) {
            Some([r, g, b]) => {
                stream.write_u32(u32::from_le_bytes([r, g, b, 0]));
                true
            }
            None => false,
        }
    }

    fn create_from_stream(&self, stream: &mut BinaryIStream<'_>, _persistent_only: bool) -> Option<Value> {
        let [r, g, b, _] = stream.read_u32()?.to_le_bytes();
        Some(colour(r, g, b))
    }

    fn add_to_section(&self, value: &Value, section: &mut DataSection) -> bool {
        match rgb(value) {
            Some([r, g, b]) => {
                section.set_string(format!("#{:02X}{:02X}{:02X}", r, g, b));
                true
            }
            None => false,
        }
    }

    fn create_from_section(&self, section: &DataSection) -> Option<Value> {
        let text = section.as_string().strip_prefix('#')?;
        let [_, r, g, b] = u32::from_str_radix(text, 16).ok()?.to_be_bytes();
        Some(colour(r, g, b))
    }
}

const COLOUR_DEFS: &str = r#"
[alias]
Colour = { type = "FIXED_DICT", implemented_by = "Colour", properties = { r = "UINT8", g = "UINT8", b = "UINT8" } }
Palette = { type = "ARRAY", of = "Colour" }
"#;

fn colour_schema() -> SchemaRegistry {
    let mut registry = Registry::with_builtin_types();
    registry.add_implementor("Colour", Arc::new(Colour));
    let mut schema = SchemaRegistry::with_registry(registry);
    schema.load_string(COLOUR_DEFS).unwrap();
    schema
}

#[test]
fn test_custom_streamed_fixed_dict() {
    let schema = colour_schema();
    let colour_type = schema.get_type("Colour").unwrap();
    assert_eq!(colour_type.stream_size(), None);
    assert!(colour_type.is_same_type(&colour(1, 2, 3)));
    assert!(!colour_type.is_same_type(&Value::dict([("r", Value::UInt(300))])));

    let kinds: Vec<ElementKind> = ElementWalker::new(colour_type.as_ref(), false)
        .map(|walked| walked.element.kind())
        .collect();
    assert_eq!(kinds, vec![ElementKind::Custom]);

    let (ok, bytes) = encode(&colour_type, &colour(1, 2, 3), false);
    assert!(ok);
    assert_eq!(bytes, vec![1, 2, 3, 0]);

    let palette = schema.get_type("Palette").unwrap();
    let value = Value::List(vec![colour(1, 2, 3), colour(255, 0, 16)]);
    let (ok, bytes) = encode(&palette, &value, false);
    assert!(ok);
    assert_eq!(bytes, vec![2, 1, 2, 3, 0, 255, 0, 16, 0]);
    assert_eq!(decode(&palette, &bytes, false), Some(value));
}

#[test]
fn test_custom_section_text() {
    let schema = colour_schema();
    let colour_type = schema.get_type("Colour").unwrap();
    let mut section = DataSection::new("tint");
    assert!(colour_type.value_to_section(&colour(255, 0, 16), &mut section));
    assert_eq!(section.as_string(), "#FF0010");
    assert_eq!(colour_type.value_from_section(&section), Some(colour(255, 0, 16)));
}

#[test]
fn test_unsupported_type_loads_but_fails() {
    let mut schema = SchemaRegistry::new();
    schema
        .load_string("[alias]\nScript = \"PYTHON\"\nWrapped = { type = \"ARRAY\", of = \"Script\" }\n")
        .unwrap();
    let wrapped = schema.get_type("Wrapped").unwrap();

    let (ok, bytes) = encode(&wrapped, &Value::List(vec![Value::Int(1)]), false);
    assert!(!ok);
    assert_eq!(bytes, vec![1]);
    assert_eq!(decode(&wrapped, &[1], false), None);
}

#[test]
fn test_oversized_count_fails_fast() {
    let numbers = schema().get_type("Numbers").unwrap();
    let bytes = [0xFF, 0xFF, 0xFF, 0xFF];
    for persistent_only in [false, true] {
        let mut input = BinaryIStream::new(&bytes);
        assert_eq!(numbers.value_from_stream(&mut input, persistent_only), None);
        assert!(input.error(), "persistent_only {}", persistent_only);
    }
}

#[test]
fn test_count_check_uses_persistent_fields() {
    let players = schema().get_type("Players").unwrap();
    let bytes = [3, 0, 0, 0];
    let unnamed = Value::dict([("name", Value::from("")), ("session", Value::UInt(0))]);

    assert_eq!(
        decode(&players, &bytes, true),
        Some(Value::List(vec![unnamed; 3]))
    );
    assert_eq!(decode(&players, &bytes, false), None);
}

/// Hands out items by index without knowing how many there are
struct Countless {
    items: Vec<i8>,
    current: Option<usize>,
}

impl Countless {
    fn new(items: &[i8]) -> Self {
        Self { items: items.to_vec(), current: None }
    }
}

impl DataSource for Countless {
    fn begin_sequence(&mut self) -> SequenceLength {
        SequenceLength::Unknown
    }

    fn enter_item(&mut self, index: usize) -> bool {
        self.current = Some(index);
        index < self.items.len()
    }

    fn leave_item(&mut self) -> bool {
        self.current.take().is_some()
    }

    fn read_i8(&mut self) -> Option<i8> {
        self.items.get(self.current?).copied()
    }
}

#[test]
fn test_fixed_array_adopts_declared_size() {
    let triple = schema().get_type("Triple").unwrap();

    let mut stream = BinaryOStream::new();
    assert!(triple.add_to_stream(&mut Countless::new(&[1, 2, 3]), &mut stream, false));
    assert_eq!(stream.into_inner(), vec![1, 2, 3]);

    let mut section = DataSection::new("triple");
    assert!(triple.add_to_section(&mut Countless::new(&[4, 5, 6]), &mut section));
    assert_eq!(
        triple.value_from_section(&section),
        Some(Value::List(vec![Value::Int(4), Value::Int(5), Value::Int(6)]))
    );
}

#[test]
fn test_variable_array_needs_count() {
    let numbers = schema().get_type("Numbers").unwrap();
    let mut stream = BinaryOStream::new();
    assert!(!numbers.add_to_stream(&mut Countless::new(&[1]), &mut stream, false));

    let mut section = DataSection::new("numbers");
    assert!(!numbers.add_to_section(&mut Countless::new(&[1]), &mut section));
}

#[test]
fn test_numeric_text_survives_toml() {
    let point_type = schema().get_type("Point").unwrap();
    let value = point(7, "007");

    let mut section = DataSection::new("point");
    assert!(point_type.value_to_section(&value, &mut section));
    let document = section.to_toml();
    assert_eq!(document.get("x"), Some(&toml::Value::Integer(7)));
    assert_eq!(document.get("y"), Some(&toml::Value::String("007".into())));

    let back = DataSection::from_toml("point", &document);
    assert_eq!(point_type.value_from_section(&back), Some(value));
}

#[test]
fn test_unsupported_source_and_sink_refuse() {
    let schema = schema();
    for name in [
        "Point", "MaybeLevel", "Triple", "Inventory", "Player", "UINT8", "STRING", "VECTOR3",
        "MAILBOX", "UDO_REF",
    ] {
        let data_type = schema.resolve(name).unwrap();

        let mut stream = BinaryOStream::new();
        assert!(!data_type.add_to_stream(&mut UnsupportedDataSource, &mut stream, false), "{}", name);
        let mut section = DataSection::new("value");
        assert!(!data_type.add_to_section(&mut UnsupportedDataSource, &mut section), "{}", name);

        let (ok, bytes) = encode(&data_type, &data_type.default_value(), false);
        assert!(ok, "{}", name);
        let mut input = BinaryIStream::new(&bytes);
        assert!(!data_type.create_from_stream(&mut input, &mut UnsupportedDataSink, false), "{}", name);
        assert!(!data_type.create_from_section(&section, &mut UnsupportedDataSink), "{}", name);
        assert!(!data_type.write_default(&mut UnsupportedDataSink), "{}", name);
    }
}

#[test]
fn test_empty_nullable_composite_rejected() {
    let mut schema = SchemaRegistry::new();
    assert!(schema
        .load_string("[alias]\nEmpty = { type = \"FIXED_DICT\", allow_none = true }\n")
        .is_err());
}
