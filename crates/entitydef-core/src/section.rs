//! Hierarchical attribute tree
//!
//! A `DataSection` is a named node holding a text value and an ordered list
//! of children. Children may share names. Type definitions are read from
//! sections and property values are persisted to them.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::str::FromStr;

/// Child name used for sequence elements
pub const ITEM_SECTION: &str = "item";

/// What a leaf's text was written as, so it goes back out to TOML with the
/// same type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum LeafKind {
    #[default]
    Text,
    Integer,
    Float,
    Boolean,
}

/// A node in the attribute tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSection {
    name: String,
    value: String,
    kind: LeafKind,
    children: Vec<DataSection>,
}

impl DataSection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind: LeafKind::Text,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    // Children

    pub fn count_children(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, index: usize) -> Option<&DataSection> {
        self.children.get(index)
    }

    pub fn children(&self) -> impl Iterator<Item = &DataSection> {
        self.children.iter()
    }

    /// First child with the given name
    pub fn open_section(&self, name: &str) -> Option<&DataSection> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn open_section_mut(&mut self, name: &str) -> Option<&mut DataSection> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// All children with the given name, in order
    pub fn open_sections<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a DataSection> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Append a new empty child and return it
    pub fn new_section(&mut self, name: impl Into<String>) -> &mut DataSection {
        self.children.push(DataSection::new(name));
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn add_child(&mut self, child: DataSection) {
        self.children.push(child);
    }

    /// Remove the last child, used to discard a partially written node
    pub fn pop_child(&mut self) -> Option<DataSection> {
        self.children.pop()
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.kind = LeafKind::Text;
        self.children.clear();
    }

    // Value accessors

    pub fn as_string(&self) -> &str {
        &self.value
    }

    pub fn set_string(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.kind = LeafKind::Text;
    }

    /// Parse the trimmed value text
    pub fn as_parsed<T: FromStr>(&self) -> Option<T> {
        self.value.trim().parse().ok()
    }

    pub fn as_int(&self) -> Option<i64> {
        self.as_parsed()
    }

    pub fn as_uint(&self) -> Option<u64> {
        self.as_parsed()
    }

    pub fn as_float(&self) -> Option<f64> {
        self.as_parsed()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.value.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<Vec<u8>> {
        BASE64.decode(self.value.trim()).ok()
    }

    pub fn set_int(&mut self, value: i64) {
        self.value = value.to_string();
        self.kind = LeafKind::Integer;
    }

    pub fn set_uint(&mut self, value: u64) {
        self.value = value.to_string();
        self.kind = LeafKind::Integer;
    }

    pub fn set_float(&mut self, value: f64) {
        self.value = value.to_string();
        self.kind = LeafKind::Float;
    }

    /// Written at f32 precision so the text reads back to the same f32
    pub fn set_float32(&mut self, value: f32) {
        self.value = value.to_string();
        self.kind = LeafKind::Float;
    }

    pub fn set_bool(&mut self, value: bool) {
        self.value = value.to_string();
        self.kind = LeafKind::Boolean;
    }

    pub fn set_blob(&mut self, bytes: &[u8]) {
        self.value = BASE64.encode(bytes);
        self.kind = LeafKind::Text;
    }

    // Named child helpers, used when reading definitions

    pub fn read_string(&self, name: &str) -> Option<&str> {
        self.open_section(name).map(|s| s.as_string().trim())
    }

    pub fn read_bool(&self, name: &str, default: bool) -> Option<bool> {
        match self.open_section(name) {
            Some(section) => section.as_bool(),
            None => Some(default),
        }
    }

    // TOML bridge

    /// Build a section from a TOML value. Tables become named children in
    /// key order, arrays become repeated `item` children and scalars become
    /// the value text.
    pub fn from_toml(name: impl Into<String>, value: &toml::Value) -> Self {
        let mut section = DataSection::new(name);
        match value {
            toml::Value::Table(table) => {
                for (key, child) in table {
                    section.add_child(DataSection::from_toml(key.clone(), child));
                }
            }
            toml::Value::Array(items) => {
                for item in items {
                    section.add_child(DataSection::from_toml(ITEM_SECTION, item));
                }
            }
            toml::Value::String(s) => section.set_string(s.as_str()),
            toml::Value::Integer(i) => section.set_int(*i),
            toml::Value::Float(f) => section.set_float(*f),
            toml::Value::Boolean(b) => section.set_bool(*b),
            toml::Value::Datetime(d) => section.set_string(d.to_string()),
        }
        section
    }

    /// Convert back to TOML. A node whose children are all `item` becomes an
    /// array; other nodes with children become tables, with repeated names
    /// collected into arrays. A leaf keeps the type it was set with; text
    /// always stays a string.
    pub fn to_toml(&self) -> toml::Value {
        if self.children.is_empty() {
            return self.leaf_to_toml();
        }

        if self.children.iter().all(|c| c.name == ITEM_SECTION) {
            return toml::Value::Array(self.children.iter().map(|c| c.to_toml()).collect());
        }

        let mut table = toml::map::Map::new();
        for child in &self.children {
            let value = child.to_toml();
            match table.get_mut(&child.name) {
                Some(toml::Value::Array(existing)) if self.is_repeated(&child.name) => {
                    existing.push(value)
                }
                Some(_) => {}
                None => {
                    let value = if self.is_repeated(&child.name) {
                        toml::Value::Array(vec![value])
                    } else {
                        value
                    };
                    table.insert(child.name.clone(), value);
                }
            }
        }
        toml::Value::Table(table)
    }

    fn is_repeated(&self, name: &str) -> bool {
        self.open_sections(name).nth(1).is_some()
    }

    fn leaf_to_toml(&self) -> toml::Value {
        let text = self.value.as_str();
        let typed = match self.kind {
            LeafKind::Text => None,
            // Beyond i64 only text keeps the digits exact
            LeafKind::Integer => text.parse().ok().map(toml::Value::Integer),
            LeafKind::Float => text.parse().ok().map(toml::Value::Float),
            LeafKind::Boolean => text.parse().ok().map(toml::Value::Boolean),
        };
        typed.unwrap_or_else(|| toml::Value::String(text.to_string()))
    }
}
