//! Entitydef Schema - Typed transcoding of entity property values
//!
//! This crate provides the type system for entity definitions:
//! - `DataType` - Shape of one value and how it moves between the binary
//!   stream, the attribute tree and the neutral `Value` model
//! - `StreamElement` / `ElementWalker` - The flat, index-addressed steps a
//!   type expands into, shared by encoding and decoding
//! - `DataSource` / `DataSink` - Pull and push sides of a representation
//! - `Registry` / `MetaDataType` - Building types from definition nodes
//! - `SchemaRegistry` - Named types loaded from TOML files

mod custom;
mod data_type;
mod meta;
mod registry;
mod schema;
mod sink;
mod source;
mod stream_element;
mod types;
mod value;

pub use custom::CustomStreaming;
pub use data_type::{DataType, Field};
pub use meta::{MetaDataType, SimpleMetaDataType};
pub use registry::Registry;
pub use schema::SchemaRegistry;
pub use sink::{DataSink, UnsupportedDataSink};
pub use source::{DataSource, SequenceLength, UnsupportedDataSource};
pub use stream_element::{ElementKind, ElementWalker, LevelState, StreamElement, WalkedElement};
pub use types::*;
pub use value::{Value, ValueSink, ValueSource};
