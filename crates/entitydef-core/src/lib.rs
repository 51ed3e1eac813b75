//! Entitydef Core - Foundational types for entity definitions
//!
//! This crate provides the leaf utilities that the type system builds on:
//! - `Md5` / `Digest` - Schema fingerprinting
//! - `BinaryOStream` / `BinaryIStream` - Wire format streams with packed ints
//! - `DataSection` - Hierarchical attribute tree with a TOML bridge
//! - `Vector2`, `Vector3`, `Vector4`, `MailboxRef`, `UniqueId` - Value types
//! - Error types and Result alias

mod error;
mod id;
mod md5;
mod section;
mod stream;
mod types;

pub use error::{EntityDefError, Result};
pub use id::{EntityId, MailboxComponent, MailboxRef, UniqueId};
pub use md5::{Digest, Md5};
pub use section::{DataSection, ITEM_SECTION};
pub use stream::{BinaryIStream, BinaryOStream, MAX_PACKED_INT};
pub use types::{Vector2, Vector3, Vector4};
