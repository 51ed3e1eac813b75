//! Registry of meta types, named aliases and custom implementors

use crate::custom::CustomStreaming;
use crate::data_type::{DataType, TypeKey};
use crate::meta::{MetaDataType, SimpleMetaDataType};
use crate::types::{
    ArrayMetaDataType, BlobDataType, ClassMetaDataType, FixedDictMetaDataType, FloatDataType,
    IntKind, IntegerDataType, MailboxDataType, StringDataType, TupleMetaDataType, UdoRefDataType,
    UnsupportedMetaDataType, UserMetaDataType, VectorMetaDataType,
};
use entitydef_core::{DataSection, EntityDefError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};

/// Turns definition nodes into shared `DataType`s.
///
/// A registry is built once, populated with meta types and implementors,
/// then passed by reference to everything that parses definitions. Built
/// types are interned: structurally equal definitions share one `Arc`.
pub struct Registry {
    metas: BTreeMap<String, Arc<dyn MetaDataType>>,
    meta_aliases: BTreeMap<String, String>,
    aliases: BTreeMap<String, Arc<dyn DataType>>,
    implementors: BTreeMap<String, Arc<dyn CustomStreaming>>,
    interned: Mutex<BTreeSet<TypeKey>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn simple(name: &str, factory: fn() -> Box<dyn DataType>) -> Arc<dyn MetaDataType> {
    Arc::new(SimpleMetaDataType::new(name, factory))
}

impl Registry {
    /// Create a registry with no meta types
    pub fn new() -> Self {
        Self {
            metas: BTreeMap::new(),
            meta_aliases: BTreeMap::new(),
            aliases: BTreeMap::new(),
            implementors: BTreeMap::new(),
            interned: Mutex::new(BTreeSet::new()),
        }
    }

    /// Create a registry with every built-in type token
    pub fn with_builtin_types() -> Self {
        let mut registry = Self::new();
        let builtins: Vec<Arc<dyn MetaDataType>> = vec![
            simple("INT8", || Box::new(IntegerDataType::new(IntKind::Int8))),
            simple("INT16", || Box::new(IntegerDataType::new(IntKind::Int16))),
            simple("INT32", || Box::new(IntegerDataType::new(IntKind::Int32))),
            simple("INT64", || Box::new(IntegerDataType::new(IntKind::Int64))),
            simple("UINT8", || Box::new(IntegerDataType::new(IntKind::UInt8))),
            simple("UINT16", || Box::new(IntegerDataType::new(IntKind::UInt16))),
            simple("UINT32", || Box::new(IntegerDataType::new(IntKind::UInt32))),
            simple("UINT64", || Box::new(IntegerDataType::new(IntKind::UInt64))),
            simple("FLOAT32", || Box::new(FloatDataType::single())),
            simple("FLOAT64", || Box::new(FloatDataType::double())),
            simple("STRING", || Box::new(StringDataType::narrow())),
            simple("UNICODE_STRING", || Box::new(StringDataType::unicode())),
            simple("BLOB", || Box::new(BlobDataType::new())),
            simple("MAILBOX", || Box::new(MailboxDataType::new())),
            simple("UDO_REF", || Box::new(UdoRefDataType::new())),
            Arc::new(VectorMetaDataType::new(2)),
            Arc::new(VectorMetaDataType::new(3)),
            Arc::new(VectorMetaDataType::new(4)),
            Arc::new(ArrayMetaDataType),
            Arc::new(TupleMetaDataType),
            Arc::new(ClassMetaDataType),
            Arc::new(FixedDictMetaDataType),
            Arc::new(UserMetaDataType),
            Arc::new(UnsupportedMetaDataType::new("PYTHON")),
        ];
        for meta in builtins {
            registry.metas.insert(meta.name().to_string(), meta);
        }
        registry.add_meta_alias("FLOAT", "FLOAT32");
        registry
    }

    /// Register a meta type under its token
    pub fn add(&mut self, meta: Arc<dyn MetaDataType>) -> Result<()> {
        let name = meta.name().to_string();
        if self.metas.contains_key(&name) || self.meta_aliases.contains_key(&name) {
            return Err(EntityDefError::DuplicateMetaType(name));
        }
        self.metas.insert(name, meta);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn MetaDataType>> {
        self.metas.remove(name)
    }

    /// Find a meta type by token, following token aliases
    pub fn find(&self, name: &str) -> Option<&Arc<dyn MetaDataType>> {
        let name = self
            .meta_aliases
            .get(name)
            .map(String::as_str)
            .unwrap_or(name);
        self.metas.get(name)
    }

    /// Make `alias` another token for the meta type `target`
    pub fn add_meta_alias(&mut self, alias: impl Into<String>, target: impl Into<String>) {
        self.meta_aliases.insert(alias.into(), target.into());
    }

    pub fn meta_names(&self) -> impl Iterator<Item = &str> {
        self.metas.keys().map(String::as_str)
    }

    /// Define a named type. Names are unique.
    pub fn add_alias(&mut self, name: impl Into<String>, data_type: Arc<dyn DataType>) -> Result<()> {
        let name = name.into();
        if self.aliases.contains_key(&name) {
            return Err(EntityDefError::DuplicateAlias(name));
        }
        self.aliases.insert(name, data_type);
        Ok(())
    }

    /// Define or redefine a named type, returning the previous definition
    pub fn replace_alias(
        &mut self,
        name: impl Into<String>,
        data_type: Arc<dyn DataType>,
    ) -> Option<Arc<dyn DataType>> {
        self.aliases.insert(name.into(), data_type)
    }

    pub fn alias(&self, name: &str) -> Option<Arc<dyn DataType>> {
        self.aliases.get(name).cloned()
    }

    /// Alias names in sorted order
    pub fn alias_names(&self) -> impl Iterator<Item = &str> {
        self.aliases.keys().map(String::as_str)
    }

    pub fn aliases(&self) -> impl Iterator<Item = (&str, &Arc<dyn DataType>)> {
        self.aliases.iter().map(|(name, ty)| (name.as_str(), ty))
    }

    /// Register a custom streaming implementor for `implemented_by`
    pub fn add_implementor(&mut self, name: impl Into<String>, implementor: Arc<dyn CustomStreaming>) {
        let name = name.into();
        if self.implementors.insert(name.clone(), implementor).is_some() {
            log::debug!("Replaced implementor {}", name);
        }
    }

    pub fn implementor(&self, name: &str) -> Option<Arc<dyn CustomStreaming>> {
        self.implementors.get(name).cloned()
    }

    /// Build the type described by a definition node.
    ///
    /// The node is either a bare token or has a `type` child. Aliases are
    /// resolved before meta types. A `default` child sets the explicit
    /// default of a freshly built type.
    pub fn build_type(&self, section: &DataSection) -> Result<Arc<dyn DataType>> {
        let token = if section.count_children() == 0 {
            section.as_string().trim()
        } else {
            section.read_string("type").map(str::trim).unwrap_or_default()
        };
        if token.is_empty() {
            return Err(EntityDefError::MissingTypeToken(section.name().to_string()));
        }

        if let Some(data_type) = self.aliases.get(token) {
            if section.open_section("default").is_some() {
                log::warn!(
                    "Ignoring default on '{}': defaults cannot be set on alias {}",
                    section.name(),
                    token
                );
            }
            return Ok(data_type.clone());
        }

        let meta = self
            .find(token)
            .ok_or_else(|| EntityDefError::UnknownType(token.to_string()))?;
        let mut data_type = meta.get_type(section, self)?;

        if let Some(default) = section.open_section("default") {
            let value = data_type
                .value_from_section(default)
                .ok_or_else(|| EntityDefError::InvalidDefault {
                    type_name: data_type.type_name(),
                })?;
            data_type.set_default(value);
        }

        Ok(self.intern(Arc::from(data_type)))
    }

    /// Build a type from a TOML definition node
    pub fn type_from_toml(&self, node: &toml::Value) -> Result<Arc<dyn DataType>> {
        self.build_type(&DataSection::from_toml("type", node))
    }

    fn intern(&self, data_type: Arc<dyn DataType>) -> Arc<dyn DataType> {
        let mut interned = self.interned.lock().unwrap_or_else(PoisonError::into_inner);
        let key = TypeKey(data_type);
        if let Some(existing) = interned.get(&key) {
            return existing.0.clone();
        }
        let data_type = key.0.clone();
        interned.insert(key);
        data_type
    }

    /// Number of distinct types built so far
    pub fn interned_count(&self) -> usize {
        self.interned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
