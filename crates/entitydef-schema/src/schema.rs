//! Named type definitions loaded from TOML files

use crate::data_type::DataType;
use crate::registry::Registry;
use entitydef_core::{DataSection, Digest, Md5, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A definitions file: an ordered `[alias]` table of type nodes
#[derive(Debug, Deserialize)]
struct AliasFile {
    #[serde(default)]
    alias: toml::Table,
}

/// Holds every named type loaded from definition files
pub struct SchemaRegistry {
    registry: Registry,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::with_registry(Registry::with_builtin_types())
    }
}

impl SchemaRegistry {
    /// Create a registry with the built-in types and no aliases
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a registry that already has implementors or extra meta types
    pub fn with_registry(registry: Registry) -> Self {
        Self { registry }
    }

    /// Load definitions from multiple directories, merging them in order.
    /// Later directories override earlier ones.
    pub fn load_from_directories(paths: &[impl AsRef<Path>]) -> Result<Self> {
        let mut schema = Self::new();
        for path in paths {
            schema.load_directory(path)?;
        }
        Ok(schema)
    }

    /// Load every `types/*.toml` under `path`, in file name order
    pub fn load_directory<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let types_path = path.as_ref().join("types");
        if !types_path.exists() {
            log::debug!("No types directory in {}", path.as_ref().display());
            return Ok(());
        }

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in fs::read_dir(&types_path)? {
            let file_path = entry?.path();
            if file_path.extension().map(|e| e == "toml").unwrap_or(false) {
                files.push(file_path);
            }
        }
        files.sort();

        for file_path in files {
            self.load_file(&file_path)?;
        }
        Ok(())
    }

    /// Load definitions from a TOML file
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let content = fs::read_to_string(path.as_ref())?;
        log::debug!("Loading definitions from {}", path.as_ref().display());
        self.load_string(&content)
    }

    /// Load definitions from a TOML string. Each alias may refer to aliases
    /// defined before it.
    pub fn load_string(&mut self, content: &str) -> Result<()> {
        let file: AliasFile = toml::from_str(content)?;

        for (name, node) in file.alias {
            let data_type = self.registry.type_from_toml(&node)?;
            if self.registry.replace_alias(name.as_str(), data_type).is_some() {
                log::debug!("Overriding type {}", name);
            }
        }
        Ok(())
    }

    /// Get a named type
    pub fn get_type(&self, name: &str) -> Option<Arc<dyn DataType>> {
        self.registry.alias(name)
    }

    /// Resolve an alias name or a bare type token such as `INT32`
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn DataType>> {
        self.registry
            .build_type(&DataSection::with_value(name, name))
    }

    /// List all alias names
    pub fn type_names(&self) -> Vec<&str> {
        self.registry.alias_names().collect()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Fingerprint of every named type, independent of load order
    pub fn digest(&self) -> Digest {
        let mut md5 = Md5::new();
        for (name, data_type) in self.registry.aliases() {
            md5.append_str(name);
            md5.append(&[0]);
            data_type.add_to_md5(&mut md5);
        }
        md5.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    const DEFS: &str = r#"
[alias]
Health = { type = "UINT8", default = 100 }
Name = "STRING"

[alias.Point]
type = "FIXED_DICT"
properties = { x = "INT32", y = "Name" }
"#;

    #[test]
    fn test_load_string() {
        let mut schema = SchemaRegistry::new();
        schema.load_string(DEFS).unwrap();

        assert_eq!(schema.type_names(), vec!["Health", "Name", "Point"]);
        let health = schema.get_type("Health").unwrap();
        assert_eq!(health.default_value(), Value::UInt(100));

        let point = schema.get_type("Point").unwrap();
        assert_eq!(point.type_name(), "FIXED_DICT props x:(INT32) y:(STRING)");
    }

    #[test]
    fn test_resolve_token_or_alias() {
        let mut schema = SchemaRegistry::new();
        schema.load_string(DEFS).unwrap();
        assert_eq!(schema.resolve("Name").unwrap().meta_name(), "STRING");
        assert_eq!(schema.resolve("INT64").unwrap().meta_name(), "INT64");
        assert!(schema.resolve("Missing").is_err());
    }

    #[test]
    fn test_later_definition_overrides() {
        let mut schema = SchemaRegistry::new();
        schema.load_string(DEFS).unwrap();
        let before = schema.digest();

        schema.load_string("[alias]\nName = \"UNICODE_STRING\"\n").unwrap();
        assert_eq!(schema.get_type("Name").unwrap().meta_name(), "UNICODE_STRING");
        assert_ne!(schema.digest(), before);
    }

    #[test]
    fn test_digest_independent_of_load_order() {
        let mut a = SchemaRegistry::new();
        a.load_string("[alias]\nA = \"INT8\"\nB = \"FLOAT\"\n").unwrap();
        let mut b = SchemaRegistry::new();
        b.load_string("[alias]\nB = \"FLOAT32\"\nA = \"INT8\"\n").unwrap();
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn test_bad_definition_rejected() {
        let mut schema = SchemaRegistry::new();
        let result = schema.load_string("[alias]\nBad = { type = \"ARRAY\" }\n");
        assert!(result.is_err());
        assert!(schema.get_type("Bad").is_none());
    }
}
