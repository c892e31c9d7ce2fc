// src/parse/registry.rs

//! File-suffix dispatch for the built-in snapshot parsers.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::parse::builtin::{JsonParser, TomlParser, YamlParser};
use crate::parse::contract::SnapshotParser;

/// Maps file suffixes (without the leading dot) to built-in snapshot
/// parsers.
///
/// Snapshot workers consult the registry last in the dispatch order: an
/// explicit `file_type` override forces a lookup under that key, a custom
/// parser short-circuits the registry, and otherwise the file's own suffix
/// decides. An unknown suffix is a "no parser available" worker failure.
pub struct ParserRegistry {
    by_suffix: HashMap<&'static str, Arc<dyn SnapshotParser>>,
}

impl ParserRegistry {
    fn builtin() -> Self {
        let mut by_suffix: HashMap<&'static str, Arc<dyn SnapshotParser>> = HashMap::new();

        let json: Arc<dyn SnapshotParser> = Arc::new(JsonParser);
        let toml: Arc<dyn SnapshotParser> = Arc::new(TomlParser);
        let yaml: Arc<dyn SnapshotParser> = Arc::new(YamlParser);

        by_suffix.insert("json", Arc::clone(&json));
        by_suffix.insert("toml", Arc::clone(&toml));
        by_suffix.insert("yaml", Arc::clone(&yaml));
        by_suffix.insert("yml", yaml);

        Self { by_suffix }
    }

    /// Shared registry instance.
    pub fn shared() -> &'static ParserRegistry {
        static REGISTRY: OnceLock<ParserRegistry> = OnceLock::new();
        REGISTRY.get_or_init(ParserRegistry::builtin)
    }

    /// Look up the parser for a suffix, e.g. `"json"`.
    pub fn lookup(&self, suffix: &str) -> Option<Arc<dyn SnapshotParser>> {
        self.by_suffix.get(suffix).cloned()
    }
}
