// src/parse/builtin.rs

//! Built-in snapshot parsers for structured document formats.
//!
//! Each parser reads the file in full, deserialises it into a generic value
//! and normalises the result through [`ParsedOutput::from_value`], so a file
//! holding an array of mappings yields one record per element.

use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::parse::contract::{ParsedOutput, ParserArgs, SnapshotParser};

/// JSON document parser.
pub struct JsonParser;

impl SnapshotParser for JsonParser {
    fn parse_file(&self, path: &Path, _args: &ParserArgs) -> anyhow::Result<ParsedOutput> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading JSON file {:?}", path))?;
        let value: serde_json::Value = serde_json::from_str(&contents)
            .with_context(|| format!("parsing JSON from {:?}", path))?;
        ParsedOutput::from_value(value)
    }
}

/// TOML document parser.
pub struct TomlParser;

impl SnapshotParser for TomlParser {
    fn parse_file(&self, path: &Path, _args: &ParserArgs) -> anyhow::Result<ParsedOutput> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading TOML file {:?}", path))?;
        let value: toml::Value = toml::from_str(&contents)
            .with_context(|| format!("parsing TOML from {:?}", path))?;
        ParsedOutput::from_value(serde_json::to_value(value)?)
    }
}

/// YAML document parser.
pub struct YamlParser;

impl SnapshotParser for YamlParser {
    fn parse_file(&self, path: &Path, _args: &ParserArgs) -> anyhow::Result<ParsedOutput> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading YAML file {:?}", path))?;
        let value: serde_yaml::Value = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing YAML from {:?}", path))?;
        ParsedOutput::from_value(
            serde_json::to_value(value)
                .with_context(|| format!("YAML document in {:?} has non-string keys", path))?,
        )
    }
}
