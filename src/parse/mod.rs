// src/parse/mod.rs

//! Parser contract, built-in format parsers, suffix dispatch and the value
//! extractor.

pub mod builtin;
pub mod contract;
pub mod extract;
pub mod registry;

pub use builtin::{JsonParser, TomlParser, YamlParser};
pub use contract::{
    DeltaParser, Extras, ParsedOutput, ParserArgs, Payload, RecordMeta, SnapshotParser,
};
pub use extract::flatten_payload;
pub use registry::ParserRegistry;

pub(crate) use extract::{extract_from_line, extract_mapping, Matcher};
