//! Shared, version-pinned protocol identifiers.
//!
//! These constants are the single source of truth for schema/version strings that
//! appear in machine-readable I/O, plus the names the generated code binds to in
//! the runtime codec library.

pub const FASTGEN_MANIFEST_SCHEMA_VERSION: &str = "fastgen.manifest@0.1.0";
pub const FASTGEN_METADATA_SCHEMA_VERSION: &str = "fastgen.metadata@0.1.0";

/// C++ namespace of the runtime codec library the emitted metadata links against.
pub const RUNTIME_NAMESPACE: &str = "mfast";

/// File extension of the metadata (instruction table) artifact.
pub const SOURCE_EXTENSION: &str = "cpp";
/// File extension of the accessor scaffolding artifact.
pub const INLINE_EXTENSION: &str = "inl";
/// File extension of the declaration header the generated sources include.
pub const HEADER_EXTENSION: &str = "h";
/// Suffix of the optional JSON metadata report.
pub const METADATA_EXTENSION: &str = "metadata.json";
