//! Compilation driver: one schema document in, one unit's generated sources out.
//!
//! A [`Compiler`] owns the template registry of a whole run, so documents must
//! be compiled in dependency order: a document may reference templates of any
//! document compiled before it, and of itself.

use std::path::Path;

use fastgen_contracts::FASTGEN_METADATA_SCHEMA_VERSION;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{GenError, Result};
use crate::inline_pass::InlinePass;
use crate::instructions::TemplateInstruction;
use crate::registry::TemplateRegistry;
use crate::schema::{parse_document, Document};
use crate::source_pass::SourcePass;
use crate::walk::walk;

/// Machine-readable form of a unit's instruction tables.
#[derive(Debug, Clone, Serialize)]
pub struct UnitMetadata {
    pub schema_version: &'static str,
    pub unit: String,
    pub ns: String,
    pub template_ns: String,
    pub dictionary: String,
    pub input_sha256: String,
    pub templates: Vec<TemplateInstruction>,
}

#[derive(Debug, Clone)]
pub struct CompiledUnit {
    pub unit: String,
    /// Contents of `<unit>.inl`.
    pub inline_src: String,
    /// Contents of `<unit>.cpp`.
    pub source_src: String,
    pub metadata: UnitMetadata,
}

impl CompiledUnit {
    pub fn metadata_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.metadata)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .map_err(|e| GenError::Internal(format!("serialize metadata: {e}")))
    }
}

#[derive(Debug, Default)]
pub struct Compiler {
    registry: TemplateRegistry,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Compile the file at `path`; the unit name is the file stem.
    pub fn compile_path(&mut self, path: &Path) -> Result<CompiledUnit> {
        let unit = unit_name(path)?;
        let text = std::fs::read_to_string(path).map_err(|e| GenError::Load {
            message: format!("{}: {e}", path.display()),
        })?;
        self.compile_source(&unit, &text).map_err(|e| match e {
            GenError::Load { message } => GenError::Load {
                message: format!("{}: {message}", path.display()),
            },
            other => other,
        })
    }

    pub fn compile_source(&mut self, unit: &str, text: &str) -> Result<CompiledUnit> {
        let doc = parse_document(text)?;
        self.compile_document(unit, &doc, sha256_hex(text.as_bytes()))
    }

    /// Runs the registry pre-scan, then the accessor pass, then the metadata pass.
    pub fn compile_document(
        &mut self,
        unit: &str,
        doc: &Document,
        input_sha256: String,
    ) -> Result<CompiledUnit> {
        info!(unit, templates = doc.templates.len(), "compiling schema");
        let added = self.registry.register_document(unit, doc);
        debug!(unit, added, known = self.registry.len(), "registered templates");

        let mut inline = InlinePass::new(unit, &self.registry);
        walk(doc, &mut inline)?;
        let inline_src = inline.finish();

        let mut source = SourcePass::new(unit, &mut self.registry);
        walk(doc, &mut source)?;
        let out = source.finish();

        let metadata = UnitMetadata {
            schema_version: FASTGEN_METADATA_SCHEMA_VERSION,
            unit: unit.to_string(),
            ns: doc.attrs.get_or("ns", "").to_string(),
            template_ns: doc.attrs.get_or("templateNs", "").to_string(),
            dictionary: doc.attrs.get_or("dictionary", "").to_string(),
            input_sha256,
            templates: out.templates,
        };
        Ok(CompiledUnit {
            unit: unit.to_string(),
            inline_src,
            source_src: out.text,
            metadata,
        })
    }
}

pub fn unit_name(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| GenError::Load {
            message: format!("{}: cannot derive a unit name", path.display()),
        })
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    h.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_name_is_file_stem() {
        assert_eq!(unit_name(Path::new("/a/b/quotes.xml")).expect("stem"), "quotes");
        assert_eq!(unit_name(Path::new("md.v2.xml")).expect("stem"), "md.v2");
        assert!(unit_name(Path::new("/")).is_err());
    }

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn metadata_report_is_json() {
        let mut c = Compiler::new();
        let unit = c
            .compile_source(
                "u",
                r#"<templates ns="n"><template name="T" id="1"><int32 name="x"/></template></templates>"#,
            )
            .expect("compile");
        let v: serde_json::Value =
            serde_json::from_str(&unit.metadata_json().expect("json")).expect("parse");
        assert_eq!(v["schema_version"], FASTGEN_METADATA_SCHEMA_VERSION);
        assert_eq!(v["ns"], "n");
        assert_eq!(v["templates"][0]["name"], "T");
        assert_eq!(v["templates"][0]["fields"][0]["payload"]["kind"], "integer");
        assert_eq!(v["input_sha256"].as_str().map(str::len), Some(64));
    }

    #[test]
    fn load_failure_names_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.xml");
        std::fs::write(&path, "<templates>").expect("write");
        let err = Compiler::new().compile_path(&path).expect_err("broken");
        assert!(err.is_load_error());
        assert!(err.to_string().contains("broken.xml"), "{err}");
    }
}
