//! Naming stacks used while emitting nested declarations.
//!
//! [`ScopeStack`] yields the qualified C++ scope of the accessor view types
//! (`Outer_cref::Inner_cref::`); [`SymbolPath`] yields the flat `Outer__Inner__`
//! prefix of the static instruction symbols. Both keep whole segments, so a pop
//! removes exactly what the matching push added.

use crate::error::{GenError, Result};

#[derive(Debug, Clone, Default)]
pub struct ScopeStack {
    segments: Vec<String>,
}

impl ScopeStack {
    pub fn push(&mut self, name: &str) {
        self.segments.push(name.to_string());
    }

    /// Pop the top segment; `name` must be the one used for the matching push.
    pub fn pop(&mut self, name: &str) -> Result<()> {
        match self.segments.pop() {
            Some(top) if top == name => Ok(()),
            Some(top) => Err(GenError::Internal(format!(
                "scope pop mismatch: expected {name:?}, top is {top:?}"
            ))),
            None => Err(GenError::Internal(format!(
                "scope pop of {name:?} on an empty stack"
            ))),
        }
    }

    /// Read-view scope, e.g. `Quote_cref::Legs_element_cref::`.
    pub fn cref(&self) -> String {
        self.qualified("_cref::")
    }

    /// Write-view scope, e.g. `Quote_mref::Legs_element_mref::`.
    pub fn mref(&self) -> String {
        self.qualified("_mref::")
    }

    fn qualified(&self, suffix: &str) -> String {
        self.segments
            .iter()
            .map(|s| format!("{s}{suffix}"))
            .collect()
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SymbolPath {
    parts: Vec<String>,
}

impl SymbolPath {
    pub fn push(&mut self, name: &str) {
        self.parts.push(name.to_string());
    }

    pub fn pop(&mut self) -> Result<String> {
        self.parts
            .pop()
            .ok_or_else(|| GenError::Internal("symbol path pop on an empty path".to_string()))
    }

    /// `A__B__` for parts `[A, B]`.
    pub fn prefix(&self) -> String {
        self.parts.iter().map(|p| format!("{p}__")).collect()
    }

    /// `A__B__<name>`.
    pub fn symbol(&self, name: &str) -> String {
        format!("{}{name}", self.prefix())
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}
