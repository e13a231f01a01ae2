use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::schema::Document;
use crate::walk::NodeContext;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QualifiedName {
    pub ns: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(ns: impl Into<String>, name: impl Into<String>) -> Self {
        QualifiedName {
            ns: ns.into(),
            name: name.into(),
        }
    }
}

/// Which compilation unit defines each template, across every document of a run.
///
/// Entries are only ever added; a later document may reference templates of an
/// earlier one but not the other way around.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    units: BTreeMap<QualifiedName, String>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the name was already registered. The first owner is kept.
    pub fn register(&mut self, name: QualifiedName, unit: &str) -> bool {
        match self.units.get(&name) {
            Some(owner) if owner == unit => false,
            Some(owner) => {
                warn!(
                    ns = %name.ns,
                    template = %name.name,
                    owner = %owner,
                    duplicate_in = unit,
                    "template already defined by another unit; keeping the first definition"
                );
                false
            }
            None => {
                debug!(ns = %name.ns, template = %name.name, unit, "register template");
                self.units.insert(name, unit.to_string());
                true
            }
        }
    }

    /// Record every template of `doc` under `unit` before any pass runs over it.
    pub fn register_document(&mut self, unit: &str, doc: &Document) -> usize {
        let root = NodeContext::root(doc);
        doc.templates
            .iter()
            .filter(|t| {
                let cx = root.inherit(&t.attrs);
                self.register(QualifiedName::new(cx.ns, t.name.clone()), unit)
            })
            .count()
    }

    pub fn lookup(&self, name: &QualifiedName) -> Option<&str> {
        self.units.get(name).map(String::as_str)
    }

    pub fn resolve(&self, ns: &str, name: &str) -> Option<&str> {
        self.lookup(&QualifiedName::new(ns, name))
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
