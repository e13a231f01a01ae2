//! Depth-first traversal over a schema document.
//!
//! Containers get an enter/exit pair; leaves get a single visit. Exit is always
//! called, even when enter chose [`Descend::Skip`]. Field indices are positions
//! among direct siblings and `num_fields` is the size of the container's own
//! field list, whether or not its children were visited.

use crate::error::Result;
use crate::schema::{
    Attributes, ByteVectorField, Composite, DecimalField, Document, Field, FieldKind,
    IntegerField, Sequence, StringField, Template, TemplateRef,
};

/// Inherited naming context of a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeContext {
    pub ns: String,
    pub template_ns: String,
    pub dictionary: String,
}

impl NodeContext {
    pub fn root(doc: &Document) -> Self {
        NodeContext::default().inherit(&doc.attrs)
    }

    /// Context of a child carrying `attrs`: its own attribute wins, else the parent's value.
    pub fn inherit(&self, attrs: &Attributes) -> Self {
        NodeContext {
            ns: attrs.get_or("ns", &self.ns).to_string(),
            template_ns: attrs.get_or("templateNs", &self.template_ns).to_string(),
            dictionary: attrs.get_or("dictionary", &self.dictionary).to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Descend {
    Children,
    Skip,
}

#[allow(unused_variables)]
pub trait SchemaPass {
    fn enter_document(&mut self, doc: &Document, cx: &NodeContext) -> Result<()> {
        Ok(())
    }

    fn exit_document(&mut self, doc: &Document, cx: &NodeContext) -> Result<()> {
        Ok(())
    }

    fn enter_template(&mut self, t: &Template, cx: &NodeContext, index: usize) -> Result<Descend>;

    fn exit_template(
        &mut self,
        t: &Template,
        cx: &NodeContext,
        num_fields: usize,
        index: usize,
    ) -> Result<()>;

    fn enter_group(
        &mut self,
        field: &Field,
        group: &Composite,
        cx: &NodeContext,
        index: usize,
    ) -> Result<Descend>;

    fn exit_group(
        &mut self,
        field: &Field,
        group: &Composite,
        cx: &NodeContext,
        num_fields: usize,
        index: usize,
    ) -> Result<()>;

    fn enter_sequence(
        &mut self,
        field: &Field,
        seq: &Sequence,
        cx: &NodeContext,
        index: usize,
    ) -> Result<Descend>;

    fn exit_sequence(
        &mut self,
        field: &Field,
        seq: &Sequence,
        cx: &NodeContext,
        num_fields: usize,
        index: usize,
    ) -> Result<()>;

    fn visit_string(
        &mut self,
        field: &Field,
        s: &StringField,
        cx: &NodeContext,
        index: usize,
    ) -> Result<()>;

    fn visit_integer(
        &mut self,
        field: &Field,
        i: &IntegerField,
        cx: &NodeContext,
        index: usize,
    ) -> Result<()>;

    fn visit_decimal(
        &mut self,
        field: &Field,
        d: &DecimalField,
        cx: &NodeContext,
        index: usize,
    ) -> Result<()>;

    fn visit_byte_vector(
        &mut self,
        field: &Field,
        b: &ByteVectorField,
        cx: &NodeContext,
        index: usize,
    ) -> Result<()>;

    fn visit_template_ref(
        &mut self,
        field: &Field,
        r: &TemplateRef,
        cx: &NodeContext,
        index: usize,
    ) -> Result<()>;
}

pub fn walk<P: SchemaPass + ?Sized>(doc: &Document, pass: &mut P) -> Result<()> {
    let cx = NodeContext::root(doc);
    pass.enter_document(doc, &cx)?;
    for (index, t) in doc.templates.iter().enumerate() {
        let tcx = cx.inherit(&t.attrs);
        if pass.enter_template(t, &tcx, index)? == Descend::Children {
            walk_fields(&t.fields, &tcx, pass)?;
        }
        pass.exit_template(t, &tcx, t.fields.len(), index)?;
    }
    pass.exit_document(doc, &cx)
}

fn walk_fields<P: SchemaPass + ?Sized>(
    fields: &[Field],
    cx: &NodeContext,
    pass: &mut P,
) -> Result<()> {
    for (index, field) in fields.iter().enumerate() {
        let fcx = cx.inherit(&field.attrs);
        match &field.kind {
            FieldKind::Group(g) => {
                if pass.enter_group(field, g, &fcx, index)? == Descend::Children {
                    walk_fields(&g.fields, &fcx, pass)?;
                }
                pass.exit_group(field, g, &fcx, g.fields.len(), index)?;
            }
            FieldKind::Sequence(s) => {
                if pass.enter_sequence(field, s, &fcx, index)? == Descend::Children {
                    walk_fields(&s.body.fields, &fcx, pass)?;
                }
                pass.exit_sequence(field, s, &fcx, s.body.fields.len(), index)?;
            }
            FieldKind::String(s) => pass.visit_string(field, s, &fcx, index)?,
            FieldKind::Integer(i) => pass.visit_integer(field, i, &fcx, index)?,
            FieldKind::Decimal(d) => pass.visit_decimal(field, d, &fcx, index)?,
            FieldKind::ByteVector(b) => pass.visit_byte_vector(field, b, &fcx, index)?,
            FieldKind::TemplateRef(r) => pass.visit_template_ref(field, r, &fcx, index)?,
        }
    }
    Ok(())
}
