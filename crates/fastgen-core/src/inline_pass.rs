//! Accessor pass: emits the inline constructor and accessor definitions of a
//! unit (`<unit>.inl`), which the generated header includes.
//!
//! Declarations live in the header as nested view types (`Quote_cref`,
//! `Quote_cref::Legs_element_cref`, ...); this pass defines them out of line,
//! so every definition is qualified by the current [`ScopeStack`].

use fastgen_contracts::RUNTIME_NAMESPACE as RT;
use tracing::debug;

use crate::emit::CppWriter;
use crate::error::{GenError, Result};
use crate::registry::TemplateRegistry;
use crate::schema::{
    ByteVectorField, Composite, DecimalField, Document, Field, IntegerField, Sequence,
    StringField, Template, TemplateRef,
};
use crate::scope::ScopeStack;
use crate::walk::{Descend, NodeContext, SchemaPass};

pub struct InlinePass<'r> {
    unit: String,
    registry: &'r TemplateRegistry,
    w: CppWriter,
    scope: ScopeStack,
}

impl<'r> InlinePass<'r> {
    pub fn new(unit: &str, registry: &'r TemplateRegistry) -> Self {
        InlinePass {
            unit: unit.to_string(),
            registry,
            w: CppWriter::default(),
            scope: ScopeStack::default(),
        }
    }

    pub fn finish(self) -> String {
        self.w.finish()
    }

    /// One out-of-line definition: `inline <ret>\n<qualified>(<params>) <suffix>` and a body.
    fn function(&mut self, ret: &str, qualified: &str, suffix: &str, body: &[String]) {
        self.w.blank();
        self.w.line(&format!("inline {ret}"));
        self.w.line(&format!("{qualified}(){suffix}"));
        self.w.open_block();
        self.w.lines(body);
        self.w.close_block();
    }

    /// A constructor definition with its parameter lines and initializer.
    fn constructor(&mut self, qualified: &str, params: &[String], init: &str, body: &[String]) {
        self.w.blank();
        self.w.line("inline");
        self.w.line(&format!("{qualified}("));
        self.w.lines(params);
        self.w.line(&format!("  : {init}"));
        self.w.open_block();
        self.w.lines(body);
        self.w.close_block();
    }

    /// `get_<name>` returning `cref_ty` and `set_<name>` returning `mref_ty`.
    fn accessor_pair(
        &mut self,
        name: &str,
        cref_ty: &str,
        mref_ty: &str,
        cref_expr: &str,
        mref_expr: Option<&str>,
    ) {
        let cref_scope = self.scope.cref();
        let mref_scope = self.scope.mref();
        self.function(
            cref_ty,
            &format!("{cref_scope}get_{name}"),
            " const",
            &[format!("return {cref_expr};")],
        );
        if let Some(mref_expr) = mref_expr {
            self.function(
                mref_ty,
                &format!("{mref_scope}set_{name}"),
                " const",
                &[format!("return {mref_expr};")],
            );
        }
    }

    /// Accessors of a field whose view type is nested under the current scope.
    fn nested_accessors(&mut self, name: &str, index: usize, indirect: bool) {
        let cref_ty = format!("{}{name}_cref", self.scope.cref());
        let mref_ty = format!("{}{name}_mref", self.scope.mref());
        let (cref_expr, mref_expr) = if indirect {
            (
                format!("static_cast<{cref_ty}>( {RT}::aggregate_cref((*this)[{index}])[0] )"),
                format!("static_cast<{mref_ty}>( {RT}::aggregate_mref((*this)[{index}])[0] )"),
            )
        } else {
            (
                format!("static_cast<{cref_ty}>((*this)[{index}])"),
                format!("static_cast<{mref_ty}>((*this)[{index}])"),
            )
        };
        self.accessor_pair(name, &cref_ty, &mref_ty, &cref_expr, Some(mref_expr.as_str()));
    }

    fn simple_value(&mut self, field: &Field, cpp_type: &str, index: usize) {
        let cref_ty = format!("{RT}::{cpp_type}_cref");
        let mref_ty = format!("{RT}::{cpp_type}_mref");
        let cref_expr = format!("static_cast<{cref_ty}>((*this)[{index}])");
        let mref_expr = format!("static_cast<{mref_ty}>((*this)[{index}])");
        let setter = (!field.is_mandatory_constant()).then_some(mref_expr.as_str());
        self.accessor_pair(&field.name, &cref_ty, &mref_ty, &cref_expr, setter);
    }

    /// C++ type of a statically referenced template. A reference the registry
    /// does not know keeps its bare name; the metadata pass reports it.
    fn template_type_name(&self, name: &str, r: &TemplateRef, cx: &NodeContext) -> String {
        let ns = r.ns.as_deref().unwrap_or(&cx.ns);
        match self.registry.resolve(ns, name) {
            Some(unit) if unit != self.unit => format!("{unit}::{name}"),
            Some(_) => name.to_string(),
            None => {
                debug!(template = name, ns, "templateRef not registered yet, using bare name");
                name.to_string()
            }
        }
    }

    fn template_constructors(&mut self, name: &str) {
        let storage_of =
            format!("{RT}::detail::field_storage_helper::storage_ptr_of(other)->of_group.content_");
        self.constructor(
            &format!("{name}_cref::{name}_cref"),
            &[
                format!("  const {RT}::value_storage* storage_array,"),
                "  instruction_cptr            instruction)".to_string(),
            ],
            &format!("{RT}::aggregate_cref(storage_array, instruction)"),
            &[],
        );
        self.constructor(
            &format!("{name}_cref::{name}_cref"),
            &[format!("  const {RT}::field_cref& other)")],
            &format!(
                "{RT}::aggregate_cref({storage_of}, static_cast<instruction_cptr>(other.instruction()))"
            ),
            &[],
        );
        self.constructor(
            &format!("{name}_mref::{name}_mref"),
            &[
                format!("  {RT}::allocator*     alloc,"),
                format!("  {RT}::value_storage* storage_array,"),
                "  instruction_cptr      instruction)".to_string(),
            ],
            &format!("{name}_mref_base(alloc, storage_array, instruction)"),
            &[],
        );
        self.constructor(
            &format!("{name}_mref::{name}_mref"),
            &[format!("  const {RT}::field_mref_base& other)")],
            &format!(
                "{name}_mref_base(other.allocator(), {storage_of}, static_cast<instruction_cptr>(other.instruction()))"
            ),
            &[],
        );
        self.constructor(
            &format!("{name}::{name}"),
            &[format!("  {RT}::allocator* alloc)")],
            &format!("{RT}::message_type(alloc, instruction(), this->data())"),
            &[],
        );
        self.constructor(
            &format!("{name}::{name}"),
            &[
                format!("  const {name}_cref& other,"),
                format!("  {RT}::allocator* alloc)"),
            ],
            &format!("{RT}::message_type(alloc, instruction())"),
            &[
                "this->instruction()->copy_construct_value(my_storage_, this->data(), alloc, other.field_storage(0));"
                    .to_string(),
            ],
        );
        for (ret, method, suffix, alloc) in [
            ("cref_type", "ref", " const", ""),
            ("cref_type", "cref", " const", ""),
            ("mref_type", "ref", "", "alloc_, "),
            ("mref_type", "mref", "", "alloc_, "),
        ] {
            self.function(
                &format!("{name}::{ret}"),
                &format!("{name}::{method}"),
                suffix,
                &[format!(
                    "return {name}::{ret}({alloc}my_storage_.of_group.content_, instruction());"
                )],
            );
        }
    }

    fn group_constructors(&mut self, name: &str) {
        let cref = format!("{}{name}_cref", self.scope.cref());
        let mref = format!("{}{name}_mref", self.scope.mref());
        self.constructor(
            &format!("{cref}::{name}_cref"),
            &[
                format!("  const {RT}::value_storage*   storage,"),
                format!("  {cref}::instruction_cptr instruction)"),
            ],
            &format!("{RT}::group_cref(storage, instruction)"),
            &[],
        );
        self.constructor(
            &format!("{cref}::{name}_cref"),
            &[format!("  const {RT}::field_cref& other)")],
            &format!("{RT}::group_cref(other)"),
            &[],
        );
        self.constructor(
            &format!("{mref}::{name}_mref"),
            &[
                format!("  {RT}::allocator*      alloc,"),
                format!("  {RT}::value_storage*  storage,"),
                format!("  {mref}::instruction_cptr instruction)"),
            ],
            &format!("{mref}_base(alloc, storage, instruction)"),
            &[],
        );
        self.constructor(
            &format!("{mref}::{name}_mref"),
            &[format!("  const {RT}::field_mref_base& other)")],
            &format!("{mref}_base(other)"),
            &[],
        );
    }

    fn element_constructors(&mut self, name: &str) {
        let cref = format!("{}{name}_element_cref", self.scope.cref());
        let mref = format!("{}{name}_element_mref", self.scope.mref());
        self.constructor(
            &format!("{cref}::{name}_element_cref"),
            &[
                format!("  const {RT}::value_storage*   storage,"),
                format!("  {cref}::instruction_cptr instruction)"),
            ],
            &format!("{cref}_base(storage, instruction)"),
            &[],
        );
        self.constructor(
            &format!("{mref}::{name}_element_mref"),
            &[
                format!("  {RT}::allocator*       alloc,"),
                format!("  {RT}::value_storage*   storage,"),
                format!("  {mref}::instruction_cptr instruction)"),
            ],
            &format!("{mref}_base(alloc, storage, instruction)"),
            &[],
        );
    }
}

impl SchemaPass for InlinePass<'_> {
    fn enter_document(&mut self, _doc: &Document, _cx: &NodeContext) -> Result<()> {
        self.w.line(&format!("namespace {}", self.unit));
        self.w.line("{");
        Ok(())
    }

    fn exit_document(&mut self, _doc: &Document, _cx: &NodeContext) -> Result<()> {
        if !self.scope.is_empty() {
            return Err(GenError::Internal(format!(
                "accessor scope still {} deep at end of unit {}",
                self.scope.depth(),
                self.unit
            )));
        }
        self.w.blank();
        self.w.line("}");
        Ok(())
    }

    fn enter_template(
        &mut self,
        t: &Template,
        _cx: &NodeContext,
        _index: usize,
    ) -> Result<Descend> {
        self.template_constructors(&t.name);
        self.scope.push(&t.name);
        Ok(Descend::Children)
    }

    fn exit_template(
        &mut self,
        t: &Template,
        _cx: &NodeContext,
        _num_fields: usize,
        _index: usize,
    ) -> Result<()> {
        self.scope.pop(&t.name)
    }

    fn enter_group(
        &mut self,
        field: &Field,
        group: &Composite,
        _cx: &NodeContext,
        index: usize,
    ) -> Result<Descend> {
        match group.sole_template_ref() {
            Some(r) => {
                // A group holding one dynamic reference stores it one level down.
                self.nested_accessors(&field.name, index, r.name.is_none());
                Ok(Descend::Skip)
            }
            None => {
                self.nested_accessors(&field.name, index, false);
                self.group_constructors(&field.name);
                self.scope.push(&field.name);
                Ok(Descend::Children)
            }
        }
    }

    fn exit_group(
        &mut self,
        field: &Field,
        group: &Composite,
        _cx: &NodeContext,
        _num_fields: usize,
        _index: usize,
    ) -> Result<()> {
        if group.sole_template_ref().is_none() {
            self.scope.pop(&field.name)?;
        }
        Ok(())
    }

    fn enter_sequence(
        &mut self,
        field: &Field,
        seq: &Sequence,
        _cx: &NodeContext,
        index: usize,
    ) -> Result<Descend> {
        self.nested_accessors(&field.name, index, false);
        if seq.body.sole_template_ref().is_some() {
            return Ok(Descend::Skip);
        }
        self.element_constructors(&field.name);
        self.scope.push(&format!("{}_element", field.name));
        Ok(Descend::Children)
    }

    fn exit_sequence(
        &mut self,
        field: &Field,
        seq: &Sequence,
        _cx: &NodeContext,
        _num_fields: usize,
        _index: usize,
    ) -> Result<()> {
        if seq.body.sole_template_ref().is_none() {
            self.scope.pop(&format!("{}_element", field.name))?;
        }
        Ok(())
    }

    fn visit_string(
        &mut self,
        field: &Field,
        _s: &StringField,
        _cx: &NodeContext,
        index: usize,
    ) -> Result<()> {
        let cpp_type = match field.attrs.get("charset") {
            Some("unicode") => "unicode_string",
            _ => "ascii_string",
        };
        self.simple_value(field, cpp_type, index);
        Ok(())
    }

    fn visit_integer(
        &mut self,
        field: &Field,
        i: &IntegerField,
        _cx: &NodeContext,
        index: usize,
    ) -> Result<()> {
        self.simple_value(field, &i.type_stem(), index);
        Ok(())
    }

    fn visit_decimal(
        &mut self,
        field: &Field,
        _d: &DecimalField,
        _cx: &NodeContext,
        index: usize,
    ) -> Result<()> {
        self.simple_value(field, "decimal", index);
        Ok(())
    }

    fn visit_byte_vector(
        &mut self,
        field: &Field,
        _b: &ByteVectorField,
        _cx: &NodeContext,
        index: usize,
    ) -> Result<()> {
        self.simple_value(field, "byte_vector", index);
        Ok(())
    }

    fn visit_template_ref(
        &mut self,
        _field: &Field,
        r: &TemplateRef,
        cx: &NodeContext,
        index: usize,
    ) -> Result<()> {
        match &r.name {
            Some(name) => {
                let ty = self.template_type_name(name, r, cx);
                let cref_ty = format!("{ty}_cref");
                let mref_ty = format!("{ty}_mref");
                self.accessor_pair(
                    name,
                    &cref_ty,
                    &mref_ty,
                    &format!("static_cast<{cref_ty}>((*this)[{index}])"),
                    Some(format!("static_cast<{mref_ty}>((*this)[{index}])").as_str()),
                );
            }
            None => {
                let cref_ty = format!("{RT}::nested_message_cref");
                let mref_ty = format!("{RT}::nested_message_mref");
                self.accessor_pair(
                    &format!("nested_message{index}"),
                    &cref_ty,
                    &mref_ty,
                    &format!("{cref_ty}((*this)[{index}])"),
                    Some(format!("{mref_ty}((*this)[{index}])").as_str()),
                );
            }
        }
        Ok(())
    }
}
