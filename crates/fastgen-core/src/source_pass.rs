//! Metadata pass: emits the static instruction tables of a unit (`<unit>.cpp`).
//!
//! Every field becomes a `static` instruction object named after its path
//! (`Template__Group__field_instruction`). Containers collect the symbols of
//! their direct children in a frame and emit a subinstruction array when they
//! exit, so children always precede the parent that points at them. Each
//! template's statics live inside the body of its `instruction()` accessor.
//!
//! Alongside the text the pass builds the same tables as
//! [`TemplateInstruction`] records.

use fastgen_contracts::{HEADER_EXTENSION, RUNTIME_NAMESPACE as RT};
use tracing::{debug, warn};

use crate::byte_vector::escape_bytes;
use crate::emit::{quoted, CppWriter};
use crate::error::{GenError, Result};
use crate::frames::FrameStack;
use crate::instructions::{
    derive_byte_vector, derive_decimal, derive_integer, derive_sequence_length, derive_string,
    field_instruction, parse_id, template_reset, Charset, FieldInstruction, FieldOp, IntValue,
    LengthField, Payload, ResolvedRef, Subinstructions, TemplateInstruction, TypeRefInfo,
};
use crate::registry::{QualifiedName, TemplateRegistry};
use crate::schema::{
    ByteVectorField, Composite, DecimalField, Document, Field, IntegerField, Presence, Sequence,
    StringField, Template, TemplateRef, TypeRef,
};
use crate::scope::SymbolPath;
use crate::walk::{Descend, NodeContext, SchemaPass};

#[derive(Debug)]
pub struct SourceOutput {
    pub text: String,
    pub templates: Vec<TemplateInstruction>,
}

pub struct SourcePass<'r> {
    unit: String,
    registry: &'r mut TemplateRegistry,
    w: CppWriter,
    symbols: SymbolPath,
    frames: FrameStack,
    templates: Vec<TemplateInstruction>,
}

impl<'r> SourcePass<'r> {
    pub fn new(unit: &str, registry: &'r mut TemplateRegistry) -> Self {
        SourcePass {
            unit: unit.to_string(),
            registry,
            w: CppWriter::default(),
            symbols: SymbolPath::default(),
            frames: FrameStack::default(),
            templates: Vec::new(),
        }
    }

    pub fn finish(self) -> SourceOutput {
        SourceOutput {
            text: self.w.finish(),
            templates: self.templates,
        }
    }

    /// Static references are fatal when the registry has no entry.
    fn resolve(&self, r: &TemplateRef, cx: &NodeContext) -> Result<Option<ResolvedRef>> {
        let Some(name) = &r.name else {
            return Ok(None);
        };
        let ns = r.ns.as_deref().unwrap_or(&cx.ns);
        match self.registry.resolve(ns, name) {
            Some(unit) => Ok(Some(ResolvedRef {
                name: name.clone(),
                ns: ns.to_string(),
                unit: unit.to_string(),
            })),
            None => Err(GenError::UnresolvedTemplateRef {
                name: name.clone(),
                ns: ns.to_string(),
            }),
        }
    }

    fn subinstruction_array(&mut self, array: &str, symbols: &[String]) {
        if symbols.is_empty() {
            self.w.line(&format!("const static field_instruction** {array} = 0;"));
            return;
        }
        self.w.line(&format!("const static field_instruction* {array}[] = {{"));
        for s in symbols {
            self.w.line(&format!("  &{s},"));
        }
        self.w.line("};");
        self.w.blank();
    }

    /// Emits the operator context of `op`, returning the argument that refers to it.
    fn op_context(&mut self, stem: &str, op: &FieldOp) -> String {
        let Some(c) = &op.context else {
            return "0".to_string();
        };
        let sym = self.symbols.symbol(&format!("{stem}_opContext"));
        self.w.line(&format!("const static op_context_t {sym} = {{"));
        self.w.line(&format!("  {},", quoted(&c.key)));
        self.w.line(&format!("  {},", quoted(&c.ns)));
        self.w.line(&format!("  {}}};", quoted(&c.dictionary)));
        format!("&{sym}")
    }

    /// The leading constructor arguments common to every field instruction.
    fn header_args(rec: &FieldInstruction, op: Option<&FieldOp>) -> Vec<String> {
        let mut args = vec![format!("  {},", rec.field_index)];
        if let Some(op) = op {
            args.push(format!("  operator_{},", op.kind.as_str()));
        }
        args.push(format!("  presence_{},", rec.presence.as_str()));
        args.push(format!("  {}, // id", rec.id));
        args.push(format!("  {}, // name", quoted(&rec.name)));
        args.push(format!("  {}, // ns", quoted(&rec.ns)));
        args
    }

    fn type_ref_args(type_ref: Option<&TypeRef>) -> [String; 2] {
        let (name, ns) = type_ref
            .map(|t| (t.name.as_str(), t.ns.as_str()))
            .unwrap_or(("", ""));
        [
            format!("  {}, // typeRef name", quoted(name)),
            format!("  {}); // typeRef ns", quoted(ns)),
        ]
    }

    fn length_args(length: Option<&LengthField>) -> [String; 3] {
        match length {
            Some(l) => [
                format!("  {}, // length id", l.id),
                format!("  {}, // length name", quoted(&l.name)),
                format!("  {}); // length ns", quoted(&l.ns)),
            ],
            None => [
                "  0, // length id".to_string(),
                "  \"\", // length name".to_string(),
                "  \"\"); // length ns".to_string(),
            ],
        }
    }

    fn declare(&mut self, decl: &str, sym: &str, args: Vec<String>) {
        self.w.line(decl);
        self.w.line(&format!("{sym}("));
        self.w.lines(args);
        self.w.blank();
    }

    /// Closes a group or sequence body. Returns the subinstruction description
    /// and the two constructor arguments that point at it.
    fn close_body(
        &mut self,
        body: &Composite,
        cx: &NodeContext,
        slot_presence: Presence,
        num_fields: usize,
    ) -> Result<(Subinstructions, [String; 2])> {
        match body.sole_template_ref() {
            None => {
                let frame = self.frames.close()?;
                if frame.len() != num_fields {
                    return Err(GenError::Internal(format!(
                        "{} subinstructions collected for {num_fields} fields",
                        frame.len()
                    )));
                }
                let array = self.symbols.symbol("subinstructions");
                self.subinstruction_array(&array, &frame.symbols);
                self.symbols.pop()?;
                Ok((
                    Subinstructions::Owned {
                        fields: frame.fields,
                    },
                    [format!("  {array},"), format!("  {num_fields}, // num_fields")],
                ))
            }
            Some(r) => {
                self.symbols.pop()?;
                match self.resolve(r, cx)? {
                    Some(target) => {
                        let ty = target.type_name(&self.unit);
                        Ok((
                            Subinstructions::Borrowed { target },
                            [
                                format!("  {ty}::instruction()->subinstructions(),"),
                                format!("  {ty}::instruction()->subinstructions_count(),"),
                            ],
                        ))
                    }
                    None => Ok((
                        Subinstructions::DynamicSlot {
                            presence: slot_presence,
                        },
                        [
                            format!(
                                "  {RT}::templateref_instruction::default_instructions(presence_{}),",
                                slot_presence.as_str()
                            ),
                            "  1, // num_fields".to_string(),
                        ],
                    )),
                }
            }
        }
    }

    fn open_body(&mut self, body: &Composite) -> Descend {
        if body.sole_template_ref().is_none() {
            self.frames.open();
            Descend::Children
        } else {
            Descend::Skip
        }
    }

    fn leaf(&mut self, decl: &str, rec: FieldInstruction, args: Vec<String>) -> Result<()> {
        let sym = self.symbols.symbol(&format!("{}_instruction", rec.name));
        self.declare(decl, &sym, args);
        self.frames.append(sym, rec)
    }
}

fn int_literal(v: IntValue, bits: u32) -> String {
    let ll = if bits == 64 { "LL" } else { "" };
    match v {
        IntValue::Signed(v) => format!("{v}{ll}"),
        IntValue::Unsigned(v) => format!("{v}U{ll}"),
    }
}

impl SchemaPass for SourcePass<'_> {
    fn enter_document(&mut self, _doc: &Document, _cx: &NodeContext) -> Result<()> {
        self.w.line(&format!("#include \"{}.{HEADER_EXTENSION}\"", self.unit));
        self.w.blank();
        self.w.line(&format!("using namespace {RT};"));
        self.w.blank();
        self.w.line(&format!("namespace {}", self.unit));
        self.w.line("{");
        self.w.blank();
        Ok(())
    }

    fn exit_document(&mut self, doc: &Document, _cx: &NodeContext) -> Result<()> {
        if !self.frames.is_empty() || !self.symbols.is_empty() {
            return Err(GenError::Internal(format!(
                "unbalanced emission state at end of unit {}: {} open frames",
                self.unit,
                self.frames.depth()
            )));
        }
        if self.templates.is_empty() {
            // mFAST sizes the description from the array, so there is no null form.
            warn!(unit = %self.unit, "schema defines no templates, emitting an empty table");
        }
        self.w.line(&format!(
            "const template_instruction* {}_templates_instructions[] = {{",
            self.unit
        ));
        let names: Vec<String> = self.templates.iter().map(|t| t.name.clone()).collect();
        for name in names {
            self.w.line(&format!("  {name}::instruction(),"));
        }
        self.w.line("};");
        self.w.blank();
        self.w.line(&format!("{RT}::templates_description* description()"));
        self.w.open_block();
        self.w.line(&format!("static {RT}::templates_description desc("));
        self.w.line(&format!("  {}, // ns", quoted(doc.attrs.get_or("ns", ""))));
        self.w.line(&format!("  {}, // templateNs", quoted(doc.attrs.get_or("templateNs", ""))));
        self.w.line(&format!("  {}, // dictionary", quoted(doc.attrs.get_or("dictionary", ""))));
        self.w.line(&format!("  {}_templates_instructions);", self.unit));
        self.w.line("return &desc;");
        self.w.close_block();
        self.w.blank();
        self.w.line("}");
        Ok(())
    }

    fn enter_template(&mut self, t: &Template, cx: &NodeContext, _index: usize) -> Result<Descend> {
        self.registry
            .register(QualifiedName::new(cx.ns.clone(), t.name.clone()), &self.unit);
        self.symbols.push(&t.name);
        self.frames.open();
        self.w.line(&format!("const {}::instruction_type*", t.name));
        self.w.line(&format!("{}::instruction()", t.name));
        self.w.open_block();
        Ok(Descend::Children)
    }

    fn exit_template(
        &mut self,
        t: &Template,
        _cx: &NodeContext,
        num_fields: usize,
        index: usize,
    ) -> Result<()> {
        let frame = self.frames.close()?;
        if frame.len() != num_fields {
            return Err(GenError::Internal(format!(
                "template {}: {} subinstructions collected for {num_fields} fields",
                t.name,
                frame.len()
            )));
        }
        let array = self.symbols.symbol("subinstructions");
        self.subinstruction_array(&array, &frame.symbols);
        self.symbols.pop()?;

        let rec = TemplateInstruction {
            index,
            id: parse_id(&t.name, &t.attrs)?,
            name: t.name.clone(),
            ns: t.attrs.get_or("ns", "").to_string(),
            template_ns: t.attrs.get_or("templateNs", "").to_string(),
            dictionary: t.attrs.get_or("dictionary", "").to_string(),
            reset: template_reset(t),
            type_ref: t.type_ref.as_ref().map(TypeRefInfo::from),
            fields: frame.fields,
        };

        self.w.line(&format!(
            "const static {}::instruction_type the_instruction(",
            t.name
        ));
        self.w.line(&format!("  {}, // id", rec.id));
        self.w.line(&format!("  {}, // name", quoted(&rec.name)));
        self.w.line(&format!("  {}, // ns", quoted(&rec.ns)));
        self.w.line(&format!("  {}, // templateNs", quoted(&rec.template_ns)));
        self.w.line(&format!("  {}, // dictionary", quoted(&rec.dictionary)));
        self.w.line(&format!("  {array},"));
        self.w.line(&format!("  {num_fields}, // num_fields"));
        self.w.line(&format!("  {}, // reset", rec.reset));
        self.w.lines(Self::type_ref_args(t.type_ref.as_ref()));
        self.w.blank();
        self.w.line("return &the_instruction;");
        self.w.close_block();
        self.w.blank();

        debug!(unit = %self.unit, template = %t.name, num_fields, "emitted template instruction");
        self.templates.push(rec);
        Ok(())
    }

    fn enter_group(
        &mut self,
        field: &Field,
        group: &Composite,
        _cx: &NodeContext,
        _index: usize,
    ) -> Result<Descend> {
        self.symbols.push(&field.name);
        Ok(self.open_body(group))
    }

    fn exit_group(
        &mut self,
        field: &Field,
        group: &Composite,
        cx: &NodeContext,
        num_fields: usize,
        index: usize,
    ) -> Result<()> {
        let (subinstructions, body_args) =
            self.close_body(group, cx, field.presence(), num_fields)?;
        let rec = field_instruction(
            field,
            index,
            Payload::Group {
                subinstructions,
                type_ref: group.type_ref.as_ref().map(TypeRefInfo::from),
            },
        )?;
        let mut args = Self::header_args(&rec, None);
        args.push(format!("  {}, // dictionary", quoted(&rec.dictionary)));
        args.extend(body_args);
        args.extend(Self::type_ref_args(group.type_ref.as_ref()));
        self.leaf(&format!("const static {RT}::group_field_instruction"), rec, args)
    }

    fn enter_sequence(
        &mut self,
        field: &Field,
        seq: &Sequence,
        _cx: &NodeContext,
        _index: usize,
    ) -> Result<Descend> {
        self.symbols.push(&field.name);
        let length = derive_sequence_length(field, seq)?;
        let Payload::Integer { op, initial, .. } = &length.payload else {
            return Err(GenError::Internal(format!(
                "sequence {} has a non-integer length",
                field.name
            )));
        };
        let context = self.op_context(&format!("{}_length", field.name), op);
        let sym = self.symbols.symbol(&format!("{}_length_instruction", field.name));
        let mut args = Self::header_args(&length, Some(op));
        args.push(format!("  {context}, // opContext"));
        args.push(format!(
            "  int_value_storage<uint32_t>({})); // initial_value",
            initial.map(|v| int_literal(v, 32)).unwrap_or_default()
        ));
        self.declare("static uint32_field_instruction", &sym, args);
        Ok(self.open_body(&seq.body))
    }

    fn exit_sequence(
        &mut self,
        field: &Field,
        seq: &Sequence,
        cx: &NodeContext,
        num_fields: usize,
        index: usize,
    ) -> Result<()> {
        let length_sym = self.symbols.symbol(&format!("{}_length_instruction", field.name));
        let length = derive_sequence_length(field, seq)?;
        let (subinstructions, body_args) =
            self.close_body(&seq.body, cx, Presence::Mandatory, num_fields)?;
        let rec = field_instruction(
            field,
            index,
            Payload::Sequence {
                length: Box::new(length),
                subinstructions,
                type_ref: seq.body.type_ref.as_ref().map(TypeRefInfo::from),
            },
        )?;
        let mut args = Self::header_args(&rec, None);
        args.push(format!("  {}, // dictionary", quoted(&rec.dictionary)));
        args.extend(body_args);
        args.push(format!("  &{length_sym}, // length"));
        args.extend(Self::type_ref_args(seq.body.type_ref.as_ref()));
        self.leaf(
            &format!("const static {RT}::sequence_field_instruction"),
            rec,
            args,
        )
    }

    fn visit_string(
        &mut self,
        field: &Field,
        s: &StringField,
        _cx: &NodeContext,
        index: usize,
    ) -> Result<()> {
        let rec = derive_string(field, s, index)?;
        let Payload::String {
            charset,
            op,
            initial,
            length,
        } = &rec.payload
        else {
            return Err(GenError::Internal(format!("string {} lost its payload", field.name)));
        };
        let context = self.op_context(&field.name, op);
        let mut args = Self::header_args(&rec, Some(op));
        args.push(format!("  {context}, // opContext"));
        let storage = match initial {
            Some(v) => format!("string_value_storage({},{})", quoted(v), v.len()),
            None => "string_value_storage()".to_string(),
        };
        let charset_name = match charset {
            Charset::Ascii => "ascii",
            Charset::Unicode => "unicode",
        };
        match charset {
            Charset::Ascii => args.push(format!("  {storage}); // initial_value")),
            Charset::Unicode => {
                args.push(format!("  {storage}, // initial_value"));
                args.extend(Self::length_args(length.as_ref()));
            }
        }
        let decl = format!("const static {charset_name}_field_instruction");
        self.leaf(&decl, rec, args)
    }

    fn visit_integer(
        &mut self,
        field: &Field,
        i: &IntegerField,
        _cx: &NodeContext,
        index: usize,
    ) -> Result<()> {
        let rec = derive_integer(field, i, index)?;
        let Payload::Integer {
            bits, op, initial, ..
        } = &rec.payload
        else {
            return Err(GenError::Internal(format!("integer {} lost its payload", field.name)));
        };
        let context = self.op_context(&field.name, op);
        let mut args = Self::header_args(&rec, Some(op));
        args.push(format!("  {context}, // opContext"));
        args.push(format!(
            "  int_value_storage<{}_t>({})); // initial_value",
            i.type_stem(),
            initial.map(|v| int_literal(v, *bits)).unwrap_or_default()
        ));
        let decl = format!("const static {}_field_instruction", i.type_stem());
        self.leaf(&decl, rec, args)
    }

    fn visit_decimal(
        &mut self,
        field: &Field,
        d: &DecimalField,
        _cx: &NodeContext,
        index: usize,
    ) -> Result<()> {
        let rec = derive_decimal(field, d, index)?;
        let args = match &rec.payload {
            Payload::Decimal { op, initial } => {
                let context = self.op_context(&field.name, op);
                let mut args = Self::header_args(&rec, Some(op));
                args.push(format!("  {context}, // opContext"));
                args.push(match initial {
                    Some(v) => format!(
                        "  decimal_value_storage({}LL, {})); // initial_value",
                        v.mantissa, v.exponent
                    ),
                    None => "  decimal_value_storage()); // initial_value".to_string(),
                });
                args
            }
            Payload::SplitDecimal {
                mantissa_op,
                mantissa_initial,
                exponent_op,
                exponent_initial,
            } => {
                let mantissa_context =
                    self.op_context(&format!("{}_mantissa", field.name), mantissa_op);
                let mantissa_sym = self
                    .symbols
                    .symbol(&format!("{}_mantissa_instruction", field.name));
                self.declare(
                    "static mantissa_field_instruction",
                    &mantissa_sym,
                    vec![
                        format!("  operator_{},", mantissa_op.kind.as_str()),
                        format!("  {mantissa_context}, // mantissa opContext"),
                        format!(
                            "  int_value_storage<int64_t>({})); // mantissa initial_value",
                            mantissa_initial
                                .map(|m| format!("{m}LL"))
                                .unwrap_or_default()
                        ),
                    ],
                );
                let exponent_context =
                    self.op_context(&format!("{}_exponent", field.name), exponent_op);
                let mut args = Self::header_args(&rec, Some(exponent_op));
                args.push(format!("  {exponent_context}, // exponent opContext"));
                args.push(format!("  &{mantissa_sym},"));
                args.push(match exponent_initial {
                    Some(e) => {
                        format!("  decimal_value_storage(0, {e})); // exponent initial_value")
                    }
                    None => "  decimal_value_storage()); // exponent initial_value".to_string(),
                });
                args
            }
            other => {
                return Err(GenError::Internal(format!(
                    "decimal {} derived as {other:?}",
                    field.name
                )))
            }
        };
        self.leaf("const static decimal_field_instruction", rec, args)
    }

    fn visit_byte_vector(
        &mut self,
        field: &Field,
        b: &ByteVectorField,
        _cx: &NodeContext,
        index: usize,
    ) -> Result<()> {
        let rec = derive_byte_vector(field, b, index)?;
        let Payload::ByteVector {
            op,
            initial,
            length,
        } = &rec.payload
        else {
            return Err(GenError::Internal(format!(
                "byte vector {} lost its payload",
                field.name
            )));
        };
        let context = self.op_context(&field.name, op);
        let mut args = Self::header_args(&rec, Some(op));
        args.push(format!("  {context}, // opContext"));
        args.push(match initial {
            Some(bytes) => format!(
                "  byte_vector_value_storage(\"{}\",{}), // initial_value",
                escape_bytes(bytes),
                bytes.len()
            ),
            None => "  byte_vector_value_storage(), // initial_value".to_string(),
        });
        args.extend(Self::length_args(length.as_ref()));
        self.leaf("const static byte_vector_field_instruction", rec, args)
    }

    fn visit_template_ref(
        &mut self,
        field: &Field,
        r: &TemplateRef,
        cx: &NodeContext,
        index: usize,
    ) -> Result<()> {
        let target = self.resolve(r, cx)?;
        let sym = self.symbols.symbol(&format!("templateref{index}_instruction"));
        let (decl, args) = match &target {
            Some(t) => (
                format!("const static {RT}::templateref_instruction"),
                vec![
                    format!("  {index},"),
                    format!("  {}::instruction());", t.type_name(&self.unit)),
                ],
            ),
            None => (
                format!("static {RT}::templateref_instruction"),
                vec![format!("  {index});")],
            ),
        };
        let rec = field_instruction(field, index, Payload::TemplateRef { target })?;
        self.declare(&decl, &sym, args);
        self.frames.append(sym, rec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{parse_document, FieldKind};
    use crate::walk::walk;

    fn emit(unit: &str, xml: &str, registry: &mut TemplateRegistry) -> Result<SourceOutput> {
        let doc = parse_document(xml)?;
        registry.register_document(unit, &doc);
        let mut pass = SourcePass::new(unit, registry);
        walk(&doc, &mut pass)?;
        Ok(pass.finish())
    }

    #[test]
    fn template_statics_and_description() {
        let mut reg = TemplateRegistry::new();
        let out = emit(
            "quotes",
            r#"<templates ns="q" templateNs="tq" dictionary="global">
                 <template name="Quote" id="7" reset="yes">
                   <string name="Symbol" id="55"><copy/></string>
                   <uInt32 name="Qty" presence="optional"><default value="10"/></uInt32>
                 </template>
               </templates>"#,
            &mut reg,
        )
        .expect("emit");
        let text = &out.text;
        assert!(text.starts_with("#include \"quotes.h\"\n\nusing namespace mfast;\n"));
        assert!(text.contains(
            "const static ascii_field_instruction\n  Quote__Symbol_instruction(\n"
        ));
        assert!(text.contains("    operator_copy,\n"));
        assert!(text.contains("int_value_storage<uint32_t>(10U)); // initial_value"));
        assert!(text.contains(
            "const static field_instruction* Quote__subinstructions[] = {\n    &Quote__Symbol_instruction,\n    &Quote__Qty_instruction,\n  };"
        ));
        assert!(text.contains(
            "const static Quote::instruction_type the_instruction(\n    7, // id\n"
        ));
        assert!(text.contains("    true, // reset\n"));
        assert!(text.contains(
            "const template_instruction* quotes_templates_instructions[] = {\n  Quote::instruction(),\n};"
        ));
        assert!(text.contains("    \"tq\", // templateNs\n"));
        assert!(text.trim_end().ends_with('}'));

        assert_eq!(out.templates.len(), 1);
        let t = &out.templates[0];
        assert!(t.reset);
        assert_eq!(t.fields.len(), 2);
        assert_eq!(t.fields[1].field_index, 1);
        assert_eq!(t.fields[1].presence, Presence::Optional);
    }

    #[test]
    fn op_context_is_declared_before_its_field() {
        let mut reg = TemplateRegistry::new();
        let out = emit(
            "u",
            r#"<templates><template name="T">
                 <int64 name="Seq"><increment key="seq" dictionary="type"/></int64>
               </template></templates>"#,
            &mut reg,
        )
        .expect("emit");
        let ctx = out
            .text
            .find("const static op_context_t T__Seq_opContext = {")
            .expect("context");
        let field = out.text.find("T__Seq_instruction(").expect("field");
        assert!(ctx < field);
        assert!(out.text.contains("    &T__Seq_opContext, // opContext\n"));
        assert!(out.text.contains("int_value_storage<int64_t>()); // initial_value"));
    }

    #[test]
    fn empty_template_uses_null_array() {
        let mut reg = TemplateRegistry::new();
        let out = emit("u", r#"<templates><template name="Empty"/></templates>"#, &mut reg)
            .expect("emit");
        assert!(out
            .text
            .contains("const static field_instruction** Empty__subinstructions = 0;"));
        assert!(out.text.contains("    0, // num_fields\n"));
    }

    #[test]
    fn group_owning_fields_nests_symbols() {
        let mut reg = TemplateRegistry::new();
        let out = emit(
            "u",
            r#"<templates><template name="T">
                 <group name="Inst" presence="optional">
                   <typeRef name="Instrument" ns="app"/>
                   <string name="Sym"/>
                 </group>
               </template></templates>"#,
            &mut reg,
        )
        .expect("emit");
        let text = &out.text;
        assert!(text.contains("T__Inst__Sym_instruction("));
        assert!(text.contains("const static field_instruction* T__Inst__subinstructions[] = {"));
        assert!(text.contains(
            "const static mfast::group_field_instruction\n  T__Inst_instruction(\n"
        ));
        assert!(text.contains("    presence_optional,\n"));
        assert!(text.contains("    \"Instrument\", // typeRef name\n    \"app\"); // typeRef ns"));
        let inner = text.find("T__Inst__subinstructions[]").expect("inner array");
        let group = text.find("T__Inst_instruction(").expect("group");
        assert!(inner < group);
    }

    #[test]
    fn sequence_declares_length_first() {
        let mut reg = TemplateRegistry::new();
        let out = emit(
            "u",
            r#"<templates><template name="T">
                 <sequence name="Legs">
                   <length name="NoLegs" id="555"><copy value="1"/></length>
                   <decimal name="Px"/>
                 </sequence>
               </template></templates>"#,
            &mut reg,
        )
        .expect("emit");
        let text = &out.text;
        let len = text
            .find("static uint32_field_instruction\n  T__Legs__Legs_length_instruction(")
            .expect("length");
        let seq = text.find("T__Legs_instruction(").expect("sequence");
        assert!(len < seq);
        assert!(text.contains("    \"NoLegs\", // name\n"));
        assert!(text.contains("int_value_storage<uint32_t>(1U)); // initial_value"));
        assert!(text.contains("    &T__Legs__Legs_length_instruction, // length\n"));
        assert!(text.contains("decimal_value_storage()); // initial_value"));
    }

    #[test]
    fn split_decimal_declares_mantissa() {
        let mut reg = TemplateRegistry::new();
        let out = emit(
            "u",
            r#"<templates><template name="T">
                 <decimal name="Px">
                   <exponent><copy value="-2"/></exponent>
                   <mantissa><delta/></mantissa>
                 </decimal>
               </template></templates>"#,
            &mut reg,
        )
        .expect("emit");
        let text = &out.text;
        assert!(text.contains(
            "static mantissa_field_instruction\n  T__Px_mantissa_instruction(\n    operator_delta,\n"
        ));
        assert!(text.contains("    operator_copy,\n"));
        assert!(text.contains("    &T__Px_mantissa_instruction,\n"));
        assert!(text.contains("decimal_value_storage(0, -2)); // exponent initial_value"));
    }

    #[test]
    fn single_decimal_initial_value_is_canonical() {
        let mut reg = TemplateRegistry::new();
        let out = emit(
            "u",
            r#"<templates><template name="T">
                 <decimal name="Px"><constant value="123.45"/></decimal>
               </template></templates>"#,
            &mut reg,
        )
        .expect("emit");
        assert!(out.text.contains("decimal_value_storage(12345LL, -2)); // initial_value"));
    }

    #[test]
    fn unresolved_static_reference_is_fatal() {
        let mut reg = TemplateRegistry::new();
        let err = emit(
            "u",
            r#"<templates><template name="T"><templateRef name="Missing"/></template></templates>"#,
            &mut reg,
        )
        .expect_err("unresolved");
        assert!(matches!(
            err,
            GenError::UnresolvedTemplateRef { ref name, .. } if name == "Missing"
        ));
    }

    #[test]
    fn open_container_at_document_end_is_internal_error() {
        let doc = parse_document(
            r#"<templates><template name="T"><group name="G"><int32 name="x"/></group></template></templates>"#,
        )
        .expect("parse");
        let mut reg = TemplateRegistry::new();
        reg.register_document("u", &doc);
        let cx = NodeContext::root(&doc);
        let t = &doc.templates[0];
        let field = &t.fields[0];
        let FieldKind::Group(group) = &field.kind else {
            panic!("expected a group");
        };

        let mut pass = SourcePass::new("u", &mut reg);
        pass.enter_document(&doc, &cx).expect("enter document");
        pass.enter_template(t, &cx, 0).expect("enter template");
        pass.enter_group(field, group, &cx, 0).expect("enter group");
        let err = pass.exit_document(&doc, &cx).expect_err("unbalanced");
        assert!(matches!(err, GenError::Internal(_)), "{err}");
        assert!(err.to_string().contains("unbalanced emission state"), "{err}");
    }

    #[test]
    fn document_without_templates_still_describes_itself() {
        let mut reg = TemplateRegistry::new();
        let out = emit("e", r#"<templates ns="n"/>"#, &mut reg).expect("emit");
        assert!(out.templates.is_empty());
        assert!(out
            .text
            .contains("const template_instruction* e_templates_instructions[] = {\n};"));
        assert!(out.text.contains("    \"n\", // ns\n"));
    }
}
