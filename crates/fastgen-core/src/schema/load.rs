use roxmltree::Node;
use tracing::warn;

use super::{
    Attributes, ByteVectorField, Composite, DecimalField, DecimalRepr, Document, Field,
    FieldKind, FieldOperator, IntWidth, IntegerField, LengthSpec, OperatorKind, Sequence,
    StringField, Template, TemplateRef, TypeRef,
};
use crate::error::{GenError, Result};

/// Parse schema XML into the AST.
///
/// Elements and attributes are matched by local name, so `scp:reset` reads as `reset`.
pub fn parse_document(text: &str) -> Result<Document> {
    let xml = roxmltree::Document::parse(text).map_err(|e| GenError::Load {
        message: e.to_string(),
    })?;
    let root = xml.root_element();
    match root.tag_name().name() {
        "templates" => Ok(Document {
            attrs: attributes(root),
            templates: element_children(root)
                .filter(|n| {
                    let is_template = n.tag_name().name() == "template";
                    if !is_template {
                        warn!(element = n.tag_name().name(), "skipping non-template element");
                    }
                    is_template
                })
                .map(load_template)
                .collect(),
        }),
        "template" => Ok(Document {
            attrs: Attributes::default(),
            templates: vec![load_template(root)],
        }),
        other => Err(GenError::BadRoot {
            found: other.to_string(),
        }),
    }
}

fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

fn child_named<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    element_children(node).find(|n| n.tag_name().name() == name)
}

fn attributes(node: Node<'_, '_>) -> Attributes {
    node.attributes().map(|a| (a.name(), a.value())).collect()
}

fn load_template(node: Node<'_, '_>) -> Template {
    Template {
        name: node.attribute("name").unwrap_or_default().to_string(),
        attrs: attributes(node),
        type_ref: load_type_ref(node),
        fields: load_fields(node),
    }
}

fn load_type_ref(node: Node<'_, '_>) -> Option<TypeRef> {
    child_named(node, "typeRef").map(|t| TypeRef {
        name: t.attribute("name").unwrap_or_default().to_string(),
        ns: t.attribute("ns").unwrap_or_default().to_string(),
    })
}

fn load_composite(node: Node<'_, '_>) -> Composite {
    Composite {
        type_ref: load_type_ref(node),
        fields: load_fields(node),
    }
}

fn load_fields(node: Node<'_, '_>) -> Vec<Field> {
    element_children(node).filter_map(load_field).collect()
}

fn load_field(node: Node<'_, '_>) -> Option<Field> {
    let tag = node.tag_name().name();
    let kind = match tag {
        "typeRef" | "length" => return None,
        "group" => FieldKind::Group(load_composite(node)),
        "sequence" => FieldKind::Sequence(Sequence {
            length: child_named(node, "length").map(load_length),
            body: load_composite(node),
        }),
        "string" => FieldKind::String(StringField {
            operator: field_operator(node),
            length: child_named(node, "length").map(load_length),
        }),
        "decimal" => {
            let mantissa = child_named(node, "mantissa");
            let exponent = child_named(node, "exponent");
            let repr = if mantissa.is_some() || exponent.is_some() {
                DecimalRepr::Split {
                    mantissa: mantissa.and_then(field_operator),
                    exponent: exponent.and_then(field_operator),
                }
            } else {
                DecimalRepr::Single(field_operator(node))
            };
            FieldKind::Decimal(DecimalField { repr })
        }
        "byteVector" => FieldKind::ByteVector(ByteVectorField {
            operator: field_operator(node),
            length: child_named(node, "length").map(load_length),
        }),
        "templateRef" => FieldKind::TemplateRef(TemplateRef {
            name: node.attribute("name").map(str::to_string),
            ns: node.attribute("ns").map(str::to_string),
        }),
        _ => match integer_kind(tag) {
            Some((width, signed)) => FieldKind::Integer(IntegerField {
                width,
                signed,
                operator: field_operator(node),
            }),
            None => {
                if OperatorKind::from_element_name(tag).is_none() {
                    warn!(element = tag, "skipping unsupported schema element");
                }
                return None;
            }
        },
    };
    Some(Field {
        name: node.attribute("name").unwrap_or_default().to_string(),
        attrs: attributes(node),
        kind,
    })
}

fn integer_kind(tag: &str) -> Option<(IntWidth, bool)> {
    let (signed, digits) = match tag.strip_prefix("uInt") {
        Some(rest) => (false, rest),
        None => (true, tag.strip_prefix("int")?),
    };
    let width = match digits {
        "8" => IntWidth::W8,
        "16" => IntWidth::W16,
        "32" => IntWidth::W32,
        "64" => IntWidth::W64,
        _ => return None,
    };
    Some((width, signed))
}

fn load_length(node: Node<'_, '_>) -> LengthSpec {
    LengthSpec {
        attrs: attributes(node),
        operator: field_operator(node),
    }
}

fn field_operator(node: Node<'_, '_>) -> Option<FieldOperator> {
    element_children(node).find_map(|child| {
        OperatorKind::from_element_name(child.tag_name().name()).map(|kind| FieldOperator {
            kind,
            attrs: attributes(child),
        })
    })
}
