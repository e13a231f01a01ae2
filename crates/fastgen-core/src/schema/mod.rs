//! Closed AST for FAST template schema documents.
//!
//! Every node kind the compiler understands is a variant of [`FieldKind`]; the
//! traversal in [`crate::walk`] matches on it exhaustively. Raw attributes are
//! kept alongside the typed shape so emission can reproduce them verbatim.

mod load;

use std::collections::BTreeMap;

use serde::Serialize;

pub use load::parse_document;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Attributes(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A `<templates>` document: `ns`, `templateNs` and `dictionary` plus its templates in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub attrs: Attributes,
    pub templates: Vec<Template>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    pub attrs: Attributes,
    pub type_ref: Option<TypeRef>,
    pub fields: Vec<Field>,
}

/// Application type binding (`<typeRef>`), carried into the metadata untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    pub name: String,
    pub ns: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Declared `name`; empty for a dynamic template reference.
    pub name: String,
    pub attrs: Attributes,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Group(Composite),
    Sequence(Sequence),
    String(StringField),
    Integer(IntegerField),
    Decimal(DecimalField),
    ByteVector(ByteVectorField),
    TemplateRef(TemplateRef),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Composite {
    pub type_ref: Option<TypeRef>,
    pub fields: Vec<Field>,
}

impl Composite {
    /// The template reference this container reduces to when it is its only field.
    pub fn sole_template_ref(&self) -> Option<&TemplateRef> {
        match self.fields.as_slice() {
            [Field {
                kind: FieldKind::TemplateRef(r),
                ..
            }] => Some(r),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sequence {
    pub length: Option<LengthSpec>,
    pub body: Composite,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringField {
    pub operator: Option<FieldOperator>,
    pub length: Option<LengthSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IntWidth {
    pub fn bits(self) -> u32 {
        match self {
            IntWidth::W8 => 8,
            IntWidth::W16 => 16,
            IntWidth::W32 => 32,
            IntWidth::W64 => 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegerField {
    pub width: IntWidth,
    pub signed: bool,
    pub operator: Option<FieldOperator>,
}

impl IntegerField {
    /// `int32`, `uint64`, ... as used in runtime type names.
    pub fn type_stem(&self) -> String {
        let sign = if self.signed { "" } else { "u" };
        format!("{sign}int{}", self.width.bits())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecimalField {
    pub repr: DecimalRepr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecimalRepr {
    /// One operator over the whole value.
    Single(Option<FieldOperator>),
    /// Independent `<mantissa>` and `<exponent>` children.
    Split {
        mantissa: Option<FieldOperator>,
        exponent: Option<FieldOperator>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteVectorField {
    pub operator: Option<FieldOperator>,
    pub length: Option<LengthSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateRef {
    /// `None` for a dynamic reference.
    pub name: Option<String>,
    pub ns: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorKind {
    None,
    Constant,
    Default,
    Copy,
    Increment,
    Delta,
    Tail,
}

impl OperatorKind {
    pub fn from_element_name(name: &str) -> Option<Self> {
        match name {
            "constant" => Some(OperatorKind::Constant),
            "default" => Some(OperatorKind::Default),
            "copy" => Some(OperatorKind::Copy),
            "increment" => Some(OperatorKind::Increment),
            "delta" => Some(OperatorKind::Delta),
            "tail" => Some(OperatorKind::Tail),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperatorKind::None => "none",
            OperatorKind::Constant => "constant",
            OperatorKind::Default => "default",
            OperatorKind::Copy => "copy",
            OperatorKind::Increment => "increment",
            OperatorKind::Delta => "delta",
            OperatorKind::Tail => "tail",
        }
    }
}

/// Operator element of a field (`<copy value=".." key=".." dictionary=".."/>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOperator {
    pub kind: OperatorKind,
    pub attrs: Attributes,
}

/// `<length>` child of a sequence, unicode string or byte vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LengthSpec {
    pub attrs: Attributes,
    pub operator: Option<FieldOperator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Mandatory,
    Optional,
}

impl Presence {
    pub fn from_attrs(attrs: &Attributes) -> Self {
        match attrs.get("presence") {
            Some("optional") => Presence::Optional,
            _ => Presence::Mandatory,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Presence::Mandatory => "mandatory",
            Presence::Optional => "optional",
        }
    }
}

impl Field {
    pub fn presence(&self) -> Presence {
        Presence::from_attrs(&self.attrs)
    }

    /// The operator of a scalar field, if the field kind has a single one.
    pub fn operator(&self) -> Option<&FieldOperator> {
        match &self.kind {
            FieldKind::String(s) => s.operator.as_ref(),
            FieldKind::Integer(i) => i.operator.as_ref(),
            FieldKind::ByteVector(b) => b.operator.as_ref(),
            FieldKind::Decimal(DecimalField {
                repr: DecimalRepr::Single(op),
            }) => op.as_ref(),
            _ => None,
        }
    }

    /// Mandatory constants are fixed by the template and get no write accessor.
    pub fn is_mandatory_constant(&self) -> bool {
        self.presence() == Presence::Mandatory
            && self.operator().map(|op| op.kind) == Some(OperatorKind::Constant)
    }
}
