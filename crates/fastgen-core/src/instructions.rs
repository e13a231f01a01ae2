//! Field instruction metadata: the typed form of what the source pass emits.
//!
//! Leaf records are derived here from the AST alone. Container records need the
//! frame stack and the template registry and are assembled by
//! [`crate::source_pass`].

use serde::Serialize;

use crate::byte_vector::decode_hex_literal;
use crate::decimal::{canonicalize, DecimalValue};
use crate::error::{GenError, Result};
use crate::schema::{
    Attributes, ByteVectorField, DecimalField, DecimalRepr, Field, FieldOperator, IntWidth,
    IntegerField, LengthSpec, OperatorKind, Presence, Sequence, StringField, Template, TypeRef,
};

/// Shared `(key, ns, dictionary)` of an operator; only present when key or dictionary is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpContext {
    pub key: String,
    pub ns: String,
    pub dictionary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldOp {
    pub kind: OperatorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<OpContext>,
    /// Raw `value` attribute text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<String>,
}

impl FieldOp {
    pub fn none() -> Self {
        FieldOp {
            kind: OperatorKind::None,
            context: None,
            initial_value: None,
        }
    }
}

pub fn derive_field_op(op: Option<&FieldOperator>) -> FieldOp {
    let Some(op) = op else {
        return FieldOp::none();
    };
    let key = op.attrs.get_or("key", "");
    let dictionary = op.attrs.get_or("dictionary", "");
    let context = (!key.is_empty() || !dictionary.is_empty()).then(|| OpContext {
        key: key.to_string(),
        ns: op.attrs.get_or("ns", "").to_string(),
        dictionary: dictionary.to_string(),
    });
    FieldOp {
        kind: op.kind,
        context,
        initial_value: op
            .attrs
            .get("value")
            .filter(|v| !v.is_empty())
            .map(str::to_string),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LengthField {
    pub id: u32,
    pub name: String,
    pub ns: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Charset {
    Ascii,
    Unicode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum IntValue {
    Signed(i64),
    Unsigned(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeRefInfo {
    pub name: String,
    pub ns: String,
}

impl From<&TypeRef> for TypeRefInfo {
    fn from(t: &TypeRef) -> Self {
        TypeRefInfo {
            name: t.name.clone(),
            ns: t.ns.clone(),
        }
    }
}

/// A static template reference after registry lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRef {
    pub name: String,
    pub ns: String,
    pub unit: String,
}

impl ResolvedRef {
    /// C++ type name of the target as seen from `current_unit`.
    pub fn type_name(&self, current_unit: &str) -> String {
        if self.unit == current_unit {
            self.name.clone()
        } else {
            format!("{}::{}", self.unit, self.name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Subinstructions {
    /// The container's own frame.
    Owned { fields: Vec<FieldInstruction> },
    /// Aliases the referenced template's subinstruction array.
    Borrowed { target: ResolvedRef },
    /// Shared single nested-message slot keyed by presence.
    DynamicSlot { presence: Presence },
}

impl Subinstructions {
    pub fn count(&self) -> Option<usize> {
        match self {
            Subinstructions::Owned { fields } => Some(fields.len()),
            Subinstructions::Borrowed { .. } => None,
            Subinstructions::DynamicSlot { .. } => Some(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    Integer {
        signed: bool,
        bits: u32,
        op: FieldOp,
        #[serde(skip_serializing_if = "Option::is_none")]
        initial: Option<IntValue>,
    },
    Decimal {
        op: FieldOp,
        #[serde(skip_serializing_if = "Option::is_none")]
        initial: Option<DecimalValue>,
    },
    SplitDecimal {
        mantissa_op: FieldOp,
        #[serde(skip_serializing_if = "Option::is_none")]
        mantissa_initial: Option<i64>,
        exponent_op: FieldOp,
        #[serde(skip_serializing_if = "Option::is_none")]
        exponent_initial: Option<i32>,
    },
    String {
        charset: Charset,
        op: FieldOp,
        #[serde(skip_serializing_if = "Option::is_none")]
        initial: Option<String>,
        /// Unicode strings only; defaults to id 0 with empty name and ns.
        #[serde(skip_serializing_if = "Option::is_none")]
        length: Option<LengthField>,
    },
    ByteVector {
        op: FieldOp,
        #[serde(skip_serializing_if = "Option::is_none")]
        initial: Option<Vec<u8>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        length: Option<LengthField>,
    },
    Group {
        subinstructions: Subinstructions,
        #[serde(skip_serializing_if = "Option::is_none")]
        type_ref: Option<TypeRefInfo>,
    },
    Sequence {
        length: Box<FieldInstruction>,
        subinstructions: Subinstructions,
        #[serde(skip_serializing_if = "Option::is_none")]
        type_ref: Option<TypeRefInfo>,
    },
    TemplateRef {
        /// `None` for a dynamic reference.
        #[serde(skip_serializing_if = "Option::is_none")]
        target: Option<ResolvedRef>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldInstruction {
    pub field_index: usize,
    pub presence: Presence,
    pub id: u32,
    pub name: String,
    pub ns: String,
    pub dictionary: String,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateInstruction {
    pub index: usize,
    pub id: u32,
    pub name: String,
    pub ns: String,
    pub template_ns: String,
    pub dictionary: String,
    pub reset: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_ref: Option<TypeRefInfo>,
    pub fields: Vec<FieldInstruction>,
}

pub fn parse_id(owner: &str, attrs: &Attributes) -> Result<u32> {
    let literal = attrs.get_or("id", "0").trim();
    if literal.is_empty() {
        return Ok(0);
    }
    literal.parse::<u32>().map_err(|_| GenError::InvalidId {
        field: owner.to_string(),
        literal: literal.to_string(),
    })
}

/// `reset="true|yes"` (also accepted as `scp:reset`).
pub fn template_reset(t: &Template) -> bool {
    matches!(t.attrs.get("reset"), Some("true" | "yes"))
}

/// Header shared by every field record: index, presence, id, name and own ns/dictionary.
pub fn field_instruction(
    field: &Field,
    index: usize,
    payload: Payload,
) -> Result<FieldInstruction> {
    Ok(FieldInstruction {
        field_index: index,
        presence: field.presence(),
        id: parse_id(&field.name, &field.attrs)?,
        name: field.name.clone(),
        ns: field.attrs.get_or("ns", "").to_string(),
        dictionary: field.attrs.get_or("dictionary", "").to_string(),
        payload,
    })
}

pub fn parse_int_value(
    field: &str,
    width: IntWidth,
    signed: bool,
    literal: &str,
) -> Result<IntValue> {
    let invalid = || GenError::InvalidInteger {
        field: field.to_string(),
        ty: format!("{}int{}", if signed { "" } else { "u" }, width.bits()),
        literal: literal.to_string(),
    };
    let text = literal.trim();
    let bits = width.bits();
    if signed {
        let v = text.parse::<i64>().map_err(|_| invalid())?;
        let min = i64::MIN >> (64 - bits);
        let max = i64::MAX >> (64 - bits);
        if v < min || v > max {
            return Err(invalid());
        }
        Ok(IntValue::Signed(v))
    } else {
        let v = text.parse::<u64>().map_err(|_| invalid())?;
        if v > u64::MAX >> (64 - bits) {
            return Err(invalid());
        }
        Ok(IntValue::Unsigned(v))
    }
}

pub fn derive_integer(field: &Field, i: &IntegerField, index: usize) -> Result<FieldInstruction> {
    let op = derive_field_op(i.operator.as_ref());
    let initial = op
        .initial_value
        .as_deref()
        .map(|v| parse_int_value(&field.name, i.width, i.signed, v))
        .transpose()?;
    field_instruction(
        field,
        index,
        Payload::Integer {
            signed: i.signed,
            bits: i.width.bits(),
            op,
            initial,
        },
    )
}

pub fn derive_decimal(field: &Field, d: &DecimalField, index: usize) -> Result<FieldInstruction> {
    let payload = match &d.repr {
        DecimalRepr::Single(op) => {
            let op = derive_field_op(op.as_ref());
            let initial = op.initial_value.as_deref().map(canonicalize).transpose()?;
            Payload::Decimal { op, initial }
        }
        DecimalRepr::Split { mantissa, exponent } => {
            let mantissa_op = derive_field_op(mantissa.as_ref());
            let exponent_op = derive_field_op(exponent.as_ref());
            let mantissa_initial = mantissa_op
                .initial_value
                .as_deref()
                .map(|v| parse_int_value(&field.name, IntWidth::W64, true, v))
                .transpose()?
                .map(|v| match v {
                    IntValue::Signed(m) => m,
                    IntValue::Unsigned(m) => m as i64,
                });
            let exponent_initial = exponent_op
                .initial_value
                .as_deref()
                .map(|v| parse_int_value(&field.name, IntWidth::W32, true, v))
                .transpose()?
                .map(|v| match v {
                    IntValue::Signed(e) => e as i32,
                    IntValue::Unsigned(e) => e as i32,
                });
            Payload::SplitDecimal {
                mantissa_op,
                mantissa_initial,
                exponent_op,
                exponent_initial,
            }
        }
    };
    field_instruction(field, index, payload)
}

pub fn derive_length_field(spec: Option<&LengthSpec>) -> Result<LengthField> {
    let Some(spec) = spec else {
        return Ok(LengthField {
            id: 0,
            name: String::new(),
            ns: String::new(),
        });
    };
    let name = spec.attrs.get_or("name", "");
    Ok(LengthField {
        id: parse_id(name, &spec.attrs)?,
        name: name.to_string(),
        ns: spec.attrs.get_or("ns", "").to_string(),
    })
}

pub fn derive_string(field: &Field, s: &StringField, index: usize) -> Result<FieldInstruction> {
    let charset = match field.attrs.get("charset") {
        Some("unicode") => Charset::Unicode,
        _ => Charset::Ascii,
    };
    let op = derive_field_op(s.operator.as_ref());
    let length = match charset {
        Charset::Unicode => Some(derive_length_field(s.length.as_ref())?),
        Charset::Ascii => None,
    };
    field_instruction(
        field,
        index,
        Payload::String {
            charset,
            initial: op.initial_value.clone(),
            op,
            length,
        },
    )
}

pub fn derive_byte_vector(
    field: &Field,
    b: &ByteVectorField,
    index: usize,
) -> Result<FieldInstruction> {
    let op = derive_field_op(b.operator.as_ref());
    let initial = op
        .initial_value
        .as_deref()
        .map(decode_hex_literal)
        .transpose()?;
    let length = b
        .length
        .as_ref()
        .map(|l| derive_length_field(Some(l)))
        .transpose()?;
    field_instruction(
        field,
        index,
        Payload::ByteVector {
            op,
            initial,
            length,
        },
    )
}

/// The synthetic `uint32` length field every sequence owns at index 0.
pub fn derive_sequence_length(seq_field: &Field, seq: &Sequence) -> Result<FieldInstruction> {
    let spec = seq.length.as_ref();
    let op = derive_field_op(spec.and_then(|l| l.operator.as_ref()));
    let name = spec.map(|l| l.attrs.get_or("name", "")).unwrap_or("");
    let initial = op
        .initial_value
        .as_deref()
        .map(|v| parse_int_value(name, IntWidth::W32, false, v))
        .transpose()?;
    let id = match spec {
        Some(l) => parse_id(name, &l.attrs)?,
        None => 0,
    };
    Ok(FieldInstruction {
        field_index: 0,
        presence: seq_field.presence(),
        id,
        name: name.to_string(),
        ns: spec.map(|l| l.attrs.get_or("ns", "")).unwrap_or("").to_string(),
        dictionary: String::new(),
        payload: Payload::Integer {
            signed: false,
            bits: 32,
            op,
            initial,
        },
    })
}
