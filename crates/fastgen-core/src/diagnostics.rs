use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    Load,
    Derive,
    Resolve,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiagnosticCode {
    FTG0001LoadFailed,
    FTG0002BadRoot,
    FTG0100InvalidDecimal,
    FTG0101InvalidByteVector,
    FTG0102InvalidInteger,
    FTG0103InvalidId,
    FTG0200UnresolvedTemplateRef,
    FTG0901InternalBug,
}

impl DiagnosticCode {
    pub fn code_str(self) -> &'static str {
        match self {
            DiagnosticCode::FTG0001LoadFailed => "FTG0001",
            DiagnosticCode::FTG0002BadRoot => "FTG0002",
            DiagnosticCode::FTG0100InvalidDecimal => "FTG0100",
            DiagnosticCode::FTG0101InvalidByteVector => "FTG0101",
            DiagnosticCode::FTG0102InvalidInteger => "FTG0102",
            DiagnosticCode::FTG0103InvalidId => "FTG0103",
            DiagnosticCode::FTG0200UnresolvedTemplateRef => "FTG0200",
            DiagnosticCode::FTG0901InternalBug => "FTG0901",
        }
    }

    pub fn phase(self) -> Phase {
        match self {
            DiagnosticCode::FTG0001LoadFailed | DiagnosticCode::FTG0002BadRoot => Phase::Load,
            DiagnosticCode::FTG0100InvalidDecimal
            | DiagnosticCode::FTG0101InvalidByteVector
            | DiagnosticCode::FTG0102InvalidInteger
            | DiagnosticCode::FTG0103InvalidId => Phase::Derive,
            DiagnosticCode::FTG0200UnresolvedTemplateRef => Phase::Resolve,
            DiagnosticCode::FTG0901InternalBug => Phase::Internal,
        }
    }

    pub fn default_message(self) -> &'static str {
        match self {
            DiagnosticCode::FTG0001LoadFailed => "schema document could not be parsed",
            DiagnosticCode::FTG0002BadRoot => "schema document has an unexpected root element",
            DiagnosticCode::FTG0100InvalidDecimal => "invalid decimal literal",
            DiagnosticCode::FTG0101InvalidByteVector => "invalid byte vector literal",
            DiagnosticCode::FTG0102InvalidInteger => "invalid integer literal",
            DiagnosticCode::FTG0103InvalidId => "invalid field id",
            DiagnosticCode::FTG0200UnresolvedTemplateRef => "unresolved static template reference",
            DiagnosticCode::FTG0901InternalBug => "internal fastgen bug",
        }
    }

    pub fn default_help(self) -> Option<&'static str> {
        match self {
            DiagnosticCode::FTG0002BadRoot => {
                Some("The document root must be <templates> or a single <template>.")
            }
            DiagnosticCode::FTG0101InvalidByteVector => {
                Some("Byte vector values are hex digit pairs; whitespace is ignored.")
            }
            DiagnosticCode::FTG0200UnresolvedTemplateRef => Some(
                "Pass the file defining the referenced template before the file that uses it.",
            ),
            DiagnosticCode::FTG0901InternalBug => {
                Some("This is a bug in fastgen. Please report it with the input schema.")
            }
            _ => None,
        }
    }
}

pub fn render_diagnostics_md() -> String {
    let mut rows: Vec<(&'static str, Phase, &'static str, &'static str)> = all_codes()
        .iter()
        .map(|code| {
            (
                code.code_str(),
                code.phase(),
                code.default_message(),
                code.default_help().unwrap_or(""),
            )
        })
        .collect();
    rows.sort_by(|a, b| a.0.cmp(b.0));

    let mut out = String::new();
    out.push_str("# fastgen diagnostics catalog\n\n");
    out.push_str("This document is generated from `crates/fastgen-core/src/diagnostics.rs`.\n\n");
    out.push_str("| Code | Phase | Message | Help |\n");
    out.push_str("| ---- | ----- | ------- | ---- |\n");
    for (code, phase, msg, help) in rows {
        out.push_str(&format!("| {code} | {phase:?} | {msg} | {help} |\n"));
    }
    out
}

fn all_codes() -> &'static [DiagnosticCode] {
    &[
        DiagnosticCode::FTG0001LoadFailed,
        DiagnosticCode::FTG0002BadRoot,
        DiagnosticCode::FTG0100InvalidDecimal,
        DiagnosticCode::FTG0101InvalidByteVector,
        DiagnosticCode::FTG0102InvalidInteger,
        DiagnosticCode::FTG0103InvalidId,
        DiagnosticCode::FTG0200UnresolvedTemplateRef,
        DiagnosticCode::FTG0901InternalBug,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lists_every_code_once() {
        let md = render_diagnostics_md();
        for code in all_codes() {
            assert_eq!(
                md.matches(code.code_str()).count(),
                1,
                "code {} must appear exactly once",
                code.code_str()
            );
        }
    }
}
