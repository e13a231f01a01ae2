use thiserror::Error;

use crate::diagnostics::DiagnosticCode;

pub type Result<T> = std::result::Result<T, GenError>;

#[derive(Debug, Error)]
pub enum GenError {
    #[error("schema load failed: {message}")]
    Load { message: String },

    #[error("schema root must be <templates> or <template>, found <{found}>")]
    BadRoot { found: String },

    #[error("{literal} is not a valid decimal number")]
    InvalidDecimal { literal: String },

    #[error("\"{literal}\" is not a valid byte vector, invalid character {ch:?}")]
    InvalidByteVectorChar { literal: String, ch: char },

    #[error("\"{literal}\" is not a valid byte vector, it must have even digits")]
    OddByteVector { literal: String },

    #[error("{literal} is not a valid {ty} value for field {field:?}")]
    InvalidInteger {
        field: String,
        ty: String,
        literal: String,
    },

    #[error("{literal} is not a valid id for {field:?}")]
    InvalidId { field: String, literal: String },

    #[error("cannot find the definition for static templateRef name={name:?}, ns={ns:?}")]
    UnresolvedTemplateRef { name: String, ns: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl GenError {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            GenError::Load { .. } => DiagnosticCode::FTG0001LoadFailed,
            GenError::BadRoot { .. } => DiagnosticCode::FTG0002BadRoot,
            GenError::InvalidDecimal { .. } => DiagnosticCode::FTG0100InvalidDecimal,
            GenError::InvalidByteVectorChar { .. } | GenError::OddByteVector { .. } => {
                DiagnosticCode::FTG0101InvalidByteVector
            }
            GenError::InvalidInteger { .. } => DiagnosticCode::FTG0102InvalidInteger,
            GenError::InvalidId { .. } => DiagnosticCode::FTG0103InvalidId,
            GenError::UnresolvedTemplateRef { .. } => DiagnosticCode::FTG0200UnresolvedTemplateRef,
            GenError::Internal(_) => DiagnosticCode::FTG0901InternalBug,
        }
    }

    /// Document load failures exit with 3, everything else with 2.
    pub fn exit_code(&self) -> u8 {
        match self {
            GenError::Load { .. } | GenError::BadRoot { .. } => 3,
            _ => 2,
        }
    }

    pub fn is_load_error(&self) -> bool {
        matches!(self, GenError::Load { .. } | GenError::BadRoot { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_catalog_codes() {
        let cases = [
            (
                GenError::Load {
                    message: "x".into(),
                },
                "FTG0001",
                3,
            ),
            (GenError::BadRoot { found: "x".into() }, "FTG0002", 3),
            (
                GenError::OddByteVector {
                    literal: "0".into(),
                },
                "FTG0101",
                2,
            ),
            (
                GenError::UnresolvedTemplateRef {
                    name: "T".into(),
                    ns: String::new(),
                },
                "FTG0200",
                2,
            ),
            (GenError::Internal("x".into()), "FTG0901", 2),
        ];
        for (err, code, exit) in cases {
            assert_eq!(err.code().code_str(), code, "{err}");
            assert_eq!(err.exit_code(), exit, "{err}");
        }
    }
}
