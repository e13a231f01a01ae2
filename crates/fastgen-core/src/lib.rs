pub mod byte_vector;
pub mod compile;
pub mod decimal;
pub mod diagnostics;
pub mod emit;
pub mod error;
pub mod frames;
pub mod inline_pass;
pub mod instructions;
pub mod registry;
pub mod schema;
pub mod scope;
pub mod source_pass;
pub mod walk;

pub use compile::{CompiledUnit, Compiler, UnitMetadata};
pub use error::{GenError, Result};
