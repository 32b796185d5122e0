//! Crate root: wires together the compilation pipeline.
//!
//! The stages are small and composable so they can be evolved independently:
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `parser` owns all syntactic knowledge and returns declarations plus a
//!   statement tree.
//! - `codegen` lowers the tree into stack-machine pseudo-assembly with
//!   placeholder labels.
//! - `labels` renumbers those placeholders densely in reading order.
//! - `error` centralises reporting utilities shared by the other modules.

pub mod error;
pub mod labels;
pub mod parser;
pub mod tokenizer;
pub mod ty;

mod codegen;

use log::debug;

pub use codegen::{Emitter, Instruction, Label, LabelAllocator, Program};
pub use error::{CompileError, CompileResult};
pub use tokenizer::SkippedChar;

/// Knobs for a single compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
  /// Reject unrecognised characters instead of skipping them.
  pub strict_lexing: bool,
}

/// Result of a successful compilation.
#[derive(Debug, Clone)]
pub struct Compiled {
  pub program: Program,
  /// Characters the lexer dropped. Always empty in strict mode.
  pub skipped: Vec<SkippedChar>,
}

/// Compile a source string with default options.
pub fn compile(source: &str) -> CompileResult<Compiled> {
  compile_with(source, &CompileOptions::default())
}

/// Compile a source string. Every call starts from fresh label and
/// instruction state.
pub fn compile_with(source: &str, options: &CompileOptions) -> CompileResult<Compiled> {
  let lexed = tokenizer::tokenize(source, options)?;
  let unit = parser::parse(lexed.tokens, source)?;
  debug!(
    "parsed {} declarations and {} top-level statements",
    unit.declarations.len(),
    unit.body.len()
  );

  let mut instructions = codegen::generate(&unit);
  labels::canonicalize(&mut instructions)?;

  Ok(Compiled {
    program: Program::new(instructions),
    skipped: lexed.skipped,
  })
}

/// Compile a source string into the rendered program text.
pub fn generate_code(source: &str) -> CompileResult<String> {
  Ok(compile(source)?.program.to_string())
}
