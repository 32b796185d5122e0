//! Shared error utilities used across the compilation pipeline.
//!
//! Diagnostics stay lightweight: syntax and lexical errors quote the
//! offending source line and point at the byte with a caret, prefixed by a
//! `line:column` pair so multi-line programs remain easy to navigate.

use std::path::PathBuf;

use snafu::Snafu;

use crate::codegen::Label;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CompileError {
  #[snafu(display("{line}:{column}: {message}\n{source_line}\n{marker}"))]
  Syntax {
    line: usize,
    column: usize,
    source_line: String,
    marker: String,
    message: String,
  },

  #[snafu(display("{line}:{column}: invalid character '{ch}'\n{source_line}\n{marker}"))]
  InvalidCharacter {
    ch: char,
    line: usize,
    column: usize,
    source_line: String,
    marker: String,
  },

  #[snafu(display("internal error: jump to {label} which is never defined"))]
  UndefinedLabel { label: Label },

  #[snafu(display("internal error: {label} is defined more than once"))]
  DuplicateLabel { label: Label },

  #[snafu(display("{}: {}", path.display(), source))]
  Io {
    path: PathBuf,
    source: std::io::Error,
  },
}

/// Position of a byte offset inside the source, resolved to the line that
/// contains it.
struct Anchor {
  line: usize,
  column: usize,
  source_line: String,
  marker: String,
}

impl Anchor {
  fn resolve(source: &str, loc: usize) -> Self {
    let mut safe_loc = loc.min(source.len());
    while !source.is_char_boundary(safe_loc) {
      safe_loc -= 1;
    }

    let before = &source[..safe_loc];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |nl| nl + 1);
    let line_end = source[safe_loc..]
      .find('\n')
      .map_or(source.len(), |nl| safe_loc + nl);
    let source_line = source[line_start..line_end].trim_end_matches('\r').to_string();
    let column = source[line_start..safe_loc].chars().count() + 1;
    let marker = format!("{}^", " ".repeat(column - 1));

    Self {
      line,
      column,
      source_line,
      marker,
    }
  }
}

impl CompileError {
  /// Construct a syntax error anchored at a specific byte offset in the source.
  pub fn at(source: &str, loc: usize, message: impl Into<String>) -> Self {
    let Anchor {
      line,
      column,
      source_line,
      marker,
    } = Anchor::resolve(source, loc);
    Self::Syntax {
      line,
      column,
      source_line,
      marker,
      message: message.into(),
    }
  }

  /// Strict-mode rejection of a character the lexer does not recognise.
  pub fn invalid_character(source: &str, loc: usize, ch: char) -> Self {
    let Anchor {
      line,
      column,
      source_line,
      marker,
    } = Anchor::resolve(source, loc);
    Self::InvalidCharacter {
      ch,
      line,
      column,
      source_line,
      marker,
    }
  }

  /// Source line of a located diagnostic, if it has one.
  pub fn line(&self) -> Option<usize> {
    match self {
      Self::Syntax { line, .. } | Self::InvalidCharacter { line, .. } => Some(*line),
      _ => None,
    }
  }
}
