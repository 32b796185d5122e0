//! Lexical analysis: turns the raw input string into a vector of tokens.
//!
//! The tokenizer knows nothing about semantics beyond classifying words,
//! literals and punctuators. Multi-character punctuators are matched before
//! single-character ones to avoid ambiguity. Whitespace, newlines and `//`
//! comments never become tokens; characters outside the alphabet are skipped
//! and reported as [`SkippedChar`] unless strict lexing is requested.

use log::{debug, warn};

use crate::CompileOptions;
use crate::error::{CompileError, CompileResult};

/// Reserved words. An identifier spelled exactly like one of these is
/// reclassified as [`TokenKind::Keyword`].
pub const KEYWORDS: [&str; 6] = ["print", "while", "if", "else", "int", "double"];

const MULTI_CHAR_PUNCTUATORS: [&str; 3] = ["==", "<=", ">="];

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Ident,
  Keyword,
  Int,
  Double,
  Punctuator,
  Eof,
}

impl TokenKind {
  /// Category name used in diagnostics.
  pub fn category(&self) -> &'static str {
    match self {
      Self::Ident => "identifier",
      Self::Keyword => "keyword",
      Self::Int => "integer literal",
      Self::Double => "double literal",
      Self::Punctuator => "punctuator",
      Self::Eof => "end of input",
    }
  }
}

/// Thin wrapper for lexical information needed by later stages.
#[derive(Debug, Clone)]
pub struct Token {
  pub kind: TokenKind,
  pub loc: usize,
  pub len: usize,
  pub line: usize,
}

impl Token {
  /// Convenience constructor to keep the `tokenize` loop readable.
  pub fn new(kind: TokenKind, loc: usize, len: usize, line: usize) -> Self {
    Self {
      kind,
      loc,
      len,
      line,
    }
  }
}

/// A character the lexer did not recognise and dropped from the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkippedChar {
  pub ch: char,
  pub line: usize,
  pub loc: usize,
}

/// Output of the lexer: the token stream plus everything it had to drop.
#[derive(Debug, Clone)]
pub struct Lexed {
  pub tokens: Vec<Token>,
  pub skipped: Vec<SkippedChar>,
}

/// Lex the input into a flat vector of tokens terminated by an `Eof` marker.
pub fn tokenize(input: &str, options: &CompileOptions) -> CompileResult<Lexed> {
  let mut tokens = Vec::new();
  let mut skipped = Vec::new();
  let bytes = input.as_bytes();
  let mut line = 1;
  let mut i = 0;

  while i < bytes.len() {
    let c = bytes[i];

    if c == b'\n' {
      line += 1;
      i += 1;
      continue;
    }

    if c.is_ascii_whitespace() {
      i += 1;
      continue;
    }

    if input[i..].starts_with("//") {
      i = input[i..].find('\n').map_or(bytes.len(), |nl| i + nl);
      continue;
    }

    if c.is_ascii_alphabetic() {
      let start = i;
      while i < bytes.len() && bytes[i].is_ascii_alphanumeric() {
        i += 1;
      }
      let kind = if KEYWORDS.contains(&&input[start..i]) {
        TokenKind::Keyword
      } else {
        TokenKind::Ident
      };
      tokens.push(Token::new(kind, start, i - start, line));
      continue;
    }

    if c.is_ascii_digit() {
      let start = i;
      i = skip_digits(bytes, i);

      if bytes.get(i) == Some(&b'.') && bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
        i = skip_digits(bytes, i + 1);
        i = skip_exponent(bytes, i);
        tokens.push(Token::new(TokenKind::Double, start, i - start, line));
        continue;
      }

      tokens.push(Token::new(TokenKind::Int, start, i - start, line));
      continue;
    }

    if let Some(op) = MULTI_CHAR_PUNCTUATORS
      .into_iter()
      .find(|op| input[i..].starts_with(op))
    {
      tokens.push(Token::new(TokenKind::Punctuator, i, op.len(), line));
      i += op.len();
      continue;
    }

    if matches!(
      c,
      b'(' | b')' | b'{' | b'}' | b'[' | b']'
        | b'=' | b'!' | b'|' | b'&' | b'<' | b'>'
        | b'+' | b'-' | b'*' | b'/' | b',' | b';'
    ) {
      tokens.push(Token::new(TokenKind::Punctuator, i, 1, line));
      i += 1;
      continue;
    }

    let invalid_char = input[i..].chars().next().unwrap_or('\0');
    if options.strict_lexing {
      return Err(CompileError::invalid_character(input, i, invalid_char));
    }
    warn!("line {line}: skipping unrecognised character {invalid_char:?}");
    skipped.push(SkippedChar {
      ch: invalid_char,
      line,
      loc: i,
    });
    i += invalid_char.len_utf8().max(1);
  }

  tokens.push(Token::new(TokenKind::Eof, input.len(), 0, line));
  debug!(
    "lexed {} tokens over {line} lines, {} characters skipped",
    tokens.len(),
    skipped.len()
  );
  Ok(Lexed { tokens, skipped })
}

fn skip_digits(bytes: &[u8], mut i: usize) -> usize {
  while i < bytes.len() && bytes[i].is_ascii_digit() {
    i += 1;
  }
  i
}

/// Consume an optional `e[+-]digits` suffix; leaves `i` untouched when the
/// suffix is incomplete so that `1.5e` lexes as a double followed by `e`.
fn skip_exponent(bytes: &[u8], i: usize) -> usize {
  if !matches!(bytes.get(i), Some(b'e' | b'E')) {
    return i;
  }
  let mut j = i + 1;
  if matches!(bytes.get(j), Some(b'+' | b'-')) {
    j += 1;
  }
  if bytes.get(j).is_some_and(u8::is_ascii_digit) {
    skip_digits(bytes, j)
  } else {
    i
  }
}

/// Return the slice from the source that produced this token.
pub fn token_text<'a>(token: &Token, source: &'a str) -> &'a str {
  let end = token.loc + token.len;
  &source[token.loc..end]
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: Option<&Token>, source: &str) -> String {
  match token {
    Some(t) => match t.kind {
      TokenKind::Eof => "EOF".to_string(),
      _ => token_text(t, source).to_string(),
    },
    None => "EOF".to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::{TokenKind, token_text, tokenize};
  use crate::CompileOptions;
  use crate::error::CompileError;

  fn lex(source: &str) -> Vec<(TokenKind, String)> {
    tokenize(source, &CompileOptions::default())
      .unwrap()
      .tokens
      .iter()
      .map(|token| (token.kind, token_text(token, source).to_string()))
      .collect()
  }

  macro_rules! test_tokenizer {
    ($name:ident, $source:expr, [$(($kind:ident, $text:expr)),* $(,)?]) => {
      #[test]
      fn $name() {
        let expected: Vec<(TokenKind, String)> =
          vec![$((TokenKind::$kind, $text.to_string())),*];
        assert_eq!(lex($source), expected);
      }
    };
  }

  test_tokenizer!(
    can_tokenize_declaration,
    "int a, b[10];",
    [
      (Keyword, "int"),
      (Ident, "a"),
      (Punctuator, ","),
      (Ident, "b"),
      (Punctuator, "["),
      (Int, "10"),
      (Punctuator, "]"),
      (Punctuator, ";"),
      (Eof, ""),
    ]
  );

  test_tokenizer!(
    matches_two_character_operators_first,
    "a<=b>=c==d<e",
    [
      (Ident, "a"),
      (Punctuator, "<="),
      (Ident, "b"),
      (Punctuator, ">="),
      (Ident, "c"),
      (Punctuator, "=="),
      (Ident, "d"),
      (Punctuator, "<"),
      (Ident, "e"),
      (Eof, ""),
    ]
  );

  test_tokenizer!(
    keywords_need_an_exact_match,
    "while whilex If print2 double",
    [
      (Keyword, "while"),
      (Ident, "whilex"),
      (Ident, "If"),
      (Ident, "print2"),
      (Keyword, "double"),
      (Eof, ""),
    ]
  );

  test_tokenizer!(
    doubles_need_a_digit_after_the_point,
    "3.14 2.5e-3 1.0E4 7. 1.5e",
    [
      (Double, "3.14"),
      (Double, "2.5e-3"),
      (Double, "1.0E4"),
      (Int, "7"),
      (Double, "1.5"),
      (Ident, "e"),
      (Eof, ""),
    ]
  );

  test_tokenizer!(
    minus_is_never_fused_into_a_literal,
    "a -1",
    [(Ident, "a"), (Punctuator, "-"), (Int, "1"), (Eof, "")]
  );

  test_tokenizer!(
    comments_and_newlines_are_dropped,
    "a = 1; // trailing comment\n// whole line\nprint a / 2;",
    [
      (Ident, "a"),
      (Punctuator, "="),
      (Int, "1"),
      (Punctuator, ";"),
      (Keyword, "print"),
      (Ident, "a"),
      (Punctuator, "/"),
      (Int, "2"),
      (Punctuator, ";"),
      (Eof, ""),
    ]
  );

  test_tokenizer!(
    unrecognised_characters_are_skipped,
    "a = @1;",
    [
      (Ident, "a"),
      (Punctuator, "="),
      (Int, "1"),
      (Punctuator, ";"),
      (Eof, ""),
    ]
  );

  #[test]
  fn line_counter_advances_on_newlines() {
    let source = "int a;\n\n// note\na = 1;";
    let lexed = tokenize(source, &CompileOptions::default()).unwrap();
    let lines: Vec<usize> = lexed.tokens.iter().map(|token| token.line).collect();
    assert_eq!(lines, vec![1, 1, 1, 4, 4, 4, 4, 4]);
  }

  #[test]
  fn skipped_characters_are_reported() {
    let lexed = tokenize("a = 1;\nb @= 2 $;", &CompileOptions::default()).unwrap();
    let skipped: Vec<(char, usize)> = lexed.skipped.iter().map(|s| (s.ch, s.line)).collect();
    assert_eq!(skipped, vec![('@', 2), ('$', 2)]);
  }

  #[test]
  fn strict_lexing_rejects_unrecognised_characters() {
    let options = CompileOptions {
      strict_lexing: true,
    };
    let err = tokenize("a = 1;\nb = @2;", &options).unwrap_err();
    assert!(matches!(
      err,
      CompileError::InvalidCharacter {
        ch: '@',
        line: 2,
        column: 5,
        ..
      }
    ));
  }

  #[test]
  fn oversized_integer_literals_stay_text() {
    let source = "print 99999999999999999999;";
    let lexed = tokenize(source, &CompileOptions::default()).unwrap();
    assert_eq!(lexed.tokens[1].kind, TokenKind::Int);
    assert_eq!(token_text(&lexed.tokens[1], source), "99999999999999999999");
  }
}
