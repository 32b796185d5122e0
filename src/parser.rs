//! Recursive-descent parser producing declarations, a statement list and
//! expression trees.
//!
//! Precedence climbing reproduces the operator table of the language, from
//! loosest to tightest: `|`, `&`, the non-associative relational operators,
//! additive, multiplicative, then prefix `-`/`!`. Minus is unary exactly when
//! it appears where an operand is expected; applied directly to a numeric
//! literal it folds into a negative literal.
//!
//! Every expression node renders (via `Display`) as its postfix fragment,
//! which is what the emitter writes into `EVAL` and `PRINT` lines.

use std::fmt;

use crate::error::{CompileError, CompileResult};
use crate::tokenizer::{Token, TokenKind, describe_token, token_text};
use crate::ty::TypeTag;

/// Binary operators recognised by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Or,
  And,
  Eq,
  Lt,
  Le,
  Gt,
  Ge,
  Add,
  Sub,
  Mul,
  Div,
}

impl BinaryOp {
  pub fn symbol(&self) -> &'static str {
    match self {
      Self::Or => "|",
      Self::And => "&",
      Self::Eq => "==",
      Self::Lt => "<",
      Self::Le => "<=",
      Self::Gt => ">",
      Self::Ge => ">=",
      Self::Add => "+",
      Self::Sub => "-",
      Self::Mul => "*",
      Self::Div => "/",
    }
  }

  fn relational(symbol: &str) -> Option<Self> {
    match symbol {
      "==" => Some(Self::Eq),
      "<" => Some(Self::Lt),
      "<=" => Some(Self::Le),
      ">" => Some(Self::Gt),
      ">=" => Some(Self::Ge),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
  Neg,
  Not,
}

impl UnaryOp {
  pub fn symbol(&self) -> &'static str {
    match self {
      Self::Neg => "-",
      Self::Not => "!",
    }
  }
}

/// Array subscript: either a literal integer (kept as written, sign
/// included) or a plain identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Index {
  Int(String),
  Var(String),
}

/// A variable name plus zero or more subscripts, e.g. `m[i][2]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Designator {
  pub name: String,
  pub indices: Vec<Index>,
}

impl fmt::Display for Designator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.name)?;
    for index in &self.indices {
      match index {
        Index::Int(text) | Index::Var(text) => write!(f, "[{text}]")?,
      }
    }
    Ok(())
  }
}

/// Expression tree produced by the parser.
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
  /// Integer or double literal, kept as written (sign included once folded).
  Num {
    text: String,
  },
  Var {
    designator: Designator,
  },
  Unary {
    op: UnaryOp,
    operand: Box<AstNode>,
  },
  Binary {
    op: BinaryOp,
    lhs: Box<AstNode>,
    rhs: Box<AstNode>,
  },
}

impl AstNode {
  pub fn number(text: impl Into<String>) -> Self {
    Self::Num { text: text.into() }
  }

  pub fn var(designator: Designator) -> Self {
    Self::Var { designator }
  }

  pub fn unary(op: UnaryOp, operand: AstNode) -> Self {
    Self::Unary {
      op,
      operand: Box::new(operand),
    }
  }

  pub fn binary(op: BinaryOp, lhs: AstNode, rhs: AstNode) -> Self {
    Self::Binary {
      op,
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
    }
  }
}

/// Postfix rendering: operands first, operator last.
impl fmt::Display for AstNode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Num { text } => f.write_str(text),
      Self::Var { designator } => write!(f, "{designator}"),
      Self::Unary { op, operand } => write!(f, "{operand} {}", op.symbol()),
      Self::Binary { op, lhs, rhs } => write!(f, "{lhs} {rhs} {}", op.symbol()),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
  Block(Vec<Stmt>),
  If {
    cond: AstNode,
    then: Box<Stmt>,
    otherwise: Option<Box<Stmt>>,
  },
  While {
    cond: AstNode,
    body: Box<Stmt>,
  },
  Print(AstNode),
  Assign {
    target: Designator,
    value: AstNode,
  },
}

/// One declared name. `int a, b[3];` yields two of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
  pub ty: TypeTag,
  pub name: String,
  pub dims: Vec<i64>,
}

/// A whole compilation unit: declarations first, then at least one statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
  pub declarations: Vec<Declaration>,
  pub body: Vec<Stmt>,
}

/// Parse a compilation unit from the token stream.
pub fn parse(tokens: Vec<Token>, source: &str) -> CompileResult<Unit> {
  let mut stream = TokenStream::new(tokens, source);

  let declarations = parse_declarations(&mut stream)?;

  let mut body = vec![parse_stmt(&mut stream)?];
  while !stream.is_eof() {
    body.push(parse_stmt(&mut stream)?);
  }

  Ok(Unit { declarations, body })
}

fn parse_declarations(stream: &mut TokenStream) -> CompileResult<Vec<Declaration>> {
  let mut declarations = Vec::new();

  while let Some(ty) = stream.peek_keyword().and_then(TypeTag::from_keyword) {
    stream.advance();
    loop {
      let (name, _) = stream.get_ident()?;
      let mut dims = Vec::new();
      while stream.equal("[") {
        let (size, _) = stream.get_number()?;
        dims.push(size);
        stream.skip("]")?;
      }
      declarations.push(Declaration { ty, name, dims });

      if !stream.equal(",") {
        break;
      }
    }
    stream.skip(";")?;
  }

  Ok(declarations)
}

fn parse_stmt(stream: &mut TokenStream) -> CompileResult<Stmt> {
  stream.enter()?;
  let stmt = parse_stmt_body(stream);
  stream.leave();
  stmt
}

fn parse_stmt_body(stream: &mut TokenStream) -> CompileResult<Stmt> {
  if stream.equal("{") {
    let mut stmts = Vec::new();
    while !stream.equal("}") {
      if stream.is_eof() {
        return Err(stream.unexpected("\"}\""));
      }
      stmts.push(parse_stmt(stream)?);
    }
    return Ok(Stmt::Block(stmts));
  }

  if stream.equal_keyword("if") {
    let cond = parse_condition(stream)?;
    let then = Box::new(parse_stmt(stream)?);
    // A trailing `else` always attaches to the innermost open `if`.
    let otherwise = if stream.equal_keyword("else") {
      Some(Box::new(parse_stmt(stream)?))
    } else {
      None
    };
    return Ok(Stmt::If {
      cond,
      then,
      otherwise,
    });
  }

  if stream.equal_keyword("while") {
    let cond = parse_condition(stream)?;
    let body = Box::new(parse_stmt(stream)?);
    return Ok(Stmt::While { cond, body });
  }

  if stream.equal_keyword("print") {
    let expr = parse_expr(stream)?;
    stream.skip(";")?;
    return Ok(Stmt::Print(expr));
  }

  if matches!(stream.peek().map(|token| token.kind), Some(TokenKind::Ident)) {
    let target = parse_designator(stream)?;
    stream.skip("=")?;
    let value = parse_expr(stream)?;
    stream.skip(";")?;
    return Ok(Stmt::Assign { target, value });
  }

  Err(stream.unexpected("a statement"))
}

fn parse_condition(stream: &mut TokenStream) -> CompileResult<AstNode> {
  stream.skip("(")?;
  let cond = parse_expr(stream)?;
  stream.skip(")")?;
  Ok(cond)
}

fn parse_designator(stream: &mut TokenStream) -> CompileResult<Designator> {
  let (name, _) = stream.get_ident()?;
  let mut indices = Vec::new();

  while stream.equal("[") {
    let negative = stream.equal("-");
    let index = match stream.peek().map(|token| token.kind) {
      Some(TokenKind::Int) => {
        let (text, _) = stream.get_literal()?;
        Index::Int(if negative { format!("-{text}") } else { text })
      }
      Some(TokenKind::Ident) if !negative => Index::Var(stream.get_ident()?.0),
      _ => return Err(stream.unexpected("an integer or identifier subscript")),
    };
    indices.push(index);
    stream.skip("]")?;
  }

  Ok(Designator { name, indices })
}

fn parse_expr(stream: &mut TokenStream) -> CompileResult<AstNode> {
  parse_or(stream)
}

fn parse_or(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let mut node = parse_and(stream)?;
  let mut links = 0;

  while stream.equal("|") {
    stream.extend_chain()?;
    links += 1;
    let rhs = parse_and(stream)?;
    node = AstNode::binary(BinaryOp::Or, node, rhs);
  }

  stream.release_chain(links);
  Ok(node)
}

fn parse_and(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let mut node = parse_relational(stream)?;
  let mut links = 0;

  while stream.equal("&") {
    stream.extend_chain()?;
    links += 1;
    let rhs = parse_relational(stream)?;
    node = AstNode::binary(BinaryOp::And, node, rhs);
  }

  stream.release_chain(links);
  Ok(node)
}

fn parse_relational(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let node = parse_add(stream)?;

  let Some(op) = stream.peek_punct().and_then(BinaryOp::relational) else {
    return Ok(node);
  };
  stream.advance();
  let rhs = parse_add(stream)?;

  if let Some(symbol) = stream.peek_punct()
    && BinaryOp::relational(symbol).is_some()
  {
    return Err(stream.error_here(format!(
      "relational operator \"{symbol}\" cannot be chained; add parentheses"
    )));
  }

  Ok(AstNode::binary(op, node, rhs))
}

fn parse_add(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let mut node = parse_mul(stream)?;
  let mut links = 0;

  loop {
    let op = match stream.peek_punct() {
      Some("+") => BinaryOp::Add,
      Some("-") => BinaryOp::Sub,
      _ => break,
    };

    stream.advance();
    stream.extend_chain()?;
    links += 1;
    let rhs = parse_mul(stream)?;
    node = AstNode::binary(op, node, rhs);
  }

  stream.release_chain(links);
  Ok(node)
}

fn parse_mul(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let mut node = parse_unary(stream)?;
  let mut links = 0;

  loop {
    let op = match stream.peek_punct() {
      Some("*") => BinaryOp::Mul,
      Some("/") => BinaryOp::Div,
      _ => break,
    };

    stream.advance();
    stream.extend_chain()?;
    links += 1;
    let rhs = parse_unary(stream)?;
    node = AstNode::binary(op, node, rhs);
  }

  stream.release_chain(links);
  Ok(node)
}

fn parse_unary(stream: &mut TokenStream) -> CompileResult<AstNode> {
  stream.enter()?;
  let node = parse_prefix(stream);
  stream.leave();
  node
}

fn parse_prefix(stream: &mut TokenStream) -> CompileResult<AstNode> {
  if stream.equal("-") {
    if let Some(token) = stream.peek()
      && matches!(token.kind, TokenKind::Int | TokenKind::Double)
    {
      let literal = format!("-{}", token_text(token, stream.source));
      stream.advance();
      return Ok(AstNode::number(literal));
    }
    let operand = parse_unary(stream)?;
    return Ok(AstNode::unary(UnaryOp::Neg, operand));
  }

  if stream.equal("!") {
    let operand = parse_unary(stream)?;
    return Ok(AstNode::unary(UnaryOp::Not, operand));
  }

  parse_primary(stream)
}

fn parse_primary(stream: &mut TokenStream) -> CompileResult<AstNode> {
  if stream.equal("(") {
    let node = parse_expr(stream)?;
    stream.skip(")")?;
    return Ok(node);
  }

  match stream.peek().map(|token| token.kind) {
    Some(TokenKind::Int | TokenKind::Double) => Ok(AstNode::number(stream.get_literal()?.0)),
    Some(TokenKind::Ident) => Ok(AstNode::var(parse_designator(stream)?)),
    _ => Err(stream.unexpected("an expression")),
  }
}

/// Deepest statement/expression nesting accepted before bailing out with a
/// diagnostic instead of exhausting the stack.
pub const MAX_NESTING: usize = 128;

/// Longest run of binary operators at a single nesting level.
pub const MAX_OPERATOR_CHAIN: usize = 512;

/// Lightweight cursor over the token vector.
struct TokenStream<'a> {
  tokens: Vec<Token>,
  source: &'a str,
  pos: usize,
  depth: usize,
  chain: usize,
}

impl<'a> TokenStream<'a> {
  /// Take ownership of the token stream; the parser will advance `pos` as it consumes input.
  fn new(tokens: Vec<Token>, source: &'a str) -> Self {
    Self {
      tokens,
      source,
      pos: 0,
      depth: 0,
      chain: 0,
    }
  }

  /// Open one level of recursive nesting.
  fn enter(&mut self) -> CompileResult<()> {
    if self.depth >= MAX_NESTING {
      return Err(self.error_here(format!(
        "nesting too deep (more than {MAX_NESTING} levels)"
      )));
    }
    self.depth += 1;
    Ok(())
  }

  fn leave(&mut self) {
    self.depth = self.depth.saturating_sub(1);
  }

  /// Account for one more left-nested binary node in the tree being built.
  fn extend_chain(&mut self) -> CompileResult<()> {
    if self.chain >= MAX_OPERATOR_CHAIN {
      return Err(self.error_here(format!(
        "expression too long (more than {MAX_OPERATOR_CHAIN} chained operators)"
      )));
    }
    self.chain += 1;
    Ok(())
  }

  fn release_chain(&mut self, links: usize) {
    self.chain = self.chain.saturating_sub(links);
  }

  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  fn advance(&mut self) {
    if self.pos < self.tokens.len() {
      self.pos += 1;
    }
  }

  /// Text of the current token when it is a punctuator.
  fn peek_punct(&self) -> Option<&'a str> {
    self
      .peek()
      .filter(|token| token.kind == TokenKind::Punctuator)
      .map(|token| token_text(token, self.source))
  }

  fn peek_keyword(&self) -> Option<&'a str> {
    self
      .peek()
      .filter(|token| token.kind == TokenKind::Keyword)
      .map(|token| token_text(token, self.source))
  }

  /// Consume the current token if it matches the provided punctuator.
  fn equal(&mut self, op: &str) -> bool {
    if self.peek_punct() == Some(op) {
      self.pos += 1;
      return true;
    }
    false
  }

  /// Consume the current token if it is the given keyword.
  fn equal_keyword(&mut self, keyword: &str) -> bool {
    if self.peek_keyword() == Some(keyword) {
      self.pos += 1;
      return true;
    }
    false
  }

  fn skip(&mut self, s: &str) -> CompileResult<()> {
    if self.equal(s) {
      Ok(())
    } else {
      Err(self.unexpected(&format!("\"{s}\"")))
    }
  }

  /// Parse the current token as an integer literal returning its value and location.
  fn get_number(&mut self) -> CompileResult<(i64, usize)> {
    if let Some(token) = self.peek()
      && token.kind == TokenKind::Int
    {
      let loc = token.loc;
      let value = token_text(token, self.source)
        .parse::<i64>()
        .map_err(|err| CompileError::at(self.source, loc, format!("invalid number: {err}")))?;
      self.pos += 1;
      return Ok((value, loc));
    }

    Err(self.unexpected("an integer literal"))
  }

  /// Take the current integer or double literal as written.
  fn get_literal(&mut self) -> CompileResult<(String, usize)> {
    if let Some(token) = self.peek()
      && matches!(token.kind, TokenKind::Int | TokenKind::Double)
    {
      let text = token_text(token, self.source).to_string();
      let loc = token.loc;
      self.pos += 1;
      return Ok((text, loc));
    }

    Err(self.unexpected("a numeric literal"))
  }

  /// Parse the current token as an identifier.
  fn get_ident(&mut self) -> CompileResult<(String, usize)> {
    if let Some(token) = self.peek()
      && token.kind == TokenKind::Ident
    {
      let ident = token_text(token, self.source).to_string();
      let loc = token.loc;
      self.pos += 1;
      return Ok((ident, loc));
    }

    Err(self.unexpected("an identifier"))
  }

  fn is_eof(&self) -> bool {
    matches!(self.peek().map(|token| token.kind), Some(TokenKind::Eof) | None)
  }

  /// Error anchored at the current token.
  fn error_here(&self, message: String) -> CompileError {
    let loc = self.peek().map_or(self.source.len(), |token| token.loc);
    CompileError::at(self.source, loc, message)
  }

  /// Syntax error for a token that cannot continue the current derivation.
  fn unexpected(&self, expected: &str) -> CompileError {
    let token = self.peek();
    let message = match token {
      Some(t) if t.kind != TokenKind::Eof => format!(
        "unexpected {} \"{}\", expected {expected}",
        t.kind.category(),
        describe_token(token, self.source)
      ),
      _ => format!("unexpected end of input, expected {expected}"),
    };
    self.error_here(message)
  }
}
