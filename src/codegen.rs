//! Code generation: lower the parsed unit into stack-machine pseudo-assembly.
//!
//! Each statement is lowered bottom-up: children produce their instruction
//! fragments first and the enclosing construct wraps them, minting its own
//! labels only once its parts are done. Raw label numbers therefore come out
//! in reduction order rather than reading order; `labels::canonicalize`
//! renumbers them afterwards.

use std::fmt;

use log::debug;

use crate::parser::{Declaration, Stmt, Unit};
use crate::ty::TypeTag;

/// Jump target. Raw labels are placeholders; canonical ones are dense and
/// numbered by first appearance.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub usize);

impl fmt::Display for Label {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "L{}", self.0)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
  /// `INT name[d1][d2]...`
  Declare {
    ty: TypeTag,
    name: String,
    dims: Vec<i64>,
  },
  /// `EVAL <postfix expression>`
  Eval(String),
  /// `ASS <designator>`, stores the last evaluated value.
  Assign(String),
  /// `PRINT <postfix expression>`
  Print(String),
  /// Label definition.
  Label(Label),
  /// Unconditional jump.
  Goto(Label),
  /// Jump taken when the last evaluated value is false.
  GotoFalse(Label),
}

impl Instruction {
  /// The label this instruction defines or jumps to, if any.
  pub fn label(&self) -> Option<Label> {
    match self {
      Self::Label(label) | Self::Goto(label) | Self::GotoFalse(label) => Some(*label),
      _ => None,
    }
  }

  pub fn label_mut(&mut self) -> Option<&mut Label> {
    match self {
      Self::Label(label) | Self::Goto(label) | Self::GotoFalse(label) => Some(label),
      _ => None,
    }
  }

  /// Returns `true` for label definitions.
  pub fn is_label(&self) -> bool {
    matches!(self, Self::Label(..))
  }

  /// Returns `true` for `GOTO` and `GOTOF`.
  pub fn is_jump(&self) -> bool {
    matches!(self, Self::Goto(..) | Self::GotoFalse(..))
  }
}

impl fmt::Display for Instruction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Declare { ty, name, dims } => {
        write!(f, "{ty} {name}")?;
        for dim in dims {
          write!(f, "[{dim}]")?;
        }
        Ok(())
      }
      Self::Eval(expr) => write!(f, "EVAL {expr}"),
      Self::Assign(target) => write!(f, "ASS {target}"),
      Self::Print(expr) => write!(f, "PRINT {expr}"),
      Self::Label(label) => write!(f, "{label}:"),
      Self::Goto(label) => write!(f, "GOTO {label}"),
      Self::GotoFalse(label) => write!(f, "GOTOF {label}"),
    }
  }
}

/// A finished, canonicalized program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
  instructions: Vec<Instruction>,
}

impl Program {
  pub(crate) fn new(instructions: Vec<Instruction>) -> Self {
    Self { instructions }
  }

  pub fn instructions(&self) -> &[Instruction] {
    &self.instructions
  }

  pub fn into_instructions(self) -> Vec<Instruction> {
    self.instructions
  }
}

/// Label definitions sit flush left, everything else is indented. `END` is
/// glued onto the last line.
impl fmt::Display for Program {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let Some((last, init)) = self.instructions.split_last() else {
      return writeln!(f, "END");
    };

    for inst in init {
      write_line(f, inst)?;
      writeln!(f)?;
    }
    write_line(f, last)?;
    writeln!(f, " END")
  }
}

fn write_line(f: &mut fmt::Formatter<'_>, inst: &Instruction) -> fmt::Result {
  if inst.is_label() {
    write!(f, "{inst}")
  } else {
    write!(f, "    {inst}")
  }
}

/// Monotonic counter for placeholder labels. Never reused within one
/// compilation.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct LabelAllocator(usize);

impl LabelAllocator {
  pub fn next_label(&mut self) -> Label {
    let next = self.0;
    self.0 += 1;
    Label(next)
  }

  pub fn allocated(&self) -> usize {
    self.0
  }
}

/// Per-compilation emission context.
#[derive(Default, Debug)]
pub struct Emitter {
  labels: LabelAllocator,
}

impl Emitter {
  pub fn new() -> Self {
    Self::default()
  }

  /// Lower a whole unit: declarations first, then the statement list.
  pub fn emit_unit(&mut self, unit: &Unit) -> Vec<Instruction> {
    let mut code: Vec<Instruction> = unit.declarations.iter().map(emit_declaration).collect();
    for stmt in &unit.body {
      code.extend(self.emit_stmt(stmt));
    }
    code
  }

  pub fn emit_stmt(&mut self, stmt: &Stmt) -> Vec<Instruction> {
    match stmt {
      Stmt::Block(stmts) => stmts.iter().flat_map(|stmt| self.emit_stmt(stmt)).collect(),
      Stmt::Assign { target, value } => vec![
        Instruction::Eval(value.to_string()),
        Instruction::Assign(target.to_string()),
      ],
      Stmt::Print(expr) => vec![Instruction::Print(expr.to_string())],
      Stmt::If {
        cond,
        then,
        otherwise,
      } => {
        let then_code = self.emit_stmt(then);
        let else_code = otherwise.as_deref().map(|stmt| self.emit_stmt(stmt));

        let skip_then = self.labels.next_label();
        let mut code = vec![
          Instruction::Eval(cond.to_string()),
          Instruction::GotoFalse(skip_then),
        ];
        code.extend(then_code);

        match else_code {
          None => code.push(Instruction::Label(skip_then)),
          Some(else_code) => {
            let skip_else = self.labels.next_label();
            code.push(Instruction::Goto(skip_else));
            code.push(Instruction::Label(skip_then));
            code.extend(else_code);
            code.push(Instruction::Label(skip_else));
          }
        }
        code
      }
      Stmt::While { cond, body } => {
        let body_code = self.emit_stmt(body);

        let head = self.labels.next_label();
        let exit = self.labels.next_label();
        let mut code = vec![
          Instruction::Label(head),
          Instruction::Eval(cond.to_string()),
          Instruction::GotoFalse(exit),
        ];
        code.extend(body_code);
        code.push(Instruction::Goto(head));
        code.push(Instruction::Label(exit));
        code
      }
    }
  }

  pub fn labels_allocated(&self) -> usize {
    self.labels.allocated()
  }
}

fn emit_declaration(decl: &Declaration) -> Instruction {
  Instruction::Declare {
    ty: decl.ty,
    name: decl.name.clone(),
    dims: decl.dims.clone(),
  }
}

/// Emit raw instructions (placeholder labels) for a parsed unit.
pub fn generate(unit: &Unit) -> Vec<Instruction> {
  let mut emitter = Emitter::new();
  let code = emitter.emit_unit(unit);
  debug!(
    "emitted {} instructions, {} labels allocated",
    code.len(),
    emitter.labels_allocated()
  );
  code
}
