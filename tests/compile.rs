use std::collections::HashMap;

use stackgen::labels::canonicalize;
use stackgen::{CompileError, CompileOptions, Instruction, compile, compile_with, generate_code};

fn lines(source: &str) -> Vec<String> {
  generate_code(source)
    .unwrap()
    .lines()
    .map(|line| line.trim().to_string())
    .collect()
}

fn instructions(source: &str) -> Vec<Instruction> {
  compile(source).unwrap().program.into_instructions()
}

/// Label numbers in the order they first appear, definitions and jumps alike.
fn first_occurrences(code: &[Instruction]) -> Vec<usize> {
  let mut seen = Vec::new();
  for label in code.iter().filter_map(Instruction::label) {
    if !seen.contains(&label.0) {
      seen.push(label.0);
    }
  }
  seen
}

fn assert_referentially_complete(code: &[Instruction]) {
  let mut definitions: HashMap<usize, usize> = HashMap::new();
  for inst in code.iter().filter(|inst| inst.is_label()) {
    if let Some(label) = inst.label() {
      *definitions.entry(label.0).or_default() += 1;
    }
  }
  for jump in code.iter().filter(|inst| inst.is_jump()) {
    let target = jump.label().map(|label| label.0).unwrap_or_default();
    assert_eq!(definitions.get(&target), Some(&1), "{jump}");
  }
}

const NESTED: &str = "int i, j, m[4][4];
i = 0;
while (i < 4) {
  j = 0;
  while (j < 4) {
    if (i == j) m[i][j] = 1; else { m[i][j] = 0; }
    if (m[i][j] > 0 & !(i < 1)) print m[i][j];
    j = j + 1;
  }
  i = i + 1;
}
print -1;
";

#[test]
fn counting_loop_matches_reference_listing() {
  let source = "int a, b;\na = 10;\nb = 0;\nwhile (a < 10) { a = a + 1; }";
  assert_eq!(
    lines(source),
    vec![
      "INT a",
      "INT b",
      "EVAL 10",
      "ASS a",
      "EVAL 0",
      "ASS b",
      "L1:",
      "EVAL a 10 <",
      "GOTOF L2",
      "EVAL a 1 +",
      "ASS a",
      "GOTO L1",
      "L2: END",
    ]
  );
}

#[test]
fn if_else_jumps_over_else_block() {
  let source = "int a;\nif (a > 0) { print(a); } else { print(0); }";
  assert_eq!(
    lines(source),
    vec![
      "INT a",
      "EVAL a 0 >",
      "GOTOF L1",
      "PRINT a",
      "GOTO L2",
      "L1:",
      "PRINT 0",
      "L2: END",
    ]
  );
  let prints = instructions(source)
    .iter()
    .filter(|inst| matches!(inst, Instruction::Print(_)))
    .count();
  assert_eq!(prints, 2);
}

#[test]
fn nested_loops_use_four_dense_labels() {
  let code = instructions("while (c1) { while (c2) { print(1); } }");
  assert_eq!(first_occurrences(&code), vec![1, 2, 3, 4]);
  assert_referentially_complete(&code);
  assert_eq!(
    generate_code("while (c1) { while (c2) { print(1); } }").unwrap(),
    "L1:\n    EVAL c1\n    GOTOF L2\nL3:\n    EVAL c2\n    GOTOF L4\n    PRINT 1\n    GOTO L3\nL4:\n    GOTO L1\nL2: END\n"
  );
}

#[test]
fn labels_are_dense_in_first_occurrence_order() {
  let code = instructions(NESTED);
  let labels = first_occurrences(&code);
  let expected: Vec<usize> = (1..=labels.len()).collect();
  assert_eq!(labels, expected);
  assert_eq!(labels.len(), 2 * 2 + 2 + 1);
  assert_referentially_complete(&code);
}

#[test]
fn canonical_output_is_a_fixed_point() {
  let code = instructions(NESTED);
  let mut again = code.clone();
  canonicalize(&mut again).unwrap();
  assert_eq!(code, again);
}

#[test]
fn canonicalization_preserves_instruction_count() {
  let code = instructions(NESTED);
  // 3 declarations, 6 assignments, 2 prints, plus the control-flow
  // overhead: 5 per while, 5 per if/else, 3 per if.
  let expected = 3 + 2 * 6 + 2 + 5 * 2 + 5 + 3;
  assert_eq!(code.len(), expected);
}

#[test]
fn expressions_render_postfix() {
  let code = instructions(NESTED);
  let evals: Vec<&str> = code
    .iter()
    .filter_map(|inst| match inst {
      Instruction::Eval(expr) => Some(expr.as_str()),
      _ => None,
    })
    .collect();
  assert!(evals.contains(&"i j =="));
  assert!(evals.contains(&"m[i][j] 0 > i 1 < ! &"));
  assert!(code.contains(&Instruction::Print("-1".to_string())));
  assert!(code.contains(&Instruction::Assign("m[i][j]".to_string())));
}

#[test]
fn unrecognised_character_is_silently_dropped() {
  let compiled = compile("int a;\na = 1 @ ;\nprint a;").unwrap();
  assert_eq!(compiled.skipped.len(), 1);
  assert_eq!(compiled.skipped[0].ch, '@');
  assert_eq!(compiled.skipped[0].line, 2);
  assert_eq!(
    compiled.program.to_string(),
    "    INT a\n    EVAL 1\n    ASS a\n    PRINT a END\n"
  );
}

#[test]
fn strict_mode_rejects_unrecognised_character() {
  let options = CompileOptions {
    strict_lexing: true,
  };
  let err = compile_with("int a;\na = 1 @ ;\nprint a;", &options).unwrap_err();
  assert!(matches!(err, CompileError::InvalidCharacter { ch: '@', .. }));
  assert_eq!(err.line(), Some(2));
}

#[test]
fn dangling_if_is_a_syntax_error_with_its_line() {
  let source = "int a;\na = 1;\nif (a > 0 {\n  print a;\n}\n";
  let err = compile(source).unwrap_err();
  assert!(matches!(err, CompileError::Syntax { .. }));
  assert_eq!(err.line(), Some(3));
  assert_eq!(
    err.to_string(),
    "3:11: unexpected punctuator \"{\", expected \")\"\nif (a > 0 {\n          ^"
  );
  assert!(generate_code(source).is_err());
}

#[test]
fn repeated_compilations_do_not_share_labels() {
  let source = "if (a) print a; while (b) b = b - 1;";
  let first = generate_code(source).unwrap();
  let second = generate_code(source).unwrap();
  assert_eq!(first, second);
  assert!(first.starts_with("    EVAL a\n    GOTOF L1\n"));
}

#[test]
fn comments_do_not_reach_the_output() {
  let source = "// header\ndouble x; // scalar\nx = 1.5e2 / 2; // halve\n";
  assert_eq!(lines(source), vec!["DOUBLE x", "EVAL 1.5e2 2 /", "ASS x END"]);
}

#[test]
fn literals_render_as_written_everywhere() {
  assert_eq!(lines("m[007] = 007;"), vec!["EVAL 007", "ASS m[007] END"]);
  assert_eq!(lines("print 99999999999999999999;"), vec!["PRINT 99999999999999999999 END"]);
  assert_eq!(lines("x[-1] = x[-2] - 1;"), vec!["EVAL x[-2] 1 -", "ASS x[-1] END"]);
}

#[test]
fn runaway_nesting_is_a_diagnostic_not_a_crash() {
  let n = 50_000;
  for source in [
    format!("x = {}1{};", "(".repeat(n), ")".repeat(n)),
    format!("{}print 1;{}", "{".repeat(n), "}".repeat(n)),
  ] {
    let err = generate_code(&source).unwrap_err();
    assert!(matches!(err, CompileError::Syntax { .. }));
    assert_eq!(err.line(), Some(1));
  }
}

#[test]
fn moderate_nesting_compiles_end_to_end() {
  let n = stackgen::parser::MAX_NESTING / 4;
  let source = format!(
    "{}x = {}1{};{}",
    "while (a) {".repeat(n),
    "(".repeat(n),
    ")".repeat(n),
    "}".repeat(n)
  );
  let code = instructions(&source);
  assert_eq!(first_occurrences(&code).len(), 2 * n);
  assert_referentially_complete(&code);
}
