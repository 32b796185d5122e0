use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use snafu::ResultExt;
use stackgen::error::IoSnafu;
use stackgen::{CompileOptions, CompileResult, compile_with};

/// Compile a program into stack-machine pseudo-assembly.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
  /// Source file; reads stdin when omitted or `-`.
  input: Option<PathBuf>,

  /// Write the program here instead of stdout.
  #[arg(short, long)]
  output: Option<PathBuf>,

  /// Reject unrecognised characters instead of skipping them.
  #[arg(long)]
  strict: bool,

  /// Increase log verbosity (repeatable).
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,

  /// Silence all logging.
  #[arg(short, long)]
  quiet: bool,
}

fn read_source(input: Option<&PathBuf>) -> CompileResult<String> {
  match input {
    Some(path) if path.as_os_str() != "-" => fs::read_to_string(path).context(IoSnafu {
      path: path.clone(),
    }),
    _ => {
      let mut source = String::new();
      io::stdin()
        .read_to_string(&mut source)
        .context(IoSnafu { path: "<stdin>" })?;
      Ok(source)
    }
  }
}

fn run(args: &Args) -> CompileResult<()> {
  let source = read_source(args.input.as_ref())?;
  let options = CompileOptions {
    strict_lexing: args.strict,
  };
  let compiled = compile_with(&source, &options)?;

  match &args.output {
    Some(path) => fs::write(path, compiled.program.to_string()).context(IoSnafu {
      path: path.clone(),
    }),
    None => {
      print!("{}", compiled.program);
      Ok(())
    }
  }
}

fn main() {
  let args = Args::parse();

  // Warnings (skipped characters) are on by default.
  if let Err(err) = stderrlog::new()
    .module(module_path!())
    .quiet(args.quiet)
    .verbosity(1 + usize::from(args.verbose))
    .init()
  {
    eprintln!("failed to initialise logging: {err}");
  }

  if let Err(err) = run(&args) {
    eprintln!("{err}");
    process::exit(1);
  }
}
