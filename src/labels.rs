//! Label canonicalization.
//!
//! Emission mints labels when a construct is reduced, so nested control flow
//! leaves them out of reading order (and, in general, non-contiguous). This
//! pass renumbers every label densely from 1 in the order it first appears,
//! as a definition or a reference, scanning top to bottom. Instruction order
//! and count never change, and running the pass twice is a no-op.

use std::collections::HashMap;

use log::trace;
use snafu::ensure;

use crate::codegen::{Instruction, Label};
use crate::error::{CompileResult, DuplicateLabelSnafu, UndefinedLabelSnafu};

/// Renumber the labels of `instructions` in place.
///
/// Fails if a label is referenced but never defined, or defined twice; both
/// mean the emitter broke its pairing of allocations and definitions.
pub fn canonicalize(instructions: &mut [Instruction]) -> CompileResult<()> {
  let mut mapping: HashMap<Label, Label> = HashMap::new();
  let mut first_seen = Vec::new();
  let mut definitions: HashMap<Label, usize> = HashMap::new();

  for inst in instructions.iter() {
    let Some(label) = inst.label() else {
      continue;
    };

    if !mapping.contains_key(&label) {
      let canonical = Label(mapping.len() + 1);
      trace!("{label} -> {canonical}");
      mapping.insert(label, canonical);
      first_seen.push(label);
    }

    if inst.is_label() {
      let count = definitions.entry(label).or_insert(0);
      *count += 1;
      ensure!(*count == 1, DuplicateLabelSnafu { label });
    }
  }

  for label in first_seen {
    ensure!(definitions.contains_key(&label), UndefinedLabelSnafu { label });
  }

  for inst in instructions.iter_mut() {
    if let Some(label) = inst.label_mut()
      && let Some(&canonical) = mapping.get(&*label)
    {
      *label = canonical;
    }
  }

  Ok(())
}
