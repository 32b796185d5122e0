use std::fmt;

/// Storage type attached to a declaration. Usage sites are never checked
/// against it; it only selects the declaration prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
  Int,
  Double,
}

impl TypeTag {
  /// Map a type keyword (`int`, `double`) onto its tag.
  pub fn from_keyword(keyword: &str) -> Option<Self> {
    match keyword {
      "int" => Some(Self::Int),
      "double" => Some(Self::Double),
      _ => None,
    }
  }
}

impl fmt::Display for TypeTag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Int => f.write_str("INT"),
      Self::Double => f.write_str("DOUBLE"),
    }
  }
}
