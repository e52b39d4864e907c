use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    pub symbol: String,
    pub position: [f64; 3],
}

impl Atom {
    pub fn new(symbol: impl Into<String>, position: [f64; 3]) -> Self {
        Self {
            symbol: symbol.into(),
            position,
        }
    }

    /// Hydrogen isotopes count as hydrogens.
    pub fn is_hydrogen(&self) -> bool {
        matches!(self.symbol.to_ascii_uppercase().as_str(), "H" | "D" | "T")
    }
}

/// Bond between two atoms of the same pose, stored with `i <= j`.
///
/// `order` follows the CTfile convention: 1, 2, 3 for single, double and
/// triple bonds and 4 for aromatic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bond {
    pub i: usize,
    pub j: usize,
    pub order: u8,
}

impl Bond {
    pub fn new(idx1: usize, idx2: usize, order: u8) -> Self {
        if idx1 <= idx2 {
            Self { i: idx1, j: idx2, order }
        } else {
            Self { i: idx2, j: idx1, order }
        }
    }
}
