//! Source location types

use serde::{Deserialize, Serialize};

/// Single location in source code
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_ordering() {
        assert!(Location::new(3, 9) < Location::new(4, 1));
        assert!(Location::new(4, 1) < Location::new(4, 2));
        assert_eq!(Location::new(12, 5).to_string(), "12:5");
    }
}
