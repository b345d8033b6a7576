//! DNS record classes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A DNS record class. Only IN is served; other classes are carried
/// transparently by code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordClass {
    /// Internet (class 1).
    IN,
    /// Chaos (class 3).
    CH,
    /// Hesiod (class 4).
    HS,
    /// Any other class, preserved by code.
    Other(u16),
}

impl RecordClass {
    /// Converts from the numeric class code.
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => Self::IN,
            3 => Self::CH,
            4 => Self::HS,
            other => Self::Other(other),
        }
    }

    /// Converts to the numeric class code.
    pub fn to_u16(self) -> u16 {
        match self {
            Self::IN => 1,
            Self::CH => 3,
            Self::HS => 4,
            Self::Other(code) => code,
        }
    }
}

impl Default for RecordClass {
    fn default() -> Self {
        Self::IN
    }
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IN => write!(f, "IN"),
            Self::CH => write!(f, "CH"),
            Self::HS => write!(f, "HS"),
            Self::Other(code) => write!(f, "CLASS{code}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        for code in [1u16, 3, 4, 254] {
            assert_eq!(RecordClass::from_u16(code).to_u16(), code);
        }
    }
}
