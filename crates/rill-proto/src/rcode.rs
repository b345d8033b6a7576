//! DNS response codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A DNS response code (the 4-bit header RCODE; no EDNS extension).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseCode {
    /// No error (0).
    NoError,
    /// Format error (1) - the server could not interpret the query.
    FormErr,
    /// Server failure (2).
    ServFail,
    /// Non-existent domain (3).
    NXDomain,
    /// Not implemented (4).
    NotImp,
    /// Query refused (5).
    Refused,
    /// Any other 4-bit code.
    Other(u8),
}

impl ResponseCode {
    /// Converts from the 4-bit header value.
    pub fn from_u8(value: u8) -> Self {
        match value & 0x0F {
            0 => Self::NoError,
            1 => Self::FormErr,
            2 => Self::ServFail,
            3 => Self::NXDomain,
            4 => Self::NotImp,
            5 => Self::Refused,
            other => Self::Other(other),
        }
    }

    /// Converts to the 4-bit header value.
    pub fn to_u8(self) -> u8 {
        match self {
            Self::NoError => 0,
            Self::FormErr => 1,
            Self::ServFail => 2,
            Self::NXDomain => 3,
            Self::NotImp => 4,
            Self::Refused => 5,
            Self::Other(code) => code & 0x0F,
        }
    }

    /// Returns true for NOERROR.
    #[inline]
    pub fn is_success(self) -> bool {
        self == Self::NoError
    }

    /// Returns true for NXDOMAIN.
    #[inline]
    pub fn is_nxdomain(self) -> bool {
        self == Self::NXDomain
    }
}

impl Default for ResponseCode {
    fn default() -> Self {
        Self::NoError
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoError => write!(f, "NOERROR"),
            Self::FormErr => write!(f, "FORMERR"),
            Self::ServFail => write!(f, "SERVFAIL"),
            Self::NXDomain => write!(f, "NXDOMAIN"),
            Self::NotImp => write!(f, "NOTIMP"),
            Self::Refused => write!(f, "REFUSED"),
            Self::Other(code) => write!(f, "RCODE{code}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        for code in 0u8..16 {
            assert_eq!(ResponseCode::from_u8(code).to_u8(), code);
        }
    }

    #[test]
    fn test_helpers() {
        assert!(ResponseCode::NoError.is_success());
        assert!(ResponseCode::NXDomain.is_nxdomain());
        assert!(!ResponseCode::ServFail.is_success());
    }
}
