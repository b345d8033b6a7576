//! DNS record types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A DNS record type.
///
/// The variants listed by name are the types this server synthesizes
/// answers for (plus SOA, which the zone loader needs). Every other type
/// code is carried as [`RecordType::Other`] and cached/forwarded
/// transparently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// IPv4 host address (type 1).
    A,
    /// Authoritative name server (type 2).
    NS,
    /// Canonical name alias (type 5).
    CNAME,
    /// Start of authority (type 6).
    SOA,
    /// Mail exchange (type 15).
    MX,
    /// Text strings (type 16).
    TXT,
    /// Any other type, preserved by code.
    Other(u16),
}

impl RecordType {
    /// Converts from the numeric type code.
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => Self::A,
            2 => Self::NS,
            5 => Self::CNAME,
            6 => Self::SOA,
            15 => Self::MX,
            16 => Self::TXT,
            other => Self::Other(other),
        }
    }

    /// Converts to the numeric type code.
    pub fn to_u16(self) -> u16 {
        match self {
            Self::A => 1,
            Self::NS => 2,
            Self::CNAME => 5,
            Self::SOA => 6,
            Self::MX => 15,
            Self::TXT => 16,
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::NS => write!(f, "NS"),
            Self::CNAME => write!(f, "CNAME"),
            Self::SOA => write!(f, "SOA"),
            Self::MX => write!(f, "MX"),
            Self::TXT => write!(f, "TXT"),
            Self::Other(code) => write!(f, "TYPE{code}"),
        }
    }
}

impl FromStr for RecordType {
    type Err = ();

    /// Parses a mnemonic as it appears in a zone file.
    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "NS" => Ok(Self::NS),
            "CNAME" => Ok(Self::CNAME),
            "SOA" => Ok(Self::SOA),
            "MX" => Ok(Self::MX),
            "TXT" => Ok(Self::TXT),
            _ => Err(()),
        }
    }
}
