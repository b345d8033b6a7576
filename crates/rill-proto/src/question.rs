//! DNS question section.

use crate::class::RecordClass;
use crate::error::{Error, Result};
use crate::name::{Name, NameParser};
use crate::rtype::RecordType;
use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A DNS question: the name, type, and class being asked about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Question {
    /// The domain name being queried.
    pub qname: Name,
    /// The record type requested.
    pub qtype: RecordType,
    /// The query class (IN in practice).
    pub qclass: RecordClass,
}

impl Question {
    /// Creates a new question in class IN.
    #[inline]
    pub fn new(qname: Name, qtype: RecordType) -> Self {
        Self {
            qname,
            qtype,
            qclass: RecordClass::IN,
        }
    }

    /// Creates an A question.
    #[inline]
    pub fn a(qname: Name) -> Self {
        Self::new(qname, RecordType::A)
    }

    /// Creates an NS question.
    #[inline]
    pub fn ns(qname: Name) -> Self {
        Self::new(qname, RecordType::NS)
    }

    /// Creates a TXT question.
    #[inline]
    pub fn txt(qname: Name) -> Self {
        Self::new(qname, RecordType::TXT)
    }

    /// Parses a question from a message at the given offset.
    ///
    /// Returns the question and the number of bytes consumed.
    pub fn parse(data: &[u8], offset: usize) -> Result<(Self, usize)> {
        let (qname, name_len) = NameParser::new(data).parse_name(offset)?;

        let fixed = offset + name_len;
        if fixed + 4 > data.len() {
            return Err(Error::buffer_too_short(fixed + 4, data.len()));
        }

        let qtype = RecordType::from_u16(u16::from_be_bytes([data[fixed], data[fixed + 1]]));
        let qclass = RecordClass::from_u16(u16::from_be_bytes([data[fixed + 2], data[fixed + 3]]));

        Ok((
            Self {
                qname,
                qtype,
                qclass,
            },
            name_len + 4,
        ))
    }

    /// Returns the wire format length.
    pub fn wire_len(&self) -> usize {
        self.qname.wire_len() + 4
    }

    /// Writes the question to wire format.
    pub fn write_to(&self, buf: &mut BytesMut) {
        self.qname.write_wire(buf);
        buf.extend_from_slice(&self.qtype.to_u16().to_be_bytes());
        buf.extend_from_slice(&self.qclass.to_u16().to_be_bytes());
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.qname, self.qclass, self.qtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_question_roundtrip() {
        let original = Question::a(Name::from_str("www.example.com").unwrap());

        let mut buf = BytesMut::new();
        original.write_to(&mut buf);

        let (parsed, consumed) = Question::parse(&buf, 0).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_question_display() {
        let q = Question::txt(Name::from_str("txt.foo").unwrap());
        assert_eq!(q.to_string(), "txt.foo. IN TXT");
    }
}
