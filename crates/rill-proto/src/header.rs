//! DNS message header.
//!
//! The fixed 12-byte structure at the start of every DNS message: id,
//! flags, opcode, rcode, and the four section counts.

use crate::error::{Error, Result};
use crate::rcode::ResponseCode;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of the DNS header in bytes.
pub const HEADER_SIZE: usize = 12;

bitflags! {
    /// DNS header flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct HeaderFlags: u16 {
        /// Query/Response: 0 = query, 1 = response.
        const QR = 0x8000;
        /// Authoritative Answer.
        const AA = 0x0400;
        /// Truncation.
        const TC = 0x0200;
        /// Recursion Desired.
        const RD = 0x0100;
        /// Recursion Available.
        const RA = 0x0080;
    }
}

impl Default for HeaderFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// DNS message header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Message identifier for matching requests to responses.
    pub id: u16,
    /// Header flags.
    pub flags: HeaderFlags,
    /// Operation code (4-bit; 0 = standard query).
    pub opcode: u8,
    /// Response code.
    pub rcode: ResponseCode,
    /// Number of questions.
    pub qd_count: u16,
    /// Number of answer records.
    pub an_count: u16,
    /// Number of authority records.
    pub ns_count: u16,
    /// Number of additional records.
    pub ar_count: u16,
}

impl Header {
    /// Creates a new header with the given message ID and no flags.
    pub const fn new(id: u16) -> Self {
        Self {
            id,
            flags: HeaderFlags::empty(),
            opcode: 0,
            rcode: ResponseCode::NoError,
            qd_count: 0,
            an_count: 0,
            ns_count: 0,
            ar_count: 0,
        }
    }

    /// Creates a one-shot query header with a fresh random ID.
    pub fn query() -> Self {
        let mut header = Self::new(rand::random());
        header.qd_count = 1;
        header
    }

    /// Creates a response header from a query header: same id and opcode,
    /// QR set, RD echoed.
    pub fn response_from(query: &Header) -> Self {
        Self {
            id: query.id,
            flags: HeaderFlags::QR | (query.flags & HeaderFlags::RD),
            opcode: query.opcode,
            rcode: ResponseCode::NoError,
            qd_count: query.qd_count,
            an_count: 0,
            ns_count: 0,
            ar_count: 0,
        }
    }

    /// Returns true if this is a response.
    #[inline]
    pub fn is_response(&self) -> bool {
        self.flags.contains(HeaderFlags::QR)
    }

    /// Returns true if the AA flag is set.
    #[inline]
    pub fn is_authoritative(&self) -> bool {
        self.flags.contains(HeaderFlags::AA)
    }

    /// Returns true if the TC flag is set.
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.flags.contains(HeaderFlags::TC)
    }

    /// Returns true if the RD flag is set.
    #[inline]
    pub fn recursion_desired(&self) -> bool {
        self.flags.contains(HeaderFlags::RD)
    }

    /// Returns true if the RA flag is set.
    #[inline]
    pub fn recursion_available(&self) -> bool {
        self.flags.contains(HeaderFlags::RA)
    }

    /// Sets or clears the AA flag.
    #[inline]
    pub fn set_authoritative(&mut self, aa: bool) {
        self.flags.set(HeaderFlags::AA, aa);
    }

    /// Sets or clears the TC flag.
    #[inline]
    pub fn set_truncated(&mut self, tc: bool) {
        self.flags.set(HeaderFlags::TC, tc);
    }

    /// Sets or clears the RA flag.
    #[inline]
    pub fn set_recursion_available(&mut self, ra: bool) {
        self.flags.set(HeaderFlags::RA, ra);
    }

    /// Parses a header from the front of a message.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::buffer_too_short(HEADER_SIZE, data.len()));
        }

        let id = u16::from_be_bytes([data[0], data[1]]);
        let raw = u16::from_be_bytes([data[2], data[3]]);

        let opcode = ((raw >> 11) & 0x0F) as u8;
        let rcode = ResponseCode::from_u8((raw & 0x0F) as u8);
        let flags = HeaderFlags::from_bits_truncate(raw);

        Ok(Self {
            id,
            flags,
            opcode,
            rcode,
            qd_count: u16::from_be_bytes([data[4], data[5]]),
            an_count: u16::from_be_bytes([data[6], data[7]]),
            ns_count: u16::from_be_bytes([data[8], data[9]]),
            ar_count: u16::from_be_bytes([data[10], data[11]]),
        })
    }

    /// Serializes the header.
    pub fn to_wire(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..2].copy_from_slice(&self.id.to_be_bytes());

        let mut raw = self.flags.bits();
        raw |= u16::from(self.opcode & 0x0F) << 11;
        raw |= u16::from(self.rcode.to_u8());
        buf[2..4].copy_from_slice(&raw.to_be_bytes());

        buf[4..6].copy_from_slice(&self.qd_count.to_be_bytes());
        buf[6..8].copy_from_slice(&self.an_count.to_be_bytes());
        buf[8..10].copy_from_slice(&self.ns_count.to_be_bytes());
        buf[10..12].copy_from_slice(&self.ar_count.to_be_bytes());
        buf
    }

    /// Writes the header to a buffer.
    pub fn write_to(&self, buf: &mut bytes::BytesMut) {
        buf.extend_from_slice(&self.to_wire());
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id:{:04X} {}", self.id, self.rcode)?;
        if self.is_response() {
            write!(f, " QR")?;
        }
        if self.is_authoritative() {
            write!(f, " AA")?;
        }
        if self.is_truncated() {
            write!(f, " TC")?;
        }
        if self.recursion_desired() {
            write!(f, " RD")?;
        }
        if self.recursion_available() {
            write!(f, " RA")?;
        }
        write!(
            f,
            " qd:{} an:{} ns:{} ar:{}",
            self.qd_count, self.an_count, self.ns_count, self.ar_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let mut header = Header::new(0x1234);
        header.flags = HeaderFlags::QR | HeaderFlags::AA | HeaderFlags::RA;
        header.rcode = ResponseCode::NXDomain;
        header.qd_count = 1;
        header.an_count = 2;

        let parsed = Header::parse(&header.to_wire()).unwrap();
        assert_eq!(header, parsed);
    }

    #[test]
    fn test_response_from_query() {
        let mut query = Header::query();
        query.flags.insert(HeaderFlags::RD);

        let response = Header::response_from(&query);
        assert_eq!(response.id, query.id);
        assert!(response.is_response());
        assert!(response.recursion_desired());
        assert!(!response.is_authoritative());
    }

    #[test]
    fn test_flag_setters() {
        let mut header = Header::new(0);
        header.set_authoritative(true);
        header.set_truncated(true);
        header.set_recursion_available(true);
        assert!(header.is_authoritative());
        assert!(header.is_truncated());
        assert!(header.recursion_available());

        header.set_truncated(false);
        assert!(!header.is_truncated());
    }

    #[test]
    fn test_parse_too_short() {
        assert!(matches!(
            Header::parse(&[0u8; 10]),
            Err(Error::BufferTooShort { .. })
        ));
    }
}
