//! DNS resource records.
//!
//! A resource record is the unit of DNS data: owner name, type, class,
//! TTL, and type-specific payload. Records are immutable once built; the
//! cache produces TTL-adjusted copies via [`ResourceRecord::with_ttl`].

use crate::class::RecordClass;
use crate::error::{Error, Result};
use crate::name::{Name, NameParser};
use crate::rdata::RData;
use crate::rtype::RecordType;
use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// A DNS resource record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRecord {
    name: Name,
    rtype: RecordType,
    rclass: RecordClass,
    ttl: u32,
    rdata: RData,
}

impl ResourceRecord {
    /// Creates a new resource record.
    pub fn new(name: Name, rtype: RecordType, rclass: RecordClass, ttl: u32, rdata: RData) -> Self {
        Self {
            name,
            rtype,
            rclass,
            ttl,
            rdata,
        }
    }

    /// Creates an A record in class IN.
    pub fn a(name: Name, ttl: u32, addr: Ipv4Addr) -> Self {
        Self::new(name, RecordType::A, RecordClass::IN, ttl, RData::A(addr))
    }

    /// Creates an NS record in class IN.
    pub fn ns(name: Name, ttl: u32, nsdname: Name) -> Self {
        Self::new(name, RecordType::NS, RecordClass::IN, ttl, RData::Ns(nsdname))
    }

    /// Creates a CNAME record in class IN.
    pub fn cname(name: Name, ttl: u32, target: Name) -> Self {
        Self::new(
            name,
            RecordType::CNAME,
            RecordClass::IN,
            ttl,
            RData::Cname(target),
        )
    }

    /// Creates an MX record in class IN.
    pub fn mx(name: Name, ttl: u32, preference: u16, exchange: Name) -> Self {
        Self::new(
            name,
            RecordType::MX,
            RecordClass::IN,
            ttl,
            RData::Mx {
                preference,
                exchange,
            },
        )
    }

    /// Creates a TXT record in class IN.
    pub fn txt(name: Name, ttl: u32, text: impl Into<Vec<u8>>) -> Self {
        Self::new(
            name,
            RecordType::TXT,
            RecordClass::IN,
            ttl,
            RData::Txt(text.into()),
        )
    }

    /// Returns the owner name.
    #[inline]
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Returns the record type.
    #[inline]
    pub fn rtype(&self) -> RecordType {
        self.rtype
    }

    /// Returns the record class.
    #[inline]
    pub fn rclass(&self) -> RecordClass {
        self.rclass
    }

    /// Returns the TTL in seconds.
    #[inline]
    pub const fn ttl(&self) -> u32 {
        self.ttl
    }

    /// Returns the payload.
    #[inline]
    pub fn rdata(&self) -> &RData {
        &self.rdata
    }

    /// Returns a copy with a different TTL.
    #[must_use]
    pub fn with_ttl(&self, ttl: u32) -> Self {
        let mut record = self.clone();
        record.ttl = ttl;
        record
    }

    /// Parses a record from a message at the given offset.
    ///
    /// Returns the record and the number of bytes consumed.
    pub fn parse(data: &[u8], offset: usize) -> Result<(Self, usize)> {
        let (name, name_len) = NameParser::new(data).parse_name(offset)?;

        let fixed = offset + name_len;
        if fixed + 10 > data.len() {
            return Err(Error::buffer_too_short(fixed + 10, data.len()));
        }

        let rtype = RecordType::from_u16(u16::from_be_bytes([data[fixed], data[fixed + 1]]));
        let rclass = RecordClass::from_u16(u16::from_be_bytes([data[fixed + 2], data[fixed + 3]]));
        let ttl = u32::from_be_bytes(data[fixed + 4..fixed + 8].try_into().unwrap());
        let rdlength = u16::from_be_bytes([data[fixed + 8], data[fixed + 9]]);

        let rdata = RData::parse(rtype, data, fixed + 10, rdlength)?;

        Ok((
            Self {
                name,
                rtype,
                rclass,
                ttl,
                rdata,
            },
            name_len + 10 + rdlength as usize,
        ))
    }

    /// Returns the wire format length.
    pub fn wire_len(&self) -> usize {
        self.name.wire_len() + 10 + self.rdata.wire_len()
    }

    /// Writes the record in wire format.
    pub fn write_to(&self, buf: &mut BytesMut) {
        self.name.write_wire(buf);
        buf.extend_from_slice(&self.rtype.to_u16().to_be_bytes());
        buf.extend_from_slice(&self.rclass.to_u16().to_be_bytes());
        buf.extend_from_slice(&self.ttl.to_be_bytes());
        buf.extend_from_slice(&(self.rdata.wire_len() as u16).to_be_bytes());
        self.rdata.write_to(buf);
    }
}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.name, self.ttl, self.rclass, self.rtype, self.rdata
        )
    }
}

/// Sequential parser for a record section.
#[derive(Debug)]
pub struct SectionParser<'a> {
    data: &'a [u8],
    offset: usize,
    remaining: u16,
}

impl<'a> SectionParser<'a> {
    /// Creates a parser for `count` records starting at `offset`.
    #[inline]
    pub const fn new(data: &'a [u8], offset: usize, count: u16) -> Self {
        Self {
            data,
            offset,
            remaining: count,
        }
    }

    /// Returns the offset past the last parsed record.
    #[inline]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Parses the next record, or `None` when the section is exhausted.
    pub fn next(&mut self) -> Result<Option<ResourceRecord>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let (record, consumed) = ResourceRecord::parse(self.data, self.offset)?;
        self.offset += consumed;
        self.remaining -= 1;
        Ok(Some(record))
    }
}
