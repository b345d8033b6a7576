//! DNS record data (RDATA).
//!
//! The payload of a resource record as a tagged union. Only the types the
//! server synthesizes answers for (A, NS, CNAME, MX, TXT) plus SOA get
//! typed representations; everything else is preserved as opaque bytes and
//! round-trips through the cache untouched.

use crate::error::{Error, Result};
use crate::name::{Name, NameParser};
use crate::rtype::RecordType;
use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// SOA record payload (RFC 1035 §3.3.13).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Soa {
    /// Primary name server for the zone.
    pub mname: Name,
    /// Mailbox of the responsible person.
    pub rname: Name,
    /// Zone serial number.
    pub serial: u32,
    /// Refresh interval in seconds.
    pub refresh: u32,
    /// Retry interval in seconds.
    pub retry: u32,
    /// Expire time in seconds.
    pub expire: u32,
    /// Minimum TTL in seconds.
    pub minimum: u32,
}

/// Record payload, tagged by type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RData {
    /// IPv4 address.
    A(Ipv4Addr),
    /// Authoritative name server.
    Ns(Name),
    /// Canonical name alias target.
    Cname(Name),
    /// Start of authority.
    Soa(Soa),
    /// Mail exchange.
    Mx {
        /// Preference (lower is more preferred).
        preference: u16,
        /// The mail exchange host.
        exchange: Name,
    },
    /// Text data, held as a single string. Multi-string TXT records are
    /// concatenated on parse and re-chunked at 255 bytes on write.
    Txt(Vec<u8>),
    /// Any other record type, preserved verbatim.
    Other {
        /// The numeric record type code.
        type_code: u16,
        /// The raw RDATA bytes.
        data: Vec<u8>,
    },
}

impl RData {
    /// Parses RDATA of the given type from a message.
    ///
    /// The whole message is required because name-bearing RDATA may use
    /// compression pointers into earlier parts of it.
    pub fn parse(rtype: RecordType, message: &[u8], offset: usize, rdlength: u16) -> Result<Self> {
        let raw = message
            .get(offset..offset + rdlength as usize)
            .ok_or_else(|| Error::buffer_too_short(offset + rdlength as usize, message.len()))?;

        match rtype {
            RecordType::A => {
                let octets: [u8; 4] = raw
                    .try_into()
                    .map_err(|_| Error::invalid_rdata("A", format!("length {}", raw.len())))?;
                Ok(Self::A(Ipv4Addr::from(octets)))
            }
            RecordType::NS => {
                let (name, _) = NameParser::new(message).parse_name(offset)?;
                Ok(Self::Ns(name))
            }
            RecordType::CNAME => {
                let (name, _) = NameParser::new(message).parse_name(offset)?;
                Ok(Self::Cname(name))
            }
            RecordType::SOA => {
                let parser = NameParser::new(message);
                let (mname, mname_len) = parser.parse_name(offset)?;
                let (rname, rname_len) = parser.parse_name(offset + mname_len)?;

                let nums = offset + mname_len + rname_len;
                if nums + 20 > message.len() {
                    return Err(Error::buffer_too_short(nums + 20, message.len()));
                }
                let word = |i: usize| {
                    u32::from_be_bytes(message[nums + i..nums + i + 4].try_into().unwrap())
                };
                Ok(Self::Soa(Soa {
                    mname,
                    rname,
                    serial: word(0),
                    refresh: word(4),
                    retry: word(8),
                    expire: word(12),
                    minimum: word(16),
                }))
            }
            RecordType::MX => {
                if raw.len() < 3 {
                    return Err(Error::invalid_rdata("MX", format!("length {}", raw.len())));
                }
                let preference = u16::from_be_bytes([raw[0], raw[1]]);
                let (exchange, _) = NameParser::new(message).parse_name(offset + 2)?;
                Ok(Self::Mx {
                    preference,
                    exchange,
                })
            }
            RecordType::TXT => {
                let mut text = Vec::with_capacity(raw.len());
                let mut pos = 0;
                while pos < raw.len() {
                    let len = raw[pos] as usize;
                    pos += 1;
                    let chunk = raw.get(pos..pos + len).ok_or_else(|| {
                        Error::invalid_rdata("TXT", format!("string length {len} overruns rdata"))
                    })?;
                    text.extend_from_slice(chunk);
                    pos += len;
                }
                Ok(Self::Txt(text))
            }
            other => Ok(Self::Other {
                type_code: other.to_u16(),
                data: raw.to_vec(),
            }),
        }
    }

    /// Returns the record type matching this payload.
    pub fn record_type(&self) -> RecordType {
        match self {
            Self::A(_) => RecordType::A,
            Self::Ns(_) => RecordType::NS,
            Self::Cname(_) => RecordType::CNAME,
            Self::Soa(_) => RecordType::SOA,
            Self::Mx { .. } => RecordType::MX,
            Self::Txt(_) => RecordType::TXT,
            Self::Other { type_code, .. } => RecordType::from_u16(*type_code),
        }
    }

    /// Returns the wire format length.
    pub fn wire_len(&self) -> usize {
        match self {
            Self::A(_) => 4,
            Self::Ns(name) | Self::Cname(name) => name.wire_len(),
            Self::Soa(soa) => soa.mname.wire_len() + soa.rname.wire_len() + 20,
            Self::Mx { exchange, .. } => 2 + exchange.wire_len(),
            Self::Txt(text) => {
                if text.is_empty() {
                    1
                } else {
                    text.chunks(255).map(|c| 1 + c.len()).sum()
                }
            }
            Self::Other { data, .. } => data.len(),
        }
    }

    /// Writes the RDATA in wire format (names uncompressed).
    pub fn write_to(&self, buf: &mut BytesMut) {
        match self {
            Self::A(addr) => buf.extend_from_slice(&addr.octets()),
            Self::Ns(name) | Self::Cname(name) => name.write_wire(buf),
            Self::Soa(soa) => {
                soa.mname.write_wire(buf);
                soa.rname.write_wire(buf);
                buf.extend_from_slice(&soa.serial.to_be_bytes());
                buf.extend_from_slice(&soa.refresh.to_be_bytes());
                buf.extend_from_slice(&soa.retry.to_be_bytes());
                buf.extend_from_slice(&soa.expire.to_be_bytes());
                buf.extend_from_slice(&soa.minimum.to_be_bytes());
            }
            Self::Mx {
                preference,
                exchange,
            } => {
                buf.extend_from_slice(&preference.to_be_bytes());
                exchange.write_wire(buf);
            }
            Self::Txt(text) => {
                if text.is_empty() {
                    buf.extend_from_slice(&[0]);
                } else {
                    for chunk in text.chunks(255) {
                        buf.extend_from_slice(&[chunk.len() as u8]);
                        buf.extend_from_slice(chunk);
                    }
                }
            }
            Self::Other { data, .. } => buf.extend_from_slice(data),
        }
    }

    /// Returns the address if this is an A record.
    pub fn as_a(&self) -> Option<Ipv4Addr> {
        match self {
            Self::A(addr) => Some(*addr),
            _ => None,
        }
    }

    /// Returns the alias target if this is a CNAME record.
    pub fn as_cname(&self) -> Option<&Name> {
        match self {
            Self::Cname(target) => Some(target),
            _ => None,
        }
    }

    /// Returns the nameserver name if this is an NS record.
    pub fn as_ns(&self) -> Option<&Name> {
        match self {
            Self::Ns(nsdname) => Some(nsdname),
            _ => None,
        }
    }
}

impl fmt::Display for RData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A(addr) => write!(f, "{addr}"),
            Self::Ns(name) | Self::Cname(name) => write!(f, "{name}"),
            Self::Soa(soa) => write!(
                f,
                "{} {} {} {} {} {} {}",
                soa.mname, soa.rname, soa.serial, soa.refresh, soa.retry, soa.expire, soa.minimum
            ),
            Self::Mx {
                preference,
                exchange,
            } => write!(f, "{preference} {exchange}"),
            Self::Txt(text) => {
                write!(f, "\"")?;
                for &byte in text {
                    if byte == b'"' || byte == b'\\' {
                        write!(f, "\\{}", byte as char)?;
                    } else if byte.is_ascii_graphic() || byte == b' ' {
                        write!(f, "{}", byte as char)?;
                    } else {
                        write!(f, "\\{byte:03}")?;
                    }
                }
                write!(f, "\"")
            }
            Self::Other { type_code, data } => write!(f, "\\# {} ({type_code})", data.len()),
        }
    }
}
