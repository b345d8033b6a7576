//! DNS domain names.
//!
//! A domain name is a sequence of labels, stored here in uncompressed wire
//! format (length-prefixed labels, terminated by the zero-length root
//! label). Comparison and hashing are case-insensitive per RFC 1035; the
//! trailing dot is always implied, so `foo.` and `foo` parse to the same
//! name.
//!
//! Two predicates drive the resolver: [`Name::is_subdomain_of`] decides
//! whether an owner lies inside a zone (the in-zone / bailiwick test), and
//! [`Name::parent`] strips the leftmost label (the root is its own parent).

use crate::error::{Error, Result};
use crate::{MAX_LABEL_LENGTH, MAX_NAME_LENGTH};
use bytes::BytesMut;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Maximum number of compression pointer jumps while parsing a single name.
const MAX_COMPRESSION_JUMPS: usize = 64;

/// A fully qualified DNS domain name.
///
/// Most names fit inline; the backing storage only spills to the heap for
/// names longer than 64 bytes of wire format.
#[derive(Clone)]
pub struct Name {
    /// Uncompressed wire format, always ending with the root label (0x00).
    wire: SmallVec<[u8; 64]>,
    /// Number of labels, not counting the root.
    labels: u8,
}

impl Name {
    /// Returns the root name (`.`).
    pub fn root() -> Self {
        Self {
            wire: SmallVec::from_slice(&[0]),
            labels: 0,
        }
    }

    /// Returns true if this is the root name.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.labels == 0
    }

    /// Returns the number of labels, excluding the root.
    #[inline]
    pub fn label_count(&self) -> usize {
        self.labels as usize
    }

    /// Returns the uncompressed wire format, including the root label.
    #[inline]
    pub fn as_wire(&self) -> &[u8] {
        &self.wire
    }

    /// Returns the wire format length.
    #[inline]
    pub fn wire_len(&self) -> usize {
        self.wire.len()
    }

    /// Returns an iterator over the labels, leftmost first, excluding the
    /// root label.
    pub fn labels(&self) -> LabelIter<'_> {
        LabelIter {
            wire: &self.wire,
            pos: 0,
        }
    }

    /// Returns the name with its leftmost label removed.
    ///
    /// The root is its own parent.
    pub fn parent(&self) -> Self {
        if self.is_root() {
            return self.clone();
        }
        let skip = 1 + self.wire[0] as usize;
        Self {
            wire: SmallVec::from_slice(&self.wire[skip..]),
            labels: self.labels - 1,
        }
    }

    /// Returns true if `self` equals `zone` or ends in `zone` at a label
    /// boundary. Comparison is case-insensitive.
    ///
    /// This is the in-zone predicate: the bailiwick filter and the
    /// authority boundary check are both phrased in terms of it.
    pub fn is_subdomain_of(&self, zone: &Name) -> bool {
        if self.labels < zone.labels {
            return false;
        }
        let mut name = self.clone();
        for _ in 0..(self.labels - zone.labels) {
            name = name.parent();
        }
        name == *zone
    }

    /// Returns a copy with all ASCII letters lowercased.
    #[must_use]
    pub fn lowercased(&self) -> Self {
        let mut copy = self.clone();
        for byte in copy.wire.iter_mut() {
            byte.make_ascii_lowercase();
        }
        copy
    }

    /// Writes the name in uncompressed wire format.
    pub fn write_wire(&self, buf: &mut BytesMut) {
        buf.extend_from_slice(&self.wire);
    }

    /// Renders the name in presentation format (`www.example.com.`).
    pub fn to_presentation(&self) -> CompactString {
        if self.is_root() {
            return CompactString::new(".");
        }
        let mut out = CompactString::new("");
        for label in self.labels() {
            for &byte in label {
                if byte.is_ascii_graphic() && byte != b'.' && byte != b'\\' {
                    out.push(byte as char);
                } else {
                    out.push('\\');
                    out.push_str(&format!("{byte:03}"));
                }
            }
            out.push('.');
        }
        out
    }

    /// Validates an uncompressed wire-format name and counts its labels.
    fn validate(wire: &[u8]) -> Result<u8> {
        if wire.len() > MAX_NAME_LENGTH {
            return Err(Error::NameTooLong { length: wire.len() });
        }
        let mut pos = 0;
        let mut labels = 0u8;
        loop {
            let len = *wire.get(pos).ok_or(Error::unexpected_eof(pos))? as usize;
            if len == 0 {
                if pos + 1 != wire.len() {
                    return Err(Error::invalid_data(pos, "data after root label"));
                }
                return Ok(labels);
            }
            if len > MAX_LABEL_LENGTH {
                return Err(Error::LabelTooLong { length: len });
            }
            pos += 1 + len;
            labels = labels
                .checked_add(1)
                .ok_or(Error::NameTooLong { length: wire.len() })?;
        }
    }

    /// Builds a name from uncompressed wire bytes (must end with the root
    /// label).
    pub fn from_wire(wire: &[u8]) -> Result<Self> {
        let labels = Self::validate(wire)?;
        Ok(Self {
            wire: SmallVec::from_slice(wire),
            labels,
        })
    }
}

impl FromStr for Name {
    type Err = Error;

    /// Parses a name from dotted presentation format. A trailing dot is
    /// accepted and implied when absent.
    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || s == "." {
            return Ok(Self::root());
        }
        let s = s.strip_suffix('.').unwrap_or(s);

        let mut wire = SmallVec::<[u8; 64]>::new();
        let mut labels = 0u8;
        for part in s.split('.') {
            if part.is_empty() {
                return Err(Error::invalid_data(0, "empty label"));
            }
            if part.len() > MAX_LABEL_LENGTH {
                return Err(Error::LabelTooLong { length: part.len() });
            }
            for (i, c) in part.chars().enumerate() {
                if !c.is_ascii_alphanumeric() && c != '-' && c != '_' && c != '*' {
                    return Err(Error::InvalidLabelChar {
                        character: c,
                        position: i,
                    });
                }
            }
            wire.push(part.len() as u8);
            wire.extend_from_slice(part.as_bytes());
            if wire.len() + 1 > MAX_NAME_LENGTH {
                return Err(Error::NameTooLong {
                    length: wire.len() + 1,
                });
            }
            labels += 1;
        }
        wire.push(0);

        Ok(Self { wire, labels })
    }
}

impl PartialEq for Name {
    /// Case-insensitive comparison per DNS semantics.
    fn eq(&self, other: &Self) -> bool {
        self.wire.len() == other.wire.len()
            && self
                .wire
                .iter()
                .zip(other.wire.iter())
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.wire.iter() {
            byte.to_ascii_lowercase().hash(state);
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_presentation())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name(\"{self}\")")
    }
}

impl Default for Name {
    fn default() -> Self {
        Self::root()
    }
}

impl Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_presentation())
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Iterator over the labels of a name, excluding the root label.
pub struct LabelIter<'a> {
    wire: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for LabelIter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let len = *self.wire.get(self.pos)? as usize;
        if len == 0 {
            return None;
        }
        let start = self.pos + 1;
        self.pos = start + len;
        self.wire.get(start..start + len)
    }
}

/// Parses domain names out of a DNS message, following compression
/// pointers (RFC 1035 §4.1.4).
#[derive(Debug, Clone, Copy)]
pub struct NameParser<'a> {
    /// The complete message (pointer targets are message offsets).
    message: &'a [u8],
}

impl<'a> NameParser<'a> {
    /// Creates a parser over a complete message buffer.
    #[inline]
    pub const fn new(message: &'a [u8]) -> Self {
        Self { message }
    }

    /// Parses the name starting at `offset`.
    ///
    /// Returns the name and the number of bytes consumed at the starting
    /// position (pointer jumps do not add to the consumed count).
    pub fn parse_name(&self, offset: usize) -> Result<(Name, usize)> {
        let mut wire = SmallVec::<[u8; 64]>::new();
        let mut labels = 0u8;
        let mut pos = offset;
        let mut consumed = 0;
        let mut followed_pointer = false;
        let mut jumps = 0;

        loop {
            let len_byte = *self.message.get(pos).ok_or(Error::unexpected_eof(pos))?;

            if len_byte >= 0xC0 {
                let next = *self
                    .message
                    .get(pos + 1)
                    .ok_or(Error::unexpected_eof(pos + 1))?;
                let target = u16::from_be_bytes([len_byte & 0x3F, next]) as usize;
                // Pointers may only point backwards.
                if target >= pos {
                    return Err(Error::InvalidCompressionPointer {
                        offset: pos,
                        target,
                    });
                }
                if !followed_pointer {
                    consumed = pos - offset + 2;
                    followed_pointer = true;
                }
                jumps += 1;
                if jumps > MAX_COMPRESSION_JUMPS {
                    return Err(Error::TooManyCompressionJumps {
                        max_jumps: MAX_COMPRESSION_JUMPS,
                    });
                }
                pos = target;
                continue;
            }

            if len_byte >= 0x40 {
                return Err(Error::invalid_data(
                    pos,
                    format!("invalid label type 0x{len_byte:02X}"),
                ));
            }

            let len = len_byte as usize;
            if len == 0 {
                wire.push(0);
                if !followed_pointer {
                    consumed = pos - offset + 1;
                }
                break;
            }

            let label = self
                .message
                .get(pos + 1..pos + 1 + len)
                .ok_or(Error::unexpected_eof(pos + 1 + len))?;
            if wire.len() + 1 + len + 1 > MAX_NAME_LENGTH {
                return Err(Error::NameTooLong {
                    length: wire.len() + 1 + len + 1,
                });
            }
            wire.push(len_byte);
            wire.extend_from_slice(label);
            labels = labels.checked_add(1).ok_or(Error::NameTooLong {
                length: MAX_NAME_LENGTH + 1,
            })?;
            pos += 1 + len;
        }

        Ok((Name { wire, labels }, consumed))
    }
}
