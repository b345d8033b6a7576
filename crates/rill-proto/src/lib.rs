//! # Rill DNS wire format
//!
//! DNS protocol types for the rill resolver: domain names with
//! case-insensitive semantics and compression-pointer parsing, the
//! fixed header, questions, typed RDATA for the record types the server
//! synthesizes (A, NS, CNAME, MX, TXT, SOA), opaque preservation of all
//! other types, and whole-message parse/serialize.
//!
//! ## Example
//!
//! ```rust
//! use rill_proto::{Message, Name, Question, RecordType};
//! use std::str::FromStr;
//!
//! let query = Message::query(Question::new(
//!     Name::from_str("www.example.com.").unwrap(),
//!     RecordType::A,
//! ));
//! let wire = query.to_wire();
//! let parsed = Message::parse(&wire).unwrap();
//! assert_eq!(parsed.id(), query.id());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod class;
pub mod error;
pub mod header;
pub mod message;
pub mod name;
pub mod question;
pub mod rcode;
pub mod rdata;
pub mod record;
pub mod rtype;

pub use class::RecordClass;
pub use error::{Error, Result};
pub use header::{Header, HeaderFlags};
pub use message::Message;
pub use name::Name;
pub use question::Question;
pub use rcode::ResponseCode;
pub use rdata::{RData, Soa};
pub use record::ResourceRecord;
pub use rtype::RecordType;

/// Maximum length of a DNS label (RFC 1035).
pub const MAX_LABEL_LENGTH: usize = 63;

/// Maximum wire-format length of a domain name (RFC 1035).
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum size of a DNS message this server handles (no EDNS0).
pub const MAX_MESSAGE_SIZE: usize = 65535;

/// Well-known DNS port.
pub const DNS_PORT: u16 = 53;
