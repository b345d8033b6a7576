//! # Rill zone loading
//!
//! Parses RFC 1035 master files into the served-zone model. Supported
//! syntax: `$ORIGIN` and `$TTL` directives, `@` for the origin, relative
//! owner names, `;` comments, parenthesized multi-line records (the usual
//! SOA form), and the record types A, NS, CNAME, MX, TXT, SOA.
//!
//! The origin (taken from `$ORIGIN`, or from the SOA owner when no
//! directive precedes it) is the authority boundary: a name is in-zone
//! iff it ends in the origin at a label boundary.

#![warn(missing_docs)]
#![warn(clippy::all)]

use rill_proto::{Name, RData, RecordClass, RecordType, ResourceRecord, Soa};
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::net::Ipv4Addr;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading a zone.
#[derive(Debug, Error)]
pub enum ZoneError {
    /// The file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A line failed to parse.
    #[error("zone file parse error at line {line}: {message}")]
    Parse {
        /// Line number where the error occurred.
        line: usize,
        /// Description of the error.
        message: String,
    },

    /// The parsed zone is not usable.
    #[error("invalid zone: {message}")]
    Invalid {
        /// Description of the problem.
        message: String,
    },
}

impl ZoneError {
    fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// Result type for zone operations.
pub type Result<T> = std::result::Result<T, ZoneError>;

/// The one zone this server is authoritative for.
#[derive(Debug, Clone)]
pub struct Zone {
    origin: Name,
    soa: Soa,
    default_ttl: u32,
    records: Vec<ResourceRecord>,
}

impl Zone {
    /// Loads a zone from a master file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let zone = Self::parse(file)?;
        debug!(
            origin = %zone.origin,
            records = zone.records.len(),
            "zone loaded"
        );
        Ok(zone)
    }

    /// Parses a zone from any reader.
    pub fn parse<R: Read>(reader: R) -> Result<Self> {
        Parser::default().parse(reader)
    }

    /// Returns the zone origin (the authority boundary).
    pub fn origin(&self) -> &Name {
        &self.origin
    }

    /// Returns the SOA payload.
    pub fn soa(&self) -> &Soa {
        &self.soa
    }

    /// Returns the default TTL (`$TTL`, or 3600 when absent).
    pub fn default_ttl(&self) -> u32 {
        self.default_ttl
    }

    /// Returns every record in the zone, SOA included.
    pub fn records(&self) -> &[ResourceRecord] {
        &self.records
    }

    /// Returns true if `name` is the origin or ends in it at a label
    /// boundary.
    pub fn contains(&self, name: &Name) -> bool {
        name.is_subdomain_of(&self.origin)
    }

    fn validate(&self) -> Result<()> {
        for record in &self.records {
            if record.rtype() != RecordType::CNAME {
                continue;
            }
            let clash = self.records.iter().any(|other| {
                other.name() == record.name() && other.rtype() != RecordType::CNAME
            });
            if clash {
                return Err(ZoneError::invalid(format!(
                    "CNAME at {} coexists with other records",
                    record.name()
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} records)", self.origin, self.records.len())
    }
}

/// Master-file parser state.
#[derive(Default)]
struct Parser {
    origin: Option<Name>,
    default_ttl: Option<u32>,
    last_owner: Option<Name>,
    soa: Option<Soa>,
    records: Vec<ResourceRecord>,
}

impl Parser {
    fn parse<R: Read>(mut self, reader: R) -> Result<Zone> {
        let reader = BufReader::new(reader);
        let mut pending = String::new();
        let mut depth = 0usize;
        let mut line_no = 0usize;
        let mut open_line = 0usize;

        for line in reader.lines() {
            let raw = line?;
            line_no += 1;

            let stripped = strip_comment(&raw);
            if stripped.trim().is_empty() && depth == 0 {
                continue;
            }

            let opens = stripped.matches('(').count();
            let closes = stripped.matches(')').count();

            if depth == 0 && opens > closes {
                open_line = line_no;
                pending = stripped.to_string();
                depth = opens - closes;
                continue;
            }
            if depth > 0 {
                pending.push(' ');
                pending.push_str(stripped);
                depth = (depth + opens).saturating_sub(closes);
                if depth > 0 {
                    continue;
                }
                let joined = pending.replace(['(', ')'], " ");
                pending.clear();
                self.parse_line(raw_owner_indent(&joined), &joined, open_line)?;
                continue;
            }

            let flat = stripped.replace(['(', ')'], " ");
            self.parse_line(raw_owner_indent(&raw), &flat, line_no)?;
        }

        if depth > 0 {
            return Err(ZoneError::parse(open_line, "unclosed parenthesis"));
        }

        let origin = self
            .origin
            .ok_or_else(|| ZoneError::invalid("zone has no origin ($ORIGIN or SOA owner)"))?;
        let soa = self
            .soa
            .ok_or_else(|| ZoneError::invalid("zone file missing SOA record"))?;

        let zone = Zone {
            origin,
            soa,
            default_ttl: self.default_ttl.unwrap_or(3600),
            records: self.records,
        };
        zone.validate()?;
        Ok(zone)
    }

    fn parse_line(&mut self, indent: OwnerIndent, line: &str, line_no: usize) -> Result<()> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(());
        }

        if let Some(directive) = trimmed.strip_prefix('$') {
            return self.parse_directive(directive, line_no);
        }

        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        let mut rest = &tokens[..];

        // An indented line reuses the previous owner; otherwise the first
        // token is the owner name.
        let owner = if matches!(indent, OwnerIndent::Continuation) {
            self.last_owner
                .clone()
                .ok_or_else(|| ZoneError::parse(line_no, "continuation line before any owner"))?
        } else {
            let token = rest[0];
            rest = &rest[1..];
            self.absolutize(token, line_no)?
        };

        // Optional TTL.
        let mut ttl = None;
        if let Some(&token) = rest.first() {
            if token.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                ttl = Some(parse_duration(token).map_err(|()| {
                    ZoneError::parse(line_no, format!("invalid TTL: {token}"))
                })?);
                rest = &rest[1..];
            }
        }

        // Optional class.
        if let Some(&token) = rest.first() {
            if token.eq_ignore_ascii_case("IN")
                || token.eq_ignore_ascii_case("CH")
                || token.eq_ignore_ascii_case("HS")
            {
                if !token.eq_ignore_ascii_case("IN") {
                    return Err(ZoneError::parse(line_no, "only class IN is supported"));
                }
                rest = &rest[1..];
            }
        }

        let type_token = rest
            .first()
            .ok_or_else(|| ZoneError::parse(line_no, "missing record type"))?;
        let rtype = RecordType::from_str(type_token)
            .map_err(|()| ZoneError::parse(line_no, format!("unknown record type: {type_token}")))?;
        rest = &rest[1..];

        let rdata = self.parse_rdata(rtype, rest, line_no)?;
        let ttl = ttl.or(self.default_ttl).unwrap_or(3600);

        if let RData::Soa(soa) = &rdata {
            if self.origin.is_none() {
                self.origin = Some(owner.clone());
            }
            self.soa = Some(soa.clone());
        }

        self.last_owner = Some(owner.clone());
        self.records.push(ResourceRecord::new(
            owner,
            rtype,
            RecordClass::IN,
            ttl,
            rdata,
        ));
        Ok(())
    }

    fn parse_directive(&mut self, directive: &str, line_no: usize) -> Result<()> {
        let tokens: Vec<&str> = directive.split_whitespace().collect();
        let keyword = tokens
            .first()
            .ok_or_else(|| ZoneError::parse(line_no, "empty directive"))?;
        match keyword.to_ascii_uppercase().as_str() {
            "ORIGIN" => {
                let name = tokens
                    .get(1)
                    .ok_or_else(|| ZoneError::parse(line_no, "$ORIGIN requires a name"))?;
                if !name.ends_with('.') {
                    return Err(ZoneError::parse(line_no, "$ORIGIN must be absolute"));
                }
                self.origin = Some(Name::from_str(name).map_err(|e| {
                    ZoneError::parse(line_no, format!("bad $ORIGIN name: {e}"))
                })?);
            }
            "TTL" => {
                let value = tokens
                    .get(1)
                    .ok_or_else(|| ZoneError::parse(line_no, "$TTL requires a value"))?;
                self.default_ttl = Some(parse_duration(value).map_err(|()| {
                    ZoneError::parse(line_no, format!("invalid $TTL value: {value}"))
                })?);
            }
            other => {
                return Err(ZoneError::parse(
                    line_no,
                    format!("unsupported directive: ${other}"),
                ));
            }
        }
        Ok(())
    }

    fn parse_rdata(&self, rtype: RecordType, tokens: &[&str], line_no: usize) -> Result<RData> {
        let arg = |i: usize| -> Result<&str> {
            tokens
                .get(i)
                .copied()
                .ok_or_else(|| ZoneError::parse(line_no, format!("{rtype} record is incomplete")))
        };

        match rtype {
            RecordType::A => {
                let addr = Ipv4Addr::from_str(arg(0)?).map_err(|e| {
                    ZoneError::parse(line_no, format!("bad A address: {e}"))
                })?;
                Ok(RData::A(addr))
            }
            RecordType::NS => Ok(RData::Ns(self.absolutize(arg(0)?, line_no)?)),
            RecordType::CNAME => Ok(RData::Cname(self.absolutize(arg(0)?, line_no)?)),
            RecordType::MX => {
                let preference = arg(0)?.parse::<u16>().map_err(|e| {
                    ZoneError::parse(line_no, format!("bad MX preference: {e}"))
                })?;
                let exchange = self.absolutize(arg(1)?, line_no)?;
                Ok(RData::Mx {
                    preference,
                    exchange,
                })
            }
            RecordType::TXT => {
                if tokens.is_empty() {
                    return Err(ZoneError::parse(line_no, "TXT record is incomplete"));
                }
                // Surrounding quotes are stripped; the text between them is
                // kept verbatim, embedded whitespace included.
                let joined = tokens.join(" ");
                let text = joined
                    .strip_prefix('"')
                    .and_then(|s| s.strip_suffix('"'))
                    .unwrap_or(&joined);
                Ok(RData::Txt(text.as_bytes().to_vec()))
            }
            RecordType::SOA => {
                let mname = self.absolutize(arg(0)?, line_no)?;
                let rname = self.absolutize(arg(1)?, line_no)?;
                let number = |i: usize| -> Result<u32> {
                    parse_duration(arg(i)?).map_err(|()| {
                        ZoneError::parse(line_no, format!("bad SOA field: {}", tokens[i]))
                    })
                };
                Ok(RData::Soa(Soa {
                    mname,
                    rname,
                    serial: number(2)?,
                    refresh: number(3)?,
                    retry: number(4)?,
                    expire: number(5)?,
                    minimum: number(6)?,
                }))
            }
            other => Err(ZoneError::parse(
                line_no,
                format!("record type {other} is not supported in zone files"),
            )),
        }
    }

    /// Resolves `@`, absolute, and relative names against the current
    /// origin. SOA owners may be absolute before any origin exists.
    fn absolutize(&self, token: &str, line_no: usize) -> Result<Name> {
        if token == "@" {
            return self
                .origin
                .clone()
                .ok_or_else(|| ZoneError::parse(line_no, "@ used before origin is known"));
        }
        if token.ends_with('.') {
            return Name::from_str(token)
                .map_err(|e| ZoneError::parse(line_no, format!("bad name {token}: {e}")));
        }
        let origin = self
            .origin
            .as_ref()
            .ok_or_else(|| ZoneError::parse(line_no, "relative name before origin is known"))?;
        Name::from_str(&format!("{token}.{origin}"))
            .map_err(|e| ZoneError::parse(line_no, format!("bad name {token}: {e}")))
    }
}

/// Whether a record line starts a new owner or continues the previous one.
enum OwnerIndent {
    Owner,
    Continuation,
}

fn raw_owner_indent(raw: &str) -> OwnerIndent {
    if raw.starts_with(|c: char| c.is_ascii_whitespace()) {
        OwnerIndent::Continuation
    } else {
        OwnerIndent::Owner
    }
}

/// Strips a `;` comment. Quoted TXT data may contain semicolons.
fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Parses a duration value with optional s/m/h/d/w suffixes.
fn parse_duration(s: &str) -> std::result::Result<u32, ()> {
    let mut total: u32 = 0;
    let mut current: u32 = 0;
    let mut saw_digit = false;

    for c in s.chars() {
        match c {
            '0'..='9' => {
                saw_digit = true;
                current = current
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(c as u32 - '0' as u32))
                    .ok_or(())?;
            }
            's' | 'S' | 'm' | 'M' | 'h' | 'H' | 'd' | 'D' | 'w' | 'W' => {
                let unit = match c.to_ascii_lowercase() {
                    's' => 1,
                    'm' => 60,
                    'h' => 3600,
                    'd' => 86400,
                    _ => 604800,
                };
                total = current.checked_mul(unit).and_then(|v| v.checked_add(total)).ok_or(())?;
                current = 0;
            }
            _ => return Err(()),
        }
    }
    if !saw_digit {
        return Err(());
    }
    total.checked_add(current).ok_or(())
}
