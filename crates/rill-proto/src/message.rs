//! DNS messages.
//!
//! A message is a header plus four sections: question, answer, authority,
//! additional. The section mutators keep the header counts coherent, so a
//! message built through them always serializes with correct counts.

use crate::error::Result;
use crate::header::{Header, HEADER_SIZE};
use crate::question::Question;
use crate::rcode::ResponseCode;
use crate::record::{ResourceRecord, SectionParser};
use crate::rtype::RecordType;
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A complete DNS message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    header: Header,
    questions: Vec<Question>,
    answers: Vec<ResourceRecord>,
    authority: Vec<ResourceRecord>,
    additional: Vec<ResourceRecord>,
}

impl Message {
    /// Creates an empty message with the given header.
    pub fn new(header: Header) -> Self {
        Self {
            header,
            questions: Vec::new(),
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
        }
    }

    /// Creates a one-shot query with a fresh random id.
    pub fn query(question: Question) -> Self {
        let mut msg = Self::new(Header::query());
        msg.questions.push(question);
        msg
    }

    /// Creates a response skeleton from a query: id, opcode, and RD are
    /// copied, QR is set, and the question section is echoed.
    pub fn response_from(query: &Message) -> Self {
        let mut header = Header::response_from(&query.header);
        header.qd_count = query.questions.len() as u16;
        Self {
            header,
            questions: query.questions.clone(),
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
        }
    }

    /// Returns the header.
    #[inline]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Returns a mutable reference to the header.
    #[inline]
    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    /// Returns the message id.
    #[inline]
    pub fn id(&self) -> u16 {
        self.header.id
    }

    /// Sets the message id.
    #[inline]
    pub fn set_id(&mut self, id: u16) {
        self.header.id = id;
    }

    /// Returns the response code.
    #[inline]
    pub fn rcode(&self) -> ResponseCode {
        self.header.rcode
    }

    /// Sets the response code.
    #[inline]
    pub fn set_rcode(&mut self, rcode: ResponseCode) {
        self.header.rcode = rcode;
    }

    /// Returns the first question, if any.
    #[inline]
    pub fn question(&self) -> Option<&Question> {
        self.questions.first()
    }

    /// Returns the question section.
    #[inline]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Returns the answer section.
    #[inline]
    pub fn answers(&self) -> &[ResourceRecord] {
        &self.answers
    }

    /// Returns the authority section.
    #[inline]
    pub fn authority(&self) -> &[ResourceRecord] {
        &self.authority
    }

    /// Returns the additional section.
    #[inline]
    pub fn additional(&self) -> &[ResourceRecord] {
        &self.additional
    }

    /// Adds a question.
    pub fn add_question(&mut self, question: Question) {
        self.questions.push(question);
        self.header.qd_count = self.questions.len() as u16;
    }

    /// Appends a record to the answer section.
    pub fn add_answer(&mut self, record: ResourceRecord) {
        self.answers.push(record);
        self.header.an_count = self.answers.len() as u16;
    }

    /// Appends records to the answer section.
    pub fn add_answers(&mut self, records: impl IntoIterator<Item = ResourceRecord>) {
        self.answers.extend(records);
        self.header.an_count = self.answers.len() as u16;
    }

    /// Appends a record to the authority section.
    pub fn add_authority(&mut self, record: ResourceRecord) {
        self.authority.push(record);
        self.header.ns_count = self.authority.len() as u16;
    }

    /// Appends records to the authority section.
    pub fn add_authority_records(&mut self, records: impl IntoIterator<Item = ResourceRecord>) {
        self.authority.extend(records);
        self.header.ns_count = self.authority.len() as u16;
    }

    /// Appends a record to the additional section.
    pub fn add_additional(&mut self, record: ResourceRecord) {
        self.additional.push(record);
        self.header.ar_count = self.additional.len() as u16;
    }

    /// Appends records to the additional section.
    pub fn add_additional_records(&mut self, records: impl IntoIterator<Item = ResourceRecord>) {
        self.additional.extend(records);
        self.header.ar_count = self.additional.len() as u16;
    }

    /// Retains only the records (across all three record sections) that
    /// satisfy the predicate. Used by the bailiwick filter.
    pub fn retain_records(&mut self, mut keep: impl FnMut(&ResourceRecord) -> bool) {
        self.answers.retain(&mut keep);
        self.authority.retain(&mut keep);
        self.additional.retain(&mut keep);
        self.header.an_count = self.answers.len() as u16;
        self.header.ns_count = self.authority.len() as u16;
        self.header.ar_count = self.additional.len() as u16;
    }

    /// Returns an iterator over all records in answer, authority, and
    /// additional, in that order.
    pub fn all_records(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.answers
            .iter()
            .chain(self.authority.iter())
            .chain(self.additional.iter())
    }

    /// Returns answer records of the given type.
    pub fn answers_of_type(&self, rtype: RecordType) -> impl Iterator<Item = &ResourceRecord> {
        self.answers.iter().filter(move |r| r.rtype() == rtype)
    }

    /// Parses a message from wire format.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header = Header::parse(data)?;

        let mut offset = HEADER_SIZE;
        let mut questions = Vec::with_capacity(header.qd_count as usize);
        for _ in 0..header.qd_count {
            let (q, consumed) = Question::parse(data, offset)?;
            questions.push(q);
            offset += consumed;
        }

        let parse_section = |count: u16, offset: &mut usize| -> Result<Vec<ResourceRecord>> {
            let mut parser = SectionParser::new(data, *offset, count);
            let mut records = Vec::with_capacity(count as usize);
            while let Some(r) = parser.next()? {
                records.push(r);
            }
            *offset = parser.offset();
            Ok(records)
        };

        let answers = parse_section(header.an_count, &mut offset)?;
        let authority = parse_section(header.ns_count, &mut offset)?;
        let additional = parse_section(header.ar_count, &mut offset)?;

        Ok(Self {
            header,
            questions,
            answers,
            authority,
            additional,
        })
    }

    /// Returns the wire format length.
    pub fn wire_len(&self) -> usize {
        HEADER_SIZE
            + self.questions.iter().map(Question::wire_len).sum::<usize>()
            + self.all_records().map(ResourceRecord::wire_len).sum::<usize>()
    }

    /// Writes the message in wire format with up-to-date section counts.
    pub fn write_to(&self, buf: &mut BytesMut) {
        let mut header = self.header.clone();
        header.qd_count = self.questions.len() as u16;
        header.an_count = self.answers.len() as u16;
        header.ns_count = self.authority.len() as u16;
        header.ar_count = self.additional.len() as u16;
        header.write_to(buf);

        for q in &self.questions {
            q.write_to(buf);
        }
        for r in self.all_records() {
            r.write_to(buf);
        }
    }

    /// Serializes the message to wire format bytes.
    pub fn to_wire(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_len());
        self.write_to(&mut buf);
        buf.freeze()
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::new(Header::default())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, ";; ->>HEADER<<- {}", self.header)?;
        writeln!(f, ";; QUESTION SECTION:")?;
        for q in &self.questions {
            writeln!(f, ";{q}")?;
        }
        for (title, section) in [
            ("ANSWER", &self.answers),
            ("AUTHORITY", &self.authority),
            ("ADDITIONAL", &self.additional),
        ] {
            if !section.is_empty() {
                writeln!(f, ";; {title} SECTION:")?;
                for r in section {
                    writeln!(f, "{r}")?;
                }
            }
        }
        Ok(())
    }
}

/// Consumes the message into its record sections (answers, authority,
/// additional). Used when splicing a resolver result into a reply.
impl Message {
    /// Splits the message into its three record sections.
    pub fn into_sections(
        self,
    ) -> (
        Vec<ResourceRecord>,
        Vec<ResourceRecord>,
        Vec<ResourceRecord>,
    ) {
        (self.answers, self.authority, self.additional)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::Name;
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    #[test]
    fn test_query_creation() {
        let msg = Message::query(Question::a(Name::from_str("www.foo").unwrap()));
        assert!(!msg.header().is_response());
        assert_eq!(msg.questions().len(), 1);
    }

    #[test]
    fn test_response_skeleton() {
        let query = Message::query(Question::a(Name::from_str("www.foo").unwrap()));
        let resp = Message::response_from(&query);

        assert!(resp.header().is_response());
        assert_eq!(resp.id(), query.id());
        assert_eq!(resp.questions(), query.questions());
        assert!(resp.answers().is_empty());
    }

    #[test]
    fn test_message_roundtrip() {
        let mut msg = Message::query(Question::a(Name::from_str("www.foo").unwrap()));
        msg.set_id(0x4242);
        msg.add_answer(ResourceRecord::a(
            Name::from_str("www.foo").unwrap(),
            300,
            Ipv4Addr::new(89, 2, 33, 1),
        ));
        msg.add_authority(ResourceRecord::ns(
            Name::from_str("foo").unwrap(),
            300,
            Name::from_str("ns.foo").unwrap(),
        ));
        msg.add_additional(ResourceRecord::a(
            Name::from_str("ns.foo").unwrap(),
            300,
            Ipv4Addr::new(1, 1, 1, 1),
        ));

        let wire = msg.to_wire();
        let parsed = Message::parse(&wire).unwrap();

        assert_eq!(parsed.id(), 0x4242);
        assert_eq!(parsed.questions(), msg.questions());
        assert_eq!(parsed.answers(), msg.answers());
        assert_eq!(parsed.authority(), msg.authority());
        assert_eq!(parsed.additional(), msg.additional());
    }

    #[test]
    fn test_retain_records() {
        let zone = Name::from_str("foo").unwrap();
        let mut msg = Message::default();
        msg.add_answer(ResourceRecord::a(
            Name::from_str("www.foo").unwrap(),
            60,
            Ipv4Addr::new(1, 2, 3, 4),
        ));
        msg.add_additional(ResourceRecord::a(
            Name::from_str("evil.example").unwrap(),
            60,
            Ipv4Addr::new(6, 6, 6, 6),
        ));

        msg.retain_records(|r| r.name().is_subdomain_of(&zone));

        assert_eq!(msg.answers().len(), 1);
        assert!(msg.additional().is_empty());
        assert_eq!(msg.header().ar_count, 0);
    }

    #[test]
    fn test_counts_follow_mutators() {
        let mut msg = Message::default();
        msg.add_answers(vec![
            ResourceRecord::txt(Name::from_str("a.foo").unwrap(), 60, "x"),
            ResourceRecord::txt(Name::from_str("b.foo").unwrap(), 60, "y"),
        ]);
        assert_eq!(msg.header().an_count, 2);
    }

    #[test]
    fn test_parse_truncated_message() {
        let msg = Message::query(Question::a(Name::from_str("www.foo").unwrap()));
        let wire = msg.to_wire();
        assert!(Message::parse(&wire[..wire.len() - 2]).is_err());
    }
}
