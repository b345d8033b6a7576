//! Cache key implementation.

use rill_proto::{Name, Question, RecordType};

/// Cache key: `(owner, type)`, with the owner lowercased so lookups are
/// case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    name: Name,
    rtype: RecordType,
}

impl CacheKey {
    /// Creates a new cache key.
    pub fn new(name: &Name, rtype: RecordType) -> Self {
        Self {
            name: name.lowercased(),
            rtype,
        }
    }

    /// Creates a cache key from a question.
    pub fn from_question(question: &Question) -> Self {
        Self::new(&question.qname, question.qtype)
    }

    /// Returns the owner name.
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Returns the record type.
    pub fn rtype(&self) -> RecordType {
        self.rtype
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_case_insensitive_keys() {
        let lower = CacheKey::new(&Name::from_str("www.foo").unwrap(), RecordType::A);
        let upper = CacheKey::new(&Name::from_str("WWW.FOO").unwrap(), RecordType::A);
        assert_eq!(lower, upper);

        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut h1 = DefaultHasher::new();
        let mut h2 = DefaultHasher::new();
        lower.hash(&mut h1);
        upper.hash(&mut h2);
        assert_eq!(h1.finish(), h2.finish());
    }

    #[test]
    fn test_type_distinguishes_keys() {
        let a = CacheKey::new(&Name::from_str("www.foo").unwrap(), RecordType::A);
        let txt = CacheKey::new(&Name::from_str("www.foo").unwrap(), RecordType::TXT);
        assert_ne!(a, txt);
    }
}
