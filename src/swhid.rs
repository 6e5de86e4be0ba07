use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use percent_encoding::percent_decode;

use crate::error::SwhidError;
use crate::hash::{ObjectHash, HASH_LENGTH};

/// Software Heritage object types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectType {
    Content,
    Directory,
    Revision,
    Release,
    Snapshot,
}

impl ObjectType {
    pub const ALL: [ObjectType; 5] = [
        ObjectType::Content,
        ObjectType::Directory,
        ObjectType::Revision,
        ObjectType::Release,
        ObjectType::Snapshot,
    ];

    /// Three-letter code used in the textual identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Content => "cnt",
            ObjectType::Directory => "dir",
            ObjectType::Revision => "rev",
            ObjectType::Release => "rel",
            ObjectType::Snapshot => "snp",
        }
    }

    /// Long-form word used in object headers and release `type` lines.
    pub fn git_kind(&self) -> &'static str {
        match self {
            ObjectType::Content => "blob",
            ObjectType::Directory => "tree",
            ObjectType::Revision => "commit",
            ObjectType::Release => "tag",
            ObjectType::Snapshot => "snapshot",
        }
    }

    /// Parse a three-letter code.
    pub fn from_code(s: &str) -> Result<Self, SwhidError> {
        match s {
            "cnt" => Ok(ObjectType::Content),
            "dir" => Ok(ObjectType::Directory),
            "rev" => Ok(ObjectType::Revision),
            "rel" => Ok(ObjectType::Release),
            "snp" => Ok(ObjectType::Snapshot),
            _ => Err(SwhidError::validation(format!(
                "invalid object type: {:?}, must be one of cnt, dir, rev, rel, snp",
                s
            ))),
        }
    }

    pub fn from_git_kind(s: &str) -> Result<Self, SwhidError> {
        Self::ALL
            .into_iter()
            .find(|object_type| object_type.git_kind() == s)
            .ok_or_else(|| SwhidError::validation(format!("invalid object kind: {:?}", s)))
    }
}

impl FromStr for ObjectType {
    type Err = SwhidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Qualifier keys emitted first, in this order, when formatting.
pub const CANONICAL_QUALIFIER_ORDER: [&str; 6] =
    ["origin", "visit", "anchor", "path", "lines", "bytes"];

/// Order-preserving, key-unique qualifier mapping.
///
/// Equality and hashing treat it as a plain mapping: two qualifier sets with
/// the same pairs in different insertion order are equal.
#[derive(Debug, Clone, Default)]
pub struct Qualifiers {
    pairs: Vec<(String, String)>,
}

impl Qualifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Pairs in output order: canonical keys first, then the rest in
    /// insertion order.
    pub fn canonical_iter(&self) -> impl Iterator<Item = (&str, &str)> {
        let known = CANONICAL_QUALIFIER_ORDER
            .iter()
            .filter_map(move |key| self.get(key).map(|v| (*key, v)));
        let others = self
            .iter()
            .filter(|(k, _)| !CANONICAL_QUALIFIER_ORDER.contains(k));
        known.chain(others)
    }

    fn sorted_pairs(&self) -> Vec<&(String, String)> {
        let mut pairs: Vec<_> = self.pairs.iter().collect();
        pairs.sort();
        pairs
    }
}

impl PartialEq for Qualifiers {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl Eq for Qualifiers {}

impl Hash for Qualifiers {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sorted_pairs().hash(state);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Qualifiers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut qualifiers = Qualifiers::new();
        for (k, v) in iter {
            qualifiers.insert(k, v);
        }
        qualifiers
    }
}

/// Software Heritage Identifier, optionally qualified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Swhid {
    object_type: ObjectType,
    object_hash: ObjectHash,
    qualifiers: Qualifiers,
}

impl Swhid {
    pub const NAMESPACE: &'static str = "swh";
    pub const SCHEME_VERSION: u32 = 1;

    pub fn new(object_type: ObjectType, object_hash: impl Into<ObjectHash>) -> Self {
        Self {
            object_type,
            object_hash: object_hash.into(),
            qualifiers: Qualifiers::new(),
        }
    }

    /// Build from a type code and hex hash, validating both.
    pub fn from_parts(object_type: &str, object_hash: &str) -> Result<Self, SwhidError> {
        let object_type = ObjectType::from_code(object_type)?;
        let object_hash = ObjectHash::from_hex(object_hash)?;
        Ok(Self::new(object_type, object_hash))
    }

    pub fn with_qualifiers(mut self, qualifiers: Qualifiers) -> Self {
        self.qualifiers = qualifiers;
        self
    }

    pub fn with_qualifier(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.qualifiers.insert(key, value);
        self
    }

    pub fn namespace(&self) -> &'static str {
        Self::NAMESPACE
    }

    pub fn scheme_version(&self) -> u32 {
        Self::SCHEME_VERSION
    }

    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    pub fn object_hash(&self) -> &ObjectHash {
        &self.object_hash
    }

    pub fn object_id(&self) -> &[u8; HASH_LENGTH] {
        self.object_hash.as_bytes()
    }

    pub fn qualifiers(&self) -> &Qualifiers {
        &self.qualifiers
    }

    /// Type and hash, for comparisons that ignore qualifiers.
    pub fn core(&self) -> (ObjectType, ObjectHash) {
        (self.object_type, self.object_hash)
    }

    /// This identifier with its qualifiers dropped.
    pub fn to_core(&self) -> Swhid {
        Swhid::new(self.object_type, self.object_hash)
    }

    /// Unqualified textual form.
    pub fn core_swhid(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            Self::NAMESPACE,
            Self::SCHEME_VERSION,
            self.object_type,
            self.object_hash
        )
    }

    /// Parse SWHID from string
    pub fn from_string(s: &str) -> Result<Self, SwhidError> {
        if s.is_empty() {
            return Err(SwhidError::parse("SWHID string cannot be empty"));
        }

        let mut segments = s.split(';');
        let core = segments.next().unwrap_or_default();

        let mut parts: Vec<&str> = core.split(':').collect();
        while parts.last().is_some_and(|p| p.is_empty()) {
            parts.pop();
        }
        if parts.len() != 4 {
            return Err(SwhidError::parse(format!(
                "SWHID must have 4 colon-separated parts, got {}: {:?}",
                parts.len(),
                s
            )));
        }

        if parts[0] != Self::NAMESPACE {
            return Err(SwhidError::parse(format!("invalid scheme: {:?}", parts[0])));
        }
        if parts[1] != Self::SCHEME_VERSION.to_string() {
            return Err(SwhidError::parse(format!("invalid version: {:?}", parts[1])));
        }

        let mut qualifiers = Qualifiers::new();
        for segment in segments {
            let Some((key, value)) = segment.split_once('=') else {
                continue;
            };
            qualifiers.insert(key, decode_qualifier_value(value)?);
        }

        Ok(Self::from_parts(parts[2], parts[3])?.with_qualifiers(qualifiers))
    }
}

/// www-form decoding: `+` is a space, `%XX` is a byte.
fn decode_qualifier_value(value: &str) -> Result<String, SwhidError> {
    let bytes = value.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'%' {
            let escape = bytes.get(i + 1..i + 3);
            if !escape.is_some_and(|e| e.iter().all(u8::is_ascii_hexdigit)) {
                return Err(SwhidError::parse(format!(
                    "invalid percent-encoding in qualifier value: {:?}",
                    value
                )));
            }
        }
    }

    let spaced = value.replace('+', " ");
    percent_decode(spaced.as_bytes())
        .decode_utf8()
        .map(|v| v.into_owned())
        .map_err(|_| {
            SwhidError::parse(format!(
                "qualifier value is not valid UTF-8 once decoded: {:?}",
                value
            ))
        })
}

/// Only `;` and `%` are escaped on output.
fn encode_qualifier_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            ';' => out.push_str("%3B"),
            '%' => out.push_str("%25"),
            _ => out.push(c),
        }
    }
    out
}

impl FromStr for Swhid {
    type Err = SwhidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

impl fmt::Display for Swhid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.core_swhid())?;
        for (key, value) in self.qualifiers.canonical_iter() {
            write!(f, ";{}={}", key, encode_qualifier_value(value))?;
        }
        Ok(())
    }
}
