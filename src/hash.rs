//! Git-style object hashing: `"<kind> <length>\0"` header followed by the
//! payload, digested with SHA-1.

use std::fmt;
use std::io::Read;
use std::str::FromStr;

use sha1::{Digest, Sha1};

use crate::error::SwhidError;

/// Length in bytes of a SHA-1 digest.
pub const HASH_LENGTH: usize = 20;

/// Length of the hex rendering of an [`ObjectHash`].
pub const HEX_HASH_LENGTH: usize = 2 * HASH_LENGTH;

/// Digest of a canonical object serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHash([u8; HASH_LENGTH]);

impl ObjectHash {
    pub const fn new(bytes: [u8; HASH_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parse 40 lowercase hex characters.
    pub fn from_hex(s: &str) -> Result<Self, SwhidError> {
        let valid = s.len() == HEX_HASH_LENGTH
            && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !valid {
            return Err(SwhidError::validation(format!(
                "invalid object hash: {:?}, expected {} lowercase hex digits",
                s, HEX_HASH_LENGTH
            )));
        }

        let mut bytes = [0u8; HASH_LENGTH];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; HASH_LENGTH]> for ObjectHash {
    fn from(bytes: [u8; HASH_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl FromStr for ObjectHash {
    type Err = SwhidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for ObjectHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<hex::FromHexError> for SwhidError {
    fn from(err: hex::FromHexError) -> Self {
        SwhidError::validation(format!("invalid hex: {}", err))
    }
}

/// Header prepended to every object before hashing.
pub fn git_object_header(kind: &str, length: u64) -> Vec<u8> {
    format!("{} {}\0", kind, length).into_bytes()
}

/// Hash `payload` as a git object of type `kind`.
pub fn hash_git_object(kind: &str, payload: &[u8]) -> ObjectHash {
    let mut hasher = Sha1::new();
    hasher.update(git_object_header(kind, payload.len() as u64));
    hasher.update(payload);
    ObjectHash(hasher.finalize().into())
}

/// Hash a payload of known `length` streamed from `reader`.
///
/// The header needs the total length before any payload byte, so the caller
/// must know it up front. Reading fewer or more than `length` bytes is an
/// error.
pub fn hash_git_object_reader<R: Read>(
    kind: &str,
    length: u64,
    mut reader: R,
) -> Result<ObjectHash, SwhidError> {
    let mut hasher = Sha1::new();
    hasher.update(git_object_header(kind, length));

    let mut buf = [0u8; 64 * 1024];
    let mut seen: u64 = 0;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        seen += n as u64;
        if seen > length {
            break;
        }
        hasher.update(&buf[..n]);
    }

    if seen != length {
        return Err(SwhidError::InvalidInput(format!(
            "expected {} bytes of {} payload, read {}",
            length, kind, seen
        )));
    }

    Ok(ObjectHash(hasher.finalize().into()))
}
