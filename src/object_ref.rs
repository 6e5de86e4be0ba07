use crate::error::SwhidError;
use crate::hash::ObjectHash;
use crate::swhid::Swhid;

/// Reference to another object: either a raw hex hash or an identifier
/// computed earlier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectRef {
    Raw(String),
    Resolved(Swhid),
}

impl ObjectRef {
    /// Normalize to the referenced object's hash.
    pub fn resolve(&self) -> Result<ObjectHash, SwhidError> {
        match self {
            ObjectRef::Raw(hex) => ObjectHash::from_hex(hex),
            ObjectRef::Resolved(swhid) => Ok(*swhid.object_hash()),
        }
    }
}

impl From<&str> for ObjectRef {
    fn from(hex: &str) -> Self {
        ObjectRef::Raw(hex.to_string())
    }
}

impl From<String> for ObjectRef {
    fn from(hex: String) -> Self {
        ObjectRef::Raw(hex)
    }
}

impl From<ObjectHash> for ObjectRef {
    fn from(hash: ObjectHash) -> Self {
        ObjectRef::Raw(hash.to_hex())
    }
}

impl From<Swhid> for ObjectRef {
    fn from(swhid: Swhid) -> Self {
        ObjectRef::Resolved(swhid)
    }
}

impl From<&Swhid> for ObjectRef {
    fn from(swhid: &Swhid) -> Self {
        ObjectRef::Resolved(swhid.clone())
    }
}
