use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::SwhidError;
use crate::hash::{hash_git_object, hash_git_object_reader, ObjectHash};
use crate::swhid::{ObjectType, Swhid};

/// Content object: raw bytes, hashed as a git blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    length: u64,
    sha1_git: ObjectHash,
}

impl Content {
    /// Hash bytes exactly as given. No newline or encoding normalization.
    pub fn from_data(data: impl AsRef<[u8]>) -> Self {
        let data = data.as_ref();
        Self {
            length: data.len() as u64,
            sha1_git: hash_git_object(ObjectType::Content.git_kind(), data),
        }
    }

    /// Hash `length` bytes read from `reader`, without buffering them.
    pub fn from_reader<R: Read>(
        reader: R,
        length: u64,
        max_length: Option<u64>,
    ) -> Result<Self, SwhidError> {
        check_limit(length, max_length)?;
        let sha1_git = hash_git_object_reader(ObjectType::Content.git_kind(), length, reader)?;
        Ok(Self { length, sha1_git })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SwhidError> {
        Self::from_file_with_limit(path, None)
    }

    pub fn from_file_with_limit<P: AsRef<Path>>(
        path: P,
        max_length: Option<u64>,
    ) -> Result<Self, SwhidError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let metadata = file.metadata()?;
        if !metadata.is_file() {
            return Err(SwhidError::InvalidInput(format!(
                "not a regular file: {}",
                path.display()
            )));
        }
        Self::from_reader(file, metadata.len(), max_length)
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn sha1_git(&self) -> &ObjectHash {
        &self.sha1_git
    }

    pub fn swhid(&self) -> Swhid {
        Swhid::new(ObjectType::Content, self.sha1_git)
    }
}

fn check_limit(length: u64, max_length: Option<u64>) -> Result<(), SwhidError> {
    match max_length {
        Some(limit) if length > limit => Err(SwhidError::ContentTooLarge { length, limit }),
        _ => Ok(()),
    }
}
