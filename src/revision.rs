use crate::error::SwhidError;
use crate::hash::hash_git_object;
use crate::object_ref::ObjectRef;
use crate::person::{finish_body, format_header_line, format_person_line};
use crate::swhid::{ObjectType, Swhid};

/// Commit-like metadata.
///
/// Every field is optional at construction time so that callers (and the git
/// adapter) can build it incrementally; required fields are checked when the
/// object is serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionMetadata {
    pub directory: Option<ObjectRef>,
    /// Hash-significant order; never sorted.
    pub parents: Vec<ObjectRef>,
    pub author: Option<Vec<u8>>,
    pub author_timestamp: Option<i64>,
    pub author_timezone: Option<String>,
    pub committer: Option<Vec<u8>>,
    pub committer_timestamp: Option<i64>,
    pub committer_timezone: Option<String>,
    pub extra_headers: Vec<(Vec<u8>, Vec<u8>)>,
    /// `None` (no message) and `Some(vec![])` (empty message) hash differently.
    pub message: Option<Vec<u8>>,
}

impl RevisionMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_directory(mut self, directory: impl Into<ObjectRef>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<ObjectRef>) -> Self {
        self.parents.push(parent.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<Vec<u8>>, timestamp: i64) -> Self {
        self.author = Some(author.into());
        self.author_timestamp = Some(timestamp);
        self
    }

    pub fn with_author_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.author_timezone = Some(timezone.into());
        self
    }

    pub fn with_committer(mut self, committer: impl Into<Vec<u8>>, timestamp: i64) -> Self {
        self.committer = Some(committer.into());
        self.committer_timestamp = Some(timestamp);
        self
    }

    pub fn with_committer_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.committer_timezone = Some(timezone.into());
        self
    }

    pub fn with_extra_header(mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        self.extra_headers.push((key.into(), value.into()));
        self
    }

    pub fn with_message(mut self, message: impl Into<Vec<u8>>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Canonical commit payload, without the object header.
    pub fn serialize(&self) -> Result<Vec<u8>, SwhidError> {
        let directory = self
            .directory
            .as_ref()
            .ok_or_else(|| SwhidError::validation("revision directory is required"))?
            .resolve()?;

        let mut lines = vec![format!("tree {}", directory).into_bytes()];
        for parent in &self.parents {
            lines.push(format!("parent {}", parent.resolve()?).into_bytes());
        }

        let author = required(&self.author, "revision author")?;
        let author_timestamp = required(&self.author_timestamp, "revision author timestamp")?;
        lines.push(format_person_line(
            "author",
            author,
            *author_timestamp,
            self.author_timezone.as_deref(),
        ));

        let committer = required(&self.committer, "revision committer")?;
        let committer_timestamp =
            required(&self.committer_timestamp, "revision committer timestamp")?;
        lines.push(format_person_line(
            "committer",
            committer,
            *committer_timestamp,
            self.committer_timezone.as_deref(),
        ));

        for (key, value) in &self.extra_headers {
            lines.push(format_header_line(key, value));
        }

        Ok(finish_body(lines, self.message.as_deref()))
    }

    pub fn swhid(&self) -> Result<Swhid, SwhidError> {
        let payload = self.serialize()?;
        let hash = hash_git_object(ObjectType::Revision.git_kind(), &payload);
        Ok(Swhid::new(ObjectType::Revision, hash))
    }
}

fn required<'a, T>(field: &'a Option<T>, what: &str) -> Result<&'a T, SwhidError> {
    field
        .as_ref()
        .ok_or_else(|| SwhidError::validation(format!("{} is required", what)))
}
