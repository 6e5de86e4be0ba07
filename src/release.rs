use crate::error::SwhidError;
use crate::hash::hash_git_object;
use crate::object_ref::ObjectRef;
use crate::person::{escape_newlines, finish_body, format_header_line, format_person_line};
use crate::swhid::{ObjectType, Swhid};

/// Annotated-tag-like metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseMetadata {
    pub name: Option<Vec<u8>>,
    pub target: Option<(ObjectRef, ObjectType)>,
    pub author: Option<Vec<u8>>,
    pub author_timestamp: Option<i64>,
    pub author_timezone: Option<String>,
    pub extra_headers: Vec<(Vec<u8>, Vec<u8>)>,
    pub message: Option<Vec<u8>>,
}

impl ReleaseMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<Vec<u8>>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<ObjectRef>, target_type: ObjectType) -> Self {
        self.target = Some((target.into(), target_type));
        self
    }

    /// Target an identifier; its type becomes the target type.
    pub fn with_target_swhid(self, target: &Swhid) -> Self {
        let target_type = target.object_type();
        self.with_target(target, target_type)
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

    pub fn with_extra_header(mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        self.extra_headers.push((key.into(), value.into()));
        self
    }

    pub fn with_message(mut self, message: impl Into<Vec<u8>>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Canonical tag payload, without the object header.
    pub fn serialize(&self) -> Result<Vec<u8>, SwhidError> {
        let name = self
            .name
            .as_ref()
            .ok_or_else(|| SwhidError::validation("release name is required"))?;
        let (target, target_type) = self
            .target
            .as_ref()
            .ok_or_else(|| SwhidError::validation("release target is required"))?;
        let target = target.resolve()?;

        let mut tag_line = b"tag ".to_vec();
        tag_line.extend_from_slice(&escape_newlines(name));

        let mut lines = vec![
            format!("object {}", target).into_bytes(),
            format!("type {}", target_type.git_kind()).into_bytes(),
            tag_line,
        ];

        if let Some(author) = &self.author {
            let timestamp = self.author_timestamp.ok_or_else(|| {
                SwhidError::validation("release author timestamp is required when author is present")
            })?;
            lines.push(format_person_line(
                "tagger",
                author,
                timestamp,
                self.author_timezone.as_deref(),
            ));
        }

        for (key, value) in &self.extra_headers {
            lines.push(format_header_line(key, value));
        }

        Ok(finish_body(lines, self.message.as_deref()))
    }

    pub fn swhid(&self) -> Result<Swhid, SwhidError> {
        let payload = self.serialize()?;
        let hash = hash_git_object(ObjectType::Release.git_kind(), &payload);
        Ok(Swhid::new(ObjectType::Release, hash))
    }
}
