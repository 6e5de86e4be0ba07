//! Revision, release and snapshot metadata read from a git repository.
//!
//! `git2` is only used to resolve names and load raw object bytes; the bytes
//! themselves are parsed here so that every header survives verbatim.

use git2::{ErrorCode, Oid, Reference, Repository};

use crate::error::SwhidError;
use crate::release::ReleaseMetadata;
use crate::revision::RevisionMetadata;
use crate::snapshot::SnapshotBranch;
use crate::swhid::ObjectType;

const HEAD: &str = "HEAD";

/// Metadata of the commit `rev` resolves to.
pub fn revision_metadata(repo: &Repository, rev: &str) -> Result<RevisionMetadata, SwhidError> {
    let commit = repo.revparse_single(rev)?.peel_to_commit()?;
    tracing::debug!(message = "Reading commit", rev, oid = %commit.id());
    let raw = read_raw(repo, commit.id())?;
    parse_commit(&raw)
}

/// Metadata of the annotated tag `refs/tags/<name>`.
pub fn release_metadata(repo: &Repository, name: &str) -> Result<ReleaseMetadata, SwhidError> {
    let reference = repo.find_reference(&format!("refs/tags/{}", name))?;
    let oid = reference.resolve()?.target().ok_or_else(|| {
        SwhidError::InvalidInput(format!("tag {} does not point to an object", name))
    })?;
    let object = repo.find_object(oid, None)?;
    if object.kind() != Some(git2::ObjectType::Tag) {
        return Err(SwhidError::InvalidInput(format!(
            "{} is a lightweight tag, only annotated tags are releases",
            name
        )));
    }
    tracing::debug!(message = "Reading tag", name, oid = %oid);
    let raw = read_raw(repo, oid)?;
    parse_tag(&raw)
}

/// Every reference of the repository, plus `HEAD`.
pub fn snapshot_branches(repo: &Repository) -> Result<Vec<SnapshotBranch>, SwhidError> {
    let mut branches = Vec::new();
    for reference in repo.references()? {
        branches.push(branch_from_reference(repo, &reference?)?);
    }
    match repo.find_reference(HEAD) {
        Ok(head) => branches.push(branch_from_reference(repo, &head)?),
        Err(e) if e.code() == ErrorCode::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    tracing::debug!(message = "Collected snapshot branches", count = branches.len());
    Ok(branches)
}

fn branch_from_reference(
    repo: &Repository,
    reference: &Reference<'_>,
) -> Result<SnapshotBranch, SwhidError> {
    let name = reference.name_bytes().to_vec();

    if let Some(target) = reference.symbolic_target_bytes() {
        return Ok(SnapshotBranch::alias(name, target));
    }

    let oid = match reference.target() {
        Some(oid) => oid,
        None => return Ok(SnapshotBranch::dangling(name)),
    };

    let kind = match repo.find_object(oid, None) {
        Ok(object) => object.kind(),
        Err(e) if e.code() == ErrorCode::NotFound => {
            tracing::warn!(
                message = "Reference points to a missing object",
                name = %String::from_utf8_lossy(&name),
                oid = %oid
            );
            return Ok(SnapshotBranch::dangling(name));
        }
        Err(e) => return Err(e.into()),
    };

    let object_type = match kind {
        Some(git2::ObjectType::Blob) => ObjectType::Content,
        Some(git2::ObjectType::Tree) => ObjectType::Directory,
        Some(git2::ObjectType::Commit) => ObjectType::Revision,
        Some(git2::ObjectType::Tag) => ObjectType::Release,
        _ => {
            return Err(SwhidError::validation(format!(
                "unsupported object kind for reference {}",
                String::from_utf8_lossy(&name)
            )))
        }
    };
    Ok(SnapshotBranch::object(name, object_type, oid.to_string()))
}

fn read_raw(repo: &Repository, oid: Oid) -> Result<Vec<u8>, SwhidError> {
    let odb = repo.odb()?;
    let object = odb.read(oid)?;
    Ok(object.data().to_vec())
}

/// Headers and message of a raw commit or tag.
struct RawObject<'a> {
    headers: Vec<(&'a [u8], Vec<u8>)>,
    /// Absent when there is no blank line after the headers.
    message: Option<&'a [u8]>,
}

fn split_raw(raw: &[u8]) -> Result<RawObject<'_>, SwhidError> {
    let (head, message) = match raw.windows(2).position(|w| w == b"\n\n") {
        Some(pos) => (&raw[..pos], Some(&raw[pos + 2..])),
        None => (raw.strip_suffix(b"\n").unwrap_or(raw), None),
    };

    let mut headers: Vec<(&[u8], Vec<u8>)> = Vec::new();
    for line in head.split(|&b| b == b'\n') {
        if let Some(continuation) = line.strip_prefix(b" ") {
            let (_, value) = headers
                .last_mut()
                .ok_or_else(|| SwhidError::validation("continuation line before any header"))?;
            value.push(b'\n');
            value.extend_from_slice(continuation);
            continue;
        }
        let split = line.iter().position(|&b| b == b' ').ok_or_else(|| {
            SwhidError::validation(format!(
                "malformed header line: {:?}",
                String::from_utf8_lossy(line)
            ))
        })?;
        headers.push((&line[..split], line[split + 1..].to_vec()));
    }

    Ok(RawObject { headers, message })
}

/// `Name <email> 1436739030 -0700` split from the right.
fn parse_person(value: &[u8]) -> Result<(Vec<u8>, i64, String), SwhidError> {
    let malformed = || {
        SwhidError::validation(format!(
            "malformed person line: {:?}",
            String::from_utf8_lossy(value)
        ))
    };
    let mut parts = value.rsplitn(3, |&b| b == b' ');
    let timezone = parts.next().ok_or_else(malformed)?;
    let timestamp = parts.next().ok_or_else(malformed)?;
    let person = parts.next().ok_or_else(malformed)?;

    let timestamp = std::str::from_utf8(timestamp)
        .ok()
        .and_then(|ts| ts.parse::<i64>().ok())
        .ok_or_else(malformed)?;
    let timezone = String::from_utf8(timezone.to_vec()).map_err(|_| malformed())?;
    Ok((person.to_vec(), timestamp, timezone))
}

fn header_text(key: &[u8], value: Vec<u8>) -> Result<String, SwhidError> {
    String::from_utf8(value).map_err(|_| {
        SwhidError::validation(format!(
            "non-UTF-8 {} header",
            String::from_utf8_lossy(key)
        ))
    })
}

/// Parse raw commit bytes.
pub fn parse_commit(raw: &[u8]) -> Result<RevisionMetadata, SwhidError> {
    let RawObject { headers, message } = split_raw(raw)?;
    let mut metadata = RevisionMetadata::new();

    for (key, value) in headers {
        match key {
            b"tree" => metadata.directory = Some(header_text(key, value)?.into()),
            b"parent" => metadata.parents.push(header_text(key, value)?.into()),
            b"author" => {
                let (person, timestamp, timezone) = parse_person(&value)?;
                metadata = metadata
                    .with_author(person, timestamp)
                    .with_author_timezone(timezone);
            }
            b"committer" => {
                let (person, timestamp, timezone) = parse_person(&value)?;
                metadata = metadata
                    .with_committer(person, timestamp)
                    .with_committer_timezone(timezone);
            }
            _ => metadata.extra_headers.push((key.to_vec(), value)),
        }
    }

    metadata.message = message.map(<[u8]>::to_vec);
    Ok(metadata)
}

/// Parse raw tag bytes.
pub fn parse_tag(raw: &[u8]) -> Result<ReleaseMetadata, SwhidError> {
    let RawObject { headers, message } = split_raw(raw)?;
    let mut metadata = ReleaseMetadata::new();
    let mut object = None;
    let mut object_type = None;

    for (key, value) in headers {
        match key {
            b"object" => object = Some(header_text(key, value)?),
            b"type" => object_type = Some(ObjectType::from_git_kind(&header_text(key, value)?)?),
            b"tag" => metadata.name = Some(value),
            b"tagger" => {
                let (person, timestamp, timezone) = parse_person(&value)?;
                metadata = metadata
                    .with_author(person, timestamp)
                    .with_author_timezone(timezone);
            }
            _ => metadata.extra_headers.push((key.to_vec(), value)),
        }
    }

    match (object, object_type) {
        (Some(object), Some(object_type)) => metadata = metadata.with_target(object, object_type),
        _ => return Err(SwhidError::validation("tag without object or type header")),
    }
    metadata.message = message.map(<[u8]>::to_vec);
    Ok(metadata)
}
