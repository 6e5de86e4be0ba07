use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use git2::Repository;

pub mod archive;
pub mod content;
pub mod directory;
pub mod error;
pub mod from_filesystem;
pub mod from_git;
pub mod hash;
pub mod object_ref;
pub mod person;
pub mod release;
pub mod revision;
pub mod snapshot;
pub mod swhid;

pub use content::Content;
pub use directory::{Directory, DirectoryEntry, EntryKind, Permissions};
pub use error::SwhidError;
pub use from_filesystem::{DirectoryWalker, GitIndex, PermissionTable};
pub use hash::ObjectHash;
pub use object_ref::ObjectRef;
pub use release::ReleaseMetadata;
pub use revision::RevisionMetadata;
pub use snapshot::{BranchTarget, Snapshot, SnapshotBranch, SnapshotTargetType};
pub use swhid::{ObjectType, Qualifiers, Swhid};

/// Parse a textual identifier.
pub fn parse(text: &str) -> Result<Swhid, SwhidError> {
    Swhid::from_string(text)
}

pub fn from_content(data: impl AsRef<[u8]>) -> Swhid {
    Content::from_data(data).swhid()
}

pub fn from_directory(entries: Vec<DirectoryEntry>) -> Result<Swhid, SwhidError> {
    Directory::new(entries).swhid()
}

pub fn from_revision(metadata: &RevisionMetadata) -> Result<Swhid, SwhidError> {
    metadata.swhid()
}

pub fn from_release(metadata: &ReleaseMetadata) -> Result<Swhid, SwhidError> {
    metadata.swhid()
}

pub fn from_snapshot(branches: Vec<SnapshotBranch>) -> Result<Swhid, SwhidError> {
    Snapshot::new(branches).swhid()
}

/// Identifier computation for on-disk objects, archives and git repositories.
#[derive(Debug, Clone)]
pub struct SwhidComputer {
    pub follow_symlinks: bool,
    pub exclude_patterns: Vec<String>,
    pub max_content_length: Option<u64>,
    pub permissions: Option<PermissionTable>,
    pub use_git_index: bool,
}

impl Default for SwhidComputer {
    fn default() -> Self {
        Self {
            follow_symlinks: true,
            exclude_patterns: Vec::new(),
            max_content_length: None,
            permissions: None,
            use_git_index: true,
        }
    }
}

impl SwhidComputer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_follow_symlinks(mut self, follow_symlinks: bool) -> Self {
        self.follow_symlinks = follow_symlinks;
        self
    }

    pub fn with_exclude_patterns(mut self, exclude_patterns: &[String]) -> Self {
        self.exclude_patterns = exclude_patterns.to_vec();
        self
    }

    pub fn with_max_content_length(mut self, max_content_length: Option<u64>) -> Self {
        self.max_content_length = max_content_length;
        self
    }

    /// Explicit file modes; these win over the git index and the filesystem.
    pub fn with_permissions(mut self, permissions: Option<PermissionTable>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_git_index(mut self, use_git_index: bool) -> Self {
        self.use_git_index = use_git_index;
        self
    }

    /// Compute SWHID for content bytes
    pub fn compute_content_swhid(&self, content: &[u8]) -> Result<Swhid, SwhidError> {
        if let Some(limit) = self.max_content_length {
            let length = content.len() as u64;
            if length > limit {
                return Err(SwhidError::ContentTooLarge { length, limit });
            }
        }
        Ok(Content::from_data(content).swhid())
    }

    /// Compute SWHID for bytes read to the end of `reader`
    ///
    /// With a length limit, at most `limit + 1` bytes are buffered.
    pub fn compute_reader_swhid<R: Read>(&self, mut reader: R) -> Result<Swhid, SwhidError> {
        let mut data = Vec::new();
        match self.max_content_length {
            Some(limit) => reader.take(limit.saturating_add(1)).read_to_end(&mut data)?,
            None => reader.read_to_end(&mut data)?,
        };
        self.compute_content_swhid(&data)
    }

    /// Compute SWHID for a file
    pub fn compute_file_swhid<P: AsRef<Path>>(&self, path: P) -> Result<Swhid, SwhidError> {
        let content = Content::from_file_with_limit(path, self.max_content_length)?;
        Ok(content.swhid())
    }

    /// Compute SWHID for a directory
    pub fn compute_directory_swhid<P: AsRef<Path>>(&self, path: P) -> Result<Swhid, SwhidError> {
        let path = path.as_ref();
        self.walker(path).directory_swhid(path)
    }

    /// Every object under a directory, paired with its path
    pub fn walk_directory<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<Vec<(PathBuf, Swhid)>, SwhidError> {
        let path = path.as_ref();
        self.walker(path).walk(path)
    }

    fn walker(&self, path: &Path) -> DirectoryWalker<'_> {
        let git_index = if self.use_git_index {
            GitIndex::discover(path)
        } else {
            None
        };
        DirectoryWalker::new(&self.exclude_patterns)
            .with_max_content_length(self.max_content_length)
            .with_permissions(self.permissions.as_ref())
            .with_git_index(git_index)
    }

    /// Auto-detect object type and compute SWHID
    pub fn compute_swhid<P: AsRef<Path>>(&self, path: P) -> Result<Swhid, SwhidError> {
        let path = path.as_ref();
        let metadata = if self.follow_symlinks {
            fs::metadata(path)?
        } else {
            fs::symlink_metadata(path)?
        };

        if metadata.file_type().is_symlink() {
            let target = fs::read_link(path)?;
            let bytes = from_filesystem::os_name_bytes(target.as_os_str());
            Ok(Content::from_data(bytes).swhid())
        } else if metadata.is_file() {
            self.compute_file_swhid(path)
        } else if metadata.is_dir() {
            self.compute_directory_swhid(path)
        } else {
            Err(SwhidError::InvalidInput(format!(
                "{} is neither a file nor a directory",
                path.display()
            )))
        }
    }

    /// Check a path against an identifier, ignoring qualifiers
    pub fn verify_swhid<P: AsRef<Path>>(
        &self,
        path: P,
        expected_swhid: &str,
    ) -> Result<bool, SwhidError> {
        let expected = Swhid::from_string(expected_swhid)?;
        let actual = self.compute_swhid(path)?;
        Ok(expected.core() == actual.core())
    }

    /// Compute a directory SWHID for the contents of an archive
    pub fn compute_archive_directory_swhid<P: AsRef<Path>>(
        &self,
        archive_path: P,
    ) -> Result<Swhid, SwhidError> {
        let extracted = archive::extract(archive_path.as_ref())?;
        DirectoryWalker::new(&self.exclude_patterns)
            .with_max_content_length(self.max_content_length)
            .with_permissions(Some(extracted.permissions()))
            .directory_swhid(extracted.root())
    }

    /// Compute a revision SWHID for a commit of a git repository
    pub fn compute_revision_swhid<P: AsRef<Path>>(
        &self,
        repo_path: P,
        rev: &str,
    ) -> Result<Swhid, SwhidError> {
        let repo = Repository::open(repo_path)?;
        from_git::revision_metadata(&repo, rev)?.swhid()
    }

    /// Compute a release SWHID for an annotated tag of a git repository
    pub fn compute_release_swhid<P: AsRef<Path>>(
        &self,
        repo_path: P,
        tag: &str,
    ) -> Result<Swhid, SwhidError> {
        let repo = Repository::open(repo_path)?;
        from_git::release_metadata(&repo, tag)?.swhid()
    }

    /// Compute a snapshot SWHID for a git repository
    pub fn compute_snapshot_swhid<P: AsRef<Path>>(&self, repo_path: P) -> Result<Swhid, SwhidError> {
        let repo = Repository::open(repo_path)?;
        Snapshot::new(from_git::snapshot_branches(&repo)?).swhid()
    }
}
