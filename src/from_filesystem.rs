//! Directory entries built from an on-disk tree.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};

use git2::{Index, Repository};

use crate::content::Content;
use crate::directory::{Directory, DirectoryEntry, EntryKind};
use crate::error::SwhidError;
use crate::swhid::Swhid;

/// Name of the VCS metadata entry that is never hashed.
const GIT_DIR_NAME: &[u8] = b".git";

const EXECUTABLE_BITS: u32 = 0o111;

/// Explicit file modes keyed by full path.
///
/// Takes precedence over the git index and the filesystem when deciding
/// whether a regular file is executable. Archive extraction fills one from the
/// archive headers; users can supply one as JSON (`{"bin/tool": "100755"}`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionTable {
    modes: HashMap<PathBuf, u32>,
}

impl PermissionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, mode: u32) {
        self.modes.insert(path.into(), mode);
    }

    pub fn get(&self, path: &Path) -> Option<u32> {
        self.modes.get(path).copied()
    }

    pub fn is_executable(&self, path: &Path) -> Option<bool> {
        self.get(path).map(|mode| mode & EXECUTABLE_BITS != 0)
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    /// Parse a JSON object of octal mode strings; keys are relative to `root`.
    pub fn from_json_str(json: &str, root: &Path) -> Result<Self, SwhidError> {
        let raw: BTreeMap<String, String> = serde_json::from_str(json)?;
        let mut table = Self::new();
        for (relative, mode) in raw {
            let parsed = u32::from_str_radix(&mode, 8).map_err(|_| {
                SwhidError::validation(format!("invalid mode {:?} for {:?}", mode, relative))
            })?;
            table.insert(root.join(relative), parsed);
        }
        Ok(table)
    }

    pub fn from_json_file(path: &Path, root: &Path) -> Result<Self, SwhidError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json, root)
    }
}

/// File modes recorded in the index of the git work tree enclosing a path.
pub struct GitIndex {
    workdir: PathBuf,
    index: Index,
}

impl GitIndex {
    /// `None` when `path` is not inside a non-bare repository with a readable index.
    pub fn discover(path: &Path) -> Option<Self> {
        let repo = Repository::discover(path).ok()?;
        let workdir = repo.workdir()?.canonicalize().ok()?;
        let index = repo.index().ok()?;
        tracing::debug!(message = "Using git index", workdir = %workdir.display());
        Some(Self { workdir, index })
    }

    /// `None` when the file is not tracked.
    pub fn is_executable(&self, path: &Path) -> Option<bool> {
        let absolute = path.canonicalize().ok()?;
        let relative = absolute.strip_prefix(&self.workdir).ok()?;
        let entry = self.index.get_path(relative, 0)?;
        Some(entry.mode == 0o100755)
    }
}

/// Recursive directory hasher.
///
/// Symlinks are never followed inside the tree: they become `symlink` entries
/// pointing at the content hash of the link text.
pub struct DirectoryWalker<'a> {
    exclude_patterns: &'a [String],
    max_content_length: Option<u64>,
    permissions: Option<&'a PermissionTable>,
    git_index: Option<GitIndex>,
}

impl<'a> DirectoryWalker<'a> {
    pub fn new(exclude_patterns: &'a [String]) -> Self {
        Self {
            exclude_patterns,
            max_content_length: None,
            permissions: None,
            git_index: None,
        }
    }

    pub fn with_max_content_length(mut self, max_content_length: Option<u64>) -> Self {
        self.max_content_length = max_content_length;
        self
    }

    pub fn with_permissions(mut self, permissions: Option<&'a PermissionTable>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_git_index(mut self, git_index: Option<GitIndex>) -> Self {
        self.git_index = git_index;
        self
    }

    /// Identifier of the directory at `path`.
    pub fn directory_swhid(&self, path: &Path) -> Result<Swhid, SwhidError> {
        let (swhid, _) = self.hash_directory(path, false)?;
        Ok(swhid)
    }

    /// Every object under `path`, each directory before its children, children
    /// in tree order.
    pub fn walk(&self, path: &Path) -> Result<Vec<(PathBuf, Swhid)>, SwhidError> {
        let (_, objects) = self.hash_directory(path, true)?;
        Ok(objects)
    }

    fn hash_directory(
        &self,
        path: &Path,
        collect: bool,
    ) -> Result<(Swhid, Vec<(PathBuf, Swhid)>), SwhidError> {
        let mut children: Vec<(Vec<u8>, DirectoryEntry, Vec<(PathBuf, Swhid)>)> = Vec::new();

        for dir_entry in fs::read_dir(path)? {
            let dir_entry = dir_entry?;
            let name = os_name_bytes(&dir_entry.file_name());
            if name == GIT_DIR_NAME {
                continue;
            }

            let child_path = path.join(dir_entry.file_name());
            let metadata = fs::symlink_metadata(&child_path)?;
            let file_type = metadata.file_type();

            let (entry, objects) = if file_type.is_symlink() {
                let link = fs::read_link(&child_path)?;
                let swhid = Content::from_data(os_name_bytes(link.as_os_str())).swhid();
                let objects = collected(collect, &child_path, &swhid);
                (DirectoryEntry::new(name, EntryKind::Symlink, swhid), objects)
            } else if file_type.is_dir() {
                if self.is_excluded(&name) {
                    tracing::debug!(message = "Excluding directory", path = %child_path.display());
                    continue;
                }
                let (swhid, objects) = self.hash_directory(&child_path, collect)?;
                (DirectoryEntry::new(name, EntryKind::Directory, swhid), objects)
            } else if file_type.is_file() {
                let content = Content::from_file_with_limit(&child_path, self.max_content_length)?;
                let swhid = content.swhid();
                let kind = if self.is_executable(&child_path, &metadata) {
                    EntryKind::Executable
                } else {
                    EntryKind::File
                };
                let objects = collected(collect, &child_path, &swhid);
                (DirectoryEntry::new(name, kind, swhid), objects)
            } else {
                tracing::debug!(message = "Skipping special file", path = %child_path.display());
                continue;
            };

            children.push((entry.sort_key(), entry, objects));
        }

        children.sort_by(|a, b| a.0.cmp(&b.0));

        let mut entries = Vec::with_capacity(children.len());
        let mut descendants = Vec::new();
        for (_, entry, objects) in children {
            entries.push(entry);
            descendants.extend(objects);
        }

        let entry_count = entries.len();
        let swhid = Directory::new(entries).swhid()?;
        tracing::debug!(
            message = "Hashed directory",
            path = %path.display(),
            entries = entry_count,
            swhid = %swhid
        );

        let mut objects = Vec::new();
        if collect {
            objects.push((path.to_path_buf(), swhid.clone()));
            objects.extend(descendants);
        }
        Ok((swhid, objects))
    }

    fn is_excluded(&self, name: &[u8]) -> bool {
        self.exclude_patterns
            .iter()
            .any(|pattern| pattern.as_bytes() == name)
    }

    fn is_executable(&self, path: &Path, metadata: &Metadata) -> bool {
        if let Some(executable) = self.permissions.and_then(|table| table.is_executable(path)) {
            return executable;
        }
        if let Some(executable) = self.git_index.as_ref().and_then(|index| index.is_executable(path)) {
            return executable;
        }
        mode_bits(metadata) & EXECUTABLE_BITS != 0
    }
}

fn collected(collect: bool, path: &Path, swhid: &Swhid) -> Vec<(PathBuf, Swhid)> {
    if collect {
        vec![(path.to_path_buf(), swhid.clone())]
    } else {
        Vec::new()
    }
}

#[cfg(unix)]
pub(crate) fn os_name_bytes(name: &std::ffi::OsStr) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    name.as_bytes().to_vec()
}

#[cfg(not(unix))]
pub(crate) fn os_name_bytes(name: &std::ffi::OsStr) -> Vec<u8> {
    name.to_string_lossy().into_owned().into_bytes()
}

#[cfg(unix)]
fn mode_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

#[cfg(not(unix))]
fn mode_bits(_metadata: &Metadata) -> u32 {
    0o644
}
