use std::fmt;
use std::str::FromStr;

use crate::error::SwhidError;
use crate::hash::hash_git_object;
use crate::object_ref::ObjectRef;
use crate::swhid::{ObjectType, Swhid};

/// Directory entry kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Executable,
    Symlink,
    Directory,
    /// Reference to a revision of another repository (git submodule).
    Submodule,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Executable => "exec",
            EntryKind::Symlink => "symlink",
            EntryKind::Directory => "dir",
            EntryKind::Submodule => "rev",
        }
    }

    pub fn default_permissions(&self) -> Permissions {
        match self {
            EntryKind::File => Permissions::File,
            EntryKind::Executable => Permissions::Executable,
            EntryKind::Symlink => Permissions::Symlink,
            EntryKind::Directory => Permissions::Directory,
            EntryKind::Submodule => Permissions::Submodule,
        }
    }
}

impl FromStr for EntryKind {
    type Err = SwhidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(EntryKind::File),
            "exec" | "executable" => Ok(EntryKind::Executable),
            "symlink" => Ok(EntryKind::Symlink),
            "dir" | "directory" => Ok(EntryKind::Directory),
            "rev" | "submodule" => Ok(EntryKind::Submodule),
            _ => Err(SwhidError::validation(format!("unknown entry type: {:?}", s))),
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default git modes per entry kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permissions {
    File = 0o100644,
    Executable = 0o100755,
    Symlink = 0o120000,
    Directory = 0o040000,
    Submodule = 0o160000,
}

impl Permissions {
    pub fn as_octal(&self) -> u32 {
        *self as u32
    }
}

/// Directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: Vec<u8>,
    pub kind: EntryKind,
    pub target: ObjectRef,
    /// Explicit octal mode such as `"100644"`; the kind default when absent.
    pub permissions: Option<String>,
}

impl DirectoryEntry {
    pub fn new(name: impl Into<Vec<u8>>, kind: EntryKind, target: impl Into<ObjectRef>) -> Self {
        Self {
            name: name.into(),
            kind,
            target: target.into(),
            permissions: None,
        }
    }

    pub fn with_permissions(mut self, permissions: impl Into<String>) -> Self {
        self.permissions = Some(permissions.into());
        self
    }

    /// Effective mode.
    pub fn mode(&self) -> Result<u32, SwhidError> {
        match &self.permissions {
            None => Ok(self.kind.default_permissions().as_octal()),
            Some(perms) => {
                let valid = !perms.is_empty() && perms.bytes().all(|b| (b'0'..=b'7').contains(&b));
                if !valid {
                    return Err(SwhidError::validation(format!(
                        "invalid permissions {:?} for entry {:?}",
                        perms,
                        String::from_utf8_lossy(&self.name)
                    )));
                }
                u32::from_str_radix(perms, 8).map_err(|e| {
                    SwhidError::validation(format!("invalid permissions {:?}: {}", perms, e))
                })
            }
        }
    }

    /// Git tree ordering: directories compare as if their name ended in `/`.
    pub fn sort_key(&self) -> Vec<u8> {
        let mut key = self.name.clone();
        if self.kind == EntryKind::Directory {
            key.push(b'/');
        }
        key
    }

    fn serialize_into(&self, out: &mut Vec<u8>) -> Result<(), SwhidError> {
        let mode = self.mode()?;
        let target = self.target.resolve()?;
        out.extend_from_slice(format!("{:o} ", mode).as_bytes());
        out.extend_from_slice(&self.name);
        out.push(0);
        out.extend_from_slice(target.as_bytes());
        Ok(())
    }
}

/// Directory object
#[derive(Debug, Clone, Default)]
pub struct Directory {
    entries: Vec<DirectoryEntry>,
}

impl Directory {
    /// Entries may be given in any order.
    pub fn new(mut entries: Vec<DirectoryEntry>) -> Self {
        entries.sort_by_cached_key(DirectoryEntry::sort_key);
        Self { entries }
    }

    /// Entries in tree order.
    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    /// Canonical tree payload, without the object header.
    pub fn serialize(&self) -> Result<Vec<u8>, SwhidError> {
        let mut out = Vec::new();
        for entry in &self.entries {
            entry.serialize_into(&mut out)?;
        }
        Ok(out)
    }

    pub fn swhid(&self) -> Result<Swhid, SwhidError> {
        let payload = self.serialize()?;
        let hash = hash_git_object(ObjectType::Directory.git_kind(), &payload);
        Ok(Swhid::new(ObjectType::Directory, hash))
    }
}
