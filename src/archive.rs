//! Archive extraction for directory hashing.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use tempfile::TempDir;

use crate::error::SwhidError;
use crate::from_filesystem::PermissionTable;

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

/// Archive formats recognized by file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tar,
    TarGz,
    TarBz2,
    Zip,
}

impl ArchiveFormat {
    const SUFFIXES: [(&'static str, ArchiveFormat); 9] = [
        (".tar.gz", ArchiveFormat::TarGz),
        (".tgz", ArchiveFormat::TarGz),
        (".crate", ArchiveFormat::TarGz),
        (".tar.bz2", ArchiveFormat::TarBz2),
        (".tbz2", ArchiveFormat::TarBz2),
        (".tar", ArchiveFormat::Tar),
        (".zip", ArchiveFormat::Zip),
        (".jar", ArchiveFormat::Zip),
        (".whl", ArchiveFormat::Zip),
    ];

    pub fn detect(path: &Path) -> Result<Self, SwhidError> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        Self::SUFFIXES
            .iter()
            .find(|(suffix, _)| file_name.ends_with(suffix))
            .map(|(_, format)| *format)
            .ok_or_else(|| {
                SwhidError::InvalidInput(format!("unsupported archive format: {}", path.display()))
            })
    }
}

/// An archive unpacked into a temporary directory, removed on drop.
#[derive(Debug)]
pub struct ExtractedArchive {
    temp_dir: TempDir,
    root: PathBuf,
    permissions: PermissionTable,
}

impl ExtractedArchive {
    /// Directory to hash: the single top-level directory if there is one.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Modes recorded from the archive members.
    pub fn permissions(&self) -> &PermissionTable {
        &self.permissions
    }

    pub fn extraction_dir(&self) -> &Path {
        self.temp_dir.path()
    }
}

pub fn extract(archive_path: &Path) -> Result<ExtractedArchive, SwhidError> {
    let format = ArchiveFormat::detect(archive_path)?;
    let temp_dir = TempDir::new()?;
    let dest = temp_dir.path();

    tracing::debug!(
        message = "Extracting archive",
        archive = %archive_path.display(),
        format = ?format,
        dest = %dest.display()
    );

    let file = File::open(archive_path)?;
    let permissions = match format {
        ArchiveFormat::Tar => extract_tar(BufReader::new(file), dest),
        ArchiveFormat::TarGz => extract_tar(GzDecoder::new(BufReader::new(file)), dest),
        ArchiveFormat::TarBz2 => extract_tar(BzDecoder::new(BufReader::new(file)), dest),
        ArchiveFormat::Zip => extract_zip(file, dest),
    }
    .map_err(|e| match e {
        SwhidError::Io(err) => {
            SwhidError::Archive(format!("{}: {}", archive_path.display(), err))
        }
        other => other,
    })?;

    let root = find_root(dest)?;
    Ok(ExtractedArchive {
        temp_dir,
        root,
        permissions,
    })
}

fn extract_tar<R: Read>(reader: R, dest: &Path) -> Result<PermissionTable, SwhidError> {
    let mut archive = tar::Archive::new(reader);
    let mut permissions = PermissionTable::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let relative = normalize(&entry.path()?);
        let is_file = entry.header().entry_type().is_file();
        let mode = entry.header().mode()?;

        if !entry.unpack_in(dest)? {
            tracing::warn!(message = "Skipping member outside archive root", path = %relative.display());
            continue;
        }
        if is_file {
            permissions.insert(dest.join(&relative), mode);
        }
    }

    Ok(permissions)
}

fn extract_zip(file: File, dest: &Path) -> Result<PermissionTable, SwhidError> {
    let mut archive = zip::ZipArchive::new(BufReader::new(file))?;
    let mut permissions = PermissionTable::new();

    for i in 0..archive.len() {
        let mut member = archive.by_index(i)?;
        let relative = match member.enclosed_name() {
            Some(name) => normalize(name),
            None => {
                tracing::warn!(message = "Skipping member outside archive root", name = member.name());
                continue;
            }
        };
        let target = dest.join(&relative);

        if member.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let mode = member.unix_mode();
        if mode.is_some_and(|mode| mode & S_IFMT == S_IFLNK) {
            let mut link = Vec::new();
            member.read_to_end(&mut link)?;
            create_symlink(&link, &target)?;
            continue;
        }

        let mut out = File::create(&target)?;
        io::copy(&mut member, &mut out)?;

        if let Some(mode) = mode {
            permissions.insert(target, mode);
        }
    }

    Ok(permissions)
}

#[cfg(unix)]
fn create_symlink(link: &[u8], target: &Path) -> io::Result<()> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    std::os::unix::fs::symlink(OsStr::from_bytes(link), target)
}

/// Without symlink support the link text is kept as a plain file.
#[cfg(not(unix))]
fn create_symlink(link: &[u8], target: &Path) -> io::Result<()> {
    fs::write(target, link)
}

/// Drop `.` components so recorded paths match the paths the walker builds.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

fn find_root(dest: &Path) -> Result<PathBuf, SwhidError> {
    let mut entries = fs::read_dir(dest)?.collect::<Result<Vec<_>, _>>()?;
    if entries.len() == 1 && entries[0].file_type()?.is_dir() {
        if let Some(entry) = entries.pop() {
            return Ok(entry.path());
        }
    }
    Ok(dest.to_path_buf())
}
