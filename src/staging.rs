//! Staging Area
//!
//! Before the container is serialized, every file of the book is materialized
//! into a staging tree. The tree is addressed with archive-relative paths
//! (`OEBPS/Text/cover.xhtml`) and keeps an explicit registry of what has been
//! staged, in staging order, so the archive writer never depends on the listing
//! order of a directory.
//!
//! Two implementations are provided:
//! - [MemoryStaging] keeps everything in memory and is the default.
//! - [DirectoryStaging] mirrors the tree into a temporary directory that is
//!   removed when the staging area is dropped (requires the `disk-staging` feature).

#[cfg(feature = "disk-staging")]
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use std::io;

use indexmap::{IndexMap, IndexSet};
#[cfg(feature = "disk-staging")]
use log::warn;
#[cfg(feature = "disk-staging")]
use walkdir::WalkDir;

use crate::{error::EpubError, types::ArchiveEntry, utils::normalize_archive_path};

/// Filesystem collaborator used to build the staging tree
pub trait StagingArea {
    /// Creates a directory if it does not exist yet
    ///
    /// The parent of `path` must already exist.
    fn ensure_directory(&mut self, path: &str) -> Result<(), EpubError>;

    /// Writes a file, replacing any previous content at the same path
    ///
    /// A replaced file keeps its original position in the staging order.
    fn write_file(&mut self, path: &str, data: &[u8]) -> Result<(), EpubError>;

    /// Lists the names of the entries directly under `path`
    ///
    /// Hidden entries (names starting with `.`) are not reported.
    fn list_entries(&self, path: &str) -> Result<Vec<String>, EpubError>;

    /// Returns every staged entry, ready to be archived
    ///
    /// The `mimetype` entry comes first, followed by the directories and then
    /// the files, each in the order they were staged.
    fn entries(&self) -> Result<Vec<ArchiveEntry>, EpubError>;
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(index) => &path[..index],
        None => "",
    }
}

fn file_name_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(index) => &path[index + 1..],
        None => path,
    }
}

fn missing_parent(path: &str) -> EpubError {
    EpubError::FileSystemError {
        path: path.to_string(),
        source: io::Error::new(
            io::ErrorKind::NotFound,
            format!("parent directory \"{}\" does not exist", parent_of(path)),
        ),
    }
}

/// In-memory staging tree
#[derive(Debug, Default)]
pub struct MemoryStaging {
    directories: IndexSet<String>,
    files: IndexMap<String, Vec<u8>>,
}

impl MemoryStaging {
    pub fn new() -> Self {
        Self::default()
    }

    fn has_directory(&self, path: &str) -> bool {
        path.is_empty() || self.directories.contains(path)
    }
}

impl StagingArea for MemoryStaging {
    fn ensure_directory(&mut self, path: &str) -> Result<(), EpubError> {
        let path = normalize_archive_path(path);
        if !self.has_directory(parent_of(&path)) {
            return Err(missing_parent(&path));
        }

        self.directories.insert(path);
        Ok(())
    }

    fn write_file(&mut self, path: &str, data: &[u8]) -> Result<(), EpubError> {
        let path = normalize_archive_path(path);
        if !self.has_directory(parent_of(&path)) {
            return Err(missing_parent(&path));
        }

        self.files.insert(path, data.to_vec());
        Ok(())
    }

    fn list_entries(&self, path: &str) -> Result<Vec<String>, EpubError> {
        let path = normalize_archive_path(path);
        if !self.has_directory(&path) {
            return Err(EpubError::FileSystemError {
                path,
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }

        let names = self
            .directories
            .iter()
            .map(String::as_str)
            .chain(self.files.keys().map(String::as_str))
            .filter(|entry| parent_of(entry) == path)
            .map(file_name_of)
            .filter(|name| !name.starts_with('.'))
            .map(str::to_string)
            .collect();

        Ok(names)
    }

    fn entries(&self) -> Result<Vec<ArchiveEntry>, EpubError> {
        let mut entries = vec![ArchiveEntry::mimetype()];
        entries.extend(self.directories.iter().map(|dir| ArchiveEntry::directory(dir)));
        entries.extend(
            self.files
                .iter()
                .map(|(path, data)| ArchiveEntry::file(path, data.clone())),
        );

        Ok(entries)
    }
}

/// Staging tree backed by a directory on disk
///
/// The directory and everything in it is removed when the value is dropped.
#[cfg(feature = "disk-staging")]
#[derive(Debug)]
pub struct DirectoryStaging {
    root: PathBuf,
    directories: IndexSet<String>,
    files: IndexSet<String>,
}

#[cfg(feature = "disk-staging")]
impl DirectoryStaging {
    /// Creates the staging directory at `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, EpubError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|source| EpubError::FileSystemError {
            path: root.to_string_lossy().to_string(),
            source,
        })?;

        Ok(Self {
            root,
            directories: IndexSet::new(),
            files: IndexSet::new(),
        })
    }

    /// Creates a uniquely named staging directory under the system temporary directory
    pub fn in_temp_dir() -> Result<Self, EpubError> {
        Self::new(env::temp_dir().join(crate::utils::local_time()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn fs_error(path: &str, source: io::Error) -> EpubError {
        EpubError::FileSystemError {
            path: path.to_string(),
            source,
        }
    }

    /// Resolves an archive path below the staging root
    ///
    /// Paths with `.` or `..` segments could leave the root and are rejected.
    fn resolve(&self, path: &str) -> Result<(String, PathBuf), EpubError> {
        let path = normalize_archive_path(path);
        if path.split('/').any(|segment| segment == "." || segment == "..") {
            return Err(Self::fs_error(
                &path,
                io::Error::new(io::ErrorKind::InvalidInput, "path leaves the staging root"),
            ));
        }

        let target = self.root.join(&path);
        Ok((path, target))
    }
}

#[cfg(feature = "disk-staging")]
impl StagingArea for DirectoryStaging {
    fn ensure_directory(&mut self, path: &str) -> Result<(), EpubError> {
        let (path, target) = self.resolve(path)?;
        if !target.is_dir() {
            fs::create_dir(&target).map_err(|err| Self::fs_error(&path, err))?;
        }

        self.directories.insert(path);
        Ok(())
    }

    fn write_file(&mut self, path: &str, data: &[u8]) -> Result<(), EpubError> {
        let (path, target) = self.resolve(path)?;
        fs::write(target, data).map_err(|err| Self::fs_error(&path, err))?;

        self.files.insert(path);
        Ok(())
    }

    fn list_entries(&self, path: &str) -> Result<Vec<String>, EpubError> {
        let (path, target) = self.resolve(path)?;

        let mut names = Vec::new();
        for entry in WalkDir::new(target)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|err| Self::fs_error(&path, err.into()))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with('.') {
                names.push(name);
            }
        }

        Ok(names)
    }

    fn entries(&self) -> Result<Vec<ArchiveEntry>, EpubError> {
        let mut entries = vec![ArchiveEntry::mimetype()];
        entries.extend(self.directories.iter().map(|dir| ArchiveEntry::directory(dir)));

        for path in &self.files {
            let data = fs::read(self.root.join(path)).map_err(|err| Self::fs_error(path, err))?;
            entries.push(ArchiveEntry::file(path, data));
        }

        Ok(entries)
    }
}

#[cfg(feature = "disk-staging")]
impl Drop for DirectoryStaging {
    /// Remove staging directory when dropped
    fn drop(&mut self) {
        if let Err(err) = fs::remove_dir_all(&self.root) {
            warn!("{}", err);
        };
    }
}
