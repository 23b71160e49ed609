//! Archive Writer
//!
//! Serializes a staged file tree into a ZIP container. The writer knows nothing
//! about EPUB documents apart from the one container rule every reading system
//! checks: the `mimetype` entry must be the first entry of the archive and it
//! must be stored without compression.
//!
//! Entries are written in a fixed order so that identical input always produces
//! the same archive layout:
//! 1. the `mimetype` entry, stored;
//! 2. every directory, in staging order, with missing parents added before
//!    their children;
//! 3. every file, in staging order, with the compression mode it carries.

use std::{
    fs::{self, File},
    io::{BufWriter, Seek, Write},
    path::{Path, PathBuf},
};

use indexmap::IndexSet;
use log::{debug, warn};
use zip::{CompressionMethod, ZipWriter, result::ZipError, write::FileOptions};

use crate::{
    error::EpubError,
    types::{ArchiveEntry, CompressionMode, EntryKind},
    utils::{EPUB_MIMETYPE, MIMETYPE_PATH, normalize_archive_path},
};

/// ZIP serializer for staged entries
#[derive(Debug, Clone, Default)]
pub struct ArchiveWriter {
    /// Deflate level of compressed entries, `None` for the library default
    compression_level: Option<i64>,
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the deflate level used for compressed entries
    pub fn with_compression_level(mut self, level: Option<i64>) -> Self {
        self.compression_level = level;
        self
    }

    /// Writes the entries into a container file at `target`
    ///
    /// The archive is first written to a sibling `.part` file which is renamed
    /// onto `target` only when everything succeeded. On failure the partial file
    /// is removed, so `target` is either the complete container or untouched.
    ///
    /// # Return
    /// - `Ok(PathBuf)`: Path of the written container
    /// - `Err(EpubError)`: The container could not be written
    pub fn write<P: AsRef<Path>>(
        &self,
        entries: &[ArchiveEntry],
        target: P,
    ) -> Result<PathBuf, EpubError> {
        let target = target.as_ref();
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| EpubError::FileSystemError {
                    path: parent.to_string_lossy().to_string(),
                    source,
                })?;
            }
        }

        let partial = partial_path(target);
        let result = self
            .write_partial(entries, &partial)
            .and_then(|_| fs::rename(&partial, target).map_err(|err| archive_error(target, err)));

        if let Err(err) = result {
            if partial.exists() {
                if let Err(cleanup) = fs::remove_file(&partial) {
                    warn!("{}", cleanup);
                }
            }
            return Err(err);
        }

        debug!("wrote container {}", target.display());
        Ok(target.to_path_buf())
    }

    fn write_partial(&self, entries: &[ArchiveEntry], partial: &Path) -> Result<(), EpubError> {
        let file = File::create(partial).map_err(|err| archive_error(partial, err))?;
        let mut writer = self.write_to(entries, BufWriter::new(file))?;
        writer.flush().map_err(|err| archive_error(partial, err))?;

        Ok(())
    }

    /// Writes the entries as a ZIP stream into `writer`
    ///
    /// Any entry supplied at the `mimetype` path is replaced by the canonical
    /// stored `application/epub+zip` entry, which is always written first.
    ///
    /// # Return
    /// - `Ok(W)`: The finished writer
    /// - `Err(EpubError)`: An entry could not be written
    pub fn write_to<W: Write + Seek>(
        &self,
        entries: &[ArchiveEntry],
        writer: W,
    ) -> Result<W, EpubError> {
        let mut zip = ZipWriter::new(writer);
        let stored = FileOptions::<()>::default().compression_method(CompressionMethod::Stored);
        let deflated = FileOptions::<()>::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(self.compression_level);

        zip.start_file(MIMETYPE_PATH, stored)
            .map_err(|err| zip_error(MIMETYPE_PATH, err))?;
        zip.write_all(EPUB_MIMETYPE.as_bytes())
            .map_err(|err| archive_error(MIMETYPE_PATH, err))?;

        for directory in plan_directories(entries) {
            debug!("adding directory {}", directory);
            zip.add_directory(format!("{}/", directory), stored)
                .map_err(|err| zip_error(&directory, err))?;
        }

        for entry in entries {
            let EntryKind::File { payload } = &entry.kind else {
                continue;
            };

            let path = normalize_archive_path(&entry.path);
            if path == MIMETYPE_PATH {
                if !entry.fixed_first {
                    warn!("replacing unflagged mimetype entry with the canonical one");
                }
                continue;
            }

            let options = match entry.compression {
                CompressionMode::Stored => stored,
                CompressionMode::Deflated => deflated,
            };

            debug!("adding file {} ({} bytes)", path, payload.len());
            zip.start_file(path.as_str(), options)
                .map_err(|err| zip_error(&path, err))?;
            zip.write_all(payload).map_err(|err| archive_error(&path, err))?;
        }

        zip.finish().map_err(|err| zip_error("<central directory>", err))
    }
}

/// Collects the directories to create, parents before children
///
/// Explicit directory entries come first in their staging order, followed by
/// the parents of file entries that no directory entry declared.
fn plan_directories(entries: &[ArchiveEntry]) -> IndexSet<String> {
    let mut directories = IndexSet::new();

    for entry in entries.iter().filter(|entry| entry.is_dir()) {
        insert_with_parents(&mut directories, &normalize_archive_path(&entry.path));
    }

    for entry in entries.iter().filter(|entry| !entry.is_dir()) {
        let path = normalize_archive_path(&entry.path);
        if let Some(index) = path.rfind('/') {
            insert_with_parents(&mut directories, &path[..index]);
        }
    }

    directories
}

fn insert_with_parents(directories: &mut IndexSet<String>, directory: &str) {
    if directory.is_empty() || directories.contains(directory) {
        return;
    }

    if let Some(index) = directory.rfind('/') {
        insert_with_parents(directories, &directory[..index]);
    }
    directories.insert(directory.to_string());
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    target.with_file_name(name)
}

fn archive_error<P: AsRef<Path>>(path: P, err: std::io::Error) -> EpubError {
    zip_error(&path.as_ref().to_string_lossy(), ZipError::from(err))
}

fn zip_error(path: &str, source: ZipError) -> EpubError {
    EpubError::ArchiveWriteError {
        path: path.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use std::{
        env, fs,
        io::{Cursor, Read},
    };

    use flate2::read::DeflateDecoder;
    use zip::{CompressionMethod, ZipArchive};

    use crate::{
        archive::{ArchiveWriter, plan_directories},
        error::EpubError,
        types::{ArchiveEntry, CompressionMode},
        utils::local_time,
    };

    fn sample_entries() -> Vec<ArchiveEntry> {
        vec![
            ArchiveEntry::directory("META-INF"),
            ArchiveEntry::file("META-INF/container.xml", b"<container/>".to_vec()),
            ArchiveEntry::file("OEBPS/Text/chap_1.xhtml", b"<html/>".repeat(64)),
            ArchiveEntry::mimetype(),
        ]
    }

    fn write_in_memory(entries: &[ArchiveEntry]) -> Vec<u8> {
        ArchiveWriter::new()
            .write_to(entries, Cursor::new(Vec::new()))
            .unwrap()
            .into_inner()
    }

    /// The first local file header must describe a stored `mimetype` entry
    #[test]
    fn test_mimetype_is_first_physical_entry() {
        let bytes = write_in_memory(&sample_entries());

        assert_eq!(&bytes[0..4], b"PK\x03\x04");
        let method = u16::from_le_bytes([bytes[8], bytes[9]]);
        assert_eq!(method, 0);
        let name_len = u16::from_le_bytes([bytes[26], bytes[27]]) as usize;
        let extra_len = u16::from_le_bytes([bytes[28], bytes[29]]) as usize;
        assert_eq!(&bytes[30..30 + name_len], b"mimetype");

        let data_start = 30 + name_len + extra_len;
        assert_eq!(&bytes[data_start..data_start + 20], b"application/epub+zip");
    }

    #[test]
    fn test_mimetype_without_explicit_entry() {
        let entries = vec![ArchiveEntry::file("OEBPS/toc.ncx", b"<ncx/>".to_vec())];
        let bytes = write_in_memory(&entries);

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut mimetype = archive.by_index(0).unwrap();
        assert_eq!(mimetype.name(), "mimetype");
        assert_eq!(mimetype.compression(), CompressionMethod::Stored);

        let mut content = String::new();
        mimetype.read_to_string(&mut content).unwrap();
        assert_eq!(content, "application/epub+zip");
        assert_eq!(mimetype.size(), 20);
    }

    #[test]
    fn test_entry_order_and_implied_directories() {
        let bytes = write_in_memory(&sample_entries());
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();

        let names: Vec<String> = (0..archive.len())
            .map(|index| archive.by_index(index).unwrap().name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "mimetype",
                "META-INF/",
                "OEBPS/",
                "OEBPS/Text/",
                "META-INF/container.xml",
                "OEBPS/Text/chap_1.xhtml",
            ]
        );
        assert_eq!(names.iter().filter(|name| *name == "mimetype").count(), 1);
    }

    #[test]
    fn test_file_entries_are_deflated() {
        let bytes = write_in_memory(&sample_entries());
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();

        let raw = archive.by_name("OEBPS/Text/chap_1.xhtml").unwrap();
        assert_eq!(raw.compression(), CompressionMethod::Deflated);
        drop(raw);

        let index = archive.index_for_name("OEBPS/Text/chap_1.xhtml").unwrap();
        let mut compressed = Vec::new();
        archive
            .by_index_raw(index)
            .unwrap()
            .read_to_end(&mut compressed)
            .unwrap();
        assert!(compressed.len() < 64 * 7);

        let mut inflated = Vec::new();
        DeflateDecoder::new(compressed.as_slice())
            .read_to_end(&mut inflated)
            .unwrap();
        assert_eq!(inflated, b"<html/>".repeat(64));
    }

    #[test]
    fn test_stored_file_entry() {
        let mut entry = ArchiveEntry::file("OEBPS/Images/cover.png", vec![7; 32]);
        entry.compression = CompressionMode::Stored;

        let bytes = write_in_memory(&[entry]);
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let image = archive.by_name("OEBPS/Images/cover.png").unwrap();
        assert_eq!(image.compression(), CompressionMethod::Stored);
    }

    #[test]
    fn test_plan_directories() {
        let entries = vec![
            ArchiveEntry::file("OEBPS/Styles/style.css", vec![]),
            ArchiveEntry::directory("OEBPS/Text"),
            ArchiveEntry::file("mimetype", vec![]),
        ];
        let directories: Vec<String> = plan_directories(&entries).into_iter().collect();
        assert_eq!(directories, vec!["OEBPS", "OEBPS/Text", "OEBPS/Styles"]);
    }

    #[test]
    fn test_write_to_disk() {
        let temp_dir = env::temp_dir().join(local_time());
        let target = temp_dir.join("nested").join("book.epub");

        let path = ArchiveWriter::new()
            .with_compression_level(Some(9))
            .write(&sample_entries(), &target)
            .unwrap();
        assert_eq!(path, target);
        assert!(target.is_file());
        assert!(!temp_dir.join("nested").join("book.epub.part").exists());

        let archive = ZipArchive::new(fs::File::open(&target).unwrap()).unwrap();
        assert_eq!(archive.len(), 6);

        fs::remove_dir_all(temp_dir).unwrap();
    }

    /// A failed write leaves neither the target nor the partial file behind
    #[test]
    fn test_write_failure_cleans_up() {
        let temp_dir = env::temp_dir().join(local_time());
        let target = temp_dir.join("book.epub");
        fs::create_dir_all(&target).unwrap();

        let result = ArchiveWriter::new().write(&sample_entries(), &target);
        assert_eq!(
            result.unwrap_err(),
            EpubError::ArchiveWriteError {
                path: target.to_string_lossy().to_string(),
                source: zip::result::ZipError::FileNotFound,
            }
        );
        assert!(target.is_dir());
        assert!(!temp_dir.join("book.epub.part").exists());

        fs::remove_dir_all(temp_dir).unwrap();
    }
}
