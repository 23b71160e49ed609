//! Error Type Definition Module
//!
//! This module defines the error types that may be encountered while assembling
//! and packaging an EPUB file. All errors are uniformly wrapped in the
//! `EpubError` enumeration for convenient error handling by the caller.
//!
//! None of the errors are recoverable inside the packaging pipeline: any failure
//! aborts the remaining steps and is handed back to the caller together with the
//! offending path or locator.

use thiserror::Error;

/// Types of errors that can occur during EPUB packaging
#[derive(Debug, Error)]
pub enum EpubError {
    /// ZIP container serialization error
    ///
    /// Occurs when the final container cannot be written, e.g. the disk is full
    /// or the target directory is not writable. `path` is either the archive entry
    /// being written or the container path itself.
    #[error("Archive write error: Failed to write \"{path}\": {source}")]
    ArchiveWriteError {
        path: String,
        source: zip::result::ZipError,
    },

    /// Builder already sealed error
    ///
    /// Triggered by any mutation, or a second `close`, after the content model
    /// has been sealed by packaging.
    #[error("Builder sealed: The content has already been packaged and can no longer be modified.")]
    BuilderSealed,

    /// Duplicate manifest identifier error
    ///
    /// Chapter ids and image names share the manifest id space with each other
    /// and with the generated documents. Occurs when a chapter or an image would
    /// reuse an id already taken by the other kind, or an image would take a
    /// reserved id.
    #[error("Duplicate manifest id: \"{id}\" is already used by another manifest item.")]
    DuplicateManifestId { id: String },

    /// Staging filesystem error
    ///
    /// Occurs when a directory or file of the staging tree cannot be created,
    /// written or read back.
    #[error("File system error: \"{path}\": {source}")]
    FileSystemError {
        path: String,
        source: std::io::Error,
    },

    #[error("IO error: {source}")]
    IOError { source: std::io::Error },

    /// Invalid entry name error
    ///
    /// Chapter ids and image names become file names inside the container, so
    /// they must be non-empty single path segments other than `.` and `..`.
    #[error("Invalid entry name: \"{name}\" is not a single path segment.")]
    InvalidEntryName { name: String },

    /// QuickXml error
    ///
    /// This error occurs when generating XML documents with the QuickXml library.
    #[error("QuickXml error: {source}")]
    QuickXmlError { source: quick_xml::Error },

    /// Reserved chapter identifier error
    ///
    /// The identifiers `cover`, `toc`, `ncx` and `css` name generated documents,
    /// a chapter cannot use them.
    #[error("Reserved chapter id: \"{id}\" is used by a generated document.")]
    ReservedChapterId { id: String },

    /// Resource fetch error
    ///
    /// Occurs when the byte-source collaborator could not retrieve the bytes of an
    /// image. The error is propagated immediately, no retry is attempted.
    #[error("Resource fetch error: Unable to fetch \"{locator}\": {source}")]
    ResourceFetchError {
        locator: String,
        source: std::io::Error,
    },
}

impl From<quick_xml::Error> for EpubError {
    fn from(value: quick_xml::Error) -> Self {
        EpubError::QuickXmlError { source: value }
    }
}

impl From<std::io::Error> for EpubError {
    fn from(value: std::io::Error) -> Self {
        EpubError::IOError { source: value }
    }
}

#[cfg(test)]
impl PartialEq for EpubError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::ArchiveWriteError { path: l_path, .. },
                Self::ArchiveWriteError { path: r_path, .. },
            ) => l_path == r_path,
            (Self::DuplicateManifestId { id: l_id }, Self::DuplicateManifestId { id: r_id }) => {
                l_id == r_id
            }
            (
                Self::FileSystemError { path: l_path, .. },
                Self::FileSystemError { path: r_path, .. },
            ) => l_path == r_path,
            (Self::InvalidEntryName { name: l_name }, Self::InvalidEntryName { name: r_name }) => {
                l_name == r_name
            }
            (Self::ReservedChapterId { id: l_id }, Self::ReservedChapterId { id: r_id }) => {
                l_id == r_id
            }
            (
                Self::ResourceFetchError {
                    locator: l_locator,
                    ..
                },
                Self::ResourceFetchError {
                    locator: r_locator,
                    ..
                },
            ) => l_locator == r_locator,

            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}
