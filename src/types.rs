/// Book-level descriptive information
///
/// The `BookMetadata` structure collects everything the generated control files
/// need to describe the publication: identifiers, title, creator, publisher and
/// the table of contents title. It stays mutable until the builder is sealed and
/// is read-only input for the document generators afterwards.
///
/// Values are emitted verbatim into the generated XML; they are neither validated
/// nor escaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMetadata {
    pub author_name: String,

    /// ISBN of the publication
    ///
    /// Used both as the package unique identifier (`urn:isbn:...`) and as the
    /// `dtb:uid` of the navigation control file.
    pub isbn: String,

    pub book_title: String,
    pub publisher: String,

    /// Publication date
    ///
    /// When `None`, the date is derived from the injected clock at generation time.
    pub publication_date: Option<String>,

    /// Subject classification string, e.g. a BISAC code
    ///
    /// Passed through without checking it against any taxonomy.
    pub subject_classification: String,

    /// Title of the table of contents page
    pub table_of_contents_title: String,

    /// File name of the image used as cover
    ///
    /// This must be the destination name of an image added to the book.
    pub cover_file_name: Option<String>,

    /// Optional `dc:source` of the publication
    pub source: Option<String>,

    /// Custom style sheet text, appended after the baseline rules
    pub style: String,
}

impl Default for BookMetadata {
    fn default() -> Self {
        Self {
            author_name: String::new(),
            isbn: "000-0-000000-0".to_string(),
            book_title: String::new(),
            publisher: String::new(),
            publication_date: None,
            subject_classification: "NON000000 NON-CLASSIFIABLE".to_string(),
            table_of_contents_title: "Table Of Contents".to_string(),
            cover_file_name: None,
            source: None,
            style: String::new(),
        }
    }
}

/// Settable metadata attributes
///
/// Used with `EpubBuilder::set_metadata` to assign one attribute of [BookMetadata].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    AuthorName,
    Isbn,
    BookTitle,
    Publisher,
    PublicationDate,
    SubjectClassification,
    TableOfContentsTitle,
    CoverFileName,
    Source,
}

impl BookMetadata {
    /// Assigns a single attribute
    pub fn set(&mut self, field: MetadataField, value: &str) {
        let value = value.to_string();
        match field {
            MetadataField::AuthorName => self.author_name = value,
            MetadataField::Isbn => self.isbn = value,
            MetadataField::BookTitle => self.book_title = value,
            MetadataField::Publisher => self.publisher = value,
            MetadataField::PublicationDate => self.publication_date = Some(value),
            MetadataField::SubjectClassification => self.subject_classification = value,
            MetadataField::TableOfContentsTitle => self.table_of_contents_title = value,
            MetadataField::CoverFileName => self.cover_file_name = Some(value),
            MetadataField::Source => self.source = Some(value),
        }
    }
}

/// A chapter of the book
///
/// The identifier is used both as the file stem of the generated page
/// (`OEBPS/Text/{id}.xhtml`) and as the id referenced by the manifest, spine,
/// navigation map and guide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentEntry {
    pub id: String,

    /// Display title, used in the table of contents and navigation map
    pub title: String,

    /// Raw XHTML fragment placed inside the chapter page
    pub body: String,
}

/// Raw image payload stored under `OEBPS/Images/{name}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    /// Destination file name, also the manifest id of the image
    pub name: String,
    pub data: Vec<u8>,
}

/// Compression applied to an archive entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionMode {
    Stored,
    #[default]
    Deflated,
}

/// Kind of an archive entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File { payload: Vec<u8> },
}

/// A single entry of the container to be written
///
/// Paths are archive-relative and always use `/` as separator. Directory paths
/// are stored without a trailing slash; the archive writer adds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub kind: EntryKind,
    pub compression: CompressionMode,

    /// Marks the entry that must be physically first in the archive
    ///
    /// Only the `mimetype` entry carries this flag.
    pub fixed_first: bool,
}

impl ArchiveEntry {
    /// Creates a directory entry
    pub fn directory(path: &str) -> Self {
        Self {
            path: path.trim_end_matches('/').to_string(),
            kind: EntryKind::Directory,
            compression: CompressionMode::Stored,
            fixed_first: false,
        }
    }

    /// Creates a deflated file entry
    pub fn file(path: &str, payload: Vec<u8>) -> Self {
        Self {
            path: path.to_string(),
            kind: EntryKind::File { payload },
            compression: CompressionMode::Deflated,
            fixed_first: false,
        }
    }

    /// Creates the stored `mimetype` entry that must lead the container
    pub fn mimetype() -> Self {
        Self {
            path: crate::utils::MIMETYPE_PATH.to_string(),
            kind: EntryKind::File {
                payload: crate::utils::EPUB_MIMETYPE.as_bytes().to_vec(),
            },
            compression: CompressionMode::Stored,
            fixed_first: true,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, EntryKind::Directory)
    }
}

/// Represents a resource item declared in the package manifest
///
/// Manifest items are derived from the content model every time the package
/// document is generated and are never stored on their own, so the manifest
/// cannot drift from the chapters and images actually added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,

    /// Path relative to the package document
    pub href: String,

    /// The media type of the resource
    pub mime: String,
}

impl ManifestItem {
    pub fn new(id: &str, href: &str, mime: &str) -> Self {
        Self {
            id: id.to_string(),
            href: href.to_string(),
            mime: mime.to_string(),
        }
    }
}

/// Represents a reference of the package guide
///
/// The guide tells reading systems the role of the content documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideReference {
    pub href: String,
    pub title: String,

    /// Semantic role of the document, `text` when it has no special role
    pub reference_type: String,
}

/// Represents a navigation point of the generated navigation control file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavPoint {
    pub id: String,

    /// The display label of this navigation point
    pub label: String,

    /// Href of the referenced content document, relative to `OEBPS`
    pub content: String,

    /// The reading order position, starting at 1 for the cover
    pub play_order: usize,
}
