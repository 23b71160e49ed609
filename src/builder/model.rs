//! Content Model
//!
//! The mutable accumulator behind `EpubBuilder`. Chapters and images are kept in
//! insertion-ordered maps: adding an entry with an existing key replaces its
//! value but keeps its original position, so insertion order stays the reading
//! and navigation order of the book.
//!
//! Chapter ids and image names share one manifest id space. The ids of the
//! generated documents are reserved, and a chapter and an image never share an
//! id.
//!
//! The model is either open or sealed. Packaging seals it, after which every
//! mutation fails with `EpubError::BuilderSealed`.

use indexmap::IndexMap;

use crate::{
    error::EpubError,
    types::{BookMetadata, ContentEntry, ImageAsset, MetadataField},
    utils::{RESERVED_IDS, is_valid_entry_name},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Open,
    Sealed,
}

#[derive(Debug, Clone)]
pub struct ContentModel {
    state: ModelState,
    metadata: BookMetadata,
    chapters: IndexMap<String, ContentEntry>,
    images: IndexMap<String, ImageAsset>,

    /// Opaque payload stored at `META-INF/other_data`
    other_data: Option<Vec<u8>>,
}

impl Default for ContentModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentModel {
    pub fn new() -> Self {
        Self {
            state: ModelState::Open,
            metadata: BookMetadata::default(),
            chapters: IndexMap::new(),
            images: IndexMap::new(),
            other_data: None,
        }
    }

    fn ensure_open(&self) -> Result<(), EpubError> {
        match self.state {
            ModelState::Open => Ok(()),
            ModelState::Sealed => Err(EpubError::BuilderSealed),
        }
    }

    pub fn set_metadata(&mut self, field: MetadataField, value: &str) -> Result<(), EpubError> {
        self.ensure_open()?;
        self.metadata.set(field, value);
        Ok(())
    }

    /// Inserts or replaces a chapter
    ///
    /// A replaced chapter keeps its position in the reading order.
    /// The ids `cover`, `toc`, `ncx` and `css` are reserved for the generated
    /// documents, and an id already used by an image is rejected.
    pub fn add_chapter(&mut self, id: &str, title: &str, body: &str) -> Result<(), EpubError> {
        self.ensure_open()?;
        if !is_valid_entry_name(id) {
            return Err(EpubError::InvalidEntryName { name: id.to_string() });
        }
        if RESERVED_IDS.contains(&id) {
            return Err(EpubError::ReservedChapterId { id: id.to_string() });
        }
        if self.images.contains_key(id) {
            return Err(EpubError::DuplicateManifestId { id: id.to_string() });
        }

        self.chapters.insert(
            id.to_string(),
            ContentEntry {
                id: id.to_string(),
                title: title.to_string(),
                body: body.to_string(),
            },
        );
        Ok(())
    }

    /// Checks that an image could be stored under `name`
    ///
    /// The name must be a single path segment that is neither a reserved id nor
    /// the id of a chapter.
    pub fn check_image_name(&self, name: &str) -> Result<(), EpubError> {
        self.ensure_open()?;
        if !is_valid_entry_name(name) {
            return Err(EpubError::InvalidEntryName {
                name: name.to_string(),
            });
        }
        if RESERVED_IDS.contains(&name) || self.chapters.contains_key(name) {
            return Err(EpubError::DuplicateManifestId {
                id: name.to_string(),
            });
        }

        Ok(())
    }

    /// Inserts or replaces an image, last write wins
    pub fn add_image(&mut self, name: &str, data: Vec<u8>) -> Result<(), EpubError> {
        self.check_image_name(name)?;
        self.images.insert(
            name.to_string(),
            ImageAsset {
                name: name.to_string(),
                data,
            },
        );
        Ok(())
    }

    pub fn append_style(&mut self, text: &str) -> Result<(), EpubError> {
        self.ensure_open()?;
        self.metadata.style.push_str(text);
        Ok(())
    }

    pub fn set_style(&mut self, text: &str) -> Result<(), EpubError> {
        self.ensure_open()?;
        self.metadata.style = text.to_string();
        Ok(())
    }

    pub fn set_other_data(&mut self, data: &[u8]) -> Result<(), EpubError> {
        self.ensure_open()?;
        self.other_data = Some(data.to_vec());
        Ok(())
    }

    /// Moves the model to the sealed state
    ///
    /// Sealing twice is an error, a model is packaged only once.
    pub fn seal(&mut self) -> Result<(), EpubError> {
        self.ensure_open()?;
        self.state = ModelState::Sealed;
        Ok(())
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    pub fn is_sealed(&self) -> bool {
        self.state == ModelState::Sealed
    }

    pub fn metadata(&self) -> &BookMetadata {
        &self.metadata
    }

    /// Chapters in reading order
    pub fn chapters(&self) -> impl Iterator<Item = &ContentEntry> {
        self.chapters.values()
    }

    pub fn chapter(&self, id: &str) -> Option<&ContentEntry> {
        self.chapters.get(id)
    }

    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }

    /// Images in insertion order
    pub fn images(&self) -> impl Iterator<Item = &ImageAsset> {
        self.images.values()
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn other_data(&self) -> Option<&[u8]> {
        self.other_data.as_deref()
    }
}
