//! Epub Builder
//!
//! This module provides the packaging engine: `EpubBuilder` accumulates the
//! chapters, images, metadata and styling of a book and packages them into an
//! EPUB container when it is closed.
//!
//! ## Usage
//!
//! ```rust, no_run
//! # fn main() -> Result<(), epub_packager::error::EpubError> {
//! use epub_packager::{builder::EpubBuilder, types::MetadataField};
//!
//! let path = EpubBuilder::open("daves_book.epub", |book| {
//!     book.set_metadata(MetadataField::AuthorName, "David Rawk")?
//!         .set_metadata(MetadataField::BookTitle, "Dave's Grand")?
//!         .append_style("h2{color: red}")?
//!         .add_chapter("chap_1", "Chapter 1", "<h2>Hello</h2>From the <i>overworld</i>.")?
//!         .add_image("puppers.png", "assets/puppers.png")?
//!         .set_metadata(MetadataField::CoverFileName, "puppers.png")?;
//!     Ok(())
//! })?;
//! println!("written to {}", path.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Notes
//!
//! - Closing seals the builder. Any later mutation, or a second close, fails
//!   with `EpubError::BuilderSealed`.
//! - Files are staged in memory unless another staging area is configured;
//!   the container is written next to the target and moved into place only
//!   when complete.

pub mod documents;
pub mod model;

use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::{
    archive::ArchiveWriter,
    builder::{
        documents::{GenerationContext, render_all},
        model::ContentModel,
    },
    error::EpubError,
    provider::{Clock, IdSource, LocalFileFetcher, RandomUuid, ResourceFetcher, SystemClock},
    staging::{MemoryStaging, StagingArea},
    types::{BookMetadata, MetadataField},
    utils::{IMAGES_DIR, OTHER_DATA_PATH, STAGING_DIRECTORIES, TEXT_DIR},
};

/// EPUB Builder
///
/// Holds the content model together with the collaborators used while
/// packaging: the byte source for images, the clock, the id source, the
/// staging area and the archive writer.
pub struct EpubBuilder {
    /// Path of the container written by `close`
    output_path: PathBuf,

    model: ContentModel,

    fetcher: Box<dyn ResourceFetcher>,
    clock: Box<dyn Clock>,
    id_source: Box<dyn IdSource>,

    /// Staging area used by `close`, an in-memory one when not configured
    staging: Option<Box<dyn StagingArea>>,

    archive: ArchiveWriter,
}

impl EpubBuilder {
    /// Create a new `EpubBuilder` writing to `output_path`
    ///
    /// Images are fetched from the local file system, time comes from the
    /// system clock and the publication UUID is random.
    pub fn new<P: AsRef<Path>>(output_path: P) -> Self {
        EpubBuilder {
            output_path: output_path.as_ref().to_path_buf(),
            model: ContentModel::new(),
            fetcher: Box::new(LocalFileFetcher),
            clock: Box::new(SystemClock),
            id_source: Box::new(RandomUuid),
            staging: None,
            archive: ArchiveWriter::new(),
        }
    }

    /// Create a builder writing into a fresh timestamped directory
    ///
    /// The container is written to
    /// `{base_dir}/{file name without dots}_{unix seconds}/{file_name}`.
    pub fn timestamped<P: AsRef<Path>>(base_dir: P, file_name: &str) -> Self {
        Self::timestamped_with_clock(base_dir, file_name, SystemClock)
    }

    /// Create a builder writing into a timestamped directory named after `clock`
    ///
    /// The same clock is installed on the builder, so it also provides the
    /// publication timestamp when the builder is closed.
    pub fn timestamped_with_clock<P, C>(base_dir: P, file_name: &str, clock: C) -> Self
    where
        P: AsRef<Path>,
        C: Clock + 'static,
    {
        let output_path = timestamped_path(base_dir, file_name, &clock);
        Self::new(output_path).with_clock(clock)
    }

    /// Builds a book in one go
    ///
    /// Runs `fill` on a new builder and closes it afterwards.
    ///
    /// # Return
    /// - `Ok(PathBuf)`: Path of the written container
    /// - `Err(EpubError)`: `fill` failed or packaging failed
    pub fn open<P, F>(output_path: P, fill: F) -> Result<PathBuf, EpubError>
    where
        P: AsRef<Path>,
        F: FnOnce(&mut EpubBuilder) -> Result<(), EpubError>,
    {
        let mut builder = Self::new(output_path);
        fill(&mut builder)?;
        builder.close()
    }

    pub fn with_fetcher<F: ResourceFetcher + 'static>(mut self, fetcher: F) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    /// Replaces the clock
    ///
    /// The clock is read when the builder is closed. It does not move an output
    /// path already computed by [EpubBuilder::timestamped].
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_id_source<I: IdSource + 'static>(mut self, id_source: I) -> Self {
        self.id_source = Box::new(id_source);
        self
    }

    pub fn with_staging<S: StagingArea + 'static>(mut self, staging: S) -> Self {
        self.staging = Some(Box::new(staging));
        self
    }

    /// Sets the deflate level of compressed archive entries
    pub fn with_compression_level(mut self, level: Option<i64>) -> Self {
        self.archive = self.archive.with_compression_level(level);
        self
    }

    /// Path of the container written by `close`
    pub fn path(&self) -> &Path {
        &self.output_path
    }

    pub fn metadata(&self) -> &BookMetadata {
        self.model.metadata()
    }

    pub fn model(&self) -> &ContentModel {
        &self.model
    }

    /// Chapter ids and titles, in reading order
    pub fn content(&self) -> Vec<(&str, &str)> {
        self.model
            .chapters()
            .map(|entry| (entry.id.as_str(), entry.title.as_str()))
            .collect()
    }

    /// Accumulated custom style text
    pub fn style(&self) -> &str {
        &self.model.metadata().style
    }

    pub fn is_sealed(&self) -> bool {
        self.model.is_sealed()
    }

    /// Set a metadata attribute
    ///
    /// The value is written verbatim into the generated documents.
    pub fn set_metadata(
        &mut self,
        field: MetadataField,
        value: &str,
    ) -> Result<&mut Self, EpubError> {
        self.model.set_metadata(field, value)?;
        Ok(self)
    }

    /// Add a chapter
    ///
    /// Adding a chapter with an id already present replaces its title and
    /// body but keeps its position in the reading order.
    ///
    /// # Parameters
    /// - `id`: File stem and reference id of the chapter
    /// - `title`: Title shown in the table of contents
    /// - `body`: XHTML fragment, inserted without escaping
    pub fn add_chapter(&mut self, id: &str, title: &str, body: &str) -> Result<&mut Self, EpubError> {
        self.model.add_chapter(id, title, body)?;
        Ok(self)
    }

    /// Add an image fetched through the resource fetcher
    ///
    /// # Parameters
    /// - `dest_name`: File name under `OEBPS/Images`, also the manifest id
    /// - `locator`: Location handed to the fetcher
    ///
    /// # Return
    /// - `Ok(&mut Self)`: The image was stored
    /// - `Err(EpubError)`: The builder is sealed, `dest_name` is not usable as a
    ///   manifest id, or the fetch failed
    pub fn add_image(&mut self, dest_name: &str, locator: &str) -> Result<&mut Self, EpubError> {
        self.model.check_image_name(dest_name)?;

        let data = self
            .fetcher
            .fetch(locator)
            .map_err(|source| EpubError::ResourceFetchError {
                locator: locator.to_string(),
                source,
            })?;

        self.model.add_image(dest_name, data)?;
        Ok(self)
    }

    /// Add an image from bytes already in memory
    pub fn add_image_bytes(&mut self, dest_name: &str, data: Vec<u8>) -> Result<&mut Self, EpubError> {
        self.model.add_image(dest_name, data)?;
        Ok(self)
    }

    pub fn append_style(&mut self, text: &str) -> Result<&mut Self, EpubError> {
        self.model.append_style(text)?;
        Ok(self)
    }

    /// Replaces the accumulated style text
    pub fn set_style(&mut self, text: &str) -> Result<&mut Self, EpubError> {
        self.model.set_style(text)?;
        Ok(self)
    }

    /// Stores an opaque payload at `META-INF/other_data`
    pub fn set_other_data(&mut self, data: &[u8]) -> Result<&mut Self, EpubError> {
        self.model.set_other_data(data)?;
        Ok(self)
    }

    /// Packages the book and seals the builder
    ///
    /// Generates every document, stages it together with the images and the
    /// other data, and writes the container.
    ///
    /// # Return
    /// - `Ok(PathBuf)`: Path of the written container
    /// - `Err(EpubError)`: The builder was already closed, or staging or
    ///   archiving failed. The builder stays sealed either way.
    pub fn close(&mut self) -> Result<PathBuf, EpubError> {
        self.model.seal()?;

        let context = GenerationContext {
            timestamp: self.clock.now(),
            uuid: self.id_source.generate(),
        };

        let mut staging = self
            .staging
            .take()
            .unwrap_or_else(|| Box::new(MemoryStaging::new()));
        self.stage(staging.as_mut(), &context)?;

        let entries = staging.entries()?;
        debug!("archiving {} staged entries", entries.len());
        let path = self.archive.write(&entries, &self.output_path)?;

        info!(
            "sealed \"{}\" with {} chapters and {} images into {}",
            self.model.metadata().book_title,
            self.model.chapter_count(),
            self.model.image_count(),
            path.display()
        );
        Ok(path)
    }

    /// Materializes the staging tree
    fn stage(
        &self,
        staging: &mut dyn StagingArea,
        context: &GenerationContext,
    ) -> Result<(), EpubError> {
        for directory in STAGING_DIRECTORIES {
            staging.ensure_directory(directory)?;
        }

        for (path, data) in render_all(&self.model, context)? {
            debug!("staging {}", path);
            staging.write_file(&path, &data)?;
        }

        for image in self.model.images() {
            staging.write_file(&format!("{}/{}", IMAGES_DIR, image.name), &image.data)?;
        }

        if let Some(data) = self.model.other_data() {
            staging.write_file(OTHER_DATA_PATH, data)?;
        }

        self.check_staged(staging)
    }

    /// Compares the staged text and image files with the model
    ///
    /// A staging area reused from an earlier run may hold extra files that the
    /// manifest does not declare.
    fn check_staged(&self, staging: &dyn StagingArea) -> Result<(), EpubError> {
        let texts = staging.list_entries(TEXT_DIR)?.len();
        let expected_texts = self.model.chapter_count() + 2;
        if texts != expected_texts {
            warn!(
                "{} holds {} files but the manifest declares {}",
                TEXT_DIR, texts, expected_texts
            );
        }

        let images = staging.list_entries(IMAGES_DIR)?.len();
        if images != self.model.image_count() {
            warn!(
                "{} holds {} files but the manifest declares {}",
                IMAGES_DIR,
                images,
                self.model.image_count()
            );
        }

        Ok(())
    }
}

/// Computes `{base_dir}/{file name without dots}_{unix seconds}/{file_name}`
pub fn timestamped_path<P: AsRef<Path>>(base_dir: P, file_name: &str, clock: &dyn Clock) -> PathBuf {
    let directory = format!("{}_{}", file_name.replace('.', ""), clock.now().timestamp());
    base_dir.as_ref().join(directory).join(file_name)
}
