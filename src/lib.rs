//! Epub packager
//!
//! A Rust library for assembling chapters, images and metadata into EPUB 2
//! files.
//!
//! The library accumulates a book in an `EpubBuilder`, generates every package
//! document from it (container, OPF package, NCX navigation, XHTML pages and
//! the stylesheet) and serializes the result into a ZIP container whose
//! `mimetype` entry comes first and is stored uncompressed.
//!
//! ## Features
//!
//! - Insertion-ordered chapters and images: re-adding an id replaces its
//!   content in place.
//! - Generated cover page, table of contents page and NCX navigation.
//! - Injectable clock, identifier source and image fetcher for reproducible
//!   output.
//! - In-memory or on-disk staging, atomic container writes.
//!
//! ## Quick Start
//!
//! ```rust, no_run
//! # use epub_packager::{builder::EpubBuilder, types::MetadataField};
//! # fn main() -> Result<(), epub_packager::error::EpubError> {
//! let mut builder = EpubBuilder::new("out/book.epub");
//! builder
//!     .set_metadata(MetadataField::BookTitle, "Dave's Grand")?
//!     .set_metadata(MetadataField::AuthorName, "David Rawk")?
//!     .add_chapter("chap_1", "Chapter 1", "<h2>Hello</h2>")?
//!     .add_image("cover.png", "assets/cover.png")?
//!     .set_metadata(MetadataField::CoverFileName, "cover.png")?;
//!
//! let path = builder.close()?;
//! println!("written to {}", path.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//!
//! - `disk-staging` (default): Enable `staging::DirectoryStaging`, which stages
//!   the book in a temporary directory instead of memory.

pub(crate) mod utils;

pub mod archive;
pub mod builder;
pub mod error;
pub mod provider;
pub mod staging;
pub mod types;

pub use builder::EpubBuilder;
pub use error::EpubError;
pub use types::MetadataField;
