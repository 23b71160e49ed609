//! External collaborators
//!
//! The packaging engine does not read images, look at the wall clock or draw
//! random identifiers by itself. These concerns are expressed as small traits so
//! that callers can plug in their own sources and tests can fix every
//! non-deterministic input.
//!
//! - [ResourceFetcher] supplies the bytes of images added by locator.
//! - [Clock] supplies the time used for the publication date, the copyright year
//!   and timestamped output directories.
//! - [IdSource] supplies the UUID identifier of the publication.

use std::{fs, io};

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Byte source used by `EpubBuilder::add_image`
///
/// A locator is whatever the implementation understands, e.g. a local path.
/// Failures are reported to the caller as `EpubError::ResourceFetchError`.
pub trait ResourceFetcher {
    fn fetch(&self, locator: &str) -> io::Result<Vec<u8>>;
}

/// Reads resources from the local file system, the locator being a path
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileFetcher;

impl ResourceFetcher for LocalFileFetcher {
    fn fetch(&self, locator: &str) -> io::Result<Vec<u8>> {
        fs::read(locator)
    }
}

impl<F> ResourceFetcher for F
where
    F: Fn(&str) -> io::Result<Vec<u8>>,
{
    fn fetch(&self, locator: &str) -> io::Result<Vec<u8>> {
        self(locator)
    }
}

/// Time source of the generators
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a given instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Source of the publication UUID
pub trait IdSource {
    fn generate(&self) -> String;
}

/// Draws a random version 4 UUID
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomUuid;

impl IdSource for RandomUuid {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Always returns the same identifier
#[derive(Debug, Clone)]
pub struct FixedId(pub String);

impl IdSource for FixedId {
    fn generate(&self) -> String {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::{env, fs, io};

    use chrono::{TimeZone, Utc};

    use crate::{
        provider::{
            Clock, FixedClock, FixedId, IdSource, LocalFileFetcher, RandomUuid, ResourceFetcher,
        },
        utils::local_time,
    };

    #[test]
    fn test_local_file_fetcher() {
        let temp_dir = env::temp_dir().join(local_time());
        fs::create_dir_all(&temp_dir).unwrap();
        let image = temp_dir.join("image.png");
        fs::write(&image, b"bloop bloop").unwrap();

        let data = LocalFileFetcher.fetch(image.to_str().unwrap()).unwrap();
        assert_eq!(data, b"bloop bloop");

        let missing = LocalFileFetcher.fetch(temp_dir.join("missing.png").to_str().unwrap());
        assert_eq!(missing.unwrap_err().kind(), io::ErrorKind::NotFound);

        fs::remove_dir_all(temp_dir).unwrap();
    }

    #[test]
    fn test_closure_fetcher() {
        let fetcher = |locator: &str| -> io::Result<Vec<u8>> { Ok(locator.as_bytes().to_vec()) };
        assert_eq!(fetcher.fetch("abc").unwrap(), b"abc");
    }

    #[test]
    fn test_fixed_sources() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(FixedClock(instant).now(), instant);
        assert_eq!(FixedId("book-id".to_string()).generate(), "book-id");
    }

    #[test]
    fn test_random_uuid() {
        let first = RandomUuid.generate();
        let second = RandomUuid.generate();

        assert_eq!(first.len(), 36);
        assert_ne!(first, second);
    }
}
