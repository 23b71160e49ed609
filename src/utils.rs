use std::path::Path;

use chrono::Local;
use infer::Infer;

/// Archive path of the entry that must lead the container
pub const MIMETYPE_PATH: &str = "mimetype";

/// Payload of the `mimetype` entry
pub const EPUB_MIMETYPE: &str = "application/epub+zip";

/// Directories of the staging tree, parents first
pub const STAGING_DIRECTORIES: [&str; 5] = [
    "META-INF",
    "OEBPS",
    "OEBPS/Images",
    "OEBPS/Styles",
    "OEBPS/Text",
];

pub const CONTAINER_PATH: &str = "META-INF/container.xml";
pub const DISPLAY_OPTIONS_PATH: &str = "META-INF/com.apple.ibooks.display-options.xml";
pub const OTHER_DATA_PATH: &str = "META-INF/other_data";
pub const PACKAGE_PATH: &str = "OEBPS/content.opf";
pub const NCX_PATH: &str = "OEBPS/toc.ncx";
pub const STYLESHEET_PATH: &str = "OEBPS/Styles/style.css";
pub const IMAGES_DIR: &str = "OEBPS/Images";
pub const TEXT_DIR: &str = "OEBPS/Text";

/// Ids of the generated cover and table of contents pages
pub const COVER_ID: &str = "cover";
pub const TOC_ID: &str = "toc";

/// Manifest ids of the navigation control file and the stylesheet
pub const NCX_ID: &str = "ncx";
pub const CSS_ID: &str = "css";

/// Manifest ids taken by generated documents
pub const RESERVED_IDS: [&str; 4] = [COVER_ID, TOC_ID, NCX_ID, CSS_ID];

/// Guide reference types that reading systems treat specially
///
/// A chapter whose id is one of these is tagged with the id as its guide type,
/// every other chapter is tagged `text`. `loi` is the list of illustrations and
/// `lot` the list of tables.
pub static GUIDE_TYPES: std::sync::LazyLock<Vec<&str>> = std::sync::LazyLock::new(|| {
    vec![
        "index",
        "glossary",
        "acknowledgements",
        "bibliography",
        "colophon",
        "copyright-page",
        "dedication",
        "epigraph",
        "foreword",
        "notes",
        "preface",
        "loi",
        "lot",
    ]
});

/// Returns the guide type of a chapter id
pub fn guide_type(id: &str) -> &str {
    if GUIDE_TYPES.contains(&id) { id } else { "text" }
}

/// Returns the current time with custom format
pub fn local_time() -> String {
    Local::now().format("%Y-%m-%dT%H-%M-%S.%fU%z").to_string()
}

/// Determines the media type of an image
///
/// The type is taken from the file extension of the destination name, with
/// `jpg` normalized to `image/jpeg`. Names without a recognized image extension
/// are sniffed from their content and fall back to `application/octet-stream`.
pub fn image_media_type(name: &str, data: &[u8]) -> String {
    let extension = match Path::new(name).extension() {
        Some(ext) => ext.to_string_lossy().to_lowercase(),
        None => String::new(),
    };

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg".to_string(),
        "svg" => "image/svg+xml".to_string(),
        "png" | "gif" | "webp" | "bmp" | "tiff" | "avif" => format!("image/{}", extension),
        _ => match Infer::new().get(data) {
            Some(infer_mime) => infer_mime.mime_type().to_string(),
            None => "application/octet-stream".to_string(),
        },
    }
}

/// Checks that a chapter id or image name is usable as a file name
///
/// The name must be a single non-empty path segment other than `.` and `..`.
pub fn is_valid_entry_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Removes leading and trailing slashes from an archive path
pub fn normalize_archive_path(path: &str) -> String {
    path.replace('\\', "/").trim_matches('/').to_string()
}
