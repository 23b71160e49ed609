//! Document Generators
//!
//! Pure functions turning a sealed [ContentModel] into the files of the book:
//! the container pointer, the Apple display options, the style sheet, the cover,
//! chapter and table of contents pages, the navigation control file and the
//! package document.
//!
//! Every value that depends on the wall clock or on randomness comes from the
//! [GenerationContext], so the same model and context always produce the same
//! bytes.
//!
//! ## Notes
//!
//! - Titles, metadata values and chapter bodies are written verbatim. They are
//!   not escaped, which lets callers pass pre-formatted markup; keeping the
//!   result well-formed is up to the caller.
//! - The package document follows the OPF 2.0.1 layout (metadata, manifest,
//!   spine, guide) and navigation uses an NCX file.

use std::io::Cursor;

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use quick_xml::{
    Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

use crate::{
    builder::model::ContentModel,
    error::EpubError,
    types::{ContentEntry, GuideReference, ManifestItem, NavPoint},
    utils::{
        CONTAINER_PATH, COVER_ID, CSS_ID, DISPLAY_OPTIONS_PATH, NCX_ID, NCX_PATH, PACKAGE_PATH,
        STYLESHEET_PATH, TEXT_DIR, TOC_ID, guide_type, image_media_type,
    },
};

pub(crate) type XmlWriter = Writer<Cursor<Vec<u8>>>;

const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
const XHTML_DOCTYPE: &str =
    r#"html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd""#;
const NCX_DOCTYPE: &str =
    r#"ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd""#;
const XHTML_MIME: &str = "application/xhtml+xml";
const CONTENT_LANGUAGE: &str = "en-US";

const BASE_STYLE: [&str; 7] = [
    "body { line-height: 1.5em; }",
    "p.first { text-indent: 0; }",
    "@media amzn-mobi { p.first { text-indent: 0; } }",
    "img { max-width: 98%; }",
    "#cover-image { text-align: center; }",
    "#cover h1 { max-width: 75%; line-height: 1.5em; text-align: center; text-transform: uppercase; \
     padding: 20pt; color: white; margin: auto; margin-top: 20%; background-color: black; \
     width: fit-content; }",
    "#cover h3 { text-align: center; }",
];

/// Non-deterministic inputs of a generation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationContext {
    /// Source of the copyright year and of the default publication date
    pub timestamp: DateTime<Utc>,

    /// Generated identifier of the publication, without the `urn:uuid:` prefix
    pub uuid: String,
}

/// Generates every document of the book
///
/// # Return
/// - `Ok(Vec<(String, Vec<u8>)>)`: Archive path and content of each generated
///   file, in the order they should be staged
/// - `Err(EpubError)`: Error occurred while writing a document
pub fn render_all(
    model: &ContentModel,
    context: &GenerationContext,
) -> Result<Vec<(String, Vec<u8>)>, EpubError> {
    let mut files = vec![
        (CONTAINER_PATH.to_string(), container_xml()?),
        (DISPLAY_OPTIONS_PATH.to_string(), display_options_xml()?),
        (STYLESHEET_PATH.to_string(), stylesheet(model)),
        (text_path(COVER_ID), cover_page(model)?),
    ];

    for entry in model.chapters() {
        files.push((text_path(&entry.id), chapter_page(entry)?));
    }

    files.push((text_path(TOC_ID), toc_page(model)?));
    files.push((NCX_PATH.to_string(), toc_ncx(model)?));
    files.push((PACKAGE_PATH.to_string(), content_opf(model, context)?));

    Ok(files)
}

fn text_path(id: &str) -> String {
    format!("{}/{}.xhtml", TEXT_DIR, id)
}

/// Creates a start tag whose attribute values are written as given
fn element<'a>(name: &'a str, attributes: &[(&str, &str)]) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    for &(key, value) in attributes {
        start.push_attribute((key.as_bytes(), value.as_bytes()));
    }
    start
}

fn write_text_element(
    writer: &mut XmlWriter,
    name: &str,
    attributes: &[(&str, &str)],
    text: &str,
) -> Result<(), EpubError> {
    writer.write_event(Event::Start(element(name, attributes)))?;
    writer.write_event(Event::Text(BytesText::from_escaped(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Creates the `META-INF/container.xml` content
///
/// The container always points at `OEBPS/content.opf`.
pub fn container_xml() -> Result<Vec<u8>, EpubError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    writer.write_event(Event::Start(element(
        "container",
        &[
            ("version", "1.0"),
            ("xmlns", "urn:oasis:names:tc:opendocument:xmlns:container"),
        ],
    )))?;
    writer.write_event(Event::Start(BytesStart::new("rootfiles")))?;
    writer.write_event(Event::Empty(element(
        "rootfile",
        &[
            ("full-path", PACKAGE_PATH),
            ("media-type", "application/oebps-package+xml"),
        ],
    )))?;
    writer.write_event(Event::End(BytesEnd::new("rootfiles")))?;
    writer.write_event(Event::End(BytesEnd::new("container")))?;

    Ok(writer.into_inner().into_inner())
}

/// Creates the Apple Books display options, turning off publisher fonts
pub fn display_options_xml() -> Result<Vec<u8>, EpubError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("display_options")))?;
    writer.write_event(Event::Start(element("platform", &[("name", "*")])))?;
    write_text_element(&mut writer, "option", &[("name", "specified-fonts")], "false")?;
    writer.write_event(Event::End(BytesEnd::new("platform")))?;
    writer.write_event(Event::End(BytesEnd::new("display_options")))?;

    Ok(writer.into_inner().into_inner())
}

/// Creates the style sheet: baseline rules, then the custom style text
pub fn stylesheet(model: &ContentModel) -> Vec<u8> {
    let mut text = BASE_STYLE.join("\n");
    text.push('\n');
    text.push_str(&model.metadata().style);
    text.into_bytes()
}

/// Writes the XHTML 1.1 shell shared by all pages
///
/// `make_body` writes the content of the `div` wrapping the page body.
fn make_page<F>(div_id: &str, title: &str, make_body: F) -> Result<Vec<u8>, EpubError>
where
    F: FnOnce(&mut XmlWriter) -> Result<(), EpubError>,
{
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), Some("no"))))?;
    writer.write_event(Event::DocType(BytesText::from_escaped(XHTML_DOCTYPE)))?;
    writer.write_event(Event::Start(element("html", &[("xmlns", XHTML_NAMESPACE)])))?;

    // make head
    writer.write_event(Event::Start(BytesStart::new("head")))?;
    write_text_element(&mut writer, "title", &[], title)?;
    writer.write_event(Event::Empty(element(
        "link",
        &[
            ("href", "../Styles/style.css"),
            ("rel", "stylesheet"),
            ("type", "text/css"),
        ],
    )))?;
    writer.write_event(Event::End(BytesEnd::new("head")))?;

    // make body
    writer.write_event(Event::Start(BytesStart::new("body")))?;
    writer.write_event(Event::Start(element(
        "div",
        &[("id", div_id), ("xml:lang", CONTENT_LANGUAGE)],
    )))?;
    make_body(&mut writer)?;
    writer.write_event(Event::End(BytesEnd::new("div")))?;
    writer.write_event(Event::End(BytesEnd::new("body")))?;

    writer.write_event(Event::End(BytesEnd::new("html")))?;

    Ok(writer.into_inner().into_inner())
}

/// Creates the page of a chapter, the body markup is inserted as is
pub fn chapter_page(entry: &ContentEntry) -> Result<Vec<u8>, EpubError> {
    make_page(&entry.id, &entry.title, |writer| {
        writer.write_event(Event::Text(BytesText::from_escaped(entry.body.as_str())))?;
        Ok(())
    })
}

/// Creates the cover page
///
/// Shows the cover image when one is set, otherwise the title and author.
pub fn cover_page(model: &ContentModel) -> Result<Vec<u8>, EpubError> {
    let metadata = model.metadata();

    make_page(COVER_ID, "Cover", |writer| {
        match &metadata.cover_file_name {
            Some(cover) => {
                let src = format!("../Images/{}", cover);
                writer.write_event(Event::Start(element("div", &[("id", "cover-image")])))?;
                writer.write_event(Event::Empty(element(
                    "img",
                    &[("alt", metadata.book_title.as_str()), ("src", src.as_str())],
                )))?;
                writer.write_event(Event::End(BytesEnd::new("div")))?;
            }
            None => {
                write_text_element(writer, "h1", &[], &metadata.book_title)?;
                write_text_element(writer, "h3", &[], &format!("By: {}", metadata.author_name))?;
            }
        }
        Ok(())
    })
}

/// Creates the table of contents page, one link per chapter in reading order
pub fn toc_page(model: &ContentModel) -> Result<Vec<u8>, EpubError> {
    let title = &model.metadata().table_of_contents_title;

    make_page(TOC_ID, title, |writer| {
        write_text_element(writer, "h1", &[], title)?;
        writer.write_event(Event::Start(BytesStart::new("ul")))?;

        for entry in model.chapters() {
            let href = format!("../Text/{}.xhtml", entry.id);
            writer.write_event(Event::Start(BytesStart::new("li")))?;
            writer.write_event(Event::Start(element("a", &[("href", href.as_str())])))?;
            write_text_element(writer, "span", &[], &entry.title)?;
            writer.write_event(Event::End(BytesEnd::new("a")))?;
            writer.write_event(Event::End(BytesEnd::new("li")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("ul")))?;
        Ok(())
    })
}

/// Navigation points of the book: the cover, then every chapter
pub fn nav_points(model: &ContentModel) -> Vec<NavPoint> {
    let mut points = vec![NavPoint {
        id: "navpoint-cover".to_string(),
        label: "Cover".to_string(),
        content: format!("Text/{}.xhtml", COVER_ID),
        play_order: 1,
    }];

    for (index, entry) in model.chapters().enumerate() {
        points.push(NavPoint {
            id: entry.id.clone(),
            label: entry.title.clone(),
            content: format!("Text/{}.xhtml", entry.id),
            play_order: index + 2,
        });
    }

    points
}

/// Creates the navigation control file `toc.ncx`
pub fn toc_ncx(model: &ContentModel) -> Result<Vec<u8>, EpubError> {
    let metadata = model.metadata();
    let uid = format!("urn:isbn:{}", metadata.isbn);

    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("no"))))?;
    writer.write_event(Event::DocType(BytesText::from_escaped(NCX_DOCTYPE)))?;
    writer.write_event(Event::Start(element(
        "ncx",
        &[
            ("xmlns", "http://www.daisy.org/z3986/2005/ncx/"),
            ("version", "2005-1"),
        ],
    )))?;

    writer.write_event(Event::Start(BytesStart::new("head")))?;
    for (content, name) in [
        (uid.as_str(), "dtb:uid"),
        ("1", "dtb:depth"),
        ("0", "dtb:totalPageCount"),
        ("0", "dtb:maxPageNumber"),
    ] {
        writer.write_event(Event::Empty(element(
            "meta",
            &[("content", content), ("name", name)],
        )))?;
    }
    writer.write_event(Event::End(BytesEnd::new("head")))?;

    writer.write_event(Event::Start(BytesStart::new("docTitle")))?;
    write_text_element(&mut writer, "text", &[], &metadata.book_title)?;
    writer.write_event(Event::End(BytesEnd::new("docTitle")))?;

    writer.write_event(Event::Start(BytesStart::new("navMap")))?;
    for point in nav_points(model) {
        let play_order = point.play_order.to_string();

        writer.write_event(Event::Start(element(
            "navPoint",
            &[("id", point.id.as_str()), ("playOrder", play_order.as_str())],
        )))?;
        writer.write_event(Event::Start(BytesStart::new("navLabel")))?;
        write_text_element(&mut writer, "text", &[], &point.label)?;
        writer.write_event(Event::End(BytesEnd::new("navLabel")))?;
        writer.write_event(Event::Empty(element(
            "content",
            &[("src", point.content.as_str())],
        )))?;
        writer.write_event(Event::End(BytesEnd::new("navPoint")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("navMap")))?;

    writer.write_event(Event::End(BytesEnd::new("ncx")))?;

    Ok(writer.into_inner().into_inner())
}

/// Manifest of the package document
///
/// The navigation control file and the style sheet, every image keyed by its
/// destination name, then the cover, table of contents and chapter pages.
pub fn manifest_items(model: &ContentModel) -> Vec<ManifestItem> {
    let mut items = vec![
        ManifestItem::new(NCX_ID, "toc.ncx", "application/x-dtbncx+xml"),
        ManifestItem::new(CSS_ID, "Styles/style.css", "text/css"),
    ];

    for image in model.images() {
        items.push(ManifestItem::new(
            &image.name,
            &format!("Images/{}", image.name),
            &image_media_type(&image.name, &image.data),
        ));
    }

    let text_ids = [COVER_ID, TOC_ID]
        .into_iter()
        .chain(model.chapters().map(|entry| entry.id.as_str()));
    for id in text_ids {
        items.push(ManifestItem::new(id, &format!("Text/{}.xhtml", id), XHTML_MIME));
    }

    items
}

/// Reading order: cover, table of contents, then the chapters
pub fn spine_idrefs(model: &ContentModel) -> Vec<String> {
    [COVER_ID, TOC_ID]
        .into_iter()
        .map(str::to_string)
        .chain(model.chapters().map(|entry| entry.id.clone()))
        .collect()
}

/// Guide references, one per chapter
pub fn guide_references(model: &ContentModel) -> Vec<GuideReference> {
    model
        .chapters()
        .map(|entry| GuideReference {
            href: format!("Text/{}.xhtml", entry.id),
            title: entry.title.clone(),
            reference_type: guide_type(&entry.id).to_string(),
        })
        .collect()
}

/// Creates the package document `content.opf`
pub fn content_opf(
    model: &ContentModel,
    context: &GenerationContext,
) -> Result<Vec<u8>, EpubError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), Some("yes"))))?;
    writer.write_event(Event::Start(element(
        "package",
        &[
            ("xmlns", "http://www.idpf.org/2007/opf"),
            ("unique-identifier", "bookid"),
            ("version", "2.0"),
            ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
        ],
    )))?;

    make_opf_metadata(&mut writer, model, context)?;
    make_opf_manifest(&mut writer, model)?;
    make_opf_spine(&mut writer, model)?;
    make_opf_guide(&mut writer, model)?;

    writer.write_event(Event::End(BytesEnd::new("package")))?;

    Ok(writer.into_inner().into_inner())
}

fn make_opf_metadata(
    writer: &mut XmlWriter,
    model: &ContentModel,
    context: &GenerationContext,
) -> Result<(), EpubError> {
    let metadata = model.metadata();
    let author = metadata.author_name.as_str();
    let date = match &metadata.publication_date {
        Some(date) => date.clone(),
        None => context.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
    };

    writer.write_event(Event::Start(element(
        "metadata",
        &[
            ("xmlns:opf", "http://www.idpf.org/2007/opf"),
            ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
        ],
    )))?;

    write_text_element(
        writer,
        "dc:identifier",
        &[("id", "bookid"), ("opf:scheme", "ISBN")],
        &format!("urn:isbn:{}", metadata.isbn),
    )?;
    write_text_element(writer, "dc:title", &[], &metadata.book_title)?;
    write_text_element(
        writer,
        "dc:rights",
        &[],
        &format!(
            "Copyright © {} {}. All rights reserved.",
            context.timestamp.year(),
            author
        ),
    )?;
    write_text_element(writer, "dc:subject", &[], &metadata.subject_classification)?;
    write_text_element(
        writer,
        "dc:creator",
        &[("opf:file-as", author), ("opf:role", "aut")],
        author,
    )?;
    if let Some(source) = &metadata.source {
        write_text_element(writer, "dc:source", &[], source)?;
    }
    write_text_element(writer, "dc:publisher", &[], &metadata.publisher)?;
    write_text_element(writer, "dc:date", &[("opf:event", "publication")], &date)?;
    write_text_element(writer, "dc:language", &[], "en")?;
    write_text_element(
        writer,
        "dc:identifier",
        &[("opf:scheme", "UUID")],
        &format!("urn:uuid:{}", context.uuid),
    )?;
    if let Some(cover) = &metadata.cover_file_name {
        writer.write_event(Event::Empty(element(
            "meta",
            &[("name", "cover"), ("content", cover.as_str())],
        )))?;
    }

    writer.write_event(Event::End(BytesEnd::new("metadata")))?;

    Ok(())
}

fn make_opf_manifest(writer: &mut XmlWriter, model: &ContentModel) -> Result<(), EpubError> {
    writer.write_event(Event::Start(BytesStart::new("manifest")))?;

    for item in manifest_items(model) {
        writer.write_event(Event::Empty(element(
            "item",
            &[
                ("href", item.href.as_str()),
                ("id", item.id.as_str()),
                ("media-type", item.mime.as_str()),
            ],
        )))?;
    }

    writer.write_event(Event::End(BytesEnd::new("manifest")))?;

    Ok(())
}

fn make_opf_spine(writer: &mut XmlWriter, model: &ContentModel) -> Result<(), EpubError> {
    writer.write_event(Event::Start(element("spine", &[("toc", NCX_ID)])))?;

    for idref in spine_idrefs(model) {
        writer.write_event(Event::Empty(element("itemref", &[("idref", idref.as_str())])))?;
    }

    writer.write_event(Event::End(BytesEnd::new("spine")))?;

    Ok(())
}

fn make_opf_guide(writer: &mut XmlWriter, model: &ContentModel) -> Result<(), EpubError> {
    writer.write_event(Event::Start(BytesStart::new("guide")))?;

    for reference in guide_references(model) {
        writer.write_event(Event::Empty(element(
            "reference",
            &[
                ("href", reference.href.as_str()),
                ("title", reference.title.as_str()),
                ("type", reference.reference_type.as_str()),
            ],
        )))?;
    }

    writer.write_event(Event::End(BytesEnd::new("guide")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::{
        builder::{
            documents::{
                GenerationContext, chapter_page, container_xml, content_opf, cover_page,
                display_options_xml, guide_references, manifest_items, nav_points, render_all,
                spine_idrefs, stylesheet, toc_ncx, toc_page,
            },
            model::ContentModel,
        },
        types::MetadataField,
    };

    fn context() -> GenerationContext {
        GenerationContext {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
            uuid: "2f1c7c5e-6f1a-4c4e-9a3e-0d7f6b1e2a11".to_string(),
        }
    }

    fn two_chapter_model() -> ContentModel {
        let mut model = ContentModel::new();
        model.set_metadata(MetadataField::BookTitle, "Dave's Grand").unwrap();
        model.set_metadata(MetadataField::AuthorName, "David Rawk").unwrap();
        model.set_metadata(MetadataField::Isbn, "8675-309").unwrap();
        model.add_chapter("chap_1", "Chapter 1", "<h2>Hi</h2>").unwrap();
        model.add_chapter("chap_2", "Chapter 2", "<h2>Bye</h2>").unwrap();
        model
    }

    fn as_text(data: Vec<u8>) -> String {
        String::from_utf8(data).unwrap()
    }

    #[test]
    fn test_container_xml() {
        let text = as_text(container_xml().unwrap());

        assert!(text.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(text.contains(
            r#"<rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>"#
        ));
    }

    #[test]
    fn test_display_options_xml() {
        let text = as_text(display_options_xml().unwrap());
        assert!(text.contains(
            r#"<platform name="*"><option name="specified-fonts">false</option></platform>"#
        ));
    }

    #[test]
    fn test_stylesheet_appends_custom_style() {
        let mut model = ContentModel::new();
        model.set_style("h2{color: red}").unwrap();
        model.append_style("h2{background-color: blue}").unwrap();

        let text = as_text(stylesheet(&model));
        assert!(text.starts_with("body { line-height: 1.5em; }"));
        assert!(text.ends_with("#cover h3 { text-align: center; }\nh2{color: red}h2{background-color: blue}"));
    }

    #[test]
    fn test_chapter_page() {
        let model = two_chapter_model();
        let entry = model.chapter("chap_1").unwrap();
        let text = as_text(chapter_page(entry).unwrap());

        assert!(text.starts_with(r#"<?xml version="1.0" encoding="utf-8" standalone="no"?>"#));
        assert!(text.contains("<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.1//EN\""));
        assert!(text.contains("<title>Chapter 1</title>"));
        assert!(text.contains(r#"<link href="../Styles/style.css" rel="stylesheet" type="text/css"/>"#));
        assert!(text.contains(r#"<div id="chap_1" xml:lang="en-US"><h2>Hi</h2></div>"#));
    }

    #[test]
    fn test_cover_page_without_image() {
        let model = two_chapter_model();
        let text = as_text(cover_page(&model).unwrap());

        assert!(text.contains(r#"<div id="cover" xml:lang="en-US">"#));
        assert!(text.contains("<h1>Dave's Grand</h1><h3>By: David Rawk</h3>"));
        assert!(!text.contains("<img"));
    }

    #[test]
    fn test_cover_page_with_image() {
        let mut model = two_chapter_model();
        model.add_image("puppers.png", vec![0x89]).unwrap();
        model.set_metadata(MetadataField::CoverFileName, "puppers.png").unwrap();
        let text = as_text(cover_page(&model).unwrap());

        assert!(text.contains(
            r#"<div id="cover-image"><img alt="Dave's Grand" src="../Images/puppers.png"/></div>"#
        ));
        assert!(!text.contains("<h1>"));
    }

    #[test]
    fn test_toc_page_lists_chapters_in_order() {
        let mut model = two_chapter_model();
        model.set_metadata(MetadataField::TableOfContentsTitle, "Steps").unwrap();
        let text = as_text(toc_page(&model).unwrap());

        assert!(text.contains("<title>Steps</title>"));
        assert!(text.contains(
            "<h1>Steps</h1><ul>\
             <li><a href=\"../Text/chap_1.xhtml\"><span>Chapter 1</span></a></li>\
             <li><a href=\"../Text/chap_2.xhtml\"><span>Chapter 2</span></a></li>\
             </ul>"
        ));
        assert_eq!(text.matches("<li>").count(), 2);
    }

    #[test]
    fn test_toc_ncx() {
        let model = two_chapter_model();
        let text = as_text(toc_ncx(&model).unwrap());

        assert!(text.contains(r#"<meta content="urn:isbn:8675-309" name="dtb:uid"/>"#));
        assert!(text.contains("<docTitle><text>Dave's Grand</text></docTitle>"));
        assert_eq!(text.matches("<navPoint ").count(), 3);

        let cover = text.find(r#"<navPoint id="navpoint-cover" playOrder="1">"#).unwrap();
        let first = text.find(r#"<navPoint id="chap_1" playOrder="2">"#).unwrap();
        let second = text.find(r#"<navPoint id="chap_2" playOrder="3">"#).unwrap();
        assert!(cover < first && first < second);
        assert!(text.contains(
            r#"<navLabel><text>Chapter 2</text></navLabel><content src="Text/chap_2.xhtml"/>"#
        ));
    }

    #[test]
    fn test_rewritten_chapter_keeps_its_position() {
        let mut model = two_chapter_model();
        model.add_chapter("chap_1", "Chapter One", "<h2>Again</h2>").unwrap();

        let toc = as_text(toc_page(&model).unwrap());
        let first = toc.find("<span>Chapter One</span>").unwrap();
        let second = toc.find("<span>Chapter 2</span>").unwrap();
        assert!(first < second);
        assert!(!toc.contains("<span>Chapter 1</span>"));

        let ncx = as_text(toc_ncx(&model).unwrap());
        let first = ncx.find(r#"<navPoint id="chap_1" playOrder="2">"#).unwrap();
        let second = ncx.find(r#"<navPoint id="chap_2" playOrder="3">"#).unwrap();
        assert!(first < second);
        assert!(ncx.contains("<navLabel><text>Chapter One</text></navLabel>"));

        assert_eq!(spine_idrefs(&model), vec!["cover", "toc", "chap_1", "chap_2"]);

        let chapter = as_text(chapter_page(model.chapter("chap_1").unwrap()).unwrap());
        assert!(chapter.contains("<h2>Again</h2>"));
    }

    #[test]
    fn test_nav_point_hrefs() {
        let points = nav_points(&two_chapter_model());
        let hrefs: Vec<&str> = points.iter().map(|point| point.content.as_str()).collect();
        assert_eq!(
            hrefs,
            vec!["Text/cover.xhtml", "Text/chap_1.xhtml", "Text/chap_2.xhtml"]
        );
    }

    #[test]
    fn test_manifest_items() {
        let mut model = two_chapter_model();
        model.add_image("puppers.png", vec![]).unwrap();
        model.add_image("photo.jpg", vec![]).unwrap();

        let items = manifest_items(&model);
        assert_eq!(items.len(), 2 + 2 + 2 + 1 + 1);

        let ids: Vec<&str> = items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["ncx", "css", "puppers.png", "photo.jpg", "cover", "toc", "chap_1", "chap_2"]
        );
        assert_eq!(items[3].href, "Images/photo.jpg");
        assert_eq!(items[3].mime, "image/jpeg");
        assert_eq!(items[6].href, "Text/chap_1.xhtml");
        assert_eq!(items[6].mime, "application/xhtml+xml");
    }

    #[test]
    fn test_spine_order() {
        let model = two_chapter_model();
        assert_eq!(spine_idrefs(&model), vec!["cover", "toc", "chap_1", "chap_2"]);

        let manifest_ids: Vec<String> =
            manifest_items(&model).into_iter().map(|item| item.id).collect();
        assert!(spine_idrefs(&model).iter().all(|idref| manifest_ids.contains(idref)));
    }

    #[test]
    fn test_guide_types() {
        let mut model = ContentModel::new();
        model.add_chapter("chap_1", "Chapter 1", "").unwrap();
        model.add_chapter("glossary", "Words", "").unwrap();

        let references = guide_references(&model);
        assert_eq!(references.len(), 2);
        assert_eq!(references[0].reference_type, "text");
        assert_eq!(references[1].reference_type, "glossary");
        assert_eq!(references[1].title, "Words");
        assert_eq!(references[1].href, "Text/glossary.xhtml");
    }

    #[test]
    fn test_content_opf_without_cover() {
        let model = two_chapter_model();
        let text = as_text(content_opf(&model, &context()).unwrap());

        assert!(text.starts_with(r#"<?xml version="1.0" encoding="utf-8" standalone="yes"?>"#));
        assert!(text.contains(
            r#"<dc:identifier id="bookid" opf:scheme="ISBN">urn:isbn:8675-309</dc:identifier>"#
        ));
        assert!(text.contains("<dc:rights>Copyright © 2024 David Rawk. All rights reserved.</dc:rights>"));
        assert!(text.contains(
            r#"<dc:creator opf:file-as="David Rawk" opf:role="aut">David Rawk</dc:creator>"#
        ));
        assert!(text.contains(r#"<dc:date opf:event="publication">2024-03-01T12:30:00Z</dc:date>"#));
        assert!(text.contains(
            r#"<dc:identifier opf:scheme="UUID">urn:uuid:2f1c7c5e-6f1a-4c4e-9a3e-0d7f6b1e2a11</dc:identifier>"#
        ));
        assert!(text.contains("<dc:subject>NON000000 NON-CLASSIFIABLE</dc:subject>"));
        assert!(!text.contains(r#"name="cover""#));
        assert!(!text.contains("<dc:source>"));
        assert!(text.contains(
            r#"<spine toc="ncx"><itemref idref="cover"/><itemref idref="toc"/><itemref idref="chap_1"/><itemref idref="chap_2"/></spine>"#
        ));
        assert!(text.contains(
            r#"<reference href="Text/chap_1.xhtml" title="Chapter 1" type="text"/>"#
        ));
    }

    #[test]
    fn test_content_opf_with_cover_and_date() {
        let mut model = two_chapter_model();
        model.add_image("puppers.png", vec![]).unwrap();
        model.set_metadata(MetadataField::CoverFileName, "puppers.png").unwrap();
        model.set_metadata(MetadataField::PublicationDate, "2020-01-01").unwrap();
        model.set_metadata(MetadataField::Source, "https://example.org").unwrap();
        let text = as_text(content_opf(&model, &context()).unwrap());

        assert!(text.contains(r#"<meta name="cover" content="puppers.png"/>"#));
        assert!(text.contains(r#"<item href="Images/puppers.png" id="puppers.png" media-type="image/png"/>"#));
        assert!(text.contains(r#"<dc:date opf:event="publication">2020-01-01</dc:date>"#));
        assert!(text.contains("<dc:source>https://example.org</dc:source>"));
    }

    /// Titles are written verbatim so callers can pass markup
    #[test]
    fn test_titles_are_not_escaped() {
        let mut model = ContentModel::new();
        model.add_chapter("chap_1", "<em>Intro</em>", "").unwrap();
        let text = as_text(toc_page(&model).unwrap());

        assert!(text.contains("<span><em>Intro</em></span>"));
    }

    #[test]
    fn test_render_all_is_deterministic() {
        let mut model = two_chapter_model();
        model.add_image("puppers.png", vec![1, 2, 3]).unwrap();
        model.seal().unwrap();

        let first = render_all(&model, &context()).unwrap();
        let second = render_all(&model, &context()).unwrap();
        assert_eq!(first, second);

        let paths: Vec<&str> = first.iter().map(|(path, _)| path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "META-INF/container.xml",
                "META-INF/com.apple.ibooks.display-options.xml",
                "OEBPS/Styles/style.css",
                "OEBPS/Text/cover.xhtml",
                "OEBPS/Text/chap_1.xhtml",
                "OEBPS/Text/chap_2.xhtml",
                "OEBPS/Text/toc.xhtml",
                "OEBPS/toc.ncx",
                "OEBPS/content.opf",
            ]
        );
    }
}
