/*!
 * Common test utilities for the epubwai test suite
 */

use anyhow::Result;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use epubwai::app_config::Config;
use epubwai::translation::Fragment;

/// Bytes that are not valid UTF-8, standing in for a cover image
pub const COVER_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0xff, 0x00, 0xfe];

pub const STYLESHEET: &str = "body { font-family: serif; }\np { text-indent: 1em; }\n";

/// Routes library logs to the test harness; set RUST_LOG to see them
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// XHTML chapter with a title and one paragraph per entry
pub fn chapter_xhtml(title: &str, paragraphs: &[&str]) -> String {
    let body: String = paragraphs.iter()
        .map(|p| format!("<p>{}</p>", p))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\"><head><title>{}</title>\
         <link rel=\"stylesheet\" href=\"../Styles/style.css\"/></head>\n\
         <body>\n{}\n</body></html>",
        title, body
    )
}

/// Chapter with markup only, nothing to translate
pub fn empty_chapter_xhtml() -> String {
    "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
     <html xmlns=\"http://www.w3.org/1999/xhtml\"><head></head>\
     <body><div><img src=\"../Images/cover.png\" alt=\"\"/></div></body></html>"
        .to_string()
}

fn container_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#
}

fn package_opf(chapter_count: usize) -> String {
    let mut items = String::new();
    let mut spine = String::new();
    for index in 1..=chapter_count {
        items.push_str(&format!(
            "    <item id=\"ch{0}\" href=\"Text/ch{0}.xhtml\" media-type=\"application/xhtml+xml\"/>\n",
            index
        ));
        spine.push_str(&format!("    <itemref idref=\"ch{}\"/>\n", index));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="uid">urn:uuid:test-book</dc:identifier>
    <dc:title>Test Book</dc:title>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
    <item id="css" href="Styles/style.css" media-type="text/css"/>
    <item id="cover" href="Images/cover.png" media-type="image/png"/>
{}  </manifest>
  <spine>
{}  </spine>
</package>"#,
        items, spine
    )
}

/// Writes an EPUB with the given chapters (`Text/ch1.xhtml`, `Text/ch2.xhtml`, ...),
/// a stylesheet and a binary cover image
pub fn create_test_epub(dir: &Path, filename: &str, chapters: &[String]) -> Result<PathBuf> {
    let path = dir.join(filename);
    let mut zip = ZipWriter::new(File::create(&path)?);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("mimetype", stored)?;
    zip.write_all(b"application/epub+zip")?;
    zip.start_file("META-INF/container.xml", deflated)?;
    zip.write_all(container_xml().as_bytes())?;
    zip.start_file("OEBPS/content.opf", deflated)?;
    zip.write_all(package_opf(chapters.len()).as_bytes())?;
    zip.start_file("OEBPS/Styles/style.css", deflated)?;
    zip.write_all(STYLESHEET.as_bytes())?;
    zip.start_file("OEBPS/Images/cover.png", stored)?;
    zip.write_all(COVER_BYTES)?;
    for (index, chapter) in chapters.iter().enumerate() {
        zip.start_file(format!("OEBPS/Text/ch{}.xhtml", index + 1), deflated)?;
        zip.write_all(chapter.as_bytes())?;
    }

    zip.finish()?;
    Ok(path)
}

/// A single archive entry as read back from a book
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySnapshot {
    pub name: String,
    pub compression: CompressionMethod,
    pub data: Vec<u8>,
}

/// Reads every entry of an archive in stored order
pub fn read_entries(path: &Path) -> Result<Vec<EntrySnapshot>> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        entries.push(EntrySnapshot {
            name: entry.name().to_string(),
            compression: entry.compression(),
            data,
        });
    }
    Ok(entries)
}

/// Reads one entry of an archive as text
pub fn read_entry_text(path: &Path, name: &str) -> Result<String> {
    let entry = read_entries(path)?
        .into_iter()
        .find(|entry| entry.name == name)
        .ok_or_else(|| anyhow::anyhow!("missing entry {}", name))?;
    Ok(String::from_utf8(entry.data)?)
}

/// Fragments `f0..fN`, each with a single numbered paragraph
pub fn numbered_fragments(count: usize) -> Vec<Fragment> {
    (0..count)
        .map(|index| {
            Fragment::new(
                format!("f{}", index),
                format!("Text/f{}.xhtml", index),
                format!("<html><head></head><body><p>Paragraph {}</p></body></html>", index),
            )
        })
        .collect()
}

/// Configuration for tests: no backoff, few workers
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.source_language = "en".to_string();
    config.target_language = "pl".to_string();
    config.translation.common.retry_count = 3;
    config.translation.common.retry_backoff_ms = 0;
    config.translation.common.workers = 3;
    config
}
