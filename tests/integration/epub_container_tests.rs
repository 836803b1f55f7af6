/*!
 * Integration tests for reading, updating and writing EPUB books
 */

use anyhow::Result;
use zip::CompressionMethod;

use epubwai::container::{DocumentContainer, EpubContainer};
use epubwai::errors::ContainerError;
use epubwai::translation::{FragmentOutcome, TranslatedFragment};
use crate::common;

fn two_chapter_book(dir: &std::path::Path) -> Result<std::path::PathBuf> {
    common::create_test_epub(
        dir,
        "book.epub",
        &[
            common::chapter_xhtml("One", &["First paragraph."]),
            common::chapter_xhtml("Two", &["Second paragraph."]),
        ],
    )
}

#[test]
fn test_open_shouldListDocumentsInManifestOrder() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = two_chapter_book(dir.path())?;

    let container = EpubContainer::open(&path)?;

    assert_eq!(container.package_path(), "OEBPS/content.opf");
    let manifest_ids: Vec<&str> = container.manifest().iter().map(|item| item.id.as_str()).collect();
    assert_eq!(manifest_ids, vec!["css", "cover", "ch1", "ch2"]);

    let fragments = container.list_fragments();
    let hrefs: Vec<&str> = fragments.iter().map(|f| f.href.as_str()).collect();
    assert_eq!(hrefs, vec!["OEBPS/Text/ch1.xhtml", "OEBPS/Text/ch2.xhtml"]);
    assert!(fragments[0].content.contains("First paragraph."));
    Ok(())
}

#[test]
fn test_save_withoutChanges_shouldPreserveEveryEntry() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = two_chapter_book(dir.path())?;
    let output = dir.path().join("copy.epub");

    EpubContainer::open(&path)?.save(&output)?;

    let original = common::read_entries(&path)?;
    let copied = common::read_entries(&output)?;
    assert_eq!(copied, original);
    Ok(())
}

#[test]
fn test_save_withTranslatedDocument_shouldReplaceOnlyThatEntry() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = two_chapter_book(dir.path())?;
    let output = dir.path().join("out").join("book-pl.epub");

    let mut container = EpubContainer::open(&path)?;
    let translated = TranslatedFragment {
        id: "ch2".to_string(),
        href: "OEBPS/Text/ch2.xhtml".to_string(),
        translated_content: common::chapter_xhtml("Dwa", &["Drugi akapit."]),
        outcome: FragmentOutcome::Translated { segments: 2, translated_parts: 2 },
    };
    assert_eq!(container.apply_translated_fragments(&[translated]), 1);
    container.save(&output)?;

    let original = common::read_entries(&path)?;
    let written = common::read_entries(&output)?;

    assert_eq!(written[0].name, "mimetype");
    assert_eq!(written[0].compression, CompressionMethod::Stored);
    assert_eq!(written[0].data, b"application/epub+zip");

    let names = |entries: &[common::EntrySnapshot]| entries.iter().map(|e| e.name.clone()).collect::<Vec<_>>();
    assert_eq!(names(&written), names(&original));

    for (before, after) in original.iter().zip(&written) {
        if before.name == "OEBPS/Text/ch2.xhtml" {
            assert!(String::from_utf8(after.data.clone())?.contains("Drugi akapit."));
        } else {
            assert_eq!(after.data, before.data, "entry {} changed", before.name);
        }
    }

    let cover = written.iter().find(|e| e.name == "OEBPS/Images/cover.png").unwrap();
    assert_eq!(cover.data, common::COVER_BYTES);
    Ok(())
}

#[test]
fn test_apply_translated_fragments_withUnknownId_shouldSkipIt() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = two_chapter_book(dir.path())?;
    let mut container = EpubContainer::open(&path)?;

    let stray = TranslatedFragment {
        id: "missing".to_string(),
        href: "OEBPS/Text/missing.xhtml".to_string(),
        translated_content: "<p>x</p>".to_string(),
        outcome: FragmentOutcome::Translated { segments: 1, translated_parts: 1 },
    };

    assert_eq!(container.apply_translated_fragments(&[stray]), 0);
    assert!(container.document_content("ch1").unwrap().contains("First paragraph."));
    Ok(())
}

#[test]
fn test_open_withoutContainerXml_shouldReportMissingEntry() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("broken.epub");
    let mut zip = zip::ZipWriter::new(std::fs::File::create(&path)?);
    zip.start_file("mimetype", zip::write::SimpleFileOptions::default())?;
    std::io::Write::write_all(&mut zip, b"application/epub+zip")?;
    zip.finish()?;

    match EpubContainer::open(&path) {
        Err(ContainerError::MissingEntry(name)) => assert_eq!(name, "META-INF/container.xml"),
        other => panic!("unexpected result: {:?}", other.map(|c| c.package_path().to_string())),
    }
    Ok(())
}
