/*!
 * End-to-end tests: book in, translated book out
 */

use anyhow::Result;
use std::sync::Arc;

use epubwai::app_controller::{Controller, FolderSummary, RunOutcome, ISSUES_LOG_FILE};
use epubwai::providers::mock::MockProvider;
use crate::common;

fn sample_chapters() -> Vec<String> {
    vec![
        common::chapter_xhtml("Chapter One", &["It was a bright cold day.", "The clocks were striking."]),
        common::empty_chapter_xhtml(),
        common::chapter_xhtml("Chapter Two", &["Fish &amp; chips <em>tonight</em>."]),
    ]
}

#[test]
fn test_run_withWorkingProvider_shouldWriteTranslatedBook() -> Result<()> {
    common::init_test_logging();
    let dir = common::create_temp_dir()?;
    let book = common::create_test_epub(dir.path(), "novel.epub", &sample_chapters())?;
    let output_dir = dir.path().join("translated");
    let provider = MockProvider::working();
    let controller = Controller::with_translator(common::test_config(), Arc::new(provider.clone()));

    let outcome = tokio_test::block_on(controller.run(book.clone(), output_dir.clone(), false))?;

    let output = output_dir.join("novel-pl.epub");
    let report = match outcome {
        RunOutcome::Completed { output_path, report } => {
            assert_eq!(output_path, output);
            report
        }
        other => panic!("unexpected outcome: {:?}", other),
    };
    assert_eq!(report.total, 3);
    assert_eq!(report.translated, 2);
    assert_eq!(report.no_text, 1);
    assert_eq!(report.failures(), 0);
    // One request per chapter with text
    assert_eq!(provider.calls(), 2);

    let ch1 = common::read_entry_text(&output, "OEBPS/Text/ch1.xhtml")?;
    assert!(ch1.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
    assert!(ch1.contains("<title>[pl] Chapter One</title>"));
    assert!(ch1.contains("<p>[pl] It was a bright cold day.</p>"));
    assert!(ch1.contains("<p>[pl] The clocks were striking.</p>"));
    assert!(ch1.contains("href=\"../Styles/style.css\""));

    let ch3 = common::read_entry_text(&output, "OEBPS/Text/ch3.xhtml")?;
    assert!(ch3.contains("<p>[pl] Fish &amp; chips <em>[pl] tonight</em>[pl] .</p>"));

    // Untouched entries carry the original bytes
    let original = common::read_entries(&book)?;
    let written = common::read_entries(&output)?;
    for name in ["OEBPS/Text/ch2.xhtml", "OEBPS/content.opf", "OEBPS/Images/cover.png", "OEBPS/Styles/style.css"] {
        let before = original.iter().find(|e| e.name == name).unwrap();
        let after = written.iter().find(|e| e.name == name).unwrap();
        assert_eq!(after.data, before.data, "entry {} changed", name);
    }
    assert!(!output_dir.join(ISSUES_LOG_FILE).exists());
    Ok(())
}

#[test]
fn test_run_withFailingProvider_shouldKeepOriginalDocumentsAndLogIssues() -> Result<()> {
    common::init_test_logging();
    let dir = common::create_temp_dir()?;
    let book = common::create_test_epub(dir.path(), "novel.epub", &sample_chapters())?;
    let output_dir = dir.path().join("translated");
    let provider = MockProvider::failing();
    let controller = Controller::with_translator(common::test_config(), Arc::new(provider.clone()));

    let outcome = tokio_test::block_on(controller.run(book.clone(), output_dir.clone(), false))?;

    match outcome {
        RunOutcome::Completed { report, .. } => {
            assert_eq!(report.fallback, 2);
            assert_eq!(report.no_text, 1);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    // Two chapters with text, three attempts each
    assert_eq!(provider.calls(), 6);

    let original = common::read_entries(&book)?;
    let written = common::read_entries(&dir.path().join("translated").join("novel-pl.epub"))?;
    assert_eq!(written, original);

    let issues = std::fs::read_to_string(output_dir.join(ISSUES_LOG_FILE))?;
    assert_eq!(issues.lines().count(), 2);
    assert!(issues.contains("novel.epub - OEBPS/Text/ch1.xhtml (ch1)"));
    assert!(issues.contains("OEBPS/Text/ch3.xhtml (ch3)"));
    Ok(())
}

#[test]
fn test_run_withExistingOutput_shouldSkipUnlessForced() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let book = common::create_test_epub(dir.path(), "novel.epub", &sample_chapters())?;
    let output_dir = dir.path().to_path_buf();
    let provider = MockProvider::working();
    let controller = Controller::with_translator(common::test_config(), Arc::new(provider.clone()));

    let first = tokio_test::block_on(controller.run(book.clone(), output_dir.clone(), false))?;
    assert!(matches!(first, RunOutcome::Completed { .. }));
    assert_eq!(provider.calls(), 2);

    let second = tokio_test::block_on(controller.run(book.clone(), output_dir.clone(), false))?;
    assert_eq!(second, RunOutcome::Skipped { output_path: output_dir.join("novel-pl.epub") });
    assert_eq!(provider.calls(), 2);

    let forced = tokio_test::block_on(controller.run(book, output_dir, true))?;
    assert!(matches!(forced, RunOutcome::Completed { .. }));
    assert_eq!(provider.calls(), 4);
    Ok(())
}

#[test]
fn test_run_withNonEpubInput_shouldFail() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let notes = dir.path().join("notes.epub");
    std::fs::write(&notes, "just text")?;
    let controller = Controller::with_translator(common::test_config(), Arc::new(MockProvider::working()));

    let result = tokio_test::block_on(controller.run(notes, dir.path().join("out"), false));
    assert!(result.is_err());
    Ok(())
}

#[test]
fn test_run_folder_shouldTranslateEachBookOnce() -> Result<()> {
    common::init_test_logging();
    let dir = common::create_temp_dir()?;
    let library = dir.path().join("library");
    std::fs::create_dir_all(library.join("nested"))?;
    common::create_test_epub(&library, "a.epub", &sample_chapters())?;
    common::create_test_epub(&library.join("nested"), "b.epub", &sample_chapters())?;
    std::fs::write(library.join("broken.epub"), "not a zip")?;

    let provider = MockProvider::working();
    let controller = Controller::with_translator(common::test_config(), Arc::new(provider.clone()));

    let summary = tokio_test::block_on(controller.run_folder(library.clone(), library.clone(), false))?;
    assert_eq!(summary, FolderSummary { processed: 2, skipped: 0, errors: 1 });
    assert!(library.join("a-pl.epub").exists());
    assert!(library.join("nested").join("b-pl.epub").exists());
    assert!(!library.join("b-pl.epub").exists());

    // Outputs are not picked up as inputs on the next run
    let again = tokio_test::block_on(controller.run_folder(library.clone(), library, false))?;
    assert_eq!(again, FolderSummary { processed: 0, skipped: 2, errors: 1 });
    assert_eq!(provider.calls(), 4);
    Ok(())
}

#[test]
fn test_run_folder_withSameNamedBooks_shouldMirrorSubdirectories() -> Result<()> {
    common::init_test_logging();
    let dir = common::create_temp_dir()?;
    let library = dir.path().join("library");
    std::fs::create_dir_all(library.join("first"))?;
    std::fs::create_dir_all(library.join("second"))?;
    common::create_test_epub(&library.join("first"), "book.epub", &sample_chapters())?;
    common::create_test_epub(
        &library.join("second"),
        "book.epub",
        &[common::chapter_xhtml("Other", &["A different story."])],
    )?;
    let output_dir = dir.path().join("out");

    let provider = MockProvider::working();
    let controller = Controller::with_translator(common::test_config(), Arc::new(provider.clone()));

    let summary = tokio_test::block_on(controller.run_folder(library, output_dir.clone(), false))?;
    assert_eq!(summary, FolderSummary { processed: 2, skipped: 0, errors: 0 });

    let first = common::read_entry_text(&output_dir.join("first").join("book-pl.epub"), "OEBPS/Text/ch1.xhtml")?;
    let second = common::read_entry_text(&output_dir.join("second").join("book-pl.epub"), "OEBPS/Text/ch1.xhtml")?;
    assert!(first.contains("<title>[pl] Chapter One</title>"));
    assert!(second.contains("<p>[pl] A different story.</p>"));
    Ok(())
}

#[test]
fn test_run_withZeroWorkers_shouldTranslateWithOneWorker() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let book = common::create_test_epub(dir.path(), "novel.epub", &sample_chapters())?;
    let mut config = common::test_config();
    config.translation.common.workers = 0;
    config.validate()?;
    let provider = MockProvider::working();
    let controller = Controller::with_translator(config, Arc::new(provider.clone()));

    let outcome = tokio_test::block_on(controller.run(book, dir.path().join("out"), false))?;

    match outcome {
        RunOutcome::Completed { report, .. } => assert_eq!(report.translated, 2),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(provider.peak_in_flight(), 1);
    Ok(())
}

#[test]
fn test_run_withWorkingProvider_shouldWriteWellFormedChapters() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let chapter = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
        <html xmlns=\"http://www.w3.org/1999/xhtml\"><head><title>Notes</title>\
        <link rel=\"stylesheet\" href=\"../Styles/style.css\"/></head>\
        <body><p>Line one<br/>Line&nbsp;two</p><img src=\"../Images/cover.png\" alt=\"\"/>\
        <a id=\"p12\"/>After anchor</body></html>"
        .to_string();
    let book = common::create_test_epub(dir.path(), "notes.epub", &[chapter])?;
    let controller = Controller::with_translator(common::test_config(), Arc::new(MockProvider::working()));

    tokio_test::block_on(controller.run(book, dir.path().join("out"), false))?;

    let ch1 = common::read_entry_text(&dir.path().join("out").join("notes-pl.epub"), "OEBPS/Text/ch1.xhtml")?;
    let mut reader = quick_xml::Reader::from_str(&ch1);
    loop {
        match reader.read_event() {
            Ok(quick_xml::events::Event::Eof) => break,
            Ok(_) => {}
            Err(e) => panic!("translated chapter is not well-formed: {}\n{}", e, ch1),
        }
    }
    assert!(ch1.contains("<p>[pl] Line one<br/>[pl] Line\u{a0}two</p>"));
    assert!(ch1.contains("<a id=\"p12\"/>[pl] After anchor</body>"));
    Ok(())
}
