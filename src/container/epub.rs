/*!
 * EPUB container reading and writing.
 *
 * The package document is located through `META-INF/container.xml`; its
 * manifest lists the XHTML documents that become fragments. Saving rebuilds
 * the archive with the `mimetype` entry first and uncompressed, substitutes
 * changed documents, and copies every other entry as raw compressed data.
 */

use log::{debug, warn};
use percent_encoding::percent_decode_str;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::DocumentContainer;
use crate::errors::ContainerError;
use crate::translation::{Fragment, TranslatedFragment};

const CONTAINER_PATH: &str = "META-INF/container.xml";
const MIMETYPE_PATH: &str = "mimetype";
const EPUB_MIMETYPE: &str = "application/epub+zip";
const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";

/// Manifest item of the package document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    /// Manifest id
    pub id: String,
    /// Path of the item inside the archive
    pub path: String,
    /// Declared media type
    pub media_type: String,
}

/// An XHTML document of the book
#[derive(Debug, Clone)]
struct Document {
    id: String,
    path: String,
    original: String,
    content: String,
}

impl Document {
    fn is_modified(&self) -> bool {
        self.content != self.original
    }
}

/// EPUB book loaded in memory
#[derive(Debug)]
pub struct EpubContainer {
    /// Where the book was read from
    source: PathBuf,
    /// Original archive bytes, used to copy untouched entries
    archive: Vec<u8>,
    /// Archive path of the package document
    package_path: String,
    /// Manifest items in declaration order
    manifest: Vec<ManifestItem>,
    /// XHTML documents in manifest order
    documents: Vec<Document>,
}

impl EpubContainer {
    /// Open an EPUB file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ContainerError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let mut container = Self::from_bytes(bytes)?;
        container.source = path.to_path_buf();
        Ok(container)
    }

    /// Load an EPUB from memory
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ContainerError> {
        let (package_path, manifest, documents) = {
            let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice()))?;
            Self::read_package(&mut archive)?
        };

        Ok(Self {
            source: PathBuf::new(),
            archive: bytes,
            package_path,
            manifest,
            documents,
        })
    }

    fn read_package<R: Read + std::io::Seek>(
        archive: &mut ZipArchive<R>,
    ) -> Result<(String, Vec<ManifestItem>, Vec<Document>), ContainerError> {
        let container_xml = read_entry(archive, CONTAINER_PATH)?;
        let package_path = parse_rootfile(&container_xml)?;
        let package_xml = read_entry(archive, &package_path)?;
        let manifest = parse_manifest(&package_xml, &package_path)?;

        let mut documents = Vec::new();
        for item in manifest.iter().filter(|item| item.media_type == XHTML_MEDIA_TYPE) {
            let content = match read_entry(archive, &item.path) {
                Ok(content) => content,
                Err(ContainerError::MissingEntry(path)) => {
                    warn!("Manifest item '{}' points to missing entry {}", item.id, path);
                    continue;
                }
                Err(e) => return Err(e),
            };

            documents.push(Document {
                id: item.id.clone(),
                path: item.path.clone(),
                original: content.clone(),
                content,
            });
        }

        debug!(
            "Loaded package {} with {} manifest items, {} documents",
            package_path,
            manifest.len(),
            documents.len()
        );

        Ok((package_path, manifest, documents))
    }

    /// Path the book was opened from (empty when loaded from memory)
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Archive path of the package document
    pub fn package_path(&self) -> &str {
        &self.package_path
    }

    /// All manifest items in declaration order
    pub fn manifest(&self) -> &[ManifestItem] {
        &self.manifest
    }

    /// Current content of a document by manifest id
    pub fn document_content(&self, id: &str) -> Option<&str> {
        self.documents.iter()
            .find(|doc| doc.id == id)
            .map(|doc| doc.content.as_str())
    }

    /// Write the archive to any seekable writer
    pub fn write_to<W: Write + std::io::Seek>(&self, writer: W) -> Result<W, ContainerError> {
        let mut source = ZipArchive::new(Cursor::new(self.archive.as_slice()))?;
        let replacements: HashMap<&str, &str> = self.documents.iter()
            .filter(|doc| doc.is_modified())
            .map(|doc| (doc.path.as_str(), doc.content.as_str()))
            .collect();

        let mut zip = ZipWriter::new(writer);

        zip.start_file(MIMETYPE_PATH, SimpleFileOptions::default().compression_method(CompressionMethod::Stored))?;
        zip.write_all(EPUB_MIMETYPE.as_bytes())?;

        for index in 0..source.len() {
            let entry = source.by_index_raw(index)?;
            let name = entry.name().to_string();
            if name == MIMETYPE_PATH {
                continue;
            }

            match replacements.get(name.as_str()) {
                Some(content) => {
                    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
                    zip.start_file(name.as_str(), options)?;
                    zip.write_all(content.as_bytes())?;
                }
                None => zip.raw_copy_file(entry)?,
            }
        }

        Ok(zip.finish()?)
    }
}

impl DocumentContainer for EpubContainer {
    fn list_fragments(&self) -> Vec<Fragment> {
        self.documents.iter()
            .map(|doc| Fragment::new(doc.id.clone(), doc.path.clone(), doc.content.clone()))
            .collect()
    }

    fn apply_translated_fragments(&mut self, translated: &[TranslatedFragment]) -> usize {
        let mut updated = 0;
        for fragment in translated {
            match self.documents.iter_mut().find(|doc| doc.id == fragment.id) {
                Some(doc) => {
                    doc.content = fragment.translated_content.clone();
                    updated += 1;
                }
                None => warn!("No document with id '{}' in the book", fragment.id),
            }
        }
        updated
    }

    fn save(&self, path: &Path) -> Result<(), ContainerError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let temp = tempfile::NamedTempFile::new_in(&dir)?;
        let (file, temp_path) = temp.into_parts();
        let file = self.write_to(file)?;
        file.sync_all()?;

        temp_path.persist(path).map_err(|e| ContainerError::Io(e.error))?;
        debug!("Saved {}", path.display());
        Ok(())
    }
}

fn read_entry<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String, ContainerError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Err(ContainerError::MissingEntry(name.to_string())),
        Err(e) => return Err(e.into()),
    };

    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;
    String::from_utf8(bytes).map_err(|_| ContainerError::InvalidEncoding(name.to_string()))
}

fn xml_error(path: &str, message: impl ToString) -> ContainerError {
    ContainerError::Xml {
        path: path.to_string(),
        message: message.to_string(),
    }
}

fn attribute(element: &BytesStart, name: &[u8], path: &str) -> Result<Option<String>, ContainerError> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| xml_error(path, e))?;
        if attr.key.local_name().as_ref() == name {
            let value = attr.unescape_value().map_err(|e| xml_error(path, e))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Find the package document path in `META-INF/container.xml`
fn parse_rootfile(xml: &str) -> Result<String, ContainerError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"rootfile" => {
                if let Some(full_path) = attribute(&e, b"full-path", CONTAINER_PATH)? {
                    return Ok(full_path);
                }
            }
            Ok(Event::Eof) => return Err(ContainerError::MissingRootfile),
            Err(e) => return Err(xml_error(CONTAINER_PATH, e)),
            _ => {}
        }
    }
}

/// Read manifest items from the package document, resolving hrefs to archive paths
fn parse_manifest(xml: &str, package_path: &str) -> Result<Vec<ManifestItem>, ContainerError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut in_manifest = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"manifest" => in_manifest = true,
            Ok(Event::End(e)) if e.local_name().as_ref() == b"manifest" => in_manifest = false,
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if in_manifest && e.local_name().as_ref() == b"item" => {
                let id = attribute(&e, b"id", package_path)?;
                let href = attribute(&e, b"href", package_path)?;
                let media_type = attribute(&e, b"media-type", package_path)?.unwrap_or_default();

                match (id, href) {
                    (Some(id), Some(href)) => items.push(ManifestItem {
                        id,
                        path: resolve_href(package_path, &href),
                        media_type,
                    }),
                    _ => warn!("Skipping manifest item without id or href in {}", package_path),
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(package_path, e)),
            _ => {}
        }
    }

    Ok(items)
}

/// Resolve an href relative to the package document into an archive path.
///
/// Hrefs are URLs, so escapes like `%20` are decoded to the stored entry name.
fn resolve_href(package_path: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or(href);
    let mut parts: Vec<Cow<'_, str>> = match package_path.rfind('/') {
        Some(idx) => package_path[..idx].split('/').map(Cow::Borrowed).collect(),
        None => Vec::new(),
    };

    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(percent_decode_str(segment).decode_utf8_lossy()),
        }
    }

    parts.join("/")
}
