/*!
 * Multi-document containers.
 *
 * A container exposes its markup documents as `Fragment`s, accepts translated
 * fragments back by id and saves itself. Everything that is not a document
 * (images, fonts, stylesheets, package metadata) passes through untouched.
 */

use std::path::Path;

use crate::errors::ContainerError;
use crate::translation::{Fragment, TranslatedFragment};

pub mod epub;

pub use self::epub::EpubContainer;

/// A document made of several markup fragments
pub trait DocumentContainer {
    /// Translatable fragments in container order
    fn list_fragments(&self) -> Vec<Fragment>;

    /// Replace fragment contents by id, returning how many fragments were updated
    fn apply_translated_fragments(&mut self, translated: &[TranslatedFragment]) -> usize;

    /// Write the container to `path`
    fn save(&self, path: &Path) -> Result<(), ContainerError>;
}
