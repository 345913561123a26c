pub mod manifest;
pub mod page_xml;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{ConverterConfig, SourceFormat};
use crate::error::{ConvertError, Result};
use crate::models::Region;

pub use manifest::{Manifest, ManifestAnnotation, ManifestImage, ManifestPage};
pub use page_xml::PageXmlFile;

/// One labelled region read from an annotation source
#[derive(Debug, Clone, PartialEq)]
pub struct SourceAnnotation {
    pub label: String,
    pub region: Region,
    /// Where the region came from, e.g. `table 1 row 3`
    pub subject: String,
}

/// Everything read for a single image, before validation
#[derive(Debug, Clone, PartialEq)]
pub struct SourcePage {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub annotations: Vec<SourceAnnotation>,
    /// Input items dropped while reading, as `(subject, reason)`
    pub skipped: Vec<(String, String)>,
}

/// A unit of conversion work: one image and its annotations.
///
/// Loading is independent per page so sources can be read in parallel.
pub trait PageSource: Send + Sync {
    /// Name used in diagnostics
    fn name(&self) -> String;

    fn load(&self) -> Result<SourcePage>;
}

/// Find all pages under `root`, in a stable order
pub fn discover(root: &Path, config: &Arc<ConverterConfig>) -> Result<Vec<Box<dyn PageSource>>> {
    match config.format {
        SourceFormat::PageXml => page_xml::discover(root, config),
        SourceFormat::Manifest => manifest::discover(root, config),
    }
}

/// Read width and height from the image header without decoding pixels
pub(crate) fn image_size(path: &Path) -> Result<(u32, u32)> {
    image::image_dimensions(path).map_err(|source| match source {
        image::ImageError::IoError(e) => ConvertError::io(path, e),
        source => ConvertError::ImageHeader {
            path: path.to_path_buf(),
            source,
        },
    })
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub(crate) fn first_existing(candidates: &[PathBuf]) -> Option<&PathBuf> {
    candidates.iter().find(|p| p.is_file())
}
