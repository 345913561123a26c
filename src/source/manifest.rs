//! Consolidated JSON manifest.
//!
//! ```json
//! {
//!   "images": [
//!     {
//!       "file_name": "page1.jpg",
//!       "annotations": [
//!         { "category": "row", "polygon": [[10, 10], [790, 10], [790, 50], [10, 50]] },
//!         { "category": "column", "bbox": [10, 10, 120, 1190] }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! `bbox` is `[xmin, ymin, xmax, ymax]`. `width` and `height` may be given per
//! image; otherwise they are read from the image header.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{PageSource, SourceAnnotation, SourcePage, image_size};
use crate::config::ConverterConfig;
use crate::error::{ConvertError, Result};
use crate::models::{Point, Region};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub images: Vec<ManifestImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestImage {
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default)]
    pub annotations: Vec<ManifestAnnotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestAnnotation {
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygon: Option<Vec<[f64; 2]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
}

impl ManifestAnnotation {
    pub fn polygon(category: impl Into<String>, points: &[(f64, f64)]) -> Self {
        Self {
            category: category.into(),
            polygon: Some(points.iter().map(|&(x, y)| [x, y]).collect()),
            bbox: None,
        }
    }

    pub fn bbox(category: impl Into<String>, bounds: [f64; 4]) -> Self {
        Self {
            category: category.into(),
            polygon: None,
            bbox: Some(bounds),
        }
    }

    fn region(&self, subject: &str) -> Result<Region> {
        match (&self.polygon, &self.bbox) {
            (Some(points), None) => Ok(Region::Polygon(
                points.iter().map(|&[x, y]| Point::new(x, y)).collect(),
            )),
            (None, Some([xmin, ymin, xmax, ymax])) => Ok(Region::Box {
                xmin: *xmin,
                ymin: *ymin,
                xmax: *xmax,
                ymax: *ymax,
            }),
            (Some(_), Some(_)) => Err(ConvertError::malformed(
                subject,
                "both polygon and bbox given",
            )),
            (None, None) => Err(ConvertError::malformed(subject, "no polygon or bbox given")),
        }
    }
}

impl Manifest {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| ConvertError::json(path, e))
    }

    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| ConvertError::json(path, e))?;
        std::fs::write(path, json).map_err(|e| ConvertError::io(path, e))
    }
}

/// One image entry of a manifest
pub struct ManifestPage {
    entry: ManifestImage,
    position: usize,
    image_dir: PathBuf,
}

impl PageSource for ManifestPage {
    fn name(&self) -> String {
        format!("manifest#{} ({})", self.position, self.entry.file_name)
    }

    fn load(&self) -> Result<SourcePage> {
        let image_path = self.image_dir.join(&self.entry.file_name);
        if !image_path.is_file() {
            return Err(ConvertError::MissingImage {
                name: self.entry.file_name.clone(),
            });
        }
        let (width, height) = match (self.entry.width, self.entry.height) {
            (Some(w), Some(h)) => (w, h),
            _ => image_size(&image_path)?,
        };

        let mut annotations = Vec::with_capacity(self.entry.annotations.len());
        for (idx, ann) in self.entry.annotations.iter().enumerate() {
            let subject = format!("annotation {} ({})", idx + 1, ann.category);
            annotations.push(SourceAnnotation {
                label: ann.category.clone(),
                region: ann.region(&subject)?,
                subject,
            });
        }

        Ok(SourcePage {
            file_name: self.entry.file_name.clone(),
            width,
            height,
            annotations,
            skipped: Vec::new(),
        })
    }
}

pub fn discover(root: &Path, config: &Arc<ConverterConfig>) -> Result<Vec<Box<dyn PageSource>>> {
    let path = root.join(&config.manifest);
    let manifest = Manifest::from_json_file(&path)?;
    let image_dir = root.join(&config.image_dir);

    log::info!(
        "manifest {} lists {} image(s)",
        path.display(),
        manifest.images.len()
    );
    Ok(manifest
        .images
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| {
            Box::new(ManifestPage {
                entry,
                position: idx + 1,
                image_dir: image_dir.clone(),
            }) as Box<dyn PageSource>
        })
        .collect())
}
