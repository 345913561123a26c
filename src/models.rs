use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{ConvertError, Result};

/// A 2D point in image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Source geometry of a single annotation
#[derive(Debug, Clone, PartialEq)]
pub enum Region {
    Polygon(Vec<Point>),
    Box {
        xmin: f64,
        ymin: f64,
        xmax: f64,
        ymax: f64,
    },
}

/// Dataset-level description written to the `info` block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetInfo {
    pub description: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub contributor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
}

impl Default for DatasetInfo {
    fn default() -> Self {
        Self {
            description: "Table structure recognition dataset".to_string(),
            version: "1.0".to_string(),
            year: None,
            contributor: String::new(),
            date_created: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: u64,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub id: u64,
    pub image_id: u64,
    pub category_id: u64,
    /// Flattened polygons, `[x1, y1, x2, y2, ...]`
    pub segmentation: Vec<Vec<f64>>,
    pub area: f64,
    /// `[x, y, width, height]`
    pub bbox: [f64; 4],
    pub iscrowd: u8,
}

impl AnnotationRecord {
    /// Number of points in the first segmentation polygon
    pub fn point_count(&self) -> usize {
        self.segmentation.first().map_or(0, |poly| poly.len() / 2)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub supercategory: String,
}

/// Complete COCO-style dataset description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub info: DatasetInfo,
    #[serde(default)]
    pub licenses: Vec<License>,
    pub images: Vec<ImageRecord>,
    pub annotations: Vec<AnnotationRecord>,
    pub categories: Vec<Category>,
}

impl Dataset {
    pub fn image(&self, id: u64) -> Option<&ImageRecord> {
        self.images.iter().find(|img| img.id == id)
    }

    pub fn category(&self, id: u64) -> Option<&Category> {
        self.categories.iter().find(|cat| cat.id == id)
    }

    pub fn annotations_for(&self, image_id: u64) -> impl Iterator<Item = &AnnotationRecord> {
        self.annotations
            .iter()
            .filter(move |ann| ann.image_id == image_id)
    }

    /// Check that every annotation references an existing image and category
    /// and that ids are unique within each set.
    pub fn check_references(&self) -> std::result::Result<(), String> {
        use std::collections::HashSet;

        let mut image_ids = HashSet::new();
        for img in &self.images {
            if !image_ids.insert(img.id) {
                return Err(format!("duplicate image id {}", img.id));
            }
        }
        let mut category_ids = HashSet::new();
        for cat in &self.categories {
            if !category_ids.insert(cat.id) {
                return Err(format!("duplicate category id {}", cat.id));
            }
        }
        let mut annotation_ids = HashSet::new();
        for ann in &self.annotations {
            if !annotation_ids.insert(ann.id) {
                return Err(format!("duplicate annotation id {}", ann.id));
            }
            if !image_ids.contains(&ann.image_id) {
                return Err(format!(
                    "annotation {} references unknown image {}",
                    ann.id, ann.image_id
                ));
            }
            if !category_ids.contains(&ann.category_id) {
                return Err(format!(
                    "annotation {} references unknown category {}",
                    ann.id, ann.category_id
                ));
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ConvertError::json("<dataset>", e))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ConvertError::json("<dataset>", e))
    }

    /// Write the dataset as JSON, replacing any existing file
    pub fn write_json_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConvertError::io(parent, e))?;
        }
        let file = File::create(path).map_err(|e| ConvertError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self).map_err(|e| ConvertError::json(path, e))?;
        writer.flush().map_err(|e| ConvertError::io(path, e))?;
        Ok(())
    }

    pub fn read_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| ConvertError::io(path, e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| ConvertError::json(path, e))
    }
}
