//! Configuration for the annotation converter.
//!
//! A configuration can be loaded from a JSON file or built from defaults.
//! Every field is optional in the file; missing fields take the values of
//! [`ConverterConfig::default`], which match the layout produced by PAGE XML
//! exports (`XML/` next to `Images/`) and the row/column vocabulary.
//!
//! ```no_run
//! use tablecoco::ConverterConfig;
//! use std::path::Path;
//!
//! let config = ConverterConfig::from_json_file(Path::new("tablecoco.json"))?;
//! # Ok::<(), tablecoco::ConvertError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::error::{ConvertError, Result};
use crate::models::{Category, DatasetInfo};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]/[month]/[day]");

/// Which kind of annotation source the data directory holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceFormat {
    /// One PAGE XML file per image, table cells with row/col indices
    #[default]
    PageXml,
    /// One JSON manifest listing every image and its labelled regions
    Manifest,
}

/// One entry of the category vocabulary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub id: u64,
    pub name: String,
    #[serde(default = "default_supercategory")]
    pub supercategory: String,
    /// Other source labels that map onto this category
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl CategoryConfig {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            supercategory: default_supercategory(),
            aliases: Vec::new(),
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    fn matches(&self, label: &str) -> bool {
        self.name == label || self.aliases.iter().any(|a| a == label)
    }
}

fn default_supercategory() -> String {
    "layout".to_string()
}

/// Labels emitted for structures derived from PAGE XML tables.
///
/// A `None` label disables that kind of annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageLabels {
    pub row_label: Option<String>,
    pub column_label: Option<String>,
    pub region_label: Option<String>,
    pub cell_label: Option<String>,
}

impl Default for PageLabels {
    fn default() -> Self {
        Self {
            row_label: Some("TableRow".to_string()),
            column_label: Some("TableColumn".to_string()),
            region_label: None,
            cell_label: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Category vocabulary; ids are written as-is into the dataset
    pub categories: Vec<CategoryConfig>,

    pub info: DatasetInfo,

    pub format: SourceFormat,

    /// Directory of PAGE XML files, relative to the data directory
    pub annotation_dir: PathBuf,

    /// Directory of page images, relative to the data directory
    pub image_dir: PathBuf,

    /// Extensions tried, in order, when resolving a page image
    pub image_extensions: Vec<String>,

    /// Manifest file, relative to the data directory
    pub manifest: PathBuf,

    pub page: PageLabels,

    /// Write surviving pages even if some pages failed
    pub best_effort: bool,

    /// Worker threads for per-page conversion
    pub jobs: usize,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            categories: vec![
                CategoryConfig::new(1, "TableRow").with_aliases(&["row"]),
                CategoryConfig::new(2, "TableColumn").with_aliases(&["column"]),
            ],
            info: DatasetInfo::default(),
            format: SourceFormat::PageXml,
            annotation_dir: PathBuf::from("XML"),
            image_dir: PathBuf::from("Images"),
            image_extensions: ["jpg", "jpeg", "png", "tif", "tiff"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            manifest: PathBuf::from("manifest.json"),
            page: PageLabels::default(),
            best_effort: false,
            jobs: 1,
        }
    }
}

impl ConverterConfig {
    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| ConvertError::json(path, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| ConvertError::json(path, e))?;
        std::fs::write(path, json).map_err(|e| ConvertError::io(path, e))
    }

    /// Replace the vocabulary with the given names, numbered from 1
    pub fn with_vocabulary(mut self, names: &[&str]) -> Self {
        self.categories = names
            .iter()
            .enumerate()
            .map(|(i, name)| CategoryConfig::new(i as u64 + 1, *name))
            .collect();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(ConvertError::Config("category vocabulary is empty".into()));
        }
        let mut ids = HashSet::new();
        let mut labels = HashSet::new();
        for cat in &self.categories {
            if cat.id == 0 {
                return Err(ConvertError::Config(format!(
                    "category '{}' must have a positive id",
                    cat.name
                )));
            }
            if !ids.insert(cat.id) {
                return Err(ConvertError::Config(format!("duplicate category id {}", cat.id)));
            }
            for label in std::iter::once(&cat.name).chain(&cat.aliases) {
                if !labels.insert(label.as_str()) {
                    return Err(ConvertError::Config(format!(
                        "label '{label}' maps to more than one category"
                    )));
                }
            }
        }
        if self.image_extensions.is_empty() {
            return Err(ConvertError::Config("no image extensions configured".into()));
        }
        if self.jobs == 0 {
            return Err(ConvertError::Config("jobs must be at least 1".into()));
        }
        if let Some(date) = &self.info.date_created {
            parse_date(date)?;
        }
        Ok(())
    }

    /// Look up the category a source label belongs to
    pub fn resolve_category(&self, label: &str) -> Result<&CategoryConfig> {
        self.categories
            .iter()
            .find(|cat| cat.matches(label))
            .ok_or_else(|| ConvertError::UnknownCategory {
                label: label.to_string(),
            })
    }

    pub fn dataset_categories(&self) -> Vec<Category> {
        self.categories
            .iter()
            .map(|cat| Category {
                id: cat.id,
                name: cat.name.clone(),
                supercategory: cat.supercategory.clone(),
            })
            .collect()
    }

    /// Info block with the year filled in from `date_created` when unset
    pub fn dataset_info(&self) -> Result<DatasetInfo> {
        let mut info = self.info.clone();
        if let Some(date) = &info.date_created {
            let parsed = parse_date(date)?;
            info.year.get_or_insert(parsed.year());
        }
        Ok(info)
    }
}

fn parse_date(value: &str) -> Result<Date> {
    Date::parse(value, DATE_FORMAT).map_err(|e| {
        ConvertError::Config(format!("date_created '{value}' is not YYYY/MM/DD: {e}"))
    })
}
