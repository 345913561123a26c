//! # tablecoco
//!
//! Converts table row/column annotations of scanned documents into a COCO
//! object-detection dataset for training table-structure recognition models.
//!
//! ```rust,no_run
//! use tablecoco::{Converter, ConverterConfig};
//! use std::path::Path;
//!
//! let converter = Converter::new("data/voc", ConverterConfig::default())?;
//! let conversion = converter.convert_to_file(Path::new("data/voc/annotations.json"), None)?;
//! println!("{}", conversion.diagnostics.summary());
//! # Ok::<(), tablecoco::ConvertError>(())
//! ```

pub mod config;
pub mod converter;
pub mod diagnostics;
pub mod error;
pub mod geometry;
pub mod models;
pub mod pipeline;
pub mod source;
pub mod split;

pub use config::{CategoryConfig, ConverterConfig, PageLabels, SourceFormat};
pub use converter::{Conversion, ConvertedPage, Converter, convert_page};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::{ConvertError, Result};
pub use models::{AnnotationRecord, Category, Dataset, DatasetInfo, ImageRecord, Point, Region};
pub use pipeline::{PageExecutor, PageOutcome};
pub use source::{PageSource, SourceAnnotation, SourcePage};
pub use split::{Split, split_dataset, write_split};
