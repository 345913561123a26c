//! Conversion of annotation sources into one COCO dataset.
//!
//! Pages are converted independently (see [`PageExecutor`]) into a
//! [`ConvertedPage`] without any ids. A single merge pass then assigns image
//! and annotation ids sequentially in input order, so the dataset is
//! reproducible regardless of how many workers ran.

use indicatif::ProgressBar;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ConverterConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{ConvertError, Result};
use crate::geometry::{bounding_box, flatten, polygon_area, region_outline};
use crate::models::{AnnotationRecord, Dataset, ImageRecord, Point};
use crate::pipeline::{PageExecutor, PageOutcome};
use crate::source::{self, PageSource, SourcePage};

/// A validated annotation, not yet numbered
#[derive(Debug, Clone, PartialEq)]
pub struct LocalAnnotation {
    pub category_id: u64,
    pub outline: Vec<Point>,
}

/// A fully validated page, ready to be merged
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedPage {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub annotations: Vec<LocalAnnotation>,
    pub skipped: Vec<(String, String)>,
}

/// Output of a successful run
#[derive(Debug)]
pub struct Conversion {
    pub dataset: Dataset,
    pub diagnostics: Diagnostics,
}

/// Validate every annotation of a page against the vocabulary and geometry rules.
///
/// The first problem aborts the whole page.
pub fn convert_page(page: SourcePage, config: &ConverterConfig) -> Result<ConvertedPage> {
    let mut annotations = Vec::with_capacity(page.annotations.len());
    for ann in &page.annotations {
        let category = config.resolve_category(&ann.label)?;
        let outline = region_outline(&ann.region, &ann.subject)?;
        annotations.push(LocalAnnotation {
            category_id: category.id,
            outline,
        });
    }
    Ok(ConvertedPage {
        file_name: page.file_name,
        width: page.width,
        height: page.height,
        annotations,
        skipped: page.skipped,
    })
}

pub struct Converter {
    root: PathBuf,
    config: Arc<ConverterConfig>,
}

impl Converter {
    pub fn new(root: impl Into<PathBuf>, config: ConverterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            root: root.into(),
            config: Arc::new(config),
        })
    }

    pub fn convert(&self) -> Result<Conversion> {
        self.convert_with_progress(None)
    }

    /// Convert all pages under the data directory.
    ///
    /// In strict mode any failed page rejects the run with every diagnostic
    /// attached. With `best_effort` the failed pages are left out instead.
    pub fn convert_with_progress(&self, progress: Option<&ProgressBar>) -> Result<Conversion> {
        let sources = source::discover(&self.root, &self.config)?;
        if sources.is_empty() {
            log::warn!("no annotation sources found under {}", self.root.display());
        }

        let config = self.config.as_ref();
        let outcomes = PageExecutor::new(config.jobs)
            .with_progress(progress)
            .execute(&sources, |src: &dyn PageSource| convert_page(src.load()?, config));

        let (dataset, diagnostics) = self.merge(outcomes)?;

        if diagnostics.has_failures() && !config.best_effort {
            log::error!(
                "conversion rejected: {} page(s) failed",
                diagnostics.failure_count()
            );
            return Err(ConvertError::Rejected(diagnostics));
        }

        log::info!(
            "converted {} image(s) with {} annotation(s)",
            dataset.images.len(),
            dataset.annotations.len()
        );
        Ok(Conversion {
            dataset,
            diagnostics,
        })
    }

    /// Convert and write the dataset; nothing is written when the run fails
    pub fn convert_to_file(
        &self,
        output: &Path,
        progress: Option<&ProgressBar>,
    ) -> Result<Conversion> {
        let conversion = self.convert_with_progress(progress)?;
        conversion.dataset.write_json_file(output)?;
        log::info!("wrote {}", output.display());
        Ok(conversion)
    }

    fn merge(&self, outcomes: Vec<PageOutcome<ConvertedPage>>) -> Result<(Dataset, Diagnostics)> {
        let mut dataset = Dataset {
            info: self.config.dataset_info()?,
            licenses: Vec::new(),
            images: Vec::new(),
            annotations: Vec::new(),
            categories: self.config.dataset_categories(),
        };
        let mut diagnostics = Diagnostics::new();
        let mut seen_files = HashSet::new();

        for outcome in outcomes {
            let page = match outcome.result {
                Ok(page) => page,
                Err(error) => {
                    log::warn!("{}: {error}", outcome.name);
                    diagnostics.fail(outcome.name, error);
                    continue;
                }
            };

            for (subject, reason) in page.skipped {
                log::warn!("{}: skipped {subject}: {reason}", outcome.name);
                diagnostics.skip(outcome.name.clone(), subject, reason);
            }
            if !seen_files.insert(page.file_name.clone()) {
                log::warn!(
                    "{}: image {} is used by more than one page",
                    outcome.name,
                    page.file_name
                );
            }

            let image_id = dataset.images.len() as u64 + 1;
            dataset.images.push(ImageRecord {
                id: image_id,
                file_name: page.file_name,
                width: page.width,
                height: page.height,
            });

            for ann in page.annotations {
                let id = dataset.annotations.len() as u64 + 1;
                dataset.annotations.push(AnnotationRecord {
                    id,
                    image_id,
                    category_id: ann.category_id,
                    segmentation: vec![flatten(&ann.outline)],
                    area: polygon_area(&ann.outline),
                    bbox: bounding_box(&ann.outline),
                    iscrowd: 0,
                });
            }
        }

        Ok((dataset, diagnostics))
    }
}
