//! Seeded train/validation split of a dataset.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{ConvertError, Result};
use crate::models::Dataset;

pub const DEFAULT_SPLIT_SEED: u64 = 24;

#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: Dataset,
    pub val: Dataset,
}

/// Train ratio must lie strictly between 0 and 1
pub fn check_ratio(ratio: f64) -> Result<()> {
    if ratio > 0.0 && ratio < 1.0 {
        Ok(())
    } else {
        Err(ConvertError::Config(format!(
            "split ratio must be between 0 and 1, got {ratio}"
        )))
    }
}

/// Partition the images of `dataset` into train and validation sets.
///
/// With `require_annotations`, images without any annotation are left out of
/// both parts. The first `floor(ratio * n)` images of a seeded shuffle go to
/// the train set. Each part keeps its images in id order, only the
/// annotations of its own images, and the info and categories of the full dataset.
pub fn split_dataset(
    dataset: &Dataset,
    ratio: f64,
    seed: u64,
    require_annotations: bool,
) -> Result<Split> {
    check_ratio(ratio)?;

    let annotated: HashSet<u64> = dataset.annotations.iter().map(|a| a.image_id).collect();
    let mut ids: Vec<u64> = dataset
        .images
        .iter()
        .map(|img| img.id)
        .filter(|id| !require_annotations || annotated.contains(id))
        .collect();

    let mut rng = StdRng::seed_from_u64(seed);
    ids.shuffle(&mut rng);

    let n_train = (ratio * ids.len() as f64).floor() as usize;
    let train_ids: HashSet<u64> = ids[..n_train].iter().copied().collect();
    let val_ids: HashSet<u64> = ids[n_train..].iter().copied().collect();

    log::info!(
        "split {} image(s): {} train, {} val",
        ids.len(),
        train_ids.len(),
        val_ids.len()
    );
    Ok(Split {
        train: subset(dataset, &train_ids),
        val: subset(dataset, &val_ids),
    })
}

fn subset(dataset: &Dataset, image_ids: &HashSet<u64>) -> Dataset {
    Dataset {
        info: dataset.info.clone(),
        licenses: dataset.licenses.clone(),
        images: dataset
            .images
            .iter()
            .filter(|img| image_ids.contains(&img.id))
            .cloned()
            .collect(),
        annotations: dataset
            .annotations
            .iter()
            .filter(|ann| image_ids.contains(&ann.image_id))
            .cloned()
            .collect(),
        categories: dataset.categories.clone(),
    }
}

/// `annotations.json` → `annotations-train.json`
pub fn sibling_path(output: &Path, suffix: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "annotations".to_string());
    let ext = output
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "json".to_string());
    output.with_file_name(format!("{stem}-{suffix}.{ext}"))
}

/// Write both parts next to `output` and return their paths
pub fn write_split(split: &Split, output: &Path) -> Result<(PathBuf, PathBuf)> {
    let train_path = sibling_path(output, "train");
    let val_path = sibling_path(output, "val");
    split.train.write_json_file(&train_path)?;
    split.val.write_json_file(&val_path)?;
    Ok((train_path, val_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnnotationRecord, Category, DatasetInfo, ImageRecord};

    fn dataset(images: u64) -> Dataset {
        Dataset {
            info: DatasetInfo::default(),
            licenses: vec![],
            images: (1..=images)
                .map(|id| ImageRecord {
                    id,
                    file_name: format!("{id}.jpg"),
                    width: 100,
                    height: 100,
                })
                .collect(),
            // the last image has no annotation
            annotations: (1..images)
                .map(|id| AnnotationRecord {
                    id,
                    image_id: id,
                    category_id: 1,
                    segmentation: vec![vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0]],
                    area: 0.5,
                    bbox: [0.0, 0.0, 1.0, 1.0],
                    iscrowd: 0,
                })
                .collect(),
            categories: vec![Category {
                id: 1,
                name: "TableRow".to_string(),
                supercategory: "layout".to_string(),
            }],
        }
    }

    #[test]
    fn test_split_is_disjoint_and_complete() {
        let data = dataset(21);
        let split = split_dataset(&data, 0.9, DEFAULT_SPLIT_SEED, true).unwrap();
        assert_eq!(split.train.images.len(), 18);
        assert_eq!(split.val.images.len(), 2);

        let train: HashSet<u64> = split.train.images.iter().map(|i| i.id).collect();
        let val: HashSet<u64> = split.val.images.iter().map(|i| i.id).collect();
        assert!(train.is_disjoint(&val));
        assert_eq!(train.len() + val.len(), 20);
        assert!(!train.contains(&21) && !val.contains(&21));
        for id in &val {
            assert!(data.image(*id).is_some());
            assert_eq!(split.val.annotations_for(*id).count(), 1);
        }

        for part in [&split.train, &split.val] {
            part.check_references().unwrap();
            assert!(part.images.windows(2).all(|w| w[0].id < w[1].id));
        }
    }

    #[test]
    fn test_split_is_deterministic_per_seed() {
        let data = dataset(30);
        let a = split_dataset(&data, 0.7, 7, false).unwrap();
        let b = split_dataset(&data, 0.7, 7, false).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.train.images.len() + a.val.images.len(), 30);
    }

    #[test]
    fn test_split_rejects_bad_ratio() {
        assert!(split_dataset(&dataset(3), 1.0, 1, true).is_err());
        assert!(split_dataset(&dataset(3), 0.0, 1, true).is_err());
        assert!(check_ratio(1.5).is_err());
        assert!(check_ratio(f64::NAN).is_err());
        assert!(check_ratio(0.9).is_ok());
    }

    #[test]
    fn test_sibling_path() {
        assert_eq!(
            sibling_path(Path::new("out/annotations.json"), "train"),
            PathBuf::from("out/annotations-train.json")
        );
        assert_eq!(
            sibling_path(Path::new("coco"), "val"),
            PathBuf::from("coco-val.json")
        );
    }
}
