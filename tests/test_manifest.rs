//! Integration tests for conversion from a consolidated JSON manifest.
//!
//! Tests cover:
//! - Single image / single row scenario
//! - Missing image, malformed geometry and unknown category failures
//! - Best-effort mode, idempotence and file round-trip

mod common;

use common::*;

#[test]
fn test_single_row_scenario() -> anyhow::Result<()> {
    let dir = create_data_dir();
    create_test_image(&dir.path().join("page1.jpg"), 800, 1200);
    write_manifest(dir.path(), vec![manifest_image("page1.jpg", vec![top_row()])]);

    let conversion = Converter::new(dir.path(), manifest_config())?.convert()?;
    let dataset = conversion.dataset;

    assert_eq!(dataset.images.len(), 1);
    let image = &dataset.images[0];
    assert_eq!(image.file_name, "page1.jpg");
    assert_eq!((image.width, image.height), (800, 1200));

    assert_eq!(dataset.annotations.len(), 1);
    let ann = &dataset.annotations[0];
    assert_eq!(ann.point_count(), 4);
    assert_eq!(ann.image_id, image.id);
    assert_eq!(dataset.category(ann.category_id).unwrap().name, "row");
    assert_eq!(ann.bbox, [10.0, 10.0, 780.0, 40.0]);
    assert_eq!(ann.area, 31200.0);
    assert_eq!(ann.iscrowd, 0);

    dataset
        .check_references()
        .map_err(|e| anyhow::anyhow!(e))?;
    assert!(conversion.diagnostics.is_empty());
    Ok(())
}

#[test]
fn test_missing_image_rejects_run() -> anyhow::Result<()> {
    let dir = create_data_dir();
    create_test_image(&dir.path().join("page1.jpg"), 800, 1200);
    write_manifest(
        dir.path(),
        vec![
            manifest_image("page1.jpg", vec![top_row()]),
            manifest_image("page2.jpg", vec![top_row()]),
        ],
    );
    let output = dir.path().join("out/annotations.json");

    let result = Converter::new(dir.path(), manifest_config())?.convert_to_file(&output, None);

    let Err(ConvertError::Rejected(diagnostics)) = result else {
        panic!("expected a rejected run");
    };
    let failures: Vec<_> = diagnostics.failures().collect();
    assert_eq!(failures.len(), 1);
    assert!(
        matches!(failures[0], ConvertError::MissingImage { name } if name == "page2.jpg"),
        "unexpected failure: {}",
        failures[0]
    );
    assert!(!output.exists(), "no output may be written for a rejected run");
    Ok(())
}

#[test]
fn test_two_points_fail_three_points_succeed() -> anyhow::Result<()> {
    let dir = create_data_dir();
    create_test_image(&dir.path().join("a.png"), 50, 50);
    create_test_image(&dir.path().join("b.png"), 50, 50);
    write_manifest(
        dir.path(),
        vec![
            manifest_image(
                "a.png",
                vec![ManifestAnnotation::polygon("cell", &[(0.0, 0.0), (10.0, 10.0)])],
            ),
            manifest_image(
                "b.png",
                vec![ManifestAnnotation::polygon(
                    "cell",
                    &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)],
                )],
            ),
        ],
    );

    let mut config = manifest_config();
    config.best_effort = true;
    let conversion = Converter::new(dir.path(), config)?.convert()?;

    let failures: Vec<_> = conversion.diagnostics.failures().collect();
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0], ConvertError::MalformedGeometry { .. }));

    assert_eq!(conversion.dataset.images.len(), 1);
    assert_eq!(conversion.dataset.images[0].file_name, "b.png");
    assert_eq!(conversion.dataset.annotations[0].point_count(), 3);
    Ok(())
}

#[test]
fn test_unknown_category_and_inverted_box() -> anyhow::Result<()> {
    let dir = create_data_dir();
    create_test_image(&dir.path().join("p.png"), 20, 20);
    create_test_image(&dir.path().join("q.png"), 20, 20);
    write_manifest(
        dir.path(),
        vec![
            manifest_image(
                "p.png",
                vec![ManifestAnnotation::bbox("header", [0.0, 0.0, 5.0, 5.0])],
            ),
            manifest_image(
                "q.png",
                vec![ManifestAnnotation::bbox("column", [8.0, 0.0, 2.0, 5.0])],
            ),
        ],
    );

    let err = Converter::new(dir.path(), manifest_config())?
        .convert()
        .unwrap_err();
    let ConvertError::Rejected(diagnostics) = err else {
        panic!("expected a rejected run");
    };
    let kinds: Vec<_> = diagnostics.failures().map(|e| e.kind()).collect();
    assert_eq!(kinds, vec!["UnknownCategoryError", "MalformedGeometryError"]);

    let summary = diagnostics.summary();
    assert!(summary.contains("unknown category: header"));
    assert!(summary.contains("inverted box bounds"));
    Ok(())
}

#[test]
fn test_best_effort_keeps_ids_dense() -> anyhow::Result<()> {
    let dir = create_data_dir();
    create_test_image(&dir.path().join("1.png"), 30, 30);
    create_test_image(&dir.path().join("3.png"), 30, 30);
    let bbox = || ManifestAnnotation::bbox("column", [1.0, 1.0, 9.0, 29.0]);
    write_manifest(
        dir.path(),
        vec![
            manifest_image("1.png", vec![bbox(), top_row()]),
            manifest_image("2.png", vec![bbox()]),
            manifest_image("3.png", vec![bbox()]),
        ],
    );

    let mut config = manifest_config();
    config.best_effort = true;
    let output = dir.path().join("annotations.json");
    let conversion = Converter::new(dir.path(), config)?.convert_to_file(&output, None)?;
    let dataset = Dataset::read_json_file(&output)?;

    assert_eq!(dataset, conversion.dataset);
    let image_ids: Vec<_> = dataset.images.iter().map(|i| i.id).collect();
    assert_eq!(image_ids, vec![1, 2]);
    let ann_ids: Vec<_> = dataset.annotations.iter().map(|a| (a.id, a.image_id)).collect();
    assert_eq!(ann_ids, vec![(1, 1), (2, 1), (3, 2)]);
    assert_eq!(conversion.diagnostics.failure_count(), 1);
    Ok(())
}

#[test]
fn test_conversion_is_idempotent_and_roundtrips() -> anyhow::Result<()> {
    let dir = create_data_dir();
    create_test_image(&dir.path().join("page1.jpg"), 800, 1200);
    let mut explicit = manifest_image(
        "page1.jpg",
        vec![
            top_row(),
            ManifestAnnotation::polygon("column", &[(10.5, 10.25), (99.1, 10.0), (99.0, 1190.3)]),
        ],
    );
    explicit.width = Some(800);
    explicit.height = Some(1200);
    write_manifest(dir.path(), vec![explicit]);

    let first = dir.path().join("first.json");
    let second = dir.path().join("second.json");
    let converter = Converter::new(dir.path(), manifest_config())?;
    converter.convert_to_file(&first, None)?;
    converter.convert_to_file(&second, None)?;

    let first_bytes = std::fs::read(&first)?;
    assert_eq!(first_bytes, std::fs::read(&second)?);

    let dataset = Dataset::read_json_file(&first)?;
    assert_eq!(dataset.to_json()?.into_bytes(), first_bytes);
    Ok(())
}
