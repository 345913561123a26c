use image::{ImageBuffer, Rgb};
use std::path::{Path, PathBuf};
use tablecoco::source::{Manifest, ManifestAnnotation, ManifestImage};
use tablecoco::{ConverterConfig, SourceFormat};

/// Writes a white test image of the given size; the format follows the extension.
pub fn create_test_image(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create image directory");
    }
    let img = ImageBuffer::from_fn(width, height, |_, _| Rgb([255u8, 255u8, 255u8]));
    img.save(path).expect("Failed to save test image");
}

/// Creates an empty data directory.
/// The directory is removed when the returned TempDir is dropped.
pub fn create_data_dir() -> tempfile::TempDir {
    tempfile::TempDir::new().expect("Failed to create temp directory")
}

/// Configuration for a manifest at the data directory root with images next to it
pub fn manifest_config() -> ConverterConfig {
    let mut config = ConverterConfig::default().with_vocabulary(&["row", "column", "cell"]);
    config.format = SourceFormat::Manifest;
    config.image_dir = PathBuf::from(".");
    config.manifest = PathBuf::from("manifest.json");
    config
}

pub fn write_manifest(dir: &Path, images: Vec<ManifestImage>) {
    Manifest { images }
        .to_json_file(&dir.join("manifest.json"))
        .expect("Failed to write manifest");
}

pub fn manifest_image(file_name: &str, annotations: Vec<ManifestAnnotation>) -> ManifestImage {
    ManifestImage {
        file_name: file_name.to_string(),
        width: None,
        height: None,
        annotations,
    }
}

/// The row from the page1 scenario: a 780x40 band near the top of the page
pub fn top_row() -> ManifestAnnotation {
    ManifestAnnotation::polygon(
        "row",
        &[(10.0, 10.0), (790.0, 10.0), (790.0, 50.0), (10.0, 50.0)],
    )
}

/// A PAGE XML `TableCell` with a `points` attribute
pub fn page_cell(row: usize, col: usize, x1: u32, y1: u32, x2: u32, y2: u32) -> String {
    format!(
        r#"<TableCell id="c{row}_{col}" row="{row}" col="{col}"><Coords points="{x1},{y1} {x2},{y1} {x2},{y2} {x1},{y2}"/></TableCell>"#
    )
}

/// A complete PAGE XML document holding one table
pub fn page_xml(image_name: &str, cells: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<PcGts xmlns="http://schema.primaresearch.org/PAGE/gts/pagecontent/2019-07-15">
  <Metadata><Creator>test</Creator></Metadata>
  <Page imageFilename="{image_name}" imageWidth="400" imageHeight="300">
    <TableRegion id="t1">
      <Coords points="0,0 400,0 400,300 0,300"/>
      {}
    </TableRegion>
  </Page>
</PcGts>"#,
        cells.join("\n      ")
    )
}

/// Writes `XML/<xml_name>` and, when given, `Images/<image_name>` (400x300)
pub fn write_page(dir: &Path, xml_name: &str, image_name: Option<&str>, cells: &[String]) {
    let xml_dir = dir.join("XML");
    std::fs::create_dir_all(&xml_dir).expect("Failed to create XML directory");
    let declared = image_name.unwrap_or("absent.jpg");
    std::fs::write(xml_dir.join(xml_name), page_xml(declared, cells))
        .expect("Failed to write PAGE XML");
    if let Some(name) = image_name {
        create_test_image(&dir.join("Images").join(name), 400, 300);
    }
}

/// Two rows by two columns of 200x150 cells
pub fn grid_cells() -> Vec<String> {
    vec![
        page_cell(0, 0, 0, 0, 200, 150),
        page_cell(0, 1, 200, 0, 400, 150),
        page_cell(1, 0, 0, 150, 200, 300),
        page_cell(1, 1, 200, 150, 400, 300),
    ]
}
