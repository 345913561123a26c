//! PAGE XML table annotations.
//!
//! Each `TableRegion` holds `TableCell` elements carrying `row` and `col`
//! indices. Rows and columns are not stored explicitly: their outline is the
//! union of the cells sharing an index.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use roxmltree::{Document, Node};

use super::{PageSource, SourceAnnotation, SourcePage, file_name_of, first_existing, image_size};
use crate::config::ConverterConfig;
use crate::error::{ConvertError, Result};
use crate::geometry::{MIN_POLYGON_POINTS, split_self_intersections, union_outline};
use crate::models::{Point, Region};

/// Prefix some PAGE exports put in front of the image stem
const EXPORT_PREFIX: &str = "pc-";

pub struct PageXmlFile {
    pub path: PathBuf,
    image_dir: PathBuf,
    config: Arc<ConverterConfig>,
}

impl PageXmlFile {
    pub fn new(path: PathBuf, image_dir: PathBuf, config: Arc<ConverterConfig>) -> Self {
        Self {
            path,
            image_dir,
            config,
        }
    }

    /// Image stem for this XML file, without the export prefix
    pub fn image_stem(&self) -> String {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        match stem.strip_prefix(EXPORT_PREFIX) {
            Some(rest) if !rest.is_empty() => rest.to_string(),
            _ => stem,
        }
    }

    fn image_candidates(&self, declared: Option<&str>) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(name) = declared.map(Path::new).and_then(Path::file_name) {
            candidates.push(self.image_dir.join(name));
        }
        let stem = self.image_stem();
        for ext in &self.config.image_extensions {
            candidates.push(self.image_dir.join(format!("{stem}.{ext}")));
        }
        candidates
    }
}

impl PageSource for PageXmlFile {
    fn name(&self) -> String {
        file_name_of(&self.path)
    }

    fn load(&self) -> Result<SourcePage> {
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| ConvertError::io(&self.path, e))?;
        let doc = Document::parse(&content).map_err(|source| ConvertError::Xml {
            path: self.path.clone(),
            source,
        })?;

        let declared = doc
            .descendants()
            .find(|n| n.has_tag_name("Page"))
            .and_then(|page| page.attribute("imageFilename"));
        let candidates = self.image_candidates(declared);
        let image_path = first_existing(&candidates).ok_or_else(|| ConvertError::MissingImage {
            name: candidates.first().map(|p| file_name_of(p)).unwrap_or_default(),
        })?;
        let (width, height) = image_size(image_path)?;

        let mut page = SourcePage {
            file_name: file_name_of(image_path),
            width,
            height,
            annotations: Vec::new(),
            skipped: Vec::new(),
        };

        let tables = doc.descendants().filter(|n| n.has_tag_name("TableRegion"));
        for (table_idx, table) in tables.enumerate() {
            read_table(table, table_idx + 1, &self.config, &mut page)?;
        }

        log::debug!(
            "{}: {} annotation(s) from {}",
            page.file_name,
            page.annotations.len(),
            self.name()
        );
        Ok(page)
    }
}

struct Cell {
    row: usize,
    col: usize,
    points: Vec<Point>,
    /// Simple polygons covering the cell; more than one if its outline crosses itself
    pieces: Vec<Vec<Point>>,
}

fn read_table(
    table: Node,
    table_no: usize,
    config: &ConverterConfig,
    page: &mut SourcePage,
) -> Result<()> {
    let labels = &config.page;

    if let Some(label) = &labels.region_label {
        let subject = format!("table {table_no}");
        let points = coords_of(table, &subject)?;
        if points.len() >= MIN_POLYGON_POINTS {
            page.annotations.push(SourceAnnotation {
                label: label.clone(),
                region: Region::Polygon(points),
                subject,
            });
        } else {
            page.skipped.push((subject, format!("region has {} point(s)", points.len())));
        }
    }

    let mut cells = Vec::new();
    for node in table.descendants().filter(|n| n.has_tag_name("TableCell")) {
        let subject = format!(
            "table {table_no} cell r{}c{}",
            node.attribute("row").unwrap_or("?"),
            node.attribute("col").unwrap_or("?")
        );
        let (Some(row), Some(col)) = (index_attr(node, "row"), index_attr(node, "col")) else {
            page.skipped.push((subject, "missing or invalid row/col index".to_string()));
            continue;
        };
        let points = coords_of(node, &subject)?;
        if points.len() < MIN_POLYGON_POINTS {
            page.skipped.push((subject, format!("cell has {} point(s)", points.len())));
            continue;
        }
        let Some(pieces) = split_self_intersections(&points) else {
            page.skipped.push((subject, "self-intersecting cell".to_string()));
            continue;
        };
        if pieces.len() > 1 {
            log::debug!("{subject}: self-intersecting outline split into {} pieces", pieces.len());
        }
        cells.push(Cell {
            row,
            col,
            points,
            pieces,
        });
    }

    if let Some(label) = &labels.row_label {
        let rows = group_by(&cells, |c| c.row);
        emit_groups(rows, label, &format!("table {table_no} row"), page);
    }
    if let Some(label) = &labels.column_label {
        let columns = group_by(&cells, |c| c.col);
        emit_groups(columns, label, &format!("table {table_no} column"), page);
    }
    if let Some(label) = &labels.cell_label {
        for cell in &cells {
            let subject = format!("table {table_no} cell r{}c{}", cell.row, cell.col);
            let outline = match cell.pieces.as_slice() {
                [_] => Some(cell.points.clone()),
                pieces => union_outline(pieces),
            };
            match outline {
                Some(outline) => page.annotations.push(SourceAnnotation {
                    label: label.clone(),
                    region: Region::Polygon(outline),
                    subject,
                }),
                None => page.skipped.push((subject, "cell has no area".to_string())),
            }
        }
    }
    Ok(())
}

fn group_by(cells: &[Cell], key: impl Fn(&Cell) -> usize) -> BTreeMap<usize, Vec<Vec<Point>>> {
    let mut groups: BTreeMap<usize, Vec<Vec<Point>>> = BTreeMap::new();
    for cell in cells {
        groups.entry(key(cell)).or_default().extend(cell.pieces.iter().cloned());
    }
    groups
}

fn emit_groups(
    groups: BTreeMap<usize, Vec<Vec<Point>>>,
    label: &str,
    prefix: &str,
    page: &mut SourcePage,
) {
    for (idx, polygons) in groups {
        let subject = format!("{prefix} {idx}");
        match union_outline(&polygons) {
            Some(outline) => page.annotations.push(SourceAnnotation {
                label: label.to_string(),
                region: Region::Polygon(outline),
                subject,
            }),
            None => page
                .skipped
                .push((subject, "cells do not form a polygon".to_string())),
        }
    }
}

fn index_attr(node: Node, name: &str) -> Option<usize> {
    node.attribute(name)?.trim().parse().ok()
}

/// Points of the element's `Coords` child.
///
/// Supports both `points="x,y x,y"` and nested `<Point x= y=/>` elements.
/// A missing `Coords` element yields no points.
fn coords_of(element: Node, subject: &str) -> Result<Vec<Point>> {
    let Some(coords) = element.children().find(|n| n.has_tag_name("Coords")) else {
        return Ok(Vec::new());
    };

    if let Some(points) = coords.attribute("points") {
        return parse_points(points).ok_or_else(|| {
            ConvertError::malformed(subject, format!("unparsable points \"{points}\""))
        });
    }

    coords
        .children()
        .filter(|n| n.has_tag_name("Point"))
        .map(|pt| {
            let x = pt.attribute("x").and_then(|v| v.trim().parse().ok());
            let y = pt.attribute("y").and_then(|v| v.trim().parse().ok());
            match (x, y) {
                (Some(x), Some(y)) => Ok(Point::new(x, y)),
                _ => Err(ConvertError::malformed(subject, "Point without numeric x/y")),
            }
        })
        .collect()
}

fn parse_points(value: &str) -> Option<Vec<Point>> {
    value
        .split_whitespace()
        .map(|pair| {
            let (x, y) = pair.split_once(',')?;
            Some(Point::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
        })
        .collect()
}

/// All `*.xml` files of the annotation directory, sorted by file name
pub fn discover(root: &Path, config: &Arc<ConverterConfig>) -> Result<Vec<Box<dyn PageSource>>> {
    let anno_dir = root.join(&config.annotation_dir);
    let image_dir = root.join(&config.image_dir);

    let entries = std::fs::read_dir(&anno_dir).map_err(|e| ConvertError::io(&anno_dir, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| ConvertError::io(&anno_dir, e))?.path();
        let is_xml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
        if is_xml && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    log::info!("found {} PAGE XML file(s) in {}", paths.len(), anno_dir.display());
    Ok(paths
        .into_iter()
        .map(|path| {
            let file = PageXmlFile::new(path, image_dir.clone(), config.clone());
            Box::new(file) as Box<dyn PageSource>
        })
        .collect())
}
