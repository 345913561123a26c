//! Region validation and polygon helpers.
//!
//! Rows and columns of a table are not annotated directly in PAGE XML; they
//! are derived by merging the polygons of their cells with [`union_outline`].

use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{Area, BooleanOps, Coord, Line, LineString, MultiPolygon, Polygon};

use crate::error::{ConvertError, Result};
use crate::models::{Point, Region};

pub const MIN_POLYGON_POINTS: usize = 3;

/// Validate a region and return its outline (last point not repeated).
///
/// Boxes become their four corners, clockwise from the top-left.
pub fn region_outline(region: &Region, subject: &str) -> Result<Vec<Point>> {
    match region {
        Region::Polygon(points) => {
            if points.len() < MIN_POLYGON_POINTS {
                return Err(ConvertError::malformed(
                    subject,
                    format!(
                        "polygon has {} point(s), at least {} required",
                        points.len(),
                        MIN_POLYGON_POINTS
                    ),
                ));
            }
            if let Some(p) = points.iter().find(|p| !p.x.is_finite() || !p.y.is_finite()) {
                return Err(ConvertError::malformed(
                    subject,
                    format!("non-finite coordinate ({}, {})", p.x, p.y),
                ));
            }
            Ok(points.clone())
        }
        Region::Box {
            xmin,
            ymin,
            xmax,
            ymax,
        } => {
            if ![xmin, ymin, xmax, ymax].iter().all(|v| v.is_finite()) {
                return Err(ConvertError::malformed(subject, "non-finite box bound"));
            }
            if xmin > xmax || ymin > ymax {
                return Err(ConvertError::malformed(
                    subject,
                    format!("inverted box bounds [{xmin}, {ymin}, {xmax}, {ymax}]"),
                ));
            }
            Ok(vec![
                Point::new(*xmin, *ymin),
                Point::new(*xmax, *ymin),
                Point::new(*xmax, *ymax),
                Point::new(*xmin, *ymax),
            ])
        }
    }
}

/// Shoelace area of a simple polygon
pub fn polygon_area(points: &[Point]) -> f64 {
    let n = points.len();
    if n < MIN_POLYGON_POINTS {
        return 0.0;
    }
    let mut twice = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        twice += a.x * b.y - b.x * a.y;
    }
    (twice / 2.0).abs()
}

/// Axis-aligned extent as `[x, y, width, height]`
pub fn bounding_box(points: &[Point]) -> [f64; 4] {
    if points.is_empty() {
        return [0.0; 4];
    }
    let (mut x1, mut y1) = (f64::INFINITY, f64::INFINITY);
    let (mut x2, mut y2) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in points {
        x1 = x1.min(p.x);
        y1 = y1.min(p.y);
        x2 = x2.max(p.x);
        y2 = y2.max(p.y);
    }
    [x1, y1, x2 - x1, y2 - y1]
}

pub fn flatten(points: &[Point]) -> Vec<f64> {
    points.iter().flat_map(|p| [p.x, p.y]).collect()
}

fn to_polygon(points: &[Point]) -> Polygon<f64> {
    let coords: Vec<Coord<f64>> = points.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
    Polygon::new(LineString::from(coords), vec![])
}

/// Merge cell polygons into a single outline.
///
/// When the union falls apart into several pieces (cells that do not touch),
/// the piece with the largest area is kept. Returns `None` when no usable
/// polygon remains. The returned outline has no repeated closing point.
pub fn union_outline(polygons: &[Vec<Point>]) -> Option<Vec<Point>> {
    let mut merged = MultiPolygon::<f64>::new(vec![]);
    for points in polygons {
        if points.len() < MIN_POLYGON_POINTS || polygon_area(points) == 0.0 {
            continue;
        }
        let poly = MultiPolygon::new(vec![to_polygon(points)]);
        merged = merged.union(&poly);
    }

    let largest = merged.0.into_iter().max_by(|a, b| {
        a.unsigned_area()
            .partial_cmp(&b.unsigned_area())
            .unwrap_or(std::cmp::Ordering::Equal)
    })?;

    let mut outline: Vec<Point> = largest
        .exterior()
        .coords()
        .map(|c| Point::new(c.x, c.y))
        .collect();
    if outline.len() > 1 && outline.first() == outline.last() {
        outline.pop();
    }
    (outline.len() >= MIN_POLYGON_POINTS).then_some(outline)
}

/// Split a ring at the points where its edges cross each other.
///
/// A bow-tie becomes its two triangles. Returns `None` when edges touch or
/// overlap without crossing, since there is no single way to repair that.
/// Pieces without area are dropped.
pub fn split_self_intersections(points: &[Point]) -> Option<Vec<Vec<Point>>> {
    let mut ring: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        if ring.last() != Some(p) {
            ring.push(*p);
        }
    }
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    if ring.len() < MIN_POLYGON_POINTS {
        return Some(Vec::new());
    }

    let Some((i, j, crossing)) = first_crossing(&ring)? else {
        return Some(if polygon_area(&ring) > 0.0 {
            vec![ring]
        } else {
            Vec::new()
        });
    };

    let n = ring.len();
    let mut left = vec![crossing];
    left.extend_from_slice(&ring[i + 1..=j]);
    let mut right: Vec<Point> = ring[j + 1..n].iter().chain(&ring[..=i]).copied().collect();
    right.push(crossing);

    let mut pieces = split_self_intersections(&left)?;
    pieces.extend(split_self_intersections(&right)?);
    Some(pieces)
}

/// First pair of non-adjacent edges `(i, j)` that cross, with the crossing point.
///
/// Returns `None` when two such edges meet without properly crossing.
fn first_crossing(ring: &[Point]) -> Option<Option<(usize, usize, Point)>> {
    let n = ring.len();
    let edge = |k: usize| {
        let (a, b) = (ring[k], ring[(k + 1) % n]);
        Line::new(Coord { x: a.x, y: a.y }, Coord { x: b.x, y: b.y })
    };
    for i in 0..n {
        for j in i + 2..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            match line_intersection(edge(i), edge(j)) {
                None => {}
                Some(LineIntersection::SinglePoint {
                    intersection,
                    is_proper: true,
                }) => return Some(Some((i, j, Point::new(intersection.x, intersection.y)))),
                Some(_) => return None,
            }
        }
    }
    Some(None)
}
