//! SVG drawing to GPS course conversion.
//!
//! Takes the `<path>` geometry of an SVG, samples it evenly along cumulative
//! arc length, and projects the samples to coordinates around an anchor
//! point. The projection is the fixed linear scale from
//! [crate::geo::DEGREES_PER_METER], fine for course-sized extents.

use kurbo::{CubicBez, Line, ParamCurve, ParamCurveArclen, PathSeg, Point, QuadBez};
use log::warn;
use usvg::tiny_skia_path::PathSegment;

use crate::{
    course::PathPoint, geo, location::GeoPoint, prelude::*, settings::SvgImportSettings,
};

use anyhow::bail;

/// Accuracy for arc length math, in SVG units
const ARCLEN_ACCURACY: f64 = 1e-3;

/// Convert SVG markup into a course of waypoints anchored at `anchor`.
///
/// One scaled SVG unit maps to one meter. Every failure mode (markup that
/// doesn't parse, no drawable paths) logs a diagnostic and yields an empty
/// course, the caller never sees an error.
pub fn import_course(
    svg_markup: &str,
    anchor: GeoPoint,
    settings: &SvgImportSettings,
) -> Vec<PathPoint> {
    match convert(svg_markup, anchor, settings) {
        Ok(points) => points,
        Err(why) => {
            warn!("Failed to import SVG course: {why:?}");
            Vec::new()
        }
    }
}

fn convert(
    svg_markup: &str,
    anchor: GeoPoint,
    settings: &SvgImportSettings,
) -> Result<Vec<PathPoint>> {
    let tree = usvg::Tree::from_str(svg_markup, &usvg::Options::default())
        .context("Failed to parse SVG markup")?;

    let size = tree.size();
    let center = Point::new(size.width() as f64 / 2.0, size.height() as f64 / 2.0);

    let mut paths = Vec::new();
    collect_paths(tree.root(), &mut paths);

    if paths.is_empty() {
        bail!("SVG has no path elements");
    }

    let mut out: Vec<PathPoint> = Vec::new();

    for path in paths {
        // Every path gets at least 2 points, skip the rest once the budget
        // can't cover that
        if out.len() + 2 > settings.max_points {
            warn!("Waypoint budget of {} exhausted, skipping remaining paths", settings.max_points);
            break;
        }

        let measured = MeasuredPath::new(to_segments(path));
        if measured.total <= 0.0 {
            continue;
        }

        let length_meters = measured.total * settings.svg_scale;
        let budget = settings.max_points - out.len();
        let count = sample_count(length_meters, budget, settings);

        for i in 0..count {
            let along = measured.total * i as f64 / (count - 1) as f64;
            let candidate = project(measured.point_at(along), center, anchor, settings);

            // Decimate, enforcing the minimum spacing over the whole output
            let spaced = out.last().is_none_or(|last| {
                geo::distance_meters(last.point, candidate) >= settings.min_distance_meters
            });

            if spaced {
                let order = out.len() as u32;
                out.push(PathPoint::new(order as u64, candidate, order));
            }
        }
    }

    Ok(out)
}

/// How many samples to take along a path: dense enough for the minimum
/// spacing, never sparser than the maximum, capped by the remaining budget
fn sample_count(length_meters: f64, budget: usize, settings: &SvgImportSettings) -> usize {
    let wanted = (length_meters / settings.min_distance_meters).ceil() as usize;
    let dense_floor = (length_meters / settings.max_distance_meters).ceil() as usize + 1;
    wanted.max(dense_floor).clamp(2, budget)
}

/// Normalize a sample about the viewBox center, scale, rotate, and project it
/// onto the map
fn project(
    sample: Point,
    center: Point,
    anchor: GeoPoint,
    settings: &SvgImportSettings,
) -> GeoPoint {
    let rel_x = (sample.x - center.x) * settings.svg_scale;
    let rel_y = (sample.y - center.y) * settings.svg_scale;

    let theta = settings.svg_rotation_degrees.to_radians();
    let (sin, cos) = theta.sin_cos();
    let east = rel_x * cos - rel_y * sin;
    let south = rel_x * sin + rel_y * cos;

    // SVG y grows downward, so south is negated into north
    geo::offset_by_meters(anchor, east, -south)
}

fn collect_paths<'a>(group: &'a usvg::Group, paths: &mut Vec<&'a usvg::Path>) {
    for node in group.children() {
        match node {
            usvg::Node::Path(path) => paths.push(path),
            usvg::Node::Group(group) => collect_paths(group, paths),
            _ => {}
        }
    }
}

/// Flatten a usvg path into kurbo segments with the node's absolute transform
/// applied
fn to_segments(path: &usvg::Path) -> Vec<PathSeg> {
    let transform = path.abs_transform();

    let map = |point: usvg::tiny_skia_path::Point| {
        Point::new(
            (transform.sx * point.x + transform.kx * point.y + transform.tx) as f64,
            (transform.ky * point.x + transform.sy * point.y + transform.ty) as f64,
        )
    };

    let mut segments = Vec::new();
    let mut subpath_start = Point::ZERO;
    let mut current = Point::ZERO;

    for segment in path.data().segments() {
        match segment {
            PathSegment::MoveTo(p) => {
                let p = map(p);
                subpath_start = p;
                current = p;
            }
            PathSegment::LineTo(p) => {
                let p = map(p);
                segments.push(PathSeg::Line(Line::new(current, p)));
                current = p;
            }
            PathSegment::QuadTo(p1, p) => {
                let (p1, p) = (map(p1), map(p));
                segments.push(PathSeg::Quad(QuadBez::new(current, p1, p)));
                current = p;
            }
            PathSegment::CubicTo(p1, p2, p) => {
                let (p1, p2, p) = (map(p1), map(p2), map(p));
                segments.push(PathSeg::Cubic(CubicBez::new(current, p1, p2, p)));
                current = p;
            }
            PathSegment::Close => {
                if current != subpath_start {
                    segments.push(PathSeg::Line(Line::new(current, subpath_start)));
                }
                current = subpath_start;
            }
        }
    }

    segments
}

/// A path with per-segment arc lengths, for sampling by cumulative length
struct MeasuredPath {
    segments: Vec<(PathSeg, f64)>,
    total: f64,
}

impl MeasuredPath {
    fn new(segments: Vec<PathSeg>) -> Self {
        let segments = segments
            .into_iter()
            .map(|seg| {
                let len = seg.arclen(ARCLEN_ACCURACY);
                (seg, len)
            })
            .collect::<Vec<_>>();
        let total = segments.iter().map(|(_, len)| len).sum();

        Self { segments, total }
    }

    /// The point at arc length `along` from the start of the path
    fn point_at(&self, along: f64) -> Point {
        let mut remaining = along.clamp(0.0, self.total);

        for (seg, len) in &self.segments {
            if remaining <= *len {
                let t = seg.inv_arclen(remaining, ARCLEN_ACCURACY);
                return seg.eval(t);
            }
            remaining -= len;
        }

        // Float error can leave a sliver past the final segment
        match self.segments.last() {
            Some((seg, _)) => seg.eval(1.0),
            None => Point::ZERO,
        }
    }
}
