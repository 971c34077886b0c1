mod text;
mod triangulate;

pub use text::TypesetText;
pub use triangulate::triangulate_paths;

#[cfg(test)]
pub(crate) use text::metrics_only_font;

use serde::{Deserialize, Serialize};

use crate::error::{ExtrudeError, Result};
use crate::math::{polygon_2d::point_in_polygon, Point2, Point3, Vector2, Vector3, TOLERANCE};
use crate::path::{Path, Winding};
use crate::solid::Solid;

/// Target envelope for text engravings.
pub const TEXT_MAX_SIZE: f64 = 3.0;

/// Target envelope for logo engravings (smaller than text).
pub const LOGO_MAX_SIZE: f64 = 1.5;

/// How a finished engraving solid is fitted against a target face.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlacementParams {
    /// Largest allowed extent in either planar axis. Artwork is only ever
    /// scaled down to fit, never up.
    pub max_size: f64,
    /// Offset along the target face normal (the face's local Y after the
    /// engraving is laid flat).
    pub face_offset: f64,
}

/// Extrudes a set of closed paths into a single merged solid.
///
/// Each filled region becomes a prism: CDT caps (holes respected via
/// even-odd classification) plus side walls along every contour. The output
/// is a boolean *tool*: overlapping regions are concatenated, not unioned.
pub struct ExtrudePaths {
    paths: Vec<Path>,
    depth: f64,
    bevel: Option<f64>,
}

impl ExtrudePaths {
    /// Creates a new `ExtrudePaths` operation.
    #[must_use]
    pub fn new(paths: Vec<Path>, depth: f64) -> Self {
        Self {
            paths,
            depth,
            bevel: None,
        }
    }

    /// Adds a straight chamfer of the given size at the far cap.
    #[must_use]
    pub fn with_bevel(mut self, bevel: f64) -> Self {
        self.bevel = (bevel > 0.0).then_some(bevel);
        self
    }

    /// Executes the extrusion.
    ///
    /// # Errors
    ///
    /// Returns [`ExtrudeError::InvalidDepth`] for a non-positive depth and
    /// [`ExtrudeError::EmptyPathSet`] if no non-degenerate closed path
    /// remains after filtering.
    pub fn execute(&self) -> Result<Solid> {
        if self.depth <= 0.0 {
            return Err(ExtrudeError::InvalidDepth(self.depth).into());
        }

        let mut paths: Vec<Path> = self
            .paths
            .iter()
            .filter(|p| p.closed && !p.is_degenerate() && p.signed_area().abs() > TOLERANCE)
            .cloned()
            .collect();
        if paths.is_empty() {
            return Err(ExtrudeError::EmptyPathSet.into());
        }
        normalize_windings(&mut paths);

        let bevel = self.bevel.map(|b| b.min(self.depth / 2.0));
        let wall_top = bevel.map_or(self.depth, |b| self.depth - b);

        let mut solid = Solid::default();

        // Bottom cap at z = 0, facing -Z.
        let bottom = triangulate_paths(&paths)?;
        append_cap(&mut solid, &bottom, 0.0, false);

        // Side walls from z = 0 up to the wall top.
        for path in &paths {
            append_walls(&mut solid, &path.points, 0.0, wall_top);
        }

        // Far cap (+Z), chamfered toward the loop interiors when beveled.
        if let Some(b) = bevel {
            let inset: Vec<Path> = paths.iter().map(|p| inset_loop(p, b)).collect();
            for (outer, inner) in paths.iter().zip(&inset) {
                append_chamfer(&mut solid, &outer.points, &inner.points, wall_top, self.depth);
            }
            let top = triangulate_paths(&inset)?;
            append_cap(&mut solid, &top, self.depth, true);
        } else {
            append_cap(&mut solid, &bottom, self.depth, true);
        }

        solid.recompute_normals();
        Ok(solid)
    }
}

/// Re-orients loops so even containment depth winds positive (outer) and
/// odd depth negative (hole), regardless of the authoring convention
/// (traced rasters and SVG are y-down, font outlines y-up).
fn normalize_windings(paths: &mut [Path]) {
    let snapshots: Vec<Vec<Point2>> = paths.iter().map(|p| p.points.clone()).collect();
    for (i, path) in paths.iter_mut().enumerate() {
        let probe = edge_midpoint(&path.points);
        let depth = snapshots
            .iter()
            .enumerate()
            .filter(|(j, other)| *j != i && point_in_polygon(&probe, other))
            .count();
        let want_positive = depth % 2 == 0;
        let is_positive = path.winding() == Winding::CounterClockwise;
        if want_positive != is_positive {
            path.reverse();
        }
    }
}

/// A point on the contour used as a containment probe (an edge midpoint is
/// never a shared lattice corner of a sibling contour).
fn edge_midpoint(points: &[Point2]) -> Point2 {
    let a = points[0];
    let b = points[1 % points.len()];
    Point2::new(f64::midpoint(a.x, b.x), f64::midpoint(a.y, b.y))
}

/// Appends cap triangles at height `z`. CDT triangles arrive
/// counter-clockwise; `facing_up` keeps them, otherwise they are flipped to
/// face -Z.
fn append_cap(solid: &mut Solid, triangles: &[[Point2; 3]], z: f64, facing_up: bool) {
    for tri in triangles {
        #[allow(clippy::cast_possible_truncation)]
        let base = solid.vertices.len() as u32;
        for p in tri {
            solid.vertices.push(Point3::new(p.x, p.y, z));
            solid.uvs.push(*p);
        }
        if facing_up {
            solid.indices.push([base, base + 1, base + 2]);
        } else {
            solid.indices.push([base, base + 2, base + 1]);
        }
    }
}

/// Appends side-wall quads along a contour between two heights.
///
/// With normalized windings, the right-hand side of the direction of travel
/// faces away from the filled region, so walls come out outward-facing.
fn append_walls(solid: &mut Solid, points: &[Point2], z0: f64, z1: f64) {
    let n = points.len();
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        #[allow(clippy::cast_possible_truncation)]
        let base = solid.vertices.len() as u32;
        solid.vertices.push(Point3::new(a.x, a.y, z0));
        solid.vertices.push(Point3::new(b.x, b.y, z0));
        solid.vertices.push(Point3::new(b.x, b.y, z1));
        solid.vertices.push(Point3::new(a.x, a.y, z1));
        for p in [a, b, b, a] {
            solid.uvs.push(p);
        }
        solid.indices.push([base, base + 1, base + 2]);
        solid.indices.push([base, base + 2, base + 3]);
    }
}

/// Appends the chamfer band connecting a contour at `z0` to its inset
/// counterpart at `z1`. Both rings have identical point counts.
fn append_chamfer(solid: &mut Solid, outer: &[Point2], inner: &[Point2], z0: f64, z1: f64) {
    let n = outer.len();
    for i in 0..n {
        let j = (i + 1) % n;
        #[allow(clippy::cast_possible_truncation)]
        let base = solid.vertices.len() as u32;
        solid.vertices.push(Point3::new(outer[i].x, outer[i].y, z0));
        solid.vertices.push(Point3::new(outer[j].x, outer[j].y, z0));
        solid.vertices.push(Point3::new(inner[j].x, inner[j].y, z1));
        solid.vertices.push(Point3::new(inner[i].x, inner[i].y, z1));
        for p in [outer[i], outer[j], inner[j], inner[i]] {
            solid.uvs.push(p);
        }
        solid.indices.push([base, base + 1, base + 2]);
        solid.indices.push([base, base + 2, base + 3]);
    }
}

/// Offsets a loop toward the filled region's interior by `amount` along
/// per-vertex bisectors. Used only for shallow chamfers; large offsets on
/// spiky contours are not protected against self-intersection.
fn inset_loop(path: &Path, amount: f64) -> Path {
    let points = &path.points;
    let n = points.len();
    let mut result = Vec::with_capacity(n);
    for i in 0..n {
        let prev = points[(i + n - 1) % n];
        let curr = points[i];
        let next = points[(i + 1) % n];

        let left = |from: Point2, to: Point2| -> Vector2 {
            let d = to - from;
            let len = d.norm();
            if len < TOLERANCE {
                Vector2::zeros()
            } else {
                Vector2::new(-d.y / len, d.x / len)
            }
        };

        let bisector = left(prev, curr) + left(curr, next);
        let len = bisector.norm();
        let offset = if len < TOLERANCE {
            Vector2::zeros()
        } else {
            bisector / len * amount
        };
        result.push(curr + offset);
    }
    Path::closed(result)
}

/// Centers, fits, and orients an engraving solid against a target face.
///
/// The sequence is fixed: translate the XY bounding-box center to the
/// origin; scale down (never up) to the size envelope while flipping Y so
/// traced artwork reads correctly once rotated; lay the solid flat with a
/// 90° rotation about X; then slide it along the face normal.
pub fn center_on_face(solid: &mut Solid, params: &PlacementParams) {
    let Some(bb) = solid.bounding_box() else {
        return;
    };
    let center = bb.center();
    solid.translate(Vector3::new(-center.x, -center.y, 0.0));

    let width = bb.max.x - bb.min.x;
    let height = bb.max.y - bb.min.y;
    let mut scale = 1.0_f64;
    if width > TOLERANCE {
        scale = scale.min(params.max_size / width);
    }
    if height > TOLERANCE {
        scale = scale.min(params.max_size / height);
    }
    solid.scale(scale, -scale, 1.0);

    // Negative quarter turn sends extrusion depth (+Z) to +Y, so the tool
    // sinks into the material above the offset plane.
    solid.rotate_x(-std::f64::consts::FRAC_PI_2);
    solid.translate(Vector3::new(0.0, params.face_offset, 0.0));
}
