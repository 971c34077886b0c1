use std::collections::HashMap;

use crate::math::{Point2, Point3, Vector3, TOLERANCE};

/// Axis-Aligned Bounding Box.
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    pub min: Point3,
    pub max: Point3,
}

impl Aabb {
    /// Builds the smallest box containing all `points`, or `None` if empty.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut min = *first;
        let mut max = *first;
        for p in iter {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }
        Some(Self { min, max })
    }

    /// Center point of the box.
    #[must_use]
    pub fn center(&self) -> Point3 {
        Point3::new(
            f64::midpoint(self.min.x, self.max.x),
            f64::midpoint(self.min.y, self.max.y),
            f64::midpoint(self.min.z, self.max.z),
        )
    }

    /// Checks if two boxes overlap within the global tolerance.
    #[must_use]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x + TOLERANCE
            && self.max.x >= other.min.x - TOLERANCE
            && self.min.y <= other.max.y + TOLERANCE
            && self.max.y >= other.min.y - TOLERANCE
            && self.min.z <= other.max.z + TOLERANCE
            && self.max.z >= other.min.z - TOLERANCE
    }
}

/// An indexed triangle mesh.
///
/// The engraving pipeline treats a `Solid` as a closed, manifold shape; the
/// boolean engine enforces that invariant on its results. Intermediate tool
/// solids built by concatenation ([`Solid::merge`]) are exempt — they are
/// only ever used as boolean operands, never rendered standalone.
#[derive(Debug, Clone, Default)]
pub struct Solid {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Vertex normals.
    pub normals: Vec<Vector3>,
    /// UV coordinates (pass-through; may be empty for solids that are never
    /// textured).
    pub uvs: Vec<Point2>,
    /// Triangle indices (each triple defines a triangle).
    pub indices: Vec<[u32; 3]>,
}

/// Weld quantum used to identify coincident vertices produced by separate
/// computations (e.g. BSP splits evaluated from either side of a plane).
const WELD_QUANTUM: f64 = 1e-6;

impl Solid {
    /// True if the mesh has no triangles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Axis-aligned bounding box, or `None` for an empty mesh.
    #[must_use]
    pub fn bounding_box(&self) -> Option<Aabb> {
        Aabb::from_points(&self.vertices)
    }

    /// Translates all vertices by `offset`.
    pub fn translate(&mut self, offset: Vector3) {
        for v in &mut self.vertices {
            *v += offset;
        }
    }

    /// Scales all vertices about the origin.
    ///
    /// A negative determinant (mirroring, e.g. the Y flip applied to traced
    /// artwork) reverses triangle winding so outward orientation is
    /// preserved. Normals are recomputed from the scaled geometry.
    pub fn scale(&mut self, sx: f64, sy: f64, sz: f64) {
        for v in &mut self.vertices {
            v.x *= sx;
            v.y *= sy;
            v.z *= sz;
        }
        if sx * sy * sz < 0.0 {
            for tri in &mut self.indices {
                tri.swap(1, 2);
            }
        }
        self.recompute_normals();
    }

    /// Rotates all vertices (and normals) about the X axis.
    pub fn rotate_x(&mut self, angle: f64) {
        let rot = nalgebra::Rotation3::from_axis_angle(&Vector3::x_axis(), angle);
        for v in &mut self.vertices {
            *v = rot * *v;
        }
        for n in &mut self.normals {
            *n = rot * *n;
        }
    }

    /// Appends another mesh, offsetting its indices.
    ///
    /// This is a plain concatenation union: overlapping volumes are not
    /// resolved. Tool solids for boolean subtraction are built this way.
    pub fn merge(&mut self, other: &Solid) {
        #[allow(clippy::cast_possible_truncation)]
        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.normals.extend_from_slice(&other.normals);
        self.uvs.extend_from_slice(&other.uvs);
        self.indices
            .extend(other.indices.iter().map(|t| [t[0] + offset, t[1] + offset, t[2] + offset]));
    }

    /// Recomputes per-vertex normals as the area-weighted average of
    /// adjacent face normals.
    pub fn recompute_normals(&mut self) {
        self.normals = vec![Vector3::zeros(); self.vertices.len()];
        for tri in &self.indices {
            let a = self.vertices[tri[0] as usize];
            let b = self.vertices[tri[1] as usize];
            let c = self.vertices[tri[2] as usize];
            let face = (b - a).cross(&(c - a));
            for &i in tri {
                self.normals[i as usize] += face;
            }
        }
        for n in &mut self.normals {
            let len = n.norm();
            *n = if len < TOLERANCE {
                Vector3::z()
            } else {
                *n / len
            };
        }
    }

    /// Total surface area.
    #[must_use]
    pub fn surface_area(&self) -> f64 {
        self.indices
            .iter()
            .map(|tri| {
                let a = self.vertices[tri[0] as usize];
                let b = self.vertices[tri[1] as usize];
                let c = self.vertices[tri[2] as usize];
                (b - a).cross(&(c - a)).norm() * 0.5
            })
            .sum()
    }

    /// Signed volume via the divergence theorem.
    ///
    /// Positive for a closed mesh with outward-facing triangles.
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.indices
            .iter()
            .map(|tri| {
                let a = self.vertices[tri[0] as usize].coords;
                let b = self.vertices[tri[1] as usize].coords;
                let c = self.vertices[tri[2] as usize].coords;
                a.dot(&b.cross(&c)) / 6.0
            })
            .sum()
    }

    /// Checks that the mesh is closed and consistently oriented.
    ///
    /// Coincident vertices are welded first, and every triangle edge is
    /// subdivided at welded vertices lying on it, so T-junctions introduced
    /// by plane splits do not produce false boundaries. After refinement,
    /// each directed edge must be balanced by an equal number of
    /// opposite-direction edges.
    #[must_use]
    pub fn is_watertight(&self) -> bool {
        if self.indices.is_empty() {
            return false;
        }

        // Weld coincident vertices.
        let mut weld: HashMap<(i64, i64, i64), usize> = HashMap::new();
        let mut welded_pos: Vec<Point3> = Vec::new();
        let mut vertex_to_welded: Vec<usize> = Vec::with_capacity(self.vertices.len());
        for v in &self.vertices {
            let key = quantize(v);
            let id = *weld.entry(key).or_insert_with(|| {
                welded_pos.push(*v);
                welded_pos.len() - 1
            });
            vertex_to_welded.push(id);
        }

        let mut edge_counts: HashMap<(usize, usize), i64> = HashMap::new();
        for tri in &self.indices {
            let w = [
                vertex_to_welded[tri[0] as usize],
                vertex_to_welded[tri[1] as usize],
                vertex_to_welded[tri[2] as usize],
            ];
            if w[0] == w[1] || w[1] == w[2] || w[2] == w[0] {
                // Degenerate sliver collapsed by welding; contributes no area.
                continue;
            }
            for k in 0..3 {
                let a = w[k];
                let b = w[(k + 1) % 3];
                for (s, e) in refine_edge(a, b, &welded_pos) {
                    *edge_counts.entry((s, e)).or_insert(0) += 1;
                }
            }
        }

        edge_counts
            .iter()
            .all(|(&(a, b), &count)| edge_counts.get(&(b, a)).copied().unwrap_or(0) == count)
    }
}

fn quantize(p: &Point3) -> (i64, i64, i64) {
    #[allow(clippy::cast_possible_truncation)]
    let q = |v: f64| (v / WELD_QUANTUM).round() as i64;
    (q(p.x), q(p.y), q(p.z))
}

/// Splits the directed edge `a -> b` at every welded vertex lying on it.
fn refine_edge(a: usize, b: usize, positions: &[Point3]) -> Vec<(usize, usize)> {
    let pa = positions[a];
    let pb = positions[b];
    let dir = pb - pa;
    let len2 = dir.norm_squared();
    if len2 < TOLERANCE {
        return vec![(a, b)];
    }

    let mut on_edge: Vec<(f64, usize)> = Vec::new();
    for (i, p) in positions.iter().enumerate() {
        if i == a || i == b {
            continue;
        }
        let t = (p - pa).dot(&dir) / len2;
        if t <= 0.0 || t >= 1.0 {
            continue;
        }
        let closest = pa + dir * t;
        if (p - closest).norm() < WELD_QUANTUM * 4.0 {
            on_edge.push((t, i));
        }
    }

    if on_edge.is_empty() {
        return vec![(a, b)];
    }
    on_edge.sort_by(|x, y| x.0.total_cmp(&y.0));

    let mut result = Vec::with_capacity(on_edge.len() + 1);
    let mut prev = a;
    for (_, i) in on_edge {
        if i != prev {
            result.push((prev, i));
            prev = i;
        }
    }
    if prev != b {
        result.push((prev, b));
    }
    result
}
