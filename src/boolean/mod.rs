mod bsp;

pub use bsp::BSP_EPSILON;

use bsp::{Node, Polygon, Vertex};

use crate::error::BooleanError;
use crate::math::{Point3, TOLERANCE};
use crate::solid::Solid;

/// Regularized boolean operation between two solids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    Subtraction,
    Union,
    Intersection,
}

/// A boolean evaluator over triangle-boundary solids.
///
/// The trait seam exists so the pipeline can swap evaluators (or wrap one
/// with instrumentation) without touching call sites.
pub trait BooleanBackend {
    /// Evaluates `base <op> tool`.
    ///
    /// # Errors
    ///
    /// Returns a [`BooleanError`] when the tool is unusable or the result
    /// fails validation; callers are expected to keep the base solid in
    /// that case.
    fn evaluate(&self, base: &Solid, tool: &Solid, op: BooleanOp) -> Result<Solid, BooleanError>;
}

/// BSP-tree boolean evaluator.
///
/// Both solids are decomposed into boundary polygons, clipped against each
/// other's tree, and recombined. Splitting introduces T-junction vertices
/// on shared cut planes; the output is welded but validation stays
/// T-junction tolerant.
#[derive(Debug, Default)]
pub struct BspEvaluator;

impl BooleanBackend for BspEvaluator {
    fn evaluate(&self, base: &Solid, tool: &Solid, op: BooleanOp) -> Result<Solid, BooleanError> {
        if tool.is_empty() {
            // Nothing to cut with; identity is the regularized result.
            return Ok(base.clone());
        }
        if tool.surface_area() < TOLERANCE {
            return Err(BooleanError::ZeroAreaTool);
        }

        let a = Node::new(to_polygons(base));
        let b = to_polygons(tool);
        if b.is_empty() {
            return Err(BooleanError::DegenerateTool(
                "tool has no non-degenerate triangles".into(),
            ));
        }
        let b = Node::new(b);

        let polygons = match op {
            BooleanOp::Subtraction => bsp::subtract(a, b),
            BooleanOp::Union => bsp::union(a, b),
            BooleanOp::Intersection => bsp::intersect(a, b),
        };

        let mut solid = from_polygons(&polygons);
        solid.recompute_normals();
        if !solid.is_empty() && !solid.is_watertight() {
            return Err(BooleanError::NonManifoldResult);
        }
        Ok(solid)
    }
}

/// Converts a triangle solid into BSP input polygons, dropping degenerate
/// triangles.
fn to_polygons(solid: &Solid) -> Vec<Polygon> {
    let mut polygons = Vec::with_capacity(solid.indices.len());
    for tri in &solid.indices {
        let vertices: Vec<Vertex> = tri
            .iter()
            .map(|&i| {
                let i = i as usize;
                Vertex {
                    pos: solid.vertices[i],
                    normal: solid.normals[i],
                    uv: solid.uvs[i],
                }
            })
            .collect();
        // Polygon::new rejects collinear triangles.
        if let Some(p) = Polygon::new(vertices) {
            polygons.push(p);
        }
    }
    polygons
}

/// Rebuilds an indexed triangle solid from BSP output polygons.
///
/// BSP polygons are convex, so each is fan-triangulated from its first
/// vertex. Vertices are welded on a grid matched to the clip tolerance so
/// co-located split points share indices.
fn from_polygons(polygons: &[Polygon]) -> Solid {
    let mut solid = Solid::default();
    let mut lookup: std::collections::HashMap<(i64, i64, i64), u32> =
        std::collections::HashMap::new();

    let mut index_of = |solid: &mut Solid, v: &Vertex| -> u32 {
        let key = weld_key(&v.pos);
        if let Some(&idx) = lookup.get(&key) {
            return idx;
        }
        #[allow(clippy::cast_possible_truncation)]
        let idx = solid.vertices.len() as u32;
        solid.vertices.push(v.pos);
        solid.normals.push(v.normal);
        solid.uvs.push(v.uv);
        lookup.insert(key, idx);
        idx
    };

    for polygon in polygons {
        let n = polygon.vertices.len();
        if n < 3 {
            continue;
        }
        let i0 = index_of(&mut solid, &polygon.vertices[0]);
        for i in 1..n - 1 {
            let i1 = index_of(&mut solid, &polygon.vertices[i]);
            let i2 = index_of(&mut solid, &polygon.vertices[i + 1]);
            if i0 != i1 && i1 != i2 && i2 != i0 {
                solid.indices.push([i0, i1, i2]);
            }
        }
    }
    solid
}

#[allow(clippy::cast_possible_truncation)]
fn weld_key(p: &Point3) -> (i64, i64, i64) {
    let q = |v: f64| (v / BSP_EPSILON).round() as i64;
    (q(p.x), q(p.y), q(p.z))
}
