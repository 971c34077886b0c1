use crate::error::{ExtrudeError, Result};
use crate::math::{Point2, Point3, Vector3, TOLERANCE};
use crate::solid::Solid;

/// Creates a closed prism: a cylinder approximated by `sides` flat faces,
/// centered at the origin with its axis along Y.
///
/// Six sides produce the hexagonal vessel body; larger counts approximate a
/// round one.
pub struct MakePrism {
    radius: f64,
    height: f64,
    sides: u32,
}

impl MakePrism {
    /// Creates a new `MakePrism` operation.
    #[must_use]
    pub fn new(radius: f64, height: f64, sides: u32) -> Self {
        Self {
            radius,
            height,
            sides,
        }
    }

    /// Executes the construction.
    ///
    /// # Errors
    ///
    /// Returns [`ExtrudeError::DegeneratePath`] if the radius or height is
    /// not positive, or fewer than 3 sides are requested.
    #[allow(clippy::cast_possible_truncation)]
    pub fn execute(&self) -> Result<Solid> {
        if self.radius < TOLERANCE || self.height < TOLERANCE {
            return Err(
                ExtrudeError::DegeneratePath("prism radius and height must be positive".into())
                    .into(),
            );
        }
        if self.sides < 3 {
            return Err(
                ExtrudeError::DegeneratePath("prism needs at least 3 sides".into()).into(),
            );
        }

        let n = self.sides as usize;
        let half = self.height / 2.0;
        let mut solid = Solid::default();

        // Ring vertices: bottom ring then top ring.
        for &y in &[-half, half] {
            for i in 0..n {
                #[allow(clippy::cast_precision_loss)]
                let angle = std::f64::consts::TAU * i as f64 / n as f64;
                solid.vertices.push(Point3::new(
                    self.radius * angle.cos(),
                    y,
                    self.radius * angle.sin(),
                ));
            }
        }
        // Cap centers.
        solid.vertices.push(Point3::new(0.0, -half, 0.0));
        solid.vertices.push(Point3::new(0.0, half, 0.0));
        let bottom_center = (2 * n) as u32;
        let top_center = bottom_center + 1;

        // Side quads. Ring angle runs from +X toward +Z, which is clockwise
        // seen from +Y, so the outward ordering walks bottom -> top first.
        for i in 0..n {
            let j = (i + 1) % n;
            let (bi, bj) = (i as u32, j as u32);
            let (ti, tj) = ((n + i) as u32, (n + j) as u32);
            solid.indices.push([bi, tj, bj]);
            solid.indices.push([bi, ti, tj]);
        }

        // Cap fans.
        for i in 0..n {
            let j = (i + 1) % n;
            solid.indices.push([bottom_center, i as u32, j as u32]);
            solid.indices.push([top_center, (n + j) as u32, (n + i) as u32]);
        }

        solid.uvs = vec![Point2::origin(); solid.vertices.len()];
        solid.recompute_normals();
        Ok(solid)
    }
}

/// Creates a flat rectangular grid in the XY plane, centered at the origin,
/// with UVs spanning 0..1.
///
/// This is the source mesh for conformal decal surfaces; the projector
/// displaces its vertices per frame while the UVs stay put.
pub struct MakePlane {
    width: f64,
    height: f64,
    segments: u32,
}

impl MakePlane {
    /// Creates a new `MakePlane` operation.
    #[must_use]
    pub fn new(width: f64, height: f64, segments: u32) -> Self {
        Self {
            width,
            height,
            segments,
        }
    }

    /// Executes the construction.
    ///
    /// # Errors
    ///
    /// Returns [`ExtrudeError::DegeneratePath`] if a dimension is not
    /// positive or the segment count is zero.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn execute(&self) -> Result<Solid> {
        if self.width < TOLERANCE || self.height < TOLERANCE {
            return Err(
                ExtrudeError::DegeneratePath("plane dimensions must be positive".into()).into(),
            );
        }
        if self.segments == 0 {
            return Err(
                ExtrudeError::DegeneratePath("plane needs at least 1 segment".into()).into(),
            );
        }

        let n = self.segments as usize;
        let cols = n + 1;
        let mut solid = Solid::default();
        solid.vertices.reserve(cols * cols);
        solid.uvs.reserve(cols * cols);

        for iy in 0..cols {
            let v = iy as f64 / n as f64;
            let y = (v - 0.5) * self.height;
            for ix in 0..cols {
                let u = ix as f64 / n as f64;
                let x = (u - 0.5) * self.width;
                solid.vertices.push(Point3::new(x, y, 0.0));
                solid.uvs.push(Point2::new(u, v));
            }
        }

        for iy in 0..n {
            for ix in 0..n {
                let i00 = (iy * cols + ix) as u32;
                let i10 = (iy * cols + ix + 1) as u32;
                let i01 = ((iy + 1) * cols + ix) as u32;
                let i11 = ((iy + 1) * cols + ix + 1) as u32;
                solid.indices.push([i00, i10, i11]);
                solid.indices.push([i00, i11, i01]);
            }
        }

        solid.normals = vec![Vector3::z(); solid.vertices.len()];
        Ok(solid)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn hexagonal_prism_is_closed_with_positive_volume() {
        let prism = MakePrism::new(2.1, 1.4, 6).execute().unwrap();
        assert!(prism.is_watertight());
        // Regular hexagon area = 3*sqrt(3)/2 * r^2.
        let expected = 3.0 * 3.0_f64.sqrt() / 2.0 * 2.1 * 2.1 * 1.4;
        assert_relative_eq!(prism.volume(), expected, epsilon = 1e-9);
    }

    #[test]
    fn prism_rejects_bad_inputs() {
        assert!(MakePrism::new(0.0, 1.0, 6).execute().is_err());
        assert!(MakePrism::new(1.0, 1.0, 2).execute().is_err());
    }

    #[test]
    fn plane_grid_counts() {
        let plane = MakePlane::new(30.0, 30.0, 24).execute().unwrap();
        assert_eq!(plane.vertices.len(), 25 * 25);
        assert_eq!(plane.indices.len(), 24 * 24 * 2);
        assert_eq!(plane.uvs.len(), plane.vertices.len());
    }

    #[test]
    fn plane_uvs_span_unit_square() {
        let plane = MakePlane::new(10.0, 20.0, 4).execute().unwrap();
        let first = plane.uvs[0];
        let last = plane.uvs[plane.uvs.len() - 1];
        assert_relative_eq!(first.x, 0.0);
        assert_relative_eq!(first.y, 0.0);
        assert_relative_eq!(last.x, 1.0);
        assert_relative_eq!(last.y, 1.0);
    }
}
