use crate::error::{RaycastError, Result};
use crate::math::{Matrix4, Point3, Vector3, TOLERANCE};
use crate::solid::Aabb;
use crate::surface::{SurfaceId, SurfaceSet};

/// A ray in world space with a unit direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point3,
    pub direction: Vector3,
}

impl Ray {
    /// Builds a picking ray from a pointer position in normalized device
    /// coordinates (`-1.0..=1.0` on both axes, y up).
    ///
    /// # Errors
    ///
    /// Returns [`RaycastError::NonInvertibleCamera`] if the combined camera
    /// matrix cannot be inverted (degenerate projection).
    pub fn from_pointer(ndc_x: f64, ndc_y: f64, view: &Matrix4, projection: &Matrix4) -> Result<Ray> {
        let inverse = (projection * view)
            .try_inverse()
            .ok_or(RaycastError::NonInvertibleCamera)?;

        let near = inverse.transform_point(&Point3::new(ndc_x, ndc_y, -1.0));
        let far = inverse.transform_point(&Point3::new(ndc_x, ndc_y, 1.0));
        let direction = (far - near).normalize();
        Ok(Ray {
            origin: near,
            direction,
        })
    }
}

/// Successful surface pick.
#[derive(Debug, Clone, Copy)]
pub struct Hit {
    pub surface: SurfaceId,
    pub point: Point3,
    pub t: f64,
}

/// Möller–Trumbore ray-triangle intersection, both-sided.
///
/// Returns the ray parameter of the hit, or `None` for a miss or a hit
/// behind the origin.
#[must_use]
pub fn ray_triangle(ray: &Ray, a: &Point3, b: &Point3, c: &Point3) -> Option<f64> {
    let ab = b - a;
    let ac = c - a;
    let pvec = ray.direction.cross(&ac);
    let det = ab.dot(&pvec);
    if det.abs() < TOLERANCE {
        return None;
    }
    let inv_det = 1.0 / det;

    let tvec = ray.origin - a;
    let u = tvec.dot(&pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let qvec = tvec.cross(&ab);
    let v = ray.direction.dot(&qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = ac.dot(&qvec) * inv_det;
    (t > TOLERANCE).then_some(t)
}

/// Slab test against an AABB; cheap reject before triangle tests.
#[must_use]
pub fn ray_intersects_aabb(ray: &Ray, aabb: &Aabb) -> bool {
    let mut t_min = f64::NEG_INFINITY;
    let mut t_max = f64::INFINITY;

    for axis in 0..3 {
        let origin = ray.origin[axis];
        let dir = ray.direction[axis];
        let (lo, hi) = (aabb.min[axis], aabb.max[axis]);
        if dir.abs() < TOLERANCE {
            if origin < lo || origin > hi {
                return false;
            }
            continue;
        }
        let inv = 1.0 / dir;
        let (t0, t1) = if inv >= 0.0 {
            ((lo - origin) * inv, (hi - origin) * inv)
        } else {
            ((hi - origin) * inv, (lo - origin) * inv)
        };
        t_min = t_min.max(t0);
        t_max = t_max.min(t1);
        if t_min > t_max {
            return false;
        }
    }
    t_max >= 0.0
}

/// Finds the closest surface hit along `ray`, testing displaced geometry.
///
/// Every surface's bent AABB is tried first; the nearest triangle
/// intersection across all surviving surfaces wins.
#[must_use]
pub fn pick(surfaces: &SurfaceSet, ray: &Ray) -> Option<Hit> {
    let mut best: Option<Hit> = None;

    for (id, surface) in surfaces.iter() {
        if !ray_intersects_aabb(ray, surface.displaced_bounds()) {
            continue;
        }
        for tri in &surface.mesh().indices {
            let a = surface.displaced_vertex(tri[0] as usize);
            let b = surface.displaced_vertex(tri[1] as usize);
            let c = surface.displaced_vertex(tri[2] as usize);
            if let Some(t) = ray_triangle(ray, &a, &b, &c) {
                if best.is_none_or(|h| t < h.t) {
                    best = Some(Hit {
                        surface: id,
                        point: ray.origin + ray.direction * t,
                        t,
                    });
                }
            }
        }
    }
    best
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn down_z() -> Ray {
        Ray {
            origin: Point3::new(0.25, 0.25, 5.0),
            direction: Vector3::new(0.0, 0.0, -1.0),
        }
    }

    #[test]
    fn ray_hits_facing_triangle() {
        let t = ray_triangle(
            &down_z(),
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 1.0, 0.0),
        )
        .unwrap();
        assert_relative_eq!(t, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn ray_misses_outside_triangle() {
        let ray = Ray {
            origin: Point3::new(2.0, 2.0, 5.0),
            direction: Vector3::new(0.0, 0.0, -1.0),
        };
        assert!(ray_triangle(
            &ray,
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 1.0, 0.0),
        )
        .is_none());
    }

    #[test]
    fn hit_behind_origin_is_ignored() {
        let ray = Ray {
            origin: Point3::new(0.25, 0.25, -5.0),
            direction: Vector3::new(0.0, 0.0, -1.0),
        };
        assert!(ray_triangle(
            &ray,
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 1.0, 0.0),
        )
        .is_none());
    }

    #[test]
    fn backface_hits_are_reported() {
        // Same triangle, ray coming from below.
        let ray = Ray {
            origin: Point3::new(0.25, 0.25, -5.0),
            direction: Vector3::new(0.0, 0.0, 1.0),
        };
        assert!(ray_triangle(
            &ray,
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 1.0, 0.0),
        )
        .is_some());
    }

    #[test]
    fn aabb_slab_test() {
        let aabb = Aabb {
            min: Point3::new(-1.0, -1.0, -1.0),
            max: Point3::new(1.0, 1.0, 1.0),
        };
        assert!(ray_intersects_aabb(&down_z(), &aabb));
        let miss = Ray {
            origin: Point3::new(5.0, 5.0, 5.0),
            direction: Vector3::new(0.0, 0.0, -1.0),
        };
        assert!(!ray_intersects_aabb(&miss, &aabb));
    }

    #[test]
    fn pointer_ray_points_into_the_scene() {
        // Simple perspective camera at +Z looking toward -Z.
        let view = Matrix4::look_at_rh(
            &Point3::new(0.0, 0.0, 10.0),
            &Point3::origin(),
            &Vector3::y(),
        );
        let projection = Matrix4::new_perspective(1.0, std::f64::consts::FRAC_PI_3, 0.1, 100.0);
        let ray = Ray::from_pointer(0.0, 0.0, &view, &projection).unwrap();
        assert!(ray.direction.z < -0.9);
        assert_relative_eq!(ray.direction.norm(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn singular_camera_errors() {
        let zeros = Matrix4::zeros();
        assert!(Ray::from_pointer(0.0, 0.0, &zeros, &zeros).is_err());
    }
}
