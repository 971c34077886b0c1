use slotmap::SlotMap;

use crate::asset::MimeType;
use crate::conformal::{displace, ConformalSurfaceParams, DecalTexture};
use crate::error::Result;
use crate::math::Point3;
use crate::raycast::{pick, Ray};
use crate::solid::{Aabb, Solid};

slotmap::new_key_type! {
    /// Stable handle to a decal surface in a [`SurfaceSet`].
    pub struct SurfaceId;
}

/// A flat decal mesh bent onto the curved target surface.
///
/// Bending parameters are fixed at construction, so the displaced geometry
/// is computed once and reused for every pick. The texture and glow state
/// are the mutable parts.
#[derive(Debug)]
pub struct ConformalSurface {
    mesh: Solid,
    params: ConformalSurfaceParams,
    displaced: Vec<Point3>,
    displaced_bounds: Aabb,
    texture: Option<DecalTexture>,
    glow_intensity: f64,
}

impl ConformalSurface {
    /// Bends `mesh` with `params` and caches the result.
    #[must_use]
    pub fn new(mesh: Solid, params: ConformalSurfaceParams) -> Self {
        let displaced: Vec<Point3> = mesh.vertices.iter().map(|v| displace(v, &params)).collect();
        let displaced_bounds = Aabb::from_points(&displaced).unwrap_or(Aabb {
            min: Point3::origin(),
            max: Point3::origin(),
        });
        Self {
            mesh,
            params,
            displaced,
            displaced_bounds,
            texture: None,
            glow_intensity: 0.0,
        }
    }

    #[must_use]
    pub fn mesh(&self) -> &Solid {
        &self.mesh
    }

    #[must_use]
    pub fn params(&self) -> &ConformalSurfaceParams {
        &self.params
    }

    /// Bent position of vertex `i`.
    #[must_use]
    pub fn displaced_vertex(&self, i: usize) -> Point3 {
        self.displaced[i]
    }

    /// Bounding box of the bent geometry.
    #[must_use]
    pub fn displaced_bounds(&self) -> &Aabb {
        &self.displaced_bounds
    }

    #[must_use]
    pub fn texture(&self) -> Option<&DecalTexture> {
        self.texture.as_ref()
    }

    /// Installs a new decal texture, returning the one it replaces so the
    /// caller can release its GPU copy after the swap.
    pub fn set_texture(&mut self, texture: DecalTexture) -> Option<DecalTexture> {
        self.texture.replace(texture)
    }

    #[must_use]
    pub fn glow_intensity(&self) -> f64 {
        self.glow_intensity
    }

    pub fn set_glow_intensity(&mut self, glow: f64) {
        self.glow_intensity = glow.clamp(0.0, 1.0);
    }
}

/// Where a hover ray currently points. Valid only for the frame it was
/// computed in.
#[derive(Debug, Clone, Copy)]
pub struct HoverState {
    pub ray: Ray,
    pub hit: Option<(SurfaceId, Point3)>,
}

/// An accepted drop: which surface takes the payload, and as what type.
#[derive(Debug, Clone, Copy)]
pub struct DropAccept {
    pub surface: SurfaceId,
    pub point: Point3,
    pub mime: MimeType,
}

/// Arena of decal surfaces plus the interaction state over them.
#[derive(Debug, Default)]
pub struct SurfaceSet {
    surfaces: SlotMap<SurfaceId, ConformalSurface>,
}

impl SurfaceSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, surface: ConformalSurface) -> SurfaceId {
        self.surfaces.insert(surface)
    }

    #[must_use]
    pub fn get(&self, id: SurfaceId) -> Option<&ConformalSurface> {
        self.surfaces.get(id)
    }

    pub fn get_mut(&mut self, id: SurfaceId) -> Option<&mut ConformalSurface> {
        self.surfaces.get_mut(id)
    }

    pub fn remove(&mut self, id: SurfaceId) -> Option<ConformalSurface> {
        self.surfaces.remove(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SurfaceId, &ConformalSurface)> {
        self.surfaces.iter()
    }

    /// Updates hover glow from a pointer ray: the surface under the pointer
    /// lights up, every other surface goes dark.
    pub fn update_hover(&mut self, ray: &Ray) -> HoverState {
        let hit = pick(self, ray);
        for (_, surface) in self.surfaces.iter_mut() {
            surface.set_glow_intensity(0.0);
        }
        if let Some(h) = hit {
            if let Some(surface) = self.surfaces.get_mut(h.surface) {
                surface.set_glow_intensity(1.0);
            }
        }
        HoverState {
            ray: *ray,
            hit: hit.map(|h| (h.surface, h.point)),
        }
    }

    /// Routes a drop: the declared MIME type is validated before any
    /// geometry test, then the payload goes to the surface under the
    /// pointer (or nowhere, if the drop misses).
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::AssetError::UnsupportedFileType`] for a
    /// declared type outside the allow-list, even when the drop would miss.
    pub fn route_drop(&self, declared_mime: &str, ray: &Ray) -> Result<Option<DropAccept>> {
        let mime = MimeType::from_declared(declared_mime)?;
        Ok(pick(self, ray).map(|h| DropAccept {
            surface: h.surface,
            point: h.point,
            mime,
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::creation::MakePlane;
    use crate::math::Vector3;

    fn flat_params() -> ConformalSurfaceParams {
        ConformalSurfaceParams {
            enabled: false,
            ..ConformalSurfaceParams::default()
        }
    }

    fn plane_at(z: f64) -> ConformalSurface {
        let mut mesh = MakePlane::new(2.0, 2.0, 1).execute().unwrap();
        mesh.translate(Vector3::new(0.0, 0.0, z));
        ConformalSurface::new(mesh, flat_params())
    }

    fn ray_down_z() -> Ray {
        Ray {
            origin: Point3::new(0.1, 0.1, 10.0),
            direction: Vector3::new(0.0, 0.0, -1.0),
        }
    }

    #[test]
    fn hover_lights_the_closest_surface_only() {
        let mut set = SurfaceSet::new();
        let near = set.add(plane_at(5.0));
        let far = set.add(plane_at(0.0));

        let state = set.update_hover(&ray_down_z());
        let (hit_id, point) = state.hit.unwrap();
        assert_eq!(hit_id, near);
        approx::assert_relative_eq!(point.z, 5.0, epsilon = 1e-9);
        approx::assert_relative_eq!(set.get(near).unwrap().glow_intensity(), 1.0);
        approx::assert_relative_eq!(set.get(far).unwrap().glow_intensity(), 0.0);
    }

    #[test]
    fn hover_miss_clears_all_glow() {
        let mut set = SurfaceSet::new();
        let id = set.add(plane_at(0.0));
        set.get_mut(id).unwrap().set_glow_intensity(1.0);

        let miss = Ray {
            origin: Point3::new(50.0, 50.0, 10.0),
            direction: Vector3::new(0.0, 0.0, -1.0),
        };
        let state = set.update_hover(&miss);
        assert!(state.hit.is_none());
        approx::assert_relative_eq!(set.get(id).unwrap().glow_intensity(), 0.0);
    }

    #[test]
    fn drop_with_bad_mime_fails_before_picking() {
        let mut set = SurfaceSet::new();
        set.add(plane_at(0.0));
        assert!(set.route_drop("image/jpeg", &ray_down_z()).is_err());
    }

    #[test]
    fn drop_routes_to_surface_under_pointer() {
        let mut set = SurfaceSet::new();
        let id = set.add(plane_at(0.0));
        let accept = set.route_drop("image/png", &ray_down_z()).unwrap().unwrap();
        assert_eq!(accept.surface, id);
        assert_eq!(accept.mime, MimeType::Png);
    }

    #[test]
    fn drop_missing_all_surfaces_is_none() {
        let mut set = SurfaceSet::new();
        set.add(plane_at(0.0));
        let miss = Ray {
            origin: Point3::new(50.0, 50.0, 10.0),
            direction: Vector3::new(0.0, 0.0, -1.0),
        };
        assert!(set.route_drop("image/png", &miss).unwrap().is_none());
    }

    #[test]
    fn bent_surface_is_picked_at_its_displaced_position() {
        // Enabled bending pulls the plane's off-axis area toward -Z; the
        // cached bounds must reflect that.
        let mesh = MakePlane::new(10.0, 10.0, 8).execute().unwrap();
        let params = ConformalSurfaceParams {
            radius_x: 5.0,
            strength_x: 1.0,
            ..ConformalSurfaceParams::default()
        };
        let surface = ConformalSurface::new(mesh, params);
        assert!(surface.displaced_bounds().min.z < -0.5);
    }

    #[test]
    fn set_texture_returns_replaced() {
        let mut surface = plane_at(0.0);
        let a = DecalTexture::from_rgba(vec![0, 0, 0, 255], 1, 1).unwrap();
        let b = DecalTexture::from_rgba(vec![255, 255, 255, 255], 1, 1).unwrap();
        assert!(surface.set_texture(a).is_none());
        let replaced = surface.set_texture(b).unwrap();
        assert_eq!(replaced.width(), 1);
    }
}
