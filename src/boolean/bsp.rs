use crate::math::{Point3, Vector2, Vector3};

/// Classification tolerance for point-vs-plane tests. Looser than the
/// geometric tolerance on purpose: slivers thinner than this are absorbed
/// into the plane rather than split into degenerate fragments.
pub const BSP_EPSILON: f64 = 1e-5;

const COPLANAR: u8 = 0;
const FRONT: u8 = 1;
const BACK: u8 = 2;
const SPANNING: u8 = 3;

/// Mesh vertex carried through splits; attributes interpolate linearly.
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    pub pos: Point3,
    pub normal: Vector3,
    pub uv: crate::math::Point2,
}

impl Vertex {
    fn flip(&mut self) {
        self.normal = -self.normal;
    }

    fn lerp(&self, other: &Self, t: f64) -> Self {
        Self {
            pos: self.pos + (other.pos - self.pos) * t,
            normal: self.normal + (other.normal - self.normal) * t,
            uv: self.uv + (Vector2::new(other.uv.x - self.uv.x, other.uv.y - self.uv.y)) * t,
        }
    }
}

/// Oriented plane in `normal · p = w` form.
#[derive(Debug, Clone, Copy)]
struct Plane {
    normal: Vector3,
    w: f64,
}

impl Plane {
    fn from_points(a: &Point3, b: &Point3, c: &Point3) -> Option<Self> {
        let n = (b - a).cross(&(c - a));
        let len = n.norm();
        if len < BSP_EPSILON * BSP_EPSILON {
            return None;
        }
        let normal = n / len;
        Some(Self {
            normal,
            w: normal.dot(&a.coords),
        })
    }

    fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }

    /// Splits `polygon` by this plane, distributing the pieces into the
    /// four output lists.
    fn split_polygon(
        &self,
        polygon: &Polygon,
        coplanar_front: &mut Vec<Polygon>,
        coplanar_back: &mut Vec<Polygon>,
        front: &mut Vec<Polygon>,
        back: &mut Vec<Polygon>,
    ) {
        let mut polygon_type = COPLANAR;
        let mut types = Vec::with_capacity(polygon.vertices.len());
        for v in &polygon.vertices {
            let t = self.normal.dot(&v.pos.coords) - self.w;
            let ty = if t < -BSP_EPSILON {
                BACK
            } else if t > BSP_EPSILON {
                FRONT
            } else {
                COPLANAR
            };
            polygon_type |= ty;
            types.push(ty);
        }

        match polygon_type {
            COPLANAR => {
                if self.normal.dot(&polygon.plane.normal) > 0.0 {
                    coplanar_front.push(polygon.clone());
                } else {
                    coplanar_back.push(polygon.clone());
                }
            }
            FRONT => front.push(polygon.clone()),
            BACK => back.push(polygon.clone()),
            _ => {
                let mut f: Vec<Vertex> = Vec::new();
                let mut b: Vec<Vertex> = Vec::new();
                let n = polygon.vertices.len();
                for i in 0..n {
                    let j = (i + 1) % n;
                    let ti = types[i];
                    let tj = types[j];
                    let vi = polygon.vertices[i];
                    let vj = polygon.vertices[j];
                    if ti != BACK {
                        f.push(vi);
                    }
                    if ti != FRONT {
                        b.push(vi);
                    }
                    if (ti | tj) == SPANNING {
                        let denom = self.normal.dot(&(vj.pos - vi.pos));
                        let t = (self.w - self.normal.dot(&vi.pos.coords)) / denom;
                        let v = vi.lerp(&vj, t);
                        f.push(v);
                        b.push(v);
                    }
                }
                if f.len() >= 3 {
                    if let Some(p) = Polygon::new(f) {
                        front.push(p);
                    }
                }
                if b.len() >= 3 {
                    if let Some(p) = Polygon::new(b) {
                        back.push(p);
                    }
                }
            }
        }
    }
}

/// Convex planar polygon; the building block the tree clips and returns.
#[derive(Debug, Clone)]
pub struct Polygon {
    pub vertices: Vec<Vertex>,
    plane: Plane,
}

impl Polygon {
    /// Builds a polygon from at least three vertices; returns `None` when
    /// the points are collinear within tolerance.
    pub fn new(vertices: Vec<Vertex>) -> Option<Self> {
        let plane = Plane::from_points(
            &vertices.first()?.pos,
            &vertices.get(1)?.pos,
            &vertices.get(2)?.pos,
        )?;
        Some(Self { vertices, plane })
    }

    fn flip(&mut self) {
        self.vertices.reverse();
        for v in &mut self.vertices {
            v.flip();
        }
        self.plane.flip();
    }
}

/// Node of a solid BSP tree over boundary polygons.
#[derive(Debug, Default)]
pub struct Node {
    plane: Option<Plane>,
    front: Option<Box<Node>>,
    back: Option<Box<Node>>,
    polygons: Vec<Polygon>,
}

impl Node {
    #[must_use]
    pub fn new(polygons: Vec<Polygon>) -> Self {
        let mut node = Self::default();
        node.build(polygons);
        node
    }

    /// Converts the solid to its complement.
    pub fn invert(&mut self) {
        for p in &mut self.polygons {
            p.flip();
        }
        if let Some(plane) = &mut self.plane {
            plane.flip();
        }
        if let Some(front) = &mut self.front {
            front.invert();
        }
        if let Some(back) = &mut self.back {
            back.invert();
        }
        std::mem::swap(&mut self.front, &mut self.back);
    }

    /// Removes the parts of `polygons` inside this solid.
    fn clip_polygons(&self, polygons: Vec<Polygon>) -> Vec<Polygon> {
        let Some(plane) = &self.plane else {
            return polygons;
        };

        let mut front = Vec::new();
        let mut back = Vec::new();
        let mut coplanar_front = Vec::new();
        let mut coplanar_back = Vec::new();
        for polygon in &polygons {
            plane.split_polygon(
                polygon,
                &mut coplanar_front,
                &mut coplanar_back,
                &mut front,
                &mut back,
            );
        }
        // Coplanar pieces follow the half-space their normal faces.
        front.extend(coplanar_front);
        back.extend(coplanar_back);

        let mut front = match &self.front {
            Some(node) => node.clip_polygons(front),
            None => front,
        };
        let back = match &self.back {
            Some(node) => node.clip_polygons(back),
            // No back subtree means the back half-space is inside the solid.
            None => Vec::new(),
        };

        front.extend(back);
        front
    }

    /// Removes the parts of this solid inside `other`.
    pub fn clip_to(&mut self, other: &Self) {
        self.polygons = other.clip_polygons(std::mem::take(&mut self.polygons));
        if let Some(front) = &mut self.front {
            front.clip_to(other);
        }
        if let Some(back) = &mut self.back {
            back.clip_to(other);
        }
    }

    /// Collects every polygon in the tree.
    #[must_use]
    pub fn all_polygons(&self) -> Vec<Polygon> {
        let mut result = self.polygons.clone();
        if let Some(front) = &self.front {
            result.extend(front.all_polygons());
        }
        if let Some(back) = &self.back {
            result.extend(back.all_polygons());
        }
        result
    }

    /// Inserts polygons into the tree, splitting them as needed. The first
    /// polygon's plane seeds a fresh node.
    pub fn build(&mut self, polygons: Vec<Polygon>) {
        if polygons.is_empty() {
            return;
        }
        if self.plane.is_none() {
            self.plane = Some(polygons[0].plane);
        }
        // Checked above.
        let Some(plane) = self.plane else { return };

        let mut front = Vec::new();
        let mut back = Vec::new();
        let mut coplanar_front = Vec::new();
        let mut coplanar_back = Vec::new();
        for polygon in &polygons {
            plane.split_polygon(
                polygon,
                &mut coplanar_front,
                &mut coplanar_back,
                &mut front,
                &mut back,
            );
        }
        self.polygons.extend(coplanar_front);
        self.polygons.extend(coplanar_back);

        if !front.is_empty() {
            self.front
                .get_or_insert_with(Box::default)
                .build(front);
        }
        if !back.is_empty() {
            self.back.get_or_insert_with(Box::default).build(back);
        }
    }
}

/// `base − tool` over BSP trees. Consumes both trees and returns the
/// boundary polygons of the difference.
#[must_use]
pub fn subtract(mut a: Node, mut b: Node) -> Vec<Polygon> {
    a.invert();
    a.clip_to(&b);
    b.clip_to(&a);
    b.invert();
    b.clip_to(&a);
    b.invert();
    a.build(b.all_polygons());
    a.invert();
    a.all_polygons()
}

/// `base ∪ tool`.
#[must_use]
pub fn union(mut a: Node, mut b: Node) -> Vec<Polygon> {
    a.clip_to(&b);
    b.clip_to(&a);
    b.invert();
    b.clip_to(&a);
    b.invert();
    a.build(b.all_polygons());
    a.all_polygons()
}

/// `base ∩ tool`.
#[must_use]
pub fn intersect(mut a: Node, mut b: Node) -> Vec<Polygon> {
    a.invert();
    b.clip_to(&a);
    b.invert();
    a.clip_to(&b);
    b.clip_to(&a);
    a.build(b.all_polygons());
    a.invert();
    a.all_polygons()
}
