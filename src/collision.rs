//! Collision selectors and the camera's collision responder.
//!
//! Nodes register a geometry proxy (heightfield, box or triangle list) with
//! the responder; the responder owns it from then on and consults every
//! selector each frame when resolving camera movement.

use cgmath::{ElementWise, InnerSpace, Point3, Vector3};

use crate::scene::terrain::Heightfield;

/// Geometry proxy for one collidable node, in world space.
pub enum Selector {
    /// Terrain grid, supports the camera from below.
    Heightfield(Heightfield),
    /// Axis-aligned box, pushes the camera out along the least-penetrated
    /// axis.
    Aabb {
        min: Vector3<f32>,
        max: Vector3<f32>,
    },
    /// Baked world-space triangles, both support and push-out.
    Triangles(Vec<[[f32; 3]; 3]>),
}

impl Selector {
    /// Box selector from a node's world-space bounds.
    pub fn aabb(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self::Aabb { min, max }
    }

    /// Triangle selector from model-space triangles and a node transform.
    pub fn triangles(
        triangles: &[[[f32; 3]; 3]],
        transform: &crate::scene::instance::Instance,
    ) -> Self {
        let matrix = transform.to_matrix();
        let baked = triangles
            .iter()
            .map(|tri| {
                tri.map(|v| {
                    let p = matrix * cgmath::Vector4::new(v[0], v[1], v[2], 1.0);
                    [p.x, p.y, p.z]
                })
            })
            .collect();
        Self::Triangles(baked)
    }
}

/// Moves the camera ellipsoid through the registered selectors, applying
/// gravity, jumping and ground clamping.
pub struct CollisionResponder {
    pub ellipsoid: Vector3<f32>,
    pub gravity: Vector3<f32>,
    pub eye_offset: Vector3<f32>,
    pub jump_speed: f32,
    selectors: Vec<Selector>,
    vertical_velocity: f32,
    grounded: bool,
}

impl CollisionResponder {
    pub fn new(ellipsoid: Vector3<f32>, gravity: Vector3<f32>, eye_offset: Vector3<f32>) -> Self {
        Self {
            ellipsoid,
            gravity,
            eye_offset,
            jump_speed: 400.0,
            selectors: Vec::new(),
            vertical_velocity: 0.0,
            grounded: false,
        }
    }

    /// Take ownership of a selector; it is consulted every frame from now on.
    pub fn register(&mut self, selector: Selector) {
        self.selectors.push(selector);
    }

    pub fn grounded(&self) -> bool {
        self.grounded
    }

    /// Resolve one frame of movement. `walk` is the controller's desired
    /// horizontal displacement; returns the new ellipsoid center.
    pub fn resolve(
        &mut self,
        position: Point3<f32>,
        walk: Vector3<f32>,
        jump: bool,
        dt: f32,
    ) -> Point3<f32> {
        let mut pos = position + walk;

        if jump && self.grounded {
            self.vertical_velocity = self.jump_speed;
            self.grounded = false;
        }
        self.vertical_velocity += self.gravity.y * dt;
        pos.y += self.vertical_velocity * dt;

        for selector in &self.selectors {
            match selector {
                Selector::Aabb { min, max } => {
                    push_out_of_aabb(&mut pos, *min, *max, self.ellipsoid);
                }
                Selector::Triangles(triangles) => {
                    for tri in triangles {
                        push_out_of_triangle(&mut pos, tri, self.ellipsoid);
                    }
                }
                Selector::Heightfield(_) => {}
            }
        }

        // Ground support: the highest floor under the ellipsoid.
        let mut floor = f32::NEG_INFINITY;
        for selector in &self.selectors {
            match selector {
                Selector::Heightfield(field) => {
                    if let Some(h) = field.height_at(pos.x, pos.z) {
                        floor = floor.max(h + self.ellipsoid.y);
                    }
                }
                Selector::Triangles(triangles) => {
                    for tri in triangles {
                        if let Some(h) = triangle_height_at(tri, pos.x, pos.z) {
                            if h + self.ellipsoid.y <= pos.y + 1.0 {
                                floor = floor.max(h + self.ellipsoid.y);
                            }
                        }
                    }
                }
                Selector::Aabb { .. } => {}
            }
        }

        if pos.y <= floor && self.vertical_velocity <= 0.0 {
            pos.y = floor;
            self.vertical_velocity = 0.0;
            self.grounded = true;
        } else {
            self.grounded = false;
        }

        pos
    }

    /// Where the camera looks from: ellipsoid center plus the eye offset,
    /// halved while crouching.
    pub fn eye_position(&self, center: Point3<f32>, crouching: bool) -> Point3<f32> {
        let offset = if crouching {
            self.eye_offset / 2.0
        } else {
            self.eye_offset
        };
        center + offset
    }
}

/// If the ellipsoid center sits inside the box expanded by the ellipsoid
/// radii, push it out along the axis with the smallest penetration.
fn push_out_of_aabb(pos: &mut Point3<f32>, min: Vector3<f32>, max: Vector3<f32>, radii: Vector3<f32>) {
    let lo = min - radii;
    let hi = max + radii;
    let inside = pos.x > lo.x
        && pos.x < hi.x
        && pos.y > lo.y
        && pos.y < hi.y
        && pos.z > lo.z
        && pos.z < hi.z;
    if !inside {
        return;
    }

    let pushes = [
        (pos.x - lo.x, Vector3::new(-1.0, 0.0, 0.0)),
        (hi.x - pos.x, Vector3::new(1.0, 0.0, 0.0)),
        (pos.y - lo.y, Vector3::new(0.0, -1.0, 0.0)),
        (hi.y - pos.y, Vector3::new(0.0, 1.0, 0.0)),
        (pos.z - lo.z, Vector3::new(0.0, 0.0, -1.0)),
        (hi.z - pos.z, Vector3::new(0.0, 0.0, 1.0)),
    ];
    let (mut depth, mut dir) = pushes[0];
    for &(d, v) in &pushes[1..] {
        if d < depth {
            depth = d;
            dir = v;
        }
    }
    *pos += dir * depth;
}

/// Sphere push-out in ellipsoid space (positions divided by the radii turn
/// the ellipsoid into a unit sphere).
fn push_out_of_triangle(pos: &mut Point3<f32>, tri: &[[f32; 3]; 3], radii: Vector3<f32>) {
    let inv = Vector3::new(1.0 / radii.x, 1.0 / radii.y, 1.0 / radii.z);
    let p = Vector3::new(pos.x, pos.y, pos.z).mul_element_wise(inv);
    let a = Vector3::from(tri[0]).mul_element_wise(inv);
    let b = Vector3::from(tri[1]).mul_element_wise(inv);
    let c = Vector3::from(tri[2]).mul_element_wise(inv);

    let closest = closest_point_on_triangle(p, a, b, c);
    let delta = p - closest;
    let dist = delta.magnitude();
    if dist >= 1.0 || dist <= f32::EPSILON {
        return;
    }
    let corrected = closest + delta / dist;
    *pos = Point3::new(
        corrected.x * radii.x,
        corrected.y * radii.y,
        corrected.z * radii.z,
    );
}

/// Height of the triangle surface at (x, z) if the point lies inside its
/// footprint.
fn triangle_height_at(tri: &[[f32; 3]; 3], x: f32, z: f32) -> Option<f32> {
    let (a, b, c) = (tri[0], tri[1], tri[2]);
    // Barycentric coordinates in the xz plane.
    let det = (b[2] - c[2]) * (a[0] - c[0]) + (c[0] - b[0]) * (a[2] - c[2]);
    if det.abs() <= f32::EPSILON {
        return None;
    }
    let l0 = ((b[2] - c[2]) * (x - c[0]) + (c[0] - b[0]) * (z - c[2])) / det;
    let l1 = ((c[2] - a[2]) * (x - c[0]) + (a[0] - c[0]) * (z - c[2])) / det;
    let l2 = 1.0 - l0 - l1;
    if l0 < 0.0 || l1 < 0.0 || l2 < 0.0 {
        return None;
    }
    Some(l0 * a[1] + l1 * b[1] + l2 * c[1])
}

/// Closest point on triangle abc to p (Ericson, Real-Time Collision
/// Detection 5.1.5).
fn closest_point_on_triangle(
    p: Vector3<f32>,
    a: Vector3<f32>,
    b: Vector3<f32>,
    c: Vector3<f32>,
) -> Vector3<f32> {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return a + ab * (d1 / (d1 - d3));
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return a + ac * (d2 / (d2 - d6));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        return b + (c - b) * ((d4 - d3) / ((d4 - d3) + (d5 - d6)));
    }

    let denom = 1.0 / (va + vb + vc);
    a + ab * (vb * denom) + ac * (vc * denom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::terrain::from_heightmap;
    use image::{DynamicImage, GrayImage, Luma};

    fn responder() -> CollisionResponder {
        CollisionResponder::new(
            Vector3::new(60.0, 100.0, 60.0),
            Vector3::new(0.0, -9.8, 0.0),
            Vector3::new(0.0, 50.0, 0.0),
        )
    }

    fn flat_field(height: u8) -> Heightfield {
        let mut img = GrayImage::new(16, 16);
        for z in 0..16 {
            for x in 0..16 {
                img.put_pixel(x, z, Luma([height]));
            }
        }
        let (_, field) = from_heightmap(
            &DynamicImage::ImageLuma8(img),
            Vector3::new(100.0, 1.0, 100.0),
            Vector3::new(-800.0, 0.0, -800.0),
        );
        field
    }

    #[test]
    fn camera_rests_on_the_heightfield() {
        let mut responder = responder();
        responder.register(Selector::Heightfield(flat_field(100)));
        let mut pos = Point3::new(0.0, 500.0, 0.0);
        for _ in 0..600 {
            pos = responder.resolve(pos, Vector3::new(0.0, 0.0, 0.0), false, 1.0 / 60.0);
        }
        // Ground is 100, ellipsoid half-height is 100.
        assert!((pos.y - 200.0).abs() < 1e-3);
        assert!(responder.grounded());
    }

    #[test]
    fn gravity_accumulates_while_airborne() {
        let mut responder = responder();
        let start = Point3::new(0.0, 10_000.0, 0.0);
        let after_one = responder.resolve(start, Vector3::new(0.0, 0.0, 0.0), false, 1.0);
        let after_two = responder.resolve(after_one, Vector3::new(0.0, 0.0, 0.0), false, 1.0);
        let first_drop = start.y - after_one.y;
        let second_drop = after_one.y - after_two.y;
        assert!(second_drop > first_drop);
        assert!(!responder.grounded());
    }

    #[test]
    fn aabb_push_out_uses_the_least_penetrated_axis() {
        let mut pos = Point3::new(90.0, 0.0, 5.0);
        push_out_of_aabb(
            &mut pos,
            Vector3::new(-100.0, -100.0, -100.0),
            Vector3::new(100.0, 100.0, 100.0),
            Vector3::new(10.0, 10.0, 10.0),
        );
        // Closest face is +x.
        assert_eq!(pos, Point3::new(110.0, 0.0, 5.0));
    }

    #[test]
    fn jump_only_fires_when_grounded() {
        let mut responder = responder();
        responder.register(Selector::Heightfield(flat_field(0)));
        let mut pos = Point3::new(0.0, 100.0, 0.0);
        pos = responder.resolve(pos, Vector3::new(0.0, 0.0, 0.0), false, 1.0 / 60.0);
        assert!(responder.grounded());
        let before = pos.y;
        pos = responder.resolve(pos, Vector3::new(0.0, 0.0, 0.0), true, 1.0 / 60.0);
        assert!(pos.y > before);
        assert!(!responder.grounded());
    }

    #[test]
    fn triangles_support_the_camera_inside_their_footprint() {
        let tri = [[-500.0, 40.0, -500.0], [500.0, 40.0, -500.0], [0.0, 40.0, 500.0]];
        assert_eq!(triangle_height_at(&tri, 0.0, 0.0), Some(40.0));
        assert_eq!(triangle_height_at(&tri, 1000.0, 0.0), None);
    }

    #[test]
    fn crouching_lowers_the_eye() {
        let responder = responder();
        let center = Point3::new(0.0, 200.0, 0.0);
        assert_eq!(responder.eye_position(center, false).y, 250.0);
        assert_eq!(responder.eye_position(center, true).y, 225.0);
    }
}
