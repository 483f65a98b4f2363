//! CPU-side mesh generation for the procedural scene nodes: cubes, spheres,
//! hill planes (water) and the skydome.

use std::f32::consts::PI;

use wgpu::util::DeviceExt;

use crate::resources::mesh::compute_tangents;
use crate::scene::model::{Mesh, ModelVertex};

/// A mesh still on the CPU: vertices and triangle indices.
///
/// Generators return this so the geometry can be unit tested and reused for
/// collision selectors before it is uploaded.
pub struct MeshData {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Upload to GPU buffers. `material` indexes into the owning model's
    /// material list.
    pub fn into_mesh(self, device: &wgpu::Device, name: &str, material: usize) -> Mesh {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Vertex Buffer")),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Index Buffer")),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Mesh {
            name: name.to_string(),
            vertex_buffer,
            index_buffer,
            num_elements: self.indices.len() as u32,
            material,
        }
    }

    /// Model-space triangle list, used to derive collision selectors.
    pub fn triangles(&self) -> Vec<[[f32; 3]; 3]> {
        self.indices
            .chunks(3)
            .map(|c| {
                [
                    self.vertices[c[0] as usize].position,
                    self.vertices[c[1] as usize].position,
                    self.vertices[c[2] as usize].position,
                ]
            })
            .collect()
    }
}

/// Axis-aligned cube centered at the origin, 24 vertices so each face gets
/// its own normal and full texture quad.
pub fn cube(size: f32) -> MeshData {
    let h = size / 2.0;
    // (normal, four corners in CCW order seen from outside)
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        (
            [0.0, 0.0, 1.0],
            [[-h, -h, h], [h, -h, h], [h, h, h], [-h, h, h]],
        ),
        (
            [0.0, 0.0, -1.0],
            [[h, -h, -h], [-h, -h, -h], [-h, h, -h], [h, h, -h]],
        ),
        (
            [1.0, 0.0, 0.0],
            [[h, -h, h], [h, -h, -h], [h, h, -h], [h, h, h]],
        ),
        (
            [-1.0, 0.0, 0.0],
            [[-h, -h, -h], [-h, -h, h], [-h, h, h], [-h, h, -h]],
        ),
        (
            [0.0, 1.0, 0.0],
            [[-h, h, h], [h, h, h], [h, h, -h], [-h, h, -h]],
        ),
        (
            [0.0, -1.0, 0.0],
            [[-h, -h, -h], [h, -h, -h], [h, -h, h], [-h, -h, h]],
        ),
    ];
    let uvs = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, corners) in faces {
        let base = vertices.len() as u32;
        for (corner, uv) in corners.iter().zip(uvs) {
            vertices.push(ModelVertex {
                position: *corner,
                tex_coords: uv,
                normal,
                ..Default::default()
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    compute_tangents(&mut vertices, &indices);
    MeshData { vertices, indices }
}

/// UV sphere centered at the origin. `tex_repeat` tiles the texture across
/// the surface (the moon texture is tiled 8x in the scene).
pub fn uv_sphere(radius: f32, segments: u32, rings: u32, tex_repeat: f32) -> MeshData {
    let mut vertices = Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);
    for ring in 0..=rings {
        let v = ring as f32 / rings as f32;
        let phi = v * PI;
        for segment in 0..=segments {
            let u = segment as f32 / segments as f32;
            let theta = u * 2.0 * PI;
            let normal = [phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin()];
            vertices.push(ModelVertex {
                position: [normal[0] * radius, normal[1] * radius, normal[2] * radius],
                tex_coords: [u * tex_repeat, v * tex_repeat],
                normal,
                ..Default::default()
            });
        }
    }

    let stride = segments + 1;
    let mut indices = Vec::with_capacity((segments * rings * 6) as usize);
    for ring in 0..rings {
        for segment in 0..segments {
            let a = ring * stride + segment;
            let b = a + stride;
            indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }
    compute_tangents(&mut vertices, &indices);
    MeshData { vertices, indices }
}

/// Flat tiled plane centered at the origin (y = 0, normal up). The water
/// surface displaces it per-vertex in the vertex shader.
///
/// * `tile_size` is the world size of one grid cell
/// * `tile_count` is the number of cells in x/z
/// * `tex_repeat` is how often the texture repeats over the whole plane
pub fn hill_plane(tile_size: (f32, f32), tile_count: (u32, u32), tex_repeat: (f32, f32)) -> MeshData {
    let (tw, th) = tile_size;
    let (cx, cz) = tile_count;
    let half_w = tw * cx as f32 / 2.0;
    let half_d = th * cz as f32 / 2.0;

    let mut vertices = Vec::with_capacity(((cx + 1) * (cz + 1)) as usize);
    for z in 0..=cz {
        for x in 0..=cx {
            let fx = x as f32 / cx as f32;
            let fz = z as f32 / cz as f32;
            vertices.push(ModelVertex {
                position: [fx * 2.0 * half_w - half_w, 0.0, fz * 2.0 * half_d - half_d],
                tex_coords: [fx * tex_repeat.0, fz * tex_repeat.1],
                normal: [0.0, 1.0, 0.0],
                ..Default::default()
            });
        }
    }

    let stride = cx + 1;
    let mut indices = Vec::with_capacity((cx * cz * 6) as usize);
    for z in 0..cz {
        for x in 0..cx {
            let a = z * stride + x;
            let b = a + stride;
            indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }
    compute_tangents(&mut vertices, &indices);
    MeshData { vertices, indices }
}

/// Skydome: a partial sphere viewed from the inside.
///
/// * `horizontal_res` / `vertical_res` are the segment counts
/// * `texture_pct` is how much of the texture's height maps onto the dome
/// * `sphere_pct` is how much of a half sphere the dome spans (2.0 closes it
///   to a full sphere)
pub fn dome(
    radius: f32,
    horizontal_res: u32,
    vertical_res: u32,
    texture_pct: f32,
    sphere_pct: f32,
) -> MeshData {
    let az_step = 2.0 * PI / horizontal_res as f32;
    let el_step = (sphere_pct * PI / 2.0).min(PI) / vertical_res as f32;

    let mut vertices = Vec::with_capacity(((horizontal_res + 1) * (vertical_res + 1)) as usize);
    for v in 0..=vertical_res {
        let elevation = v as f32 * el_step;
        for h in 0..=horizontal_res {
            let azimuth = h as f32 * az_step;
            let position = [
                radius * elevation.sin() * azimuth.cos(),
                radius * elevation.cos(),
                radius * elevation.sin() * azimuth.sin(),
            ];
            vertices.push(ModelVertex {
                position,
                tex_coords: [
                    h as f32 / horizontal_res as f32,
                    v as f32 / vertical_res as f32 * texture_pct,
                ],
                // Inward-facing: viewers sit inside the dome.
                normal: [
                    -position[0] / radius,
                    -position[1] / radius,
                    -position[2] / radius,
                ],
                ..Default::default()
            });
        }
    }

    let stride = horizontal_res + 1;
    let mut indices = Vec::with_capacity((horizontal_res * vertical_res * 6) as usize);
    for v in 0..vertical_res {
        for h in 0..horizontal_res {
            let a = v * stride + h;
            let b = a + stride;
            // Reversed winding so the inside is the front face.
            indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
        }
    }
    compute_tangents(&mut vertices, &indices);
    MeshData { vertices, indices }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_six_independent_faces() {
        let data = cube(10.0);
        assert_eq!(data.vertices.len(), 24);
        assert_eq!(data.indices.len(), 36);
        for v in &data.vertices {
            for c in v.position {
                assert!(c.abs() <= 5.0 + f32::EPSILON);
            }
        }
        assert_eq!(data.triangles().len(), 12);
    }

    #[test]
    fn sphere_vertices_lie_on_the_radius() {
        let radius = 760.0;
        let data = uv_sphere(radius, 32, 16, 8.0);
        assert_eq!(data.vertices.len(), 33 * 17);
        for v in &data.vertices {
            let len = (v.position[0].powi(2) + v.position[1].powi(2) + v.position[2].powi(2)).sqrt();
            assert!((len - radius).abs() < radius * 1e-4);
        }
    }

    #[test]
    fn hill_plane_is_flat_and_centered() {
        let data = hill_plane((20.0, 20.0), (60, 60), (10.0, 10.0));
        assert_eq!(data.vertices.len(), 61 * 61);
        assert_eq!(data.indices.len(), 60 * 60 * 6);
        let mut min_x = f32::MAX;
        let mut max_x = f32::MIN;
        for v in &data.vertices {
            assert_eq!(v.position[1], 0.0);
            min_x = min_x.min(v.position[0]);
            max_x = max_x.max(v.position[0]);
        }
        assert_eq!(min_x, -600.0);
        assert_eq!(max_x, 600.0);
        // Texture repeats ten times over the full plane.
        let last = data.vertices.last().unwrap();
        assert_eq!(last.tex_coords, [10.0, 10.0]);
    }

    #[test]
    fn dome_spans_the_configured_sphere_fraction() {
        let data = dome(1000.0, 16, 8, 0.95, 2.0);
        assert_eq!(data.vertices.len(), 17 * 9);
        // sphere_pct 2.0 closes the dome: the last ring reaches the south pole.
        let bottom = &data.vertices[data.vertices.len() - 1];
        assert!((bottom.position[1] + 1000.0).abs() < 1.0);
        // Texture percentage caps the v coordinate.
        assert!(data
            .vertices
            .iter()
            .all(|v| v.tex_coords[1] <= 0.95 + f32::EPSILON));
    }
}
