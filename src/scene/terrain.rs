//! Heightmap terrain: geometry generation, the walkable heightfield and the
//! GPU node with its base + detail texture pair.

use cgmath::Vector3;
use image::DynamicImage;

use crate::scene::model::{Mesh, ModelVertex};
use crate::scene::primitives::MeshData;
use crate::scene::texture::Texture;

/// The world-space height grid sampled from the heightmap, kept on the CPU
/// so the camera collision responder can stand on the terrain.
#[derive(Clone)]
pub struct Heightfield {
    origin: Vector3<f32>,
    spacing: (f32, f32),
    width: usize,
    depth: usize,
    heights: Vec<f32>,
}

impl Heightfield {
    /// Bilinearly interpolated terrain height at a world x/z position, or
    /// `None` outside the grid.
    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        let fx = (x - self.origin.x) / self.spacing.0;
        let fz = (z - self.origin.z) / self.spacing.1;
        if fx < 0.0 || fz < 0.0 {
            return None;
        }
        let x0 = fx as usize;
        let z0 = fz as usize;
        if x0 + 1 >= self.width || z0 + 1 >= self.depth {
            return None;
        }
        let tx = fx - x0 as f32;
        let tz = fz - z0 as f32;
        let h = |x: usize, z: usize| self.heights[z * self.width + x];
        let top = h(x0, z0) * (1.0 - tx) + h(x0 + 1, z0) * tx;
        let bottom = h(x0, z0 + 1) * (1.0 - tx) + h(x0 + 1, z0 + 1) * tx;
        Some(top * (1.0 - tz) + bottom * tz)
    }
}

/// Build the terrain grid from a heightmap image.
///
/// One vertex per pixel; pixel brightness (0..255) times `scale.y` gives the
/// height, `scale.x`/`scale.z` give the cell size, and `origin` places the
/// grid's first vertex in the world. Texture coordinates span the whole grid
/// once; the detail texture is tiled in the shader.
pub fn from_heightmap(
    img: &DynamicImage,
    scale: Vector3<f32>,
    origin: Vector3<f32>,
) -> (MeshData, Heightfield) {
    let luma = img.to_luma8();
    let width = luma.width() as usize;
    let depth = luma.height() as usize;

    let heights: Vec<f32> = luma
        .pixels()
        .map(|p| origin.y + p.0[0] as f32 * scale.y)
        .collect();
    let h = |x: usize, z: usize| heights[z * width + x];

    let mut vertices = Vec::with_capacity(width * depth);
    for z in 0..depth {
        for x in 0..width {
            // Central differences for the normal, clamped at the borders.
            let xl = h(x.saturating_sub(1), z);
            let xr = h((x + 1).min(width - 1), z);
            let zl = h(x, z.saturating_sub(1));
            let zr = h(x, (z + 1).min(depth - 1));
            let normal = cgmath::InnerSpace::normalize(Vector3::new(
                (xl - xr) / (2.0 * scale.x),
                1.0,
                (zl - zr) / (2.0 * scale.z),
            ));
            vertices.push(ModelVertex {
                position: [
                    origin.x + x as f32 * scale.x,
                    h(x, z),
                    origin.z + z as f32 * scale.z,
                ],
                tex_coords: [
                    x as f32 / (width - 1) as f32,
                    z as f32 / (depth - 1) as f32,
                ],
                normal: normal.into(),
                ..Default::default()
            });
        }
    }

    let mut indices = Vec::with_capacity((width - 1) * (depth - 1) * 6);
    for z in 0..depth - 1 {
        for x in 0..width - 1 {
            let a = (z * width + x) as u32;
            let b = a + width as u32;
            indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }

    let mut data = MeshData { vertices, indices };
    crate::resources::mesh::compute_tangents(&mut data.vertices, &data.indices);

    let heightfield = Heightfield {
        origin,
        spacing: (scale.x, scale.z),
        width,
        depth,
        heights,
    };
    (data, heightfield)
}

/// The terrain as a renderable scene node. It binds its own base + detail
/// texture pair; the terrain pipeline samples both and tiles the detail map.
pub struct TerrainNode {
    pub mesh: Mesh,
    pub bind_group: wgpu::BindGroup,
    pub heightfield: Heightfield,
}

impl TerrainNode {
    pub fn new(
        device: &wgpu::Device,
        mesh_data: MeshData,
        heightfield: Heightfield,
        base_texture: &Texture,
        detail_texture: &Texture,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&base_texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(
                        &base_texture.sampler,
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&detail_texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(
                        &detail_texture.sampler,
                    ),
                },
            ],
            label: Some("terrain_bind_group"),
        });
        let mesh = mesh_data.into_mesh(device, "Terrain", 0);

        Self {
            mesh,
            bind_group,
            heightfield,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn ramp_image() -> DynamicImage {
        // 4x4 ramp: brightness grows with x.
        let mut img = GrayImage::new(4, 4);
        for z in 0..4 {
            for x in 0..4 {
                img.put_pixel(x, z, Luma([(x * 60) as u8]));
            }
        }
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn grid_matches_the_heightmap_resolution() {
        let (data, _) = from_heightmap(
            &ramp_image(),
            Vector3::new(40.0, 4.4, 40.0),
            Vector3::new(0.0, 0.0, 0.0),
        );
        assert_eq!(data.vertices.len(), 16);
        assert_eq!(data.indices.len(), 3 * 3 * 6);
    }

    #[test]
    fn heights_scale_with_pixel_brightness() {
        let (_, field) = from_heightmap(
            &ramp_image(),
            Vector3::new(10.0, 2.0, 10.0),
            Vector3::new(0.0, -400.0, 0.0),
        );
        // Pixel (1, 1) has brightness 60: height = -400 + 60 * 2.
        assert_eq!(field.height_at(10.0, 10.0), Some(-280.0));
        // Halfway between x=1 (60) and x=2 (120) interpolates linearly.
        assert_eq!(field.height_at(15.0, 10.0), Some(-220.0));
    }

    #[test]
    fn sampling_outside_the_grid_returns_none() {
        let (_, field) = from_heightmap(
            &ramp_image(),
            Vector3::new(10.0, 2.0, 10.0),
            Vector3::new(100.0, 0.0, 100.0),
        );
        assert_eq!(field.height_at(0.0, 0.0), None);
        assert_eq!(field.height_at(1000.0, 110.0), None);
        assert!(field.height_at(110.0, 110.0).is_some());
    }
}
