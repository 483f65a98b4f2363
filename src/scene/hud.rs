//! Screen-space overlay: the caption banner drawn on top of the 3D scene.

use wgpu::util::DeviceExt;

use crate::scene::billboard::QuadVertex;
use crate::scene::texture::Texture;

/// A textured quad in normalized device coordinates, drawn last with depth
/// testing off.
pub struct HudNode {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_indices: u32,
    pub bind_group: wgpu::BindGroup,
}

impl HudNode {
    /// `rect` is (left, top, right, bottom) in NDC (-1..1, y up).
    pub fn new(
        device: &wgpu::Device,
        rect: (f32, f32, f32, f32),
        texture: &Texture,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let (l, t, r, b) = rect;
        let vertices = [
            QuadVertex {
                position: [l, b],
                tex_coords: [0.0, 1.0],
            },
            QuadVertex {
                position: [r, b],
                tex_coords: [1.0, 1.0],
            },
            QuadVertex {
                position: [r, t],
                tex_coords: [1.0, 0.0],
            },
            QuadVertex {
                position: [l, t],
                tex_coords: [0.0, 0.0],
            },
        ];
        let indices: [u32; 6] = [0, 1, 2, 0, 2, 3];
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Hud Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Hud Index Buffer"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
            label: Some("hud_bind_group"),
        });

        Self {
            vertex_buffer,
            index_buffer,
            num_indices: indices.len() as u32,
            bind_group,
        }
    }
}
