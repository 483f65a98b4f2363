//! Camera-facing quads: light glows and particle sprites share one instance
//! format and one additive pipeline.

use wgpu::util::DeviceExt;

use crate::scene::model::Vertex;
use crate::scene::texture::Texture;

/// Corner of the unit quad every billboard expands in the vertex shader.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
}

impl Vertex for QuadVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Per-billboard instance: world anchor, quad size and a tint. The vertex
/// shader orients the quad along the camera's right/up vectors.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BillboardRaw {
    pub position: [f32; 3],
    pub size: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex for BillboardRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<BillboardRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// The shared unit quad (two triangles, centered on the anchor).
pub struct Quad {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_indices: u32,
}

impl Quad {
    pub fn new(device: &wgpu::Device) -> Self {
        let vertices = [
            QuadVertex {
                position: [-0.5, -0.5],
                tex_coords: [0.0, 1.0],
            },
            QuadVertex {
                position: [0.5, -0.5],
                tex_coords: [1.0, 1.0],
            },
            QuadVertex {
                position: [0.5, 0.5],
                tex_coords: [1.0, 0.0],
            },
            QuadVertex {
                position: [-0.5, 0.5],
                tex_coords: [0.0, 0.0],
            },
        ];
        let indices: [u32; 6] = [0, 1, 2, 0, 2, 3];
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Billboard Quad Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Billboard Quad Index Buffer"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            num_indices: indices.len() as u32,
        }
    }
}

/// A single glow quad attached to a light. The anchor is rewritten each
/// frame so animated lights carry their glow with them.
pub struct BillboardNode {
    pub size: [f32; 2],
    pub instance_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl BillboardNode {
    pub fn new(
        device: &wgpu::Device,
        size: [f32; 2],
        texture: &Texture,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let raw = BillboardRaw {
            position: [0.0; 3],
            size,
            color: [1.0; 4],
        };
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Billboard Instance Buffer"),
            contents: bytemuck::cast_slice(&[raw]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
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
            label: Some("billboard_bind_group"),
        });

        Self {
            size,
            instance_buffer,
            bind_group,
        }
    }

    pub fn move_to(&self, queue: &wgpu::Queue, position: [f32; 3]) {
        let raw = BillboardRaw {
            position,
            size: self.size,
            color: [1.0; 4],
        };
        queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&[raw]));
    }
}
