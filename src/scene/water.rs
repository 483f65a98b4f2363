//! Animated water surface: a hill-plane mesh displaced per-vertex in the
//! water shader, blending two texture layers.

use wgpu::util::DeviceExt;

use crate::scene::instance::Instance;
use crate::scene::model::Mesh;
use crate::scene::primitives::MeshData;
use crate::scene::texture::Texture;

/// Wave parameters, bound alongside the two texture layers. The scene clock
/// driving the animation comes from the environment uniform.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct WaveUniform {
    pub height: f32,
    pub speed: f32,
    pub length: f32,
    _padding: f32,
}

impl WaveUniform {
    pub fn new(height: f32, speed: f32, length: f32) -> Self {
        Self {
            height,
            speed,
            length,
            _padding: 0.0,
        }
    }
}

pub struct WaterNode {
    pub mesh: Mesh,
    pub instance: Instance,
    pub instance_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl WaterNode {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: &wgpu::Device,
        mesh_data: MeshData,
        instance: Instance,
        wave: WaveUniform,
        surface_texture: &Texture,
        bed_texture: &Texture,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let wave_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Wave Buffer"),
            contents: bytemuck::cast_slice(&[wave]),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&surface_texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(
                        &surface_texture.sampler,
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&bed_texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(
                        &bed_texture.sampler,
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wave_buffer.as_entire_binding(),
                },
            ],
            label: Some("water_bind_group"),
        });
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Water Instance Buffer"),
            contents: bytemuck::cast_slice(&[instance.to_raw(false, [0.0; 3])]),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let mesh = mesh_data.into_mesh(device, "Water", 0);

        Self {
            mesh,
            instance,
            instance_buffer,
            bind_group,
        }
    }
}
