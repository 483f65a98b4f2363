//! Skydome node: drawn first each frame, centered on the camera, no depth
//! write so everything else renders in front of it.

use cgmath::Vector3;
use wgpu::util::DeviceExt;

use crate::scene::instance::Instance;
use crate::scene::model::Mesh;
use crate::scene::primitives::MeshData;
use crate::scene::texture::Texture;

pub struct SkyNode {
    pub mesh: Mesh,
    pub instance_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl SkyNode {
    pub fn new(
        device: &wgpu::Device,
        mesh_data: MeshData,
        texture: &Texture,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
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
            label: Some("sky_bind_group"),
        });
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sky Instance Buffer"),
            contents: bytemuck::cast_slice(&[Instance::new().to_raw(true, [0.0; 3])]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        let mesh = mesh_data.into_mesh(device, "Sky", 0);

        Self {
            mesh,
            instance_buffer,
            bind_group,
        }
    }

    /// Re-center the dome on the camera so it never recedes.
    pub fn follow(&self, queue: &wgpu::Queue, camera_position: Vector3<f32>) {
        let instance = Instance::from(camera_position);
        queue.write_buffer(
            &self.instance_buffer,
            0,
            bytemuck::cast_slice(&[instance.to_raw(true, [0.0; 3])]),
        );
    }
}
