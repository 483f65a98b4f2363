//! Point lights and the per-frame environment uniform (lights, fog, clock).

use cgmath::Vector3;
use wgpu::util::DeviceExt;

/// Upper bound of point lights the shaders iterate over.
pub const MAX_LIGHTS: usize = 8;

/// A point light in the scene.
///
/// `casts_shadows` is recorded per light but the renderer does not draw
/// shadow volumes; it is kept so scene scripts can flag lights for a future
/// shadow pass.
pub struct Light {
    pub position: Vector3<f32>,
    pub color: [f32; 3],
    pub radius: f32,
    pub casts_shadows: bool,
}

impl Light {
    pub fn new(position: Vector3<f32>, color: [f32; 3], radius: f32) -> Self {
        Self {
            position,
            color,
            radius,
            casts_shadows: false,
        }
    }

    pub fn to_raw(&self) -> LightRaw {
        LightRaw {
            position: self.position.into(),
            radius: self.radius,
            color: self.color,
            _padding: 0.0,
        }
    }
}

/// GPU layout of one light. vec3 fields are padded to 16 bytes in WGSL
/// uniform space, so radius and a trailing pad slot in explicitly.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightRaw {
    position: [f32; 3],
    radius: f32,
    color: [f32; 3],
    _padding: f32,
}

/// Environment uniform bound at group 2 of the 3D pipelines: the light
/// array, fog parameters and the scene clock (used by the water shader).
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalsUniform {
    lights: [LightRaw; MAX_LIGHTS],
    fog_color: [f32; 4],
    light_count: u32,
    fog_density: f32,
    time: f32,
    _padding: u32,
}

impl GlobalsUniform {
    pub fn new(fog_color: [f32; 3], fog_density: f32) -> Self {
        Self {
            lights: [LightRaw::default(); MAX_LIGHTS],
            fog_color: [fog_color[0], fog_color[1], fog_color[2], 1.0],
            light_count: 0,
            fog_density,
            time: 0.0,
            _padding: 0,
        }
    }

    /// Copy up to [`MAX_LIGHTS`] lights into the uniform; extra lights are
    /// ignored.
    pub fn update_lights<'a, I>(&mut self, lights: I)
    where
        I: IntoIterator<Item = &'a Light>,
    {
        let mut count = 0;
        for (slot, light) in self.lights.iter_mut().zip(lights) {
            *slot = light.to_raw();
            count += 1;
        }
        self.light_count = count;
    }

    pub fn update_time(&mut self, time: f32) {
        self.time = time;
    }
}

/// The environment uniform's GPU residency: buffer and bind group (group 2).
pub struct GlobalResources {
    pub uniform: GlobalsUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl GlobalResources {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        fog_color: [f32; 3],
        fog_density: f32,
    ) -> Self {
        let uniform = GlobalsUniform::new(fog_color, fog_density);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Environment Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("environment_bind_group"),
        });

        Self {
            uniform,
            buffer,
            bind_group,
        }
    }

    /// Push the CPU-side uniform to the GPU after mutating it.
    pub fn write(&self, queue: &wgpu::Queue) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_count_is_clamped_to_capacity() {
        let mut uniform = GlobalsUniform::new([0.54, 0.49, 0.32], 0.003);
        let lights: Vec<Light> = (0..12)
            .map(|i| Light::new(Vector3::new(i as f32, 0.0, 0.0), [1.0, 1.0, 1.0], 100.0))
            .collect();
        uniform.update_lights(&lights);
        assert_eq!(uniform.light_count, MAX_LIGHTS as u32);
    }

    #[test]
    fn uniform_size_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<LightRaw>(), 32);
        assert_eq!(std::mem::size_of::<GlobalsUniform>() % 16, 0);
    }
}
