//! Node placement transforms and their GPU instance format.

use cgmath::{One, SquareMatrix};

use crate::scene::model::Vertex;

/// Position, rotation and scale of one placement of a model.
#[derive(Clone, Debug)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    /// Pack for the GPU. `unlit` sets the flag the model shader uses to skip
    /// shading on self-lit nodes; `emissive` is added to the light term so a
    /// surface can glow on its own.
    pub fn to_raw(&self, unlit: bool, emissive: [f32; 3]) -> InstanceRaw {
        let world_matrix = self.to_matrix();
        InstanceRaw {
            model: world_matrix.into(),
            normal: cgmath::Matrix3::from(self.rotation).into(),
            handedness: world_matrix.determinant().signum(),
            flags: if unlit { 1.0 } else { 0.0 },
            emissive,
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

impl From<cgmath::Vector3<f32>> for Instance {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

/// One entry of a node's instance buffer: world matrix, normal matrix, the
/// handedness sign for mirrored scales, the unlit flag and the emissive
/// color.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
    handedness: f32,
    flags: f32,
    emissive: [f32; 3],
}

impl InstanceRaw {
    // mat4 as four vec4 rows, mat3 as three vec3 rows, two scalars, one vec3.
    const ATTRIBS: [wgpu::VertexAttribute; 10] = wgpu::vertex_attr_array![
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
        8 => Float32x4,
        9 => Float32x3,
        10 => Float32x3,
        11 => Float32x3,
        12 => Float32,
        13 => Float32,
        14 => Float32x3,
    ];
}

impl Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shading_controls_ride_in_the_raw_instance() {
        let green = [0.0, 200.0 / 255.0, 0.0];
        let raw = Instance::new().to_raw(false, green);
        assert_eq!(raw.flags, 0.0);
        assert_eq!(raw.emissive, green);

        let raw = Instance::new().to_raw(true, [0.0; 3]);
        assert_eq!(raw.flags, 1.0);
        assert_eq!(raw.emissive, [0.0; 3]);
    }

    #[test]
    fn attributes_cover_the_whole_stride() {
        let bytes: u64 = InstanceRaw::ATTRIBS
            .iter()
            .map(|a| a.format.size())
            .sum();
        assert_eq!(bytes, std::mem::size_of::<InstanceRaw>() as u64);
    }

    #[test]
    fn mirrored_scale_flips_handedness() {
        let mut instance = Instance::new();
        instance.scale.x = -1.0;
        assert_eq!(instance.to_raw(false, [0.0; 3]).handedness, -1.0);
    }
}
