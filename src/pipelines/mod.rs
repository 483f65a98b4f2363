//! Render pipelines and the bind group layouts they share.
//!
//! Bind group convention for the 3D pipelines: group 0 is the material
//! (textures plus per-material data), group 1 the camera, group 2 the
//! environment (lights, fog, clock).

pub mod basic;
pub mod billboard;
pub mod gui;
pub mod sky;
pub mod terrain;
pub mod water;

/// Every pipeline plus the layouts nodes need to build their bind groups.
pub struct Pipelines {
    /// Diffuse + normal map (basic models); also base + detail (terrain).
    pub material_layout: wgpu::BindGroupLayout,
    pub camera_layout: wgpu::BindGroupLayout,
    pub environment_layout: wgpu::BindGroupLayout,
    /// Two texture layers plus the wave uniform.
    pub water_layout: wgpu::BindGroupLayout,
    /// Single texture + sampler (sky, billboards, HUD).
    pub sprite_layout: wgpu::BindGroupLayout,
    pub basic: wgpu::RenderPipeline,
    pub terrain: wgpu::RenderPipeline,
    pub water: wgpu::RenderPipeline,
    pub sky: wgpu::RenderPipeline,
    pub billboard: wgpu::RenderPipeline,
    pub hud: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> Self {
        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                texture_entry(0),
                sampler_entry(1),
                texture_entry(2),
                sampler_entry(3),
            ],
            label: Some("material_bind_group_layout"),
        });
        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[uniform_entry(0)],
            label: Some("camera_bind_group_layout"),
        });
        let environment_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[uniform_entry(0)],
            label: Some("environment_bind_group_layout"),
        });
        let water_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                texture_entry(0),
                sampler_entry(1),
                texture_entry(2),
                sampler_entry(3),
                uniform_entry(4),
            ],
            label: Some("water_bind_group_layout"),
        });
        let sprite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[texture_entry(0), sampler_entry(1)],
            label: Some("sprite_bind_group_layout"),
        });

        let basic = basic::mk_basic_pipeline(
            device,
            config,
            &material_layout,
            &camera_layout,
            &environment_layout,
        );
        let terrain = terrain::mk_terrain_pipeline(
            device,
            config,
            &material_layout,
            &camera_layout,
            &environment_layout,
        );
        let water = water::mk_water_pipeline(
            device,
            config,
            &water_layout,
            &camera_layout,
            &environment_layout,
        );
        let sky = sky::mk_sky_pipeline(device, config, &sprite_layout, &camera_layout);
        let billboard =
            billboard::mk_billboard_pipeline(device, config, &sprite_layout, &camera_layout);
        let hud = gui::mk_hud_pipeline(device, config, &sprite_layout);

        Self {
            material_layout,
            camera_layout,
            environment_layout,
            water_layout,
            sprite_layout,
            basic,
            terrain,
            water,
            sky,
            billboard,
            hud,
        }
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}
