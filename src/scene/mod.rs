//! The scene arena: every node the demo renders, owned in one place and torn
//! down in bulk when the scene drops.

pub mod billboard;
pub mod hud;
pub mod instance;
pub mod lights;
pub mod model;
pub mod particles;
pub mod primitives;
pub mod sky;
pub mod terrain;
pub mod texture;
pub mod water;

use cgmath::Vector3;
use wgpu::util::DeviceExt;

use crate::animator::Animator;
use crate::scene::billboard::{BillboardNode, Quad};
use crate::scene::hud::HudNode;
use crate::scene::instance::Instance;
use crate::scene::lights::{GlobalResources, Light, MAX_LIGHTS};
use crate::scene::model::Model;
use crate::scene::particles::ParticleSystem;
use crate::scene::sky::SkyNode;
use crate::scene::terrain::TerrainNode;
use crate::scene::water::WaterNode;

/// A renderable model with one or more placements. Animated placements get
/// their buffer rewritten each frame; static ones are uploaded once.
pub struct Node {
    pub name: String,
    pub model: Model,
    pub instances: Vec<Instance>,
    /// Parallel to `instances`; `None` entries never move.
    pub animators: Vec<Option<Animator>>,
    pub instance_buffer: wgpu::Buffer,
    pub unlit: bool,
    pub emissive: [f32; 3],
    animated: bool,
}

impl Node {
    /// World-space bounds of one placement, for box collision selectors.
    pub fn world_aabb(&self, index: usize) -> (Vector3<f32>, Vector3<f32>) {
        let matrix = self.instances[index].to_matrix();
        let mut min = Vector3::new(f32::MAX, f32::MAX, f32::MAX);
        let mut max = Vector3::new(f32::MIN, f32::MIN, f32::MIN);
        for tri in &self.model.triangles {
            for v in tri {
                let p = matrix * cgmath::Vector4::new(v[0], v[1], v[2], 1.0);
                min = Vector3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
                max = Vector3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
            }
        }
        (min, max)
    }
}

/// A point light plus the things that ride along with it: an optional glow
/// billboard and an optional animator moving it.
pub struct LightEntry {
    pub light: Light,
    pub transform: Instance,
    pub animator: Option<Animator>,
    pub billboard: Option<BillboardNode>,
}

/// Owns every node in the demo. Dropping the scene releases all GPU
/// resources at once.
pub struct Scene {
    pub nodes: Vec<Node>,
    pub lights: Vec<LightEntry>,
    pub terrain: Option<TerrainNode>,
    pub water: Option<WaterNode>,
    pub sky: Option<SkyNode>,
    pub particles: Vec<ParticleSystem>,
    pub hud: Option<HudNode>,
    /// Unit quad shared by billboards, particles and the HUD.
    pub quad: Quad,
    pub globals: GlobalResources,
    pub clock: f32,
}

impl Scene {
    pub fn new(
        device: &wgpu::Device,
        environment_layout: &wgpu::BindGroupLayout,
        fog_color: [f32; 3],
        fog_density: f32,
    ) -> Self {
        Self {
            nodes: Vec::new(),
            lights: Vec::new(),
            terrain: None,
            water: None,
            sky: None,
            particles: Vec::new(),
            hud: None,
            quad: Quad::new(device),
            globals: GlobalResources::new(device, environment_layout, fog_color, fog_density),
            clock: 0.0,
        }
    }

    /// Add a model with its placements; returns the node index.
    pub fn add_node(
        &mut self,
        device: &wgpu::Device,
        name: &str,
        model: Model,
        instances: Vec<Instance>,
        animators: Vec<Option<Animator>>,
        unlit: bool,
    ) -> usize {
        self.add_emissive_node(device, name, model, instances, animators, unlit, [0.0; 3])
    }

    /// `add_node` with an emissive color added to the light term, for
    /// self-glowing surfaces.
    #[allow(clippy::too_many_arguments)]
    pub fn add_emissive_node(
        &mut self,
        device: &wgpu::Device,
        name: &str,
        model: Model,
        instances: Vec<Instance>,
        animators: Vec<Option<Animator>>,
        unlit: bool,
        emissive: [f32; 3],
    ) -> usize {
        debug_assert_eq!(instances.len(), animators.len());
        let raws: Vec<_> = instances.iter().map(|i| i.to_raw(unlit, emissive)).collect();
        let animated = animators.iter().any(Option::is_some);
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Instance Buffer")),
            contents: bytemuck::cast_slice(&raws),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        self.nodes.push(Node {
            name: name.to_string(),
            model,
            instances,
            animators,
            instance_buffer,
            unlit,
            emissive,
            animated,
        });
        self.nodes.len() - 1
    }

    pub fn add_light(&mut self, entry: LightEntry) {
        if self.lights.len() >= MAX_LIGHTS {
            log::warn!(
                "light '{:?}' exceeds the {} light limit and will not be shaded",
                entry.light.position,
                MAX_LIGHTS
            );
        }
        self.lights.push(entry);
    }

    /// Advance everything that moves by `dt` seconds and push the results to
    /// the GPU.
    pub fn update(&mut self, queue: &wgpu::Queue, dt: f32) {
        self.clock += dt;

        for node in &mut self.nodes {
            if !node.animated {
                continue;
            }
            for (instance, animator) in node.instances.iter_mut().zip(&mut node.animators) {
                if let Some(animator) = animator {
                    animator.apply(instance, dt);
                }
            }
            let raws: Vec<_> = node
                .instances
                .iter()
                .map(|i| i.to_raw(node.unlit, node.emissive))
                .collect();
            queue.write_buffer(&node.instance_buffer, 0, bytemuck::cast_slice(&raws));
        }

        for entry in &mut self.lights {
            if let Some(animator) = &mut entry.animator {
                animator.apply(&mut entry.transform, dt);
                entry.light.position = entry.transform.position;
            }
            if let Some(billboard) = &entry.billboard {
                billboard.move_to(queue, entry.light.position.into());
            }
        }

        for system in &mut self.particles {
            system.update(dt);
            system.write_instances(queue);
        }

        self.globals
            .uniform
            .update_lights(self.lights.iter().map(|e| &e.light));
        self.globals.uniform.update_time(self.clock);
        self.globals.write(queue);
    }
}
