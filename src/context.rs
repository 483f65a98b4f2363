//! The central GPU context: window, surface, device, camera resources and
//! every render pipeline. One instance lives for the program's lifetime and
//! its drop releases the GPU.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use cgmath::Deg;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::camera::{Camera, CameraUniform, DEFAULT_BINDINGS, FpsController, Projection};
use crate::collision::CollisionResponder;
use crate::pipelines::Pipelines;
use crate::scene::Scene;
use crate::scene::model::DrawModel;
use crate::scene::texture::Texture;

pub struct Context {
    pub window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub is_surface_configured: bool,
    pub depth_texture: Texture,
    pub pipelines: Pipelines,
    pub camera: Camera,
    pub projection: Projection,
    pub controller: FpsController,
    pub responder: CollisionResponder,
    /// Center of the collision ellipsoid; the camera eye sits above it.
    pub camera_center: cgmath::Point3<f32>,
    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    pub camera_bind_group: wgpu::BindGroup,
}

impl Context {
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible GPU adapter")?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            // Vsync.
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture =
            Texture::create_depth_texture(&device, [config.width, config.height], "depth_texture");
        let pipelines = Pipelines::new(&device, &config);

        let camera = Camera::new((0.0, 0.0, 0.0), Deg(-90.0), Deg(0.0));
        let projection = Projection::new(config.width, config.height, Deg(45.0), 1.0, 42_000.0);
        let mut camera_uniform = CameraUniform::new();
        camera_uniform.update_view_proj(&camera, &projection);
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &pipelines.camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let controller = FpsController::new(&DEFAULT_BINDINGS, 800.0, 0.4);
        let responder = CollisionResponder::new(
            cgmath::Vector3::new(60.0, 100.0, 60.0),
            cgmath::Vector3::new(0.0, -9.8, 0.0),
            cgmath::Vector3::new(0.0, 50.0, 0.0),
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            is_surface_configured: true,
            depth_texture,
            pipelines,
            camera,
            projection,
            controller,
            responder,
            camera_center: cgmath::Point3::new(0.0, 0.0, 0.0),
            camera_uniform,
            camera_buffer,
            camera_bind_group,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            self.is_surface_configured = false;
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            Texture::create_depth_texture(&self.device, [width, height], "depth_texture");
        self.projection.resize(width, height);
        self.is_surface_configured = true;
    }

    /// Move the camera through the collision responder and upload the
    /// resulting view to the GPU.
    pub fn update_camera(&mut self, dt: f32) {
        self.controller.update_orientation(&mut self.camera, dt);
        let walk = self.controller.desired_walk(&self.camera, dt);
        let jump = self.controller.take_jump();
        self.camera_center = self.responder.resolve(self.camera_center, walk, jump, dt);
        self.camera.position = self
            .responder
            .eye_position(self.camera_center, self.controller.crouching);

        self.camera_uniform
            .update_view_proj(&self.camera, &self.projection);
        self.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera_uniform]),
        );
    }

    /// Record and submit one frame: sky, terrain, models, water, billboards
    /// and particles, HUD.
    pub fn render(&mut self, scene: &Scene) -> std::result::Result<(), wgpu::SurfaceError> {
        if !self.is_surface_configured {
            return Ok(());
        }
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            if let Some(sky) = &scene.sky {
                pass.set_pipeline(&self.pipelines.sky);
                pass.set_bind_group(0, &sky.bind_group, &[]);
                pass.set_bind_group(1, &self.camera_bind_group, &[]);
                pass.set_vertex_buffer(0, sky.mesh.vertex_buffer.slice(..));
                pass.set_vertex_buffer(1, sky.instance_buffer.slice(..));
                pass.set_index_buffer(sky.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..sky.mesh.num_elements, 0, 0..1);
            }

            if let Some(terrain) = &scene.terrain {
                pass.set_pipeline(&self.pipelines.terrain);
                pass.set_bind_group(0, &terrain.bind_group, &[]);
                pass.set_bind_group(1, &self.camera_bind_group, &[]);
                pass.set_bind_group(2, &scene.globals.bind_group, &[]);
                pass.set_vertex_buffer(0, terrain.mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(
                    terrain.mesh.index_buffer.slice(..),
                    wgpu::IndexFormat::Uint32,
                );
                pass.draw_indexed(0..terrain.mesh.num_elements, 0, 0..1);
            }

            pass.set_pipeline(&self.pipelines.basic);
            for node in &scene.nodes {
                pass.set_vertex_buffer(1, node.instance_buffer.slice(..));
                pass.draw_model_instanced(
                    &node.model,
                    0..node.instances.len() as u32,
                    &self.camera_bind_group,
                    &scene.globals.bind_group,
                );
            }

            if let Some(water) = &scene.water {
                pass.set_pipeline(&self.pipelines.water);
                pass.set_bind_group(0, &water.bind_group, &[]);
                pass.set_bind_group(1, &self.camera_bind_group, &[]);
                pass.set_bind_group(2, &scene.globals.bind_group, &[]);
                pass.set_vertex_buffer(0, water.mesh.vertex_buffer.slice(..));
                pass.set_vertex_buffer(1, water.instance_buffer.slice(..));
                pass.set_index_buffer(
                    water.mesh.index_buffer.slice(..),
                    wgpu::IndexFormat::Uint32,
                );
                pass.draw_indexed(0..water.mesh.num_elements, 0, 0..1);
            }

            pass.set_pipeline(&self.pipelines.billboard);
            pass.set_bind_group(1, &self.camera_bind_group, &[]);
            pass.set_vertex_buffer(0, scene.quad.vertex_buffer.slice(..));
            pass.set_index_buffer(scene.quad.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            for entry in &scene.lights {
                if let Some(billboard) = &entry.billboard {
                    pass.set_bind_group(0, &billboard.bind_group, &[]);
                    pass.set_vertex_buffer(1, billboard.instance_buffer.slice(..));
                    pass.draw_indexed(0..scene.quad.num_indices, 0, 0..1);
                }
            }
            for system in &scene.particles {
                if system.live == 0 {
                    continue;
                }
                pass.set_bind_group(0, &system.bind_group, &[]);
                pass.set_vertex_buffer(1, system.instance_buffer.slice(..));
                pass.draw_indexed(0..scene.quad.num_indices, 0, 0..system.live);
            }

            if let Some(hud) = &scene.hud {
                pass.set_pipeline(&self.pipelines.hud);
                pass.set_bind_group(0, &hud.bind_group, &[]);
                pass.set_vertex_buffer(0, hud.vertex_buffer.slice(..));
                pass.set_index_buffer(hud.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..hud.num_indices, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}
