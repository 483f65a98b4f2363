//! marsgate
//!
//! A small scene engine and the Mars exploration demo built on top of it.
//! The engine side owns the GPU context, render pipelines and scene data;
//! the binary assembles a fixed scene (terrain, water, skydome, spacecraft,
//! particle effects, animated lights and a stack of collidable cubes) and
//! drives the per-frame loop until the window closes.
//!
//! High-level modules
//! - `camera`: first-person camera, key-binding table, controller and uniforms
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `scene`: scene node arena and engine data models (meshes, textures, lights,
//!   terrain, water, sky, billboards, particles)
//! - `animator`: per-frame transform mutators (rotation, circular flight, clips)
//! - `collision`: geometry selectors and the camera collision responder
//! - `pipelines`: definitions for the render pipelines (model, terrain, water,
//!   sky, billboard, hud)
//! - `resources`: helpers to load textures/models and create GPU resources
//! - `app`: window setup and the render loop

pub mod animator;
pub mod app;
pub mod camera;
pub mod collision;
pub mod context;
pub mod pipelines;
pub mod resources;
pub mod scene;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use wgpu::*;
pub use winit::event::DeviceEvent;
pub use winit::event::WindowEvent;
