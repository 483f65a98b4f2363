//! CPU-simulated particle system rendered as additive billboards.

use cgmath::{ElementWise, Rotation, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use wgpu::util::DeviceExt;

use crate::scene::billboard::BillboardRaw;
use crate::scene::instance::Instance;
use crate::scene::texture::Texture;

/// Hard cap on live particles; spawns beyond it are dropped for the frame.
pub const MAX_PARTICLES: usize = 16384;

/// Emits particles uniformly inside a box (in the system's local space)
/// with a shared direction and randomized rate, lifetime, size and color.
pub struct BoxEmitter {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
    /// Per-particle velocity in local units per millisecond.
    pub direction: Vector3<f32>,
    pub min_rate: f32,
    pub max_rate: f32,
    pub min_age: f32,
    pub max_age: f32,
    pub min_size: f32,
    pub max_size: f32,
    pub color_from: [f32; 4],
    pub color_to: [f32; 4],
}

/// Fades particles to transparent over the last `fade_time` seconds of
/// their life.
pub struct FadeOut {
    pub fade_time: f32,
}

impl FadeOut {
    /// Alpha multiplier for a particle with `remaining` seconds to live.
    pub fn factor(&self, remaining: f32) -> f32 {
        (remaining / self.fade_time).clamp(0.0, 1.0)
    }
}

struct Particle {
    position: Vector3<f32>,
    velocity: Vector3<f32>,
    age: f32,
    max_age: f32,
    size: f32,
    color: [f32; 4],
}

pub struct ParticleSystem {
    pub emitter: BoxEmitter,
    pub fade: FadeOut,
    pub transform: Instance,
    particles: Vec<Particle>,
    spawn_carry: f32,
    rng: StdRng,
    pub instance_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub live: u32,
}

impl ParticleSystem {
    pub fn new(
        device: &wgpu::Device,
        emitter: BoxEmitter,
        fade: FadeOut,
        transform: Instance,
        texture: &Texture,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Instance Buffer"),
            contents: &vec![0u8; MAX_PARTICLES * std::mem::size_of::<BillboardRaw>()],
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
            label: Some("particle_bind_group"),
        });

        Self {
            emitter,
            fade,
            transform,
            particles: Vec::new(),
            spawn_carry: 0.0,
            rng: StdRng::from_entropy(),
            instance_buffer,
            bind_group,
            live: 0,
        }
    }

    /// Step the simulation by `dt` seconds: age out dead particles, advance
    /// live ones, spawn new ones at the emitter's rate.
    pub fn update(&mut self, dt: f32) {
        age_and_advance(&mut self.particles, dt);

        let rate = sample(&mut self.rng, self.emitter.min_rate, self.emitter.max_rate);
        let mut to_spawn = rate * dt + self.spawn_carry;
        while to_spawn >= 1.0 {
            to_spawn -= 1.0;
            if self.particles.len() >= MAX_PARTICLES {
                continue;
            }
            let p = self.spawn_one();
            self.particles.push(p);
        }
        self.spawn_carry = to_spawn;
    }

    fn spawn_one(&mut self) -> Particle {
        let e = &self.emitter;
        let local = Vector3::new(
            sample(&mut self.rng, e.min.x, e.max.x),
            sample(&mut self.rng, e.min.y, e.max.y),
            sample(&mut self.rng, e.min.z, e.max.z),
        );
        let position = self.transform.position
            + self
                .transform
                .rotation
                .rotate_vector(local.mul_element_wise(self.transform.scale));
        // Direction is local units per millisecond.
        let velocity = self
            .transform
            .rotation
            .rotate_vector(e.direction.mul_element_wise(self.transform.scale))
            * 1000.0;
        let t = self.rng.r#gen::<f32>();
        let color = [
            e.color_from[0] + (e.color_to[0] - e.color_from[0]) * t,
            e.color_from[1] + (e.color_to[1] - e.color_from[1]) * t,
            e.color_from[2] + (e.color_to[2] - e.color_from[2]) * t,
            e.color_from[3] + (e.color_to[3] - e.color_from[3]) * t,
        ];

        Particle {
            position,
            velocity,
            age: 0.0,
            max_age: sample(&mut self.rng, e.min_age, e.max_age),
            size: sample(&mut self.rng, e.min_size, e.max_size),
            color,
        }
    }

    /// Pack live particles into the billboard instance buffer.
    pub fn write_instances(&mut self, queue: &wgpu::Queue) {
        let raws: Vec<BillboardRaw> = self
            .particles
            .iter()
            .map(|p| {
                let alpha = self.fade.factor(p.max_age - p.age);
                BillboardRaw {
                    position: p.position.into(),
                    size: [p.size, p.size],
                    color: [p.color[0], p.color[1], p.color[2], p.color[3] * alpha],
                }
            })
            .collect();
        self.live = raws.len() as u32;
        if !raws.is_empty() {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&raws));
        }
    }

}

fn age_and_advance(particles: &mut Vec<Particle>, dt: f32) {
    particles.retain_mut(|p| {
        p.age += dt;
        if p.age >= p.max_age {
            return false;
        }
        p.position += p.velocity * dt;
        true
    });
}

fn sample(rng: &mut StdRng, min: f32, max: f32) -> f32 {
    if min >= max { min } else { rng.gen_range(min..max) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_emitter() -> BoxEmitter {
        BoxEmitter {
            min: Vector3::new(-70.0, 0.0, -70.0),
            max: Vector3::new(70.0, 450.0, 470.0),
            direction: Vector3::new(0.0, 0.06, 0.0),
            min_rate: 1800.0,
            max_rate: 2000.0,
            min_age: 15.8,
            max_age: 17.0,
            min_size: 100.0,
            max_size: 400.0,
            color_from: [1.0, 1.0, 1.0, 1.0],
            color_to: [0.0, 1.0, 0.0, 1.0],
        }
    }

    #[test]
    fn spawn_positions_stay_inside_the_scaled_box() {
        let e = test_emitter();
        let mut rng = StdRng::seed_from_u64(7);
        let scale = 30.0;
        for _ in 0..200 {
            let local = Vector3::new(
                sample(&mut rng, e.min.x, e.max.x),
                sample(&mut rng, e.min.y, e.max.y),
                sample(&mut rng, e.min.z, e.max.z),
            );
            let world = local * scale;
            assert!(world.x >= e.min.x * scale && world.x <= e.max.x * scale);
            assert!(world.y >= e.min.y * scale && world.y <= e.max.y * scale);
            assert!(world.z >= e.min.z * scale && world.z <= e.max.z * scale);
        }
    }

    #[test]
    fn spawn_rate_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let rate = sample(&mut rng, 1800.0, 2000.0);
            assert!((1800.0..2000.0).contains(&rate));
        }
    }

    #[test]
    fn fade_factor_is_monotonic_and_clamped() {
        let fade = FadeOut { fade_time: 1.5 };
        assert_eq!(fade.factor(10.0), 1.0);
        assert!(fade.factor(0.75) > fade.factor(0.3));
        assert_eq!(fade.factor(-0.1), 0.0);
    }

    #[test]
    fn particles_age_out_and_drift_with_their_velocity() {
        let mut particles = vec![
            Particle {
                position: Vector3::new(0.0, 0.0, 0.0),
                velocity: Vector3::new(0.0, 60.0, 0.0),
                age: 0.0,
                max_age: 16.0,
                size: 100.0,
                color: [1.0; 4],
            },
            Particle {
                position: Vector3::new(0.0, 0.0, 0.0),
                velocity: Vector3::new(0.0, 60.0, 0.0),
                age: 15.9,
                max_age: 16.0,
                size: 100.0,
                color: [1.0; 4],
            },
        ];
        age_and_advance(&mut particles, 0.5);
        assert_eq!(particles.len(), 1);
        assert_eq!(particles[0].position.y, 30.0);
        assert_eq!(particles[0].age, 0.5);
    }

    #[test]
    fn sample_handles_degenerate_ranges() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(sample(&mut rng, 5.0, 5.0), 5.0);
        let v = sample(&mut rng, 1.0, 2.0);
        assert!((1.0..2.0).contains(&v));
    }
}
