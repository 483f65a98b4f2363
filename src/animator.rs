//! Per-frame transform mutators attached to scene nodes: constant rotation,
//! circular flight paths and keyframed TRS clips.

use cgmath::{ElementWise, Euler, Quaternion, Rad, Vector3, VectorSpace};

use crate::scene::instance::Instance;

/// A keyframed translation/rotation/scale clip, sampled with linear
/// interpolation (slerp for rotations) and looped over its duration.
pub struct TrsClip {
    pub timestamps: Vec<f32>,
    pub frames: Vec<Instance>,
}

impl TrsClip {
    pub fn duration(&self) -> f32 {
        self.timestamps.last().copied().unwrap_or(0.0)
    }

    /// Sample the clip at `time` (wrapped into the clip's duration).
    pub fn sample(&self, time: f32) -> Instance {
        if self.frames.len() < 2 {
            return self.frames.first().cloned().unwrap_or_default();
        }
        let t = time % self.duration();
        let next = self
            .timestamps
            .iter()
            .position(|&stamp| stamp > t)
            .unwrap_or(self.timestamps.len() - 1);
        let prev = next.saturating_sub(1);
        let span = self.timestamps[next] - self.timestamps[prev];
        let factor = if span > 0.0 {
            (t - self.timestamps[prev]) / span
        } else {
            0.0
        };

        let a = &self.frames[prev];
        let b = &self.frames[next];
        Instance {
            position: a.position.lerp(b.position, factor),
            rotation: a.rotation.slerp(b.rotation, factor),
            scale: a.scale.lerp(b.scale, factor),
        }
    }
}

/// One animator bound to one node.
pub enum Animator {
    /// Spin around each axis at a constant rate (radians per second).
    Rotation { speed: Vector3<f32> },
    /// Fly a horizontal circle around `center` at `speed` radians per second.
    FlyCircle {
        center: Vector3<f32>,
        radius: f32,
        speed: f32,
        angle: f32,
    },
    /// Play a TRS clip on a loop on top of the node's placement transform
    /// (captured on the first frame).
    Clip {
        clip: TrsClip,
        time: f32,
        base: Option<Instance>,
    },
}

impl Animator {
    pub fn rotation(speed: Vector3<f32>) -> Self {
        Self::Rotation { speed }
    }

    pub fn fly_circle(center: Vector3<f32>, radius: f32, speed: f32) -> Self {
        Self::FlyCircle {
            center,
            radius,
            speed,
            angle: 0.0,
        }
    }

    pub fn clip(clip: TrsClip) -> Self {
        Self::Clip {
            clip,
            time: 0.0,
            base: None,
        }
    }

    /// Advance by `dt` seconds and write the result into the node transform.
    pub fn apply(&mut self, instance: &mut Instance, dt: f32) {
        match self {
            Animator::Rotation { speed } => {
                let delta = Quaternion::from(Euler::new(
                    Rad(speed.x * dt),
                    Rad(speed.y * dt),
                    Rad(speed.z * dt),
                ));
                instance.rotation = instance.rotation * delta;
            }
            Animator::FlyCircle {
                center,
                radius,
                speed,
                angle,
            } => {
                *angle += *speed * dt;
                instance.position = *center
                    + Vector3::new(angle.cos() * *radius, 0.0, angle.sin() * *radius);
            }
            Animator::Clip { clip, time, base } => {
                let base = base.get_or_insert_with(|| instance.clone());
                *time += dt;
                let sampled = clip.sample(*time);
                instance.rotation = base.rotation * sampled.rotation;
                // Clip translations are local to the node's placement.
                instance.position = base.position
                    + cgmath::Rotation::rotate_vector(
                        &base.rotation,
                        sampled.position.mul_element_wise(base.scale),
                    );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, One};

    #[test]
    fn rotation_advances_at_the_configured_rate() {
        let mut animator = Animator::rotation(Vector3::new(0.0, 1.0, 0.0));
        let mut instance = Instance::new();
        // Quarter turn after pi/2 seconds.
        animator.apply(&mut instance, std::f32::consts::FRAC_PI_2);
        let rotated = cgmath::Rotation::rotate_vector(&instance.rotation, Vector3::unit_x());
        assert!((rotated.z + 1.0).abs() < 1e-5);
        assert!(rotated.x.abs() < 1e-5);
    }

    #[test]
    fn fly_circle_keeps_the_node_on_its_circle() {
        let center = Vector3::new(0.0, 150.0, 0.0);
        let mut animator = Animator::fly_circle(center, 250.0, 1.0);
        let mut instance = Instance::new();
        for _ in 0..100 {
            animator.apply(&mut instance, 0.016);
            let offset = instance.position - center;
            assert!((offset.magnitude() - 250.0).abs() < 1e-2);
            assert_eq!(offset.y, 0.0);
        }
    }

    #[test]
    fn clip_sampling_interpolates_and_loops() {
        let clip = TrsClip {
            timestamps: vec![0.0, 1.0, 2.0],
            frames: vec![
                Instance::from(Vector3::new(0.0, 0.0, 0.0)),
                Instance::from(Vector3::new(10.0, 0.0, 0.0)),
                Instance::from(Vector3::new(0.0, 0.0, 0.0)),
            ],
        };
        assert_eq!(clip.sample(0.5).position.x, 5.0);
        // Wraps past the end.
        assert_eq!(clip.sample(2.5).position.x, 5.0);
        assert_eq!(clip.duration(), 2.0);
    }

    #[test]
    fn single_frame_clip_is_a_constant() {
        let clip = TrsClip {
            timestamps: vec![0.0],
            frames: vec![Instance {
                position: Vector3::new(1.0, 2.0, 3.0),
                rotation: Quaternion::one(),
                scale: Vector3::new(1.0, 1.0, 1.0),
            }],
        };
        assert_eq!(clip.sample(5.0).position, Vector3::new(1.0, 2.0, 3.0));
    }
}
