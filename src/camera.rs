//! First-person camera: view/projection math, the key-binding table and the
//! controller that turns input into desired motion.

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};
use winit::event::ElementState;
use winit::keyboard::KeyCode;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const SAFE_FRAC_PI_2: f32 = std::f32::consts::FRAC_PI_2 - 0.0001;

/// Camera position and orientation (yaw/pitch, FPS style).
pub struct Camera {
    pub position: Point3<f32>,
    pub yaw: Rad<f32>,
    pub pitch: Rad<f32>,
}

impl Camera {
    pub fn new<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        position: V,
        yaw: Y,
        pitch: P,
    ) -> Self {
        Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
        }
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();

        Matrix4::look_to_rh(
            self.position,
            Vector3::new(cos_pitch * cos_yaw, sin_pitch, cos_pitch * sin_yaw).normalize(),
            Vector3::unit_y(),
        )
    }

    /// Unit vectors spanning the view plane, used to orient billboards.
    pub fn right_up(&self) -> (Vector3<f32>, Vector3<f32>) {
        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();
        let forward = Vector3::new(cos_pitch * cos_yaw, sin_pitch, cos_pitch * sin_yaw);
        let right = forward.cross(Vector3::unit_y()).normalize();
        let up = right.cross(forward).normalize();
        (right, up)
    }
}

pub struct Projection {
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height as f32;
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Camera uniform bound at group 1 of every pipeline. Carries the view
/// plane's right/up vectors so billboard quads can face the camera.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
    right: [f32; 4],
    up: [f32; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
            right: [1.0, 0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0, 0.0],
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
        let (right, up) = camera.right_up();
        self.right = right.extend(0.0).into();
        self.up = up.extend(0.0).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Actions the camera responds to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraAction {
    Forward,
    Backward,
    StrafeLeft,
    StrafeRight,
    Jump,
    Crouch,
}

/// One key-to-action mapping. The controller consumes a fixed table of these
/// once at construction; the table is immutable afterwards.
#[derive(Clone, Copy, Debug)]
pub struct KeyBinding {
    pub key: KeyCode,
    pub action: CameraAction,
}

/// The default FPS table: WASD plus arrow keys, space to jump, C to crouch.
pub const DEFAULT_BINDINGS: [KeyBinding; 10] = [
    KeyBinding {
        key: KeyCode::KeyW,
        action: CameraAction::Forward,
    },
    KeyBinding {
        key: KeyCode::ArrowUp,
        action: CameraAction::Forward,
    },
    KeyBinding {
        key: KeyCode::KeyS,
        action: CameraAction::Backward,
    },
    KeyBinding {
        key: KeyCode::ArrowDown,
        action: CameraAction::Backward,
    },
    KeyBinding {
        key: KeyCode::KeyA,
        action: CameraAction::StrafeLeft,
    },
    KeyBinding {
        key: KeyCode::ArrowLeft,
        action: CameraAction::StrafeLeft,
    },
    KeyBinding {
        key: KeyCode::KeyD,
        action: CameraAction::StrafeRight,
    },
    KeyBinding {
        key: KeyCode::ArrowRight,
        action: CameraAction::StrafeRight,
    },
    KeyBinding {
        key: KeyCode::Space,
        action: CameraAction::Jump,
    },
    KeyBinding {
        key: KeyCode::KeyC,
        action: CameraAction::Crouch,
    },
];

/// Turns key and mouse input into yaw/pitch changes and a desired walk
/// vector. Actual movement is filtered through the collision responder.
pub struct FpsController {
    bindings: Vec<KeyBinding>,
    amount_forward: f32,
    amount_backward: f32,
    amount_left: f32,
    amount_right: f32,
    jump_pressed: bool,
    pub crouching: bool,
    rotate_horizontal: f32,
    rotate_vertical: f32,
    speed: f32,
    sensitivity: f32,
}

impl FpsController {
    pub fn new(bindings: &[KeyBinding], speed: f32, sensitivity: f32) -> Self {
        Self {
            bindings: bindings.to_vec(),
            amount_forward: 0.0,
            amount_backward: 0.0,
            amount_left: 0.0,
            amount_right: 0.0,
            jump_pressed: false,
            crouching: false,
            rotate_horizontal: 0.0,
            rotate_vertical: 0.0,
            speed,
            sensitivity,
        }
    }

    /// Returns true when the key is bound (so the caller can stop routing
    /// the event elsewhere).
    pub fn process_key(&mut self, key: KeyCode, state: ElementState) -> bool {
        let Some(binding) = self.bindings.iter().find(|b| b.key == key) else {
            return false;
        };
        let amount = if state == ElementState::Pressed { 1.0 } else { 0.0 };
        match binding.action {
            CameraAction::Forward => self.amount_forward = amount,
            CameraAction::Backward => self.amount_backward = amount,
            CameraAction::StrafeLeft => self.amount_left = amount,
            CameraAction::StrafeRight => self.amount_right = amount,
            CameraAction::Jump => self.jump_pressed = state == ElementState::Pressed,
            CameraAction::Crouch => self.crouching = state == ElementState::Pressed,
        }
        true
    }

    pub fn process_mouse(&mut self, mouse_dx: f64, mouse_dy: f64) {
        self.rotate_horizontal += mouse_dx as f32;
        self.rotate_vertical += mouse_dy as f32;
    }

    /// Apply accumulated mouse motion to the camera orientation.
    pub fn update_orientation(&mut self, camera: &mut Camera, dt: f32) {
        camera.yaw += Rad(self.rotate_horizontal) * self.sensitivity * dt;
        camera.pitch += Rad(-self.rotate_vertical) * self.sensitivity * dt;
        self.rotate_horizontal = 0.0;
        self.rotate_vertical = 0.0;

        if camera.pitch < -Rad(SAFE_FRAC_PI_2) {
            camera.pitch = -Rad(SAFE_FRAC_PI_2);
        } else if camera.pitch > Rad(SAFE_FRAC_PI_2) {
            camera.pitch = Rad(SAFE_FRAC_PI_2);
        }
    }

    /// Desired horizontal displacement for this frame, flat on the ground
    /// plane regardless of pitch.
    pub fn desired_walk(&self, camera: &Camera, dt: f32) -> Vector3<f32> {
        let (yaw_sin, yaw_cos) = camera.yaw.0.sin_cos();
        let forward = Vector3::new(yaw_cos, 0.0, yaw_sin);
        let right = Vector3::new(-yaw_sin, 0.0, yaw_cos);
        (forward * (self.amount_forward - self.amount_backward)
            + right * (self.amount_right - self.amount_left))
            * self.speed
            * dt
    }

    /// Consume the jump edge; the responder only honors it when grounded.
    pub fn take_jump(&mut self) -> bool {
        std::mem::take(&mut self.jump_pressed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_action_is_bound() {
        for action in [
            CameraAction::Forward,
            CameraAction::Backward,
            CameraAction::StrafeLeft,
            CameraAction::StrafeRight,
            CameraAction::Jump,
            CameraAction::Crouch,
        ] {
            assert!(
                DEFAULT_BINDINGS.iter().any(|b| b.action == action),
                "missing binding for {action:?}"
            );
        }
    }

    #[test]
    fn bound_keys_are_consumed_and_unbound_keys_are_not() {
        let mut controller = FpsController::new(&DEFAULT_BINDINGS, 500.0, 1.0);
        assert!(controller.process_key(KeyCode::KeyW, ElementState::Pressed));
        assert!(!controller.process_key(KeyCode::KeyQ, ElementState::Pressed));
    }

    #[test]
    fn walk_vector_is_flat_and_scales_with_dt() {
        let mut controller = FpsController::new(&DEFAULT_BINDINGS, 100.0, 1.0);
        controller.process_key(KeyCode::KeyW, ElementState::Pressed);
        let camera = Camera::new((0.0, 0.0, 0.0), cgmath::Deg(0.0), cgmath::Deg(-45.0));
        let walk = controller.desired_walk(&camera, 0.5);
        assert_eq!(walk.y, 0.0);
        assert!((walk.x - 50.0).abs() < 1e-4);
    }

    #[test]
    fn pitch_is_clamped_to_just_under_vertical() {
        let mut controller = FpsController::new(&DEFAULT_BINDINGS, 100.0, 10.0);
        let mut camera = Camera::new((0.0, 0.0, 0.0), cgmath::Deg(0.0), cgmath::Deg(0.0));
        controller.process_mouse(0.0, -10_000.0);
        controller.update_orientation(&mut camera, 1.0);
        assert!(camera.pitch.0 <= SAFE_FRAC_PI_2);
    }

    #[test]
    fn jump_edge_is_consumed_once() {
        let mut controller = FpsController::new(&DEFAULT_BINDINGS, 100.0, 1.0);
        controller.process_key(KeyCode::Space, ElementState::Pressed);
        assert!(controller.take_jump());
        assert!(!controller.take_jump());
    }
}
