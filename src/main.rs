//! The Mars exploration demo: assembles the full scene against the engine
//! context, then hands control to the render loop until the window closes.
//!
//! Exit codes: 0 on normal close, 1 when the GPU context cannot be created
//! or a required mesh fails to load.

use anyhow::Result;
use cgmath::{Deg, Point3, Quaternion, Rotation3, Vector3};

use marsgate::animator::Animator;
use marsgate::app;
use marsgate::camera::{DEFAULT_BINDINGS, FpsController};
use marsgate::collision::Selector;
use marsgate::context::Context;
use marsgate::resources;
use marsgate::scene::billboard::BillboardNode;
use marsgate::scene::hud::HudNode;
use marsgate::scene::instance::Instance;
use marsgate::scene::lights::Light;
use marsgate::scene::model::Model;
use marsgate::scene::particles::{BoxEmitter, FadeOut, ParticleSystem};
use marsgate::scene::sky::SkyNode;
use marsgate::scene::terrain::{self, TerrainNode};
use marsgate::scene::water::{WaterNode, WaveUniform};
use marsgate::scene::{LightEntry, Scene, primitives};

const TITLE: &str = "Mars Game Simulator";

// Atmosphere.
const FOG_COLOR: [f32; 3] = [30.0 / 255.0, 30.0 / 255.0, 30.0 / 255.0];
const FOG_DENSITY: f32 = 0.0009;

// Camera.
const CAMERA_START: [f32; 3] = [200.0, 270.0, -80.0];
const CAMERA_FAR: f32 = 42_000.0;
const CAMERA_SPEED: f32 = 1000.0;
const CAMERA_SENSITIVITY: f32 = 0.4;

// Character.
const CHARACTER_POSITION: [f32; 3] = [300.0, -265.0, 400.0];
const CHARACTER_SCALE: f32 = 40.0;

// Terrain.
const TERRAIN_ORIGIN: [f32; 3] = [-1400.0, -600.0, -1800.0];
const TERRAIN_SCALE: [f32; 3] = [80.0, 16.4, 80.0];

// Water.
const WATER_POSITION: [f32; 3] = [11_000.0, 200.0, 5_000.0];
const WATER_SCALE: f32 = 7.0;

// Moon.
const MOON_POSITION: [f32; 3] = [-7740.0, 5500.0, -1000.0];
const MOON_SCALE: f32 = 760.0;

// Spacecraft.
const MOTHERSHIP_POSITION: [f32; 3] = [0.0, -1000.0, -15_500.0];
const UFO3_POSITION: [f32; 3] = [740.0, 2000.0, -2400.0];
const ROCK_POSITION: [f32; 3] = [1250.0, 840.0, -200.0];

// Cube stack.
const CUBE_LEVELS: i32 = 12;
const CUBES_PER_LEVEL: i32 = 16;
const CUBE_STEP: f32 = 130.0;
const CUBE_SCALE: f32 = 12.0;
const CUBE_SPIN: f32 = rotation_rate(0.3);
const CUBE_EMISSIVE: [f32; 3] = [0.0, 200.0 / 255.0, 0.0];

/// Convert a legacy rotation-animator rate (degrees per 10 ms) to radians
/// per second.
const fn rotation_rate(deg_per_10ms: f32) -> f32 {
    deg_per_10ms * 100.0 * std::f32::consts::PI / 180.0
}

/// Convert a legacy fly-circle rate (radians per millisecond) to radians per
/// second.
const fn circle_rate(rad_per_ms: f32) -> f32 {
    rad_per_ms * 1000.0
}

fn place(position: [f32; 3], scale: f32) -> Instance {
    Instance {
        position: position.into(),
        scale: Vector3::new(scale, scale, scale),
        ..Default::default()
    }
}

/// The offset walk that stacks the rotating cubes: twelve levels of sixteen
/// cubes, stepping forward one cube width at a time with a sideways kick on
/// every fourth cube. Returns each cube's position and spin rate.
fn cube_stack_layout() -> Vec<(Vector3<f32>, f32)> {
    let mut cubes = Vec::with_capacity((CUBE_LEVELS * CUBES_PER_LEVEL) as usize);
    let mut side_boost: i32 = 1;
    for level in 1..=CUBE_LEVELS {
        let mut base = Vector3::new(0.0, -400.0 + level as f32 * CUBE_STEP, 0.0);
        // Even levels spin four times as fast.
        let spin = if level % 2 == 0 {
            CUBE_SPIN * 4.0
        } else {
            CUBE_SPIN
        };
        for i in 1..=CUBES_PER_LEVEL {
            if i % 4 == 0 {
                if side_boost > 4 {
                    side_boost = 1;
                }
                base.x += CUBE_STEP * side_boost as f32;
                side_boost += 1;
                base.z -= CUBE_STEP;
                cubes.push((base, spin));
                base.z += CUBE_STEP;
                base.x -= CUBE_STEP * side_boost as f32;
                side_boost -= 1;
            } else {
                cubes.push((base, spin));
                base.z += CUBE_STEP;
            }
        }
    }
    cubes
}

async fn build_scene(ctx: &mut Context) -> Result<Scene> {
    let mut scene = Scene::new(
        &ctx.device,
        &ctx.pipelines.environment_layout,
        FOG_COLOR,
        FOG_DENSITY,
    );

    ctx.camera_center = Point3::from(CAMERA_START);
    ctx.camera.yaw = Deg(90.0).into();
    ctx.projection.zfar = CAMERA_FAR;
    ctx.controller = FpsController::new(&DEFAULT_BINDINGS, CAMERA_SPEED, CAMERA_SENSITIVITY);

    // Shared sprite textures.
    let (glow_texture, fireball_texture) = futures::try_join!(
        resources::load_texture("particlewhite.png", false, &ctx.device, &ctx.queue),
        resources::load_texture("fireball.png", false, &ctx.device, &ctx.queue),
    )?;

    // The animated character. A missing mesh is fatal.
    let (character, clip) = resources::load_character_gltf(
        "zuleyka.gltf",
        "zuleyka_skin.png",
        &ctx.device,
        &ctx.queue,
        &ctx.pipelines.material_layout,
    )
    .await?;
    scene.add_node(
        &ctx.device,
        "character",
        character,
        vec![place(CHARACTER_POSITION, CHARACTER_SCALE)],
        vec![Some(Animator::clip(clip))],
        true,
    );

    // Sky light, far above the terrain.
    scene.add_light(LightEntry {
        light: Light::new(
            Vector3::new(-1300.0, 7000.0, -1400.0),
            [0.2, 0.1, 1.0],
            19_000.0,
        ),
        transform: Instance::from(Vector3::new(-1300.0, 7000.0, -1400.0)),
        animator: None,
        billboard: None,
    });

    // The red rover light: glow billboard, flying a small circle.
    let mut red_light = Light::new(
        Vector3::new(300.0, 865.0, -1900.0),
        [1.0, 0.067, 0.033],
        8000.0,
    );
    red_light.casts_shadows = true;
    scene.add_light(LightEntry {
        light: red_light,
        transform: Instance::from(Vector3::new(300.0, 865.0, -1900.0)),
        animator: Some(Animator::fly_circle(
            Vector3::new(0.0, 150.0, 0.0),
            250.0,
            circle_rate(0.001),
        )),
        billboard: Some(BillboardNode::new(
            &ctx.device,
            [50.0, 50.0],
            &glow_texture,
            &ctx.pipelines.sprite_layout,
        )),
    });

    // Water: a hill-plane mesh displaced in the shader, two blended layers.
    let (lava_texture, water_texture) = futures::try_join!(
        resources::load_texture("lava.png", false, &ctx.device, &ctx.queue),
        resources::load_texture("water.png", false, &ctx.device, &ctx.queue),
    )?;
    let water_mesh = primitives::hill_plane((20.0, 20.0), (60, 60), (10.0, 10.0));
    scene.water = Some(WaterNode::new(
        &ctx.device,
        water_mesh,
        place(WATER_POSITION, WATER_SCALE),
        WaveUniform::new(4.0, 600.0, 0.01),
        &lava_texture,
        &water_texture,
        &ctx.pipelines.water_layout,
    ));

    // Yellow light hovering over the water.
    let water_light_pos = Vector3::from(WATER_POSITION) + Vector3::new(0.0, 1000.0, 0.0);
    scene.add_light(LightEntry {
        light: Light::new(water_light_pos, [1.0, 1.0, 0.033], 8000.0),
        transform: Instance::from(water_light_pos),
        animator: None,
        billboard: None,
    });

    // Terrain from the heightmap, with the walkable heightfield feeding the
    // camera's collision responder.
    let heightmap_bytes = resources::load_binary("hm.png").await?;
    let heightmap = image::load_from_memory(&heightmap_bytes)?;
    let (terrain_mesh, heightfield) = terrain::from_heightmap(
        &heightmap,
        Vector3::from(TERRAIN_SCALE),
        Vector3::from(TERRAIN_ORIGIN),
    );
    let (terrain_base, terrain_detail) = futures::try_join!(
        resources::load_texture("terrmain.png", false, &ctx.device, &ctx.queue),
        resources::load_texture("terrdetail.png", false, &ctx.device, &ctx.queue),
    )?;
    ctx.responder
        .register(Selector::Heightfield(heightfield.clone()));
    scene.terrain = Some(TerrainNode::new(
        &ctx.device,
        terrain_mesh,
        heightfield,
        &terrain_base,
        &terrain_detail,
        &ctx.pipelines.material_layout,
    ));

    // Skydome, redrawn around the camera every frame.
    let sky_texture = resources::load_texture("scifidome3.png", false, &ctx.device, &ctx.queue).await?;
    let dome = primitives::dome(CAMERA_FAR * 0.45, 16, 8, 0.95, 2.0);
    scene.sky = Some(SkyNode::new(
        &ctx.device,
        dome,
        &sky_texture,
        &ctx.pipelines.sprite_layout,
    ));

    // The moon: a big slowly tumbling sphere.
    let moon_material = resources::load_material(
        &ctx.device,
        &ctx.queue,
        &ctx.pipelines.material_layout,
        "moon",
        "lunar.png",
        None,
    )
    .await?;
    let moon_mesh = primitives::uv_sphere(5.0, 32, 16, 8.0);
    let moon_triangles = moon_mesh.triangles();
    let moon = Model {
        meshes: vec![moon_mesh.into_mesh(&ctx.device, "Moon", 0)],
        materials: vec![moon_material],
        triangles: moon_triangles,
    };
    scene.add_node(
        &ctx.device,
        "moon",
        moon,
        vec![place(MOON_POSITION, MOON_SCALE)],
        vec![Some(Animator::rotation(Vector3::new(
            rotation_rate(0.01),
            0.0,
            rotation_rate(0.03),
        )))],
        false,
    );

    // The four sci-fi gate arrays, each with a yellow light and a mesh
    // collision selector.
    let gates = resources::load_model_obj(
        "scifi_gate_array.obj",
        &ctx.device,
        &ctx.queue,
        &ctx.pipelines.material_layout,
        None,
    )
    .await?;
    let mut gate_instances = Vec::new();
    for i in 0..4 {
        let position = [9800.0 + i as f32 * 2500.0, 550.0, -2000.0];
        let instance = place(position, 20.0);
        ctx.responder
            .register(Selector::triangles(&gates.triangles, &instance));
        let light_pos = Vector3::new(position[0] + 1000.0, position[1] - 200.0, -4000.0);
        scene.add_light(LightEntry {
            light: Light::new(light_pos, [1.0, 1.0, 0.033], 18_000.0),
            transform: Instance::from(light_pos),
            animator: None,
            billboard: None,
        });
        gate_instances.push(instance);
    }
    let gate_animators = gate_instances.iter().map(|_| None).collect();
    scene.add_node(
        &ctx.device,
        "gates",
        gates,
        gate_instances,
        gate_animators,
        true,
    );

    // The mothership, parked far out with its own collision mesh.
    let mothership = resources::load_model_obj(
        "mothership.obj",
        &ctx.device,
        &ctx.queue,
        &ctx.pipelines.material_layout,
        None,
    )
    .await?;
    let mothership_instance = Instance {
        position: MOTHERSHIP_POSITION.into(),
        rotation: Quaternion::from_angle_y(Deg(-45.0)),
        scale: Vector3::new(40.0, 40.0, 40.0),
    };
    ctx.responder
        .register(Selector::triangles(&mothership.triangles, &mothership_instance));
    scene.add_node(
        &ctx.device,
        "mothership",
        mothership,
        vec![mothership_instance],
        vec![None],
        true,
    );

    // Three UFOs from the same mesh: two circling, one hovering and spinning.
    let (ufos, ufo3) = futures::try_join!(
        resources::load_model_obj(
            "ufo.obj",
            &ctx.device,
            &ctx.queue,
            &ctx.pipelines.material_layout,
            None,
        ),
        resources::load_model_obj(
            "ufo.obj",
            &ctx.device,
            &ctx.queue,
            &ctx.pipelines.material_layout,
            None,
        ),
    )?;
    scene.add_node(
        &ctx.device,
        "ufos",
        ufos,
        vec![place([740.0, -2000.0, -1400.0], 10.0), place([740.0, -2000.0, -1400.0], 20.0)],
        vec![
            Some(Animator::fly_circle(
                Vector3::new(-740.0, 4500.0, -4400.0),
                20_000.0,
                circle_rate(0.001),
            )),
            Some(Animator::fly_circle(
                Vector3::new(740.0, 6500.0, -2400.0),
                40_000.0,
                circle_rate(0.0005),
            )),
        ],
        true,
    );
    let ufo3_instance = Instance {
        position: UFO3_POSITION.into(),
        rotation: Quaternion::from_angle_x(Deg(-30.0)),
        scale: Vector3::new(20.0, 20.0, 20.0),
    };
    scene.add_node(
        &ctx.device,
        "ufo3",
        ufo3,
        vec![ufo3_instance],
        vec![Some(Animator::rotation(Vector3::new(
            0.0,
            rotation_rate(0.1),
            0.0,
        )))],
        false,
    );

    // The hovering UFO's light, carrying the second glow billboard around a
    // small circle above the craft.
    let ufo_light_pos = Vector3::from(UFO3_POSITION) + Vector3::new(0.0, 800.0, 0.0);
    scene.add_light(LightEntry {
        light: Light::new(ufo_light_pos, [1.0, 1.0, 0.033], 4000.0),
        transform: Instance::from(ufo_light_pos),
        animator: Some(Animator::fly_circle(
            ufo_light_pos,
            1000.0,
            circle_rate(0.0005),
        )),
        billboard: Some(BillboardNode::new(
            &ctx.device,
            [150.0, 150.0],
            &glow_texture,
            &ctx.pipelines.sprite_layout,
        )),
    });

    // The rock pack, retextured.
    let rocks = resources::load_model_obj(
        "rockpack.obj",
        &ctx.device,
        &ctx.queue,
        &ctx.pipelines.material_layout,
        Some("rockmat.png"),
    )
    .await?;
    scene.add_node(
        &ctx.device,
        "rocks",
        rocks,
        vec![Instance {
            position: ROCK_POSITION.into(),
            rotation: Quaternion::from_angle_x(Deg(-30.0)),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }],
        vec![None],
        false,
    );

    // The green fire fountain by the water.
    let emitter = BoxEmitter {
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
        color_to: [100.0 / 255.0, 1.0, 100.0 / 255.0, 1.0],
    };
    let particle_transform = Instance {
        position: Vector3::from(WATER_POSITION) + Vector3::new(700.0, -400.0, -400.0),
        scale: Vector3::new(30.0, 30.0, 30.0),
        ..Default::default()
    };
    scene.particles.push(ParticleSystem::new(
        &ctx.device,
        emitter,
        FadeOut { fade_time: 1.5 },
        particle_transform,
        &fireball_texture,
        &ctx.pipelines.sprite_layout,
    ));

    // The stack of rotating collidable cubes.
    let cube_material = resources::load_material(
        &ctx.device,
        &ctx.queue,
        &ctx.pipelines.material_layout,
        "cube",
        "texture1.png",
        Some("normal.png"),
    )
    .await?;
    let cube_mesh = primitives::cube(10.0);
    let cube_triangles = cube_mesh.triangles();
    let cube_model = Model {
        meshes: vec![cube_mesh.into_mesh(&ctx.device, "Cube", 0)],
        materials: vec![cube_material],
        triangles: cube_triangles,
    };
    let mut cube_instances = Vec::new();
    let mut cube_animators = Vec::new();
    for (position, spin) in cube_stack_layout() {
        cube_instances.push(Instance {
            position,
            scale: Vector3::new(CUBE_SCALE, CUBE_SCALE, CUBE_SCALE),
            ..Default::default()
        });
        cube_animators.push(Some(Animator::rotation(Vector3::new(0.0, spin, 0.0))));
    }
    let cube_count = cube_instances.len();
    let cubes = scene.add_emissive_node(
        &ctx.device,
        "cubes",
        cube_model,
        cube_instances,
        cube_animators,
        false,
        CUBE_EMISSIVE,
    );
    for i in 0..cube_count {
        let (min, max) = scene.nodes[cubes].world_aabb(i);
        ctx.responder.register(Selector::aabb(min, max));
    }

    // Caption banner, top left.
    let caption = resources::load_texture("caption.png", false, &ctx.device, &ctx.queue).await?;
    scene.hud = Some(HudNode::new(
        &ctx.device,
        (-0.985, 0.97, -0.62, 0.94),
        &caption,
        &ctx.pipelines.sprite_layout,
    ));

    log::info!(
        "scene ready: {} nodes, {} lights, {} particle systems",
        scene.nodes.len(),
        scene.lights.len(),
        scene.particles.len()
    );
    Ok(scene)
}

fn main() {
    env_logger::init();
    if let Err(error) = app::run(TITLE, Box::new(|ctx| Box::pin(build_scene(ctx)))) {
        log::error!("{error:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_stack_has_twelve_levels_of_sixteen() {
        let cubes = cube_stack_layout();
        assert_eq!(cubes.len(), 192);
        for level in 0..12 {
            let y = -400.0 + (level + 1) as f32 * 130.0;
            let count = cubes.iter().filter(|(p, _)| p.y == y).count();
            assert_eq!(count, 16, "level {level}");
        }
    }

    #[test]
    fn cube_walk_steps_forward_and_kicks_sideways() {
        let cubes = cube_stack_layout();
        // First level, first cubes of the walk.
        assert_eq!(cubes[0].0, Vector3::new(0.0, -270.0, 0.0));
        assert_eq!(cubes[1].0, Vector3::new(0.0, -270.0, 130.0));
        assert_eq!(cubes[2].0, Vector3::new(0.0, -270.0, 260.0));
        // Fourth cube kicks sideways without advancing.
        assert_eq!(cubes[3].0, Vector3::new(130.0, -270.0, 260.0));
        // The walk resumes one step left of where it was.
        assert_eq!(cubes[4].0, Vector3::new(-130.0, -270.0, 390.0));
    }

    #[test]
    fn even_levels_spin_four_times_as_fast() {
        let cubes = cube_stack_layout();
        let slow = cubes[0].1;
        let fast = cubes[16].1;
        assert!((fast - slow * 4.0).abs() < 1e-6);
        assert!((slow - rotation_rate(0.3)).abs() < 1e-6);
    }

    #[test]
    fn legacy_rate_conversions() {
        // 0.3 degrees per 10 ms is 30 degrees per second.
        assert!((rotation_rate(0.3) - 30.0_f32.to_radians()).abs() < 1e-6);
        // 0.001 radians per ms is 1 radian per second.
        assert_eq!(circle_rate(0.001), 1.0);
    }
}
