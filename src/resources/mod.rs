//! Asset loading: files, textures, OBJ models and the glTF character.
//!
//! Assets are resolved relative to the `assets/` tree the build script
//! copies next to the binary. Loaders are async so setup can fetch several
//! assets concurrently with `join_all`.

pub mod mesh;

use std::io::{BufReader, Cursor};

use anyhow::{Context, Result};
use cgmath::{Quaternion, Vector3};
use wgpu::util::DeviceExt;

use crate::animator::TrsClip;
use crate::scene::instance::Instance;
use crate::scene::model::{Material, Mesh, Model, ModelVertex};
use crate::scene::texture::Texture;

fn asset_path(file_name: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("OUT_DIR"))
        .join("assets")
        .join(file_name)
}

pub async fn load_string(file_name: &str) -> Result<String> {
    let path = asset_path(file_name);
    std::fs::read_to_string(&path).with_context(|| format!("failed to load {}", path.display()))
}

pub async fn load_binary(file_name: &str) -> Result<Vec<u8>> {
    let path = asset_path(file_name);
    std::fs::read(&path).with_context(|| format!("failed to load {}", path.display()))
}

pub async fn load_texture(
    file_name: &str,
    is_normal_map: bool,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> Result<Texture> {
    let data = load_binary(file_name).await?;
    let format = file_name.rsplit('.').next();
    Texture::from_bytes(device, queue, &data, file_name, format, is_normal_map)
}

/// A diffuse/normal material from texture files; a neutral normal map fills
/// in when none is given.
pub async fn load_material(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    name: &str,
    diffuse: &str,
    normal: Option<&str>,
) -> Result<Material> {
    let diffuse_texture = load_texture(diffuse, false, device, queue).await?;
    let normal_texture = match normal {
        Some(file) => load_texture(file, true, device, queue).await?,
        None => Texture::neutral_normal(device, queue),
    };
    Ok(Material::new(
        device,
        name,
        diffuse_texture,
        normal_texture,
        layout,
    ))
}

/// Load a Wavefront OBJ with its MTL materials. `diffuse_override` replaces
/// every material's diffuse map (used where the scene retextures a mesh).
pub async fn load_model_obj(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    diffuse_override: Option<&str>,
) -> Result<Model> {
    let obj_text = load_string(file_name).await?;
    let obj_cursor = Cursor::new(obj_text);
    let mut obj_reader = BufReader::new(obj_cursor);

    let (models, obj_materials) = tobj::load_obj_buf_async(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |p| async move {
            match load_string(&p).await {
                Ok(mat_text) => tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(mat_text))),
                Err(_) => Err(tobj::LoadError::OpenFileFailed),
            }
        },
    )
    .await
    .with_context(|| format!("failed to parse {file_name}"))?;

    let mut materials = Vec::new();
    for m in obj_materials? {
        let diffuse = match diffuse_override {
            Some(file) => Some(file.to_string()),
            None => m.diffuse_texture,
        };
        let diffuse_texture = match diffuse {
            Some(file) => load_texture(&file, false, device, queue).await?,
            None => {
                log::warn!("material {} of {file_name} has no diffuse map", m.name);
                Texture::solid([128, 128, 128, 255], device, queue)
            }
        };
        let normal_texture = match m.normal_texture {
            Some(file) => load_texture(&file, true, device, queue).await?,
            None => Texture::neutral_normal(device, queue),
        };
        materials.push(Material::new(
            device,
            &m.name,
            diffuse_texture,
            normal_texture,
            layout,
        ));
    }
    if materials.is_empty() {
        let diffuse_texture = match diffuse_override {
            Some(file) => load_texture(file, false, device, queue).await?,
            None => Texture::solid([128, 128, 128, 255], device, queue),
        };
        materials.push(Material::new(
            device,
            file_name,
            diffuse_texture,
            Texture::neutral_normal(device, queue),
            layout,
        ));
    }

    let mut triangles = Vec::new();
    let meshes = models
        .into_iter()
        .map(|m| {
            let mut vertices = (0..m.mesh.positions.len() / 3)
                .map(|i| ModelVertex {
                    position: [
                        m.mesh.positions[i * 3],
                        m.mesh.positions[i * 3 + 1],
                        m.mesh.positions[i * 3 + 2],
                    ],
                    tex_coords: if m.mesh.texcoords.is_empty() {
                        [0.0, 0.0]
                    } else {
                        [m.mesh.texcoords[i * 2], 1.0 - m.mesh.texcoords[i * 2 + 1]]
                    },
                    normal: if m.mesh.normals.is_empty() {
                        [0.0, 1.0, 0.0]
                    } else {
                        [
                            m.mesh.normals[i * 3],
                            m.mesh.normals[i * 3 + 1],
                            m.mesh.normals[i * 3 + 2],
                        ]
                    },
                    ..Default::default()
                })
                .collect::<Vec<_>>();
            mesh::compute_tangents(&mut vertices, &m.mesh.indices);

            for c in m.mesh.indices.chunks(3) {
                triangles.push([
                    vertices[c[0] as usize].position,
                    vertices[c[1] as usize].position,
                    vertices[c[2] as usize].position,
                ]);
            }

            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{file_name} Vertex Buffer")),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{file_name} Index Buffer")),
                contents: bytemuck::cast_slice(&m.mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

            Mesh {
                name: m.name,
                vertex_buffer,
                index_buffer,
                num_elements: m.mesh.indices.len() as u32,
                material: m.mesh.material_id.unwrap_or(0),
            }
        })
        .collect();

    Ok(Model {
        meshes,
        materials,
        triangles,
    })
}

/// Load the character: glTF geometry with an explicit skin texture, plus its
/// first animation flattened to a looping TRS clip.
pub async fn load_character_gltf(
    file_name: &str,
    skin_texture: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> Result<(Model, TrsClip)> {
    let data = load_binary(file_name).await?;
    let gltf = gltf::Gltf::from_slice(&data)
        .with_context(|| format!("failed to parse {file_name}"))?;

    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                let blob = gltf
                    .blob
                    .as_deref()
                    .context("glTF declares a binary blob but carries none")?;
                buffer_data.push(blob.to_vec());
            }
            gltf::buffer::Source::Uri(uri) => {
                buffer_data.push(load_binary(uri).await?);
            }
        }
    }

    let clip = read_first_animation(&gltf, &buffer_data);

    let mut triangles = Vec::new();
    let mut meshes = Vec::new();
    for gltf_mesh in gltf.meshes() {
        for primitive in gltf_mesh.primitives() {
            let reader = primitive.reader(|buffer| Some(&buffer_data[buffer.index()][..]));
            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .map(|p| p.collect())
                .unwrap_or_default();
            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(|n| n.collect())
                .unwrap_or_default();
            let tex_coords: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|t| t.into_f32().collect())
                .unwrap_or_default();
            let indices: Vec<u32> = reader
                .read_indices()
                .map(|i| i.into_u32().collect())
                .unwrap_or_else(|| (0..positions.len() as u32).collect());

            let mut vertices: Vec<ModelVertex> = positions
                .iter()
                .enumerate()
                .map(|(i, p)| ModelVertex {
                    position: *p,
                    tex_coords: tex_coords.get(i).copied().unwrap_or([0.0, 0.0]),
                    normal: normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                    ..Default::default()
                })
                .collect();
            mesh::compute_tangents(&mut vertices, &indices);

            for c in indices.chunks(3) {
                triangles.push([
                    vertices[c[0] as usize].position,
                    vertices[c[1] as usize].position,
                    vertices[c[2] as usize].position,
                ]);
            }

            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{file_name} Vertex Buffer")),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{file_name} Index Buffer")),
                contents: bytemuck::cast_slice(&indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            meshes.push(Mesh {
                name: gltf_mesh.name().unwrap_or("character").to_string(),
                vertex_buffer,
                index_buffer,
                num_elements: indices.len() as u32,
                material: 0,
            });
        }
    }

    let material = load_material(device, queue, layout, "character", skin_texture, None).await?;

    Ok((
        Model {
            meshes,
            materials: vec![material],
            triangles,
        },
        clip,
    ))
}

/// Flatten the first animation's TRS channels into one clip. Channels are
/// assumed to share their keyframe timing (true for the exported character);
/// missing properties hold their defaults.
fn read_first_animation(gltf: &gltf::Gltf, buffer_data: &[Vec<u8>]) -> TrsClip {
    let mut timestamps: Vec<f32> = Vec::new();
    let mut translations: Vec<Vector3<f32>> = Vec::new();
    let mut rotations: Vec<Quaternion<f32>> = Vec::new();
    let mut scales: Vec<Vector3<f32>> = Vec::new();

    if let Some(animation) = gltf.animations().next() {
        for channel in animation.channels() {
            let reader = channel.reader(|buffer| Some(&buffer_data[buffer.index()][..]));
            if timestamps.is_empty() {
                if let Some(gltf::accessor::Iter::Standard(times)) = reader.read_inputs() {
                    timestamps = times.collect();
                }
            }
            match reader.read_outputs() {
                Some(gltf::animation::util::ReadOutputs::Translations(t)) => {
                    translations = t.map(Vector3::from).collect();
                }
                Some(gltf::animation::util::ReadOutputs::Rotations(r)) => {
                    rotations = r
                        .into_f32()
                        .map(|q| Quaternion::new(q[3], q[0], q[1], q[2]))
                        .collect();
                }
                Some(gltf::animation::util::ReadOutputs::Scales(s)) => {
                    scales = s.map(Vector3::from).collect();
                }
                _ => {}
            }
        }
    }

    let frames = (0..timestamps.len())
        .map(|i| {
            let mut frame = Instance::new();
            if let Some(t) = translations.get(i) {
                frame.position = *t;
            }
            if let Some(r) = rotations.get(i) {
                frame.rotation = *r;
            }
            if let Some(s) = scales.get(i) {
                frame.scale = *s;
            }
            frame
        })
        .collect();

    TrsClip {
        timestamps,
        frames,
    }
}
