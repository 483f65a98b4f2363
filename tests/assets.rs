//! The shipped asset pack must stay loadable without a GPU: these tests
//! exercise the file loaders and the CPU side of the heightmap and character
//! pipelines against the real files the build script copies.

use cgmath::Vector3;
use marsgate::resources;
use marsgate::scene::terrain;

#[tokio::test]
async fn missing_assets_error_with_the_path() {
    let err = resources::load_binary("no_such_file.png")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no_such_file.png"));
}

#[tokio::test]
async fn heightmap_decodes_and_samples_inside_the_grid() {
    let bytes = resources::load_binary("hm.png").await.unwrap();
    let img = image::load_from_memory(&bytes).unwrap();
    let (mesh, field) = terrain::from_heightmap(
        &img,
        Vector3::new(80.0, 16.4, 80.0),
        Vector3::new(-1400.0, -600.0, -1800.0),
    );
    assert!(!mesh.vertices.is_empty());
    assert_eq!(mesh.indices.len() % 3, 0);

    let height = field.height_at(0.0, 0.0).unwrap();
    // Heights stay within the scaled brightness range above the origin.
    assert!(height >= -600.0);
    assert!(height <= -600.0 + 255.0 * 16.4);
    assert_eq!(field.height_at(1e6, 0.0), None);
}

#[tokio::test]
async fn character_gltf_carries_geometry_and_an_animation() {
    let bytes = resources::load_binary("zuleyka.gltf").await.unwrap();
    let gltf = gltf::Gltf::from_slice(&bytes).unwrap();
    assert!(gltf.meshes().len() > 0);
    assert!(gltf.animations().len() > 0);
}

#[tokio::test]
async fn obj_models_parse_with_their_materials() {
    for file in ["scifi_gate_array.obj", "mothership.obj", "ufo.obj", "rockpack.obj"] {
        let text = resources::load_string(file).await.unwrap();
        let mut reader = std::io::BufReader::new(std::io::Cursor::new(text));
        let (models, materials) = tobj::load_obj_buf_async(
            &mut reader,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
            |p| async move {
                match resources::load_string(&p).await {
                    Ok(text) => {
                        tobj::load_mtl_buf(&mut std::io::BufReader::new(std::io::Cursor::new(text)))
                    }
                    Err(_) => Err(tobj::LoadError::OpenFileFailed),
                }
            },
        )
        .await
        .unwrap();
        assert!(!models.is_empty(), "{file} has no meshes");
        let materials = materials.unwrap();
        assert!(!materials.is_empty(), "{file} has no materials");
        for m in &models {
            assert_eq!(m.mesh.indices.len() % 3, 0, "{file} is not triangulated");
        }
        // Every diffuse map the materials name must ship in the asset pack.
        for m in &materials {
            if let Some(map) = &m.diffuse_texture {
                resources::load_binary(map)
                    .await
                    .unwrap_or_else(|_| panic!("{file} names a missing diffuse map {map}"));
            }
        }
    }
}
