//! Mesh post-processing shared by loaders and the procedural generators.

use crate::scene::model::ModelVertex;

/// Accumulate per-triangle tangents and bitangents into the vertices, then
/// average them by use count. The basic pipeline needs the full tangent
/// frame for normal mapping.
pub fn compute_tangents(vertices: &mut [ModelVertex], indices: &[u32]) {
    let mut triangles_included = vec![0u32; vertices.len()];

    for c in indices.chunks(3) {
        let v0 = vertices[c[0] as usize];
        let v1 = vertices[c[1] as usize];
        let v2 = vertices[c[2] as usize];

        let pos0: cgmath::Vector3<f32> = v0.position.into();
        let pos1: cgmath::Vector3<f32> = v1.position.into();
        let pos2: cgmath::Vector3<f32> = v2.position.into();

        let uv0: cgmath::Vector2<f32> = v0.tex_coords.into();
        let uv1: cgmath::Vector2<f32> = v1.tex_coords.into();
        let uv2: cgmath::Vector2<f32> = v2.tex_coords.into();

        let delta_pos1 = pos1 - pos0;
        let delta_pos2 = pos2 - pos0;
        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        // Solving for T and B in the standard tangent-space equations;
        // degenerate UVs fall back to r = 0 and contribute nothing.
        let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        let r = if det.abs() > f32::EPSILON { 1.0 / det } else { 0.0 };
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
        let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * r;

        for i in c {
            let v = &mut vertices[*i as usize];
            v.tangent = (cgmath::Vector3::from(v.tangent) + tangent).into();
            v.bitangent = (cgmath::Vector3::from(v.bitangent) + bitangent).into();
            triangles_included[*i as usize] += 1;
        }
    }

    for (v, n) in vertices.iter_mut().zip(triangles_included) {
        if n > 0 {
            let denom = 1.0 / n as f32;
            v.tangent = (cgmath::Vector3::from(v.tangent) * denom).into();
            v.bitangent = (cgmath::Vector3::from(v.bitangent) * denom).into();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tangents_align_with_the_uv_axes() {
        // A quad in the xy plane with uvs matching x/y directly: the tangent
        // must point along +x.
        let mut vertices = vec![
            ModelVertex {
                position: [0.0, 0.0, 0.0],
                tex_coords: [0.0, 0.0],
                normal: [0.0, 0.0, 1.0],
                ..Default::default()
            },
            ModelVertex {
                position: [1.0, 0.0, 0.0],
                tex_coords: [1.0, 0.0],
                normal: [0.0, 0.0, 1.0],
                ..Default::default()
            },
            ModelVertex {
                position: [1.0, 1.0, 0.0],
                tex_coords: [1.0, 1.0],
                normal: [0.0, 0.0, 1.0],
                ..Default::default()
            },
        ];
        let indices = [0, 1, 2];
        compute_tangents(&mut vertices, &indices);
        for v in &vertices {
            assert!(v.tangent[0] > 0.9);
            assert!(v.tangent[1].abs() < 1e-5);
        }
    }

    #[test]
    fn degenerate_uvs_do_not_produce_nan() {
        let mut vertices = vec![
            ModelVertex {
                position: [0.0, 0.0, 0.0],
                ..Default::default()
            },
            ModelVertex {
                position: [1.0, 0.0, 0.0],
                ..Default::default()
            },
            ModelVertex {
                position: [1.0, 1.0, 0.0],
                ..Default::default()
            },
        ];
        let indices = [0, 1, 2];
        compute_tangents(&mut vertices, &indices);
        for v in &vertices {
            assert!(v.tangent.iter().all(|c| c.is_finite()));
            assert!(v.bitangent.iter().all(|c| c.is_finite()));
        }
    }
}
