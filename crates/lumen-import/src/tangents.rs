//! Normal and tangent-frame generation for meshes that don't ship them.

use lumen_core::Vec3;

/// Area-weighted smooth vertex normals from indexed triangles.
pub fn compute_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut accum = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let pa = Vec3::from(positions[a]);
        let face = (Vec3::from(positions[b]) - pa).cross(Vec3::from(positions[c]) - pa);
        accum[a] += face;
        accum[b] += face;
        accum[c] += face;
    }
    accum
        .into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y).to_array())
        .collect()
}

/// Per-vertex tangents and bitangents aligned with the UV directions.
///
/// Meshes without texture coordinates get an arbitrary frame orthogonal to
/// the normal so the vertex layout stays uniform.
pub fn compute_tangents(
    positions: &[[f32; 3]],
    normals: &[[f32; 3]],
    uvs: &[[f32; 2]],
    indices: &[u32],
) -> (Vec<[f32; 3]>, Vec<[f32; 3]>) {
    let count = positions.len();
    let mut tan = vec![Vec3::ZERO; count];
    let mut bitan = vec![Vec3::ZERO; count];

    if uvs.len() == count {
        for tri in indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a >= count || b >= count || c >= count {
                continue;
            }
            let e1 = Vec3::from(positions[b]) - Vec3::from(positions[a]);
            let e2 = Vec3::from(positions[c]) - Vec3::from(positions[a]);
            let (du1, dv1) = (uvs[b][0] - uvs[a][0], uvs[b][1] - uvs[a][1]);
            let (du2, dv2) = (uvs[c][0] - uvs[a][0], uvs[c][1] - uvs[a][1]);
            let det = du1 * dv2 - du2 * dv1;
            if det.abs() < 1e-8 {
                continue;
            }
            let r = 1.0 / det;
            let t = (e1 * dv2 - e2 * dv1) * r;
            let bt = (e2 * du1 - e1 * du2) * r;
            for i in [a, b, c] {
                tan[i] += t;
                bitan[i] += bt;
            }
        }
    }

    let mut tangents = Vec::with_capacity(count);
    let mut bitangents = Vec::with_capacity(count);
    for i in 0..count {
        let n = normals
            .get(i)
            .map(|n| Vec3::from(*n))
            .and_then(Vec3::try_normalize)
            .unwrap_or(Vec3::Y);
        // Gram-Schmidt against the normal
        let t = (tan[i] - n * n.dot(tan[i]))
            .try_normalize()
            .unwrap_or_else(|| n.any_orthonormal_vector());
        let mut b = n.cross(t);
        if bitan[i].dot(b) < 0.0 {
            b = -b;
        }
        tangents.push(t.to_array());
        bitangents.push(b.to_array());
    }
    (tangents, bitangents)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Unit quad in the XY plane facing +Z, UVs aligned with X/Y.
    fn quad() -> (Vec<[f32; 3]>, Vec<[f32; 2]>, Vec<u32>) {
        (
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    #[test]
    fn quad_normals_face_positive_z() {
        let (p, _, i) = quad();
        for n in compute_normals(&p, &i) {
            assert!((Vec3::from(n) - Vec3::Z).length() < 1e-5);
        }
    }

    #[test]
    fn quad_tangents_follow_uv_axes() {
        let (p, uv, i) = quad();
        let n = compute_normals(&p, &i);
        let (t, b) = compute_tangents(&p, &n, &uv, &i);
        for k in 0..4 {
            assert!((Vec3::from(t[k]) - Vec3::X).length() < 1e-5);
            assert!((Vec3::from(b[k]) - Vec3::Y).length() < 1e-5);
        }
    }

    #[test]
    fn missing_uvs_still_yield_orthonormal_frame() {
        let (p, _, i) = quad();
        let n = compute_normals(&p, &i);
        let (t, b) = compute_tangents(&p, &n, &[], &i);
        for k in 0..4 {
            let (t, b, n) = (Vec3::from(t[k]), Vec3::from(b[k]), Vec3::from(n[k]));
            assert!(t.dot(n).abs() < 1e-5);
            assert!(b.dot(n).abs() < 1e-5);
            assert!((t.length() - 1.0).abs() < 1e-5);
        }
    }
}
