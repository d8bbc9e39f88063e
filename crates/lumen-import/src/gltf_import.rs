//! glTF/GLB file importer

use crate::types::{ImportResult, ImportedMaterial, ImportedMesh, ImportedTexture, TextureRef};
use lumen_core::{LumenError, Result};
use std::path::Path;

/// Import a glTF or GLB file
pub fn import_gltf<P: AsRef<Path>>(path: P) -> Result<ImportResult> {
    let path = path.as_ref();
    let (document, buffers, images) =
        gltf::import(path).map_err(|e| LumenError::mesh_load(path, e))?;

    let name = path
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();

    let mut meshes = Vec::new();
    for mesh in document.meshes() {
        let mesh_name = mesh
            .name()
            .map(String::from)
            .unwrap_or_else(|| format!("mesh_{}", mesh.index()));

        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!("{}: skipping non-triangle primitive in {}", path.display(), mesh_name);
                continue;
            }
            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .map(|iter| iter.collect())
                .unwrap_or_default();
            if positions.is_empty() {
                continue;
            }

            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(|iter| iter.collect())
                .unwrap_or_default();

            let uvs: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|iter| iter.into_f32().collect())
                .unwrap_or_default();

            let indices: Vec<u32> = reader
                .read_indices()
                .map(|iter| iter.into_u32().collect())
                .unwrap_or_else(|| (0..positions.len() as u32).collect());

            let mut imported = ImportedMesh {
                name: mesh_name.clone(),
                positions,
                normals,
                uvs,
                tangents: Vec::new(),
                bitangents: Vec::new(),
                indices,
                material_index: primitive.material().index(),
            };
            imported.complete_attributes();
            meshes.push(imported);
        }
    }

    if meshes.is_empty() {
        return Err(LumenError::mesh_load(path, "no triangle meshes found"));
    }

    let mut textures = Vec::new();
    for (i, image) in images.iter().enumerate() {
        let Some(data) = to_rgba8(image) else {
            log::warn!("{}: image {} has an unsupported pixel format", path.display(), i);
            textures.push(ImportedTexture {
                name: format!("image_{}", i),
                width: 1,
                height: 1,
                data: vec![255; 4],
            });
            continue;
        };
        textures.push(ImportedTexture {
            name: format!("image_{}", i),
            width: image.width,
            height: image.height,
            data,
        });
    }

    let materials = document
        .materials()
        .map(|material| {
            let pbr = material.pbr_metallic_roughness();
            let [r, g, b, a] = pbr.base_color_factor();
            let roughness = pbr.roughness_factor().clamp(0.05, 1.0);
            let specular = 0.5 * (1.0 - roughness) + 0.04;
            ImportedMaterial {
                name: material
                    .name()
                    .map(String::from)
                    .unwrap_or_else(|| format!("material_{}", material.index().unwrap_or(0))),
                kd: [r, g, b],
                ks: [specular; 3],
                shininess: (2.0 / roughness.powi(4) - 2.0).clamp(1.0, 256.0),
                transparency: a,
                diffuse_texture: pbr
                    .base_color_texture()
                    .map(|info| TextureRef::Embedded(info.texture().source().index())),
                normal_texture: material
                    .normal_texture()
                    .map(|info| TextureRef::Embedded(info.texture().source().index())),
            }
        })
        .collect();

    Ok(ImportResult {
        name,
        meshes,
        textures,
        materials,
    })
}

fn to_rgba8(image: &gltf::image::Data) -> Option<Vec<u8>> {
    use gltf::image::Format;
    let px = &image.pixels;
    let out = match image.format {
        Format::R8G8B8A8 => px.clone(),
        Format::R8G8B8 => px
            .chunks_exact(3)
            .flat_map(|c| [c[0], c[1], c[2], 255])
            .collect(),
        Format::R8G8 => px.chunks_exact(2).flat_map(|c| [c[0], c[1], 0, 255]).collect(),
        Format::R8 => px.iter().flat_map(|&v| [v, v, v, 255]).collect(),
        // 16-bit formats are little-endian; keep the high byte
        Format::R16G16B16A16 => px.chunks_exact(8).flat_map(|c| [c[1], c[3], c[5], c[7]]).collect(),
        Format::R16G16B16 => px.chunks_exact(6).flat_map(|c| [c[1], c[3], c[5], 255]).collect(),
        _ => return None,
    };
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_gltf_reports_mesh_load() {
        let path = std::env::temp_dir().join(format!("lumen_bad_{}.gltf", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        let err = import_gltf(&path).unwrap_err();
        assert!(matches!(err, LumenError::MeshLoad { .. }));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn rgb_images_expand_to_rgba() {
        let image = gltf::image::Data {
            pixels: vec![10, 20, 30, 40, 50, 60],
            format: gltf::image::Format::R8G8B8,
            width: 2,
            height: 1,
        };
        assert_eq!(to_rgba8(&image).unwrap(), vec![10, 20, 30, 255, 40, 50, 60, 255]);
    }
}
