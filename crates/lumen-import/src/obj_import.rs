//! Wavefront OBJ importer

use crate::types::{ImportResult, ImportedMaterial, ImportedMesh, TextureRef};
use lumen_core::{LumenError, Result};
use std::path::Path;

/// Import an OBJ file and its MTL library.
///
/// A missing or broken material library is not fatal: the submeshes fall
/// back to the default material.
pub fn import_obj<P: AsRef<Path>>(path: P) -> Result<ImportResult> {
    let path = path.as_ref();
    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ..Default::default()
        },
    )
    .map_err(|e| LumenError::mesh_load(path, e))?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let materials = match materials {
        Ok(materials) => materials
            .into_iter()
            .map(|m| convert_material(m, base_dir))
            .collect(),
        Err(e) => {
            log::warn!("{}: material library not loaded: {}", path.display(), e);
            Vec::new()
        }
    };

    let mut meshes = Vec::with_capacity(models.len());
    for model in models {
        let mesh = model.mesh;
        if mesh.positions.is_empty() {
            continue;
        }
        let mut imported = ImportedMesh {
            name: model.name,
            positions: mesh.positions.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect(),
            normals: mesh.normals.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect(),
            uvs: mesh.texcoords.chunks_exact(2).map(|c| [c[0], c[1]]).collect(),
            tangents: Vec::new(),
            bitangents: Vec::new(),
            indices: mesh.indices,
            material_index: mesh.material_id.filter(|&i| i < materials.len()),
        };
        imported.complete_attributes();
        meshes.push(imported);
    }

    if meshes.is_empty() {
        return Err(LumenError::mesh_load(path, "no geometry found"));
    }

    Ok(ImportResult {
        name: path
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or("unnamed")
            .to_string(),
        meshes,
        textures: Vec::new(),
        materials,
    })
}

fn convert_material(material: tobj::Material, base_dir: &Path) -> ImportedMaterial {
    let defaults = ImportedMaterial::default();
    let texture = |name: Option<String>| {
        name.filter(|n| !n.is_empty())
            .map(|n| TextureRef::File(base_dir.join(n)))
    };
    ImportedMaterial {
        name: material.name,
        kd: material.diffuse.unwrap_or(defaults.kd),
        ks: material.specular.unwrap_or(defaults.ks),
        shininess: material.shininess.unwrap_or(defaults.shininess),
        transparency: material.dissolve.unwrap_or(defaults.transparency),
        diffuse_texture: texture(material.diffuse_texture),
        normal_texture: texture(material.normal_texture),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "lumen_obj_test_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    const QUAD_OBJ: &str = "\
mtllib quad.mtl
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
usemtl red
f 1/1 2/2 3/3 4/4
";

    const QUAD_MTL: &str = "\
newmtl red
Kd 1.0 0.0 0.0
Ks 0.5 0.5 0.5
Ns 32
d 0.75
map_Kd bricks.png
";

    #[test]
    fn quad_with_material_imports() {
        let dir = temp_dir();
        std::fs::write(dir.join("quad.obj"), QUAD_OBJ).unwrap();
        std::fs::write(dir.join("quad.mtl"), QUAD_MTL).unwrap();

        let result = import_obj(dir.join("quad.obj")).unwrap();
        assert_eq!(result.meshes.len(), 1);
        let mesh = &result.meshes[0];
        assert_eq!(mesh.indices.len(), 6);
        assert!(mesh.has_texture_coords());
        assert_eq!(mesh.tangents.len(), mesh.positions.len());
        assert_eq!(mesh.normals.len(), mesh.positions.len());

        let material = result.material_for(mesh).unwrap();
        assert_eq!(material.kd, [1.0, 0.0, 0.0]);
        assert_eq!(material.shininess, 32.0);
        assert_eq!(material.transparency, 0.75);
        assert_eq!(material.diffuse_texture, Some(TextureRef::File(dir.join("bricks.png"))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_material_library_falls_back() {
        let dir = temp_dir();
        std::fs::write(dir.join("quad.obj"), QUAD_OBJ).unwrap();

        let result = import_obj(dir.join("quad.obj")).unwrap();
        assert!(result.materials.is_empty());
        assert!(result.material_for(&result.meshes[0]).is_none());
        assert!(!result.meshes[0].normals.is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
