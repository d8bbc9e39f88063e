//! Lumen Import - Mesh providers
//!
//! Loads glTF/GLB and Wavefront OBJ files into CPU-side submeshes with
//! normals, tangent frames and flat material data, ready for upload.

mod gltf_import;
mod obj_import;
mod tangents;
mod types;

use lumen_core::{LumenError, Result};
use std::path::Path;

pub use gltf_import::import_gltf;
pub use obj_import::import_obj;
pub use tangents::{compute_normals, compute_tangents};
pub use types::{ImportResult, ImportedMaterial, ImportedMesh, ImportedTexture, MeshBounds, TextureRef};

/// Options applied after a file is parsed
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Rescale and recenter so the combined bounds fit in [-1, 1]
    pub normalize: bool,
}

/// Import every submesh of a model file, choosing the importer by extension.
pub fn import_meshes<P: AsRef<Path>>(path: P, options: ImportOptions) -> Result<ImportResult> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LumenError::mesh_load(path, "file does not exist"));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let mut result = match ext.as_str() {
        "gltf" | "glb" => import_gltf(path)?,
        "obj" => import_obj(path)?,
        other => return Err(LumenError::UnsupportedFormat(other.to_string())),
    };

    if options.normalize {
        result.normalize();
    }

    if let Some(bounds) = result.bounds() {
        log::info!(
            "Loaded {} ({} submeshes, {} materials): {}",
            path.display(),
            result.meshes.len(),
            result.materials.len(),
            bounds
        );
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_mesh_load_error() {
        let err = import_meshes("definitely/not/here.obj", ImportOptions::default()).unwrap_err();
        assert!(matches!(err, LumenError::MeshLoad { .. }));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let path = std::env::temp_dir().join(format!("lumen_import_{}.xyz", std::process::id()));
        std::fs::write(&path, "not a mesh").unwrap();
        let err = import_meshes(&path, ImportOptions::default()).unwrap_err();
        assert!(matches!(err, LumenError::UnsupportedFormat(ref e) if e == "xyz"));
        let _ = std::fs::remove_file(&path);
    }
}
