use std::path::{Path, PathBuf};

use crate::{
    context::GpuContext,
    data_structures::{
        model::Model,
        scene_graph::{RawNode, RawScene, SceneSource},
    },
    error::ImportError,
    options::ImportOptions,
    resources::{mesh::build_mesh, texture::MaterialBinder},
};

/**
 * This module contains all logic for turning external files into a [`Model`]:
 * scene parsing, mesh building, texture decoding and caching.
 */
pub mod gltf;
pub mod mesh;
pub mod obj;
pub mod texture;

/// Pick the scene parser for `path` by file extension.
pub fn source_for_path(path: &Path) -> Result<Box<dyn SceneSource>, ImportError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ImportError::MalformedPath(path.to_path_buf()))?;
    match extension.to_ascii_lowercase().as_str() {
        "obj" => Ok(Box::new(obj::ObjSource)),
        "gltf" | "glb" => Ok(Box::new(gltf::GltfSource)),
        other => Err(ImportError::ImportFailed(
            path.to_path_buf(),
            format!("unsupported scene format '{other}'"),
        )),
    }
}

/// Directory textures of the model at `path` are resolved against.
///
/// Everything up to the last path separator; a path without any separator is used whole.
pub fn model_directory(path: &str) -> &str {
    match path.rfind(std::path::is_separator) {
        Some(i) => &path[..i],
        None => path,
    }
}

/// Parse and import the scene at `path`.
///
/// Fails on unreadable or incomplete scenes and on allocation failure. Textures that
/// cannot be decoded and meshes with invalid faces are logged and skipped.
pub fn load_model<G: GpuContext>(
    path: &str,
    options: &ImportOptions,
    gpu: &mut G,
) -> Result<Model, ImportError> {
    let source = source_for_path(Path::new(path))?;
    load_model_with(source.as_ref(), path, options, gpu)
}

/// [`load_model`] with an explicit scene parser.
pub fn load_model_with<G: GpuContext>(
    source: &dyn SceneSource,
    path: &str,
    options: &ImportOptions,
    gpu: &mut G,
) -> Result<Model, ImportError> {
    if !Path::new(path).exists() {
        return Err(ImportError::ImportFailed(
            PathBuf::from(path),
            "file not found".into(),
        ));
    }
    let scene = source.parse(Path::new(path), options)?;
    let model = import_scene(&scene, path, model_directory(path), options, gpu)?;
    log::info!(
        "Imported {}: {} meshes, {} textures",
        path,
        model.num_meshes(),
        model.textures().len()
    );
    Ok(model)
}

/// Like [`load_model`], but a failed import is logged and yields an empty model.
pub fn import_model<G: GpuContext>(path: &str, options: &ImportOptions, gpu: &mut G) -> Model {
    match load_model(path, options, gpu) {
        Ok(model) => model,
        Err(e) => {
            log::error!("{}", e);
            Model::empty()
        }
    }
}

/// Build a [`Model`] from an already parsed scene.
///
/// Nodes are visited depth-first, pre-order: a node's own meshes are appended before
/// any of its children's, children left to right. On a fatal error every resource
/// uploaded so far is released before returning.
pub fn import_scene<G: GpuContext>(
    scene: &RawScene,
    path: &str,
    directory: &str,
    options: &ImportOptions,
    gpu: &mut G,
) -> Result<Model, ImportError> {
    let root = match &scene.root {
        Some(root) if !scene.incomplete => root,
        _ => {
            return Err(ImportError::ImportFailed(
                PathBuf::from(path),
                "scene is incomplete or has no root node".into(),
            ));
        }
    };

    let mut model = Model::with_directory(directory);
    let binder = MaterialBinder::new(directory, &scene.embedded, options);

    // Children are pushed in reverse so they pop left to right.
    let mut pending: Vec<&RawNode> = vec![root];
    while let Some(node) = pending.pop() {
        for &mesh_index in &node.meshes {
            let Some(raw) = scene.meshes.get(mesh_index) else {
                log::warn!("Node {} references missing mesh {}", node.name, mesh_index);
                continue;
            };
            let material = scene.materials.get(raw.material_index);
            if material.is_none() {
                log::warn!("Mesh {} references missing material {}", raw.name, raw.material_index);
            }
            let (meshes, cache) = model.parts_mut();
            match build_mesh(raw, material, &binder, cache, gpu) {
                Ok(mesh) => meshes.push(mesh),
                Err(e) if e.is_fatal() => {
                    model.destroy(gpu);
                    return Err(e);
                }
                Err(e) => log::warn!("Skipping mesh {}: {}", raw.name, e),
            }
        }
        pending.extend(node.children.iter().rev());
    }
    Ok(model)
}
