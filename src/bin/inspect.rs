//! Import a model and print what it would hand to a renderer.
//!
//! Usage: inspect <model file> [--gpu] [--gamma] [--no-flip-uvs] [--no-flip-images] [--no-mipmaps]
//!
//! Without `--gpu` the import runs against an in-memory context, so no GPU is needed.

use anyhow::{Context as _, bail};
use model_forge::{
    BindingRecorder, GpuContext, HeadlessContext, ImportOptions, Model, WgpuContext,
    resources::load_model,
};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut path = None;
    let mut use_gpu = false;
    let mut options = ImportOptions::default();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--gpu" => use_gpu = true,
            "--gamma" => options = options.with_gamma_correction(true),
            "--no-flip-uvs" => options = options.with_flip_uvs(false),
            "--no-flip-images" => options = options.with_flip_images(false),
            "--no-mipmaps" => options = options.with_mipmaps(false),
            flag if flag.starts_with("--") => bail!("unknown flag {flag}"),
            file => path = Some(file.to_string()),
        }
    }
    let Some(path) = path else {
        bail!("usage: inspect <model file> [--gpu] [--gamma] [--no-flip-uvs] [--no-flip-images] [--no-mipmaps]");
    };

    if use_gpu {
        let mut gpu = WgpuContext::headless()?;
        inspect(&path, &options, &mut gpu)
    } else {
        let mut gpu = HeadlessContext::new();
        inspect(&path, &options, &mut gpu)?;
        println!(
            "uploads: {} meshes, {} textures",
            gpu.mesh_uploads(),
            gpu.texture_uploads()
        );
        Ok(())
    }
}

fn inspect<G: GpuContext>(path: &str, options: &ImportOptions, gpu: &mut G) -> anyhow::Result<()> {
    let model = load_model(path, options, gpu).with_context(|| format!("importing {path}"))?;
    print_model(&model);
    model.destroy(gpu);
    Ok(())
}

fn print_model(model: &Model) {
    println!("directory: {}", model.directory());
    println!("textures ({}):", model.textures().len());
    for texture in model.textures().iter() {
        println!("  #{:<4} {:<16} {}", texture.handle.raw(), texture.kind, texture.path);
    }
    println!("meshes ({}):", model.num_meshes());
    for (i, mesh) in model.meshes().iter().enumerate() {
        println!(
            "  [{}] {}: {} vertices, {} indices, {} textures",
            i,
            mesh.name(),
            mesh.num_vertices(),
            mesh.num_indices(),
            mesh.num_textures()
        );
        let mut stage = BindingRecorder::new();
        mesh.draw(&mut stage);
        for (name, unit) in stage.slots() {
            println!("      unit {} <- {}", unit, name);
        }
    }
}
