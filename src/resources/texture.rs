use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::{
    context::{GpuContext, TextureParams},
    data_structures::{
        scene_graph::RawMaterial,
        texture::{DecodedImage, PixelFormat, Texture, TextureKind},
    },
    error::ImportError,
    options::ImportOptions,
};

/// Path-keyed store of every texture a model has uploaded.
///
/// Guarantees at most one decode and upload per distinct material path. Entries keep
/// their insertion order.
#[derive(Debug, Default)]
pub struct TextureCache {
    textures: Vec<Texture>,
    by_path: HashMap<String, usize>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&Texture> {
        self.by_path.get(path).map(|&i| &self.textures[i])
    }

    /// Store `texture` unless its path is already cached. Returns whether it was added.
    pub fn insert(&mut self, texture: Texture) -> bool {
        if self.by_path.contains_key(&texture.path) {
            return false;
        }
        self.by_path.insert(texture.path.clone(), self.textures.len());
        self.textures.push(texture);
        true
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Texture> {
        self.textures.iter()
    }

    /// Free every cached GPU texture exactly once.
    pub fn release<G: GpuContext>(self, gpu: &mut G) {
        for texture in self.textures {
            gpu.release_texture(texture.handle);
        }
    }
}

/// Resolves material texture references to uploaded [`Texture`] records.
///
/// Relative paths are resolved against the model directory; `*N` references are
/// looked up among the images embedded in the scene file.
pub struct MaterialBinder<'a> {
    directory: &'a str,
    embedded: &'a HashMap<String, Vec<u8>>,
    options: &'a ImportOptions,
}

impl<'a> MaterialBinder<'a> {
    pub fn new(
        directory: &'a str,
        embedded: &'a HashMap<String, Vec<u8>>,
        options: &'a ImportOptions,
    ) -> Self {
        Self {
            directory,
            embedded,
            options,
        }
    }

    /// Textures of one `kind`, in the material's storage order.
    ///
    /// Cached paths are reused as-is, without decoding. A reference that cannot be
    /// decoded is logged and left out; it never fails the surrounding import.
    pub fn resolve<G: GpuContext>(
        &self,
        material: &RawMaterial,
        kind: TextureKind,
        cache: &mut TextureCache,
        gpu: &mut G,
    ) -> Vec<Texture> {
        let mut textures = Vec::with_capacity(material.texture_count(kind));
        for path in material.textures_of(kind) {
            if let Some(cached) = cache.get(path) {
                log::debug!("Reusing cached texture {}", path);
                textures.push(cached.clone());
                continue;
            }
            let image = match self.decode(path) {
                Ok(image) => image,
                Err(e) => {
                    log::warn!("Skipping {} texture: {}", kind, e);
                    continue;
                }
            };
            let params = TextureParams {
                label: path.to_string(),
                srgb: self.options.gamma_correction
                    && kind == TextureKind::Diffuse
                    && image.format != PixelFormat::Red,
                mipmaps: self.options.generate_mipmaps,
            };
            let texture = Texture {
                handle: gpu.upload_texture(&image, &params),
                kind,
                path: path.to_string(),
            };
            log::debug!(
                "Uploaded {} {} ({}x{}, {:?})",
                kind,
                path,
                image.width,
                image.height,
                image.format
            );
            cache.insert(texture.clone());
            textures.push(texture);
        }
        textures
    }

    /// All textures of a material, concatenated diffuse, specular, normal, height.
    pub fn resolve_all<G: GpuContext>(
        &self,
        material: &RawMaterial,
        cache: &mut TextureCache,
        gpu: &mut G,
    ) -> Vec<Texture> {
        TextureKind::ALL
            .iter()
            .flat_map(|&kind| self.resolve(material, kind, cache, gpu))
            .collect()
    }

    fn decode(&self, path: &str) -> Result<DecodedImage, ImportError> {
        if let Some(bytes) = self.embedded.get(path) {
            return decode_image_bytes(bytes, Path::new(path), self.options.flip_images);
        }
        if Path::new(path).extension().is_none() {
            return Err(ImportError::MalformedPath(PathBuf::from(path)));
        }
        decode_image(&self.texture_path(path), self.options.flip_images)
    }

    /// `<model directory>/<path>`, joined textually the way the material stored it.
    fn texture_path(&self, path: &str) -> PathBuf {
        PathBuf::from(format!("{}/{}", self.directory, path))
    }
}

/// Decode an image file into tightly packed 8-bit pixels.
///
/// Channel counts other than 1, 3 and 4 are rejected with [`ImportError::UnsupportedFormat`].
pub fn decode_image(path: &Path, flip_vertically: bool) -> Result<DecodedImage, ImportError> {
    let image = image::open(path)
        .map_err(|e| ImportError::TextureDecode(path.to_path_buf(), e.to_string()))?;
    from_dynamic(image, path, flip_vertically)
}

/// Like [`decode_image`], for an encoded image already in memory. `label` is used in errors.
pub fn decode_image_bytes(
    bytes: &[u8],
    label: &Path,
    flip_vertically: bool,
) -> Result<DecodedImage, ImportError> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| ImportError::TextureDecode(label.to_path_buf(), e.to_string()))?;
    from_dynamic(image, label, flip_vertically)
}

fn from_dynamic(
    image: image::DynamicImage,
    path: &Path,
    flip_vertically: bool,
) -> Result<DecodedImage, ImportError> {
    let channels = image.color().channel_count();
    let format = PixelFormat::from_channels(channels)
        .ok_or_else(|| ImportError::UnsupportedFormat(path.to_path_buf(), channels))?;
    let image = if flip_vertically { image.flipv() } else { image };
    Ok(DecodedImage::from_dynamic(image, format))
}
