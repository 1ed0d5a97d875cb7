//! Import configuration.

/// Knobs applied while parsing a scene and uploading its textures.
///
/// The defaults follow the OpenGL-style conventions the slot naming scheme was
/// built for: UVs and images are flipped so that row 0 is the bottom of a texture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportOptions {
    /// Replace every texture coordinate `v` with `1 - v`.
    pub flip_uvs: bool,
    /// Decode images vertically flipped.
    pub flip_images: bool,
    /// Upload diffuse colour textures in an sRGB format.
    pub gamma_correction: bool,
    /// Allocate and fill a full mip chain for every uploaded texture.
    pub generate_mipmaps: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            flip_uvs: true,
            flip_images: true,
            gamma_correction: false,
            generate_mipmaps: true,
        }
    }
}

impl ImportOptions {
    pub fn with_gamma_correction(mut self, enabled: bool) -> Self {
        self.gamma_correction = enabled;
        self
    }

    pub fn with_flip_uvs(mut self, enabled: bool) -> Self {
        self.flip_uvs = enabled;
        self
    }

    pub fn with_flip_images(mut self, enabled: bool) -> Self {
        self.flip_images = enabled;
        self
    }

    pub fn with_mipmaps(mut self, enabled: bool) -> Self {
        self.generate_mipmaps = enabled;
        self
    }
}
